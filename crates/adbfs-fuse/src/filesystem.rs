//! FUSE filesystem implementation over the adb command channel.
//!
//! Implements the fuser `Filesystem` trait on top of `adbfs-core`: inode
//! numbers map to remote paths through the [`InodeTable`], metadata flows
//! through the attribute cache, and file content flows through per-session
//! local mirror files that are pulled at open and pushed at flush.
//!
//! Every operation that reaches the device blocks its FUSE callback thread
//! for the full command round trip; there is no asynchronous variant and no
//! cancellation. Releasing a written-but-unflushed session drops the writes
//! on the floor — a documented property of the mirror design, not a bug to
//! patch here.

use crate::config::MountConfig;
use crate::error::{FuseError, FuseResult};
use crate::handles::{HandleTable, OpenFile};
use crate::inode::{InodeTable, ROOT_INODE};

use adbfs_core::escape::escape_path;
use adbfs_core::{
    attributes, list_directory, read_link, AdbDevice, AdbError, AttrCache, AttrOutcome, FileKind,
    MirrorDir, ParsedAttributes, SessionTracker, MUTATION_EXTENSION,
};
use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use libc::c_int;
use std::ffi::OsStr;
use std::fs::OpenOptions;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, trace, warn};

/// How long the kernel may cache attributes we return. Deliberately much
/// shorter than the protocol-side cache TTL: the kernel has no way to
/// observe our invalidations.
const KERNEL_ATTR_TTL: Duration = Duration::from_secs(1);

/// The protocol reports sizes in bytes; block accounting uses 512-byte
/// units the way `du` does.
const BLOCK_SIZE: u32 = 512;

/// Capacity bound for translated symlink targets.
const READLINK_CAPACITY: usize = libc::PATH_MAX as usize;

/// FUSE filesystem for an Android device reached over adb.
pub struct AdbFS {
    device: AdbDevice,
    attrs: AttrCache,
    mirror: MirrorDir,
    sessions: SessionTracker,
    inodes: InodeTable,
    handles: HandleTable,
    config: MountConfig,
}

impl AdbFS {
    /// Creates a filesystem that shells out to the real `adb` binary.
    pub fn new(config: MountConfig) -> FuseResult<Self> {
        let device = AdbDevice::host(config.serial.clone());
        Self::with_device(device, config)
    }

    /// Creates a filesystem over an arbitrary device channel. This is how
    /// tests run the full session lifecycle against a scripted executor.
    pub fn with_device(device: AdbDevice, config: MountConfig) -> FuseResult<Self> {
        Ok(Self {
            device,
            attrs: AttrCache::new(),
            mirror: MirrorDir::new()?,
            sessions: SessionTracker::new(),
            inodes: InodeTable::new(),
            handles: HandleTable::new(),
            config,
        })
    }

    /// The device channel, for pre-mount probing.
    pub fn device(&self) -> &AdbDevice {
        &self.device
    }

    /// The mirror directory backing open sessions.
    pub fn mirror_root(&self) -> &Path {
        self.mirror.root()
    }

    // ---- attribute plumbing -------------------------------------------

    /// Resolves kernel-facing attributes for a remote path. The returned
    /// attr carries `ino = 0`; callers assign the inode they allocated.
    fn resolve_attr(&self, path: &str) -> FuseResult<FileAttr> {
        match attributes(&self.device, &self.attrs, path)? {
            AttrOutcome::Attrs(parsed) => Ok(build_attr(&parsed)),
            // Exists per a listing, but unreadable: present a stub entry
            // rather than an error so the tree stays navigable.
            AttrOutcome::ExistsNoData => Ok(stub_attr()),
        }
    }

    // ---- session lifecycle --------------------------------------------

    /// Opens a session on `path`: claim exclusivity, validate the path
    /// still resolves, pull content into the mirror, open a descriptor.
    ///
    /// A pending truncation skips both the validity check and the pull:
    /// the mirror already holds the intended (possibly empty) content.
    pub(crate) fn do_open(&self, path: &str, flags: i32) -> FuseResult<u64> {
        if !self.sessions.try_claim(path) {
            return Err(FuseError::SessionBusy(path.to_string()));
        }
        match self.open_claimed(path, flags) {
            Ok(fh) => Ok(fh),
            Err(e) => {
                self.sessions.release_claim(path);
                Err(e)
            }
        }
    }

    fn open_claimed(&self, path: &str, flags: i32) -> FuseResult<u64> {
        if self.sessions.take_truncation_pending(path) {
            debug!(path, "open: truncation pending, skipping pull");
        } else {
            match attributes(&self.device, &self.attrs, path)? {
                AttrOutcome::Attrs(_) => {
                    // The pull may produce nothing for an empty remote
                    // file; the session then starts from an empty mirror.
                    if let Err(e) = self.mirror.populate(&self.device, path) {
                        warn!(path, error = %e, "open: pull failed, starting empty");
                    }
                }
                AttrOutcome::ExistsNoData => {
                    return Err(AdbError::PermissionDenied(path.to_string()).into());
                }
            }
        }

        let local = self.mirror.ensure_exists(path)?;
        let file = open_options(flags).open(&local)?;
        let fh = self.handles.insert(OpenFile {
            path: path.to_string(),
            file,
        });
        self.sessions.open_session(fh);
        trace!(path, fh, "session opened");
        Ok(fh)
    }

    pub(crate) fn do_read(&self, fh: u64, offset: u64, size: u32) -> FuseResult<Vec<u8>> {
        let handle = self.handles.get(fh).ok_or(FuseError::InvalidHandle(fh))?;
        let mut buf = vec![0u8; size as usize];
        let read = handle.file.read_at(&mut buf, offset)?;
        buf.truncate(read);
        Ok(buf)
    }

    /// Positional write into the mirror; marks the session dirty. The
    /// remote side is untouched until flush.
    pub(crate) fn do_write(&self, fh: u64, offset: u64, data: &[u8]) -> FuseResult<u32> {
        let handle = self.handles.get(fh).ok_or(FuseError::InvalidHandle(fh))?;
        handle.file.write_all_at(data, offset)?;
        drop(handle);
        self.sessions.mark_dirty(fh);
        Ok(u32::try_from(data.len()).unwrap_or(u32::MAX))
    }

    /// Pushes the mirror back to the device if the session is dirty.
    pub(crate) fn do_flush(&self, fh: u64) -> FuseResult<()> {
        let handle = self.handles.get(fh).ok_or(FuseError::InvalidHandle(fh))?;
        let path = handle.path.clone();
        drop(handle);

        if !self.sessions.take_dirty(fh) {
            return Ok(());
        }
        debug!(%path, fh, "flush: pushing dirty mirror");
        let local = self.mirror.path_for(&path);
        if let Err(e) = self.device.push(&local, &path) {
            // The content is still only local; keep the session dirty so a
            // later flush can retry the push.
            self.sessions.mark_dirty(fh);
            return Err(e.into());
        }
        if let Err(e) = self.device.sync() {
            debug!(%path, error = %e, "flush: sync failed");
        }
        if self.config.rescan {
            if let Err(e) = self.device.rescan_file(&path) {
                debug!(%path, error = %e, "flush: rescan failed");
            }
        }
        self.attrs.invalidate(&path);
        Ok(())
    }

    /// Closes the descriptor, deletes the mirror file and drops the claim,
    /// dirty or not. Unpushed writes are silently lost here.
    pub(crate) fn do_release(&self, fh: u64) {
        let Some(open_file) = self.handles.remove(fh) else {
            return;
        };
        self.sessions.close_session(fh);
        drop(open_file.file);
        self.mirror.discard(&open_file.path);
        self.sessions.release_claim(&open_file.path);
        trace!(path = %open_file.path, fh, "session released");
    }

    // ---- mutations ----------------------------------------------------

    pub(crate) fn do_truncate(&self, path: &str, size: u64) -> FuseResult<()> {
        self.attrs.extend(path, MUTATION_EXTENSION);

        // Pull prior content while the path still resolves to a real
        // entry, so a partial truncate keeps the retained prefix.
        match attributes(&self.device, &self.attrs, path) {
            Ok(AttrOutcome::Attrs(_)) => {
                if let Err(e) = self.mirror.populate(&self.device, path) {
                    warn!(path, error = %e, "truncate: pull failed");
                }
            }
            Ok(AttrOutcome::ExistsNoData) | Err(AdbError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        self.sessions.set_truncation_pending(path);

        let local = self.mirror.ensure_exists(path)?;
        let file = OpenOptions::new().write(true).open(&local)?;
        file.set_len(size)?;

        self.attrs.invalidate(path);
        debug!(path, size, "truncated mirror, pull pending skip armed");
        Ok(())
    }

    pub(crate) fn do_utimens(&self, path: &str) -> FuseResult<()> {
        self.attrs.extend(path, MUTATION_EXTENSION);
        self.device
            .shell(&format!("touch '{}'", escape_path(path)))?;
        if self.config.rescan {
            if let Err(e) = self.device.rescan_file(path) {
                debug!(path, error = %e, "utimens: rescan failed");
            }
        }
        Ok(())
    }

    /// Creates an empty remote file by pushing an empty mirror.
    pub(crate) fn do_mknod(&self, path: &str) -> FuseResult<()> {
        let local = self.mirror.ensure_exists(path)?;
        self.device.push(&local, path)?;
        if let Err(e) = self.device.sync() {
            debug!(path, error = %e, "mknod: sync failed");
        }
        self.attrs.invalidate(path);
        Ok(())
    }

    pub(crate) fn do_mkdir(&self, path: &str) -> FuseResult<()> {
        self.attrs.extend(path, MUTATION_EXTENSION);
        self.device
            .shell(&format!("mkdir '{}'", escape_path(path)))?;
        Ok(())
    }

    pub(crate) fn do_rmdir(&self, path: &str) -> FuseResult<()> {
        self.attrs.extend(path, MUTATION_EXTENSION);
        self.device
            .shell(&format!("rmdir '{}'", escape_path(path)))?;
        if self.config.rescan {
            if let Err(e) = self.device.rescan_dir_removed(path) {
                debug!(path, error = %e, "rmdir: rescan failed");
            }
        }
        self.inodes.invalidate_path(path);
        Ok(())
    }

    pub(crate) fn do_unlink(&self, path: &str) -> FuseResult<()> {
        self.attrs.extend(path, MUTATION_EXTENSION);
        self.device.shell(&format!("rm '{}'", escape_path(path)))?;
        if self.config.rescan {
            if let Err(e) = self.device.rescan_file(path) {
                debug!(path, error = %e, "unlink: rescan failed");
            }
        }
        self.attrs.invalidate(path);
        self.mirror.discard(path);
        self.inodes.invalidate_path(path);
        Ok(())
    }

    pub(crate) fn do_rename(&self, from: &str, to: &str) -> FuseResult<()> {
        self.attrs.extend(from, MUTATION_EXTENSION);
        self.attrs.extend(to, MUTATION_EXTENSION);
        self.device.shell(&format!(
            "mv '{}' '{}'",
            escape_path(from),
            escape_path(to)
        ))?;
        if self.config.rescan {
            for path in [from, to] {
                if let Err(e) = self.device.rescan_file(path) {
                    debug!(path, error = %e, "rename: rescan failed");
                }
            }
        }
        self.attrs.invalidate(from);
        self.attrs.invalidate(to);
        self.inodes.rename_path(from, to);
        Ok(())
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> FuseResult<String> {
        let parent_path = self
            .inodes
            .path_of(parent)
            .ok_or(FuseError::InvalidInode(parent))?;
        let name = name
            .to_str()
            .ok_or_else(|| FuseError::Io(std::io::Error::from_raw_os_error(libc::EINVAL)))?;
        Ok(adbfs_core::path::join_child(&parent_path, name))
    }
}

fn open_options(flags: i32) -> OpenOptions {
    let mut opts = OpenOptions::new();
    match flags & libc::O_ACCMODE {
        libc::O_WRONLY => {
            opts.write(true);
        }
        libc::O_RDWR => {
            opts.read(true).write(true);
        }
        _ => {
            opts.read(true);
        }
    }
    if flags & libc::O_APPEND != 0 {
        opts.append(true);
    }
    opts
}

fn kind_to_file_type(kind: FileKind) -> FileType {
    match kind {
        FileKind::Socket => FileType::Socket,
        FileKind::Symlink => FileType::Symlink,
        FileKind::Regular => FileType::RegularFile,
        FileKind::Directory => FileType::Directory,
        FileKind::BlockDevice => FileType::BlockDevice,
        FileKind::CharDevice => FileType::CharDevice,
        FileKind::Fifo => FileType::NamedPipe,
    }
}

fn blocks_for(size: u64) -> u64 {
    (size + 256) / u64::from(BLOCK_SIZE)
}

fn build_attr(parsed: &ParsedAttributes) -> FileAttr {
    FileAttr {
        ino: 0, // assigned by the caller once the inode is allocated
        size: parsed.size,
        blocks: blocks_for(parsed.size),
        // The protocol carries one timestamp per entry.
        atime: parsed.mtime,
        mtime: parsed.mtime,
        ctime: parsed.mtime,
        crtime: parsed.mtime,
        kind: kind_to_file_type(parsed.kind),
        perm: parsed.perm,
        nlink: parsed.nlink,
        uid: parsed.uid,
        gid: parsed.gid,
        rdev: parsed.rdev,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

/// Attributes for a path that exists but yielded no attribute line:
/// a bare regular file, everything zeroed.
fn stub_attr() -> FileAttr {
    FileAttr {
        ino: 0,
        size: 0,
        blocks: 0,
        atime: UNIX_EPOCH,
        mtime: UNIX_EPOCH,
        ctime: UNIX_EPOCH,
        crtime: UNIX_EPOCH,
        kind: FileType::RegularFile,
        perm: 0,
        nlink: 1,
        uid: 0,
        gid: 0,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

fn entry_file_type(raw: Option<&str>) -> FileType {
    match raw.and_then(|line| line.bytes().next()) {
        Some(b'd') => FileType::Directory,
        Some(b'l') => FileType::Symlink,
        Some(b'b') => FileType::BlockDevice,
        Some(b'c') => FileType::CharDevice,
        Some(b's') => FileType::Socket,
        Some(b'p') => FileType::NamedPipe,
        _ => FileType::RegularFile,
    }
}

impl Filesystem for AdbFS {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!(mirror = %self.mirror.root().display(), "adbfs mounted");
        Ok(())
    }

    fn destroy(&mut self) {
        info!("adbfs unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        trace!(parent, %path, "lookup");

        match self.resolve_attr(&path) {
            Ok(mut attr) => {
                attr.ino = self.inodes.get_or_insert(&path);
                reply.entry(&KERNEL_ATTR_TTL, &attr, 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        trace!(ino, nlookup, "forget");
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        trace!(ino, "getattr");
        let Some(path) = self.inodes.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.resolve_attr(&path) {
            Ok(mut attr) => {
                attr.ino = ino;
                reply.attr(&KERNEL_ATTR_TTL, &attr);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = self.inodes.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        trace!(ino, %path, ?size, "setattr");

        // chmod/chown have no remote counterpart over this protocol and
        // are silently accepted, like other permission-less filesystems.
        let mut forced_size = None;
        if let Some(size) = size {
            if let Err(e) = self.do_truncate(&path, size) {
                reply.error(e.to_errno());
                return;
            }
            forced_size = Some(size);
        }
        if atime.is_some() || mtime.is_some() {
            if let Err(e) = self.do_utimens(&path) {
                reply.error(e.to_errno());
                return;
            }
        }

        match self.resolve_attr(&path) {
            Ok(mut attr) => {
                attr.ino = ino;
                if let Some(size) = forced_size {
                    // The device has not seen the new size yet; report the
                    // truncated mirror's size rather than the stale remote.
                    attr.size = size;
                    attr.blocks = blocks_for(size);
                }
                reply.attr(&KERNEL_ATTR_TTL, &attr);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let Some(path) = self.inodes.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        trace!(ino, %path, "readlink");
        match read_link(&self.device, &self.attrs, &path, READLINK_CAPACITY) {
            Ok(target) => reply.data(target.as_bytes()),
            Err(e) => reply.error(crate::error::adb_error_to_errno(&e)),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        debug!(%path, "mknod");

        if let Err(e) = self.do_mknod(&path) {
            reply.error(e.to_errno());
            return;
        }
        match self.resolve_attr(&path) {
            Ok(mut attr) => {
                attr.ino = self.inodes.get_or_insert(&path);
                reply.entry(&KERNEL_ATTR_TTL, &attr, 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        debug!(%path, "mkdir");

        if let Err(e) = self.do_mkdir(&path) {
            reply.error(e.to_errno());
            return;
        }
        match self.resolve_attr(&path) {
            Ok(mut attr) => {
                attr.ino = self.inodes.get_or_insert(&path);
                reply.entry(&KERNEL_ATTR_TTL, &attr, 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        debug!(%path, "unlink");
        match self.do_unlink(&path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        debug!(%path, "rmdir");
        match self.do_rmdir(&path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (from, to) = match (
            self.child_path(parent, name),
            self.child_path(newparent, newname),
        ) {
            (Ok(from), Ok(to)) => (from, to),
            (Err(e), _) | (_, Err(e)) => {
                reply.error(e.to_errno());
                return;
            }
        };
        debug!(%from, %to, "rename");
        match self.do_rename(&from, &to) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = self.inodes.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        debug!(ino, %path, flags, "open");
        match self.do_open(&path, flags) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        trace!(ino, fh, offset, size, "read");
        let offset = u64::try_from(offset).unwrap_or(0);
        match self.do_read(fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        trace!(ino, fh, offset, size = data.len(), "write");
        let offset = u64::try_from(offset).unwrap_or(0);
        match self.do_write(fh, offset, data) {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        trace!(ino, fh, "flush");
        match self.do_flush(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, ino: u64, fh: u64, _datasync: bool, reply: ReplyEmpty) {
        trace!(ino, fh, "fsync");
        match self.do_flush(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        trace!(ino, fh, "release");
        self.do_release(fh);
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.inodes.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        trace!(ino, %path, offset, "readdir");

        let entries = match list_directory(&self.device, &self.attrs, &path) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(crate::error::adb_error_to_errno(&e));
                return;
            }
        };

        // `.` and `..` arrive as ordinary lines of `ls -a` output.
        let skip = usize::try_from(offset).unwrap_or(0);
        for (idx, entry) in entries.iter().enumerate().skip(skip) {
            let entry_ino = match entry.name.as_str() {
                "." => ino,
                ".." => adbfs_core::path::parent_of(&path)
                    .and_then(|parent| self.inodes.get_inode(parent))
                    .unwrap_or(ROOT_INODE),
                name => {
                    let child = adbfs_core::path::join_child(&path, name);
                    self.inodes.get_or_insert_no_lookup_inc(&child)
                }
            };
            let file_type = entry_file_type(entry.raw.as_deref());
            let next_offset = i64::try_from(idx + 1).unwrap_or(i64::MAX);
            if reply.add(entry_ino, next_offset, file_type, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, _mask: i32, reply: ReplyEmpty) {
        // Permissive by design: the remote permission model is not ours to
        // enforce, and the real check happens device-side on every command.
        trace!(ino, "access");
        reply.ok();
    }
}
