//! Attribute-line backed read operations: the getattr and readlink flows.
//!
//! Both serve from the attribute cache when fresh and otherwise issue one
//! `ls -l -a -d` round trip, with stderr folded in so diagnostics reach the
//! validity heuristic. What gets stored is exactly what was observed: the
//! first output line, or an absent-data mark when the line is the
//! recognized permission-denied diagnostic.

use crate::cache::AttrCache;
use crate::device::AdbDevice;
use crate::error::{AdbError, AdbResult};
use crate::escape::escape_path;
use crate::listing::{self, ParsedAttributes};
use crate::symlink::translate_target;
use tracing::{debug, trace};

/// What a getattr-style query learned about a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrOutcome {
    /// A decoded attribute line.
    Attrs(Box<ParsedAttributes>),
    /// The path exists (a listing reported it) but no attribute line could
    /// be obtained for it. Callers present a stub entry.
    ExistsNoData,
}

/// Resolves attributes for one remote path, serving from the cache when
/// fresh.
///
/// Errors: [`AdbError::NoDevice`] when the remote command produced no
/// output, [`AdbError::NotFound`] when the output is a diagnostic of
/// unknown shape.
pub fn attributes(device: &AdbDevice, cache: &AttrCache, path: &str) -> AdbResult<AttrOutcome> {
    match raw_attr_line(device, cache, path)? {
        None => Ok(AttrOutcome::ExistsNoData),
        Some(line) => match listing::parse_line(&line) {
            Some(parsed) => Ok(AttrOutcome::Attrs(Box::new(parsed))),
            None => Err(AdbError::NotFound(path.to_string())),
        },
    }
}

/// Resolves and translates the symlink target for one remote path.
///
/// `capacity` bounds the translated result, `../` prefix included.
pub fn read_link(
    device: &AdbDevice,
    cache: &AttrCache,
    path: &str,
    capacity: usize,
) -> AdbResult<String> {
    let line = raw_attr_line(device, cache, path)?.ok_or(AdbError::NotASymlink)?;
    if !listing::is_listing_data(&line) {
        return Err(AdbError::NotFound(path.to_string()));
    }
    let target = listing::link_target(&line).ok_or(AdbError::NotASymlink)?;
    translate_target(path, target, capacity)
}

/// The cached-or-fetched raw attribute line for a path.
///
/// `Ok(None)` means "exists, no attribute data". The fetched line is stored
/// unconditionally — even a diagnostic — so repeated queries for a missing
/// path stay cheap until the TTL expires.
pub fn raw_attr_line(
    device: &AdbDevice,
    cache: &AttrCache,
    path: &str,
) -> AdbResult<Option<String>> {
    if let Some(hit) = cache.lookup(path) {
        if hit.fresh {
            trace!(path, "attr cache hit");
            return Ok(hit.raw);
        }
    }

    let lines = device.shell_with_stderr(&format!("ls -l -a -d '{}'", escape_path(path)))?;
    let first = lines.into_iter().next().ok_or(AdbError::NoDevice)?;

    let stored = if listing::is_permission_denied(&first) {
        debug!(path, "attr fetch: permission denied, caching absent entry");
        None
    } else {
        Some(first)
    };
    cache.store(path, stored.clone());
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::FileKind;
    use crate::testing::ScriptedRunner;
    use std::sync::Arc;

    const LINE: &str = "-rw-rw-r-- root sdcard_rw 763362 2012-06-22 02:16 file.html";

    fn device(runner: &Arc<ScriptedRunner>) -> AdbDevice {
        AdbDevice::new(Arc::clone(runner) as Arc<dyn crate::CommandRunner>, None)
    }

    #[test]
    fn test_attributes_fetch_and_cache() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on("ls -l -a -d '/file.html'", &[LINE]);
        let device = device(&runner);
        let cache = AttrCache::new();

        let outcome = attributes(&device, &cache, "/file.html").unwrap();
        match outcome {
            AttrOutcome::Attrs(parsed) => {
                assert_eq!(parsed.kind, FileKind::Regular);
                assert_eq!(parsed.size, 763362);
            }
            AttrOutcome::ExistsNoData => panic!("expected attributes"),
        }

        // Second query is served from the cache: still one round trip.
        attributes(&device, &cache, "/file.html").unwrap();
        assert_eq!(runner.count_matching("ls -l -a -d"), 1);
    }

    #[test]
    fn test_no_output_means_no_device() {
        let runner = Arc::new(ScriptedRunner::new());
        let device = device(&runner);
        let cache = AttrCache::new();

        let err = attributes(&device, &cache, "/x").unwrap_err();
        assert!(matches!(err, AdbError::NoDevice));
        // Nothing observed, nothing cached.
        assert!(cache.lookup("/x").is_none());
    }

    #[test]
    fn test_permission_denied_caches_absent_entry() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            "ls -l -a -d '/sbin/healthd'",
            &["/sbin/healthd: Permission denied"],
        );
        let device = device(&runner);
        let cache = AttrCache::new();

        let outcome = attributes(&device, &cache, "/sbin/healthd").unwrap();
        assert_eq!(outcome, AttrOutcome::ExistsNoData);

        // The absent mark is cached: no second round trip.
        let outcome = attributes(&device, &cache, "/sbin/healthd").unwrap();
        assert_eq!(outcome, AttrOutcome::ExistsNoData);
        assert_eq!(runner.count_matching("ls -l -a -d"), 1);
    }

    #[test]
    fn test_unknown_diagnostic_is_not_found() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on("ls -l -a -d '/ghost'", &["/ghost: No such file or directory"]);
        let device = device(&runner);
        let cache = AttrCache::new();

        let err = attributes(&device, &cache, "/ghost").unwrap_err();
        assert!(matches!(err, AdbError::NotFound(_)));
    }

    #[test]
    fn test_read_link_translates_absolute_target() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            "ls -l -a -d '/a/b/link'",
            &["lrwxrwxrwx root root 2012-06-22 02:16 link -> /sdcard/foo"],
        );
        let device = device(&runner);
        let cache = AttrCache::new();

        let target = read_link(&device, &cache, "/a/b/link", 4096).unwrap();
        assert_eq!(target, "../../sdcard/foo");
    }

    #[test]
    fn test_read_link_on_regular_file() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on("ls -l -a -d '/file.html'", &[LINE]);
        let device = device(&runner);
        let cache = AttrCache::new();

        let err = read_link(&device, &cache, "/file.html", 4096).unwrap_err();
        assert!(matches!(err, AdbError::NotASymlink));
    }

    #[test]
    fn test_read_link_capacity() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            "ls -l -a -d '/a/b/link'",
            &["lrwxrwxrwx root root 2012-06-22 02:16 link -> /sdcard/foo"],
        );
        let device = device(&runner);
        let cache = AttrCache::new();

        let err = read_link(&device, &cache, "/a/b/link", 8).unwrap_err();
        assert!(matches!(err, AdbError::TargetTooLong { .. }));
    }

    #[test]
    fn test_escaped_path_in_command() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on("it'\\''s", &[LINE]);
        let device = device(&runner);
        let cache = AttrCache::new();

        attributes(&device, &cache, "/sdcard/it's").unwrap();
        let cmds = runner.commands();
        assert!(cmds[0].contains("'/sdcard/it'\\''s'"), "command: {}", cmds[0]);
    }
}
