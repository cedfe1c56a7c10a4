//! Symlink target translation.
//!
//! Remote link targets that are absolute are absolute *on the device*. The
//! mount point is itself rooted at the device's root, so an absolute target
//! is re-anchored by climbing back up from the link's parent directory to
//! the mount root with `../` segments. Relative targets need no rewriting.

use crate::error::{AdbError, AdbResult};

/// Translates a raw link target for a readlink on `request_path`.
///
/// The request path contributes only its separator count: one directory
/// level per separator, minus one for the final segment, which is the
/// link's own name rather than a level. The translated result (including
/// any `../` prefix) must fit `capacity` bytes or the call fails with
/// [`AdbError::TargetTooLong`].
pub fn translate_target(request_path: &str, target: &str, capacity: usize) -> AdbResult<String> {
    let mut levels = request_path.matches('/').count();
    if levels >= 1 {
        levels -= 1;
    }

    let translated = if target.starts_with('/') {
        let stripped = target.trim_start_matches('/');
        let mut out = String::with_capacity(3 * levels + stripped.len());
        for _ in 0..levels {
            out.push_str("../");
        }
        out.push_str(stripped);
        out
    } else {
        target.to_string()
    };

    if translated.len() >= capacity {
        return Err(AdbError::TargetTooLong {
            needed: translated.len() + 1,
            capacity,
        });
    }
    Ok(translated)
}
