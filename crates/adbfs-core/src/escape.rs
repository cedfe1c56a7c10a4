//! Shell escaping for paths interpolated into remote command lines.
//!
//! Remote commands are built as `adb shell "CMD"` with paths placed inside
//! single quotes, so the only characters that can break out of the quoting
//! are the single quote itself and the double quote that closes the outer
//! `adb shell` argument. Both are plain character substitutions.

/// Escapes a remote or local path for interpolation inside a
/// single-quoted argument of an `adb shell "..."` command line.
///
/// `'` becomes `'\''` (close quote, escaped quote, reopen quote) and `"`
/// becomes `\"` so it survives the outer double-quoted shell argument.
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '\'' => out.push_str("'\\''"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}
