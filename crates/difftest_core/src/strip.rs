//! Define strip-equality, the only equality the harness uses to compare program output.
//!
//! ## Notes
//! - Only leading and trailing whitespace is removed. Interior whitespace, line endings, tabs and runs of
//!   spaces are significant, so output-formatting regressions are caught.
//! - Whitespace is the C `isspace` set in the "C" locale: space, `\t`, `\n`, `\x0b`, `\x0c`, `\r`.
//! - Comparison works on raw bytes; captured output is never decoded before it is judged.

/// Check whether a byte is whitespace for strip-equality purposes.
pub fn is_strip_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

/// Remove leading and trailing whitespace bytes.
///
/// ## Returns
/// - (`&[u8]`): a subslice of `bytes`; empty if `bytes` is all whitespace.
pub fn strip(bytes: &[u8]) -> &[u8] {
    let Some(start) = bytes.iter().position(|b| !is_strip_whitespace(*b)) else {
        return &[];
    };
    // `start` exists, so a non-whitespace byte exists at or after it.
    let end = bytes.iter().rposition(|b| !is_strip_whitespace(*b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Compare two outputs under strip-equality: `strip(a) == strip(b)`.
pub fn strip_eq(a: &[u8], b: &[u8]) -> bool {
    strip(a) == strip(b)
}
