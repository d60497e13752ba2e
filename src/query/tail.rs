//! Scanner for the unparsed tail of a SQL string.
//!
//! After the engine compiles the first statement out of a source string it
//! reports the remainder ("tail"). [`has_tail`] decides whether that
//! remainder contains anything beyond whitespace and comments, i.e. whether
//! a second statement is present.

/// Check whether `remainder` contains more than whitespace and comments.
///
/// Strips, in order: whitespace or `;` one byte at a time; a `--` line
/// comment through the end of the line (an unterminated line comment counts
/// as nothing more to execute); a `/*` block comment through the first `*/`
/// (likewise when unterminated). Any other content means a second statement
/// follows.
///
/// This is a prefix-driven scan, not a parser: it has no awareness of string
/// or identifier quoting, so a `--` or `/*` inside a quoted literal in the
/// tail is treated as a comment opener. Known limitation.
pub fn has_tail(remainder: &str) -> bool {
    let mut rest = remainder.as_bytes();
    loop {
        match rest {
            [] => return false,
            [b, tail @ ..] if b.is_ascii_whitespace() || *b == b';' => rest = tail,
            [b'-', b'-', tail @ ..] => match tail.iter().position(|&b| b == b'\n') {
                Some(end) => rest = &tail[end + 1..],
                None => return false,
            },
            [b'/', b'*', tail @ ..] => match tail.windows(2).position(|w| w == b"*/") {
                Some(end) => rest = &tail[end + 2..],
                None => return false,
            },
            _ => return true,
        }
    }
}
