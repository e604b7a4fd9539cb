//! Interactive confirmation before deleting.

use std::io::{self, BufRead, Write};

/// Prompt shown before any file is removed.
pub const PROMPT: &str = "Delete images? (y/n): ";

/// Write `prompt`, read one line, and report whether it starts with `y`
/// (case-insensitive, surrounding whitespace ignored).
///
/// End of input counts as "no".
///
/// # Errors
///
/// Propagates I/O errors from either stream.
pub fn confirm<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
    output.write_all(prompt.as_bytes())?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer
        .trim()
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'y')))
}
