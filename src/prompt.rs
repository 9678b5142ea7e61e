use std::io::{self, BufRead, Write};

const OVERWRITE_PROMPT: &str = "Users table already exists, are you sure you want to overwrite? y/n: ";

/// Ask the operator whether an existing `users` table may be overwritten.
///
/// Only an exact `y` (surrounding whitespace ignored) counts as consent;
/// end of input is a refusal.
pub fn confirm_overwrite<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<bool> {
    write!(output, "{OVERWRITE_PROMPT}")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    Ok(answer.trim() == "y")
}
