//! User interaction operations (confirmation prompts).

use anyhow::Result;
use log::debug;

use super::RealRuntime;

use std::io::{self, BufRead, Write};

/// Reads the answer from any BufRead and writes the prompt to any Write.
/// End of input counts as "no".
pub(crate) fn confirm_with_io<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        debug!("No answer on stdin, treating as no");
        return Ok(false);
    }

    let response = line.trim().to_lowercase();
    Ok(matches!(response.as_str(), "y" | "yes"))
}

impl RealRuntime {
    pub(crate) fn confirm_impl(&self, prompt: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stdin_lock = stdin.lock();
        confirm_with_io(prompt, &mut stdin_lock, &mut stdout)
    }
}
