//! Commit gate: the last decision before substituted text reaches the sink
//!
//! Substitution has no side effects, so a declined commit can simply be
//! re-run later with the same result.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

pub trait CommitGate {
    /// Return `true` to write `replacements` changes to `target`
    fn approve(&mut self, target: &str, replacements: usize) -> Result<bool>;
}

/// Commits without asking (`--fix`)
pub struct AutoApprove;

impl CommitGate for AutoApprove {
    fn approve(&mut self, _target: &str, _replacements: usize) -> Result<bool> {
        Ok(true)
    }
}

/// Asks on a terminal-like stream (`--interactive`)
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> CommitGate for Prompt<R, W> {
    fn approve(&mut self, target: &str, replacements: usize) -> Result<bool> {
        write!(
            self.output,
            "Write {} replacement(s) to {}? [y/N] ",
            replacements, target
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        let read = self
            .input
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;

        // EOF counts as "no"
        if read == 0 {
            writeln!(self.output)?;
            return Ok(false);
        }

        let answer = answer.trim();
        Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(input: &str) -> (bool, String) {
        let mut out = Vec::new();
        let approved = Prompt::new(Cursor::new(input.as_bytes()), &mut out)
            .approve("notes.txt", 3)
            .unwrap();
        (approved, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_auto_approve() {
        assert!(AutoApprove.approve("notes.txt", 1).unwrap());
    }

    #[test]
    fn test_prompt_accepts_yes() {
        let (approved, prompt) = ask("y\n");
        assert!(approved);
        assert_eq!(prompt, "Write 3 replacement(s) to notes.txt? [y/N] ");

        assert!(ask("YES\n").0);
        assert!(ask("  yes  \n").0);
    }

    #[test]
    fn test_prompt_defaults_to_no() {
        assert!(!ask("\n").0);
        assert!(!ask("n\n").0);
        assert!(!ask("maybe\n").0);
    }

    #[test]
    fn test_prompt_eof_is_no() {
        let (approved, prompt) = ask("");
        assert!(!approved);
        assert!(prompt.ends_with('\n'));
    }
}
