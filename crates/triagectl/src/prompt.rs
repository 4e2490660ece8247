//! Console prompts
//!
//! Per-step yes/no confirmation and the end-of-session pause. Answers
//! `q`/`quit` cancel the rest of the pipeline through the shared token.
//!
//! Every console read goes through the one input handle held by
//! [`ConsoleConfirm`]. Stdin's lock is not re-entrant, so nothing else may
//! lock it while a `ConsoleConfirm::stdio` is alive.

use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use triage_common::confirm::{is_affirmative, is_quit, CancelToken, Confirm};
use tracing::warn;

pub struct ConsoleConfirm<R, W> {
    input: R,
    output: W,
    cancel: CancelToken,
}

impl ConsoleConfirm<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio(cancel: CancelToken) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), cancel)
    }
}

impl<R: BufRead, W: Write> ConsoleConfirm<R, W> {
    pub fn new(input: R, output: W, cancel: CancelToken) -> Self {
        Self {
            input,
            output,
            cancel,
        }
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        write!(
            self.output,
            "{}  {}? {} ",
            "?".bright_cyan().bold(),
            prompt.bright_white(),
            "[y/N/q]".dimmed()
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(answer)
    }

    /// End-of-session pause on the same input handle
    pub fn pause(&mut self) {
        wait_for_enter(&mut self.input, &mut self.output);
    }
}

impl<R: BufRead, W: Write> Confirm for ConsoleConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> bool {
        match self.ask(prompt) {
            Ok(answer) => {
                if is_quit(&answer) {
                    self.cancel.cancel();
                    let _ = writeln!(self.output, "   {}", "Remaining steps cancelled.".yellow());
                    return false;
                }
                is_affirmative(&answer)
            }
            Err(e) => {
                warn!(error = %e, "could not read confirmation, treating as no");
                false
            }
        }
    }
}

/// Block until the operator presses Enter (or input ends)
pub fn wait_for_enter<R: BufRead, W: Write>(mut input: R, mut output: W) {
    let _ = write!(output, "\nPress Enter to exit...");
    let _ = output.flush();
    let mut line = String::new();
    if let Err(e) = input.read_line(&mut line) {
        warn!(error = %e, "could not read from console");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn confirm_with(input: &str) -> (bool, CancelToken, String) {
        let cancel = CancelToken::new();
        let mut output = Vec::new();
        let result = {
            let mut console =
                ConsoleConfirm::new(Cursor::new(input.as_bytes().to_vec()), &mut output, cancel.clone());
            console.confirm("Flush DNS cache")
        };
        (result, cancel, String::from_utf8_lossy(&output).to_string())
    }

    #[test]
    fn test_yes() {
        let (ok, cancel, out) = confirm_with("y\n");
        assert!(ok);
        assert!(!cancel.is_cancelled());
        assert!(out.contains("Flush DNS cache"));
    }

    #[test]
    fn test_default_is_no() {
        let (ok, _, _) = confirm_with("\n");
        assert!(!ok);
    }

    #[test]
    fn test_eof_is_no() {
        let (ok, cancel, _) = confirm_with("");
        assert!(!ok);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_confirm_then_pause_share_input() {
        let cancel = CancelToken::new();
        let mut output = Vec::new();
        {
            let mut console = ConsoleConfirm::new(
                Cursor::new(b"y\nn\n\n".to_vec()),
                &mut output,
                cancel.clone(),
            );
            assert!(console.confirm("Flush DNS cache"));
            assert!(!console.confirm("Register DNS"));
            console.pause();
        }
        let out = String::from_utf8_lossy(&output).to_string();
        assert!(out.ends_with("Press Enter to exit..."));
    }

    #[test]
    fn test_pause_returns_at_end_of_input() {
        let mut output = Vec::new();
        wait_for_enter(Cursor::new(Vec::new()), &mut output);
        assert!(String::from_utf8_lossy(&output).contains("Press Enter"));
    }

    #[test]
    fn test_quit_cancels() {
        let (ok, cancel, out) = confirm_with("q\n");
        assert!(!ok);
        assert!(cancel.is_cancelled());
        assert!(out.contains("Remaining steps cancelled."));
    }
}
