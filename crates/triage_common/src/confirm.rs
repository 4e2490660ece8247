//! Operator confirmation and cancellation
//!
//! The remediation pipeline never reads the console itself. It asks an
//! injected [`Confirm`] capability and checks a [`CancelToken`] at every
//! step boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Yes/no gate for one remediation step
pub trait Confirm {
    /// Return true to run the step described by `prompt`
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Parse an operator answer. Only `y` and `yes` are affirmative.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Answers that ask to stop the remaining pipeline
pub fn is_quit(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit")
}

/// Cooperative cancellation flag shared between the front-end and the
/// pipeline. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
