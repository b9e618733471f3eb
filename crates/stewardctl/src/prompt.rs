//! Yes/no confirmation before destructive actions.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Mutex;

pub trait Confirm: Send + Sync {
    /// Ask a yes/no question; anything but an explicit yes is a no
    fn confirm(&self, prompt: &str) -> bool;
}

/// Reads the answer from stdin.
///
/// Without a terminal on stdin nobody can answer, so the answer is no.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if !io::stdin().is_terminal() || !console::user_attended_stderr() {
            return false;
        }

        eprint!("{} [y/N] ", prompt);
        if io::stderr().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input).is_err() {
            return false;
        }
        is_yes(&input)
    }
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Fixed answer, for tests and non-interactive callers. Records every
/// prompt it was asked.
pub struct AutoConfirm {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl AutoConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn yes() -> Self {
        Self::new(true)
    }

    pub fn no() -> Self {
        Self::new(false)
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Confirm for AutoConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(prompt.to_string());
        }
        self.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes("  YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_auto_confirm_records_prompts() {
        let confirm = AutoConfirm::no();
        assert!(!confirm.confirm("Remove 2 kernels?"));
        assert_eq!(confirm.asked(), vec!["Remove 2 kernels?"]);
        assert!(AutoConfirm::yes().confirm("Proceed?"));
    }
}
