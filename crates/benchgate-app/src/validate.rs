//! ValidateUseCase: parse every configured assertion without measuring.

use crate::runner::AssertionRunner;
use benchgate_config::Config;
use benchgate_error::ParseError;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidAssertion {
    pub subject: String,
    pub error: ParseError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidateOutcome {
    /// Assertions parsed, one per configured entry; repeats count again.
    pub checked: usize,
    pub invalid: Vec<InvalidAssertion>,
}

impl ValidateOutcome {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_valid() { 0 } else { 1 }
    }
}

pub struct ValidateUseCase {
    runner: AssertionRunner,
}

impl Default for ValidateUseCase {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidateUseCase {
    pub fn new() -> Self {
        Self {
            runner: AssertionRunner::new(),
        }
    }

    /// Skipped subjects are validated too: a skip is temporary, a typo is not.
    pub fn execute(&self, config: &Config) -> ValidateOutcome {
        let mut outcome = ValidateOutcome::default();
        for subject in &config.subjects {
            for expression in &subject.assertions {
                outcome.checked += 1;
                if let Err(error) = self.runner.parse(expression) {
                    debug!(subject = %subject.name, %error, "invalid assertion");
                    outcome.invalid.push(InvalidAssertion {
                        subject: subject.name.clone(),
                        error,
                    });
                }
            }
        }
        outcome
    }
}
