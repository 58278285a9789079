//! Process exit codes

/// Success, help, or version
pub const OK: i32 = 0;

/// Usage error, missing option, or classified failure
pub const FAILURE: i32 = 1;

/// Unexpected failure
pub const UNEXPECTED: i32 = 2;

/// How a command run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Failure,
    Unexpected,
}

impl ExitOutcome {
    pub fn code(self) -> i32 {
        match self {
            ExitOutcome::Success => OK,
            ExitOutcome::Failure => FAILURE,
            ExitOutcome::Unexpected => UNEXPECTED,
        }
    }
}
