// Eval run status state machine
//
// The lifecycle is deliberately loose: the guard only enforces that terminal
// runs stay terminal and that proposed statuses belong to the allowed set.

pub mod errors;
pub mod guards;
pub mod states;

pub use errors::{GuardResult, StatusTransitionError};
pub use guards::{StatusTransitionGuard, TerminalStatusPolicy};
pub use states::EvalRunStatus;
