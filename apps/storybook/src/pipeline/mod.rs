// Run orchestration: the concept/validation state machine, the status
// channel the UI polls, the single-run guard and the HTTP handlers.

pub mod guard;
pub mod handlers;
pub mod orchestrator;
pub mod state_machine;
pub mod status;
