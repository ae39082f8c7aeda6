//! Meeting join flow: signal classification and the join state machine.

pub mod classifier;
pub mod join_machine;
pub mod status;

pub use classifier::classify;
pub use join_machine::{JoinMachine, JoinOptions, JoinOutcome, PhaseTimeouts};
pub use status::{JoinState, JoinStatusHandle, MeetingStatus};
