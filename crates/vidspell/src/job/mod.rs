//! Job records, their state machine and the shared registry.

pub mod events;
pub mod registry;
pub mod state;

pub use events::{JobProgressBroadcaster, JobProgressEvent};
pub use registry::{JobHandle, JobRegistry, RemoveError};
pub use state::{Job, JobPhase, JobStatus, JobView, TransitionError};
