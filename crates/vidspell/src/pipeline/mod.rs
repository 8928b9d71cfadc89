pub mod context;
pub mod error;
pub mod runner;

pub use context::PipelineContext;
pub use error::{DropReason, PipelineError, PipelineWarning};
pub use runner::Pipeline;
