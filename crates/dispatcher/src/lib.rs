//! # Dispatcher
//!
//! Concurrent record dispatch.
//!
//! Responsibilities:
//! - Drain file sources into the shared publish session, one worker per task
//! - Cooperative cancellation between records
//! - Join-before-close teardown: flush then close, exactly once, after every
//!   worker has terminated

pub mod cancel;
pub mod source;
pub mod supervisor;
pub mod worker;

pub use cancel::CancelFlag;
pub use contracts::{DispatchError, RecordSource, TaskConfig};
pub use source::FileSource;
pub use supervisor::{RunSummary, Supervisor};
pub use worker::{run_worker, WorkerReport};
