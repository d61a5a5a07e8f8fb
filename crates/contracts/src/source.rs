//! RecordSource trait - record source abstraction
//!
//! Defines a unified interface for line-oriented record sources, decoupling
//! dispatch workers from concrete source implementations. A source is lazy,
//! finite, and restartable per open.

use crate::DispatchError;

/// Record source trait
///
/// One source is owned and drained entirely by one dispatch worker.
#[trait_variant::make(RecordSource: Send)]
pub trait LocalRecordSource {
    /// Where the records come from, e.g. a file path (used for logging)
    fn origin(&self) -> &str;

    /// Pull the next record line, `None` once the source is exhausted
    ///
    /// # Errors
    /// Returns `SourceRead` with the origin and underlying cause
    async fn next_line(&mut self) -> Result<Option<String>, DispatchError>;
}
