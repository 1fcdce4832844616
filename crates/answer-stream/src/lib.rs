//! Query-streaming engine for the notebook relay.
//!
//! Reconstructs a clean, incremental answer stream from a DOM that is
//! rewritten unpredictably: transient thinking placeholders, partial
//! redraws and wholesale replacement, with no structured completion
//! signal. The pipeline per poll tick is raw text -> [`diff`] ->
//! [`thinking`] -> [`chunk`], with [`completion`] deciding when to stop
//! and [`orchestrator`] sequencing the whole run.

pub mod chunk;
pub mod completion;
pub mod diff;
pub mod error;
pub mod orchestrator;
pub mod selectors;
pub mod thinking;

pub use chunk::{ChunkState, CHUNK_WORD_THRESHOLD};
pub use completion::{CompletionDetector, CompletionSignal, SILENCE_TIMEOUT};
pub use diff::TextDelta;
pub use error::StreamError;
pub use orchestrator::{stream_query, stream_query_with, StreamConfig, StreamOutcome, Tuning};
