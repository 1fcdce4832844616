use relay_cdp_adapter::DriverError;
use thiserror::Error;

/// Fatal faults for one query-streaming request.
///
/// Transient polling faults never reach this type; they are swallowed and
/// retried inside the poll loop. Everything here terminates the request
/// (never the process) and is surfaced to the consumer as exactly one
/// terminal error event before cleanup.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to initialize browser: {source}")]
    SessionInit { source: DriverError },

    #[error("timed out waiting for manual login")]
    AuthTimeout,

    #[error("the notebook did not start generating a response in time")]
    NoResponse,

    #[error("could not find the {target}")]
    ElementNotFound { target: &'static str },

    #[error("response element remained stale after repeated reads")]
    StaleReference,

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("{0}")]
    Fault(String),
}
