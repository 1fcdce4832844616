use std::time::Duration;

use thiserror::Error;

/// Faults surfaced by a [`crate::UiDriver`] implementation.
///
/// `NotFound` and `Stale` are transient by nature: during polling they mean
/// "no update yet" and "the DOM moved under us" respectively, and callers
/// retry them. The remaining variants are fatal for the current request.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("element not found")]
    NotFound,
    #[error("stale element reference")]
    Stale,
    #[error("browser session failure: {0}")]
    Session(String),
    #[error("automation backend error: {0}")]
    Backend(String),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl DriverError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DriverError::NotFound | DriverError::Stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transience_classification() {
        assert!(DriverError::NotFound.is_transient());
        assert!(DriverError::Stale.is_transient());
        assert!(!DriverError::Session("gone".into()).is_transient());
        assert!(!DriverError::Backend("boom".into()).is_transient());
        assert!(!DriverError::Timeout(Duration::from_secs(1)).is_transient());
    }
}
