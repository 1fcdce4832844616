//! Capability traits the streaming engine consumes.

use async_trait::async_trait;

use crate::error::DriverError;
use crate::locator::Locator;

/// Opaque reference to one DOM element.
///
/// The `id` is stable for the lifetime of the node within a session (the
/// Chromium implementation derives it from the backend node id), so it can
/// be used as an identity key when counting unique elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub id: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Minimal surface of a remote browser needed to drive the notebook UI.
#[async_trait]
pub trait UiDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Address the page is currently on. Also serves as the cheap liveness
    /// probe: a dead session fails this before anything else.
    async fn current_url(&self) -> Result<String, DriverError>;

    async fn page_title(&self) -> Result<String, DriverError>;

    /// All elements matching `locator`, in document order.
    async fn query(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, DriverError>;

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    async fn is_clickable(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError>;

    async fn clear_and_type(&self, element: &ElementHandle, text: &str)
        -> Result<(), DriverError>;

    async fn press_enter(&self, element: &ElementHandle) -> Result<(), DriverError>;

    /// Graceful shutdown of the remote session.
    async fn close(&self) -> Result<(), DriverError>;

    /// Identifier usable for out-of-band disposal against the automation
    /// endpoint, when the backend has one.
    fn session_ref(&self) -> Option<String>;
}

/// Establishes and disposes of driver sessions.
#[async_trait]
pub trait DriverFactory: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn UiDriver>, DriverError>;

    /// Out-of-band teardown for a session whose graceful shutdown failed,
    /// so no orphaned remote browser lingers.
    async fn dispose(&self, session_ref: &str) -> Result<(), DriverError>;
}
