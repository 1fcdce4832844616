//! Browser automation adapter for the notebook relay.
//!
//! The rest of the workspace talks to the browser exclusively through the
//! [`UiDriver`] capability trait, so the streaming engine can be exercised
//! against scripted fakes. The Chromium implementation lives in
//! [`chrome`], the shared-session resource management in [`session`].

pub mod chrome;
pub mod config;
pub mod driver;
pub mod error;
pub mod locator;
pub mod session;

pub use chrome::CdpFactory;
pub use config::DriverConfig;
pub use driver::{DriverFactory, ElementHandle, UiDriver};
pub use error::DriverError;
pub use locator::{latest_text, locate, Condition, Locator};
pub use session::{SessionLease, SessionManager, SessionStatus};
