//! Ownership and mutual exclusion for the single shared browser session.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::driver::{DriverFactory, UiDriver};
use crate::error::DriverError;

const INIT_RETRIES: usize = 3;
const INIT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Owns the process-wide browser session.
///
/// At most one query may hold the session at a time; [`SessionManager::lock`]
/// blocks until the current holder releases it. The lock is released on
/// every exit path by dropping the [`SessionLease`], so a panicking or
/// erroring query can never leave the session held.
pub struct SessionManager<F: DriverFactory> {
    factory: F,
    init_retries: usize,
    retry_delay: Duration,
    slot: Mutex<Option<Box<dyn UiDriver>>>,
}

/// Point-in-time view of the shared session, for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session exists.
    Inactive,
    /// A query currently holds the session lock.
    Busy,
    /// A retained session is idle and reachable.
    Active {
        current_url: String,
        page_title: String,
    },
    /// The retained session failed its liveness probe and was torn down.
    Stale { error: String },
}

impl<F: DriverFactory> SessionManager<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            init_retries: INIT_RETRIES,
            retry_delay: INIT_RETRY_DELAY,
            slot: Mutex::new(None),
        }
    }

    /// Override the initialization retry policy (used by tests).
    pub fn with_retry_policy(mut self, retries: usize, delay: Duration) -> Self {
        self.init_retries = retries.max(1);
        self.retry_delay = delay;
        self
    }

    /// Exclusive access to the session slot. Blocks behind any in-flight
    /// query.
    pub async fn lock(&self) -> SessionLease<'_, F> {
        SessionLease {
            factory: &self.factory,
            init_retries: self.init_retries,
            retry_delay: self.retry_delay,
            guard: self.slot.lock().await,
        }
    }

    /// Non-blocking status probe. A held lock reports `Busy` instead of
    /// waiting out the in-flight query.
    pub async fn status(&self) -> SessionStatus {
        let Ok(mut guard) = self.slot.try_lock() else {
            return SessionStatus::Busy;
        };
        let Some(driver) = guard.as_deref() else {
            return SessionStatus::Inactive;
        };
        match probe(driver).await {
            Ok((current_url, page_title)) => SessionStatus::Active {
                current_url,
                page_title,
            },
            Err(err) => {
                warn!(%err, "session failed status probe, tearing it down");
                release(&self.factory, &mut guard).await;
                SessionStatus::Stale {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Release a retained session. Returns whether one was actually held.
    pub async fn close(&self) -> bool {
        let mut lease = self.lock().await;
        let had_session = lease.is_active();
        lease.reset().await;
        had_session
    }

    /// Synchronous-on-shutdown teardown path: waits for any in-flight query
    /// to drain, then destroys the session.
    pub async fn force_reset(&self) {
        self.close().await;
    }
}

async fn probe(driver: &dyn UiDriver) -> Result<(String, String), DriverError> {
    let current_url = driver.current_url().await?;
    let page_title = driver.page_title().await.unwrap_or_default();
    Ok((current_url, page_title))
}

async fn release<F: DriverFactory>(factory: &F, guard: &mut Option<Box<dyn UiDriver>>) {
    let Some(driver) = guard.take() else {
        return;
    };
    match driver.close().await {
        Ok(()) => debug!("browser session closed"),
        Err(err) => {
            warn!(%err, "graceful shutdown failed, disposing out-of-band");
            if let Some(session_ref) = driver.session_ref() {
                if let Err(err) = factory.dispose(&session_ref).await {
                    warn!(%err, session_ref, "out-of-band disposal failed");
                }
            }
        }
    }
}

/// Scoped access to the session; dropping the lease releases the lock.
pub struct SessionLease<'a, F: DriverFactory> {
    factory: &'a F,
    init_retries: usize,
    retry_delay: Duration,
    guard: MutexGuard<'a, Option<Box<dyn UiDriver>>>,
}

impl<F: DriverFactory> SessionLease<'_, F> {
    /// Make sure a live driver is in the slot, initializing or
    /// re-initializing as needed.
    ///
    /// A new session is established with bounded retries; partial state is
    /// torn down between attempts, and exhaustion surfaces a failure
    /// carrying the last underlying error while leaving the slot unset.
    pub async fn ensure(&mut self) -> Result<(), DriverError> {
        if let Some(driver) = self.guard.as_deref() {
            match driver.current_url().await {
                Ok(_) => return Ok(()),
                Err(err) => {
                    warn!(%err, "existing session failed liveness probe, re-initializing");
                    release(self.factory, &mut self.guard).await;
                }
            }
        }

        let mut last_error = None;
        for attempt in 1..=self.init_retries {
            if self.guard.is_some() {
                release(self.factory, &mut self.guard).await;
            }
            match self.factory.connect().await {
                Ok(driver) => {
                    info!(attempt, "browser session established");
                    *self.guard = Some(driver);
                    return Ok(());
                }
                Err(err) => {
                    warn!(
                        attempt,
                        retries = self.init_retries,
                        %err,
                        "failed to initialize browser session"
                    );
                    last_error = Some(err);
                    if attempt < self.init_retries {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }

        let last = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        Err(DriverError::Session(format!(
            "failed to initialize after {} attempts: {last}",
            self.init_retries
        )))
    }

    pub fn driver(&self) -> Option<&dyn UiDriver> {
        self.guard.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }

    /// Destroy the held session: graceful shutdown, out-of-band disposal as
    /// a fallback, and the slot cleared regardless of either outcome.
    pub async fn reset(&mut self) {
        release(self.factory, &mut self.guard).await;
    }
}
