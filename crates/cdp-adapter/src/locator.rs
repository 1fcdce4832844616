//! Priority element resolution over a [`UiDriver`].

use std::fmt;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::driver::{ElementHandle, UiDriver};
use crate::error::DriverError;

/// Interval between resolution attempts.
pub const LOCATE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Retry budget for reads that race rapid DOM rewrites.
pub const STALE_READ_RETRIES: usize = 15;
pub const STALE_READ_BACKOFF: Duration = Duration::from_millis(50);

/// One way of addressing a logical UI target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector.
    Css(String),
    /// Elements under `scope` whose rendered text contains `needle`.
    Text { scope: String, needle: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn text(scope: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Text {
            scope: scope.into(),
            needle: needle.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css:{selector}"),
            Locator::Text { scope, needle } => write!(f, "text:{scope}~{needle}"),
        }
    }
}

/// What a resolved element must satisfy before it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Present in the DOM.
    Present,
    /// Visible and enabled.
    Clickable,
}

/// Resolve a logical target from an ordered list of alternatives.
///
/// Polls every [`LOCATE_POLL_INTERVAL`] until `timeout` elapses; each pass
/// tries every alternative in declaration order and returns the first
/// element satisfying `condition`. One deadline is shared across all
/// alternatives, so the worst case is O(timeout) rather than
/// O(alternatives * timeout). Transient faults from individual attempts are
/// swallowed and retried; only deadline exhaustion yields `None`.
pub async fn locate(
    driver: &dyn UiDriver,
    alternatives: &[Locator],
    condition: Condition,
    timeout: Duration,
) -> Option<ElementHandle> {
    let deadline = Instant::now() + timeout;
    loop {
        for locator in alternatives {
            match driver.query(locator).await {
                Ok(handles) => {
                    for handle in handles {
                        match satisfies(driver, &handle, condition).await {
                            Ok(true) => return Some(handle),
                            Ok(false) => {}
                            Err(err) => {
                                debug!(%locator, %err, "condition check failed, skipping candidate");
                            }
                        }
                    }
                }
                Err(err) if err.is_transient() => {}
                Err(err) => {
                    debug!(%locator, %err, "locator attempt failed");
                }
            }
        }
        if Instant::now() >= deadline {
            debug!(?timeout, "no alternative matched within the timeout");
            return None;
        }
        sleep(LOCATE_POLL_INTERVAL).await;
    }
}

async fn satisfies(
    driver: &dyn UiDriver,
    handle: &ElementHandle,
    condition: Condition,
) -> Result<bool, DriverError> {
    match condition {
        Condition::Present => Ok(true),
        Condition::Clickable => driver.is_clickable(handle).await,
    }
}

/// Text of the most recent element matching `locator`, tolerating elements
/// that go stale mid-read during rapid DOM updates.
///
/// `Ok(None)` means there was nothing reliable to read on this attempt (no
/// matching element); the caller simply tries again on its next tick.
/// An element that stays stale through the whole retry budget surfaces
/// [`DriverError::Stale`].
pub async fn latest_text(
    driver: &dyn UiDriver,
    locator: &Locator,
) -> Result<Option<String>, DriverError> {
    for attempt in 0..STALE_READ_RETRIES {
        let handles = match driver.query(locator).await {
            Ok(handles) => handles,
            Err(DriverError::Stale) => {
                sleep(STALE_READ_BACKOFF).await;
                continue;
            }
            Err(DriverError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        let Some(last) = handles.last() else {
            return Ok(None);
        };
        match driver.text(last).await {
            Ok(text) => return Ok(Some(text)),
            Err(DriverError::Stale) => {
                debug!(attempt, "element went stale mid-read, backing off");
                sleep(STALE_READ_BACKOFF).await;
            }
            Err(DriverError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        }
    }
    Err(DriverError::Stale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Scripted driver: per-locator queues of query results and per-element
    /// text/clickability scripts.
    #[derive(Default)]
    struct FakeDriver {
        queries: Mutex<HashMap<String, VecDeque<Result<Vec<ElementHandle>, DriverError>>>>,
        clickable: Mutex<HashMap<String, bool>>,
        texts: Mutex<HashMap<String, VecDeque<Result<String, DriverError>>>>,
        query_count: Mutex<usize>,
    }

    impl FakeDriver {
        fn script_query(&self, locator: &Locator, result: Result<Vec<ElementHandle>, DriverError>) {
            self.queries
                .lock()
                .unwrap()
                .entry(locator.to_string())
                .or_default()
                .push_back(result);
        }

        fn script_text(&self, id: &str, result: Result<String, DriverError>) {
            self.texts
                .lock()
                .unwrap()
                .entry(id.to_string())
                .or_default()
                .push_back(result);
        }

        fn set_clickable(&self, id: &str, clickable: bool) {
            self.clickable
                .lock()
                .unwrap()
                .insert(id.to_string(), clickable);
        }
    }

    #[async_trait]
    impl UiDriver for FakeDriver {
        async fn navigate(&self, _url: &str) -> Result<(), DriverError> {
            Ok(())
        }

        async fn current_url(&self) -> Result<String, DriverError> {
            Ok(String::new())
        }

        async fn page_title(&self) -> Result<String, DriverError> {
            Ok(String::new())
        }

        async fn query(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError> {
            *self.query_count.lock().unwrap() += 1;
            let mut queries = self.queries.lock().unwrap();
            match queries.get_mut(&locator.to_string()) {
                // The last scripted entry is sticky so polling loops can
                // keep observing the final state.
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => match queue.front() {
                    Some(Ok(handles)) => Ok(handles.clone()),
                    Some(Err(DriverError::NotFound)) => Err(DriverError::NotFound),
                    Some(Err(DriverError::Stale)) => Err(DriverError::Stale),
                    Some(Err(err)) => Err(DriverError::Backend(err.to_string())),
                    None => Ok(Vec::new()),
                },
                None => Ok(Vec::new()),
            }
        }

        async fn text(&self, element: &ElementHandle) -> Result<String, DriverError> {
            let mut texts = self.texts.lock().unwrap();
            match texts.get_mut(&element.id) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => match queue.front() {
                    Some(Ok(text)) => Ok(text.clone()),
                    Some(Err(DriverError::Stale)) => Err(DriverError::Stale),
                    Some(Err(err)) => Err(DriverError::Backend(err.to_string())),
                    None => Ok(String::new()),
                },
                None => Ok(String::new()),
            }
        }

        async fn is_visible(&self, _element: &ElementHandle) -> Result<bool, DriverError> {
            Ok(true)
        }

        async fn is_clickable(&self, element: &ElementHandle) -> Result<bool, DriverError> {
            Ok(*self
                .clickable
                .lock()
                .unwrap()
                .get(&element.id)
                .unwrap_or(&true))
        }

        async fn click(&self, _element: &ElementHandle) -> Result<(), DriverError> {
            Ok(())
        }

        async fn clear_and_type(
            &self,
            _element: &ElementHandle,
            _text: &str,
        ) -> Result<(), DriverError> {
            Ok(())
        }

        async fn press_enter(&self, _element: &ElementHandle) -> Result<(), DriverError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), DriverError> {
            Ok(())
        }

        fn session_ref(&self) -> Option<String> {
            None
        }
    }

    fn handle(id: &str) -> ElementHandle {
        ElementHandle::new(id)
    }

    #[tokio::test]
    async fn first_declared_alternative_wins() {
        let driver = FakeDriver::default();
        let primary = Locator::css("#primary");
        let fallback = Locator::css("#fallback");
        driver.script_query(&primary, Ok(vec![handle("a")]));
        driver.script_query(&fallback, Ok(vec![handle("b")]));

        let found = locate(
            &driver,
            &[primary, fallback],
            Condition::Present,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(found, Some(handle("a")));
    }

    #[tokio::test]
    async fn transient_fault_in_early_alternative_does_not_abort_scan() {
        let driver = FakeDriver::default();
        let flaky = Locator::css("#flaky");
        let solid = Locator::css("#solid");
        driver.script_query(&flaky, Err(DriverError::Stale));
        driver.script_query(&solid, Ok(vec![handle("s")]));

        let found = locate(
            &driver,
            &[flaky, solid],
            Condition::Present,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(found, Some(handle("s")));
    }

    #[tokio::test]
    async fn clickability_condition_skips_disabled_candidates() {
        let driver = FakeDriver::default();
        let buttons = Locator::css("button");
        driver.script_query(&buttons, Ok(vec![handle("disabled"), handle("live")]));
        driver.set_clickable("disabled", false);
        driver.set_clickable("live", true);

        let found = locate(
            &driver,
            &[buttons],
            Condition::Clickable,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(found, Some(handle("live")));
    }

    #[tokio::test]
    async fn exhausted_timeout_returns_none() {
        let driver = FakeDriver::default();
        let missing = Locator::css("#missing");
        let found = locate(
            &driver,
            &[missing],
            Condition::Present,
            Duration::from_millis(50),
        )
        .await;
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn element_appearing_on_later_tick_is_found() {
        let driver = FakeDriver::default();
        let target = Locator::css("#late");
        driver.script_query(&target, Ok(Vec::new()));
        driver.script_query(&target, Ok(Vec::new()));
        driver.script_query(&target, Ok(vec![handle("late")]));

        let found = locate(
            &driver,
            &[target],
            Condition::Present,
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(found, Some(handle("late")));
    }

    #[tokio::test]
    async fn latest_text_reads_most_recent_element() {
        let driver = FakeDriver::default();
        let container = Locator::css(".message");
        driver.script_query(&container, Ok(vec![handle("old"), handle("new")]));
        driver.script_text("new", Ok("fresh text".into()));

        let text = latest_text(&driver, &container).await.unwrap();
        assert_eq!(text.as_deref(), Some("fresh text"));
    }

    #[tokio::test]
    async fn latest_text_recovers_from_stale_reads() {
        let driver = FakeDriver::default();
        let container = Locator::css(".message");
        driver.script_query(&container, Ok(vec![handle("el")]));
        for _ in 0..STALE_READ_RETRIES - 1 {
            driver.script_text("el", Err(DriverError::Stale));
        }
        driver.script_text("el", Ok("finally".into()));

        let text = latest_text(&driver, &container).await.unwrap();
        assert_eq!(text.as_deref(), Some("finally"));
    }

    #[tokio::test]
    async fn latest_text_promotes_persistent_staleness() {
        let driver = FakeDriver::default();
        let container = Locator::css(".message");
        driver.script_query(&container, Ok(vec![handle("el")]));
        for _ in 0..STALE_READ_RETRIES {
            driver.script_text("el", Err(DriverError::Stale));
        }
        driver.script_text("el", Err(DriverError::Stale));

        let err = latest_text(&driver, &container).await.unwrap_err();
        assert!(matches!(err, DriverError::Stale));
    }

    #[tokio::test]
    async fn latest_text_absence_is_not_an_error() {
        let driver = FakeDriver::default();
        let container = Locator::css(".message");
        let text = latest_text(&driver, &container).await.unwrap();
        assert_eq!(text, None);
    }
}
