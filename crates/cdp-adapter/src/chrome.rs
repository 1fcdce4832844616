//! Chromium DevTools implementation of the driver capability trait.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::driver::{DriverFactory, ElementHandle, UiDriver};
use crate::error::DriverError;
use crate::locator::Locator;

/// Upper bound on tracked element handles before the registry is recycled.
const MAX_TRACKED_ELEMENTS: usize = 4096;

const IS_VISIBLE_FN: &str = "function() { \
    const rect = this.getBoundingClientRect(); \
    const style = window.getComputedStyle(this); \
    return rect.width > 0 && rect.height > 0 \
        && style.visibility !== 'hidden' && style.display !== 'none'; \
}";

const IS_CLICKABLE_FN: &str = "function() { \
    const rect = this.getBoundingClientRect(); \
    const style = window.getComputedStyle(this); \
    return rect.width > 0 && rect.height > 0 \
        && style.visibility !== 'hidden' && style.display !== 'none' \
        && !this.disabled; \
}";

const CLEAR_VALUE_FN: &str = "function() { \
    if ('value' in this) { \
        this.value = ''; \
        this.dispatchEvent(new Event('input', { bubbles: true })); \
    } else { \
        this.textContent = ''; \
    } \
}";

/// How a handle was obtained, so the element can be re-resolved for each
/// operation. DevTools object references are not stable across the rapid
/// rewrites this UI performs; re-resolving and checking the backend node id
/// turns a vanished element into a clean `Stale` instead of a dangling
/// protocol reference.
#[derive(Debug, Clone)]
struct TrackedElement {
    locator: Locator,
    index: usize,
}

/// Driver backed by one Chromium page over the DevTools protocol.
pub struct CdpDriver {
    browser: Mutex<Browser>,
    page: Page,
    elements: DashMap<String, TrackedElement>,
    handler_task: JoinHandle<()>,
    launched: bool,
}

impl CdpDriver {
    fn element_id(element: &Element) -> String {
        format!("node-{}", element.backend_node_id.inner())
    }

    async fn find_raw(&self, locator: &Locator) -> Result<Vec<Element>, DriverError> {
        match locator {
            Locator::Css(selector) => self
                .page
                .find_elements(selector.as_str())
                .await
                .map_err(classify),
            Locator::Text { scope, needle } => {
                let mut matched = Vec::new();
                for element in self
                    .page
                    .find_elements(scope.as_str())
                    .await
                    .map_err(classify)?
                {
                    let text = element.inner_text().await.ok().flatten().unwrap_or_default();
                    if text.contains(needle.as_str()) {
                        matched.push(element);
                    }
                }
                Ok(matched)
            }
        }
    }

    /// Re-resolve a handle to a live element, verifying it is still the
    /// same node.
    async fn resolve(&self, handle: &ElementHandle) -> Result<Element, DriverError> {
        let tracked = self
            .elements
            .get(&handle.id)
            .map(|entry| entry.value().clone())
            .ok_or(DriverError::Stale)?;
        let found = self.find_raw(&tracked.locator).await?;
        let element = found
            .into_iter()
            .nth(tracked.index)
            .ok_or(DriverError::Stale)?;
        if Self::element_id(&element) != handle.id {
            return Err(DriverError::Stale);
        }
        Ok(element)
    }

    async fn bool_js(&self, handle: &ElementHandle, body: &str) -> Result<bool, DriverError> {
        let element = self.resolve(handle).await?;
        let returns = element.call_js_fn(body, false).await.map_err(classify)?;
        Ok(returns
            .result
            .value
            .as_ref()
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }
}

#[async_trait]
impl UiDriver for CdpDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.page.goto(url).await.map_err(classify)?;
        // Handles from the previous document are meaningless now.
        self.elements.clear();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.page.url().await.map_err(classify)?.unwrap_or_default())
    }

    async fn page_title(&self) -> Result<String, DriverError> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(classify)?
            .unwrap_or_default())
    }

    async fn query(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError> {
        let found = self.find_raw(locator).await?;
        if self.elements.len() > MAX_TRACKED_ELEMENTS {
            self.elements.clear();
        }
        let mut handles = Vec::with_capacity(found.len());
        for (index, element) in found.iter().enumerate() {
            let id = Self::element_id(element);
            self.elements.insert(
                id.clone(),
                TrackedElement {
                    locator: locator.clone(),
                    index,
                },
            );
            handles.push(ElementHandle::new(id));
        }
        Ok(handles)
    }

    async fn text(&self, handle: &ElementHandle) -> Result<String, DriverError> {
        let element = self.resolve(handle).await?;
        Ok(element
            .inner_text()
            .await
            .map_err(classify)?
            .unwrap_or_default())
    }

    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, DriverError> {
        self.bool_js(handle, IS_VISIBLE_FN).await
    }

    async fn is_clickable(&self, handle: &ElementHandle) -> Result<bool, DriverError> {
        self.bool_js(handle, IS_CLICKABLE_FN).await
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), DriverError> {
        let element = self.resolve(handle).await?;
        element.click().await.map_err(classify)?;
        Ok(())
    }

    async fn clear_and_type(&self, handle: &ElementHandle, text: &str) -> Result<(), DriverError> {
        let element = self.resolve(handle).await?;
        element.click().await.map_err(classify)?;
        element
            .call_js_fn(CLEAR_VALUE_FN, false)
            .await
            .map_err(classify)?;
        element.type_str(text).await.map_err(classify)?;
        Ok(())
    }

    async fn press_enter(&self, handle: &ElementHandle) -> Result<(), DriverError> {
        let element = self.resolve(handle).await?;
        element.press_key("Enter").await.map_err(classify)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let result = {
            let mut browser = self.browser.lock().await;
            match browser.close().await.map_err(classify) {
                Ok(_) => {
                    if self.launched {
                        let _ = browser.wait().await;
                    }
                    Ok(())
                }
                Err(err) => Err(err),
            }
        };
        self.handler_task.abort();
        result
    }

    fn session_ref(&self) -> Option<String> {
        Some(self.page.target_id().inner().clone())
    }
}

/// Connects to a remote DevTools endpoint, or launches a local Chromium
/// when none is configured.
pub struct CdpFactory {
    config: DriverConfig,
    http: reqwest::Client,
}

impl CdpFactory {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn resolve_ws_url(&self, endpoint: &str) -> Result<String, DriverError> {
        if endpoint.starts_with("ws") {
            return Ok(endpoint.to_string());
        }
        // An http endpoint advertises its debugger url on /json/version.
        let url = format!("{}/json/version", endpoint.trim_end_matches('/'));
        let version: serde_json::Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| DriverError::Session(format!("automation endpoint unreachable: {err}")))?
            .json()
            .await
            .map_err(|err| DriverError::Session(format!("bad version payload: {err}")))?;
        version
            .get("webSocketDebuggerUrl")
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                DriverError::Session("endpoint did not advertise a debugger url".into())
            })
    }

    fn launch_config(&self) -> Result<BrowserConfig, DriverError> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.config.window_width, self.config.window_height)
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-infobars")
            .arg("--disable-extensions")
            .arg("--disable-gpu")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--start-maximized");
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &self.config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(agent) = &self.config.user_agent {
            builder = builder.arg(format!("--user-agent={agent}"));
        }
        builder.build().map_err(DriverError::Backend)
    }
}

#[async_trait]
impl DriverFactory for CdpFactory {
    async fn connect(&self) -> Result<Box<dyn UiDriver>, DriverError> {
        let (browser, mut handler, launched) = match &self.config.endpoint {
            Some(endpoint) => {
                info!(endpoint, "connecting to remote automation endpoint");
                let ws_url = self.resolve_ws_url(endpoint).await?;
                let (browser, handler) = Browser::connect(ws_url).await.map_err(classify)?;
                (browser, handler, false)
            }
            None => {
                info!(headless = self.config.headless, "launching local browser");
                let (browser, handler) = Browser::launch(self.launch_config()?)
                    .await
                    .map_err(classify)?;
                (browser, handler, true)
            }
        };
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });
        let page = match browser.new_page("about:blank").await.map_err(classify) {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                return Err(err);
            }
        };
        debug!("browser session ready");
        Ok(Box::new(CdpDriver {
            browser: Mutex::new(browser),
            page,
            elements: DashMap::new(),
            handler_task,
            launched,
        }))
    }

    async fn dispose(&self, session_ref: &str) -> Result<(), DriverError> {
        let Some(endpoint) = &self.config.endpoint else {
            return Err(DriverError::Backend(
                "no remote endpoint configured for out-of-band disposal".into(),
            ));
        };
        let url = format!(
            "{}/json/close/{session_ref}",
            endpoint.trim_end_matches('/')
        );
        warn!(%url, "disposing browser target out-of-band");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| DriverError::Backend(err.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DriverError::Backend(format!(
                "close endpoint returned {}",
                response.status()
            )))
        }
    }
}

fn classify(err: CdpError) -> DriverError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("could not find node")
        || lower.contains("no node found")
        || lower.contains("node with given id")
        || lower.contains("detached")
    {
        DriverError::Stale
    } else if lower.contains("no such element") || lower.contains("element not found") {
        DriverError::NotFound
    } else if lower.contains("connection")
        || lower.contains("websocket")
        || lower.contains("channel closed")
        || lower.contains("browser closed")
    {
        DriverError::Session(message)
    } else {
        DriverError::Backend(message)
    }
}
