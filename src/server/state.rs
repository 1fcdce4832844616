use std::sync::Arc;

use relay_cdp_adapter::{CdpFactory, SessionManager};

use crate::config::RelayConfig;

#[derive(Clone)]
pub(crate) struct ServeState {
    pub(crate) sessions: Arc<SessionManager<CdpFactory>>,
    pub(crate) config: Arc<RelayConfig>,
}

impl ServeState {
    pub(crate) fn new(sessions: Arc<SessionManager<CdpFactory>>, config: Arc<RelayConfig>) -> Self {
        Self { sessions, config }
    }
}
