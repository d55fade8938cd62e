use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::gateway::Gateway;
use crate::session::SessionManager;

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub sessions: SessionManager,
    pub gateway: Gateway,
}
