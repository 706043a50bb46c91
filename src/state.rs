//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::auth::JwtKeys;
use crate::config::Settings;
use crate::db::DocumentStore;
use crate::mailer::Mailer;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Document store (PostgreSQL or in-memory)
    pub store: Arc<dyn DocumentStore>,

    /// Token signing keys
    pub jwt: JwtKeys,

    /// Relay for password reset mails
    pub mailer: Arc<dyn Mailer>,

    pub settings: Settings,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>, settings: Settings) -> Self {
        Self {
            store,
            jwt: JwtKeys::new(&settings.jwt),
            mailer,
            settings,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
