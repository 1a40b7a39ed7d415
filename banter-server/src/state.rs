use std::sync::Arc;

use banter_relay::CompletionClient;
use banter_store::SessionStore;

/// Shared state handed to every handler
///
/// Built once at startup; axum clones it per request. The store handle is
/// the only shared resource and lives for the process lifetime.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub relay: Arc<CompletionClient>,
}
