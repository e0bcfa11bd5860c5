use std::sync::Arc;

use crate::config::Config;
use crate::services::{QrSigner, TicketingService};
use crate::store::Store;

/// Shared state handed to every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub ticketing: TicketingService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let ticketing = TicketingService::new(store.clone(), QrSigner::new(&config.qr_secret));
        Self {
            store,
            config: Arc::new(config),
            ticketing,
        }
    }
}
