use crate::message_broker::{EventPublisher, InMemoryEventPublisher};
use crate::store::{AuctionStore, InMemoryStore};
use std::sync::Arc;

pub const DEFAULT_MAX_BID_RETRIES: u32 = 100;

/// Collaborators shared by every command and handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuctionStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub max_bid_retries: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn AuctionStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            max_bid_retries: DEFAULT_MAX_BID_RETRIES,
        }
    }

    pub fn with_max_bid_retries(mut self, retries: u32) -> Self {
        self.max_bid_retries = retries.max(1);
        self
    }

    /// State backed by the in-memory store, with a handle on the published events
    pub fn in_memory() -> (Self, Arc<InMemoryEventPublisher>) {
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let state = Self::new(Arc::new(InMemoryStore::new()), publisher.clone());
        (state, publisher)
    }
}
