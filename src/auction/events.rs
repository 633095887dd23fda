use crate::auction::lifecycle::Resolution;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain events handed to the notification collaborator after commit
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum AuctionEvent {
    // listing posted
    ListingPosted {
        auction_id: i64,
        item_id: i64,
        seller_id: i64,
        timestamp: DateTime<Utc>,
    },
    // bid committed, user or proxy
    BidPlaced {
        auction_id: i64,
        bid_id: i64,
        bidder_id: i64,
        bid_amount: i64,
        is_auto: bool,
        timestamp: DateTime<Utc>,
    },
    // first read that observed the auction past its end time
    AuctionClosed {
        auction_id: i64,
        resolution: ResolutionRecord,
        timestamp: DateTime<Utc>,
    },
    AuctionCancelled {
        auction_id: i64,
        cancelled_by: i64,
        timestamp: DateTime<Utc>,
    },
    ListingDeleted {
        auction_id: i64,
        item_id: i64,
        timestamp: DateTime<Utc>,
    },
    // alert fan-out list for a new item
    AlertsMatched {
        auction_id: i64,
        item_id: i64,
        title: String,
        user_ids: Vec<i64>,
        timestamp: DateTime<Utc>,
    },
}

impl AuctionEvent {
    /// Aggregate the event belongs to, used as the message key
    pub fn aggregate_id(&self) -> i64 {
        match self {
            AuctionEvent::ListingPosted { auction_id, .. }
            | AuctionEvent::BidPlaced { auction_id, .. }
            | AuctionEvent::AuctionClosed { auction_id, .. }
            | AuctionEvent::AuctionCancelled { auction_id, .. }
            | AuctionEvent::ListingDeleted { auction_id, .. }
            | AuctionEvent::AlertsMatched { auction_id, .. } => *auction_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            AuctionEvent::ListingPosted { .. } => "ListingPosted",
            AuctionEvent::BidPlaced { .. } => "BidPlaced",
            AuctionEvent::AuctionClosed { .. } => "AuctionClosed",
            AuctionEvent::AuctionCancelled { .. } => "AuctionCancelled",
            AuctionEvent::ListingDeleted { .. } => "ListingDeleted",
            AuctionEvent::AlertsMatched { .. } => "AlertsMatched",
        }
    }
}

/// Serializable copy of a closed auction's resolution
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionRecord {
    Sold { winner_id: i64, price: i64 },
    Unsold,
}

impl From<Resolution> for ResolutionRecord {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Sold { winner_id, price } => ResolutionRecord::Sold { winner_id, price },
            Resolution::Unsold => ResolutionRecord::Unsold,
        }
    }
}
