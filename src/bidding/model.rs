use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Bid model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub user_id: i64,
    pub bid_amount: i64,
    // the proxy ceiling stays private to the bidder
    #[serde(skip_serializing, default)]
    pub max_auto_bid: Option<i64>,
    pub is_auto: bool,
    pub bid_time: DateTime<Utc>,
}

/// A bid about to be persisted, either from a user or generated by proxy bidding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBid {
    pub user_id: i64,
    pub bid_amount: i64,
    pub max_auto_bid: Option<i64>,
    pub is_auto: bool,
    pub bid_time: DateTime<Utc>,
}

/// Result of an accepted bid
#[derive(Debug, Clone, Serialize)]
pub struct BidOutcome {
    pub bid: Bid,
    pub auto_bids: Vec<Bid>,
    pub current_price: i64,
    pub highest_bidder_id: i64,
}

impl BidOutcome {
    /// Builds the outcome from the bids committed in one serialized section.
    /// The last committed bid is the new highest bid.
    pub fn from_committed(mut committed: Vec<Bid>) -> Option<Self> {
        if committed.is_empty() {
            return None;
        }
        let bid = committed.remove(0);
        let highest = committed.last().unwrap_or(&bid);
        let (current_price, highest_bidder_id) = (highest.bid_amount, highest.user_id);
        Some(Self {
            bid,
            auto_bids: committed,
            current_price,
            highest_bidder_id,
        })
    }
}
