use crate::auction::lifecycle::Lifecycle;
use crate::bidding::model::Bid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Persisted auction status.
///
/// Ordered by lifecycle progression; the stored value only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Scheduled,
    Open,
    Closed,
    Cancelled,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Scheduled => "scheduled",
            AuctionStatus::Open => "open",
            AuctionStatus::Closed => "closed",
            AuctionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AuctionStatus::Closed | AuctionStatus::Cancelled)
    }
}

impl FromStr for AuctionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AuctionStatus::Scheduled),
            "open" => Ok(AuctionStatus::Open),
            "closed" => Ok(AuctionStatus::Closed),
            "cancelled" => Ok(AuctionStatus::Cancelled),
            other => Err(format!("unknown auction status: {}", other)),
        }
    }
}

/// Optional attributes for vehicle listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDetails {
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<i64>,
}

// Item model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub seller_id: i64,
    #[serde(flatten)]
    pub vehicle: VehicleDetails,
    pub post_date: DateTime<Utc>,
}

// Auction model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub id: i64,
    pub item_id: i64,
    pub start_price: i64,
    pub min_increment: i64,
    pub min_price: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AuctionStatus,
    pub highest_bid_id: Option<i64>,
    pub bid_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Item, auction and the bid the highest-bid pointer refers to
#[derive(Debug, Clone)]
pub struct Listing {
    pub item: Item,
    pub auction: Auction,
    pub highest_bid: Option<Bid>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub seller_id: i64,
    pub vehicle: VehicleDetails,
    pub post_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuction {
    pub start_price: i64,
    pub min_increment: i64,
    pub min_price: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AuctionStatus,
}

/// Read projection handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    pub auction_id: i64,
    pub item: Item,
    pub start_price: i64,
    pub min_increment: i64,
    pub min_price: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub lifecycle: Lifecycle,
    pub current_price: Option<i64>,
    pub highest_bidder_id: Option<i64>,
    pub bid_count: i64,
    pub minimum_next_bid: Option<i64>,
}

impl ListingView {
    pub fn new(listing: Listing, lifecycle: Lifecycle) -> Self {
        let minimum_next_bid = match lifecycle {
            Lifecycle::Open => Some(crate::bidding::validator::minimum_bid(
                &listing.auction,
                listing.highest_bid.as_ref(),
            )),
            _ => None,
        };
        let Listing {
            item,
            auction,
            highest_bid,
        } = listing;

        Self {
            auction_id: auction.id,
            item,
            start_price: auction.start_price,
            min_increment: auction.min_increment,
            min_price: auction.min_price,
            start_time: auction.start_time,
            end_time: auction.end_time,
            lifecycle,
            current_price: highest_bid.as_ref().map(|bid| bid.bid_amount),
            highest_bidder_id: highest_bid.as_ref().map(|bid| bid.user_id),
            bid_count: auction.bid_count,
            minimum_next_bid,
        }
    }
}

/// Listing detail with its full bid history
#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: ListingView,
    pub bids: Vec<Bid>,
}
