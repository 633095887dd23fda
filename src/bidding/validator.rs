//! Bid validation and proxy bid resolution.
//!
//! Pure functions over an auction snapshot. The caller commits the returned
//! plan with a compare-and-swap on the highest-bid pointer it read, so the
//! snapshot is the state the plan is applied to.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus};
use crate::bidding::model::{Bid, NewBid};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Types
/// Why a bid was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BidRejection {
    #[error("auction cancelled")]
    Cancelled,
    #[error("auction closed")]
    Closed,
    #[error("auction not started")]
    NotStarted,
    #[error("you already hold the highest bid")]
    SelfOutbid,
    #[error("bid must be at least {minimum}")]
    TooLow { minimum: i64 },
}

impl BidRejection {
    pub fn code(&self) -> &'static str {
        match self {
            BidRejection::Cancelled => "AUCTION_CANCELLED",
            BidRejection::Closed => "ALREADY_ENDED",
            BidRejection::NotStarted => "NOT_STARTED",
            BidRejection::SelfOutbid => "SELF_OUTBID",
            BidRejection::TooLow { .. } => "LOW_BID",
        }
    }
}

/// A bid as submitted by a user
#[derive(Debug, Clone)]
pub struct BidProposal {
    pub bidder_id: i64,
    pub amount: i64,
    pub max_auto_bid: Option<i64>,
    pub submitted_at: DateTime<Utc>,
}

/// Bids to persist for an accepted proposal, in commit order.
/// The first entry is the user's bid, the rest are proxy bids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidPlan {
    pub bids: Vec<NewBid>,
}
// endregion: --- Types

// region:    --- Validation
/// Lowest amount the next bid may have
pub fn minimum_bid(auction: &Auction, highest: Option<&Bid>) -> i64 {
    match highest {
        Some(bid) => bid.bid_amount.saturating_add(auction.min_increment),
        None => auction.start_price,
    }
}

/// Validates a proposal against the auction snapshot and resolves proxy bids
pub fn evaluate_bid(
    auction: &Auction,
    highest: Option<&Bid>,
    proposal: &BidProposal,
) -> Result<BidPlan, BidRejection> {
    match auction.status {
        AuctionStatus::Cancelled => return Err(BidRejection::Cancelled),
        AuctionStatus::Closed => return Err(BidRejection::Closed),
        AuctionStatus::Scheduled | AuctionStatus::Open => {}
    }
    if proposal.submitted_at >= auction.end_time {
        return Err(BidRejection::Closed);
    }
    if proposal.submitted_at < auction.start_time {
        return Err(BidRejection::NotStarted);
    }
    if highest.is_some_and(|bid| bid.user_id == proposal.bidder_id) {
        return Err(BidRejection::SelfOutbid);
    }

    let minimum = minimum_bid(auction, highest);
    if proposal.amount < minimum {
        return Err(BidRejection::TooLow { minimum });
    }

    let challenger = NewBid {
        user_id: proposal.bidder_id,
        bid_amount: proposal.amount,
        max_auto_bid: proposal.max_auto_bid,
        is_auto: false,
        bid_time: proposal.submitted_at,
    };

    let mut bids = Vec::with_capacity(3);
    let proxies = match highest {
        Some(incumbent) => resolve_proxies(incumbent, &challenger, auction.min_increment),
        None => Vec::new(),
    };
    bids.push(challenger);
    bids.extend(proxies);

    Ok(BidPlan { bids })
}

/// Settles the contest between the outbid leader's proxy and the new bid.
///
/// The larger ceiling wins at `min(winner ceiling, loser ceiling + increment)`.
/// Equal ceilings go to the incumbent, whose ceiling was registered first.
/// Returns at most one bid per proxy holder.
fn resolve_proxies(incumbent: &Bid, challenger: &NewBid, min_increment: i64) -> Vec<NewBid> {
    let Some(incumbent_max) = incumbent.max_auto_bid else {
        return Vec::new();
    };
    if incumbent_max < challenger.bid_amount.saturating_add(min_increment) {
        return Vec::new();
    }

    let challenger_max = challenger
        .max_auto_bid
        .map_or(challenger.bid_amount, |max| max.max(challenger.bid_amount));
    let proxy = |user_id: i64, amount: i64, max_auto_bid: Option<i64>| NewBid {
        user_id,
        bid_amount: amount,
        max_auto_bid,
        is_auto: true,
        bid_time: challenger.bid_time,
    };

    let mut auto_bids = Vec::with_capacity(2);
    if incumbent_max >= challenger_max {
        let price = incumbent_max.min(challenger_max.saturating_add(min_increment));
        if challenger_max > challenger.bid_amount && challenger_max < price {
            auto_bids.push(proxy(
                challenger.user_id,
                challenger_max,
                challenger.max_auto_bid,
            ));
        }
        auto_bids.push(proxy(incumbent.user_id, price, incumbent.max_auto_bid));
    } else {
        let price = challenger_max.min(incumbent_max.saturating_add(min_increment));
        auto_bids.push(proxy(incumbent.user_id, incumbent_max, incumbent.max_auto_bid));
        auto_bids.push(proxy(challenger.user_id, price, challenger.max_auto_bid));
    }
    auto_bids
}
// endregion: --- Validation
