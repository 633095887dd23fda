//! Auction lifecycle evaluation.
//!
//! Status is derived from the clock and the bid state whenever an auction is
//! read. The persisted status is a lower bound that is only ever moved forward,
//! so a closed auction can never reopen.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus};
use crate::bidding::model::Bid;
use crate::error::AuctionError;
use chrono::{DateTime, Utc};
use serde::Serialize;

// endregion: --- Imports

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Lifecycle {
    Scheduled,
    Open,
    Closed { resolution: Resolution },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Sold { winner_id: i64, price: i64 },
    Unsold,
}

impl Lifecycle {
    /// Persisted status matching this lifecycle state
    pub fn status(&self) -> AuctionStatus {
        match self {
            Lifecycle::Scheduled => AuctionStatus::Scheduled,
            Lifecycle::Open => AuctionStatus::Open,
            Lifecycle::Closed { .. } => AuctionStatus::Closed,
            Lifecycle::Cancelled => AuctionStatus::Cancelled,
        }
    }
}

/// Status at `now`, never behind the persisted one
pub fn phase_at(auction: &Auction, now: DateTime<Utc>) -> AuctionStatus {
    if auction.status == AuctionStatus::Cancelled {
        return AuctionStatus::Cancelled;
    }
    let derived = if now >= auction.end_time {
        AuctionStatus::Closed
    } else if now >= auction.start_time {
        AuctionStatus::Open
    } else {
        AuctionStatus::Scheduled
    };
    derived.max(auction.status)
}

pub fn evaluate(auction: &Auction, highest: Option<&Bid>, now: DateTime<Utc>) -> Lifecycle {
    match phase_at(auction, now) {
        AuctionStatus::Scheduled => Lifecycle::Scheduled,
        AuctionStatus::Open => Lifecycle::Open,
        AuctionStatus::Closed => Lifecycle::Closed {
            resolution: resolve(auction, highest),
        },
        AuctionStatus::Cancelled => Lifecycle::Cancelled,
    }
}

/// Sold when the highest bid meets the reserve
pub fn resolve(auction: &Auction, highest: Option<&Bid>) -> Resolution {
    match highest {
        Some(bid) if bid.bid_amount >= auction.min_price => Resolution::Sold {
            winner_id: bid.user_id,
            price: bid.bid_amount,
        },
        _ => Resolution::Unsold,
    }
}

/// Cancellation and deletion need a scheduled or open auction without bids
pub fn ensure_withdrawable(auction: &Auction, now: DateTime<Utc>) -> Result<(), AuctionError> {
    match phase_at(auction, now) {
        AuctionStatus::Closed => Err(AuctionError::conflict("auction already closed")),
        AuctionStatus::Cancelled => Err(AuctionError::conflict("auction already cancelled")),
        AuctionStatus::Scheduled | AuctionStatus::Open if auction.bid_count > 0 => Err(
            AuctionError::conflict(format!("auction has {} bid(s)", auction.bid_count)),
        ),
        AuctionStatus::Scheduled | AuctionStatus::Open => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn auction(start: DateTime<Utc>, end: DateTime<Utc>) -> Auction {
        Auction {
            id: 7,
            item_id: 7,
            start_price: 100,
            min_increment: 10,
            min_price: 150,
            start_time: start,
            end_time: end,
            status: AuctionStatus::Scheduled,
            highest_bid_id: None,
            bid_count: 0,
            created_at: start,
        }
    }

    fn bid(user_id: i64, amount: i64) -> Bid {
        Bid {
            id: 1,
            auction_id: 7,
            user_id,
            bid_amount: amount,
            max_auto_bid: None,
            is_auto: false,
            bid_time: Utc::now(),
        }
    }

    #[test]
    fn phases_follow_the_clock() {
        let now = Utc::now();
        let a = auction(now + Duration::minutes(5), now + Duration::minutes(10));
        assert_eq!(evaluate(&a, None, now), Lifecycle::Scheduled);
        assert_eq!(evaluate(&a, None, now + Duration::minutes(5)), Lifecycle::Open);
        assert_eq!(
            evaluate(&a, None, now + Duration::minutes(10)),
            Lifecycle::Closed {
                resolution: Resolution::Unsold
            }
        );
    }

    #[test]
    fn reserve_decides_the_resolution() {
        let now = Utc::now();
        let a = auction(now - Duration::hours(2), now - Duration::hours(1));
        assert_eq!(resolve(&a, Some(&bid(2, 140))), Resolution::Unsold);
        assert_eq!(
            resolve(&a, Some(&bid(2, 150))),
            Resolution::Sold {
                winner_id: 2,
                price: 150
            }
        );
    }

    #[test]
    fn persisted_closed_never_reopens() {
        let now = Utc::now();
        let mut a = auction(now - Duration::hours(1), now + Duration::hours(1));
        a.status = AuctionStatus::Closed;
        let highest = bid(3, 200);
        let first = evaluate(&a, Some(&highest), now);
        let again = evaluate(&a, Some(&highest), now + Duration::days(1));
        assert_eq!(first, again);
        assert!(matches!(first, Lifecycle::Closed { .. }));
    }

    #[test]
    fn cancelled_is_terminal() {
        let now = Utc::now();
        let mut a = auction(now - Duration::hours(1), now + Duration::hours(1));
        a.status = AuctionStatus::Cancelled;
        assert_eq!(evaluate(&a, None, now), Lifecycle::Cancelled);
        assert!(ensure_withdrawable(&a, now).is_err());
    }

    #[test]
    fn withdrawal_is_blocked_by_bids_or_closing() {
        let now = Utc::now();
        let mut a = auction(now - Duration::hours(1), now + Duration::hours(1));
        assert!(ensure_withdrawable(&a, now).is_ok());

        a.bid_count = 1;
        assert!(matches!(
            ensure_withdrawable(&a, now),
            Err(AuctionError::Conflict(_))
        ));

        a.bid_count = 0;
        assert!(ensure_withdrawable(&a, now + Duration::hours(2)).is_err());
    }
}
