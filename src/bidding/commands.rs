/// Bid command handling
/// 1. validate the proposal against a fresh snapshot
/// 2. commit the plan with a compare-and-swap on the highest-bid pointer
/// 3. retry from 1 when another bid won the race
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::bidding::model::{Bid, BidOutcome};
use crate::bidding::validator::{evaluate_bid, BidProposal};
use crate::error::AuctionError;
use crate::identity::Actor;
use crate::message_broker::publish_all;
use crate::state::AppState;
use crate::store::StoreError;
use crate::users::model::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands
/// Bid request
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub bid_amount: i64,
    pub max_auto_bid: Option<i64>,
}

fn validate(cmd: &PlaceBidCommand) -> Result<(), AuctionError> {
    if cmd.bid_amount <= 0 {
        return Err(AuctionError::validation("bid amount must be positive"));
    }
    if let Some(max) = cmd.max_auto_bid {
        if max < cmd.bid_amount {
            return Err(AuctionError::validation(
                "max auto bid must not be below the bid amount",
            ));
        }
    }
    Ok(())
}

/// Places a bid on an auction
pub async fn handle_place_bid(
    state: &AppState,
    actor: &Actor,
    auction_id: i64,
    cmd: PlaceBidCommand,
    now: DateTime<Utc>,
) -> Result<BidOutcome, AuctionError> {
    info!(
        "{:<12} --> Bid on auction {} by user {}: {:?}",
        "Command", auction_id, actor.user_id, cmd
    );
    actor.require(&[Role::Buyer, Role::Seller], "place bids")?;
    validate(&cmd)?;

    let proposal = BidProposal {
        bidder_id: actor.user_id,
        amount: cmd.bid_amount,
        max_auto_bid: cmd.max_auto_bid,
        submitted_at: now,
    };

    for attempt in 1..=state.max_bid_retries {
        let listing = state
            .store
            .find_listing(auction_id)
            .await?
            .ok_or_else(|| AuctionError::not_found("auction", auction_id))?;

        if listing.item.seller_id == actor.user_id {
            return Err(AuctionError::forbidden(
                "sellers cannot bid on their own auction",
            ));
        }

        let plan = evaluate_bid(&listing.auction, listing.highest_bid.as_ref(), &proposal)
            .map_err(|rejection| {
                info!(
                    "{:<12} --> Bid rejected on auction {}: {}",
                    "Command", auction_id, rejection
                );
                AuctionError::BidRejected(rejection)
            })?;

        match state
            .store
            .commit_bids(auction_id, listing.auction.highest_bid_id, plan.bids)
            .await
        {
            Ok(committed) => {
                publish_all(state.publisher.as_ref(), bid_events(&committed)).await;
                let outcome = BidOutcome::from_committed(committed)
                    .ok_or_else(|| AuctionError::Internal("no bid committed".to_string()))?;
                info!(
                    "{:<12} --> Bid accepted on auction {}: current price {} (user {})",
                    "Command", auction_id, outcome.current_price, outcome.highest_bidder_id
                );
                return Ok(outcome);
            }
            Err(StoreError::Stale) => {
                warn!(
                    "{:<12} --> Highest bid moved on auction {}, retry {}",
                    "Command", auction_id, attempt
                );
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AuctionError::conflict(
        "too many concurrent bids, please try again",
    ))
}

fn bid_events(committed: &[Bid]) -> Vec<AuctionEvent> {
    committed
        .iter()
        .map(|bid| AuctionEvent::BidPlaced {
            auction_id: bid.auction_id,
            bid_id: bid.id,
            bidder_id: bid.user_id,
            bid_amount: bid.bid_amount,
            is_auto: bid.is_auto,
            timestamp: bid.bid_time,
        })
        .collect()
}

// endregion: --- Commands
