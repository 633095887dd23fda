// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::auction::lifecycle::{self, Lifecycle};
use crate::auction::model::{Listing, ListingDetail, ListingView};
use crate::bidding::model::Bid;
use crate::error::AuctionError;
use crate::message_broker::publish_all;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// Evaluates the lifecycle and writes any forward transition back.
/// Only the reader that moves an auction to closed publishes the close.
pub async fn refresh_lifecycle(
    state: &AppState,
    mut listing: Listing,
    now: DateTime<Utc>,
) -> Result<(Listing, Lifecycle), AuctionError> {
    let lifecycle = lifecycle::evaluate(&listing.auction, listing.highest_bid.as_ref(), now);
    let target = lifecycle.status();
    let stored = listing.auction.status;

    if target > stored
        && state
            .store
            .advance_status(listing.auction.id, stored, target)
            .await?
    {
        info!(
            "{:<12} --> Auction {} moved {} -> {}",
            "Lifecycle",
            listing.auction.id,
            stored.as_str(),
            target.as_str()
        );
        listing.auction.status = target;
        if let Lifecycle::Closed { resolution } = lifecycle {
            publish_all(
                state.publisher.as_ref(),
                vec![AuctionEvent::AuctionClosed {
                    auction_id: listing.auction.id,
                    resolution: resolution.into(),
                    timestamp: now,
                }],
            )
            .await;
        }
    }
    Ok((listing, lifecycle))
}

async fn load(state: &AppState, auction_id: i64) -> Result<Listing, AuctionError> {
    state
        .store
        .find_listing(auction_id)
        .await?
        .ok_or_else(|| AuctionError::not_found("auction", auction_id))
}

/// All listings, newest first
pub async fn get_all_listings(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<Vec<ListingView>, AuctionError> {
    info!("{:<12} --> All listings", "Query");
    let listings = state.store.list_listings().await?;
    let mut views = Vec::with_capacity(listings.len());
    for listing in listings {
        let (listing, lifecycle) = refresh_lifecycle(state, listing, now).await?;
        views.push(ListingView::new(listing, lifecycle));
    }
    Ok(views)
}

/// Auction state with its bid history
pub async fn get_listing(
    state: &AppState,
    auction_id: i64,
    now: DateTime<Utc>,
) -> Result<ListingDetail, AuctionError> {
    info!("{:<12} --> Listing id: {}", "Query", auction_id);
    let listing = load(state, auction_id).await?;
    let (listing, lifecycle) = refresh_lifecycle(state, listing, now).await?;
    let bids = state.store.bids_for_auction(auction_id).await?;
    Ok(ListingDetail {
        listing: ListingView::new(listing, lifecycle),
        bids,
    })
}

/// Bid history, highest amount first
pub async fn get_bid_history(state: &AppState, auction_id: i64) -> Result<Vec<Bid>, AuctionError> {
    info!("{:<12} --> Bid history id: {}", "Query", auction_id);
    load(state, auction_id).await?;
    Ok(state.store.bids_for_auction(auction_id).await?)
}

/// Current highest bid
pub async fn get_highest_bid(
    state: &AppState,
    auction_id: i64,
) -> Result<Option<Bid>, AuctionError> {
    info!("{:<12} --> Highest bid id: {}", "Query", auction_id);
    Ok(load(state, auction_id).await?.highest_bid)
}

// endregion: --- Query Handlers
