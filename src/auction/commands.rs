/// Listing commands
/// 1. post an item with its auction
/// 2. cancel an auction
/// 3. delete an auction together with its item
// region:    --- Imports
use crate::alerts::match_alerts;
use crate::auction::events::AuctionEvent;
use crate::auction::lifecycle::{self, Lifecycle};
use crate::auction::model::{AuctionStatus, Listing, ListingView, NewAuction, NewItem, VehicleDetails};
use crate::catalog;
use crate::error::AuctionError;
use crate::identity::Actor;
use crate::message_broker::publish_all;
use crate::state::AppState;
use crate::users::model::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands
/// How the poster picks a category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryChoice {
    Existing { id: i64 },
    New { name: String, parent_id: Option<i64> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostListingCommand {
    pub title: String,
    pub description: String,
    pub category: CategoryChoice,
    pub start_price: i64,
    pub min_increment: i64,
    pub min_price: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(flatten)]
    pub vehicle: VehicleDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostedListing {
    pub listing: ListingView,
    pub alert_recipients: Vec<i64>,
}

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_VEHICLE_FIELD_LEN: usize = 100;

fn optional_text(value: Option<String>, field: &str) -> Result<Option<String>, AuctionError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if v.chars().count() > MAX_VEHICLE_FIELD_LEN => Err(AuctionError::validation(
            format!("{} must be at most {} characters", field, MAX_VEHICLE_FIELD_LEN),
        )),
        other => Ok(other),
    }
}

fn validate(cmd: PostListingCommand, now: DateTime<Utc>) -> Result<PostListingCommand, AuctionError> {
    let title = cmd.title.trim().to_string();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(AuctionError::validation(format!(
            "title must be 1 to {} characters",
            MAX_TITLE_LEN
        )));
    }
    let description = cmd.description.trim().to_string();
    if description.is_empty() {
        return Err(AuctionError::validation("description is required"));
    }
    if cmd.start_price <= 0 {
        return Err(AuctionError::validation("start price must be positive"));
    }
    if cmd.min_increment <= 0 {
        return Err(AuctionError::validation("minimum increment must be positive"));
    }
    if cmd.min_price < 0 {
        return Err(AuctionError::validation("reserve price must not be negative"));
    }
    if cmd.end_time <= cmd.start_time {
        return Err(AuctionError::validation("end time must be after start time"));
    }
    if cmd.end_time <= now {
        return Err(AuctionError::validation("end time must be in the future"));
    }
    if cmd.vehicle.year.is_some_and(|year| year <= 0) {
        return Err(AuctionError::validation("year must be positive"));
    }
    if cmd.vehicle.mileage.is_some_and(|mileage| mileage < 0) {
        return Err(AuctionError::validation("mileage must not be negative"));
    }

    let vehicle = VehicleDetails {
        vehicle_make: optional_text(cmd.vehicle.vehicle_make, "vehicle make")?,
        vehicle_model: optional_text(cmd.vehicle.vehicle_model, "vehicle model")?,
        year: cmd.vehicle.year,
        mileage: cmd.vehicle.mileage,
    };

    Ok(PostListingCommand {
        title,
        description,
        vehicle,
        ..cmd
    })
}

/// 1. Posts an item and its auction
pub async fn handle_post_listing(
    state: &AppState,
    actor: &Actor,
    cmd: PostListingCommand,
    now: DateTime<Utc>,
) -> Result<PostedListing, AuctionError> {
    info!(
        "{:<12} --> Post listing by user {}: {}",
        "Command", actor.user_id, cmd.title
    );
    actor.require(&[Role::Seller], "post listings")?;
    let cmd = validate(cmd, now)?;

    let category = match &cmd.category {
        CategoryChoice::Existing { id } => state
            .store
            .find_category(*id)
            .await?
            .ok_or_else(|| AuctionError::not_found("category", *id))?,
        CategoryChoice::New { name, parent_id } => {
            catalog::find_or_create(state, name, *parent_id).await?
        }
    };

    let status = if cmd.start_time <= now {
        AuctionStatus::Open
    } else {
        AuctionStatus::Scheduled
    };
    let listing = state
        .store
        .insert_listing(
            NewItem {
                title: cmd.title,
                description: cmd.description,
                category_id: category.id,
                seller_id: actor.user_id,
                vehicle: cmd.vehicle,
                post_date: now,
            },
            NewAuction {
                start_price: cmd.start_price,
                min_increment: cmd.min_increment,
                min_price: cmd.min_price,
                start_time: cmd.start_time,
                end_time: cmd.end_time,
                status,
            },
        )
        .await?;

    let alerts = state.store.all_alerts().await?;
    let recipients: Vec<i64> =
        match_alerts(&alerts, &listing.item.title, &listing.item.description)
            .into_iter()
            .collect();

    let mut events = vec![AuctionEvent::ListingPosted {
        auction_id: listing.auction.id,
        item_id: listing.item.id,
        seller_id: actor.user_id,
        timestamp: now,
    }];
    if !recipients.is_empty() {
        events.push(AuctionEvent::AlertsMatched {
            auction_id: listing.auction.id,
            item_id: listing.item.id,
            title: listing.item.title.clone(),
            user_ids: recipients.clone(),
            timestamp: now,
        });
    }
    publish_all(state.publisher.as_ref(), events).await;

    info!(
        "{:<12} --> Listing posted: auction {} item {} ({} alert match(es))",
        "Command",
        listing.auction.id,
        listing.item.id,
        recipients.len()
    );
    let lifecycle = lifecycle::evaluate(&listing.auction, None, now);
    Ok(PostedListing {
        listing: ListingView::new(listing, lifecycle),
        alert_recipients: recipients,
    })
}

async fn load_listing(state: &AppState, auction_id: i64) -> Result<Listing, AuctionError> {
    state
        .store
        .find_listing(auction_id)
        .await?
        .ok_or_else(|| AuctionError::not_found("auction", auction_id))
}

/// 2. Cancels an auction without bids (seller or admin)
pub async fn handle_cancel_auction(
    state: &AppState,
    actor: &Actor,
    auction_id: i64,
    now: DateTime<Utc>,
) -> Result<ListingView, AuctionError> {
    info!(
        "{:<12} --> Cancel auction {} by user {}",
        "Command", auction_id, actor.user_id
    );
    let mut listing = load_listing(state, auction_id).await?;
    if actor.role != Role::Admin && listing.item.seller_id != actor.user_id {
        return Err(AuctionError::forbidden(
            "only the seller or an admin may cancel this auction",
        ));
    }
    lifecycle::ensure_withdrawable(&listing.auction, now)?;
    state.store.cancel_auction(auction_id, now).await?;

    publish_all(
        state.publisher.as_ref(),
        vec![AuctionEvent::AuctionCancelled {
            auction_id,
            cancelled_by: actor.user_id,
            timestamp: now,
        }],
    )
    .await;

    listing.auction.status = AuctionStatus::Cancelled;
    Ok(ListingView::new(listing, Lifecycle::Cancelled))
}

/// 3. Deletes an auction and its item in one transaction (seller only)
pub async fn handle_delete_listing(
    state: &AppState,
    actor: &Actor,
    auction_id: i64,
    now: DateTime<Utc>,
) -> Result<(), AuctionError> {
    info!(
        "{:<12} --> Delete auction {} by user {}",
        "Command", auction_id, actor.user_id
    );
    let listing = load_listing(state, auction_id).await?;
    if listing.item.seller_id != actor.user_id {
        warn!(
            "{:<12} --> User {} is not the seller of auction {}",
            "Command", actor.user_id, auction_id
        );
        return Err(AuctionError::forbidden(
            "only the seller may delete this auction",
        ));
    }
    lifecycle::ensure_withdrawable(&listing.auction, now)?;
    state.store.delete_listing(auction_id, now).await?;

    publish_all(
        state.publisher.as_ref(),
        vec![AuctionEvent::ListingDeleted {
            auction_id,
            item_id: listing.item.id,
            timestamp: now,
        }],
    )
    .await;
    Ok(())
}

// endregion: --- Commands
