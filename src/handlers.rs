// region:    --- Imports
use crate::alerts::commands::{
    handle_create_alert, handle_delete_alert, handle_list_alerts, CreateAlertCommand,
};
use crate::auction::commands::{
    handle_cancel_auction, handle_delete_listing, handle_post_listing, PostListingCommand,
};
use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
use crate::catalog::{self, CreateCategoryCommand};
use crate::error::AuctionError;
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::identity::Actor;
use crate::query;
use crate::state::AppState;
use crate::users::commands::{
    handle_action_logs, handle_change_role, handle_login, handle_register,
    handle_reset_password, ChangeRoleCommand, LoginCommand, RegisterCommand,
};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

// endregion: --- Imports

const BODY_LIMIT: usize = 1024 * 1024;

/// Every route of the marketplace API
pub fn routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/users", post(handle_register_user))
        .route("/login", post(handle_login_user))
        .route("/users/:id/reset-password", post(handle_reset_user_password))
        .route("/users/:id/role", post(handle_change_user_role))
        .route("/action-logs", get(handle_get_action_logs))
        .route(
            "/categories",
            get(handle_get_categories).post(handle_create_category),
        )
        .route("/auctions", get(handle_get_listings).post(handle_post_listing_request))
        .route(
            "/auctions/:id",
            get(handle_get_listing).delete(handle_delete_listing_request),
        )
        .route("/auctions/:id/cancel", post(handle_cancel_auction_request))
        .route(
            "/auctions/:id/bids",
            get(handle_get_bid_history).post(handle_bid),
        )
        .route("/auctions/:id/highest-bid", get(handle_get_highest_bid))
        .route("/alerts", get(handle_get_alerts).post(handle_create_alert_request))
        .route("/alerts/:id", delete(handle_delete_alert_request))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

// region:    --- User Handlers

pub async fn handle_register_user(
    State(state): State<AppState>,
    ValidJson(cmd): ValidJson<RegisterCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Register: {}", "Handler", cmd.username);
    let user = handle_register(&state, cmd).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn handle_login_user(
    State(state): State<AppState>,
    ValidJson(cmd): ValidJson<LoginCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Login: {}", "Handler", cmd.username);
    Ok(Json(handle_login(&state, cmd).await?))
}

pub async fn handle_reset_user_password(
    State(state): State<AppState>,
    actor: Actor,
    ValidPath(user_id): ValidPath<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Reset password of user {}", "Handler", user_id);
    Ok(Json(
        handle_reset_password(&state, &actor, user_id, Utc::now()).await?,
    ))
}

pub async fn handle_change_user_role(
    State(state): State<AppState>,
    actor: Actor,
    ValidPath(user_id): ValidPath<i64>,
    ValidJson(cmd): ValidJson<ChangeRoleCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Change role of user {}", "Handler", user_id);
    Ok(Json(
        handle_change_role(&state, &actor, user_id, cmd, Utc::now()).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ActionLogFilter {
    pub target_user_id: Option<i64>,
}

pub async fn handle_get_action_logs(
    State(state): State<AppState>,
    actor: Actor,
    ValidQuery(filter): ValidQuery<ActionLogFilter>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Action logs: {:?}", "HandlerQuery", filter);
    Ok(Json(
        handle_action_logs(&state, &actor, filter.target_user_id).await?,
    ))
}

// endregion: --- User Handlers

// region:    --- Command Handlers

pub async fn handle_create_category(
    State(state): State<AppState>,
    actor: Actor,
    ValidJson(cmd): ValidJson<CreateCategoryCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Create category: {}", "Command", cmd.name);
    let category = catalog::create_category(&state, &actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn handle_post_listing_request(
    State(state): State<AppState>,
    actor: Actor,
    ValidJson(cmd): ValidJson<PostListingCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    let posted = handle_post_listing(&state, &actor, cmd, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(posted)))
}

pub async fn handle_cancel_auction_request(
    State(state): State<AppState>,
    actor: Actor,
    ValidPath(auction_id): ValidPath<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    Ok(Json(
        handle_cancel_auction(&state, &actor, auction_id, Utc::now()).await?,
    ))
}

pub async fn handle_delete_listing_request(
    State(state): State<AppState>,
    actor: Actor,
    ValidPath(auction_id): ValidPath<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    handle_delete_listing(&state, &actor, auction_id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bid request
pub async fn handle_bid(
    State(state): State<AppState>,
    actor: Actor,
    ValidPath(auction_id): ValidPath<i64>,
    ValidJson(cmd): ValidJson<PlaceBidCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    let outcome = handle_place_bid(&state, &actor, auction_id, cmd, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn handle_create_alert_request(
    State(state): State<AppState>,
    actor: Actor,
    ValidJson(cmd): ValidJson<CreateAlertCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    let alert = handle_create_alert(&state, &actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn handle_delete_alert_request(
    State(state): State<AppState>,
    actor: Actor,
    ValidPath(alert_id): ValidPath<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    handle_delete_alert(&state, &actor, alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

pub async fn handle_get_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Categories", "HandlerQuery");
    Ok(Json(catalog::list_categories(&state).await?))
}

pub async fn handle_get_listings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> All listings", "HandlerQuery");
    Ok(Json(query::handlers::get_all_listings(&state, Utc::now()).await?))
}

pub async fn handle_get_listing(
    State(state): State<AppState>,
    ValidPath(auction_id): ValidPath<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Listing id: {}", "HandlerQuery", auction_id);
    Ok(Json(
        query::handlers::get_listing(&state, auction_id, Utc::now()).await?,
    ))
}

pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    ValidPath(auction_id): ValidPath<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Bid history id: {}", "HandlerQuery", auction_id);
    Ok(Json(query::handlers::get_bid_history(&state, auction_id).await?))
}

pub async fn handle_get_highest_bid(
    State(state): State<AppState>,
    ValidPath(auction_id): ValidPath<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    info!("{:<12} --> Highest bid id: {}", "HandlerQuery", auction_id);
    Ok(Json(query::handlers::get_highest_bid(&state, auction_id).await?))
}

pub async fn handle_get_alerts(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<impl IntoResponse, AuctionError> {
    Ok(Json(handle_list_alerts(&state, &actor).await?))
}

// endregion: --- Query Handlers
