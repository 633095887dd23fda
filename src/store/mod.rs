//! Auction record store.
//!
//! One async trait over every persisted entity. `PostgresStore` in
//! [`crate::database`] is the production implementation, [`InMemoryStore`]
//! backs tests and local runs. Methods that touch more than one row are atomic.
// region:    --- Imports
use crate::alerts::Alert;
use crate::auction::model::{AuctionStatus, Listing, NewAuction, NewItem};
use crate::bidding::model::{Bid, NewBid};
use crate::catalog::Category;
use crate::users::model::{CustomerActionLog, NewActionLog, NewUser, Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// endregion: --- Imports

mod memory;

pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Rejected by a column constraint
    #[error("{0}")]
    Invalid(String),

    /// The highest-bid pointer moved since it was read
    #[error("stale highest bid")]
    Stale,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AuctionStore: Send + Sync {
    // users
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Replaces the credential hash and appends the audit record in one transaction
    async fn update_password(
        &self,
        user_id: i64,
        password_hash: String,
        log: NewActionLog,
    ) -> StoreResult<CustomerActionLog>;
    async fn update_role(
        &self,
        user_id: i64,
        role: Role,
        log: NewActionLog,
    ) -> StoreResult<CustomerActionLog>;
    async fn action_logs(&self, target_user_id: Option<i64>) -> StoreResult<Vec<CustomerActionLog>>;

    // categories
    async fn insert_category(&self, name: &str, parent_id: Option<i64>) -> StoreResult<Category>;
    async fn find_category(&self, category_id: i64) -> StoreResult<Option<Category>>;
    async fn find_category_by_name(
        &self,
        name: &str,
        parent_id: Option<i64>,
    ) -> StoreResult<Option<Category>>;
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    // listings
    async fn insert_listing(&self, item: NewItem, auction: NewAuction) -> StoreResult<Listing>;
    async fn find_listing(&self, auction_id: i64) -> StoreResult<Option<Listing>>;
    async fn list_listings(&self) -> StoreResult<Vec<Listing>>;
    /// Moves the persisted status forward. Returns false when it was no longer `from`.
    async fn advance_status(
        &self,
        auction_id: i64,
        from: AuctionStatus,
        to: AuctionStatus,
    ) -> StoreResult<bool>;
    /// Cancels a scheduled/open auction that has no bids, `Conflict` otherwise
    async fn cancel_auction(&self, auction_id: i64, now: DateTime<Utc>) -> StoreResult<()>;
    /// Deletes auction and item together under the same guard as cancellation
    async fn delete_listing(&self, auction_id: i64, now: DateTime<Utc>) -> StoreResult<()>;

    // bids
    async fn bids_for_auction(&self, auction_id: i64) -> StoreResult<Vec<Bid>>;
    /// Inserts `bids` in order and points the auction at the last one, provided
    /// the highest-bid pointer still equals `expected_highest` and the persisted
    /// status is not terminal. `Stale` otherwise.
    async fn commit_bids(
        &self,
        auction_id: i64,
        expected_highest: Option<i64>,
        bids: Vec<NewBid>,
    ) -> StoreResult<Vec<Bid>>;

    // alerts
    async fn insert_alert(&self, user_id: i64, keyword: &str) -> StoreResult<Alert>;
    async fn find_alert(&self, alert_id: i64) -> StoreResult<Option<Alert>>;
    async fn delete_alert(&self, alert_id: i64) -> StoreResult<()>;
    async fn alerts_for_user(&self, user_id: i64) -> StoreResult<Vec<Alert>>;
    async fn all_alerts(&self) -> StoreResult<Vec<Alert>>;
}
