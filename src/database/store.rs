// region:    --- Imports
use super::queries;
use crate::alerts::Alert;
use crate::auction::model::{
    Auction, AuctionStatus, Item, Listing, NewAuction, NewItem, VehicleDetails,
};
use crate::bidding::model::{Bid, NewBid};
use crate::catalog::Category;
use crate::store::{AuctionStore, StoreError, StoreResult};
use crate::users::model::{CustomerActionLog, NewActionLog, NewUser, Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tracing::debug;

// endregion: --- Imports

/// Postgres-backed record store
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn auction_exists(&self, auction_id: i64) -> StoreResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(queries::AUCTION_EXISTS)
            .bind(auction_id)
            .fetch_one(&*self.pool)
            .await?)
    }

    /// Locks a withdrawable auction and returns its item id
    async fn lock_withdrawable(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        auction_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<i64> {
        let item_id = sqlx::query_scalar::<_, i64>(queries::LOCK_WITHDRAWABLE_AUCTION)
            .bind(auction_id)
            .bind(now)
            .fetch_optional(&mut **tx)
            .await?;
        match item_id {
            Some(item_id) => Ok(item_id),
            None if self.auction_exists(auction_id).await? => Err(StoreError::Conflict(
                "auction can no longer be withdrawn".to_string(),
            )),
            None => Err(StoreError::NotFound(format!("auction {}", auction_id))),
        }
    }
}

// region:    --- Rows
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>().map_err(decode_error)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    auction_id: i64,
    item_id: i64,
    start_price: i64,
    min_increment: i64,
    min_price: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    highest_bid_id: Option<i64>,
    bid_count: i64,
    created_at: DateTime<Utc>,
    title: String,
    description: String,
    category_id: i64,
    seller_id: i64,
    vehicle_make: Option<String>,
    vehicle_model: Option<String>,
    year: Option<i32>,
    mileage: Option<i64>,
    post_date: DateTime<Utc>,
    // highest bid, absent before the first bid
    bid_id: Option<i64>,
    bid_user_id: Option<i64>,
    bid_amount: Option<i64>,
    max_auto_bid: Option<i64>,
    is_auto: Option<bool>,
    bid_time: Option<DateTime<Utc>>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let highest_bid = match (
            row.bid_id,
            row.bid_user_id,
            row.bid_amount,
            row.is_auto,
            row.bid_time,
        ) {
            (Some(id), Some(user_id), Some(bid_amount), Some(is_auto), Some(bid_time)) => {
                Some(Bid {
                    id,
                    auction_id: row.auction_id,
                    user_id,
                    bid_amount,
                    max_auto_bid: row.max_auto_bid,
                    is_auto,
                    bid_time,
                })
            }
            _ => None,
        };

        Ok(Listing {
            item: Item {
                id: row.item_id,
                title: row.title,
                description: row.description,
                category_id: row.category_id,
                seller_id: row.seller_id,
                vehicle: VehicleDetails {
                    vehicle_make: row.vehicle_make,
                    vehicle_model: row.vehicle_model,
                    year: row.year,
                    mileage: row.mileage,
                },
                post_date: row.post_date,
            },
            auction: Auction {
                id: row.auction_id,
                item_id: row.item_id,
                start_price: row.start_price,
                min_increment: row.min_increment,
                min_price: row.min_price,
                start_time: row.start_time,
                end_time: row.end_time,
                status: row.status.parse::<AuctionStatus>().map_err(decode_error)?,
                highest_bid_id: row.highest_bid_id,
                bid_count: row.bid_count,
                created_at: row.created_at,
            },
            highest_bid,
        })
    }
}

fn decode_error(msg: String) -> StoreError {
    StoreError::Database(sqlx::Error::Decode(msg.into()))
}

/// Maps constraint violations onto store errors
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            // unique_violation
            Some("23505") => return StoreError::Conflict("record already exists".to_string()),
            // foreign_key_violation
            Some("23503") => {
                return StoreError::NotFound("referenced record".to_string());
            }
            // check_violation
            Some("23514") => return StoreError::Conflict(db.message().to_string()),
            // string_data_right_truncation
            Some("22001") => return StoreError::Invalid(db.message().to_string()),
            _ => {}
        }
    }
    StoreError::Database(err)
}

// endregion: --- Rows

#[async_trait]
impl AuctionStore for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(queries::INSERT_USER)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| match map_db_error(e) {
                StoreError::Conflict(_) => {
                    StoreError::Conflict("username or email already registered".to_string())
                }
                other => other,
            })?;
        row.try_into()
    }

    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(queries::GET_USER)
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(queries::GET_USER_BY_USERNAME)
            .bind(username)
            .fetch_optional(&*self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update_password(
        &self,
        user_id: i64,
        password_hash: String,
        log: NewActionLog,
    ) -> StoreResult<CustomerActionLog> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(queries::UPDATE_PASSWORD)
            .bind(user_id)
            .bind(&password_hash)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        let entry = insert_action_log(&mut tx, log).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn update_role(
        &self,
        user_id: i64,
        role: Role,
        log: NewActionLog,
    ) -> StoreResult<CustomerActionLog> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(queries::UPDATE_ROLE)
            .bind(user_id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        let entry = insert_action_log(&mut tx, log).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn action_logs(&self, target_user_id: Option<i64>) -> StoreResult<Vec<CustomerActionLog>> {
        Ok(
            sqlx::query_as::<_, CustomerActionLog>(queries::GET_ACTION_LOGS)
                .bind(target_user_id)
                .fetch_all(&*self.pool)
                .await?,
        )
    }

    async fn insert_category(&self, name: &str, parent_id: Option<i64>) -> StoreResult<Category> {
        sqlx::query_as::<_, Category>(queries::INSERT_CATEGORY)
            .bind(name)
            .bind(parent_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| match map_db_error(e) {
                StoreError::Conflict(_) => {
                    StoreError::Conflict(format!("category '{}' already exists", name))
                }
                StoreError::NotFound(_) => {
                    StoreError::NotFound(format!("category {}", parent_id.unwrap_or_default()))
                }
                other => other,
            })
    }

    async fn find_category(&self, category_id: i64) -> StoreResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(queries::GET_CATEGORY)
            .bind(category_id)
            .fetch_optional(&*self.pool)
            .await?)
    }

    async fn find_category_by_name(
        &self,
        name: &str,
        parent_id: Option<i64>,
    ) -> StoreResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(queries::GET_CATEGORY_BY_NAME)
            .bind(name)
            .bind(parent_id)
            .fetch_optional(&*self.pool)
            .await?)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>(queries::GET_ALL_CATEGORIES)
            .fetch_all(&*self.pool)
            .await?)
    }

    async fn insert_listing(&self, item: NewItem, auction: NewAuction) -> StoreResult<Listing> {
        let mut tx = self.pool.begin().await?;

        let item_id = sqlx::query_scalar::<_, i64>(queries::INSERT_ITEM)
            .bind(&item.title)
            .bind(&item.description)
            .bind(item.category_id)
            .bind(item.seller_id)
            .bind(&item.vehicle.vehicle_make)
            .bind(&item.vehicle.vehicle_model)
            .bind(item.vehicle.year)
            .bind(item.vehicle.mileage)
            .bind(item.post_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let auction_id = sqlx::query_scalar::<_, i64>(queries::INSERT_AUCTION)
            .bind(item_id)
            .bind(auction.start_price)
            .bind(auction.min_increment)
            .bind(auction.min_price)
            .bind(auction.start_time)
            .bind(auction.end_time)
            .bind(auction.status.as_str())
            .bind(item.post_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await?;
        debug!(
            "{:<12} --> Listing stored: item {} auction {}",
            "Database", item_id, auction_id
        );

        Ok(Listing {
            item: Item {
                id: item_id,
                title: item.title,
                description: item.description,
                category_id: item.category_id,
                seller_id: item.seller_id,
                vehicle: item.vehicle,
                post_date: item.post_date,
            },
            auction: Auction {
                id: auction_id,
                item_id,
                start_price: auction.start_price,
                min_increment: auction.min_increment,
                min_price: auction.min_price,
                start_time: auction.start_time,
                end_time: auction.end_time,
                status: auction.status,
                highest_bid_id: None,
                bid_count: 0,
                created_at: item.post_date,
            },
            highest_bid: None,
        })
    }

    async fn find_listing(&self, auction_id: i64) -> StoreResult<Option<Listing>> {
        sqlx::query_as::<_, ListingRow>(&queries::get_listing())
            .bind(auction_id)
            .fetch_optional(&*self.pool)
            .await?
            .map(Listing::try_from)
            .transpose()
    }

    async fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        sqlx::query_as::<_, ListingRow>(&queries::get_all_listings())
            .fetch_all(&*self.pool)
            .await?
            .into_iter()
            .map(Listing::try_from)
            .collect()
    }

    async fn advance_status(
        &self,
        auction_id: i64,
        from: AuctionStatus,
        to: AuctionStatus,
    ) -> StoreResult<bool> {
        if to <= from {
            return Ok(false);
        }
        let updated = sqlx::query(queries::ADVANCE_STATUS)
            .bind(auction_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&*self.pool)
            .await?;
        if updated.rows_affected() > 0 {
            return Ok(true);
        }
        if self.auction_exists(auction_id).await? {
            Ok(false)
        } else {
            Err(StoreError::NotFound(format!("auction {}", auction_id)))
        }
    }

    async fn cancel_auction(&self, auction_id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        self.lock_withdrawable(&mut tx, auction_id, now).await?;
        sqlx::query(queries::CANCEL_AUCTION)
            .bind(auction_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_listing(&self, auction_id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let item_id = self.lock_withdrawable(&mut tx, auction_id, now).await?;
        sqlx::query(queries::DELETE_ITEM)
            .bind(item_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await?;
        Ok(())
    }

    async fn bids_for_auction(&self, auction_id: i64) -> StoreResult<Vec<Bid>> {
        Ok(sqlx::query_as::<_, Bid>(queries::GET_BID_HISTORY)
            .bind(auction_id)
            .fetch_all(&*self.pool)
            .await?)
    }

    async fn commit_bids(
        &self,
        auction_id: i64,
        expected_highest: Option<i64>,
        bids: Vec<NewBid>,
    ) -> StoreResult<Vec<Bid>> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, i64>(queries::LOCK_AUCTION_FOR_BID)
            .bind(auction_id)
            .bind(expected_highest)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return if self.auction_exists(auction_id).await? {
                Err(StoreError::Stale)
            } else {
                Err(StoreError::NotFound(format!("auction {}", auction_id)))
            };
        }

        let mut committed = Vec::with_capacity(bids.len());
        for bid in bids {
            let bid = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
                .bind(auction_id)
                .bind(bid.user_id)
                .bind(bid.bid_amount)
                .bind(bid.max_auto_bid)
                .bind(bid.is_auto)
                .bind(bid.bid_time)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| match map_db_error(e) {
                    StoreError::NotFound(_) => {
                        StoreError::NotFound(format!("user {}", bid.user_id))
                    }
                    other => other,
                })?;
            committed.push(bid);
        }

        if let Some(last) = committed.last() {
            sqlx::query(queries::UPDATE_HIGHEST_BID)
                .bind(auction_id)
                .bind(last.id)
                .bind(committed.len() as i64)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(committed)
    }

    async fn insert_alert(&self, user_id: i64, keyword: &str) -> StoreResult<Alert> {
        sqlx::query_as::<_, Alert>(queries::INSERT_ALERT)
            .bind(user_id)
            .bind(keyword)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| match map_db_error(e) {
                StoreError::NotFound(_) => StoreError::NotFound(format!("user {}", user_id)),
                other => other,
            })
    }

    async fn find_alert(&self, alert_id: i64) -> StoreResult<Option<Alert>> {
        Ok(sqlx::query_as::<_, Alert>(queries::GET_ALERT)
            .bind(alert_id)
            .fetch_optional(&*self.pool)
            .await?)
    }

    async fn delete_alert(&self, alert_id: i64) -> StoreResult<()> {
        let deleted = sqlx::query(queries::DELETE_ALERT)
            .bind(alert_id)
            .execute(&*self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("alert {}", alert_id)));
        }
        Ok(())
    }

    async fn alerts_for_user(&self, user_id: i64) -> StoreResult<Vec<Alert>> {
        Ok(sqlx::query_as::<_, Alert>(queries::GET_USER_ALERTS)
            .bind(user_id)
            .fetch_all(&*self.pool)
            .await?)
    }

    async fn all_alerts(&self) -> StoreResult<Vec<Alert>> {
        Ok(sqlx::query_as::<_, Alert>(queries::GET_ALL_ALERTS)
            .fetch_all(&*self.pool)
            .await?)
    }
}

async fn insert_action_log(
    tx: &mut Transaction<'_, Postgres>,
    log: NewActionLog,
) -> StoreResult<CustomerActionLog> {
    sqlx::query_as::<_, CustomerActionLog>(queries::INSERT_ACTION_LOG)
        .bind(log.rep_id)
        .bind(log.action_type)
        .bind(log.action_time)
        .bind(log.target_user_id)
        .bind(&log.details)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_db_error)
}
