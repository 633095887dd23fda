use super::{AuctionStore, StoreError, StoreResult};
use crate::alerts::Alert;
use crate::auction::model::{Auction, AuctionStatus, Item, Listing, NewAuction, NewItem};
use crate::bidding::model::{Bid, NewBid};
use crate::catalog::Category;
use crate::users::model::{CustomerActionLog, NewActionLog, NewUser, Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory record store.
///
/// Every method runs under one lock, which makes each call a transaction.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    sequence: i64,
    users: BTreeMap<i64, User>,
    action_logs: Vec<CustomerActionLog>,
    categories: BTreeMap<i64, Category>,
    items: BTreeMap<i64, Item>,
    auctions: BTreeMap<i64, Auction>,
    bids: BTreeMap<i64, Bid>,
    alerts: BTreeMap<i64, Alert>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn listing(&self, auction: &Auction) -> Option<Listing> {
        let item = self.items.get(&auction.item_id)?.clone();
        let highest_bid = auction
            .highest_bid_id
            .and_then(|id| self.bids.get(&id))
            .cloned();
        Some(Listing {
            item,
            auction: auction.clone(),
            highest_bid,
        })
    }

    fn require_user(&self, user_id: i64) -> StoreResult<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("user {}", user_id)))
        }
    }

    fn append_log(&mut self, log: NewActionLog) -> CustomerActionLog {
        let entry = CustomerActionLog {
            id: self.next_id(),
            rep_id: log.rep_id,
            action_type: log.action_type.to_string(),
            action_time: log.action_time,
            target_user_id: Some(log.target_user_id),
            details: log.details,
        };
        self.action_logs.push(entry.clone());
        entry
    }

    /// Same guard the SQL store applies before cancel or delete
    fn withdrawable(&self, auction_id: i64, now: DateTime<Utc>) -> StoreResult<&Auction> {
        let auction = self
            .auctions
            .get(&auction_id)
            .ok_or_else(|| StoreError::NotFound(format!("auction {}", auction_id)))?;
        let open = matches!(
            auction.status,
            AuctionStatus::Scheduled | AuctionStatus::Open
        );
        if !open || auction.end_time <= now || auction.bid_count > 0 {
            return Err(StoreError::Conflict(
                "auction can no longer be withdrawn".to_string(),
            ));
        }
        Ok(auction)
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // a panicked test thread must not poison the other tests' view
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AuctionStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state();
        let taken = state.users.values().any(|u| {
            u.username.eq_ignore_ascii_case(&user.username)
                || u.email.eq_ignore_ascii_case(&user.email)
        });
        if taken {
            return Err(StoreError::Conflict(
                "username or email already registered".to_string(),
            ));
        }
        let created = User {
            id: state.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.state().users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn update_password(
        &self,
        user_id: i64,
        password_hash: String,
        log: NewActionLog,
    ) -> StoreResult<CustomerActionLog> {
        let mut state = self.state();
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.password_hash = password_hash;
        Ok(state.append_log(log))
    }

    async fn update_role(
        &self,
        user_id: i64,
        role: Role,
        log: NewActionLog,
    ) -> StoreResult<CustomerActionLog> {
        let mut state = self.state();
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.role = role;
        Ok(state.append_log(log))
    }

    async fn action_logs(&self, target_user_id: Option<i64>) -> StoreResult<Vec<CustomerActionLog>> {
        let state = self.state();
        let mut logs: Vec<CustomerActionLog> = state
            .action_logs
            .iter()
            .filter(|log| target_user_id.is_none() || log.target_user_id == target_user_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.action_time.cmp(&a.action_time).then(b.id.cmp(&a.id)));
        Ok(logs)
    }

    async fn insert_category(&self, name: &str, parent_id: Option<i64>) -> StoreResult<Category> {
        let mut state = self.state();
        if let Some(parent) = parent_id {
            if !state.categories.contains_key(&parent) {
                return Err(StoreError::NotFound(format!("category {}", parent)));
            }
        }
        let duplicate = state
            .categories
            .values()
            .any(|c| c.parent_id == parent_id && c.name.to_lowercase() == name.to_lowercase());
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "category '{}' already exists",
                name
            )));
        }
        let category = Category {
            id: state.next_id(),
            name: name.to_string(),
            parent_id,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn find_category(&self, category_id: i64) -> StoreResult<Option<Category>> {
        Ok(self.state().categories.get(&category_id).cloned())
    }

    async fn find_category_by_name(
        &self,
        name: &str,
        parent_id: Option<i64>,
    ) -> StoreResult<Option<Category>> {
        let name = name.to_lowercase();
        Ok(self
            .state()
            .categories
            .values()
            .find(|c| c.parent_id == parent_id && c.name.to_lowercase() == name)
            .cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let state = self.state();
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn insert_listing(&self, item: NewItem, auction: NewAuction) -> StoreResult<Listing> {
        let mut state = self.state();
        state.require_user(item.seller_id)?;
        if !state.categories.contains_key(&item.category_id) {
            return Err(StoreError::NotFound(format!("category {}", item.category_id)));
        }

        let item = Item {
            id: state.next_id(),
            title: item.title,
            description: item.description,
            category_id: item.category_id,
            seller_id: item.seller_id,
            vehicle: item.vehicle,
            post_date: item.post_date,
        };
        let auction = Auction {
            id: state.next_id(),
            item_id: item.id,
            start_price: auction.start_price,
            min_increment: auction.min_increment,
            min_price: auction.min_price,
            start_time: auction.start_time,
            end_time: auction.end_time,
            status: auction.status,
            highest_bid_id: None,
            bid_count: 0,
            created_at: item.post_date,
        };
        state.items.insert(item.id, item.clone());
        state.auctions.insert(auction.id, auction.clone());

        Ok(Listing {
            item,
            auction,
            highest_bid: None,
        })
    }

    async fn find_listing(&self, auction_id: i64) -> StoreResult<Option<Listing>> {
        let state = self.state();
        Ok(state
            .auctions
            .get(&auction_id)
            .and_then(|auction| state.listing(auction)))
    }

    async fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        let state = self.state();
        let mut listings: Vec<Listing> = state
            .auctions
            .values()
            .filter_map(|auction| state.listing(auction))
            .collect();
        listings.sort_by(|a, b| {
            b.auction
                .created_at
                .cmp(&a.auction.created_at)
                .then(b.auction.id.cmp(&a.auction.id))
        });
        Ok(listings)
    }

    async fn advance_status(
        &self,
        auction_id: i64,
        from: AuctionStatus,
        to: AuctionStatus,
    ) -> StoreResult<bool> {
        let mut state = self.state();
        match state.auctions.get_mut(&auction_id) {
            Some(auction) if auction.status == from && to > from => {
                auction.status = to;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!("auction {}", auction_id))),
        }
    }

    async fn cancel_auction(&self, auction_id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state();
        state.withdrawable(auction_id, now)?;
        if let Some(auction) = state.auctions.get_mut(&auction_id) {
            auction.status = AuctionStatus::Cancelled;
        }
        Ok(())
    }

    async fn delete_listing(&self, auction_id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state();
        let item_id = state.withdrawable(auction_id, now)?.item_id;
        state.auctions.remove(&auction_id);
        state.items.remove(&item_id);
        Ok(())
    }

    async fn bids_for_auction(&self, auction_id: i64) -> StoreResult<Vec<Bid>> {
        let state = self.state();
        let mut bids: Vec<Bid> = state
            .bids
            .values()
            .filter(|bid| bid.auction_id == auction_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.bid_amount.cmp(&a.bid_amount).then(a.id.cmp(&b.id)));
        Ok(bids)
    }

    async fn commit_bids(
        &self,
        auction_id: i64,
        expected_highest: Option<i64>,
        bids: Vec<NewBid>,
    ) -> StoreResult<Vec<Bid>> {
        let mut state = self.state();
        let auction = state
            .auctions
            .get(&auction_id)
            .ok_or_else(|| StoreError::NotFound(format!("auction {}", auction_id)))?;
        // a close written back since the snapshot also invalidates it
        if auction.highest_bid_id != expected_highest || auction.status.is_terminal() {
            return Err(StoreError::Stale);
        }
        for bid in &bids {
            state.require_user(bid.user_id)?;
        }

        let mut committed = Vec::with_capacity(bids.len());
        for bid in bids {
            let bid = Bid {
                id: state.next_id(),
                auction_id,
                user_id: bid.user_id,
                bid_amount: bid.bid_amount,
                max_auto_bid: bid.max_auto_bid,
                is_auto: bid.is_auto,
                bid_time: bid.bid_time,
            };
            state.bids.insert(bid.id, bid.clone());
            committed.push(bid);
        }

        if let (Some(auction), Some(last)) = (state.auctions.get_mut(&auction_id), committed.last())
        {
            auction.highest_bid_id = Some(last.id);
            auction.bid_count += committed.len() as i64;
        }
        Ok(committed)
    }

    async fn insert_alert(&self, user_id: i64, keyword: &str) -> StoreResult<Alert> {
        let mut state = self.state();
        state.require_user(user_id)?;
        let alert = Alert {
            id: state.next_id(),
            user_id,
            keyword: keyword.to_string(),
            created_at: Utc::now(),
        };
        state.alerts.insert(alert.id, alert.clone());
        Ok(alert)
    }

    async fn find_alert(&self, alert_id: i64) -> StoreResult<Option<Alert>> {
        Ok(self.state().alerts.get(&alert_id).cloned())
    }

    async fn delete_alert(&self, alert_id: i64) -> StoreResult<()> {
        self.state()
            .alerts
            .remove(&alert_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("alert {}", alert_id)))
    }

    async fn alerts_for_user(&self, user_id: i64) -> StoreResult<Vec<Alert>> {
        Ok(self
            .state()
            .alerts
            .values()
            .filter(|alert| alert.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_alerts(&self) -> StoreResult<Vec<Alert>> {
        Ok(self.state().alerts.values().cloned().collect())
    }
}
