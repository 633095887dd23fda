// users
pub const INSERT_USER: &str = r#"
    INSERT INTO users (username, email, password_hash, role)
    VALUES ($1, $2, $3, $4)
    RETURNING id, username, email, password_hash, role, created_at
"#;

pub const GET_USER: &str =
    "SELECT id, username, email, password_hash, role, created_at FROM users WHERE id = $1";

pub const GET_USER_BY_USERNAME: &str = "SELECT id, username, email, password_hash, role, created_at FROM users WHERE lower(username) = lower($1)";

pub const UPDATE_PASSWORD: &str = "UPDATE users SET password_hash = $2 WHERE id = $1";

pub const UPDATE_ROLE: &str = "UPDATE users SET role = $2 WHERE id = $1";

pub const INSERT_ACTION_LOG: &str = r#"
    INSERT INTO customer_action_logs (rep_id, action_type, action_time, target_user_id, details)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, rep_id, action_type, action_time, target_user_id, details
"#;

/// Newest first, optionally for one target user
pub const GET_ACTION_LOGS: &str = r#"
    SELECT id, rep_id, action_type, action_time, target_user_id, details
    FROM customer_action_logs
    WHERE $1::BIGINT IS NULL OR target_user_id = $1
    ORDER BY action_time DESC, id DESC
"#;

// categories
pub const INSERT_CATEGORY: &str =
    "INSERT INTO categories (name, parent_id) VALUES ($1, $2) RETURNING id, name, parent_id";

pub const GET_CATEGORY: &str = "SELECT id, name, parent_id FROM categories WHERE id = $1";

pub const GET_CATEGORY_BY_NAME: &str = r#"
    SELECT id, name, parent_id FROM categories
    WHERE lower(name) = lower($1) AND parent_id IS NOT DISTINCT FROM $2
"#;

pub const GET_ALL_CATEGORIES: &str = "SELECT id, name, parent_id FROM categories ORDER BY name, id";

// listings
pub const INSERT_ITEM: &str = r#"
    INSERT INTO items (title, description, category_id, seller_id, vehicle_make, vehicle_model, year, mileage, post_date)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
    RETURNING id
"#;

pub const INSERT_AUCTION: &str = r#"
    INSERT INTO auctions (item_id, start_price, min_increment, min_price, start_time, end_time, status, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING id
"#;

const LISTING_SELECT: &str = r#"
    SELECT a.id AS auction_id, a.item_id, a.start_price, a.min_increment, a.min_price,
           a.start_time, a.end_time, a.status, a.highest_bid_id, a.bid_count, a.created_at,
           i.title, i.description, i.category_id, i.seller_id,
           i.vehicle_make, i.vehicle_model, i.year, i.mileage, i.post_date,
           b.id AS bid_id, b.user_id AS bid_user_id, b.bid_amount, b.max_auto_bid,
           b.is_auto, b.bid_time
    FROM auctions a
    JOIN items i ON i.id = a.item_id
    LEFT JOIN bids b ON b.id = a.highest_bid_id
"#;

pub fn get_listing() -> String {
    format!("{} WHERE a.id = $1", LISTING_SELECT)
}

pub fn get_all_listings() -> String {
    format!("{} ORDER BY a.created_at DESC, a.id DESC", LISTING_SELECT)
}

/// Conditional forward transition; zero rows when another reader got there first
pub const ADVANCE_STATUS: &str = "UPDATE auctions SET status = $3 WHERE id = $1 AND status = $2";

pub const AUCTION_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM auctions WHERE id = $1)";

/// Locks the auction row if it can still be cancelled or deleted
pub const LOCK_WITHDRAWABLE_AUCTION: &str = r#"
    SELECT item_id FROM auctions
    WHERE id = $1
      AND status IN ('scheduled', 'open')
      AND end_time > $2
      AND bid_count = 0
    FOR UPDATE
"#;

pub const CANCEL_AUCTION: &str = "UPDATE auctions SET status = 'cancelled' WHERE id = $1";

/// Removing the item cascades to its auction
pub const DELETE_ITEM: &str = "DELETE FROM items WHERE id = $1";

// bids
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, auction_id, user_id, bid_amount, max_auto_bid, is_auto, bid_time
    FROM bids
    WHERE auction_id = $1
    ORDER BY bid_amount DESC, id ASC
"#;

/// Locks the auction row only while the highest-bid pointer is unchanged
pub const LOCK_AUCTION_FOR_BID: &str = r#"
    SELECT id FROM auctions
    WHERE id = $1
      AND highest_bid_id IS NOT DISTINCT FROM $2
      AND status IN ('scheduled', 'open')
    FOR UPDATE
"#;

pub const INSERT_BID: &str = r#"
    INSERT INTO bids (auction_id, user_id, bid_amount, max_auto_bid, is_auto, bid_time)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING id, auction_id, user_id, bid_amount, max_auto_bid, is_auto, bid_time
"#;

pub const UPDATE_HIGHEST_BID: &str =
    "UPDATE auctions SET highest_bid_id = $2, bid_count = bid_count + $3 WHERE id = $1";

// alerts
pub const INSERT_ALERT: &str = r#"
    INSERT INTO alerts (user_id, keyword) VALUES ($1, $2)
    RETURNING id, user_id, keyword, created_at
"#;

pub const GET_ALERT: &str = "SELECT id, user_id, keyword, created_at FROM alerts WHERE id = $1";

pub const DELETE_ALERT: &str = "DELETE FROM alerts WHERE id = $1";

pub const GET_USER_ALERTS: &str =
    "SELECT id, user_id, keyword, created_at FROM alerts WHERE user_id = $1 ORDER BY id";

pub const GET_ALL_ALERTS: &str = "SELECT id, user_id, keyword, created_at FROM alerts ORDER BY id";
