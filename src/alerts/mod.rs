//! Keyword alerts and the matcher that fans new items out to their owners.
pub mod commands;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// Alert model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: i64,
    pub user_id: i64,
    pub keyword: String,
    pub created_at: DateTime<Utc>,
}

/// Users whose keyword occurs in the title or description, ignoring case
pub fn match_alerts<'a, I>(alerts: I, title: &str, description: &str) -> BTreeSet<i64>
where
    I: IntoIterator<Item = &'a Alert>,
{
    let title = title.to_lowercase();
    let description = description.to_lowercase();

    alerts
        .into_iter()
        .filter(|alert| {
            let keyword = alert.keyword.trim().to_lowercase();
            !keyword.is_empty() && (title.contains(&keyword) || description.contains(&keyword))
        })
        .map(|alert| alert.user_id)
        .collect()
}
