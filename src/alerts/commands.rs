// region:    --- Imports
use super::Alert;
use crate::error::AuctionError;
use crate::identity::Actor;
use crate::state::AppState;
use serde::Deserialize;
use tracing::info;
// endregion: --- Imports

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlertCommand {
    pub keyword: String,
}

const MAX_KEYWORD_LEN: usize = 100;

pub async fn handle_create_alert(
    state: &AppState,
    actor: &Actor,
    cmd: CreateAlertCommand,
) -> Result<Alert, AuctionError> {
    let keyword = cmd.keyword.trim();
    if keyword.is_empty() || keyword.chars().count() > MAX_KEYWORD_LEN {
        return Err(AuctionError::validation(format!(
            "keyword must be 1 to {} characters",
            MAX_KEYWORD_LEN
        )));
    }

    let alert = state.store.insert_alert(actor.user_id, keyword).await?;
    info!(
        "{:<12} --> Alert {} set by user {}: {}",
        "Alerts", alert.id, actor.user_id, alert.keyword
    );
    Ok(alert)
}

pub async fn handle_list_alerts(state: &AppState, actor: &Actor) -> Result<Vec<Alert>, AuctionError> {
    Ok(state.store.alerts_for_user(actor.user_id).await?)
}

/// Only the owner may remove an alert
pub async fn handle_delete_alert(
    state: &AppState,
    actor: &Actor,
    alert_id: i64,
) -> Result<(), AuctionError> {
    let alert = state
        .store
        .find_alert(alert_id)
        .await?
        .ok_or_else(|| AuctionError::not_found("alert", alert_id))?;
    if alert.user_id != actor.user_id {
        return Err(AuctionError::forbidden("alert belongs to another user"));
    }

    state.store.delete_alert(alert_id).await?;
    info!(
        "{:<12} --> Alert {} removed by user {}",
        "Alerts", alert_id, actor.user_id
    );
    Ok(())
}
