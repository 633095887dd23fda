//! Hierarchical item categories.
//!
//! Names are unique within their parent, compared case-insensitively.
// region:    --- Imports
use crate::error::AuctionError;
use crate::identity::Actor;
use crate::state::AppState;
use crate::store::StoreError;
use crate::users::model::Role;
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryCommand {
    pub name: String,
    pub parent_id: Option<i64>,
}

const MAX_NAME_LEN: usize = 80;

fn normalize_name(name: &str) -> Result<String, AuctionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuctionError::validation("category name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AuctionError::validation(format!(
            "category name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

async fn ensure_parent(state: &AppState, parent_id: Option<i64>) -> Result<(), AuctionError> {
    if let Some(parent) = parent_id {
        state
            .store
            .find_category(parent)
            .await?
            .ok_or_else(|| AuctionError::not_found("category", parent))?;
    }
    Ok(())
}

pub async fn list_categories(state: &AppState) -> Result<Vec<Category>, AuctionError> {
    Ok(state.store.list_categories().await?)
}

pub async fn create_category(
    state: &AppState,
    actor: &Actor,
    cmd: CreateCategoryCommand,
) -> Result<Category, AuctionError> {
    actor.require(&[Role::Seller, Role::Admin], "create categories")?;
    let name = normalize_name(&cmd.name)?;
    ensure_parent(state, cmd.parent_id).await?;

    let category = state.store.insert_category(&name, cmd.parent_id).await?;
    info!(
        "{:<12} --> Category created: {} ({})",
        "Catalog", category.name, category.id
    );
    Ok(category)
}

/// Returns the named category under `parent_id`, creating it when missing
pub async fn find_or_create(
    state: &AppState,
    name: &str,
    parent_id: Option<i64>,
) -> Result<Category, AuctionError> {
    let name = normalize_name(name)?;
    if let Some(existing) = state.store.find_category_by_name(&name, parent_id).await? {
        return Ok(existing);
    }
    ensure_parent(state, parent_id).await?;

    match state.store.insert_category(&name, parent_id).await {
        Ok(category) => {
            info!(
                "{:<12} --> Category created on demand: {} ({})",
                "Catalog", category.name, category.id
            );
            Ok(category)
        }
        // lost a race with another poster
        Err(StoreError::Conflict(_)) => state
            .store
            .find_category_by_name(&name, parent_id)
            .await?
            .ok_or_else(|| AuctionError::conflict("category changed concurrently")),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn names_are_unique_per_parent() {
        let (state, _) = AppState::in_memory();
        let admin = Actor::new(1, Role::Admin);

        let vehicles = create_category(
            &state,
            &admin,
            CreateCategoryCommand {
                name: "Vehicles".into(),
                parent_id: None,
            },
        )
        .await
        .unwrap();
        let cars = create_category(
            &state,
            &admin,
            CreateCategoryCommand {
                name: "Parts".into(),
                parent_id: Some(vehicles.id),
            },
        )
        .await
        .unwrap();
        assert_eq!(cars.parent_id, Some(vehicles.id));

        // same name under a different parent is fine
        assert!(create_category(
            &state,
            &admin,
            CreateCategoryCommand {
                name: "parts".into(),
                parent_id: None,
            },
        )
        .await
        .is_ok());

        let duplicate = create_category(
            &state,
            &admin,
            CreateCategoryCommand {
                name: "PARTS".into(),
                parent_id: Some(vehicles.id),
            },
        )
        .await;
        assert!(matches!(duplicate, Err(AuctionError::Conflict(_))));
    }

    #[tokio::test]
    async fn find_or_create_reuses_existing() {
        let (state, _) = AppState::in_memory();
        let first = find_or_create(&state, "  Boats ", None).await.unwrap();
        let second = find_or_create(&state, "boats", None).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(list_categories(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn buyers_cannot_create_categories() {
        let (state, _) = AppState::in_memory();
        let result = create_category(
            &state,
            &Actor::new(1, Role::Buyer),
            CreateCategoryCommand {
                name: "Art".into(),
                parent_id: None,
            },
        )
        .await;
        assert!(matches!(result, Err(AuctionError::Forbidden(_))));
    }

    #[tokio::test]
    async fn unknown_parent_is_not_found() {
        let (state, _) = AppState::in_memory();
        let result = find_or_create(&state, "Orphan", Some(999)).await;
        assert!(matches!(result, Err(AuctionError::NotFound(_))));
    }
}
