//! Request-scoped identity.
//!
//! The session provider sits in front of this service and forwards the
//! authenticated user as `X-User-Id` / `X-User-Role` headers. Every command
//! receives the resulting [`Actor`] explicitly.
// region:    --- Imports
use crate::error::AuctionError;
use crate::users::model::Role;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

// endregion: --- Imports

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn require(&self, allowed: &[Role], action: &str) -> Result<(), AuctionError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AuctionError::forbidden(format!(
                "role {} may not {}",
                self.role.as_str(),
                action
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AuctionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or(AuctionError::Unauthenticated)?
            .parse::<i64>()
            .map_err(|_| AuctionError::Unauthenticated)?;
        let role = header(USER_ROLE_HEADER)
            .ok_or(AuctionError::Unauthenticated)?
            .parse::<Role>()
            .map_err(|_| AuctionError::Unauthenticated)?;

        Ok(Actor { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<Actor, AuctionError> {
        let (mut parts, _) = req.into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_identity_from_headers() {
        let req = Request::builder()
            .header(USER_ID_HEADER, "42")
            .header(USER_ROLE_HEADER, "seller")
            .body(())
            .unwrap();
        let actor = extract(req).await.unwrap();
        assert_eq!(actor, Actor::new(42, Role::Seller));
    }

    #[tokio::test]
    async fn missing_or_garbled_identity_is_unauthenticated() {
        let req = Request::builder().header(USER_ID_HEADER, "42").body(()).unwrap();
        assert!(matches!(extract(req).await, Err(AuctionError::Unauthenticated)));

        let req = Request::builder()
            .header(USER_ID_HEADER, "abc")
            .header(USER_ROLE_HEADER, "buyer")
            .body(())
            .unwrap();
        assert!(matches!(extract(req).await, Err(AuctionError::Unauthenticated)));
    }

    #[test]
    fn require_rejects_other_roles() {
        let actor = Actor::new(1, Role::Buyer);
        assert!(actor.require(&[Role::Buyer, Role::Seller], "bid").is_ok());
        assert!(matches!(
            actor.require(&[Role::Rep], "reset passwords"),
            Err(AuctionError::Forbidden(_))
        ));
    }
}
