/// User and customer-service commands
/// 1. register / login
/// 2. password reset and role change by a rep, each with an audit record
// region:    --- Imports
use super::model::{
    CustomerActionLog, NewActionLog, NewUser, Role, User, ACTION_CHANGE_ROLE,
    ACTION_RESET_PASSWORD,
};
use super::{hash_password, temporary_password, verify_password};
use crate::error::AuctionError;
use crate::identity::Actor;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginCommand {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeRoleCommand {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordReset {
    pub user_id: i64,
    pub temporary_password: String,
    pub log: CustomerActionLog,
}

const MAX_USERNAME_LEN: usize = 80;
const MAX_EMAIL_LEN: usize = 120;
const MIN_PASSWORD_LEN: usize = 8;

fn validate_registration(cmd: &RegisterCommand) -> Result<(), AuctionError> {
    let username = cmd.username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(AuctionError::validation(format!(
            "username must be 1 to {} characters",
            MAX_USERNAME_LEN
        )));
    }
    let email = cmd.email.trim();
    if email.chars().count() > MAX_EMAIL_LEN || !email.contains('@') {
        return Err(AuctionError::validation("a valid email address is required"));
    }
    if cmd.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuctionError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !matches!(cmd.role, Role::Buyer | Role::Seller) {
        return Err(AuctionError::forbidden(
            "only buyer or seller accounts can be registered",
        ));
    }
    Ok(())
}

async fn insert_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, AuctionError> {
    let user = state
        .store
        .insert_user(NewUser {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password_hash: hash_password(password).await?,
            role,
        })
        .await?;
    info!(
        "{:<12} --> User registered: {} ({}, {})",
        "Users",
        user.username,
        user.id,
        user.role.as_str()
    );
    Ok(user)
}

/// 1. Registers a buyer or seller
pub async fn handle_register(state: &AppState, cmd: RegisterCommand) -> Result<User, AuctionError> {
    validate_registration(&cmd)?;
    insert_user(state, &cmd.username, &cmd.email, &cmd.password, cmd.role).await
}

/// 1. Verifies credentials and returns the identity the session provider stores
pub async fn handle_login(state: &AppState, cmd: LoginCommand) -> Result<LoginResult, AuctionError> {
    let user = state.store.find_user_by_username(cmd.username.trim()).await?;
    let verified = match &user {
        Some(user) => verify_password(&cmd.password, &user.password_hash).await?,
        None => false,
    };
    match user {
        Some(user) if verified => {
            info!("{:<12} --> Login: {}", "Users", user.username);
            Ok(LoginResult {
                user_id: user.id,
                username: user.username,
                role: user.role,
            })
        }
        _ => {
            warn!("{:<12} --> Failed login for {}", "Users", cmd.username);
            Err(AuctionError::InvalidCredentials)
        }
    }
}

async fn load_user(state: &AppState, user_id: i64) -> Result<User, AuctionError> {
    state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AuctionError::not_found("user", user_id))
}

/// 2. Resets a user's password to a random temporary one (rep only)
pub async fn handle_reset_password(
    state: &AppState,
    actor: &Actor,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<PasswordReset, AuctionError> {
    actor.require(&[Role::Rep], "reset passwords")?;
    let user = load_user(state, user_id).await?;

    let temporary = temporary_password();
    let log = state
        .store
        .update_password(
            user.id,
            hash_password(&temporary).await?,
            NewActionLog {
                rep_id: actor.user_id,
                action_type: ACTION_RESET_PASSWORD,
                action_time: now,
                target_user_id: user.id,
                details: Some(format!("Password reset for {}", user.username)),
            },
        )
        .await?;

    info!(
        "{:<12} --> Rep {} reset the password of user {}",
        "Users", actor.user_id, user.id
    );
    Ok(PasswordReset {
        user_id: user.id,
        temporary_password: temporary,
        log,
    })
}

/// 2. Changes a user's role (rep only, never their own)
pub async fn handle_change_role(
    state: &AppState,
    actor: &Actor,
    user_id: i64,
    cmd: ChangeRoleCommand,
    now: DateTime<Utc>,
) -> Result<CustomerActionLog, AuctionError> {
    actor.require(&[Role::Rep], "change roles")?;
    if actor.user_id == user_id {
        return Err(AuctionError::forbidden("reps cannot change their own role"));
    }
    let user = load_user(state, user_id).await?;
    if user.role == cmd.role {
        return Err(AuctionError::conflict(format!(
            "user {} already has role {}",
            user.id,
            cmd.role.as_str()
        )));
    }

    let log = state
        .store
        .update_role(
            user.id,
            cmd.role,
            NewActionLog {
                rep_id: actor.user_id,
                action_type: ACTION_CHANGE_ROLE,
                action_time: now,
                target_user_id: user.id,
                details: Some(format!(
                    "Role changed from {} to {}",
                    user.role.as_str(),
                    cmd.role.as_str()
                )),
            },
        )
        .await?;

    info!(
        "{:<12} --> Rep {} changed role of user {} to {}",
        "Users",
        actor.user_id,
        user.id,
        cmd.role.as_str()
    );
    Ok(log)
}

/// Audit trail, newest first (rep or admin)
pub async fn handle_action_logs(
    state: &AppState,
    actor: &Actor,
    target_user_id: Option<i64>,
) -> Result<Vec<CustomerActionLog>, AuctionError> {
    actor.require(&[Role::Rep, Role::Admin], "read the action log")?;
    Ok(state.store.action_logs(target_user_id).await?)
}

/// Creates the configured rep account when it does not exist yet
pub async fn ensure_bootstrap_rep(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), AuctionError> {
    if state.store.find_user_by_username(username).await?.is_some() {
        return Ok(());
    }
    match insert_user(state, username, email, password, Role::Rep).await {
        Ok(_) => Ok(()),
        // another instance got there first
        Err(AuctionError::Conflict(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

// endregion: --- Commands

