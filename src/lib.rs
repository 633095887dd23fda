pub mod alerts;
pub mod auction;
pub mod bidding;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod identity;
pub mod message_broker;
pub mod query;
pub mod state;
pub mod store;
pub mod users;
