//! Request extractors whose rejections surface as `AuctionError::Validation`,
//! so malformed input gets the same JSON error body as every other failure.
use crate::error::AuctionError;
use axum::extract::{FromRequest, FromRequestParts};

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AuctionError))]
pub struct ValidJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AuctionError))]
pub struct ValidPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AuctionError))]
pub struct ValidQuery<T>(pub T);
