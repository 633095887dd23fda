//! Read side: listing projections with lazily evaluated lifecycle.
pub mod handlers;
