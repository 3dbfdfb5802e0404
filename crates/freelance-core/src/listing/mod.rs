//! Services listing: query state, query-string construction and the store.

pub mod query;
pub mod store;

pub use query::{ListingQuery, build_listing_query};
pub use store::{ListingState, ServicesStore};
