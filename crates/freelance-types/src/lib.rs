//! Shared domain types for the freelance marketplace client.
//!
//! This crate contains the types exchanged between the session layer, the
//! listing store and the backend REST API: users, credentials, service
//! listings, orders, session events, configuration and error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror, secrecy.

pub mod auth;
pub mod config;
pub mod error;
pub mod event;
pub mod listing;
pub mod order;
pub mod user;
