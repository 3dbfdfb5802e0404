//! Typed wrappers over the backend REST endpoints.
//!
//! Each wrapper owns a shared `ApiClient` and only knows paths and payload
//! shapes; session rules stay in the client and the stores.

pub mod auth;
pub mod orders;
pub mod services;

pub use auth::AuthApi;
pub use orders::OrdersApi;
pub use services::ServicesApi;

use serde::Deserialize;

use freelance_types::listing::Page;

/// Some list endpoints answer with a bare array, others with a page.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ListOrPage<T> {
    Page(Page<T>),
    List(Vec<T>),
}

impl<T> ListOrPage<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListOrPage::Page(page) => page.results,
            ListOrPage::List(items) => items,
        }
    }
}
