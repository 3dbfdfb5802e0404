//! Authentication: token vault, persisted session record, the auth session
//! store and client-side form validation.

pub mod record;
pub mod store;
pub mod tokens;
pub mod validation;

pub use record::SessionRecord;
pub use store::{AuthStatus, AuthStore, Session};
pub use tokens::TokenVault;
