//! Client configuration types.
//!
//! `ClientConfig` represents `config.toml` in the data directory and controls
//! the backend location, request timeout and listing page sizes.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the marketplace client.
///
/// Loaded from `~/.freelance/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every relative API path is joined onto.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Overall per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Page size for regular listing fetches.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Page size for the featured-services strip.
    #[serde(default = "default_featured_page_size")]
    pub featured_page_size: u32,

    /// Route carried by the login-required event.
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> u32 {
    20
}

fn default_featured_page_size() -> u32 {
    8
}

fn default_login_route() -> String {
    "/login".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            default_page_size: default_page_size(),
            featured_page_size: default_featured_page_size(),
            login_route: default_login_route(),
        }
    }
}
