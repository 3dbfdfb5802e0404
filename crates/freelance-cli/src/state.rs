//! Application state wiring the stores together.
//!
//! The stores are generic over the HTTP transport; AppState pins them to the
//! reqwest transport and the file-backed durable store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use freelance_core::api::OrdersApi;
use freelance_core::auth::{AuthStore, TokenVault};
use freelance_core::event::SessionEventBus;
use freelance_core::http::ApiClient;
use freelance_core::listing::ServicesStore;
use freelance_core::storage::{BoxKvStore, MemoryKvStore, StorageSelector};
use freelance_infra::{FileKvStore, ReqwestTransport, load_client_config, resolve_data_dir};
use freelance_types::config::ClientConfig;

/// Concrete type aliases for the store generics pinned to infra implementations.
pub type ConcreteAuthStore = AuthStore<ReqwestTransport>;
pub type ConcreteServicesStore = ServicesStore<ReqwestTransport>;
pub type ConcreteOrdersApi = OrdersApi<ReqwestTransport>;

/// Shared state for every CLI command.
pub struct AppState {
    pub auth: ConcreteAuthStore,
    pub services: ConcreteServicesStore,
    pub orders: ConcreteOrdersApi,
    pub events: SessionEventBus,
    pub config: ClientConfig,
}

impl AppState {
    /// Resolve the data directory, load config, wire the stores and restore
    /// the persisted session and listing preferences.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_client_config(&data_dir).await;
        tracing::debug!(api_base_url = %config.api_base_url, "configuration loaded");

        // The session scope lives as long as this process.
        let storage = StorageSelector::new(
            BoxKvStore::new(FileKvStore::new(&data_dir)),
            BoxKvStore::new(MemoryKvStore::new()),
        );
        let vault = Arc::new(TokenVault::new(storage));
        let events = SessionEventBus::default();
        let transport = ReqwestTransport::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let client: Arc<ApiClient<ReqwestTransport>> = Arc::new(ApiClient::new(
            transport,
            vault,
            events.clone(),
            config.login_route.clone(),
        ));

        let auth = AuthStore::new(Arc::clone(&client));
        auth.restore().await?;
        let services = ServicesStore::new(Arc::clone(&client), &config);
        services.restore_preferences().await?;
        let orders = OrdersApi::new(Arc::clone(&client));

        Ok(Self {
            auth,
            services,
            orders,
            events,
            config,
        })
    }
}
