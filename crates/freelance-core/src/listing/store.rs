//! Services listing store.
//!
//! Owns the visible result set, the query state driving it, and the locally
//! persisted preferences (favorites, view mode, facets, sort).

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use freelance_types::config::ClientConfig;
use freelance_types::error::ApiError;
use freelance_types::listing::{
    Category, FacetFilters, ListingParams, ListingPreferences, ServiceDetail, ServiceId,
    ServiceSummary, SortBy, SortOrder, ViewMode,
};

use super::query::{ListingQuery, build_listing_query};
use crate::api::ServicesApi;
use crate::http::{ApiClient, HttpTransport};
use crate::storage::{SERVICES_PREFERENCES_KEY, StorageSelector};

/// Snapshot of everything the listing views render.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingState {
    pub services: Vec<ServiceSummary>,
    pub featured: Vec<ServiceSummary>,
    pub categories: Vec<Category>,
    pub current_service: Option<ServiceDetail>,
    pub query: ListingQuery,
    pub favorites: BTreeSet<ServiceId>,
    pub view_mode: ViewMode,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub error: Option<String>,
}

impl ListingState {
    fn new(page_size: u32) -> Self {
        Self {
            services: Vec::new(),
            featured: Vec::new(),
            categories: Vec::new(),
            current_service: None,
            query: ListingQuery::new(page_size),
            favorites: BTreeSet::new(),
            view_mode: ViewMode::default(),
            is_loading: false,
            is_loading_more: false,
            error: None,
        }
    }

    fn preferences(&self) -> ListingPreferences {
        ListingPreferences {
            favorite_services: self.favorites.clone(),
            view_mode: self.view_mode,
            filters: self.query.filters.clone(),
            sort_by: self.query.sort_by,
            sort_order: self.query.sort_order,
        }
    }
}

/// Clears the in-flight flag when the fetch finishes or is dropped.
struct FetchGuard<'a>(&'a AtomicBool);

impl<'a> FetchGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FetchGuard(flag))
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ServicesStore<T: HttpTransport> {
    api: ServicesApi<T>,
    storage: StorageSelector,
    featured_page_size: u32,
    state: RwLock<ListingState>,
    fetching: AtomicBool,
}

impl<T: HttpTransport> ServicesStore<T> {
    pub fn new(client: Arc<ApiClient<T>>, config: &ClientConfig) -> Self {
        let storage = client.tokens().storage().clone();
        Self {
            api: ServicesApi::new(client),
            storage,
            featured_page_size: config.featured_page_size.max(1),
            state: RwLock::new(ListingState::new(config.default_page_size)),
            fetching: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ListingState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn api(&self) -> &ServicesApi<T> {
        &self.api
    }

    /// Load persisted preferences. Unreadable preferences are ignored.
    pub async fn restore_preferences(&self) -> Result<(), ApiError> {
        let prefs = match self
            .storage
            .get_durable_json::<ListingPreferences>(SERVICES_PREFERENCES_KEY)
            .await
        {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable listing preferences");
                None
            }
        };
        if let Some(prefs) = prefs {
            self.update(|s| {
                s.favorites = prefs.favorite_services;
                s.view_mode = prefs.view_mode;
                s.query.filters = prefs.filters;
                s.query.sort_by = prefs.sort_by;
                s.query.sort_order = prefs.sort_order;
            });
        }
        Ok(())
    }

    /// Fetch a page of services.
    ///
    /// With `refresh`, or while no results are held, the result set is
    /// replaced by page 1. Otherwise `params.page` (default: the next page)
    /// is appended. A `page_size` override becomes the store's page size when
    /// the result set is replaced and is ignored when appending, so later
    /// pages line up with the ones already held. Returns `Ok(false)` without
    /// a network call when another listing fetch is in flight.
    pub async fn fetch_services(&self, params: ListingParams, refresh: bool) -> Result<bool, ApiError> {
        let Some(_guard) = FetchGuard::acquire(&self.fetching) else {
            debug!("listing fetch already in flight, skipping");
            return Ok(false);
        };

        let current = self.state();
        let replace = refresh || current.services.is_empty();
        let page = if replace {
            1
        } else {
            params.page.unwrap_or(current.query.current_page + 1).max(1)
        };
        let mut params = params;
        if !replace {
            params.page_size = None;
        }
        let page_size = params.page_size.unwrap_or(current.query.page_size).max(1);
        let query = build_listing_query(&current.query, page, &params);

        self.update(|s| {
            if replace {
                s.is_loading = true;
            } else {
                s.is_loading_more = true;
            }
            s.error = None;
        });

        match self.api.list(query).await {
            Ok(result) => {
                let fetched = result.results.len();
                self.update(|s| {
                    if replace {
                        s.services = result.results;
                    } else {
                        s.services.extend(result.results);
                    }
                    s.query.page_size = page_size;
                    s.query.record_page(page, page_size, result.count);
                    s.is_loading = false;
                    s.is_loading_more = false;
                });
                debug!(page, fetched, replace, "services fetched");
                Ok(true)
            }
            Err(e) => {
                self.update(|s| {
                    s.is_loading = false;
                    s.is_loading_more = false;
                    s.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Append the next page. No-op while loading or once every page is held.
    pub async fn fetch_more_services(&self) -> Result<bool, ApiError> {
        let current = self.state();
        if current.is_loading || current.is_loading_more || !current.query.has_more() {
            return Ok(false);
        }
        self.fetch_services(ListingParams::page(current.query.current_page + 1), false)
            .await
    }

    /// Set the search text and fetch page 1.
    pub async fn search_services(&self, query: &str) -> Result<bool, ApiError> {
        self.set_search_query(query);
        self.fetch_services(ListingParams::default(), true).await
    }

    pub async fn fetch_service(&self, id: ServiceId) -> Result<ServiceDetail, ApiError> {
        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
        match self.api.get(id).await {
            Ok(detail) => {
                self.update(|s| {
                    s.current_service = Some(detail.clone());
                    s.is_loading = false;
                });
                Ok(detail)
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        match self.api.categories().await {
            Ok(categories) => {
                self.update(|s| s.categories = categories.clone());
                Ok(categories)
            }
            Err(e) => self.fail(e),
        }
    }

    /// First page of best-selling services, kept apart from the main results.
    pub async fn fetch_featured_services(&self) -> Result<Vec<ServiceSummary>, ApiError> {
        match self.api.featured(self.featured_page_size).await {
            Ok(featured) => {
                self.update(|s| s.featured = featured.clone());
                Ok(featured)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Replace every facet. Resets to page 1.
    pub async fn set_filters(&self, filters: FacetFilters) {
        self.update(|s| {
            s.query.filters = filters
                .into_iter()
                .filter(|(_, values)| !values.is_empty())
                .collect();
            s.query.current_page = 1;
        });
        self.persist_preferences().await;
    }

    /// Set one facet; an empty value list removes it. Resets to page 1.
    pub async fn set_filter(&self, facet: &str, values: Vec<String>) {
        self.update(|s| {
            if values.is_empty() {
                s.query.filters.remove(facet);
            } else {
                s.query.filters.insert(facet.to_string(), values);
            }
            s.query.current_page = 1;
        });
        self.persist_preferences().await;
    }

    /// Drop every facet and the search text. Resets to page 1.
    pub async fn clear_filters(&self) {
        self.update(|s| {
            s.query.filters.clear();
            s.query.search_query.clear();
            s.query.current_page = 1;
        });
        self.persist_preferences().await;
    }

    /// The search text is not persisted.
    pub fn set_search_query(&self, query: &str) {
        self.update(|s| {
            s.query.search_query = query.trim().to_string();
            s.query.current_page = 1;
        });
    }

    pub async fn set_sort_by(&self, sort_by: SortBy, sort_order: SortOrder) {
        self.update(|s| {
            s.query.sort_by = sort_by;
            s.query.sort_order = sort_order;
            s.query.current_page = 1;
        });
        self.persist_preferences().await;
    }

    pub async fn set_view_mode(&self, mode: ViewMode) {
        self.update(|s| s.view_mode = mode);
        self.persist_preferences().await;
    }

    /// Flip local favorite membership and persist it. Returns the new
    /// membership. The backend is not told.
    pub async fn toggle_favorite(&self, id: ServiceId) -> bool {
        let mut now_favorite = false;
        self.update(|s| {
            now_favorite = s.favorites.insert(id);
            if !now_favorite {
                s.favorites.remove(&id);
            }
        });
        self.persist_preferences().await;
        now_favorite
    }

    /// Like a service on the backend and bump its like count wherever it is
    /// shown.
    pub async fn like_service(&self, id: ServiceId) -> Result<(), ApiError> {
        match self.api.like(id).await {
            Ok(()) => {
                self.adjust_likes(id, |likes| likes.saturating_add(1));
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Withdraw a like. The shown count never drops below zero.
    pub async fn unlike_service(&self, id: ServiceId) -> Result<(), ApiError> {
        match self.api.unlike(id).await {
            Ok(()) => {
                self.adjust_likes(id, |likes| likes.saturating_sub(1));
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn adjust_likes(&self, id: ServiceId, f: impl Fn(u32) -> u32) {
        self.update(|s| {
            for service in s.services.iter_mut().filter(|svc| svc.id == id) {
                service.likes = f(service.likes);
            }
            if let Some(detail) = s.current_service.as_mut().filter(|d| d.summary.id == id) {
                detail.summary.likes = f(detail.summary.likes);
            }
        });
    }

    pub fn is_favorite(&self, id: ServiceId) -> bool {
        self.state().favorites.contains(&id)
    }

    pub fn favorites(&self) -> BTreeSet<ServiceId> {
        self.state().favorites
    }

    /// Forget the result set and paging. Preferences are untouched.
    pub fn clear_services(&self) {
        self.update(|s| {
            s.services.clear();
            s.current_service = None;
            s.query.reset_paging();
            s.error = None;
        });
    }

    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    async fn persist_preferences(&self) {
        let prefs = self.state().preferences();
        if let Err(e) = self
            .storage
            .set_durable_json(SERVICES_PREFERENCES_KEY, &prefs)
            .await
        {
            warn!(error = %e, "failed to persist listing preferences");
        }
    }

    fn fail<R>(&self, error: ApiError) -> Result<R, ApiError> {
        let message = error.to_string();
        self.update(|s| {
            s.is_loading = false;
            s.error = Some(message);
        });
        Err(error)
    }

    fn update(&self, f: impl FnOnce(&mut ListingState)) {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}

impl<T: HttpTransport> std::fmt::Debug for ServicesStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ServicesStore")
            .field("services", &state.services.len())
            .field("query", &state.query)
            .field("favorites", &state.favorites.len())
            .finish()
    }
}
