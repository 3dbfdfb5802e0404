//! Service listing types: results, categories, pagination and query options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::user::User;

/// Backend primary key for a service listing.
pub type ServiceId = u64;

/// Facet name (e.g. `category`, `tags`) to the selected values.
///
/// Multi-valued facets are sent comma-joined.
pub type FacetFilters = BTreeMap<String, Vec<String>>;

/// One card in a listing result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: ServiceId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub seller: Option<User>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub price_type: PriceType,
    /// Delivery time in days.
    #[serde(default)]
    pub delivery_time: u32,
    #[serde(default)]
    pub revisions: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub order_count: u32,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Full service page: the summary plus packages and buyer requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetail {
    #[serde(flatten)]
    pub summary: ServiceSummary,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub packages: Vec<ServicePackage>,
    #[serde(default)]
    pub requirements: Vec<ServiceRequirement>,
    #[serde(default)]
    pub view_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    #[default]
    Fixed,
    Hourly,
    Package,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePackage {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub delivery_time: u32,
    #[serde(default)]
    pub revisions: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub is_popular: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequirement {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// One of `text`, `file`, `boolean`, `number`, `date`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
}

/// Compact category reference embedded in service payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// Category tree node returned by `/categories/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
    #[serde(default)]
    pub service_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub service_count: u32,
}

fn default_true() -> bool {
    true
}

/// Paginated list envelope shared by every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl<T> Page<T> {
    pub fn total_pages(&self, page_size: u32) -> u32 {
        total_pages(self.count, page_size)
    }
}

/// `max(1, ceil(count / page_size))`. A zero page size is treated as 1.
pub fn total_pages(count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = count.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Backend sort keys for `/services/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    PriceLow,
    PriceHigh,
    Rating,
    Orders,
    Newest,
    Delivery,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::PriceLow => "price_low",
            SortBy::PriceHigh => "price_high",
            SortBy::Rating => "rating",
            SortBy::Orders => "orders",
            SortBy::Newest => "newest",
            SortBy::Delivery => "delivery",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(SortBy::Relevance),
            "price_low" => Ok(SortBy::PriceLow),
            "price_high" => Ok(SortBy::PriceHigh),
            "rating" => Ok(SortBy::Rating),
            // "best_selling" is the storefront's name for order-count sorting
            "orders" | "best_selling" => Ok(SortBy::Orders),
            "newest" => Ok(SortBy::Newest),
            "delivery" => Ok(SortBy::Delivery),
            other => Err(format!("invalid sort key: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("invalid sort order: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Grid => write!(f, "grid"),
            ViewMode::List => write!(f, "list"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grid" => Ok(ViewMode::Grid),
            "list" => Ok(ViewMode::List),
            other => Err(format!("invalid view mode: '{other}'")),
        }
    }
}

/// Caller-supplied overrides for a single listing fetch.
///
/// Every present field wins over the store's own query state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub filters: FacetFilters,
}

impl ListingParams {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }
}

/// Locally persisted listing preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ListingPreferences {
    #[serde(default)]
    pub favorite_services: BTreeSet<ServiceId>,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub filters: FacetFilters,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(45, 12), 4);
        assert_eq!(total_pages(5, 0), 5);
    }

    #[test]
    fn test_page_deserialize_without_links() {
        let page: Page<ServiceSummary> = serde_json::from_value(serde_json::json!({
            "results": [{"id": 1, "title": "Logo design", "price": 50.0}],
            "count": 1
        }))
        .unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(page.next.is_none());
        assert_eq!(page.results[0].price_type, PriceType::Fixed);
    }

    #[test]
    fn test_service_detail_flattens_summary() {
        let detail: ServiceDetail = serde_json::from_value(serde_json::json!({
            "id": 3,
            "title": "API integration",
            "price": 300.0,
            "packages": [{"id": 1, "name": "Basic", "price": 300.0}],
            "requirements": [{"id": 9, "title": "Repo access", "type": "text", "required": true}]
        }))
        .unwrap();
        assert_eq!(detail.summary.id, 3);
        assert_eq!(detail.packages[0].name, "Basic");
        assert_eq!(detail.requirements[0].kind, "text");
    }

    #[test]
    fn test_sort_by_parse_and_display() {
        assert_eq!("price_low".parse::<SortBy>().unwrap(), SortBy::PriceLow);
        assert_eq!("best_selling".parse::<SortBy>().unwrap(), SortBy::Orders);
        assert_eq!(SortBy::PriceHigh.to_string(), "price_high");
        assert!("cheapest".parse::<SortBy>().is_err());
    }

    #[test]
    fn test_preferences_default_when_empty() {
        let prefs: ListingPreferences = serde_json::from_str("{}").unwrap();
        assert!(prefs.favorite_services.is_empty());
        assert_eq!(prefs.view_mode, ViewMode::Grid);
        assert_eq!(prefs.sort_order, SortOrder::Desc);
    }
}
