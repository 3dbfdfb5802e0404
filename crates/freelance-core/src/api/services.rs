//! `/services/*` and `/categories/` endpoints.

use std::sync::Arc;

use serde::Deserialize;

use freelance_types::error::ApiError;
use freelance_types::listing::{Category, Page, ServiceDetail, ServiceId, ServiceSummary, SortBy};

use super::ListOrPage;
use crate::http::{ApiClient, HttpRequest, HttpTransport, ProgressFn, UploadPart};

/// Response of the image upload endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedImages {
    #[serde(default)]
    pub images: Vec<String>,
}

pub struct ServicesApi<T: HttpTransport> {
    client: Arc<ApiClient<T>>,
}

impl<T: HttpTransport> ServicesApi<T> {
    pub fn new(client: Arc<ApiClient<T>>) -> Self {
        Self { client }
    }

    /// `GET /services/` with a fully built query.
    pub async fn list(&self, query: Vec<(String, String)>) -> Result<Page<ServiceSummary>, ApiError> {
        self.client
            .send_json(HttpRequest::get("/services/").with_query(query))
            .await
    }

    pub async fn get(&self, id: ServiceId) -> Result<ServiceDetail, ApiError> {
        self.client
            .send_json(HttpRequest::get(format!("/services/{id}/")))
            .await
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let list: ListOrPage<Category> = self.client.send_json(HttpRequest::get("/categories/")).await?;
        Ok(list.into_vec())
    }

    /// First page of best-selling services.
    pub async fn featured(&self, page_size: u32) -> Result<Vec<ServiceSummary>, ApiError> {
        let query = vec![
            ("page".to_string(), "1".to_string()),
            ("page_size".to_string(), page_size.to_string()),
            ("sort_by".to_string(), SortBy::Orders.to_string()),
        ];
        Ok(self.list(query).await?.results)
    }

    /// `POST /services/{id}/like/`.
    pub async fn like(&self, id: ServiceId) -> Result<(), ApiError> {
        self.client
            .send_empty(HttpRequest::post(format!("/services/{id}/like/")))
            .await
    }

    /// `DELETE /services/{id}/like/`.
    pub async fn unlike(&self, id: ServiceId) -> Result<(), ApiError> {
        self.client
            .send_empty(HttpRequest::delete(format!("/services/{id}/like/")))
            .await
    }

    /// Multipart upload of listing images, reporting fractional progress.
    pub async fn upload_images(
        &self,
        id: ServiceId,
        images: Vec<(String, Vec<u8>)>,
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadedImages, ApiError> {
        if images.is_empty() {
            return Err(ApiError::InvalidRequest("no images to upload".to_string()));
        }
        let parts = images
            .into_iter()
            .map(|(file_name, bytes)| UploadPart::file("images", file_name, bytes))
            .collect();
        let mut request = HttpRequest::post(format!("/services/{id}/upload-images/")).with_multipart(parts);
        if let Some(cb) = on_progress {
            request = request.with_progress(cb);
        }
        self.client.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::testing::harness;
    use serde_json::json;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_categories_accepts_bare_list_and_page() {
        let h = harness();
        let api = ServicesApi::new(Arc::clone(&h.client));
        let cat = json!({"id": 1, "name": "Design", "slug": "design"});

        h.transport.reply(HttpMethod::Get, "/categories/", 200, json!([cat.clone()]));
        assert_eq!(api.categories().await.unwrap().len(), 1);

        h.transport.reply(
            HttpMethod::Get,
            "/categories/",
            200,
            json!({"results": [cat.clone(), cat], "count": 2}),
        );
        assert_eq!(api.categories().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_featured_uses_order_count_sorting() {
        let h = harness();
        let api = ServicesApi::new(Arc::clone(&h.client));
        h.transport.reply(HttpMethod::Get, "/services/", 200, json!({"results": [], "count": 0}));

        api.featured(8).await.unwrap();

        let sent = h.transport.last().unwrap();
        assert_eq!(sent.query_value("sort_by"), Some("orders"));
        assert_eq!(sent.query_value("page_size"), Some("8"));
        assert_eq!(sent.query_value("page"), Some("1"));
    }

    #[tokio::test]
    async fn test_like_and_unlike_share_one_path() {
        let h = harness();
        let api = ServicesApi::new(Arc::clone(&h.client));
        h.transport.reply(HttpMethod::Post, "/services/3/like/", 201, json!({}));
        h.transport.reply(HttpMethod::Delete, "/services/3/like/", 204, serde_json::Value::Null);

        api.like(3).await.unwrap();
        api.unlike(3).await.unwrap();

        assert_eq!(h.transport.count(HttpMethod::Post, "/services/3/like/"), 1);
        assert_eq!(h.transport.count(HttpMethod::Delete, "/services/3/like/"), 1);
    }

    #[tokio::test]
    async fn test_upload_reports_progress() {
        let h = harness();
        let api = ServicesApi::new(Arc::clone(&h.client));
        h.transport.reply(
            HttpMethod::Post,
            "/services/5/upload-images/",
            200,
            json!({"images": ["https://cdn/x.png"]}),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let uploaded = api
            .upload_images(
                5,
                vec![("x.png".to_string(), vec![1, 2, 3])],
                Some(Arc::new(move |p| sink.lock().unwrap().push(p))),
            )
            .await
            .unwrap();

        assert_eq!(uploaded.images.len(), 1);
        assert_eq!(*seen.lock().unwrap().last().unwrap(), 1.0);
        assert_eq!(h.transport.last().unwrap().upload_fields, vec!["images"]);
    }

    #[tokio::test]
    async fn test_upload_without_images_is_rejected_locally() {
        let h = harness();
        let api = ServicesApi::new(Arc::clone(&h.client));
        let err = api.upload_images(5, Vec::new(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert!(h.transport.requests().is_empty());
    }
}
