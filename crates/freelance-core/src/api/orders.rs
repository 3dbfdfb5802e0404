//! `/orders/*` endpoints.

use std::sync::Arc;

use serde_json::json;

use freelance_types::error::ApiError;
use freelance_types::listing::Page;
use freelance_types::order::{CreateOrder, Order, OrderAttachment, OrderId, OrderListParams};

use crate::http::{ApiClient, HttpRequest, HttpTransport, ProgressFn, UploadPart};

pub struct OrdersApi<T: HttpTransport> {
    client: Arc<ApiClient<T>>,
}

impl<T: HttpTransport> OrdersApi<T> {
    pub fn new(client: Arc<ApiClient<T>>) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &OrderListParams) -> Result<Page<Order>, ApiError> {
        self.client
            .send_json(HttpRequest::get("/orders/").with_query(params.to_query()))
            .await
    }

    pub async fn get(&self, id: OrderId) -> Result<Order, ApiError> {
        self.client
            .send_json(HttpRequest::get(format!("/orders/{id}/")))
            .await
    }

    /// Place an order for one package of a service.
    pub async fn create(&self, order: &CreateOrder) -> Result<Order, ApiError> {
        let body = serde_json::to_value(order).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.client
            .send_json(HttpRequest::post("/orders/").with_json(body))
            .await
    }

    pub async fn cancel(&self, id: OrderId, reason: &str) -> Result<Order, ApiError> {
        let request =
            HttpRequest::post(format!("/orders/{id}/cancel/")).with_json(json!({ "reason": reason }));
        self.client.send_json(request).await
    }

    pub async fn complete(&self, id: OrderId) -> Result<Order, ApiError> {
        self.client
            .send_json(HttpRequest::post(format!("/orders/{id}/complete/")))
            .await
    }

    /// Multipart upload of one attachment, reporting fractional progress.
    pub async fn upload_attachment(
        &self,
        id: OrderId,
        file_name: &str,
        bytes: Vec<u8>,
        on_progress: Option<ProgressFn>,
    ) -> Result<OrderAttachment, ApiError> {
        let mut request = HttpRequest::post(format!("/orders/{id}/attachments/"))
            .with_multipart(vec![UploadPart::file("file", file_name, bytes)]);
        if let Some(cb) = on_progress {
            request = request.with_progress(cb);
        }
        self.client.send_json(request).await
    }
}
