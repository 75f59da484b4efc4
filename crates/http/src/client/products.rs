//! Product API client methods

use super::{ClientError, NutriClient};
use nutrilabel_core::{ProductDetail, ProductImageReport};
use reqwest::Method;

impl NutriClient {
    /// Get the full nutrition record of a product
    pub async fn get_product_detail(&self, product_id: i64) -> Result<ProductDetail, ClientError> {
        let request = self.request(Method::GET, &format!("/products/{product_id}"));
        self.execute_envelope(request).await
    }

    /// Report a wrong product image
    pub async fn report_image(&self, report: &ProductImageReport) -> Result<(), ClientError> {
        let request = self.request(Method::POST, "/reports/images").json(report);
        self.execute_ack(request).await
    }

    /// Like a product (requires a signed-in user)
    pub async fn like_product(&self, product_id: i64) -> Result<(), ClientError> {
        let request = self.request(Method::POST, &format!("/products/{product_id}/likes"));
        self.execute_ack(request).await
    }
}
