//! Product payloads exchanged with the nutrition-label API

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Response envelope used by every API endpoint
///
/// The server wraps payloads as `{ "isSuccess": bool, "code": .., "message": .., "result": .. }`.
/// Only `isSuccess` is guaranteed to be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub result: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the envelope into its result
    pub fn into_result(self) -> CoreResult<T> {
        if !self.is_success {
            return Err(CoreError::rejected(
                self.code,
                self.message.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        self.result.ok_or(CoreError::MissingResult)
    }

    /// Check the envelope's success flag, ignoring any result
    pub fn into_ack(self) -> CoreResult<()> {
        if self.is_success {
            Ok(())
        } else {
            Err(CoreError::rejected(
                self.code,
                self.message.unwrap_or_else(|| "request failed".to_string()),
            ))
        }
    }
}

/// Full product record shown on the detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub product_id: i64,
    pub product_name: String,
    #[serde(default)]
    pub company: Option<String>,
    /// Photo of the product itself
    #[serde(default)]
    pub product_image: Option<String>,
    /// Photos of the nutrition label
    #[serde(default)]
    pub image_url: Vec<String>,
    /// Energy in kcal
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub carbohydrate: Option<f64>,
    #[serde(default)]
    pub sugar: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
    #[serde(default)]
    pub saturated_fat: Option<f64>,
    #[serde(default)]
    pub trans_fat: Option<f64>,
    /// Sodium in mg
    #[serde(default)]
    pub sodium: Option<f64>,
    /// Cholesterol in mg
    #[serde(default)]
    pub cholesterol: Option<f64>,
    #[serde(default)]
    pub vitamins: Option<Vec<String>>,
    #[serde(default)]
    pub minerals: Option<Vec<String>>,
    #[serde(default)]
    pub allergens: Option<Vec<String>>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub liked: bool,
}

impl ProductDetail {
    /// All images in display order: product photo first, then nutrition-label photos
    pub fn images(&self) -> Vec<&str> {
        self.product_image
            .as_deref()
            .filter(|url| !url.is_empty())
            .into_iter()
            .chain(self.image_url.iter().map(String::as_str))
            .collect()
    }
}

/// Report of a wrong product image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImageReport {
    pub product_id: i64,
    pub image_url: String,
}
