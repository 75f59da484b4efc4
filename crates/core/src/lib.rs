//! Nutrilabel core types and utilities

pub mod error;
pub mod nutrition;
pub mod pagination;
pub mod product;

#[cfg(feature = "tracing")]
pub mod tracing;

pub use error::{CoreError, CoreResult};
pub use nutrition::{CalorieInfo, NutrientCategory, NutritionValue};
pub use pagination::{clamp_page, page_numbers};
pub use product::{ApiResponse, ProductDetail, ProductImageReport};
