//! Nutrilabel HTTP client
//!
//! Authenticated access to the nutrition-label API: bearer-token attachment,
//! single-flight token refresh with replay of rejected requests, and the
//! product endpoints built on top of it.

pub mod client;

pub use client::config::ClientConfig;
pub use client::error::ClientError;
pub use client::location::{Location, PageContext};
pub use client::session::AuthStore;
pub use client::token::{MemoryTokenStore, StoreError, TokenStore};
pub use client::{NutriClient, NutriClientBuilder};

#[cfg(not(target_arch = "wasm32"))]
pub use client::cookies::FileCookieStore;
#[cfg(not(target_arch = "wasm32"))]
pub use client::token::FileTokenStore;
