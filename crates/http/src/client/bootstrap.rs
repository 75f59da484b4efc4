//! Access-token bootstrap from the page address
//!
//! After a social login the server redirects back with `?access_token=...`.
//! The token is moved into durable storage and stripped from the visible
//! address so it does not linger in history or get shared with the link.

use crate::client::location::Location;
use crate::client::token::{StoreError, TokenStore};

/// Query parameter carrying a freshly issued access token
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Resolve the token to attach to the next request
///
/// A token in the page address wins and replaces the stored one; otherwise
/// the stored token is returned.
pub fn extract_and_store_access_token(
    location: &Location,
    store: &dyn TokenStore,
) -> Result<Option<String>, StoreError> {
    if let Some(token) = location
        .query_param(ACCESS_TOKEN_PARAM)
        .filter(|token| !token.is_empty())
    {
        store.save(&token)?;
        location.remove_query_param(ACCESS_TOKEN_PARAM);
        tracing::debug!("Stored access token handed over in page address");
        return Ok(Some(token));
    }

    store.load()
}
