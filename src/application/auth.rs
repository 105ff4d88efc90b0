//! Bearer-token authorization backed by the key-value capability.
//!
//! A token is valid when the key `auth:<token>` exists and holds the admin
//! marker. Token issuance and expiry are handled elsewhere; this service
//! only answers the yes/no question.

use std::sync::Arc;

use crate::application::error::AppError;
use crate::infra::kv::KeyValueStore;

const ADMIN_MARKER: &str = "admin";

#[derive(Clone)]
pub struct AuthService {
    kv: Arc<dyn KeyValueStore>,
}

impl AuthService {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn is_authorized(&self, token: &str) -> Result<bool, AppError> {
        if token.is_empty() {
            return Ok(false);
        }
        let value = self.kv.get(&format!("auth:{token}")).await?;
        Ok(value.as_deref() == Some(ADMIN_MARKER))
    }

    /// Authorize from a raw `Authorization` header value, if any.
    pub async fn authorize_header(&self, header: Option<&str>) -> Result<bool, AppError> {
        match header.and_then(bearer_token) {
            Some(token) => self.is_authorized(token).await,
            None => Ok(false),
        }
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
