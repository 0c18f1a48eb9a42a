//! Origin gatekeeping for DNS rebinding protection.

use axum::http::{header, HeaderMap};
use tracing::warn;

use crate::error::TransportError;

/// Prefix admitted regardless of port.
const LOCALHOST_PREFIX: &str = "http://localhost";

/// Decides which declared origins may talk to the endpoint.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allowed_origin: Option<String>,
}

impl OriginPolicy {
    pub fn new(allowed_origin: Option<String>) -> Self {
        Self { allowed_origin }
    }

    /// No Origin is admitted (non-browser clients), as are the configured
    /// origin and any `http://localhost` origin.
    pub fn admits(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => {
                self.allowed_origin.as_deref() == Some(origin)
                    || origin.starts_with(LOCALHOST_PREFIX)
            }
        }
    }

    /// Check the request's Origin header.
    ///
    /// Returns the admitted origin, if one was declared, so responses can mirror it.
    pub fn check(&self, headers: &HeaderMap) -> Result<Option<String>, TransportError> {
        let origin = match headers.get(header::ORIGIN) {
            None => None,
            Some(value) => match value.to_str() {
                Ok(s) => Some(s.to_string()),
                Err(_) => {
                    warn!("Rejecting MCP request with non-ASCII origin");
                    return Err(TransportError::OriginNotAllowed("<invalid>".to_string()));
                }
            },
        };

        if self.admits(origin.as_deref()) {
            Ok(origin)
        } else {
            let origin = origin.unwrap_or_default();
            warn!("Rejecting MCP request from origin: {}", origin);
            Err(TransportError::OriginNotAllowed(origin))
        }
    }
}
