//! Response header composition.
//!
//! Headers are layered in a fixed order: base headers first, then CORS
//! headers for the admitted origin, then per-response overrides. A later
//! layer replaces an earlier one on the same name.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;
use mcpstream_types::{PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER, SESSION_ID_HEADER};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "content-type, accept, mcp-session-id, mcp-protocol-version, last-event-id";
const EXPOSED_HEADERS: &str = "mcp-session-id, mcp-protocol-version";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Builder for the headers of one MCP response.
#[derive(Debug, Clone)]
pub struct ResponseHeaders {
    base: HeaderMap,
    cors: HeaderMap,
    overrides: HeaderMap,
}

impl ResponseHeaders {
    /// Base headers carried by every MCP response.
    pub fn new() -> Self {
        let mut base = HeaderMap::new();
        base.insert(
            HeaderName::from_static(PROTOCOL_VERSION_HEADER),
            HeaderValue::from_static(PROTOCOL_VERSION),
        );
        base.insert(header::VARY, HeaderValue::from_static("origin"));
        Self {
            base,
            cors: HeaderMap::new(),
            overrides: HeaderMap::new(),
        }
    }

    /// CORS headers mirroring the admitted origin, or `*` for non-browser clients.
    pub fn cors(mut self, origin: Option<&str>) -> Self {
        let allow_origin = origin
            .and_then(|o| HeaderValue::from_str(o).ok())
            .unwrap_or_else(|| HeaderValue::from_static("*"));
        self.cors
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        self.cors.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSED_HEADERS),
        );
        self
    }

    /// Extra CORS headers answering a preflight.
    pub fn preflight(mut self) -> Self {
        self.cors.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        self.cors.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        self.cors.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE),
        );
        self
    }

    /// Announce a freshly created session.
    pub fn session_id(mut self, id: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(id) {
            self.overrides
                .insert(HeaderName::from_static(SESSION_ID_HEADER), value);
        }
        self
    }

    /// Write all layers onto a response, in order.
    pub fn apply(self, mut response: Response) -> Response {
        let headers = response.headers_mut();
        for layer in [self.base, self.cors, self.overrides] {
            for (name, value) in layer.iter() {
                headers.insert(name.clone(), value.clone());
            }
        }
        response
    }
}

impl Default for ResponseHeaders {
    fn default() -> Self {
        Self::new()
    }
}
