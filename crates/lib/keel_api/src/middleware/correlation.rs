//! Correlation id propagation.
//!
//! Reads `X-Correlation-ID` (or mints a UUID v4), stores it in request
//! extensions, opens a request span carrying it, and echoes it back on the
//! response.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderName;
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub static X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Longest inbound id accepted as-is; longer ones are replaced.
const MAX_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The correlation id stored on this request, if the middleware ran.
pub fn current(extensions: &Extensions) -> Option<&CorrelationId> {
    extensions.get::<CorrelationId>()
}

fn accept(value: &HeaderValue) -> Option<CorrelationId> {
    let s = value.to_str().ok()?.trim();
    let ok = !s.is_empty()
        && s.len() <= MAX_LEN
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b"-_.:".contains(&b));
    ok.then(|| CorrelationId::new(s))
}

/// Axum middleware: resolve the correlation id and run the rest of the
/// chain inside a span tagged with it.
pub async fn correlation_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(&X_CORRELATION_ID)
        .and_then(accept)
        .unwrap_or_else(CorrelationId::generate);

    let span = info_span!(
        "request",
        correlation_id = %id.as_str(),
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(id.clone());

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(X_CORRELATION_ID.clone(), value);
    }
    response
}

/// Extractor yielding the correlation id when the middleware ran.
#[derive(Debug, Clone)]
pub struct MaybeCorrelationId(pub Option<CorrelationId>);

impl<S> FromRequestParts<S> for MaybeCorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current(&parts.extensions).cloned()))
    }
}
