//! Request context extraction shared by the module routers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::GrcError;
use crate::tenant::{AccessContext, TenantId};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const CAPABILITIES_HEADER: &str = "x-capabilities";

/// Access context built from the tenant and capability headers.
///
/// Extraction never rejects: a missing tenant surfaces later as `TenantContextMissing`.
#[derive(Debug, Clone)]
pub struct RequestContext(pub AccessContext);

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let tenant = headers
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| TenantId::parse(raw).ok());
        let capabilities = headers
            .get(CAPABILITIES_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        Self(AccessContext::from_capability_list(tenant, capabilities))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Serializes a service result, mapping domain errors through `GrcError::into_response`.
pub(crate) fn respond<T: Serialize>(status: StatusCode, result: Result<T, GrcError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::Capability;
    use axum::http::HeaderValue;

    #[test]
    fn builds_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("acme"));
        headers.insert(
            CAPABILITIES_HEADER,
            HeaderValue::from_static("rules:read,rules:execute"),
        );

        let RequestContext(context) = RequestContext::from_headers(&headers);
        assert_eq!(context.tenant().expect("tenant").as_str(), "acme");
        assert!(context.has(Capability::RulesExecute));
        assert!(!context.has(Capability::RulesWrite));
    }

    #[test]
    fn blank_tenant_header_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("   "));
        let RequestContext(context) = RequestContext::from_headers(&headers);
        assert!(context.tenant().is_err());
    }
}
