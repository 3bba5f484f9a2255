use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::request_shape::{ClaimSignature, ContextEnvelope, RequestShape};
use crate::identity::{ContextIdentity, SignatureCodec};
use crate::utils::error::ApiError;

/// Identity resolved for the current request, readable by every handler
/// through `Extension<RequestContext>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub context_id: String,
    /// True when the caller sent no identifier and one was minted here
    pub is_new: bool,
    pub shape: RequestShape,
    /// True when a signature accompanied the identifier and checked out
    pub verified: bool,
}

impl RequestContext {
    fn fresh(shape: RequestShape) -> Self {
        Self {
            context_id: uuid::Uuid::new_v4().to_string(),
            is_new: true,
            shape,
            verified: false,
        }
    }

    /// Subject embedded in a signed identifier, if any.
    pub fn subject(&self) -> Option<String> {
        if self.verified {
            ContextIdentity::extract_subject(&self.context_id)
        } else {
            None
        }
    }
}

/// Settings and key material for the context extraction middleware.
#[derive(Debug, Clone)]
pub struct ContextExtractor {
    codec: SignatureCodec,
    path_prefixes: Vec<String>,
    body_limit: usize,
}

impl ContextExtractor {
    pub fn new(codec: SignatureCodec, path_prefixes: Vec<String>, body_limit: usize) -> Self {
        let path_prefixes = path_prefixes
            .into_iter()
            .map(|prefix| prefix.trim_end_matches('/').to_string())
            .filter(|prefix| !prefix.is_empty())
            .collect();

        Self {
            codec,
            path_prefixes,
            body_limit,
        }
    }

    /// POST requests under one of the agent-facing prefixes.
    pub fn applies_to(&self, method: &Method, path: &str) -> bool {
        if method != Method::POST {
            return false;
        }

        self.path_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Work out the request identity from a buffered body.
    ///
    /// Only a present-but-invalid signature is an error; every other
    /// problem falls back to a freshly minted unsigned identifier.
    pub fn resolve(&self, body: &[u8]) -> Result<RequestContext, ApiError> {
        // 1. Empty body
        if body.iter().all(u8::is_ascii_whitespace) {
            debug!("Empty request body, minting new context");
            return Ok(RequestContext::fresh(RequestShape::Empty));
        }

        // 2. Parse JSON
        let json: serde_json::Value = match serde_json::from_slice(body) {
            Ok(json) => json,
            Err(e) => {
                warn!("Malformed JSON body, treating as no context: {}", e);
                return Ok(RequestContext::fresh(RequestShape::Unrecognized));
            }
        };

        // 3. Nested shape first, then flat
        let envelope = ContextEnvelope::decode(&json);
        let shape = envelope.shape();
        let Some(claim) = envelope.into_claim() else {
            warn!("No usable contextId in {:?} request body, minting new context", shape);
            return Ok(RequestContext::fresh(shape));
        };

        // 4. Verify when signed, pass through when not
        let verified = match &claim.signature {
            Some(ClaimSignature::Text(signature))
                if self.codec.verify(&claim.context_id, signature) =>
            {
                match ContextIdentity::extract_subject(&claim.context_id) {
                    Some(subject) => info!("Verified contextId for subject {}", subject),
                    None => info!("Verified contextId without subject segment"),
                }
                true
            }
            Some(_) => {
                warn!(
                    "Rejected contextId {:?} ({:?} shape): invalid signature",
                    claim.context_id, shape
                );
                return Err(ApiError::InvalidSignature);
            }
            None => {
                debug!("Accepting unsigned contextId {:?}", claim.context_id);
                false
            }
        };

        Ok(RequestContext {
            context_id: claim.context_id,
            is_new: false,
            shape,
            verified,
        })
    }
}

/// Context extraction middleware
///
/// Buffers the body, resolves the request identity and re-attaches the body
/// untouched for the downstream handler.
pub async fn context_extraction_middleware(
    State(extractor): State<Arc<ContextExtractor>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !extractor.applies_to(request.method(), request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes: Bytes = axum::body::to_bytes(body, extractor.body_limit)
        .await
        .map_err(|e| {
            let e = e.into_inner();
            if e.is::<LengthLimitError>() {
                ApiError::PayloadTooLarge(extractor.body_limit)
            } else {
                ApiError::BadRequest(format!("Failed to read request body: {}", e))
            }
        })?;

    let context = extractor.resolve(&bytes)?;
    debug!(
        "Request context: id={}, new={}, shape={:?}, path={}",
        context.context_id,
        context.is_new,
        context.shape,
        parts.uri.path()
    );

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
