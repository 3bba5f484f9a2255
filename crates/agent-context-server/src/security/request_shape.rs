use serde::Serialize;
use serde_json::Value;

/// Which body layout carried the context identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestShape {
    /// `params.contextId` / `params.signature` (A2A protocol requests)
    Nested,
    /// Top-level `contextId` / `signature` (direct API requests)
    Flat,
    /// Empty body
    Empty,
    /// Not JSON, or JSON without a usable contextId
    Unrecognized,
}

/// Detached signature as it appeared in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimSignature {
    Text(String),
    /// Present but not a string; can never verify
    Malformed,
}

/// Identifier and optional detached signature pulled from a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextClaim {
    pub context_id: String,
    pub signature: Option<ClaimSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEnvelope {
    Nested(ContextClaim),
    Flat(ContextClaim),
    Unrecognized,
}

/// Claim carried by one JSON object, if its `contextId` is a non-blank string.
fn claim_from(fields: &Value) -> Option<ContextClaim> {
    let context_id = fields
        .get("contextId")?
        .as_str()
        .filter(|id| !id.trim().is_empty())?
        .to_string();

    let signature = match fields.get("signature") {
        None | Some(Value::Null) => None,
        Some(Value::String(sig)) if sig.trim().is_empty() => None,
        Some(Value::String(sig)) => Some(ClaimSignature::Text(sig.clone())),
        Some(_) => Some(ClaimSignature::Malformed),
    };

    Some(ContextClaim {
        context_id,
        signature,
    })
}

impl ContextEnvelope {
    /// Try each known layout in priority order; the first one with a
    /// non-blank `contextId` wins. The signature's type never disqualifies
    /// a layout.
    pub fn decode(body: &Value) -> Self {
        if let Some(claim) = body.get("params").and_then(claim_from) {
            return Self::Nested(claim);
        }
        if let Some(claim) = claim_from(body) {
            return Self::Flat(claim);
        }
        Self::Unrecognized
    }

    pub fn shape(&self) -> RequestShape {
        match self {
            Self::Nested(_) => RequestShape::Nested,
            Self::Flat(_) => RequestShape::Flat,
            Self::Unrecognized => RequestShape::Unrecognized,
        }
    }

    pub fn into_claim(self) -> Option<ContextClaim> {
        match self {
            Self::Nested(claim) | Self::Flat(claim) => Some(claim),
            Self::Unrecognized => None,
        }
    }
}
