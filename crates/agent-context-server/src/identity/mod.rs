//! Signed conversation identity
//!
//! - `SignatureCodec`: HMAC-SHA256 over the context identifier wire form
//! - `ContextIdentity`: `subject|issued_at_millis` value with mint/parse helpers

mod context_id;
mod signature;

pub use context_id::{ContextIdentity, SignedContextId, CONTEXT_ID_DELIMITER};
pub use signature::{SignatureCodec, MIN_SIGNING_KEY_LEN};
