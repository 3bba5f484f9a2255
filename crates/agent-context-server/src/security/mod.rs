pub mod middleware;
pub mod request_shape;

pub use middleware::{context_extraction_middleware, ContextExtractor, RequestContext};
pub use request_shape::{ClaimSignature, ContextClaim, ContextEnvelope, RequestShape};
