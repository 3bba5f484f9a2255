use super::SignatureCodec;
use crate::utils::error::IdentityError;
use chrono::Utc;
use serde::Serialize;

/// Separator between subject and timestamp in the wire form.
pub const CONTEXT_ID_DELIMITER: char = '|';

/// Who is talking and when the thread was opened.
///
/// Wire form is `"{subject}|{issued_at_millis}"`; the signature travels
/// separately and is never part of the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextIdentity {
    subject: String,
    issued_at_millis: i64,
}

/// A freshly minted context identifier with its detached signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedContextId {
    pub context_id: String,
    pub signature: String,
}

impl ContextIdentity {
    pub fn new(subject: impl Into<String>, issued_at_millis: i64) -> Result<Self, IdentityError> {
        let subject = subject.into();

        if subject.trim().is_empty() {
            return Err(IdentityError::EmptySubject);
        }
        if subject.contains(CONTEXT_ID_DELIMITER) {
            return Err(IdentityError::DelimiterInSubject(subject));
        }

        Ok(Self {
            subject,
            issued_at_millis,
        })
    }

    /// Mint and sign a new identity for `subject` stamped with the current time.
    pub fn mint(codec: &SignatureCodec, subject: &str) -> Result<SignedContextId, IdentityError> {
        Self::mint_at(codec, subject, Utc::now().timestamp_millis())
    }

    pub fn mint_at(
        codec: &SignatureCodec,
        subject: &str,
        issued_at_millis: i64,
    ) -> Result<SignedContextId, IdentityError> {
        let identity = Self::new(subject, issued_at_millis)?;
        let context_id = identity.wire_form();
        let signature = codec.sign(&context_id);

        Ok(SignedContextId {
            context_id,
            signature,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issued_at_millis(&self) -> i64 {
        self.issued_at_millis
    }

    pub fn wire_form(&self) -> String {
        format!("{}{}{}", self.subject, CONTEXT_ID_DELIMITER, self.issued_at_millis)
    }

    /// Parse a wire-form identifier. Opaque tokens yield `None`.
    pub fn parse(context_id: &str) -> Option<Self> {
        let subject = Self::extract_subject(context_id)?;
        let issued_at_millis = Self::extract_timestamp(context_id)?;

        Some(Self {
            subject,
            issued_at_millis,
        })
    }

    /// First `|` segment, if it has non-whitespace content.
    pub fn extract_subject(context_id: &str) -> Option<String> {
        if context_id.is_empty() {
            return None;
        }

        context_id
            .split(CONTEXT_ID_DELIMITER)
            .next()
            .filter(|segment| !segment.trim().is_empty())
            .map(str::to_string)
    }

    /// Second `|` segment parsed as epoch millis.
    pub fn extract_timestamp(context_id: &str) -> Option<i64> {
        context_id
            .split(CONTEXT_ID_DELIMITER)
            .nth(1)
            .and_then(|segment| segment.parse::<i64>().ok())
    }
}
