//! Decision body decoder for the network realization.
//!
//! The authority answers with a small JSON object:
//!
//! ```json
//! { "status": true, "plate": "ABC123" }
//! ```
//!
//! `status` is required and must be a boolean. `plate` is optional; a
//! non-string value is ignored rather than rejected. Anything that does
//! not yield a boolean `status` is a [`DecodeError`], never a grant.

use core::fmt;

use serde_json::Value;

use super::{AuthorizationOutcome, Identifier};
use crate::text::truncated;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Body is not a JSON object.
    Malformed,
    /// `status` is absent or not a boolean.
    MissingStatus,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed decision body"),
            Self::MissingStatus => write!(f, "decision body has no boolean status"),
        }
    }
}

/// Decode an HTTP 200 body into a grant or a denial.
pub fn decode_decision(body: &[u8]) -> Result<AuthorizationOutcome, DecodeError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| DecodeError::Malformed)?;
    let Value::Object(fields) = value else {
        return Err(DecodeError::Malformed);
    };

    let status = fields
        .get("status")
        .and_then(Value::as_bool)
        .ok_or(DecodeError::MissingStatus)?;

    if !status {
        return Ok(AuthorizationOutcome::Denied);
    }

    let plate = fields
        .get("plate")
        .and_then(Value::as_str)
        .map(truncated::<32>)
        .filter(|p: &Identifier| !p.is_empty());

    Ok(AuthorizationOutcome::Granted(plate))
}

/// Total mapping used by the transport: decode failures become `NoResponse`.
pub fn outcome_from_body(body: &[u8]) -> AuthorizationOutcome {
    match decode_decision(body) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("AUTHZ/http: {}", e);
            AuthorizationOutcome::NoResponse
        }
    }
}
