//! Best-effort JWT expiry inspection.
//!
//! Only the `exp` claim of the payload segment is read; signatures are never verified. Tokens
//! that are not JWTs (or carry no `exp`) report no expiry and are never treated as expired.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

#[derive(Deserialize)]
struct Claims {
	exp: Option<i64>,
}

/// Returns the instant encoded in the token's `exp` claim, if any.
pub fn expires_at(token: &str) -> Option<OffsetDateTime> {
	let mut segments = token.split('.');
	let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);

	if segments.next().is_some() {
		return None;
	}

	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
	let claims = serde_json::from_slice::<Claims>(&bytes).ok()?;

	OffsetDateTime::from_unix_timestamp(claims.exp?).ok()
}

/// Returns `true` when the token is a JWT whose `exp` is at or before `now`.
pub fn is_expired_at(token: &str, now: OffsetDateTime) -> bool {
	expires_at(token).is_some_and(|exp| exp <= now)
}
