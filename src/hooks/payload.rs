//! Outgoing payload normalization.
//!
//! The normalizer walks a JSON payload and rewrites every value its [`DatePredicate`]
//! recognizes into the backend's wire date format. Surrounding whitespace is trimmed from
//! the remaining strings. The caller's value is never modified; a normalized copy is
//! returned instead.

// crates.io
use time::{
	format_description::{OwnedFormatItem, well_known::Rfc3339},
	macros::format_description,
};
// self
use crate::{_prelude::*, error::ConfigError};

/// Recognizes date-like values inside a payload.
pub trait DatePredicate
where
	Self: Send + Sync,
{
	/// Returns the instant `value` represents, or `None` when it is not a date.
	fn recognize(&self, value: &Value) -> Option<OffsetDateTime>;
}
impl<F> DatePredicate for F
where
	F: Fn(&Value) -> Option<OffsetDateTime> + Send + Sync,
{
	fn recognize(&self, value: &Value) -> Option<OffsetDateTime> {
		self(value)
	}
}

/// Default predicate: RFC 3339 strings are dates.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rfc3339Dates;
impl DatePredicate for Rfc3339Dates {
	fn recognize(&self, value: &Value) -> Option<OffsetDateTime> {
		value.as_str().and_then(|text| OffsetDateTime::parse(text.trim(), &Rfc3339).ok())
	}
}

/// Rewrites date-like values to the wire format and trims strings.
#[derive(Clone)]
pub struct PayloadNormalizer {
	predicate: Arc<dyn DatePredicate>,
	format: OwnedFormatItem,
	trim_strings: bool,
	max_depth: usize,
}
impl PayloadNormalizer {
	/// Containers nested deeper than this are copied without inspection.
	pub const DEFAULT_MAX_DEPTH: usize = 64;

	/// Creates a normalizer emitting `YYYY-MM-DD HH:mm` for RFC 3339 strings.
	pub fn new() -> Self {
		Self {
			predicate: Arc::new(Rfc3339Dates),
			format: OwnedFormatItem::from(format_description!(
				"[year]-[month]-[day] [hour]:[minute]"
			)),
			trim_strings: true,
			max_depth: Self::DEFAULT_MAX_DEPTH,
		}
	}

	/// Replaces the date predicate.
	pub fn with_predicate(mut self, predicate: impl 'static + DatePredicate) -> Self {
		self.predicate = Arc::new(predicate);

		self
	}

	/// Replaces the wire format with a `time` format description such as
	/// `"[year]/[month]/[day]"`.
	pub fn with_format(mut self, description: &str) -> Result<Self, ConfigError> {
		let items = time::format_description::parse(description)?;

		self.format = OwnedFormatItem::from(items.as_slice());

		Ok(self)
	}

	/// Enables or disables string trimming.
	pub fn with_trim_strings(mut self, trim: bool) -> Self {
		self.trim_strings = trim;

		self
	}

	/// Overrides the nesting depth that is inspected.
	pub fn with_max_depth(mut self, depth: usize) -> Self {
		self.max_depth = depth;

		self
	}

	/// Returns a normalized copy of `value`.
	pub fn normalize(&self, value: &Value) -> Value {
		self.visit(value, 0)
	}

	fn visit(&self, value: &Value, depth: usize) -> Value {
		if let Some(formatted) =
			self.predicate.recognize(value).and_then(|date| date.format(&self.format).ok())
		{
			return Value::String(formatted);
		}

		match value {
			Value::Object(map) if depth < self.max_depth => Value::Object(
				map.iter().map(|(key, item)| (key.clone(), self.visit(item, depth + 1))).collect(),
			),
			Value::Array(items) if depth < self.max_depth =>
				Value::Array(items.iter().map(|item| self.visit(item, depth + 1)).collect()),
			Value::String(text) if self.trim_strings => Value::String(text.trim().to_owned()),
			other => other.clone(),
		}
	}
}
impl Default for PayloadNormalizer {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for PayloadNormalizer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PayloadNormalizer")
			.field("trim_strings", &self.trim_strings)
			.field("max_depth", &self.max_depth)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn formats_nested_dates_and_trims_strings() {
		let payload = json!({
			"name": "  Pump 7  ",
			"window": {
				"startTs": "2024-03-05T08:09:10Z",
				"tags": [" a ", "2024-12-31T23:59:00+02:00"],
			},
			"count": 0,
			"description": null
		});
		let normalized = PayloadNormalizer::new().normalize(&payload);

		assert_eq!(
			normalized,
			json!({
				"name": "Pump 7",
				"window": { "startTs": "2024-03-05 08:09", "tags": ["a", "2024-12-31 23:59"] },
				"count": 0,
				"description": null
			})
		);
		assert_eq!(payload["name"], "  Pump 7  ");
	}

	#[test]
	fn injected_predicate_recognizes_custom_shapes() {
		let normalizer = PayloadNormalizer::new().with_predicate(|value: &Value| {
			value.get("$epoch").and_then(Value::as_i64).and_then(|secs| {
				OffsetDateTime::from_unix_timestamp(secs).ok()
			})
		});
		let normalized = normalizer
			.normalize(&json!({ "at": { "$epoch": 0 }, "raw": "2024-03-05T08:09:10Z" }));

		assert_eq!(normalized, json!({ "at": "1970-01-01 00:00", "raw": "2024-03-05T08:09:10Z" }));
	}

	#[test]
	fn custom_format_and_depth_guard_apply() {
		let normalizer = PayloadNormalizer::new()
			.with_format("[year]/[month]/[day]")
			.expect("Format description should parse.")
			.with_max_depth(1);
		let normalized = normalizer.normalize(&json!({
			"at": "2024-03-05T08:09:10Z",
			"deep": { "at": "2024-03-05T08:09:10Z" }
		}));

		assert_eq!(normalized["at"], "2024/03/05");
		assert_eq!(normalized["deep"]["at"], "2024-03-05T08:09:10Z");
	}

	#[test]
	fn invalid_format_is_a_config_error() {
		assert!(PayloadNormalizer::new().with_format("[year").is_err());
	}
}
