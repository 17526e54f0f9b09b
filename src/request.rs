//! Caller-facing request descriptors.

// self
use crate::{_prelude::*, http::Headers, options::RequestOverrides};

/// Ordered query parameter map.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// HTTP methods understood by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}

	/// Returns `true` for methods whose parameters always travel in the URL.
	pub const fn is_get_like(self) -> bool {
		matches!(self, Self::Get)
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Scalar query parameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
	/// Boolean value.
	Bool(bool),
	/// Numeric value.
	Number(serde_json::Number),
	/// String value.
	String(String),
}
impl ParamValue {
	pub(crate) fn to_json(&self) -> Value {
		match self {
			Self::Bool(value) => Value::Bool(*value),
			Self::Number(value) => Value::Number(value.clone()),
			Self::String(value) => Value::String(value.clone()),
		}
	}

	pub(crate) fn from_json(value: Value) -> Option<Self> {
		match value {
			Value::Bool(value) => Some(Self::Bool(value)),
			Value::Number(value) => Some(Self::Number(value)),
			Value::String(value) => Some(Self::String(value)),
			_ => None,
		}
	}
}
impl Display for ParamValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Bool(value) => Display::fmt(value, f),
			Self::Number(value) => Display::fmt(value, f),
			Self::String(value) => f.write_str(value),
		}
	}
}
impl From<bool> for ParamValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<&str> for ParamValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_owned())
	}
}
impl From<String> for ParamValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}
macro_rules! impl_param_number {
	($($ty:ty),+) => {
		$(
			impl From<$ty> for ParamValue {
				fn from(value: $ty) -> Self {
					Self::Number(value.into())
				}
			}
		)+
	};
}
impl_param_number!(i32, i64, u32, u64, usize);

/// Immutable description of one logical request.
///
/// Descriptors are never mutated by the pipeline: every attempt, retry, and replay derives
/// its own wire request from a shared prepared copy.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// HTTP method used by [`RequestClient::request`](crate::client::RequestClient::request).
	pub method: Method,
	/// Absolute URL or path relative to the configured API URL.
	pub url: String,
	/// Query (or, for bodiless non-GET requests, body) parameters.
	pub params: ParamMap,
	/// Structured body payload.
	pub body: Option<Value>,
	/// Caller-supplied headers.
	pub headers: Headers,
	/// Option overrides bound to this descriptor.
	pub options: RequestOverrides,
}
impl RequestDescriptor {
	/// Creates a descriptor for `method` + `url` with no parameters or body.
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self {
			method,
			url: url.into(),
			params: ParamMap::new(),
			body: None,
			headers: Headers::new(),
			options: RequestOverrides::default(),
		}
	}

	/// Shorthand for a `GET` descriptor.
	pub fn get(url: impl Into<String>) -> Self {
		Self::new(Method::Get, url)
	}

	/// Shorthand for a `POST` descriptor.
	pub fn post(url: impl Into<String>) -> Self {
		Self::new(Method::Post, url)
	}

	/// Adds (or replaces) one parameter.
	pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
		self.params.insert(key.into(), value.into());

		self
	}

	/// Sets the body payload.
	pub fn body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Adds (or replaces) one header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Binds option overrides to this descriptor.
	pub fn options(mut self, options: RequestOverrides) -> Self {
		self.options = options;

		self
	}
}
