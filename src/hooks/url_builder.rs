//! URL construction: prefix joining, base-origin resolution, and query serialization.

// std
use std::sync::atomic::{AtomicI64, Ordering};
// self
use crate::{_prelude::*, error::ConfigError, options::RequestOptions, request::ParamMap};

/// Query parameter carrying the cache-busting timestamp.
pub const TIMESTAMP_PARAM: &str = "_t";

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Prepends `prefix` to `path` unless the path already starts with it.
///
/// The check works on whole path segments, so `/api` is found in `/api/users` but not in
/// `/apiary`. Joining is idempotent: `join_prefix(&join_prefix(p, x), x) == join_prefix(p, x)`.
pub fn join_prefix(path: &str, prefix: &str) -> String {
	let path = with_leading_slash(path);
	let prefix = prefix.trim().trim_end_matches('/');

	if prefix.is_empty() {
		return path;
	}

	let prefix = with_leading_slash(prefix);
	let already_prefixed = path
		.strip_prefix(&prefix)
		.is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']));

	if already_prefixed { path } else { format!("{prefix}{path}") }
}

/// Resolves `path` into an absolute URL.
///
/// Absolute `http(s)` URLs are returned unchanged, which keeps resolution idempotent.
/// Relative paths get the configured prefix (when `join_prefix` is on) and are appended to
/// the configured API URL.
pub fn resolve(path: &str, options: &RequestOptions) -> Result<Url> {
	if let Ok(url) = Url::parse(path) {
		if matches!(url.scheme(), "http" | "https") {
			return Ok(url);
		}
	}

	let path = match (options.join_prefix, options.url_prefix.as_deref()) {
		(true, Some(prefix)) => join_prefix(path, prefix),
		_ => with_leading_slash(path),
	};
	let base = options
		.api_url
		.as_deref()
		.filter(|base| !base.trim().is_empty())
		.ok_or_else(|| ConfigError::MissingBaseUrl { path: path.clone() })?;
	let joined = format!("{}{path}", base.trim().trim_end_matches('/'));

	Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl { url: joined, source }.into())
}

/// Serializes `params` into the URL's query, percent-encoding keys and values.
///
/// Existing query pairs whose keys are also in `params` are replaced, so every key appears
/// exactly once. An empty map leaves the URL untouched (no trailing `?`).
pub fn append_params(url: &mut Url, params: &ParamMap) {
	if params.is_empty() {
		return;
	}

	let retained = url
		.query_pairs()
		.filter(|(key, _)| !params.contains_key(key.as_ref()))
		.map(|(key, value)| (key.into_owned(), value.into_owned()))
		.collect::<Vec<_>>();
	let mut pairs = url.query_pairs_mut();

	pairs.clear();
	pairs.extend_pairs(retained);

	for (key, value) in params {
		pairs.append_pair(key, &value.to_string());
	}
}

/// Returns a millisecond timestamp that is strictly greater than every previous result.
pub fn cache_buster() -> i64 {
	let now = i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000)
		.unwrap_or(i64::MAX);
	let previous = LAST_TIMESTAMP
		.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
		.unwrap_or(now);

	now.max(previous + 1)
}

fn with_leading_slash(path: &str) -> String {
	if path.starts_with('/') { path.to_owned() } else { format!("/{path}") }
}
