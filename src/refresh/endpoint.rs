//! JSON refresh endpoint backed by any [`HttpTransport`].

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	classify,
	error::{ConfigError, MalformedError},
	hooks::response::unwrap_envelope,
	http::{Headers, HttpTransport, WireRequest},
	options::{ContentType, EnvelopeConfig},
	refresh::{RefreshEndpoint, RefreshFuture, RefreshedCredentials},
	request::Method,
};

/// Posts `{"refreshToken": "..."}` to a fixed URL and reads `{"token", "refreshToken"}`.
///
/// By default the credentials are read from the top level of the body. After
/// [`with_envelope`](Self::with_envelope) they are read from the envelope's result field.
pub struct JsonRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	url: Url,
	envelope: EnvelopeConfig,
	enveloped: bool,
}
impl<T> JsonRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an endpoint that posts to `url` through `transport`.
	pub fn new(transport: impl Into<Arc<T>>, url: Url) -> Self {
		Self {
			transport: transport.into(),
			url,
			envelope: EnvelopeConfig::default(),
			enveloped: false,
		}
	}

	/// Expects successful responses wrapped in `envelope` and classifies errors with it.
	pub fn with_envelope(mut self, envelope: EnvelopeConfig) -> Self {
		self.envelope = envelope;
		self.enveloped = true;

		self
	}

	/// Returns the endpoint URL.
	pub fn url(&self) -> &Url {
		&self.url
	}

	async fn exchange(&self, refresh_token: &TokenSecret) -> Result<RefreshedCredentials> {
		let body = serde_json::to_vec(&RefreshRequest { refresh_token: refresh_token.expose() })
			.map_err(ConfigError::from)?;
		let headers = Headers::from_iter([
			("Content-Type", ContentType::Json.header_value()),
			("Accept", "application/json"),
		]);
		let request = WireRequest {
			method: Method::Post,
			url: self.url.clone(),
			headers,
			body: Some(body),
			timeout: None,
		};
		let response = self.transport.send(request).await.map_err(classify::transport_error)?;

		if !response.is_success() {
			return Err(classify::status_error(&response, &self.envelope));
		}

		let status = Some(response.status);
		let mut payload = serde_json::from_slice::<Value>(&response.body)
			.map_err(|e| Error::MalformedResponse { status, source: MalformedError::Json(e) })?;

		if self.enveloped {
			payload = unwrap_envelope(&self.envelope, response.status, payload)?;
		}

		let issued: RefreshResponse = serde_path_to_error::deserialize(payload)
			.map_err(|e| Error::MalformedResponse { status, source: MalformedError::Shape(e) })?;

		if issued.token.is_blank() {
			return Err(Error::MalformedResponse {
				status,
				source: MalformedError::MissingResult { field: "token".into() },
			});
		}

		Ok(RefreshedCredentials {
			access_token: issued.token,
			refresh_token: issued.refresh_token.filter(|token| !token.is_blank()),
		})
	}
}
impl<T> RefreshEndpoint for JsonRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(self.exchange(refresh_token))
	}
}
impl<T> Debug for JsonRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JsonRefreshEndpoint")
			.field("url", &self.url.as_str())
			.field("enveloped", &self.enveloped)
			.finish()
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
	token: TokenSecret,
	#[serde(default)]
	refresh_token: Option<TokenSecret>,
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{_preludet::RecordingTransport, http::HttpResponse};

	fn endpoint(transport: RecordingTransport) -> JsonRefreshEndpoint<RecordingTransport> {
		let url = Url::parse("https://tb.example.com/api/auth/token").expect("Fixture URL.");

		JsonRefreshEndpoint::new(transport, url)
	}

	#[tokio::test]
	async fn posts_the_refresh_token_and_reads_the_pair() {
		let transport = RecordingTransport::new(|_| {
			let body = json!({ "token": "access-2", "refreshToken": "refresh-2" });

			Ok(HttpResponse::json(200, &body))
		});
		let endpoint = endpoint(transport.clone());
		let issued = endpoint
			.refresh(&TokenSecret::new("refresh-1"))
			.await
			.expect("Refresh should succeed.");

		assert_eq!(issued.access_token.expose(), "access-2");
		assert_eq!(issued.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-2"));

		let sent = transport.requests();
		let body: Value = serde_json::from_slice(sent[0].body.as_deref().expect("Body expected."))
			.expect("Body should be JSON.");

		assert_eq!(sent[0].method, Method::Post);
		assert_eq!(body, json!({ "refreshToken": "refresh-1" }));
	}

	#[tokio::test]
	async fn rejected_refresh_tokens_surface_as_errors() {
		let transport = RecordingTransport::new(|_| {
			Ok(HttpResponse::json(401, &json!({ "errorCode": 11, "message": "Token has expired" })))
		});
		let err = endpoint(transport)
			.refresh(&TokenSecret::new("refresh-1"))
			.await
			.expect_err("Refresh should fail.");

		assert!(matches!(err, Error::AuthExpired));
	}

	#[tokio::test]
	async fn responses_without_a_token_are_malformed() {
		let transport = RecordingTransport::new(|_| {
			Ok(HttpResponse::json(200, &json!({ "refreshToken": "r" })))
		});
		let err = endpoint(transport)
			.refresh(&TokenSecret::new("refresh-1"))
			.await
			.expect_err("Refresh should fail.");

		assert!(matches!(err, Error::MalformedResponse { status: Some(200), .. }));
	}

	#[tokio::test]
	async fn enveloped_responses_are_unwrapped() {
		let transport = RecordingTransport::new(|_| {
			let body = json!({
				"errorCode": 0,
				"message": "",
				"result": { "token": "access-2", "refreshToken": "refresh-2" },
			});

			Ok(HttpResponse::json(200, &body))
		});
		let issued = endpoint(transport)
			.with_envelope(EnvelopeConfig::default())
			.refresh(&TokenSecret::new("refresh-1"))
			.await
			.expect("Enveloped refresh should succeed.");

		assert_eq!(issued.access_token.expose(), "access-2");
		assert_eq!(issued.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-2"));
	}

	#[tokio::test]
	async fn enveloped_business_failures_are_classified() {
		let transport = RecordingTransport::new(|_| {
			Ok(HttpResponse::json(200, &json!({ "errorCode": 11, "message": "Token has expired" })))
		});
		let err = endpoint(transport)
			.with_envelope(EnvelopeConfig::default())
			.refresh(&TokenSecret::new("refresh-1"))
			.await
			.expect_err("Refresh should fail.");

		assert!(matches!(err, Error::AuthExpired));
	}
}
