//! Drives the request client against a mock admin backend: an expired access token is renewed
//! through the refresh endpoint and the original request is replayed transparently.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use bearer_pipeline::{
	auth::CredentialPair,
	client::ReqwestRequestClient,
	ext::{ErrorNotice, Notifier},
	http::ReqwestTransport,
	options::RequestOverrides,
	request::RequestDescriptor,
	reqwest::Client,
	store::MemoryCredentialStore,
	url::Url,
};

struct ConsoleNotifier;
impl Notifier for ConsoleNotifier {
	fn notify(&self, notice: ErrorNotice) {
		eprintln!("[{:?}] {}", notice.mode, notice.message);
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/tenant/devices").header("Authorization", "Bearer stale");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"errorCode":11,"message":"Token has expired"}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/tenant/devices").header("Authorization", "Bearer fresh");
			then.status(200).header("content-type", "application/json").body(
				json!({
					"errorCode": 0,
					"message": "",
					"result": { "data": [{ "name": "Pump 7" }], "totalElements": 1 }
				})
				.to_string(),
			);
		})
		.await;

	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"token":"fresh","refreshToken":"fresh-refresh"}"#);
		})
		.await;
	let store = MemoryCredentialStore::new(CredentialPair::new("stale", "refresh"));
	// The mock server presents a self-signed certificate.
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client = ReqwestRequestClient::builder(transport)
		.api_url(server.base_url())
		.url_prefix("/api")
		.credential_store(Arc::new(store.clone()))
		.refresh_url(Url::parse(&server.url("/api/auth/token"))?)
		.session_listener(Arc::new(|reason: &str| eprintln!("Session expired: {reason}.")))
		.notifier(Arc::new(ConsoleNotifier))
		.build();
	let devices = client
		.get(
			&RequestDescriptor::get("/tenant/devices").param("pageSize", 10).param("page", 0),
			&RequestOverrides::none(),
		)
		.await?;

	println!("Devices: {}.", devices.into_data().unwrap_or_default());
	println!("Refresh calls: {}.", client.refresh_metrics().attempts());

	refresh_mock.assert_async().await;

	Ok(())
}
