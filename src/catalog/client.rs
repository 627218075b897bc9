//!
//! HTTP client for the remote chain and asset catalogs.
//!
//! The catalogs are plain JSON documents served over HTTP GET without authentication. This module
//! provides the `CatalogFetcher` seam used by the sync pipeline and its reqwest-backed
//! implementation, which retries transient failures with exponential backoff before giving up.

use super::types::CatalogError;
use backoff::{ExponentialBackoff, future::retry};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Source of raw catalog bytes.
#[async_trait::async_trait]
pub trait CatalogFetcher: Send + Sync {
	/// Fetch the raw body published at `url`.
	async fn fetch(&self, url: &Url) -> Result<Vec<u8>, CatalogError>;
}

/// Remote catalog client
#[derive(Clone)]
pub struct RemoteCatalogClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Upper bound on the time spent retrying one fetch.
	max_elapsed: Duration,
}

impl RemoteCatalogClient {
	/// Create a new catalog client.
	///
	/// # Arguments
	/// * `request_timeout` - Timeout applied to each individual request.
	/// * `max_elapsed` - Total time budget for retrying one fetch.
	///
	/// # Returns
	/// A new `RemoteCatalogClient`, or a `CatalogError` if the HTTP client cannot be built.
	pub fn new(request_timeout: Duration, max_elapsed: Duration) -> Result<Self, CatalogError> {
		let http_client = Client::builder().timeout(request_timeout).build()?;

		Ok(Self {
			http_client,
			max_elapsed,
		})
	}

	fn backoff(&self) -> ExponentialBackoff {
		ExponentialBackoff {
			max_elapsed_time: Some(self.max_elapsed),
			..ExponentialBackoff::default()
		}
	}
}

#[async_trait::async_trait]
impl CatalogFetcher for RemoteCatalogClient {
	async fn fetch(&self, url: &Url) -> Result<Vec<u8>, CatalogError> {
		debug!("Fetching catalog from {}", url);

		let client = &self.http_client;
		let body = retry(self.backoff(), || {
			let url = url.clone();
			async move {
				let response = client.get(url.clone()).send().await.map_err(|e| {
					warn!("Catalog request to {} failed: {}", url, e);
					backoff::Error::transient(CatalogError::from(e))
				})?;

				let status = response.status();
				if !status.is_success() {
					let error = CatalogError::StatusError {
						status,
						url: url.to_string(),
					};
					// Client errors will not fix themselves on retry
					return if status.is_server_error() {
						warn!("{}", error);
						Err(backoff::Error::transient(error))
					} else {
						Err(backoff::Error::permanent(error))
					};
				}

				let bytes = response
					.bytes()
					.await
					.map_err(|e| backoff::Error::transient(CatalogError::from(e)))?;

				Ok::<Vec<u8>, backoff::Error<CatalogError>>(bytes.to_vec())
			}
		})
		.await?;

		debug!("Fetched {} bytes from {}", body.len(), url);
		Ok(body)
	}
}

/// Parse a catalog URL.
pub fn parse_catalog_url(url: &str) -> Result<Url, CatalogError> {
	Url::parse(url).map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", url, e)))
}
