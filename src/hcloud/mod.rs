//! Client for the Hetzner Cloud and Hetzner APIs.
//!
//! [`Client`] is a thin JSON client: typed request helpers for each resource
//! family live in the submodules as additional `impl Client` blocks.

mod action;
mod common;
mod error;
mod iso;
mod load_balancer_type;
mod primary_ip;
mod retry;
mod server_type;
mod storage_box;
mod transport;
mod zone;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub use action::{Action, ActionResource, ActionStatus, PollFunction, PollOptions};
pub use common::{Datacenter, Deprecation, Location, Protection};
pub use error::{ActionError, ApiError, Error, ErrorCode, InvalidField};
pub use iso::Iso;
pub use load_balancer_type::LoadBalancerType;
pub use primary_ip::{PrimaryIp, PrimaryIpCreateOpts, PrimaryIpDnsPtr, PrimaryIpUpdateOpts};
pub use retry::RetryOptions;
pub use server_type::{ServerType, ServerTypeLocation};
pub use storage_box::{
    StorageBox, StorageBoxAccessSettings, StorageBoxCreateOpts, StorageBoxSnapshot,
    StorageBoxSnapshotCreateOpts, StorageBoxSnapshotPlan, StorageBoxStats, StorageBoxSubaccount,
    StorageBoxSubaccountAccessSettings, StorageBoxSubaccountCreateOpts, StorageBoxType,
};
pub use transport::{
    ApiRequest, ApiResponse, Endpoint, HttpTransport, Method, Transport, DEFAULT_CLOUD_ENDPOINT,
    DEFAULT_HETZNER_ENDPOINT,
};
pub use zone::{
    AuthoritativeNameservers, PrimaryNameserver, RRSetProtection, Zone, ZoneCreateOpts, ZoneMode,
    ZoneRRSet, ZoneRRSetCreateOpts, ZoneRRSetRecord,
};

/// Page size used when listing collections.
pub const PER_PAGE: u32 = 50;

/// Hetzner API client.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    poll: PollOptions,
    retry: RetryOptions,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("poll", &self.poll)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client with default polling and retry options.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            poll: PollOptions::default(),
            retry: RetryOptions::default(),
        }
    }

    /// Set how actions are polled.
    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    /// Set how `locked` errors are retried.
    pub fn with_retry_options(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// The configured poll options.
    pub fn poll_options(&self) -> PollOptions {
        self.poll
    }

    /// Send a request and return the raw body of a successful response.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, Error> {
        let method = request.method;
        let path = request.path.clone();
        debug!(method = method.as_str(), path = %path, "API request");

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let err = ApiError::from_body(response.status, &response.body);
            debug!(
                method = method.as_str(),
                path = %path,
                status = response.status,
                code = %err.code,
                "API request failed"
            );
            return Err(err.into());
        }
        Ok(response.body)
    }

    /// Send a request and decode the body of a successful response.
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let body = self.send(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// GET `path` and decode the response.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: Endpoint, path: &str) -> Result<T, Error> {
        self.request(ApiRequest::new(Method::Get, endpoint, path)).await
    }

    /// POST `body` to `path` and decode the response.
    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let body = serde_json::to_value(body)?;
        self.request(ApiRequest::new(Method::Post, endpoint, path).with_body(body))
            .await
    }

    /// PUT `body` to `path` and decode the response.
    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let body = serde_json::to_value(body)?;
        self.request(ApiRequest::new(Method::Put, endpoint, path).with_body(body))
            .await
    }

    /// DELETE `path`, returning the action the API started, if any.
    pub async fn delete(&self, endpoint: Endpoint, path: &str) -> Result<Option<Action>, Error> {
        let body = self
            .send(ApiRequest::new(Method::Delete, endpoint, path))
            .await?;
        action::action_from_body(&body)
    }

    /// Fetch every page of a collection and return the items stored under `key`.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        path: &str,
        query: &[(String, String)],
        key: &str,
    ) -> Result<Vec<T>, Error> {
        let mut items = Vec::new();
        let mut page: i64 = 1;

        loop {
            let mut request = ApiRequest::new(Method::Get, endpoint, path)
                .with_query("page", page.to_string())
                .with_query("per_page", PER_PAGE.to_string());
            for (k, v) in query {
                request = request.with_query(k.clone(), v.clone());
            }

            let mut body = self.send(request).await?;
            let page_items = match body.get_mut(key) {
                Some(value) => serde_json::from_value::<Vec<T>>(value.take())?,
                None => Vec::new(),
            };
            items.extend(page_items);

            match body
                .pointer("/meta/pagination/next_page")
                .and_then(Value::as_i64)
            {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(items)
    }
}
