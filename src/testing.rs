//! Test harness for the provider.
//!
//! [`MockTransport`] stands in for the Hetzner APIs: responses are scripted
//! per method and path, and every request is recorded. [`ProviderTester`]
//! runs a [`ProviderService`] through plan/apply/read sequences on top of it.
//!
//! ```ignore
//! use hemmer_provider_hcloud::hcloud::Method;
//! use hemmer_provider_hcloud::testing::{MockTransport, ProviderTester};
//! use hemmer_provider_hcloud::HcloudProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn creates_a_zone() {
//!     let mock = MockTransport::new();
//!     mock.on(Method::Post, "/zones", 201, json!({"zone": { /* ... */ }, "action": { /* ... */ }}));
//!     mock.on(Method::Get, "/zones/42", 200, json!({"zone": { /* ... */ }}));
//!     let tester = ProviderTester::new(HcloudProvider::with_client(mock.client()));
//!     let state = tester
//!         .lifecycle_create("hcloud_zone", json!({"name": "example.com", "mode": "primary"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["id"], "42");
//! }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::hcloud::{
    ApiRequest, ApiResponse, Client, Error, Method, PollFunction, PollOptions, RetryOptions,
    Transport,
};
use crate::schema::{Diagnostic, DiagnosticSeverity};
use crate::service::ProviderService;
use crate::types::PlanResult;

/// Drives a provider the way the host sequences its calls.
///
/// Single operations go straight to [`ProviderTester::provider`]. The tester
/// adds the multi-step flows (plan then apply then read) and turns error
/// diagnostics into a [`TestError`].
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// Warnings pass; any error diagnostic fails.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_data_source_config(data_source_type, config)
                .await?,
        )
    }

    pub async fn plan_create(&self, resource_type: &str, config: Value) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior), config.clone(), config)
            .await
    }

    /// Plan, create, then read back. Returns the refreshed state.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.provider.create(resource_type, plan.planned_state).await?;
        self.provider.read(resource_type, created).await
    }

    /// Plan, update, then read back. Returns the refreshed state.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_update(resource_type, prior.clone(), config).await?;
        let updated = self
            .provider
            .update(resource_type, prior, plan.planned_state)
            .await?;
        self.provider.read(resource_type, updated).await
    }

    /// Plan the removal, then delete.
    pub async fn lifecycle_delete(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        self.provider
            .plan(resource_type, Some(state.clone()), Value::Null, Value::Null)
            .await?;
        self.provider.delete(resource_type, state).await
    }
}

/// Failure of a tester operation.
#[derive(Debug)]
pub enum TestError {
    /// The operation returned error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

fn summaries(diagnostics: &[Diagnostic], severity: DiagnosticSeverity) -> Vec<&str> {
    diagnostics
        .iter()
        .filter(|d| d.severity == severity)
        .map(|d| d.summary.as_str())
        .collect()
}

/// Panics unless the plan has changes and no replacement. Same check as an
/// in-place update; kept separate so create tests read naturally.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "create plan has no changes");
    assert!(!plan.requires_replace, "create plan requires replacement");
}

pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "expected no changes, plan changes {:?}",
        changed_paths(plan)
    );
}

pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "expected replacement, plan changes {:?} in place",
        changed_paths(plan)
    );
}

pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "update plan has no changes");
    assert!(
        !plan.requires_replace,
        "expected in-place update, plan requires replacement"
    );
}

/// Panics unless some change has exactly this top-level path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let paths = changed_paths(plan);
    assert!(paths.contains(&path), "'{}' not among changed {:?}", path, paths);
}

pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors = summaries(diagnostics, DiagnosticSeverity::Error);
    assert!(errors.is_empty(), "Expected no errors, got {:?}", errors);
}

/// Panics unless an error summary contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let errors = summaries(diagnostics, DiagnosticSeverity::Error);
    assert!(
        errors.iter().any(|s| s.contains(substring)),
        "no error mentions '{}': {:?}",
        substring,
        errors
    );
}

/// Panics unless a warning summary contains `substring`.
pub fn assert_warning_contains(diagnostics: &[Diagnostic], substring: &str) {
    let warnings = summaries(diagnostics, DiagnosticSeverity::Warning);
    assert!(
        warnings.iter().any(|s| s.contains(substring)),
        "no warning mentions '{}': {:?}",
        substring,
        warnings
    );
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<(Method, String), VecDeque<ApiResponse>>,
    requests: Vec<ApiRequest>,
}

/// Scripted [`Transport`].
///
/// Responses are queued per method and path (query ignored) and served in
/// order; the last one is repeated once the queue is down to it. Requests
/// without a scripted response get a `404 not_found`.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test poisons the lock; the state is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a response for `method path`.
    pub fn on(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.lock()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(ApiResponse::new(status, body));
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Requests sent to `method path`.
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// A client backed by this transport, with millisecond poll and retry delays.
    pub fn client(&self) -> Client {
        Client::new(Arc::new(self.clone()))
            .with_poll_options(PollOptions {
                interval: Duration::from_millis(1),
                function: PollFunction::Constant,
            })
            .with_retry_options(RetryOptions {
                max_retries: 5,
                delay: Duration::from_millis(1),
            })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let mut state = self.lock();
        let key = (request.method, request.path.clone());
        let response = match state.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        let response = response.unwrap_or_else(|| {
            ApiResponse::new(
                404,
                json!({"error": {
                    "code": "not_found",
                    "message": format!("no mock response for {} {}", request.method.as_str(), request.path),
                }}),
            )
        });
        state.requests.push(request);
        Ok(response)
    }
}

/// JSON of an action with the given status.
pub fn action_json(id: i64, status: &str) -> Value {
    let finished = status != "running";
    json!({
        "id": id,
        "command": "test_command",
        "status": status,
        "progress": if finished { 100 } else { 0 },
        "started": "2024-01-01T00:00:00+00:00",
        "finished": if finished { json!("2024-01-01T00:00:01+00:00") } else { Value::Null },
        "resources": [],
        "error": null,
    })
}
