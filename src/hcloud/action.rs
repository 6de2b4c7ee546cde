//! Actions: asynchronous server-side operations, and waiting for them.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::error::{ActionError, Error};
use super::transport::{ApiRequest, Endpoint, Method};
use super::Client;

/// Upper bound for the delay between two polls.
pub const MAX_POLL_DELAY: Duration = Duration::from_secs(10);

/// Status of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// Still in progress.
    Running,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Error,
}

/// A resource affected by an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResource {
    /// Resource ID.
    pub id: i64,
    /// Resource type, for example `primary_ip`.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ActionErrorBody {
    pub code: String,
    pub message: String,
}

/// An asynchronous operation started by an API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action ID.
    pub id: i64,
    /// Command the action runs, for example `assign_primary_ip`.
    pub command: String,
    /// Current status.
    pub status: ActionStatus,
    /// Progress in percent.
    #[serde(default)]
    pub progress: i64,
    /// Start timestamp.
    #[serde(default)]
    pub started: Option<String>,
    /// Finish timestamp, if finished.
    #[serde(default)]
    pub finished: Option<String>,
    /// Resources the action affects.
    #[serde(default)]
    pub resources: Vec<ActionResource>,
    #[serde(default)]
    pub(crate) error: Option<ActionErrorBody>,
}

impl Action {
    /// Returns true once the action is no longer running.
    pub fn is_finished(&self) -> bool {
        self.status != ActionStatus::Running
    }

    /// Converts a finished action into a result.
    pub fn result(&self) -> Result<(), ActionError> {
        if self.status != ActionStatus::Error {
            return Ok(());
        }
        let (code, message) = match &self.error {
            Some(err) => (err.code.clone(), err.message.clone()),
            None => ("action_failed".to_string(), "unknown error".to_string()),
        };
        Err(ActionError {
            action_id: self.id,
            command: self.command.clone(),
            code,
            message,
        })
    }
}

/// Extract the `action` field of a response body, if present.
pub(crate) fn action_from_body(body: &Value) -> Result<Option<Action>, Error> {
    match body.get("action") {
        Some(Value::Null) | None => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
    }
}

/// Shape of an action-only response, for example `POST .../actions/change_protection`.
#[derive(Debug, Deserialize)]
pub(crate) struct ActionResponse {
    pub action: Action,
}

/// Delay strategy between action polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollFunction {
    /// Poll at a fixed interval.
    Constant,
    /// Double the delay on every poll, capped at [`MAX_POLL_DELAY`].
    #[default]
    Exponential,
}

/// How actions are polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Base delay.
    pub interval: Duration,
    /// Delay strategy.
    pub function: PollFunction,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            function: PollFunction::default(),
        }
    }
}

impl PollOptions {
    /// Delay before poll number `attempt` (starting at 0).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self.function {
            PollFunction::Constant => self.interval,
            PollFunction::Exponential => {
                let factor = 2u32.saturating_pow(attempt.min(16));
                self.interval
                    .checked_mul(factor)
                    .unwrap_or(MAX_POLL_DELAY)
                    .min(MAX_POLL_DELAY)
            },
        }
    }
}

fn actions_path(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::Cloud => "/actions",
        Endpoint::Hetzner => "/storage_boxes/actions",
    }
}

impl Client {
    /// Fetch the current state of the given actions.
    pub async fn get_actions(&self, endpoint: Endpoint, ids: &[i64]) -> Result<Vec<Action>, Error> {
        #[derive(Deserialize)]
        struct Response {
            actions: Vec<Action>,
        }

        let mut request = ApiRequest::new(Method::Get, endpoint, actions_path(endpoint));
        for id in ids {
            request = request.with_query("id", id.to_string());
        }
        let response: Response = self.request(request).await?;
        Ok(response.actions)
    }

    /// Wait until every action finished. Returns the first failure.
    pub async fn wait_for_actions(&self, endpoint: Endpoint, actions: &[Action]) -> Result<(), Error> {
        let mut pending: BTreeMap<i64, Action> = BTreeMap::new();
        for action in actions {
            if action.is_finished() {
                action.result()?;
            } else {
                pending.insert(action.id, action.clone());
            }
        }

        let mut attempt = 0;
        while !pending.is_empty() {
            tokio::time::sleep(self.poll.delay(attempt)).await;
            attempt += 1;

            let ids: Vec<i64> = pending.keys().copied().collect();
            let polled = self.get_actions(endpoint, &ids).await?;
            if let Some(missing) = pending
                .values()
                .find(|p| polled.iter().all(|action| action.id != p.id))
            {
                return Err(ActionError {
                    action_id: missing.id,
                    command: missing.command.clone(),
                    code: "not_found".to_string(),
                    message: "action is no longer reported by the API".to_string(),
                }
                .into());
            }
            for action in polled {
                if !action.is_finished() {
                    debug!(
                        action_id = action.id,
                        command = %action.command,
                        progress = action.progress,
                        "Waiting for action"
                    );
                    continue;
                }
                pending.remove(&action.id);
                action.result()?;
                debug!(action_id = action.id, command = %action.command, "Action finished");
            }
        }

        Ok(())
    }

    /// Wait for a single action.
    pub async fn wait_for_action(&self, endpoint: Endpoint, action: &Action) -> Result<(), Error> {
        self.wait_for_actions(endpoint, std::slice::from_ref(action))
            .await
    }

    /// Wait for whichever of the given actions are present.
    pub async fn settle_actions<I>(&self, endpoint: Endpoint, actions: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Option<Action>>,
    {
        let actions: Vec<Action> = actions.into_iter().flatten().collect();
        if actions.is_empty() {
            return Ok(());
        }
        self.wait_for_actions(endpoint, &actions).await
    }

    /// POST to an action endpoint and wait for the action it starts.
    pub(crate) async fn run_action(
        &self,
        endpoint: Endpoint,
        path: &str,
        body: Value,
    ) -> Result<(), Error> {
        let response: ActionResponse = self
            .retry_locked(|| self.post(endpoint, path, &body))
            .await?;
        self.wait_for_action(endpoint, &response.action).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{action_json, MockTransport};
    use serde_json::json;

    #[test]
    fn test_poll_delay_constant() {
        let poll = PollOptions {
            interval: Duration::from_millis(200),
            function: PollFunction::Constant,
        };
        assert_eq!(poll.delay(0), Duration::from_millis(200));
        assert_eq!(poll.delay(5), Duration::from_millis(200));
    }

    #[test]
    fn test_poll_delay_exponential_is_capped() {
        let poll = PollOptions {
            interval: Duration::from_millis(500),
            function: PollFunction::Exponential,
        };
        assert_eq!(poll.delay(0), Duration::from_millis(500));
        assert_eq!(poll.delay(1), Duration::from_secs(1));
        assert_eq!(poll.delay(2), Duration::from_secs(2));
        assert_eq!(poll.delay(10), MAX_POLL_DELAY);
        assert_eq!(poll.delay(u32::MAX), MAX_POLL_DELAY);
    }

    #[test]
    fn test_action_result() {
        let action: Action = serde_json::from_value(json!({
            "id": 3,
            "command": "delete_zone",
            "status": "error",
            "progress": 100,
            "error": {"code": "zone_locked", "message": "zone is locked"}
        }))
        .unwrap();

        let err = action.result().unwrap_err();
        assert_eq!(err.action_id, 3);
        assert_eq!(err.code, "zone_locked");
    }

    #[test]
    fn test_action_from_body() {
        assert!(action_from_body(&Value::Null).unwrap().is_none());
        assert!(action_from_body(&json!({"action": null})).unwrap().is_none());

        let action = action_from_body(&json!({"action": action_json(1, "running")}))
            .unwrap()
            .unwrap();
        assert_eq!(action.id, 1);
        assert_eq!(action.status, ActionStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_actions_polls_until_done() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/actions",
            200,
            json!({"actions": [action_json(1, "running"), action_json(2, "success")]}),
        );
        mock.on(
            Method::Get,
            "/actions",
            200,
            json!({"actions": [action_json(1, "success")]}),
        );
        let client = mock.client();

        let actions: Vec<Action> = vec![
            serde_json::from_value(action_json(1, "running")).unwrap(),
            serde_json::from_value(action_json(2, "running")).unwrap(),
        ];
        client
            .wait_for_actions(Endpoint::Cloud, &actions)
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].query,
            vec![("id".to_string(), "1".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_actions_reports_failure() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/storage_boxes/actions",
            200,
            json!({"actions": [{
                "id": 9,
                "command": "change_type",
                "status": "error",
                "progress": 100,
                "error": {"code": "action_failed", "message": "boom"}
            }]}),
        );
        let client = mock.client();

        let action: Action = serde_json::from_value(action_json(9, "running")).unwrap();
        let err = client
            .wait_for_action(Endpoint::Hetzner, &action)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Action(ref e) if e.action_id == 9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_actions_fails_on_missing_action() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/actions", 200, json!({"actions": []}));
        let client = mock.client();

        let action: Action = serde_json::from_value(action_json(4, "running")).unwrap();
        let err = client
            .wait_for_action(Endpoint::Cloud, &action)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Action(ref e) if e.action_id == 4 && e.code == "not_found"));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_settle_actions_skips_absent() {
        let mock = MockTransport::new();
        let client = mock.client();

        let finished: Action = serde_json::from_value(action_json(5, "success")).unwrap();
        client
            .settle_actions(Endpoint::Cloud, vec![None, Some(finished)])
            .await
            .unwrap();
        assert!(mock.requests().is_empty());
    }
}
