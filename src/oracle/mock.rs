//! Scripted oracle for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::OracleError;
use super::{JudgmentOracle, OracleRequest};

#[derive(Debug, Clone)]
enum Action {
    Reply(String),
    Fail(OracleError),
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    action: Action,
}

/// Answers by rule: the first rule whose needle occurs in the prompt wins, otherwise the
/// default reply. Every request is recorded.
#[derive(Debug)]
pub struct ScriptedOracle {
    rules: Vec<Rule>,
    default_reply: String,
    transient_failures: Mutex<usize>,
    requests: Mutex<Vec<OracleRequest>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    /// Replies `reply` to every prompt.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default_reply: reply.into(),
            transient_failures: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn reply_when(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            action: Action::Reply(reply.into()),
        });
        self
    }

    pub fn fail_when(mut self, needle: impl Into<String>, error: OracleError) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            action: Action::Fail(error),
        });
        self
    }

    /// Simulates a call that never answers in time.
    pub fn timeout_when(self, needle: impl Into<String>) -> Self {
        self.fail_when(
            needle,
            OracleError::Timeout {
                after: std::time::Duration::from_secs(30),
            },
        )
    }

    /// The next `n` calls fail with a transient provider error.
    pub fn with_transient_failures(self, n: usize) -> Self {
        *self.transient_failures.lock() = n;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl JudgmentOracle for ScriptedOracle {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn judge(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        {
            let mut remaining = self.transient_failures.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(OracleError::Provider {
                    reason: "scripted transient failure".to_string(),
                });
            }
        }

        let action = self
            .rules
            .iter()
            .find(|rule| request.prompt.contains(rule.needle.as_str()))
            .map(|rule| rule.action.clone())
            .unwrap_or_else(|| Action::Reply(self.default_reply.clone()));

        match action {
            Action::Reply(text) => Ok(text),
            Action::Fail(err) => Err(err),
        }
    }
}
