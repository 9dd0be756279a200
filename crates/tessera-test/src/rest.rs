//! Recording REST requester.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use tessera_discord::rest::{Requester, RestError, RestResult, Route};

/// One call made through a [`MockRequester`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Route that was requested.
    pub route: Route,
    /// JSON body, if any.
    pub body: Option<Value>,
}

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful response with this body.
    Json(Value),
    /// Error response with this status and message.
    Status {
        /// HTTP status.
        status: u16,
        /// Error message.
        message: String,
    },
}

/// [`Requester`] that records every call.
///
/// Scripted replies are consumed in call order. Once the script is empty,
/// create-message calls answer `{"id": "m<n>"}` where `n` is the 1-based call
/// number, DM creation answers a DM channel, delete calls answer `null` and
/// anything else answers an empty object.
#[derive(Debug, Default)]
pub struct MockRequester {
    calls: Mutex<Vec<RecordedCall>>,
    script: Mutex<VecDeque<MockReply>>,
    fail_on: Mutex<Option<usize>>,
}

impl MockRequester {
    /// Requester with no script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    #[must_use]
    pub fn with_reply(self, reply: MockReply) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
        self
    }

    /// Queue a successful JSON reply.
    #[must_use]
    pub fn with_json(self, body: Value) -> Self {
        self.with_reply(MockReply::Json(body))
    }

    /// Fail call number `n` (1-based) with a 500, whatever the script says.
    #[must_use]
    pub fn failing_on(self, n: usize) -> Self {
        if let Ok(mut fail_on) = self.fail_on.lock() {
            *fail_on = Some(n);
        }
        self
    }

    /// Every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn default_reply(route: &Route, n: usize) -> Value {
        match route {
            Route::CreateMessage { channel_id } => {
                json!({"id": format!("m{n}"), "channel_id": channel_id})
            },
            Route::EditMessage {
                channel_id,
                message_id,
            } => json!({"id": message_id, "channel_id": channel_id}),
            Route::CreateDm => json!({"id": format!("dm{n}"), "type": 1}),
            Route::DeleteMessage { .. } | Route::RemoveGuildMember { .. } => Value::Null,
            _ => json!({}),
        }
    }
}

#[async_trait]
impl Requester for MockRequester {
    async fn request(&self, route: Route, body: Option<Value>) -> RestResult<Value> {
        let n = match self.calls.lock() {
            Ok(mut calls) => {
                calls.push(RecordedCall {
                    route: route.clone(),
                    body,
                });
                calls.len()
            },
            Err(_) => 0,
        };

        let failing = self.fail_on.lock().ok().and_then(|f| *f) == Some(n);
        let reply = if failing {
            MockReply::Status {
                status: 500,
                message: "injected failure".into(),
            }
        } else {
            self.script
                .lock()
                .ok()
                .and_then(|mut s| s.pop_front())
                .unwrap_or_else(|| MockReply::Json(Self::default_reply(&route, n)))
        };

        match reply {
            MockReply::Json(value) => Ok(value),
            MockReply::Status { status, message } => Err(RestError::Status {
                route: route.name(),
                status,
                code: None,
                message,
            }),
        }
    }
}
