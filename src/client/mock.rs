//! Scripted in-memory transport for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{FetchError, Transport};

/// What the mock answers for one request.
#[derive(Debug, Clone)]
pub(crate) enum MockReply {
    Json(serde_json::Value),
    Raw(Vec<u8>),
    Status(u16),
    TransportError,
}

#[derive(Debug, Clone)]
struct Step {
    reply: MockReply,
    gate: Option<Arc<Notify>>,
}

/// A transport answering from per-path scripts.
///
/// Each path holds a queue of steps. Steps are consumed in order and the
/// last one repeats forever. A gated step waits until its `Notify` is
/// signalled before answering.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replace the script for `path` with a single repeating reply.
    pub(crate) fn reply(&self, path: &str, reply: MockReply) {
        let mut routes = self.routes.lock();
        let queue = routes.entry(path.to_string()).or_default();
        queue.clear();
        queue.push_back(Step { reply, gate: None });
    }

    /// Append a reply to the script for `path`.
    pub(crate) fn push(&self, path: &str, reply: MockReply) {
        self.routes
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Step { reply, gate: None });
    }

    /// Append a reply that is held back until the returned gate is notified.
    pub(crate) fn push_gated(&self, path: &str, reply: MockReply) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.routes
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Step {
                reply,
                gate: Some(gate.clone()),
            });
        gate
    }

    /// Requests seen so far, formatted as "METHOD path?query".
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of requests made to `path`.
    pub(crate) fn call_count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.split(' ').nth(1).is_some_and(|p| p.split('?').next() == Some(path)))
            .count()
    }

    /// Highest number of requests that were outstanding at the same time.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self, path: &str) -> Option<Step> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    async fn answer(&self, method: &str, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, FetchError> {
        let mut call = format!("{} {}", method, path);
        if !query.is_empty() {
            let params: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            call.push('?');
            call.push_str(&params.join("&"));
        }
        self.calls.lock().push(call);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let step = self.next_step(path);
        if let Some(gate) = step.as_ref().and_then(|s| s.gate.clone()) {
            gate.notified().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step.map(|s| s.reply) {
            Some(MockReply::Json(value)) => Ok(serde_json::to_vec(&value)?),
            Some(MockReply::Raw(bytes)) => Ok(bytes),
            Some(MockReply::Status(code)) => Err(FetchError::Status(code)),
            Some(MockReply::TransportError) => {
                Err(FetchError::Connection("connection refused".to_string()))
            }
            None => Err(FetchError::Status(404)),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, FetchError> {
        self.answer("GET", path, query).await
    }

    async fn post(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self.answer("POST", path, &[]).await
    }
}
