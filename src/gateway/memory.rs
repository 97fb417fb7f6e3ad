use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{RemoteGateway, RemoteResource, SubmitFailure, SubmitRequest};

/// In-process gateway that records requests and replays scripted outcomes.
/// Without a script it echoes the body back with a generated `id`.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    script: Mutex<VecDeque<Result<RemoteResource, SubmitFailure>>>,
    requests: Mutex<Vec<(Uuid, SubmitRequest)>>,
    next_id: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(outcomes: Vec<Result<RemoteResource, SubmitFailure>>) -> Self {
        let gateway = Self::new();
        for outcome in outcomes {
            gateway.push(outcome);
        }
        gateway
    }

    pub fn push(&self, outcome: Result<RemoteResource, SubmitFailure>) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(outcome);
    }

    pub fn requests(&self) -> Vec<SubmitRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn request_ids(&self) -> Vec<Uuid> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn echo(&self, request: &SubmitRequest) -> RemoteResource {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut body = request.body.clone();
        if let Value::Object(map) = &mut body {
            map.entry("id").or_insert_with(|| Value::from(id));
        }
        RemoteResource { status: 201, body }
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn submit(
        &self,
        request: &SubmitRequest,
        request_id: Uuid,
    ) -> Result<RemoteResource, SubmitFailure> {
        debug!(method = %request.method, path = %request.path, %request_id, "memory gateway");
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((request_id, request.clone()));

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        scripted.unwrap_or_else(|| Ok(self.echo(request)))
    }
}
