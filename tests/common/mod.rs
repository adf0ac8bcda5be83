//! Recording fakes for the queue and store contracts.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use message_relay::core::{Ack, Message, QueueClient, RelayError, StoreClient};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// Scripted queue that records every call.
///
/// Receives pop from the script; once it is exhausted they return `Ok(None)`,
/// or a fresh message each time when built with [`FakeQueue::endless`].
pub struct FakeQueue {
    receive_script: Mutex<VecDeque<Result<Option<Message>, String>>>,
    send_error: Option<String>,
    endless: bool,
    sends: AtomicUsize,
    receives: AtomicUsize,
    last_body: Mutex<Option<String>>,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self {
            receive_script: Mutex::new(VecDeque::new()),
            send_error: None,
            endless: false,
            sends: AtomicUsize::new(0),
            receives: AtomicUsize::new(0),
            last_body: Mutex::new(None),
        }
    }

    pub fn endless() -> Self {
        Self {
            endless: true,
            ..Self::new()
        }
    }

    pub fn failing_sends(reason: &str) -> Self {
        Self {
            send_error: Some(reason.to_string()),
            ..Self::new()
        }
    }

    pub fn with_receive(self, result: Result<Option<Message>, String>) -> Self {
        self.receive_script.lock().push_back(result);
        self
    }

    pub fn send_calls(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn receive_calls(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Option<String> {
        self.last_body.lock().clone()
    }
}

#[async_trait]
impl QueueClient for FakeQueue {
    async fn send(&self, body: &str) -> Result<Ack, RelayError> {
        let n = self.sends.fetch_add(1, Ordering::SeqCst);
        *self.last_body.lock() = Some(body.to_string());
        match &self.send_error {
            Some(reason) => Err(RelayError::QueueSend(reason.clone())),
            None => Ok(Ack {
                message_id: format!("sent-{n}"),
            }),
        }
    }

    async fn receive(&self) -> Result<Option<Message>, RelayError> {
        let n = self.receives.fetch_add(1, Ordering::SeqCst);
        let scripted = self.receive_script.lock().pop_front();
        if let Some(result) = scripted {
            return result.map_err(RelayError::QueueReceive);
        }
        if self.endless {
            return Ok(Some(Message::new(format!("m-{n}"), "body")));
        }
        Ok(None)
    }

    fn endpoint(&self) -> &str {
        "fake://queue"
    }
}

/// Queue whose receives never complete, like a long poll that never returns.
pub struct BlockingQueue;

#[async_trait]
impl QueueClient for BlockingQueue {
    async fn send(&self, _body: &str) -> Result<Ack, RelayError> {
        Ok(Ack {
            message_id: "blocked".into(),
        })
    }

    async fn receive(&self) -> Result<Option<Message>, RelayError> {
        std::future::pending().await
    }

    fn endpoint(&self) -> &str {
        "fake://blocking"
    }
}

/// Store that records saves and can fail or block on demand.
pub struct FakeStore {
    fail_with: Option<String>,
    gate: Option<Semaphore>,
    started: AtomicUsize,
    saves: Mutex<Vec<(String, String)>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            gate: None,
            started: AtomicUsize::new(0),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::new()
        }
    }

    /// Every save blocks until [`FakeStore::release`] is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.close();
        }
    }

    pub fn started_calls(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> Vec<(String, String)> {
        self.saves.lock().clone()
    }
}

#[async_trait]
impl StoreClient for FakeStore {
    async fn save(&self, id: &str, body: &str) -> Result<(), RelayError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            // Closing the semaphore is the release signal.
            let _ = gate.acquire().await;
        }
        self.saves.lock().push((id.to_string(), body.to_string()));
        match &self.fail_with {
            Some(reason) => Err(RelayError::StoreWrite(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Poll `condition` until it holds or a second passes.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    condition()
}
