//! File-backed queue using JSON lines for durability.
//!
//! Every sent message is appended to `<dir>/<stream>.jsonl` and reloaded when the
//! queue is reopened. Visibility state is kept in memory only, so after a restart
//! every retained message is deliverable again. The log is rewritten without
//! expired messages on open and whenever expiry frees room in a full queue.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::memory::{QueueLimits, VisibilityQueue};
use crate::core::{Ack, Message, QueueClient, RelayError, MAX_MESSAGES_PER_RECEIVE};
use crate::util::clock::now_ms;

/// One message as written to disk.
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    id: String,
    body: String,
    #[serde(default)]
    sent_at_ms: u128,
}

impl Record {
    fn new(message: &Message, sent_at_ms: u128) -> Self {
        Self {
            id: message.id.clone(),
            body: message.body.clone(),
            sent_at_ms,
        }
    }
}

/// Durable single-process queue backed by a JSON-lines file.
pub struct FileQueue {
    endpoint: String,
    state: Arc<Mutex<FileState>>,
}

struct FileState {
    file_path: PathBuf,
    file: File,
    queue: VisibilityQueue,
}

impl FileQueue {
    /// Open (or create) the queue stored under `dir` as `<stream>.jsonl`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Backend`] if the directory cannot be created or an
    /// existing file cannot be read back.
    pub fn open(dir: impl AsRef<Path>, stream: &str, limits: QueueLimits) -> Result<Self, RelayError> {
        let dir = dir.as_ref();
        create_dir_all(dir).map_err(|e| RelayError::Backend(e.to_string()))?;
        let file_path = dir.join(format!("{stream}.jsonl"));

        let now = now_ms();
        let retention_ms = limits.retention.as_millis();
        let records = load_from_disk(&file_path)?;
        let stored = records.len();
        let mut queue = VisibilityQueue::new(limits);
        let retained = records
            .into_iter()
            .filter(|record| now.saturating_sub(record.sent_at_ms) < retention_ms);
        for record in retained {
            queue.restore(Message::new(record.id, record.body), record.sent_at_ms);
        }

        let file = if queue.len() < stored {
            rewrite(&file_path, &queue).map_err(RelayError::Backend)?
        } else {
            open_append(&file_path).map_err(RelayError::Backend)?
        };
        tracing::debug!(
            path = %file_path.display(),
            messages = queue.len(),
            dropped = stored - queue.len(),
            "opened file queue"
        );

        Ok(Self {
            endpoint: format!("file://{}", dir.display()),
            state: Arc::new(Mutex::new(FileState {
                file_path,
                file,
                queue,
            })),
        })
    }

    /// Number of messages held, visible or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Whether the queue holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileState {
    fn send(&mut self, body: String, now: u128) -> Result<Ack, String> {
        let message = Message::new(uuid::Uuid::new_v4().to_string(), body);
        if self.queue.expire(now) > 0 {
            self.file = rewrite(&self.file_path, &self.queue)?;
        }
        let record = Record::new(&message, now);
        self.queue.push(message, now)?;

        if let Err(e) = append(&mut self.file, &record) {
            self.queue.withdraw_newest(&record.id);
            return Err(e);
        }
        Ok(Ack {
            message_id: record.id,
        })
    }
}

fn open_append(file_path: &Path) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .map_err(|e| e.to_string())
}

fn append(file: &mut File, record: &Record) -> Result<(), String> {
    let line = serde_json::to_string(record).map_err(|e| e.to_string())?;
    writeln!(file, "{line}").map_err(|e| e.to_string())
}

/// Replace the log with the messages `queue` still holds.
fn rewrite(file_path: &Path, queue: &VisibilityQueue) -> Result<File, String> {
    let tmp_path = file_path.with_extension("jsonl.tmp");
    {
        let mut out = BufWriter::new(File::create(&tmp_path).map_err(|e| e.to_string())?);
        for queued in queue.messages() {
            let line = serde_json::to_string(&Record::new(&queued.message, queued.sent_at_ms))
                .map_err(|e| e.to_string())?;
            writeln!(out, "{line}").map_err(|e| e.to_string())?;
        }
        out.flush().map_err(|e| e.to_string())?;
    }
    std::fs::rename(&tmp_path, file_path).map_err(|e| e.to_string())?;
    open_append(file_path)
}

fn load_from_disk(file_path: &Path) -> Result<Vec<Record>, RelayError> {
    if !file_path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(file_path).map_err(|e| RelayError::Backend(e.to_string()))?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| RelayError::Backend(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record =
            serde_json::from_str(&line).map_err(|e| RelayError::Backend(e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

#[async_trait]
impl QueueClient for FileQueue {
    async fn send(&self, body: &str) -> Result<Ack, RelayError> {
        let state = Arc::clone(&self.state);
        let body = body.to_string();
        tokio::task::spawn_blocking(move || state.lock().send(body, now_ms()))
            .await
            .map_err(|e| RelayError::QueueSend(e.to_string()))?
            .map_err(RelayError::QueueSend)
    }

    async fn receive(&self) -> Result<Option<Message>, RelayError> {
        let mut delivered = self
            .state
            .lock()
            .queue
            .receive_up_to(MAX_MESSAGES_PER_RECEIVE, now_ms());
        Ok(delivered.pop())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn limits() -> QueueLimits {
        QueueLimits::with_visibility(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_messages_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let sent = {
            let q = FileQueue::open(dir.path(), "queue", limits()).unwrap();
            q.send("first").await.unwrap();
            q.send("second").await.unwrap()
        };

        let q = FileQueue::open(dir.path(), "queue", limits()).unwrap();
        assert_eq!(q.len(), 2);

        let first = q.receive().await.unwrap().unwrap();
        assert_eq!(first.body, "first");
        let second = q.receive().await.unwrap().unwrap();
        assert_eq!(second.id, sent.message_id);
        assert!(q.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_fails_when_file_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let q = FileQueue::open(dir.path(), "queue", limits()).unwrap();
        // Swap the open log for a read-only handle
        q.state.lock().file = File::open(dir.path().join("queue.jsonl")).unwrap();

        let result = q.send("body").await;
        assert!(matches!(result, Err(RelayError::QueueSend(_))));
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn test_send_fails_at_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        let limits = QueueLimits {
            max_depth: 1,
            ..limits()
        };
        let q = FileQueue::open(dir.path(), "queue", limits).unwrap();
        q.send("kept").await.unwrap();

        assert!(matches!(q.send("rejected").await, Err(RelayError::QueueSend(_))));
        let log = std::fs::read_to_string(dir.path().join("queue.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[test]
    fn test_open_drops_expired_messages_from_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.jsonl");
        let fresh = now_ms();
        std::fs::write(
            &path,
            format!(
                "{{\"id\":\"old\",\"body\":\"x\",\"sent_at_ms\":0}}\n\
                 {{\"id\":\"new\",\"body\":\"y\",\"sent_at_ms\":{fresh}}}\n"
            ),
        )
        .unwrap();

        let q = FileQueue::open(dir.path(), "queue", limits()).unwrap();
        assert_eq!(q.len(), 1);

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(!log.contains("\"old\""));
        assert!(log.contains("\"new\""));
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("queue.jsonl"), "not json\n").unwrap();

        let result = FileQueue::open(dir.path(), "queue", limits());
        assert!(matches!(result, Err(RelayError::Backend(_))));
    }
}
