use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::ports::JobContext;

/// Job context for a collector run hosted by this process.
///
/// Stop requests come from cancelling the token (the binary wires it to
/// ctrl-c); check-ins are logged and the latest one is kept.
#[derive(Debug)]
pub struct LocalJobContext {
    cancel: CancellationToken,
    values: Map<String, Value>,
    last_checkin: Mutex<Option<String>>,
}

impl LocalJobContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            values: Map::new(),
            last_checkin: Mutex::new(None),
        }
    }

    /// Ambient value readable through `JobContext::get`
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn last_checkin(&self) -> Option<String> {
        self.last_checkin.lock().clone()
    }
}

impl JobContext for LocalJobContext {
    fn stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn checkin(&self, progress: &str) {
        info!(progress, "Check-in");
        *self.last_checkin.lock() = Some(progress.to_string());
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}
