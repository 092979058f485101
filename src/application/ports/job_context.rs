#[cfg(test)]
use mockall::automock;

/// What the hosting job runner exposes to a running collector
#[cfg_attr(test, automock)]
pub trait JobContext: Send + Sync {
    /// True once the runner asked the job to stop
    fn stop_requested(&self) -> bool;

    /// Report progress back to the runner
    fn checkin(&self, progress: &str);

    /// Ambient configuration value
    fn get(&self, key: &str) -> Option<serde_json::Value>;
}
