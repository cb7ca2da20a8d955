use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::notify::{Notice, Notifier};

/// Background backend call started by a session operation.
///
/// Dropping the handle does not cancel the call.
#[derive(Debug)]
pub struct SyncHandle {
    task: JoinHandle<bool>,
}

impl SyncHandle {
    /// Wait for the call to settle. Returns `true` when the backend accepted it.
    pub async fn wait(self) -> bool {
        self.task.await.unwrap_or(false)
    }
}

/// Run `call` on the tokio runtime. Failures are logged and surfaced as a notice,
/// they never reach the caller that started the operation.
pub(crate) fn spawn_sync<F>(notifier: Arc<dyn Notifier>, what: &'static str, call: F) -> SyncHandle
where
    F: Future<Output = Result<(), ClientError>> + Send + 'static,
{
    let task = tokio::spawn(async move {
        match call.await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, what, "background sync failed");
                notifier.notify(Notice::network_failure(format!("Could not sync {what}: {err}")));
                false
            }
        }
    });
    SyncHandle { task }
}
