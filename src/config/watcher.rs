//! Routes directory watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::dispatch::Dispatcher;

/// A watcher that monitors the routes directory for changes.
pub struct RoutesWatcher {
    path: PathBuf,
    change_tx: mpsc::UnboundedSender<()>,
}

impl RoutesWatcher {
    /// Create a new RoutesWatcher.
    ///
    /// Returns the watcher and a receiver that yields once per relevant change.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::debug!(paths = ?event.paths, "Routes change detected");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::Recursive)?;

        tracing::info!(path = ?self.path, "Routes watcher started");
        Ok(watcher)
    }
}

/// Reload `dispatcher` on every change until shutdown. Bursts of events
/// arriving together trigger a single reload.
pub async fn reload_on_change(
    dispatcher: Dispatcher,
    mut changes: mpsc::UnboundedReceiver<()>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            change = changes.recv() => {
                if change.is_none() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
                while changes.try_recv().is_ok() {}

                if let Err(e) = dispatcher.reload().await {
                    tracing::error!("Failed to reload routes: {}. Keeping current routes.", e);
                }
            }
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Routes watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::registry::{RouteModule, RouteRegistry};

    #[tokio::test]
    async fn test_change_triggers_reload() {
        let dir = tempfile::tempdir().unwrap();
        let registry = RouteRegistry::new()
            .with("a", RouteModule::new().get(|_req, res| Box::pin(async move { Ok(res.send("a")) })));
        let dispatcher = Dispatcher::builder()
            .routes_dir(dir.path())
            .registry(registry)
            .build()
            .unwrap();
        assert!(dispatcher.ensure_loaded().await.is_empty());

        std::fs::write(dir.path().join("a.rs"), "").unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let task = tokio::spawn(reload_on_change(dispatcher.clone(), rx, stop_rx));
        tx.send(()).unwrap();

        let mut loaded = false;
        for _ in 0..50 {
            if dispatcher.table().map(|t| t.len()) == Some(1) {
                loaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(loaded);

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
