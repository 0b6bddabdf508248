//! Catalog snapshot publishing.
//!
//! Packages and action costs change rarely and are read on every spend and
//! checkout. A single refresher owns the `watch` sender and republishes the
//! snapshot on an interval; readers hold a cheap `CatalogHandle` clone and
//! always see a complete snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::credits::CatalogSnapshot;
use crate::domain::foundation::DomainError;
use crate::ports::CatalogReader;

/// Read side of the published catalog.
#[derive(Clone)]
pub struct CatalogHandle {
    rx: watch::Receiver<Arc<CatalogSnapshot>>,
}

impl CatalogHandle {
    /// Handle over a fixed snapshot that never refreshes.
    pub fn fixed(snapshot: CatalogSnapshot) -> Self {
        let (_tx, rx) = watch::channel(Arc::new(snapshot));
        Self { rx }
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.rx.borrow().clone()
    }
}

/// Reloads the catalog from the datastore and publishes it.
pub struct CatalogRefresher {
    reader: Arc<dyn CatalogReader>,
    tx: watch::Sender<Arc<CatalogSnapshot>>,
    interval: Duration,
}

impl CatalogRefresher {
    /// Creates the refresher and its handle, starting from an empty snapshot.
    pub fn new(reader: Arc<dyn CatalogReader>, interval: Duration) -> (Self, CatalogHandle) {
        let (tx, rx) = watch::channel(Arc::new(CatalogSnapshot::empty()));
        (
            Self {
                reader,
                tx,
                interval,
            },
            CatalogHandle { rx },
        )
    }

    /// Loads and publishes one snapshot.
    ///
    /// On error the previous snapshot stays published.
    pub async fn refresh(&self) -> Result<Arc<CatalogSnapshot>, DomainError> {
        let packages = self.reader.list_packages().await?;
        let costs = self.reader.list_costs().await?;
        let snapshot = Arc::new(CatalogSnapshot::new(packages, costs, Utc::now()));

        self.tx.send_replace(snapshot.clone());
        tracing::debug!(
            packages = snapshot.active_packages().len(),
            costs = snapshot.costs().len(),
            "Catalog snapshot published"
        );
        Ok(snapshot)
    }

    /// Refreshes on the configured interval until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // first tick fires immediately; startup already loaded once
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    tracing::warn!(error = %e, "Catalog refresh failed, keeping previous snapshot");
                }
            }
        })
    }
}
