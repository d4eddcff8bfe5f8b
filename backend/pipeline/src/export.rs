//! Export hand-off.
//!
//! Finished per-SKU artifacts are queued on a bounded channel and handed to
//! an [`Exporter`] by a single background worker. The worker never sees the
//! inventory table, only files that are already final on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use skuforge_core::PipelineError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default queue capacity (finished folders waiting for export).
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// The finished files of one SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub sku: String,
    pub sku_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub inventory_path: PathBuf,
}

#[async_trait]
pub trait Exporter: Send + Sync {
    fn name(&self) -> &str;
    async fn export(&self, set: &ArtifactSet) -> Result<(), PipelineError>;
}

/// Mirrors every artifact set (and the inventory file) under a second root.
pub struct DirectoryMirror {
    root: PathBuf,
}

impl DirectoryMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

async fn copy_into(src: &Path, dest_dir: &Path) -> Result<(), PipelineError> {
    let name = src
        .file_name()
        .ok_or_else(|| PipelineError::Fatal(format!("not a file: {}", src.display())))?;
    let dest = dest_dir.join(name);
    tokio::fs::copy(src, &dest)
        .await
        .map_err(|e| PipelineError::io(&dest, e))?;
    Ok(())
}

#[async_trait]
impl Exporter for DirectoryMirror {
    fn name(&self) -> &str {
        "directory_mirror"
    }

    async fn export(&self, set: &ArtifactSet) -> Result<(), PipelineError> {
        let sku_dir = self.root.join(&set.sku);
        tokio::fs::create_dir_all(&sku_dir)
            .await
            .map_err(|e| PipelineError::io(&sku_dir, e))?;

        for file in &set.files {
            copy_into(file, &sku_dir).await?;
        }
        if set.inventory_path.exists() {
            copy_into(&set.inventory_path, &self.root).await?;
        }

        debug!(sku = %set.sku, root = %self.root.display(), files = set.files.len(), "Mirrored artifacts");
        Ok(())
    }
}

/// Export counts, reported once the queue is drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub exported: usize,
    pub failed: usize,
}

/// Bounded queue with one worker task draining it into an exporter.
pub struct ExportQueue {
    tx: mpsc::Sender<ArtifactSet>,
    worker: JoinHandle<ExportReport>,
}

impl ExportQueue {
    pub fn spawn(exporter: Arc<dyn Exporter>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<ArtifactSet>(capacity.max(1));

        let worker = tokio::spawn(async move {
            let mut report = ExportReport::default();
            while let Some(set) = rx.recv().await {
                match exporter.export(&set).await {
                    Ok(()) => {
                        report.exported += 1;
                        info!(exporter = %exporter.name(), sku = %set.sku, "Exported artifacts");
                    }
                    Err(e) => {
                        report.failed += 1;
                        error!(exporter = %exporter.name(), sku = %set.sku, error = %e, "Export failed");
                    }
                }
            }
            report
        });

        Self { tx, worker }
    }

    /// Queue a finished artifact set. Waits while the queue is full.
    pub async fn submit(&self, set: ArtifactSet) -> Result<(), PipelineError> {
        self.tx
            .send(set)
            .await
            .map_err(|e| PipelineError::Fatal(format!("export worker stopped; dropped {}", e.0.sku)))
    }

    /// Close the queue and wait until every queued set has been exported.
    pub async fn finish(self) -> ExportReport {
        drop(self.tx);
        match self.worker.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Export worker did not finish cleanly");
                ExportReport::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl Exporter for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn export(&self, set: &ArtifactSet) -> Result<(), PipelineError> {
            if set.sku == "BAD" {
                return Err(PipelineError::Fatal("remote rejected".into()));
            }
            self.0.lock().unwrap().push(set.sku.clone());
            Ok(())
        }
    }

    fn set(sku: &str) -> ArtifactSet {
        ArtifactSet {
            sku: sku.into(),
            sku_dir: PathBuf::from(sku),
            files: Vec::new(),
            inventory_path: PathBuf::from("inventory.csv"),
        }
    }

    #[tokio::test]
    async fn queue_drains_in_order_before_finish_returns() {
        let exporter = Arc::new(Recording(Mutex::new(Vec::new())));
        let queue = ExportQueue::spawn(exporter.clone(), 1);
        for sku in ["A", "BAD", "B", "C"] {
            queue.submit(set(sku)).await.unwrap();
        }

        let report = queue.finish().await;
        assert_eq!(report, ExportReport { exported: 3, failed: 1 });
        assert_eq!(*exporter.0.lock().unwrap(), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn mirror_copies_files_and_inventory() {
        let out = tempfile::tempdir().unwrap();
        let mirror_root = tempfile::tempdir().unwrap();
        let sku_dir = out.path().join("SKU1");
        std::fs::create_dir_all(&sku_dir).unwrap();
        let desc = sku_dir.join("SKU1_description.txt");
        std::fs::write(&desc, "SKU: SKU1\n").unwrap();
        let inventory = out.path().join("inventory.csv");
        std::fs::write(&inventory, "SKU\nSKU1\n").unwrap();

        let mirror = DirectoryMirror::new(mirror_root.path());
        mirror
            .export(&ArtifactSet {
                sku: "SKU1".into(),
                sku_dir,
                files: vec![desc],
                inventory_path: inventory,
            })
            .await
            .unwrap();

        let copied = mirror_root.path().join("SKU1").join("SKU1_description.txt");
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "SKU: SKU1\n");
        assert!(mirror_root.path().join("inventory.csv").exists());
    }
}
