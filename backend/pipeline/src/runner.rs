//! Sequential folder runner.
//!
//! Folders are processed one at a time. A folder-level error skips that
//! folder and the run continues; a run-level error (see
//! [`PipelineError::is_run_fatal`]) stops the run. The inventory is
//! flushed after every successful folder and only then.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use skuforge_core::{PipelineError, ProductRecord};
use skuforge_extract::parse_response;
use skuforge_inventory::{ArtifactWriter, InventoryStore, InventoryTable};
use skuforge_logging::{RunEvent, RunEventLogger};
use skuforge_media::{collect_images, list_sku_folders};
use skuforge_understanding::{ModelClient, PromptBuilder};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::export::{ArtifactSet, ExportQueue, Exporter, DEFAULT_QUEUE_CAPACITY};
use crate::summary::{FolderFailure, RunSummary};

/// What happened to one successfully processed folder.
#[derive(Debug)]
struct FolderResult {
    record: ProductRecord,
    strategy: &'static str,
    replaced: bool,
    artifacts: ArtifactSet,
}

pub struct Pipeline {
    client: ModelClient,
    prompt: PromptBuilder,
    writer: ArtifactWriter,
    store: InventoryStore,
    exporter: Option<Arc<dyn Exporter>>,
}

impl Pipeline {
    pub fn new(client: ModelClient, writer: ArtifactWriter, store: InventoryStore) -> Self {
        Self {
            client,
            prompt: PromptBuilder::new(),
            writer,
            store,
            exporter: None,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn store(&self) -> &InventoryStore {
        &self.store
    }

    /// Process every SKU folder directly under `root`, in name order.
    /// The output directory is never treated as a SKU folder.
    pub async fn run_root(&self, root: &Path) -> Result<RunSummary, PipelineError> {
        let output = resolved(self.writer.out_dir());
        let folders: Vec<PathBuf> = list_sku_folders(root)?
            .into_iter()
            .filter(|folder| {
                let is_output = resolved(folder) == output;
                if is_output {
                    debug!(folder = %folder.display(), "Skipping output directory");
                }
                !is_output
            })
            .collect();
        info!(root = %root.display(), folders = folders.len(), "Discovered SKU folders");
        self.run(&folders).await
    }

    /// Process `folders` in the given order.
    ///
    /// Returns `Err` only when the run cannot start (unreadable inventory).
    /// An abort part-way through is reported in [`RunSummary::aborted`].
    pub async fn run(&self, folders: &[PathBuf]) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let mut table = self.store.load()?;
        let mut summary = RunSummary::new(&run_id);

        info!(
            run_id = %run_id,
            folders = folders.len(),
            provider = %self.client.provider_name(),
            inventory_rows = table.len(),
            "Starting run"
        );

        let queue = self
            .exporter
            .as_ref()
            .map(|exporter| ExportQueue::spawn(exporter.clone(), DEFAULT_QUEUE_CAPACITY));

        for folder in folders {
            match self.process_folder(folder, &mut table).await {
                Ok(result) => {
                    summary.processed += 1;
                    RunEventLogger::log_event(
                        &run_id,
                        RunEvent::FolderProcessed {
                            folder: folder.display().to_string(),
                            sku: result.record.sku().to_string(),
                            strategy: result.strategy.to_string(),
                            known_fields: result.record.known_count(),
                            replaced: result.replaced,
                        },
                    );
                    if let Some(queue) = &queue {
                        if let Err(e) = queue.submit(result.artifacts).await {
                            warn!(folder = %folder.display(), error = %e, "Could not queue export");
                        }
                    }
                }
                Err(err @ PipelineError::EmptyFolder { .. }) => {
                    warn!(folder = %folder.display(), "Skipping folder without images");
                    RunEventLogger::log_event(
                        &run_id,
                        RunEvent::FolderSkipped {
                            folder: folder.display().to_string(),
                            reason: err.to_string(),
                        },
                    );
                    summary.record_skip(FolderFailure::new(folder, &err));
                }
                Err(err) => {
                    let failure = FolderFailure::new(folder, &err);
                    RunEventLogger::log_event(
                        &run_id,
                        RunEvent::FolderFailed {
                            folder: failure.folder.display().to_string(),
                            kind: failure.kind.clone(),
                            reason: failure.reason.clone(),
                        },
                    );
                    if err.is_run_fatal() {
                        error!(folder = %folder.display(), error = %err, "Aborting run");
                        summary.record_abort(failure);
                        break;
                    }
                    warn!(folder = %folder.display(), kind = err.kind(), error = %err, "Folder failed");
                    summary.record_failure(failure);
                }
            }
        }

        if let Some(queue) = queue {
            let report = queue.finish().await;
            summary.exported = report.exported;
            summary.export_failures = report.failed;
        }

        RunEventLogger::log_event(
            &run_id,
            RunEvent::RunCompleted {
                processed: summary.processed,
                skipped: summary.skipped,
                failed: summary.failed,
                aborted: summary.is_aborted(),
            },
        );
        info!(
            run_id = %run_id,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Run finished"
        );
        Ok(summary)
    }

    async fn process_folder(
        &self,
        folder: &Path,
        table: &mut InventoryTable,
    ) -> Result<FolderResult, PipelineError> {
        let batch = collect_images(folder)?;
        let default_sku = batch.default_sku().to_string();

        let raw = self
            .client
            .describe_batch(&batch, &self.prompt, &default_sku)
            .await?;

        let outcome = parse_response(&raw, &default_sku);
        let strategy = outcome.strategy();
        if outcome.record().is_none() {
            self.writer.preserve_failed_response(&default_sku, &raw)?;
        }
        let record = outcome.into_record()?;

        let written = self.writer.write_description(&record, &raw)?;
        let copied = self.writer.copy_batch_images(record.sku(), &batch)?;

        let replaced = table.upsert(record.clone());
        self.store.save(table)?;

        let mut files = written.files;
        files.extend(copied);
        Ok(FolderResult {
            replaced: replaced.is_some(),
            strategy,
            artifacts: ArtifactSet {
                sku: written.sku,
                sku_dir: written.sku_dir,
                files,
                inventory_path: self.store.path().to_path_buf(),
            },
            record,
        })
    }
}

fn resolved(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::DirectoryMirror;
    use skuforge_core::{Field, ModelError};
    use skuforge_media::PayloadBudget;
    use skuforge_understanding::{MockVisionModel, RetryPolicy};

    const CHANEL: &str = "CHANEL_BOY_BLACK_JK0145";

    fn make_folder(root: &Path, name: &str, images: &[&str]) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        for image in images {
            std::fs::write(dir.join(image), [0xff, 0xd8, 0xff, 0xe0]).unwrap();
        }
        dir
    }

    fn pipeline(model: Arc<MockVisionModel>, out: &Path) -> Pipeline {
        let client = ModelClient::new(model, "test-model").with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 10,
            ..RetryPolicy::default()
        });
        Pipeline::new(
            client,
            ArtifactWriter::new(out),
            InventoryStore::new(out.join("inventory.csv")),
        )
    }

    fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files = Vec::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            for entry in std::fs::read_dir(&current).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    files.push((path.clone(), std::fs::read(&path).unwrap()));
                }
            }
        }
        files.sort();
        files
    }

    #[tokio::test]
    async fn describes_a_folder_end_to_end() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let folder = make_folder(input.path(), CHANEL, &["2.jpg", "1.jpg", "3.jpg"]);
        let model = Arc::new(MockVisionModel::always(r#"{"brand": "Chanel", "color": "black"}"#));

        let summary = pipeline(model.clone(), out.path()).run(&[folder]).await.unwrap();
        assert_eq!((summary.processed, summary.skipped, summary.failed), (1, 0, 0));
        assert_eq!(model.calls(), 1);
        assert!(model.last_prompt().unwrap().contains("Images provided: 3 (1.jpg, 2.jpg, 3.jpg)"));

        let json = std::fs::read_to_string(
            out.path().join(CHANEL).join(format!("{CHANEL}_description.json")),
        )
        .unwrap();
        let record: ProductRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.sku(), CHANEL);
        assert_eq!(record.get(Field::Brand), "Chanel");
        assert_eq!(record.get(Field::Color), "Black");
        assert_eq!(record.get(Field::Material), "Unknown");
        assert_eq!(record.get(Field::PriceEstimate), "Unknown");

        let table = InventoryStore::new(out.path().join("inventory.csv")).load().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(CHANEL), Some(&record));
    }

    #[tokio::test]
    async fn rerun_produces_identical_output() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let folders = vec![
            make_folder(input.path(), "BAG_A", &["1.jpg"]),
            make_folder(input.path(), "BAG_B", &["1.png", "2.png"]),
        ];
        let model = Arc::new(MockVisionModel::always(
            "Brand: hermes\nModel: Birkin 30\nCondition: 90%\nLight scratches on hardware",
        ));
        let pipeline = pipeline(model, out.path());

        pipeline.run(&folders).await.unwrap();
        let first = snapshot(out.path());
        let summary = pipeline.run(&folders).await.unwrap();
        let second = snapshot(out.path());

        assert_eq!(summary.processed, 2);
        assert_eq!(first, second);
        let table = pipeline.store().load().unwrap();
        let skus: Vec<&str> = table.all_records().iter().map(|r| r.sku()).collect();
        assert_eq!(skus, ["BAG_A", "BAG_B"]);
    }

    #[tokio::test]
    async fn unparsable_reply_keeps_previous_row() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let folder = make_folder(input.path(), "BAG_A", &["1.jpg"]);

        let mut previous = ProductRecord::new("BAG_A");
        previous.set(Field::Brand, "Celine");
        let store = InventoryStore::new(out.path().join("inventory.csv"));
        store.save(&InventoryTable::from_records([previous.clone()])).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let model = Arc::new(MockVisionModel::always("Sorry, I cannot see any product here."));
        let summary = pipeline(model, out.path()).run(&[folder.clone()]).await.unwrap();

        assert_eq!((summary.processed, summary.failed), (0, 1));
        assert_eq!(summary.failures[0].kind, "unparsable_response");
        assert_eq!(summary.failures[0].folder, folder);
        assert!(!summary.is_aborted());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        assert_eq!(
            std::fs::read_to_string(out.path().join("_failed").join("BAG_A_raw.txt")).unwrap(),
            "Sorry, I cannot see any product here."
        );
    }

    #[tokio::test]
    async fn empty_folders_are_skipped() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        make_folder(input.path(), "A_EMPTY", &[]);
        std::fs::write(input.path().join("A_EMPTY").join("notes.txt"), "x").unwrap();
        make_folder(input.path(), "B_BAG", &["1.jpg"]);
        let model = Arc::new(MockVisionModel::always(r#"{"brand": "Dior"}"#));

        let summary = pipeline(model.clone(), out.path()).run_root(input.path()).await.unwrap();
        assert_eq!((summary.processed, summary.skipped, summary.failed), (1, 1, 0));
        assert_eq!(summary.failures[0].kind, "empty_folder");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn fatal_error_aborts_remaining_folders() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let folders = vec![
            make_folder(input.path(), "A", &["1.jpg"]),
            make_folder(input.path(), "B", &["1.jpg"]),
        ];
        let model = Arc::new(MockVisionModel::failing(ModelError::Fatal("HTTP 401".into())));

        let summary = pipeline(model.clone(), out.path()).run(&folders).await.unwrap();
        assert!(summary.is_aborted());
        assert_eq!(summary.aborted.as_ref().unwrap().kind, "fatal");
        assert_eq!((summary.processed, summary.failed), (0, 1));
        assert_eq!(model.calls(), 1);
        assert!(!out.path().join("inventory.csv").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_only_that_folder() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let folders = vec![
            make_folder(input.path(), "A", &["1.jpg"]),
            make_folder(input.path(), "B", &["1.jpg"]),
        ];
        let unavailable = || Err(ModelError::Transient("503".into()));
        let model = Arc::new(MockVisionModel::scripted(vec![
            unavailable(),
            unavailable(),
            unavailable(),
            Ok(r#"{"brand": "Fendi"}"#.into()),
        ]));

        let summary = pipeline(model.clone(), out.path())
            .run(&folders)
            .await
            .unwrap();
        assert_eq!((summary.processed, summary.failed), (1, 1));
        assert_eq!(summary.failures[0].kind, "transient");
        assert_eq!(model.calls(), 4);

        let table = InventoryStore::new(out.path().join("inventory.csv")).load().unwrap();
        assert!(table.get("A").is_none());
        assert_eq!(table.get("B").unwrap().get(Field::Brand), "Fendi");
    }

    #[tokio::test]
    async fn exports_are_drained_before_the_run_returns() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mirror = tempfile::tempdir().unwrap();
        let folders = vec![
            make_folder(input.path(), "A", &["1.jpg"]),
            make_folder(input.path(), "B", &["1.jpg"]),
        ];
        let model = Arc::new(MockVisionModel::always(r#"{"brand": "Loewe"}"#));
        let pipeline = pipeline(model, out.path())
            .with_exporter(Arc::new(DirectoryMirror::new(mirror.path())));

        let summary = pipeline.run(&folders).await.unwrap();
        assert_eq!(summary.exported, 2);
        assert_eq!(summary.export_failures, 0);
        assert!(mirror.path().join("B").join("B_description.json").exists());
        assert_eq!(
            std::fs::read(mirror.path().join("inventory.csv")).unwrap(),
            std::fs::read(out.path().join("inventory.csv")).unwrap()
        );
    }

    #[tokio::test]
    async fn oversized_folder_does_not_stop_the_run() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let big = input.path().join("A_BIG");
        std::fs::create_dir_all(&big).unwrap();
        std::fs::write(big.join("1.jpg"), vec![0u8; 200_000]).unwrap();
        let ok = make_folder(input.path(), "B_OK", &["1.jpg"]);

        let model = Arc::new(MockVisionModel::always(r#"{"brand": "Celine"}"#));
        let client = ModelClient::new(model.clone(), "test-model")
            .with_budget(PayloadBudget { max_total_bytes: 100_000, ..PayloadBudget::default() });
        let pipeline = Pipeline::new(
            client,
            ArtifactWriter::new(out.path()),
            InventoryStore::new(out.path().join("inventory.csv")),
        );

        let summary = pipeline.run(&[big.clone(), ok]).await.unwrap();
        assert!(!summary.is_aborted());
        assert_eq!((summary.processed, summary.failed), (1, 1));
        assert_eq!(summary.failures[0].kind, "payload_too_large");
        assert_eq!(summary.failures[0].folder, big);
        assert_eq!(model.calls(), 1);
        assert!(pipeline.store().load().unwrap().get("B_OK").is_some());
    }

    #[tokio::test]
    async fn image_cap_is_reflected_in_the_prompt() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let folder = make_folder(input.path(), CHANEL, &["3.jpg", "1.jpg", "2.jpg"]);
        let model = Arc::new(MockVisionModel::always(r#"{"brand": "Chanel"}"#));
        let client = ModelClient::new(model.clone(), "test-model").with_max_images(2);
        let pipeline = Pipeline::new(
            client,
            ArtifactWriter::new(out.path()),
            InventoryStore::new(out.path().join("inventory.csv")),
        );

        pipeline.run(&[folder]).await.unwrap();
        assert!(model.last_prompt().unwrap().contains("Images provided: 2 (1.jpg, 2.jpg)\n"));
    }

    #[tokio::test]
    async fn output_directory_under_root_is_not_a_sku_folder() {
        let input = tempfile::tempdir().unwrap();
        make_folder(input.path(), "BAG_A", &["1.jpg"]);
        let out = input.path().join("output");
        let model = Arc::new(MockVisionModel::always(r#"{"brand": "Goyard"}"#));
        let pipeline = pipeline(model.clone(), &out);

        pipeline.run_root(input.path()).await.unwrap();
        let summary = pipeline.run_root(input.path()).await.unwrap();
        assert_eq!((summary.processed, summary.skipped, summary.failed), (1, 0, 0));
        assert_eq!(model.calls(), 2);
    }
}
