//! End-to-end pipeline tests against the local storage and in-memory queue
//! backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::StreamExt;
use tempfile::TempDir;

use datalift_core::{PipelineSettings, RunnerMode};
use datalift_pipeline::{
    ArchivePipeline, Outcome, PipelineError, RejectReason, RunnerConfig, WorkerRunner,
};
use datalift_queue::{InMemoryQueue, QueueConsumer, QueuePublisher};
use datalift_storage::{LocalObjectStore, ObjectStore, StorageError, StorageResult};

const SOURCE_BUCKET: &str = "src-bucket";
const DEST_BUCKET: &str = "dst-bucket";

enum Member<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

fn targz(members: &[Member<'_>]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for member in members {
        match member {
            Member::File(path, content) => {
                let mut header = tar::Header::new_gnu();
                header.set_size(content.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, path, *content).unwrap();
            }
            Member::Dir(path) => {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                header.set_cksum();
                builder.append_data(&mut header, path, &b""[..]).unwrap();
            }
        }
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        project_id: "proj1".to_string(),
        table_id: "mytable".to_string(),
        destination_bucket: DEST_BUCKET.to_string(),
    }
}

struct Harness {
    _dir: TempDir,
    store: Arc<LocalObjectStore>,
    output: InMemoryQueue,
    pipeline: Arc<ArchivePipeline>,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalObjectStore::new(dir.path()).await.unwrap());
    let output = InMemoryQueue::new();
    let pipeline = Arc::new(ArchivePipeline::new(
        store.clone(),
        Arc::new(output.clone()),
        settings(),
    ));
    Harness {
        _dir: dir,
        store,
        output,
        pipeline,
    }
}

async fn stage_archive(store: &LocalObjectStore, key: &str, bytes: &[u8]) {
    store
        .put(SOURCE_BUCKET, key, bytes.to_vec())
        .await
        .unwrap();
}

fn inbound(key: &str) -> Vec<u8> {
    format!(r#"{{"name":"{}","bucket":"{}"}}"#, key, SOURCE_BUCKET).into_bytes()
}

async fn read_object(store: &LocalObjectStore, bucket: &str, key: &str) -> Vec<u8> {
    let mut stream = store.get_stream(bucket, key).await.unwrap();
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

async fn published(output: &InMemoryQueue) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    for message in output.receive().await.unwrap() {
        out.push(serde_json::from_slice(&message.payload).unwrap());
    }
    out
}

#[tokio::test(flavor = "multi_thread")]
async fn relocates_every_member_and_publishes_one_notice() {
    let h = harness().await;
    let archive = targz(&[
        Member::Dir("2024-01-15/"),
        Member::File("2024-01-15/a.txt", b"alpha"),
        Member::File("2024-01-15/b.txt", b"bravo"),
    ]);
    stage_archive(&h.store, "2024_01_15/data.csv.tar.gz", &archive).await;

    let outcome = h
        .pipeline
        .process_message(&inbound("2024_01_15/data.csv.tar.gz"))
        .await
        .unwrap();

    let Outcome::Completed(notice) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(notice.dataset_id, "2024_01_15");
    assert_eq!(notice.file_size, archive.len() as u64);

    assert_eq!(
        read_object(&h.store, DEST_BUCKET, "2024-01-15/a.txt").await,
        b"alpha"
    );
    assert_eq!(
        read_object(&h.store, DEST_BUCKET, "2024-01-15/b.txt").await,
        b"bravo"
    );

    // Exactly one notice, with the §6 wire shape.
    let messages = published(&h.output).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0],
        serde_json::json!({
            "project_id": "proj1",
            "dataset_id": "2024_01_15",
            "table_id": "mytable",
            "original_date": "2024-01-15",
            "source_bucket": SOURCE_BUCKET,
            "destination_bucket": DEST_BUCKET,
            "file_size": archive.len(),
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_directory_rejects_without_writes_or_output() {
    let h = harness().await;
    let archive = targz(&[
        Member::File("reports/a.txt", b"alpha"),
        Member::File("reports/b.txt", b"bravo"),
    ]);
    stage_archive(&h.store, "reports.tar.gz", &archive).await;

    let outcome = h
        .pipeline
        .process_message(&inbound("reports.tar.gz"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Rejected(RejectReason::InvalidDirectory { .. })
    ));
    assert!(!h.store.exists(DEST_BUCKET, "reports/a.txt").await.unwrap());
    assert!(!h.store.exists(DEST_BUCKET, "reports/b.txt").await.unwrap());
    assert_eq!(h.output.ready_len().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn hidden_prefix_does_not_establish_directory_but_is_relocated() {
    let h = harness().await;
    let archive = targz(&[
        Member::File(".manifest", b"hidden"),
        Member::File("2024-01-15/a.txt", b"alpha"),
    ]);
    stage_archive(&h.store, "2024_01_15/data.tar.gz", &archive).await;

    let outcome = h
        .pipeline
        .process_message(&inbound("2024_01_15/data.tar.gz"))
        .await
        .unwrap();

    let Outcome::Completed(notice) = outcome else {
        panic!("expected completion");
    };
    // The hidden member did not name the dataset, but it still landed.
    assert_eq!(notice.dataset_id, "2024_01_15");
    assert_eq!(notice.original_date, "2024-01-15");
    assert_eq!(read_object(&h.store, DEST_BUCKET, ".manifest").await, b"hidden");
}

#[tokio::test(flavor = "multi_thread")]
async fn hidden_only_archive_is_rejected_with_nothing_written() {
    let h = harness().await;
    let archive = targz(&[
        Member::File(".manifest", b"hidden"),
        Member::File(".notes", b"more"),
    ]);
    stage_archive(&h.store, "hidden.tar.gz", &archive).await;

    let outcome = h
        .pipeline
        .process_message(&inbound("hidden.tar.gz"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Rejected(RejectReason::NoDatasetDirectory)
    ));
    assert!(!h.store.exists(DEST_BUCKET, ".manifest").await.unwrap());
    assert_eq!(h.output.ready_len().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_archive_is_rejected() {
    let h = harness().await;
    let archive = targz(&[Member::Dir("2024-01-15/")]);
    stage_archive(&h.store, "empty.tar.gz", &archive).await;

    let outcome = h
        .pipeline
        .process_message(&inbound("empty.tar.gz"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Rejected(RejectReason::NoDatasetDirectory)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_field_drops_and_later_messages_still_process() {
    let h = harness().await;
    let archive = targz(&[Member::File("2024-01-15/a.txt", b"alpha")]);
    stage_archive(&h.store, "2024_01_15/data.tar.gz", &archive).await;

    let outcome = h
        .pipeline
        .process_message(br#"{"name":"2024_01_15/data.tar.gz"}"#)
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Dropped("bucket")));
    assert_eq!(h.output.ready_len().await, 0);

    let outcome = h
        .pipeline
        .process_message(&inbound("2024_01_15/data.tar.gz"))
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Completed(_)));
    assert_eq!(h.output.ready_len().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_payload_propagates() {
    let h = harness().await;
    let result = h.pipeline.process_message(b"not json").await;
    assert!(matches!(result, Err(PipelineError::Payload(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_source_object_propagates() {
    let h = harness().await;
    let result = h.pipeline.process_message(&inbound("missing.tar.gz")).await;
    assert!(matches!(
        result,
        Err(PipelineError::Source(StorageError::NotFound(_)))
    ));
    assert_eq!(h.output.ready_len().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_gzip_is_a_format_error() {
    let h = harness().await;
    stage_archive(&h.store, "broken.tar.gz", b"these are not gzip bytes").await;

    let result = h.pipeline.process_message(&inbound("broken.tar.gz")).await;
    assert!(matches!(result, Err(PipelineError::Format(_))));
    assert_eq!(h.output.ready_len().await, 0);
}

/// Store wrapper that fails every put after the first `allowed` writes.
struct FlakyStore {
    inner: Arc<LocalObjectStore>,
    allowed: usize,
    puts: AtomicUsize,
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn object_size(&self, bucket: &str, key: &str) -> StorageResult<u64> {
        self.inner.object_size(bucket, key).await
    }

    async fn get_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<datalift_storage::ObjectStream> {
        self.inner.get_stream(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> StorageResult<()> {
        if self.puts.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(StorageError::WriteFailed("injected failure".to_string()));
        }
        self.inner.put(bucket, key, data).await
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.inner.exists(bucket, key).await
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn write_failure_aborts_but_earlier_writes_remain() {
    let dir = tempfile::tempdir().unwrap();
    let local = Arc::new(LocalObjectStore::new(dir.path()).await.unwrap());
    let output = InMemoryQueue::new();

    let archive = targz(&[
        Member::File("2024-01-15/a.txt", b"alpha"),
        Member::File("2024-01-15/b.txt", b"bravo"),
    ]);
    local
        .put(SOURCE_BUCKET, "2024_01_15/data.tar.gz", archive)
        .await
        .unwrap();

    // The first relocation is allowed; the second fails.
    let flaky = Arc::new(FlakyStore {
        inner: local.clone(),
        allowed: 1,
        puts: AtomicUsize::new(0),
    });
    let pipeline = ArchivePipeline::new(flaky, Arc::new(output.clone()), settings());

    let result = pipeline
        .process_message(&inbound("2024_01_15/data.tar.gz"))
        .await;

    assert!(matches!(result, Err(PipelineError::Destination(_))));
    // Non-transactional fan-out: the first member stays written.
    assert!(local.exists(DEST_BUCKET, "2024-01-15/a.txt").await.unwrap());
    assert!(!local.exists(DEST_BUCKET, "2024-01-15/b.txt").await.unwrap());
    assert_eq!(output.ready_len().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn runner_acknowledges_terminal_outcomes_and_keeps_failures_inflight() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalObjectStore::new(dir.path()).await.unwrap());
    let input = InMemoryQueue::new();
    let output = InMemoryQueue::new();

    let archive = targz(&[Member::File("2024-01-15/a.txt", b"alpha")]);
    store
        .put(SOURCE_BUCKET, "2024_01_15/data.tar.gz", archive)
        .await
        .unwrap();

    // A dropped message, a processable one, and one whose source is missing.
    input
        .publish(br#"{"name":"2024_01_15/data.tar.gz"}"#)
        .await
        .unwrap();
    input
        .publish(&inbound("2024_01_15/data.tar.gz"))
        .await
        .unwrap();
    input.publish(&inbound("missing.tar.gz")).await.unwrap();

    let pipeline = Arc::new(ArchivePipeline::new(
        store,
        Arc::new(output.clone()),
        settings(),
    ));
    let runner = WorkerRunner::new(
        Arc::new(input.clone()),
        pipeline,
        RunnerConfig {
            mode: RunnerMode::Direct,
            max_workers: 1,
            idle_poll_interval_ms: 10,
        },
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel(1);
    let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while output.ready_len().await < 1 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    shutdown_tx.send(()).await.unwrap();
    handle.await.unwrap();

    // One load notice for the processable archive.
    assert_eq!(output.ready_len().await, 1);
    // The dropped and completed messages were acknowledged; the failed one
    // stays in flight for redelivery.
    assert_eq!(input.ready_len().await, 0);
    assert_eq!(input.inflight_len().await, 1);
}
