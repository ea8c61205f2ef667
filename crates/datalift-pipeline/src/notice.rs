//! Load notice assembly.

use datalift_core::{DatasetDir, LoadNotice, PipelineSettings};

/// Assemble the single outbound load notice for a processed archive.
///
/// `file_size` is the size of the original archive object, captured via a
/// metadata lookup before extraction; member sizes never enter the notice.
pub fn build_load_notice(
    settings: &PipelineSettings,
    dir: &DatasetDir,
    source_bucket: &str,
    file_size: u64,
) -> LoadNotice {
    LoadNotice {
        project_id: settings.project_id.clone(),
        dataset_id: dir.normalized.clone(),
        table_id: settings.table_id.clone(),
        original_date: dir.original.clone(),
        source_bucket: source_bucket.to_string(),
        destination_bucket: settings.destination_bucket.clone(),
        file_size,
    }
}
