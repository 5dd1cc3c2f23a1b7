use std::collections::HashSet;

use serde::Serialize;

use crate::{DatastoreFile, TableRow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrphanRow {
    pub datastore: String,
    pub folder: String,
    pub file: String,
    pub size_bytes: u64,
    pub modified: String,
}

impl TableRow for OrphanRow {
    fn headers() -> &'static [&'static str] {
        &["Datastore", "Folder", "File", "SizeBytes", "Modified"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.datastore.clone(),
            self.folder.clone(),
            self.file.clone(),
            self.size_bytes.to_string(),
            self.modified.clone(),
        ]
    }
}

/// Folders that hold datastore or cluster metadata rather than VM files
/// (`.sdd.sf`, `.vSphere-HA`, `.dvsData`, ...).
pub fn is_system_folder(folder: &str) -> bool {
    folder.trim_matches('/').starts_with('.')
}

/// Canonical `[datastore] relative/path` form used by vCenter file layouts.
pub fn datastore_path(datastore: &str, relative: &str) -> String {
    format!("[{datastore}] {}", relative.trim_start_matches('/'))
}

/// Files in `folder` that no registered VM references.
///
/// `registered` holds canonical datastore paths (see [`datastore_path`]).
pub fn orphaned_files(
    datastore: &str,
    folder: &str,
    files: &[DatastoreFile],
    registered: &HashSet<String>,
) -> Vec<OrphanRow> {
    let mut rows: Vec<OrphanRow> = files
        .iter()
        .filter(|file| !registered.contains(&datastore_path(datastore, &file.path)))
        .map(|file| OrphanRow {
            datastore: datastore.to_string(),
            folder: folder.trim_matches('/').to_string(),
            file: file_name(&file.path).to_string(),
            size_bytes: file.size_bytes,
            modified: file.modified.clone().unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| a.file.cmp(&b.file));
    rows
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
