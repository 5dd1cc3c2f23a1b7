use std::collections::HashSet;
use std::sync::Arc;

use audit_logging::{audit_debug, audit_info};
use vmaudit_core::{is_system_folder, orphaned_files, DatastoreRef, OrphanRow, TaskOutcome};

use crate::reports::ReportOutcome;
use crate::{ProgressSink, SetupError, TaskRunner, VcenterConnection, VsphereInventory, WorkItem};

/// One top-level datastore folder to browse.
#[derive(Debug, Clone)]
pub struct FolderItem(pub String);

impl WorkItem for FolderItem {
    fn label(&self) -> String {
        self.0.clone()
    }
}

struct OrphanContext {
    inventory: Arc<dyn VsphereInventory>,
    datastore: DatastoreRef,
    registered: HashSet<String>,
}

/// Files on `datastore_name` that no registered VM references, one browse
/// per top-level folder. System folders (dot-prefixed) are skipped.
pub async fn orphan_report(
    conn: &VcenterConnection,
    datastore_name: &str,
    runner: &TaskRunner,
    sink: &dyn ProgressSink,
) -> Result<ReportOutcome<OrphanRow>, SetupError> {
    let inventory = &conn.inventory;
    let datastore = inventory
        .find_datastore(datastore_name)
        .await
        .map_err(|err| SetupError::inventory(&conn.name, err))?
        .ok_or_else(|| SetupError::DatastoreNotFound(datastore_name.to_string()))?;

    let registered: HashSet<String> = inventory
        .registered_files(&datastore)
        .await
        .map_err(|err| SetupError::inventory(&conn.name, err))?
        .into_iter()
        .collect();
    let folders = inventory
        .datastore_folders(&datastore)
        .await
        .map_err(|err| SetupError::inventory(&conn.name, err))?;

    let (system, folders): (Vec<String>, Vec<String>) =
        folders.into_iter().partition(|folder| is_system_folder(folder));
    if !system.is_empty() {
        audit_debug!("Skipping system folders: {}", system.join(", "));
    }
    audit_info!(
        "Scanning {} folders on {} against {} registered files",
        folders.len(),
        datastore.name,
        registered.len()
    );

    let items: Vec<FolderItem> = folders.into_iter().map(FolderItem).collect();
    let context = Arc::new(OrphanContext {
        inventory: Arc::clone(inventory),
        datastore,
        registered,
    });
    let summary = runner.run(items, context, folder_orphans, sink).await;

    let mut outcome = ReportOutcome::from_summary(summary);
    outcome
        .rows
        .sort_by(|a, b| (&a.folder, &a.file).cmp(&(&b.folder, &b.file)));
    Ok(outcome)
}

async fn folder_orphans(item: FolderItem, context: Arc<OrphanContext>) -> TaskOutcome<Vec<OrphanRow>> {
    let folder = item.0;
    match context.inventory.browse_folder(&context.datastore, &folder).await {
        Ok(files) => {
            let rows = orphaned_files(&context.datastore.name, &folder, &files, &context.registered);
            TaskOutcome::from_option((!rows.is_empty()).then_some(rows))
        }
        Err(err) => TaskOutcome::Failed(err.into()),
    }
}
