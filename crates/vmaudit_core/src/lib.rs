//! vmaudit core: inventory records, task outcomes, progress accounting and
//! the pure report logic shared by every subcommand.
mod affinity;
mod duplicates;
mod model;
mod orphans;
mod outcome;
mod progress;
mod table;

pub use affinity::{rules_for_vm, vdc_uuid, AffinityRow, OrgScope};
pub use duplicates::{find_duplicate_cloud_ids, DuplicateRow};
pub use model::{
    ClusterRule, DatastoreFile, DatastoreRef, Organization, PowerState, RuleKind, Vdc, VmRecord,
};
pub use orphans::{datastore_path, is_system_folder, orphaned_files, OrphanRow};
pub use outcome::{JobFailure, JobId, JobState, TaskError, TaskOutcome};
pub use progress::{truncate_label, RunProgress, LABEL_MAX_CHARS};
pub use table::{apply_filters, render_delimited, FieldFilter, TableError, TableRow};
