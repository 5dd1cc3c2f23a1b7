//! vmaudit engine: bounded task runner, inventory clients, connection
//! provisioning, report drivers and export.
mod cloud_director;
mod connect;
mod error;
mod export;
mod http;
mod inventory;
mod persist;
mod progress;
pub mod reports;
mod runner;
mod vsphere;

pub use cloud_director::CloudDirectorRestClient;
pub use connect::{
    connect_all, connect_cloud_director, connect_vsphere, Connections, Endpoint,
    VcenterConnection,
};
pub use error::{ClientError, FailureKind, SetupError};
pub use export::{render_report, write_report, ExportError, ExportOptions, ReportFormat};
pub use http::ClientSettings;
pub use inventory::{CloudDirectory, VsphereInventory};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress::{LogProgressSink, ProgressSink, RecordingProgressSink};
pub use reports::ReportOutcome;
pub use runner::{
    FailurePolicy, RunSummary, RunnerError, RunnerSettings, TaskRunner, WorkItem,
    DEFAULT_CAPACITY,
};
pub use vsphere::VsphereRestClient;
