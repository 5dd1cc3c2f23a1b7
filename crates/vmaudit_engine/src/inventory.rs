use vmaudit_core::{ClusterRule, DatastoreFile, DatastoreRef, Organization, Vdc, VmRecord};

use crate::ClientError;

/// Read-only view of one vCenter inventory.
///
/// Implementations are shared between concurrently running tasks, so every
/// method takes `&self` and must be safe to call from several tasks at once.
#[async_trait::async_trait]
pub trait VsphereInventory: Send + Sync {
    /// Display name of the endpoint, copied into every [`VmRecord::vcenter`].
    fn name(&self) -> &str;

    /// All VMs. When `cloud_id_key` is given, `cloud_id` is read from that
    /// extra-config entry; otherwise it is left empty.
    async fn list_vms(&self, cloud_id_key: Option<&str>) -> Result<Vec<VmRecord>, ClientError>;

    async fn cluster_rules(&self, cluster: &str) -> Result<Vec<ClusterRule>, ClientError>;

    async fn find_datastore(&self, name: &str) -> Result<Option<DatastoreRef>, ClientError>;

    /// Top-level folder names on the datastore.
    async fn datastore_folders(&self, datastore: &DatastoreRef) -> Result<Vec<String>, ClientError>;

    async fn browse_folder(
        &self,
        datastore: &DatastoreRef,
        folder: &str,
    ) -> Result<Vec<DatastoreFile>, ClientError>;

    /// Canonical `[datastore] path` of every file in a registered VM's layout.
    async fn registered_files(&self, datastore: &DatastoreRef) -> Result<Vec<String>, ClientError>;

    /// Ends the server-side session, if the implementation holds one.
    async fn logout(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Read-only view of the cloud management platform.
#[async_trait::async_trait]
pub trait CloudDirectory: Send + Sync {
    fn name(&self) -> &str;

    async fn find_org(&self, name: &str) -> Result<Option<Organization>, ClientError>;

    async fn org_vdcs(&self, org: &Organization) -> Result<Vec<Vdc>, ClientError>;
}
