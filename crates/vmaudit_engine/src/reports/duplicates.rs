use audit_logging::audit_info;
use vmaudit_core::{find_duplicate_cloud_ids, DuplicateRow};

use crate::{SetupError, VcenterConnection};

/// Lists every VM on every vCenter in one query each and groups them by
/// cloud id. A failed listing aborts the report.
pub async fn duplicate_report(
    vcenters: &[VcenterConnection],
    cloud_id_key: &str,
) -> Result<Vec<DuplicateRow>, SetupError> {
    if vcenters.is_empty() {
        return Err(SetupError::NoVcenters);
    }

    let mut vms = Vec::new();
    for conn in vcenters {
        let listed = conn
            .inventory
            .list_vms(Some(cloud_id_key))
            .await
            .map_err(|err| SetupError::inventory(&conn.name, err))?;
        audit_info!("Listed {} VMs on {}", listed.len(), conn.name);
        vms.extend(listed);
    }

    let rows = find_duplicate_cloud_ids(&vms);
    audit_info!(
        "{} of {} VMs share a {} value",
        rows.len(),
        vms.len(),
        cloud_id_key
    );
    Ok(rows)
}
