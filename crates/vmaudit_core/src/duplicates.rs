use std::collections::BTreeMap;

use serde::Serialize;

use crate::{TableRow, VmRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DuplicateRow {
    pub cloud_id: String,
    pub vm: String,
    pub vcenter: String,
    pub cluster: String,
    pub host: String,
    pub power_state: String,
    /// How many VMs share this cloud id.
    pub copies: usize,
}

impl TableRow for DuplicateRow {
    fn headers() -> &'static [&'static str] {
        &[
            "CloudId",
            "VM",
            "VCenter",
            "Cluster",
            "Host",
            "PowerState",
            "Copies",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.cloud_id.clone(),
            self.vm.clone(),
            self.vcenter.clone(),
            self.cluster.clone(),
            self.host.clone(),
            self.power_state.clone(),
            self.copies.to_string(),
        ]
    }
}

/// Rows for every VM whose cloud id is shared with at least one other VM.
///
/// Blank or missing ids are ignored. Output is sorted by cloud id, then VM
/// name, then vCenter.
pub fn find_duplicate_cloud_ids(vms: &[VmRecord]) -> Vec<DuplicateRow> {
    let mut groups: BTreeMap<&str, Vec<&VmRecord>> = BTreeMap::new();
    for vm in vms {
        let Some(cloud_id) = vm.cloud_id.as_deref().map(str::trim) else {
            continue;
        };
        if cloud_id.is_empty() {
            continue;
        }
        groups.entry(cloud_id).or_default().push(vm);
    }

    let mut rows = Vec::new();
    for (cloud_id, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.vcenter.cmp(&b.vcenter)));
        let copies = members.len();
        rows.extend(members.into_iter().map(|vm| DuplicateRow {
            cloud_id: cloud_id.to_string(),
            vm: vm.name.clone(),
            vcenter: vm.vcenter.clone(),
            cluster: vm.cluster.clone().unwrap_or_default(),
            host: vm.host.clone().unwrap_or_default(),
            power_state: vm.power_state.to_string(),
            copies,
        }));
    }
    rows
}
