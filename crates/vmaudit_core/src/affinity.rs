use serde::Serialize;

use crate::{ClusterRule, Organization, TableRow, Vdc, VmRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AffinityRow {
    pub org: String,
    pub vm: String,
    pub vcenter: String,
    pub cluster: String,
    pub rule: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub enabled: bool,
    pub mandatory: bool,
    /// Number of VMs the rule references.
    pub members: usize,
}

impl TableRow for AffinityRow {
    fn headers() -> &'static [&'static str] {
        &[
            "Org",
            "VM",
            "VCenter",
            "Cluster",
            "Rule",
            "Type",
            "Enabled",
            "Mandatory",
            "Members",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.org.clone(),
            self.vm.clone(),
            self.vcenter.clone(),
            self.cluster.clone(),
            self.rule.clone(),
            self.kind.clone(),
            self.enabled.to_string(),
            self.mandatory.to_string(),
            self.members.to_string(),
        ]
    }
}

/// The VDC uuids of one organization, used to recognise its VMs by their
/// backing resource pool (`"<vdc name> (<uuid>)"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgScope {
    pub org: Organization,
    vdc_uuids: Vec<String>,
}

impl OrgScope {
    pub fn new(org: Organization, vdcs: &[Vdc]) -> Self {
        let vdc_uuids = vdcs
            .iter()
            .map(|vdc| vdc_uuid(&vdc.id).to_ascii_lowercase())
            .filter(|uuid| !uuid.is_empty())
            .collect();
        Self { org, vdc_uuids }
    }

    pub fn vdc_count(&self) -> usize {
        self.vdc_uuids.len()
    }

    pub fn contains(&self, vm: &VmRecord) -> bool {
        let Some(pool) = vm.resource_pool.as_deref() else {
            return false;
        };
        let pool = pool.to_ascii_lowercase();
        self.vdc_uuids
            .iter()
            .any(|uuid| pool.contains(&format!("({uuid})")))
    }
}

/// Strips the URN prefix from a Cloud Director id (`urn:vcloud:vdc:<uuid>`).
pub fn vdc_uuid(id: &str) -> &str {
    id.rsplit(':').next().unwrap_or(id)
}

/// Rows for each rule that references `vm`; empty when the VM has no
/// cluster or no rule mentions it.
pub fn rules_for_vm(org: &str, vm: &VmRecord, rules: &[ClusterRule]) -> Vec<AffinityRow> {
    let Some(cluster) = vm.cluster.as_deref() else {
        return Vec::new();
    };
    let mut rows: Vec<AffinityRow> = rules
        .iter()
        .filter(|rule| rule.references(&vm.id))
        .map(|rule| AffinityRow {
            org: org.to_string(),
            vm: vm.name.clone(),
            vcenter: vm.vcenter.clone(),
            cluster: cluster.to_string(),
            rule: rule.name.clone(),
            kind: rule.kind.to_string(),
            enabled: rule.enabled,
            mandatory: rule.mandatory,
            members: rule.vm_ids.len(),
        })
        .collect();
    rows.sort_by(|a, b| a.rule.cmp(&b.rule));
    rows
}
