use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::PoweredOn => write!(f, "poweredOn"),
            PowerState::PoweredOff => write!(f, "poweredOff"),
            PowerState::Suspended => write!(f, "suspended"),
            PowerState::Unknown => write!(f, "unknown"),
        }
    }
}

/// One virtual machine as reported by a vCenter inventory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRecord {
    pub id: String,
    pub name: String,
    /// Name of the vCenter connection the record came from.
    pub vcenter: String,
    pub cluster: Option<String>,
    pub host: Option<String>,
    pub resource_pool: Option<String>,
    pub power_state: PowerState,
    /// Identifier assigned by the cloud management platform, if any.
    pub cloud_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    VmAffinity,
    VmAntiAffinity,
    VmHost,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::VmAffinity => write!(f, "affinity"),
            RuleKind::VmAntiAffinity => write!(f, "anti-affinity"),
            RuleKind::VmHost => write!(f, "vm-host"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRule {
    pub name: String,
    pub kind: RuleKind,
    pub enabled: bool,
    pub mandatory: bool,
    pub vm_ids: Vec<String>,
}

impl ClusterRule {
    pub fn references(&self, vm_id: &str) -> bool {
        self.vm_ids.iter().any(|id| id == vm_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastoreRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastoreFile {
    /// Path relative to the datastore root, e.g. `web01/web01.vmx`.
    pub path: String,
    pub size_bytes: u64,
    pub modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vdc {
    pub id: String,
    pub name: String,
}
