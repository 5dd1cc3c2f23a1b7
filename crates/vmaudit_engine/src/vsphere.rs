//! vCenter inventory over a JSON REST surface.
//!
//! Session handling (`POST`/`DELETE /api/session`, the
//! `vmware-api-session-id` header) is the stock vSphere Automation API. The
//! inventory reads are not: stock `/api/vcenter/vm` summaries carry neither
//! placement (`cluster`, `host`, `resource_pool`) nor extra config, and there
//! are no cluster rule or datastore browse endpoints. Those paths are served
//! by an inventory gateway in front of vCenter that exposes the following:
//!
//! | path | body |
//! |------|------|
//! | `GET /api/vcenter/vm[?extra_config_key=K]` | VM summaries with placement and `extra_config` |
//! | `GET /api/vcenter/cluster/{id}/rules` | DRS rules with member VM ids |
//! | `GET /api/vcenter/datastore?names=N` | datastore summaries |
//! | `GET /api/vcenter/datastore/{id}/folders` | top-level folder names |
//! | `GET /api/vcenter/datastore/{id}/browse?path=P` | files in one folder |
//! | `GET /api/vcenter/datastore/{id}/vm-files` | `[ds] path` of every registered VM file |
//!
//! Pointed at a bare vCenter, VM listings come back without placement. That
//! is logged as a warning because the affinity report would otherwise be
//! silently empty.

use std::collections::HashMap;

use audit_logging::audit_warn;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use vmaudit_core::{ClusterRule, DatastoreFile, DatastoreRef, PowerState, RuleKind, VmRecord};

use crate::http::{
    build_client, check_status, endpoint_url, map_reqwest_error, parse_base_url, read_json,
};
use crate::{ClientError, ClientSettings, VsphereInventory};

const SESSION_HEADER: &str = "vmware-api-session-id";

#[derive(Debug, Deserialize)]
struct VmSummary {
    vm: String,
    name: String,
    #[serde(default)]
    power_state: PowerState,
    cluster: Option<String>,
    host: Option<String>,
    resource_pool: Option<String>,
    #[serde(default)]
    extra_config: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RuleInfo {
    name: String,
    #[serde(rename = "type")]
    kind: RuleKind,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    mandatory: bool,
    #[serde(default)]
    vms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DatastoreSummary {
    datastore: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    path: String,
    #[serde(default)]
    size: u64,
    modified: Option<String>,
}

/// vCenter inventory over the JSON automation API, authenticated with a
/// session token obtained at login.
#[derive(Debug, Clone)]
pub struct VsphereRestClient {
    name: String,
    base: Url,
    http: reqwest::Client,
    session: String,
}

impl VsphereRestClient {
    /// Opens a session against `base_url` using basic credentials.
    pub async fn login(
        name: impl Into<String>,
        base_url: &str,
        username: &str,
        password: &SecretString,
        settings: &ClientSettings,
    ) -> Result<Self, ClientError> {
        let base = parse_base_url(base_url)?;
        let http = build_client(settings)?;
        let url = endpoint_url(&base, "/api/session", &[])?;
        let response = http
            .post(url)
            .basic_auth(username, Some(password.expose_secret()))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let session: String = read_json(response).await?;

        Ok(Self {
            name: name.into(),
            base,
            http,
            session,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let url = endpoint_url(&self.base, path, query)?;
        let response = self
            .http
            .get(url)
            .header(SESSION_HEADER, &self.session)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

#[async_trait::async_trait]
impl VsphereInventory for VsphereRestClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_vms(&self, cloud_id_key: Option<&str>) -> Result<Vec<VmRecord>, ClientError> {
        let summaries: Vec<VmSummary> = match cloud_id_key {
            Some(key) => self.get("/api/vcenter/vm", &[("extra_config_key", key)]).await?,
            None => self.get("/api/vcenter/vm", &[]).await?,
        };
        let unplaced = summaries
            .iter()
            .filter(|summary| summary.cluster.is_none())
            .count();
        if unplaced > 0 {
            audit_warn!(
                "{} of {} VMs on {} came back without a cluster; is the inventory gateway in front of this vCenter?",
                unplaced,
                summaries.len(),
                self.name
            );
        }
        Ok(summaries
            .into_iter()
            .map(|mut summary| VmRecord {
                cloud_id: cloud_id_key.and_then(|key| summary.extra_config.remove(key)),
                id: summary.vm,
                name: summary.name,
                vcenter: self.name.clone(),
                cluster: summary.cluster,
                host: summary.host,
                resource_pool: summary.resource_pool,
                power_state: summary.power_state,
            })
            .collect())
    }

    async fn cluster_rules(&self, cluster: &str) -> Result<Vec<ClusterRule>, ClientError> {
        let path = format!("/api/vcenter/cluster/{cluster}/rules");
        let rules: Vec<RuleInfo> = self.get(&path, &[]).await?;
        Ok(rules
            .into_iter()
            .map(|rule| ClusterRule {
                name: rule.name,
                kind: rule.kind,
                enabled: rule.enabled,
                mandatory: rule.mandatory,
                vm_ids: rule.vms,
            })
            .collect())
    }

    async fn find_datastore(&self, name: &str) -> Result<Option<DatastoreRef>, ClientError> {
        let found: Vec<DatastoreSummary> =
            self.get("/api/vcenter/datastore", &[("names", name)]).await?;
        Ok(found
            .into_iter()
            .find(|summary| summary.name == name)
            .map(|summary| DatastoreRef {
                id: summary.datastore,
                name: summary.name,
            }))
    }

    async fn datastore_folders(&self, datastore: &DatastoreRef) -> Result<Vec<String>, ClientError> {
        let path = format!("/api/vcenter/datastore/{}/folders", datastore.id);
        self.get(&path, &[]).await
    }

    async fn browse_folder(
        &self,
        datastore: &DatastoreRef,
        folder: &str,
    ) -> Result<Vec<DatastoreFile>, ClientError> {
        let path = format!("/api/vcenter/datastore/{}/browse", datastore.id);
        let files: Vec<FileInfo> = self.get(&path, &[("path", folder)]).await?;
        Ok(files
            .into_iter()
            .map(|file| DatastoreFile {
                path: file.path,
                size_bytes: file.size,
                modified: file.modified,
            })
            .collect())
    }

    async fn registered_files(&self, datastore: &DatastoreRef) -> Result<Vec<String>, ClientError> {
        let path = format!("/api/vcenter/datastore/{}/vm-files", datastore.id);
        self.get(&path, &[]).await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let url = endpoint_url(&self.base, "/api/session", &[])?;
        let response = self
            .http
            .delete(url)
            .header(SESSION_HEADER, &self.session)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).map(|_| ())
    }
}
