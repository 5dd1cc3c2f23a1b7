use std::future::Future;
use std::sync::Arc;

use audit_logging::{audit_info, audit_warn};
use secrecy::SecretString;

use crate::{
    ClientError, ClientSettings, CloudDirectorRestClient, CloudDirectory, SetupError,
    VsphereInventory, VsphereRestClient,
};

/// Where and how to log in to one management endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
    /// Tried once if the primary URL cannot be reached or rejects the login.
    pub fallback_url: Option<String>,
    pub username: String,
    pub password: SecretString,
}

/// An established vCenter session shared read-only by every task.
#[derive(Clone)]
pub struct VcenterConnection {
    pub name: String,
    pub inventory: Arc<dyn VsphereInventory>,
}

impl VcenterConnection {
    pub fn new(inventory: Arc<dyn VsphereInventory>) -> Self {
        Self {
            name: inventory.name().to_string(),
            inventory,
        }
    }
}

/// Every upstream handle a report needs, established before any task runs.
#[derive(Clone, Default)]
pub struct Connections {
    pub vcenters: Vec<VcenterConnection>,
    pub cloud_director: Option<Arc<dyn CloudDirectory>>,
}

impl Connections {
    pub fn vcenter(&self, name: &str) -> Result<&VcenterConnection, SetupError> {
        self.vcenters
            .iter()
            .find(|conn| conn.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| SetupError::VcenterNotFound(name.to_string()))
    }

    pub fn cloud_director(&self) -> Result<&Arc<dyn CloudDirectory>, SetupError> {
        self.cloud_director.as_ref().ok_or(SetupError::NoCloudDirector)
    }

    /// Ends every vCenter session; failures are only logged.
    pub async fn close(&self) {
        for conn in &self.vcenters {
            if let Err(err) = conn.inventory.logout().await {
                audit_warn!("Logout from {} failed: {}", conn.name, err);
            }
        }
    }
}

pub async fn connect_vsphere(
    endpoint: &Endpoint,
    settings: &ClientSettings,
) -> Result<VcenterConnection, SetupError> {
    let client = with_fallback(endpoint, |url| {
        VsphereRestClient::login(
            endpoint.name.clone(),
            url,
            &endpoint.username,
            &endpoint.password,
            settings,
        )
    })
    .await?;
    Ok(VcenterConnection::new(Arc::new(client)))
}

pub async fn connect_cloud_director(
    endpoint: &Endpoint,
    settings: &ClientSettings,
) -> Result<Arc<dyn CloudDirectory>, SetupError> {
    let client = with_fallback(endpoint, |url| {
        CloudDirectorRestClient::login(
            endpoint.name.clone(),
            url,
            &endpoint.username,
            &endpoint.password,
            settings,
        )
    })
    .await?;
    Ok(Arc::new(client))
}

/// Logs in to every vCenter in order; the first failure aborts. Sessions
/// opened before the failure are logged out before the error is returned.
pub async fn connect_all(
    vcenters: &[Endpoint],
    cloud_director: Option<&Endpoint>,
    settings: &ClientSettings,
) -> Result<Connections, SetupError> {
    let mut connections = Connections::default();
    for endpoint in vcenters {
        match connect_vsphere(endpoint, settings).await {
            Ok(conn) => connections.vcenters.push(conn),
            Err(err) => return Err(abandon(connections, err).await),
        }
    }
    if let Some(endpoint) = cloud_director {
        match connect_cloud_director(endpoint, settings).await {
            Ok(director) => connections.cloud_director = Some(director),
            Err(err) => return Err(abandon(connections, err).await),
        }
    }
    Ok(connections)
}

async fn abandon(connections: Connections, err: SetupError) -> SetupError {
    if !connections.vcenters.is_empty() {
        audit_warn!(
            "Closing {} vCenter sessions after setup failure",
            connections.vcenters.len()
        );
        connections.close().await;
    }
    err
}

/// Runs `login` against the primary URL, then at most once against the
/// fallback URL.
async fn with_fallback<'a, T, F, Fut>(endpoint: &'a Endpoint, login: F) -> Result<T, SetupError>
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let primary_err = match login(&endpoint.url).await {
        Ok(client) => {
            audit_info!("Connected to {} at {}", endpoint.name, endpoint.url);
            return Ok(client);
        }
        Err(err) => err,
    };

    let Some(fallback) = endpoint.fallback_url.as_deref() else {
        return Err(SetupError::Connection {
            endpoint: endpoint.url.clone(),
            source: primary_err,
        });
    };

    audit_warn!(
        "Connection to {} at {} failed ({}); trying fallback {}",
        endpoint.name,
        endpoint.url,
        primary_err,
        fallback
    );
    match login(fallback).await {
        Ok(client) => {
            audit_info!("Connected to {} at fallback {}", endpoint.name, fallback);
            Ok(client)
        }
        Err(err) => Err(SetupError::Connection {
            endpoint: fallback.to_string(),
            source: err,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::FailureKind;

    fn endpoint(fallback: Option<&str>) -> Endpoint {
        Endpoint {
            name: "vc01".into(),
            url: "https://primary".into(),
            fallback_url: fallback.map(str::to_string),
            username: "admin".into(),
            password: SecretString::from("secret".to_string()),
        }
    }

    fn refused() -> ClientError {
        ClientError::new(FailureKind::Network, "connection refused")
    }

    #[tokio::test]
    async fn fallback_is_tried_exactly_once() {
        let attempts = AtomicUsize::new(0);
        let endpoint = endpoint(Some("https://secondary"));

        let result: Result<(), _> = with_fallback(&endpoint, |_url| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(refused()) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        match result {
            Err(SetupError::Connection { endpoint, .. }) => assert_eq!(endpoint, "https://secondary"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fallback_wins_when_primary_fails() {
        let endpoint = endpoint(Some("https://secondary"));
        let result = with_fallback(&endpoint, |url| {
            let url = url.to_string();
            async move {
                if url == "https://secondary" {
                    Ok(url)
                } else {
                    Err(refused())
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, "https://secondary");
    }

    #[tokio::test]
    async fn no_fallback_means_single_attempt() {
        let attempts = AtomicUsize::new(0);
        let endpoint = endpoint(None);

        let result: Result<(), _> = with_fallback(&endpoint, |_url| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(refused()) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(SetupError::Connection { .. })));
    }
}
