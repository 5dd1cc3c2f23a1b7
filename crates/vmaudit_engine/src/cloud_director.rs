use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use vmaudit_core::{Organization, Vdc};

use crate::http::{build_client, check_status, endpoint_url, map_reqwest_error, parse_base_url, read_json};
use crate::{ClientError, ClientSettings, CloudDirectory, FailureKind};

const ACCEPT_JSON: &str = "application/json;version=36.0";
const ACCESS_TOKEN_HEADER: &str = "x-vmware-vcloud-access-token";
const PAGE_SIZE: &str = "128";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "first_page")]
    page_count: u32,
    values: Vec<T>,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct Entity {
    id: String,
    name: String,
}

/// Cloud Director CloudAPI client authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct CloudDirectorRestClient {
    name: String,
    base: Url,
    http: reqwest::Client,
    token: String,
}

impl CloudDirectorRestClient {
    /// `username` is the `user@org` form Cloud Director expects.
    pub async fn login(
        name: impl Into<String>,
        base_url: &str,
        username: &str,
        password: &SecretString,
        settings: &ClientSettings,
    ) -> Result<Self, ClientError> {
        let base = parse_base_url(base_url)?;
        let http = build_client(settings)?;
        let url = endpoint_url(&base, "/cloudapi/1.0.0/sessions", &[])?;
        let response = http
            .post(url)
            .header(ACCEPT, ACCEPT_JSON)
            .basic_auth(username, Some(password.expose_secret()))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response)?;
        let token = response
            .headers()
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::new(FailureKind::Unauthorized, "session response carried no access token")
            })?;

        Ok(Self {
            name: name.into(),
            base,
            http,
            token,
        })
    }

    /// Follows `page`/`pageCount` until every value of a filtered query is read.
    async fn get_all<T: DeserializeOwned>(&self, path: &str, filter: &str) -> Result<Vec<T>, ClientError> {
        let mut values = Vec::new();
        let mut page = 1u32;
        loop {
            let page_param = page.to_string();
            let url = endpoint_url(
                &self.base,
                path,
                &[("filter", filter), ("page", &page_param), ("pageSize", PAGE_SIZE)],
            )?;
            let response = self
                .http
                .get(url)
                .header(ACCEPT, ACCEPT_JSON)
                .header(AUTHORIZATION, format!("Bearer {}", self.token))
                .send()
                .await
                .map_err(map_reqwest_error)?;
            let body: Page<T> = read_json(response).await?;
            values.extend(body.values);
            if page >= body.page_count {
                return Ok(values);
            }
            page += 1;
        }
    }
}

#[async_trait::async_trait]
impl CloudDirectory for CloudDirectorRestClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_org(&self, name: &str) -> Result<Option<Organization>, ClientError> {
        let orgs: Vec<Entity> = self
            .get_all("/cloudapi/1.0.0/orgs", &format!("name=={name}"))
            .await?;
        Ok(orgs
            .into_iter()
            .find(|org| org.name.eq_ignore_ascii_case(name))
            .map(|org| Organization {
                id: org.id,
                name: org.name,
            }))
    }

    async fn org_vdcs(&self, org: &Organization) -> Result<Vec<Vdc>, ClientError> {
        let vdcs: Vec<Entity> = self
            .get_all("/cloudapi/1.0.0/vdcs", &format!("org.id=={}", org.id))
            .await?;
        Ok(vdcs
            .into_iter()
            .map(|vdc| Vdc {
                id: vdc.id,
                name: vdc.name,
            })
            .collect())
    }
}
