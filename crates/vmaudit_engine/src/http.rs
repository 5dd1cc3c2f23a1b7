use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::{ClientError, FailureKind};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Accept self-signed management certificates.
    pub accept_invalid_certs: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            accept_invalid_certs: false,
        }
    }
}

pub(crate) fn build_client(settings: &ClientSettings) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .build()
        .map_err(|err| ClientError::new(FailureKind::Network, err.to_string()))
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|err| ClientError::new(FailureKind::InvalidUrl, err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::new(FailureKind::InvalidUrl, format!("{raw} cannot be a base url")));
    }
    Ok(url)
}

/// Builds `{base}{path}?{query}`, percent-encoding query values.
pub(crate) fn endpoint_url(base: &Url, path: &str, query: &[(&str, &str)]) -> Result<Url, ClientError> {
    let mut url = base
        .join(path)
        .map_err(|err| ClientError::new(FailureKind::InvalidUrl, err.to_string()))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Maps the response status onto a failure kind, passing successes through.
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClientError::new(FailureKind::Unauthorized, status.to_string()));
    }
    if !status.is_success() {
        return Err(ClientError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    Ok(response)
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let response = check_status(response)?;
    response.json::<T>().await.map_err(|err| {
        if err.is_decode() {
            ClientError::new(FailureKind::Decode, err.to_string())
        } else {
            map_reqwest_error(err)
        }
    })
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::new(FailureKind::Timeout, err.to_string());
    }
    ClientError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_encodes_query_values() {
        let base = parse_base_url("https://vc01.example.com").unwrap();
        let url = endpoint_url(&base, "/api/vcenter/datastore", &[("names", "ds 1&2")]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://vc01.example.com/api/vcenter/datastore?names=ds+1%262"
        );
    }

    #[test]
    fn base_url_must_be_absolute() {
        let err = parse_base_url("vc01").unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
        assert!(parse_base_url("mailto:ops@example.com").is_err());
    }
}
