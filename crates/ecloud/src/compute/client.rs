//! Compute daemon HTTP client.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::models::ComputeServer;
use crate::config::EcloudConfig;
use crate::error::ApiError;

/// Status endpoint, relative to the compute route.
const STATUS_PATH: &str = "status";

/// The status endpoint has shipped both as a bare array and wrapped in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusBody {
    List(Vec<ComputeServer>),
    Wrapped { servers: Vec<ComputeServer> },
}

/// Client for the compute daemon.
#[derive(Debug, Clone)]
pub struct ComputeClient {
    /// HTTP client.
    client: Client,
    /// Compute route, without trailing slash.
    base_url: String,
}

impl ComputeClient {
    /// Create a compute client from a control-plane configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &EcloudConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            client,
            base_url: config.compute_url.trim_end_matches('/').to_string(),
        })
    }

    /// Make a GET request against the compute route.
    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}/{path}", self.base_url);
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle a daemon response, parsing JSON or mapping the error status.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                ApiError::Serialization(e)
            })
        } else {
            let message = if status == StatusCode::NOT_FOUND && text.is_empty() {
                "not found".to_string()
            } else {
                text
            };
            Err(ApiError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// List every VM known to the compute daemon.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn list_servers(&self) -> Result<Vec<ComputeServer>, ApiError> {
        let servers = match self.get::<StatusBody>(STATUS_PATH).await? {
            StatusBody::List(servers) | StatusBody::Wrapped { servers } => servers,
        };
        debug!(count = servers.len(), "Listed compute servers");
        Ok(servers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ComputeClient {
        let config = EcloudConfig::new("nodeup", "0.1.0")
            .unwrap()
            .with_compute_url(format!("{}/api/v1.0/client/vm/", server.uri()));
        ComputeClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_list_servers_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1.0/client/vm/status"))
            .and(header("user-agent", "nodeup/0.1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[
                    {"name": "a", "uniqueID": "id-1", "req_json": {"vm_name": "k8s-control-plane-1"}},
                    {"name": "b", "uniqueID": "id-2", "req_json": {"vm_name": "k8s-node-1"}}
                ]"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let servers = client_for(&server).await.list_servers().await.unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].unique_id, "id-1");
        assert_eq!(servers[1].vm_name(), "k8s-node-1");
    }

    #[tokio::test]
    async fn test_list_servers_wrapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1.0/client/vm/status"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"servers": [{"name": "bastion", "uniqueID": "id-9"}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let servers = client_for(&server).await.list_servers().await.unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].vm_name(), "bastion");
    }

    #[tokio::test]
    async fn test_list_servers_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1.0/client/vm/status"))
            .respond_with(ResponseTemplate::new(503).set_body_string("daemon offline"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.list_servers().await.unwrap_err();
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "daemon offline");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_list_servers_bad_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1.0/client/vm/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.list_servers().await.unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }
}
