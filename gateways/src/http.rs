//! Control-plane REST API gateway

use crate::config::GatewayConfig;

use async_trait::async_trait;
use fornax_loadtest_core::{Application, ApplicationSession, GatewayError, ResourceGateway, API_VERSION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const APPLICATIONS: &str = "applications";
const SESSIONS: &str = "applicationsessions";

/// Gateway speaking the Kubernetes-style REST API of the Fornax API server
///
/// Resources live under
/// `/apis/core.fornax-serverless.centaurusinfra.io/v1/namespaces/{ns}/{plural}`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    /// Create a gateway for `base_url`
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create a gateway from the `[gateway]` section
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        Self::new(config.base_url.clone(), config.token.clone(), config.timeout())
    }

    /// Collection URL for `plural` in `namespace`
    fn collection_url(&self, namespace: &str, plural: &str) -> String {
        format!(
            "{}/apis/{}/namespaces/{}/{}",
            self.base_url, API_VERSION, namespace, plural
        )
    }

    /// URL of a single resource
    fn resource_url(&self, namespace: &str, plural: &str, name: &str) -> String {
        format!("{}/{}", self.collection_url(namespace, plural), name)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, resource: &str) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(transport_error)?;
        check_status(response, resource).await
    }

    async fn create<T: Serialize + DeserializeOwned>(
        &self,
        url: &str,
        body: &T,
        resource: &str,
    ) -> Result<T, GatewayError> {
        let response = self
            .send(self.request(Method::POST, url).json(body), resource)
            .await?;
        decode(response).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        resource: &str,
    ) -> Result<Option<T>, GatewayError> {
        match self.send(self.request(Method::GET, url), resource).await {
            Ok(response) => decode(response).await.map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, url: &str, resource: &str) -> Result<(), GatewayError> {
        self.send(self.request(Method::DELETE, url), resource)
            .await
            .map(|_| ())
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Map a non-success status onto the gateway error taxonomy
async fn check_status(response: Response, resource: &str) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    tracing::debug!(resource, status = status.as_u16(), body = %message, "API server returned error");

    Err(match status {
        StatusCode::NOT_FOUND => GatewayError::not_found(resource),
        StatusCode::CONFLICT => GatewayError::AlreadyExists {
            resource: resource.to_string(),
        },
        _ => GatewayError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl ResourceGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn create_application(
        &self,
        application: &Application,
    ) -> Result<Application, GatewayError> {
        let meta = &application.metadata;
        let url = self.collection_url(&meta.namespace, APPLICATIONS);
        let resource = format!("{APPLICATIONS}/{}", meta.key());
        self.create(&url, application, &resource).await
    }

    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Application>, GatewayError> {
        let url = self.resource_url(namespace, APPLICATIONS, name);
        self.get(&url, &format!("{APPLICATIONS}/{namespace}/{name}"))
            .await
    }

    async fn delete_application(&self, namespace: &str, name: &str) -> Result<(), GatewayError> {
        let url = self.resource_url(namespace, APPLICATIONS, name);
        self.delete(&url, &format!("{APPLICATIONS}/{namespace}/{name}"))
            .await
    }

    async fn create_session(
        &self,
        session: &ApplicationSession,
    ) -> Result<ApplicationSession, GatewayError> {
        let meta = &session.metadata;
        let url = self.collection_url(&meta.namespace, SESSIONS);
        let resource = format!("{SESSIONS}/{}", meta.key());
        self.create(&url, session, &resource).await
    }

    async fn get_session(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ApplicationSession>, GatewayError> {
        let url = self.resource_url(namespace, SESSIONS, name);
        self.get(&url, &format!("{SESSIONS}/{namespace}/{name}"))
            .await
    }

    async fn delete_session(&self, namespace: &str, name: &str) -> Result<(), GatewayError> {
        let url = self.resource_url(namespace, SESSIONS, name);
        self.delete(&url, &format!("{SESSIONS}/{namespace}/{name}"))
            .await
    }
}
