//! Authenticated HTTP session shared by the API clients.

use reqwest::header::{ACCEPT, CACHE_CONTROL, CONNECTION};
use reqwest::RequestBuilder;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

const ORGANIZATION_HEADER: &str = "OpenAI-Organization";

/// Holds the HTTP client and credentials for one API account.
///
/// Cloning is cheap; every clone shares the underlying connection pool.
#[derive(Clone)]
pub struct Session {
    http: reqwest::Client,
    api_key: String,
    organization: Option<String>,
}

impl Session {
    /// Create a session authenticating with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            organization: None,
        }
    }

    /// Attach an organization id sent with every request.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        let organization = organization.into();
        if !organization.is_empty() {
            self.organization = Some(organization);
        }
        self
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder;
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        if let Some(org) = &self.organization {
            builder = builder.header(ORGANIZATION_HEADER, org);
        }
        builder
    }

    /// POST a JSON body and return the checked response.
    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let response = self
            .authorized(self.http.post(url))
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    /// POST a JSON body requesting an event-stream response.
    pub(crate) async fn post_stream<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        debug!(url, "opening event stream");
        let response = self
            .authorized(self.http.post(url))
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .header(CONNECTION, "keep-alive")
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    /// GET a resource and return the checked response.
    pub(crate) async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.authorized(self.http.get(url)).send().await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::api(status.as_u16(), body));
    }
    Ok(response)
}
