use super::auth::{AuthToken, TOKEN_URL};
use super::query::CATALOGUE_URL;
use crate::odata::{self, CatalogOps, Content, ContentOps, Head};
use futures_util::StreamExt;
use reqwest::header::LOCATION;
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// reqwest-backed access to the Copernicus Data Space.
pub struct Provider {
    client: Client,
    catalogue_url: String,
    token_url: String,
}

impl Provider {
    pub fn new(client: Client) -> Self {
        Self::with_endpoints(client, CATALOGUE_URL, TOKEN_URL)
    }

    /// Points the provider at another catalogue/identity deployment.
    pub fn with_endpoints(client: Client, catalogue_url: &str, token_url: &str) -> Self {
        Self {
            client,
            catalogue_url: catalogue_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
        }
    }

    pub fn from_defaults() -> anyhow::Result<Self> {
        Ok(Self::new(odata::client()?))
    }
}

impl CatalogOps for Provider {
    type Session = Session;

    fn catalogue_url(&self) -> &str {
        &self.catalogue_url
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> anyhow::Result<Value> {
        let token = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(token)
    }

    async fn get_json(&self, url: &Url) -> anyhow::Result<Value> {
        let feed = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(feed)
    }

    async fn post_json(&self, url: &Url, body: &Value) -> anyhow::Result<Value> {
        let feed = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(feed)
    }

    fn open_session(&self, token: &AuthToken) -> anyhow::Result<Session> {
        let (probe, client) = odata::bearer_clients(token)?;
        Ok(Session { probe, client })
    }
}

/// Content retrieval session for one download run.
pub struct Session {
    probe: Client,
    client: Client,
}

impl ContentOps for Session {
    async fn head(&self, url: &str) -> anyhow::Result<Head> {
        let response = self.probe.head(url).send().await?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|l| l.to_str().ok())
            .map(str::to_string);
        Ok(Head {
            status: response.status(),
            location,
        })
    }

    async fn get_stream(&self, url: &str) -> anyhow::Result<Content> {
        let response = self.client.get(url).send().await?;
        Ok(Content {
            status: response.status(),
            content_length: response.content_length(),
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(anyhow::Error::from))
                .boxed(),
        })
    }
}
