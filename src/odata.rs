//! Traits over the HTTP calls made against the catalogue, the identity service
//! and the content endpoint, plus helpers for building reqwest clients.
use crate::copernicus::AuthToken;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{redirect, Client, StatusCode};
use serde_json::Value;
use url::Url;

const USER_AGENT: &str = concat!("sentinel-get/", env!("CARGO_PKG_VERSION"));

/// Response to a HEAD request sent without following redirects.
#[derive(Debug, Clone)]
pub struct Head {
    pub status: StatusCode,
    pub location: Option<String>,
}

/// A streamed response body.
pub struct Content {
    pub status: StatusCode,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, anyhow::Result<Bytes>>,
}

pub trait CatalogOps {
    type Session: ContentOps;

    /// Base of the OData API, e.g. `https://catalogue.dataspace.copernicus.eu/odata/v1`.
    fn catalogue_url(&self) -> &str;

    /// Posts the form to the token endpoint and returns the decoded body.
    async fn request_token(&self, form: &[(&str, &str)]) -> anyhow::Result<Value>;

    async fn get_json(&self, url: &Url) -> anyhow::Result<Value>;

    async fn post_json(&self, url: &Url, body: &Value) -> anyhow::Result<Value>;

    /// Opens a session whose requests all carry the bearer token.
    fn open_session(&self, token: &AuthToken) -> anyhow::Result<Self::Session>;
}

pub trait ContentOps {
    async fn head(&self, url: &str) -> anyhow::Result<Head>;

    async fn get_stream(&self, url: &str) -> anyhow::Result<Content>;
}

pub fn client() -> reqwest::Result<Client> {
    Client::builder().user_agent(USER_AGENT).build()
}

/// Builds the pair of clients used for content retrieval: the first never
/// follows redirects so the `Location` header can be read, the second does.
pub fn bearer_clients(token: &AuthToken) -> anyhow::Result<(Client, Client)> {
    let mut value = HeaderValue::from_str(&token.bearer())?;
    value.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);

    let probe = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers.clone())
        .redirect(redirect::Policy::none())
        .build()?;
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?;
    Ok((probe, client))
}
