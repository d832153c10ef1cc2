use crate::error::{Error, Result};
use crate::odata::CatalogOps;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub const TOKEN_URL: &str =
    "https://identity.dataspace.copernicus.eu/auth/realms/CDSE/protocol/openid-connect/token";

/// Public client identifier of the Copernicus Data Space Keycloak realm.
pub const CLIENT_ID: &str = "cdse-public";

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"*****")
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthToken {
    value: String,
}

impl AuthToken {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(*****)")
    }
}

/// Exchanges the credentials for an access token with a password grant.
pub async fn authenticate(ops: &impl CatalogOps, credentials: &Credentials) -> Result<AuthToken> {
    let form = [
        ("client_id", CLIENT_ID),
        ("username", credentials.username.as_str()),
        ("password", credentials.password.as_str()),
        ("grant_type", "password"),
    ];
    let response = ops
        .request_token(&form)
        .await
        .map_err(|e| Error::Auth(format!("{e:#}")))?;

    let token = response
        .get("access_token")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .ok_or(Error::Auth(
            "Failed to retrieve access token from Keycloak".to_string(),
        ))?;

    debug!(username = %credentials.username, "Access token retrieved");
    Ok(AuthToken::new(token))
}
