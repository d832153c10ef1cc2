mod auth;
mod provider;
pub mod query;
mod search;

pub use auth::{authenticate, AuthToken, Credentials, CLIENT_ID, TOKEN_URL};
pub use provider::{Provider, Session};
pub use search::{search, ProductRecord};
