#![allow(async_fn_in_trait)]
pub mod copernicus;
pub mod criteria;
mod error;
pub mod extract;
pub mod manager;
pub mod odata;
pub mod regions;
pub mod retrieval;
pub mod settings;
pub mod validation;

pub use error::{Error, Result};
