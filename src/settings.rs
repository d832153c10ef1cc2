use crate::copernicus::Credentials;
use crate::criteria::{Platform, Region};
use crate::error::{Error, Result};
use crate::regions::RegionRegistry;
use crate::validation::{self, date_text};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

pub const USERNAME_ENV: &str = "SENTINEL_GET_USERNAME";
pub const PASSWORD_ENV: &str = "SENTINEL_GET_PASSWORD";

fn default_output_dir() -> PathBuf {
    PathBuf::from("./outputs")
}

/// Contents of a download configuration file.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Settings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiles_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi_lat_lon: Option<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<u8>,
    #[serde(default)]
    pub credentials: Credentials,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            tile: None,
            tiles_list: None,
            start_date: None,
            end_date: None,
            roi_lat_lon: None,
            region: None,
            platform: None,
            product_type: None,
            cloud: None,
            credentials: Credentials::default(),
        }
    }
}

impl Settings {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Config(format!(
                "Configuration file '{}' not found",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        let table: Table = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Error parsing '{}': {e}", path.display())))?;
        let mut settings = Self::from_table(table)?;
        settings.apply_env_credentials();
        Ok(settings)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validates the raw table, then deserializes it.
    pub fn from_table(mut table: Table) -> Result<Self> {
        validation::validate(&table)?;

        // Bare TOML dates are handed to chrono as text.
        for field in ["start_date", "end_date"] {
            if let Some(text) = table.get(field).and_then(date_text) {
                table.insert(field.to_string(), Value::String(text));
            }
        }

        Value::Table(table)
            .try_into()
            .map_err(|e| Error::Config(e.to_string()))
    }

    fn apply_env_credentials(&mut self) {
        if let Ok(username) = std::env::var(USERNAME_ENV) {
            self.credentials.username = username;
        }
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            self.credentials.password = password;
        }
    }

    /// Replaces a named `region` by its bounding box when no explicit
    /// `roi_lat_lon` is given. Stored boxes get the same checks as inline ones.
    pub fn resolve_region(&mut self, registry: &RegionRegistry) -> Result<()> {
        if self.roi_lat_lon.is_some() {
            return Ok(());
        }
        if let Some(name) = &self.region {
            let bbox = registry
                .get(name)
                .ok_or_else(|| Error::Config(format!("Region '{name}' not found")))?;
            validation::check_bbox("region", &bbox)?;
            self.roi_lat_lon = Some(Region::BoundingBox(bbox));
        }
        Ok(())
    }

    pub fn require_credentials(&self) -> Result<&Credentials> {
        if self.credentials.username.is_empty() || self.credentials.password.is_empty() {
            return Err(Error::Config(
                "'username' and 'password' must be provided in the configuration".to_string(),
            ));
        }
        Ok(&self.credentials)
    }
}
