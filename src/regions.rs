use crate::criteria::BoundingBox;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Named areas of interest, stored as `name = { W, S, E, N }` in a TOML file.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(transparent)]
pub struct RegionRegistry {
    regions: BTreeMap<String, BoundingBox>,
}

impl RegionRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.insert(
            "Santander",
            BoundingBox {
                west: -4.0,
                south: 43.3,
                east: -3.7,
                north: 43.5,
            },
        );
        registry
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Falls back to the built-in regions when the file does not exist.
    pub fn read_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::read(path)
        } else {
            Ok(Self::with_defaults())
        }
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Adds a region, replacing any region already stored under that name.
    pub fn insert(&mut self, name: &str, bbox: BoundingBox) {
        self.regions.insert(name.to_string(), bbox);
    }

    pub fn get(&self, name: &str) -> Option<BoundingBox> {
        self.regions.get(name).copied()
    }

    pub fn names(&self) -> Vec<&str> {
        self.regions.keys().map(String::as_str).collect()
    }
}
