//! Entry point tying configuration, catalogue search and retrieval together.
use crate::copernicus::{search, ProductRecord};
use crate::criteria::SearchCriteria;
use crate::error::Result;
use crate::odata::CatalogOps;
use crate::regions::RegionRegistry;
use crate::retrieval::{self, RetrievalOutcome};
use crate::settings::Settings;
use std::path::Path;
use tracing::{debug, info};

pub const OUTCOME_FILE: &str = "retrieval_outcome.json";

pub struct GetManager<P> {
    settings: Settings,
    provider: P,
}

impl<P: CatalogOps> GetManager<P> {
    pub fn new(settings: Settings, provider: P) -> Self {
        info!(output_dir = %settings.output_dir.display(), "Configuration initialized");
        Self { settings, provider }
    }

    /// Reads the configuration file and resolves any named region against `regions`.
    pub fn from_file<C: AsRef<Path>, R: AsRef<Path>>(
        config: C,
        regions: R,
        provider: P,
    ) -> Result<Self> {
        let mut settings = Settings::read(&config)?;
        debug!(path = %config.as_ref().display(), "Configuration loaded");
        settings.resolve_region(&RegionRegistry::read_or_default(regions)?)?;
        Ok(Self::new(settings, provider))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn criteria(&self) -> Result<SearchCriteria> {
        SearchCriteria::from_settings(&self.settings)
    }

    pub async fn search(&self) -> Result<Vec<ProductRecord>> {
        info!("Starting product search");
        let records = search(&self.provider, &self.criteria()?).await?;
        info!(found = records.len(), "Search completed");
        for record in &records {
            debug!(product = %record.name, online = record.online, "Found");
        }
        Ok(records)
    }

    /// Downloads every product matching the configuration and records the
    /// outcome next to the products.
    pub async fn download(&self) -> Result<RetrievalOutcome> {
        let credentials = self.settings.require_credentials()?;
        let criteria = self.criteria()?;
        let output_dir = &self.settings.output_dir;

        info!(strategy = criteria.strategy(), "Starting product download");
        let outcome =
            retrieval::download(&self.provider, &criteria, credentials, output_dir).await?;

        info!(
            downloaded = outcome.downloaded.len(),
            pending = outcome.pending.len(),
            "Download completed"
        );
        debug!(downloaded = ?outcome.downloaded, pending = ?outcome.pending, "Products");

        outcome.write(output_dir.join(OUTCOME_FILE))?;
        Ok(outcome)
    }
}
