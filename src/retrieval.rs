use crate::copernicus::query::content_url;
use crate::copernicus::{authenticate, search, Credentials, ProductRecord};
use crate::criteria::SearchCriteria;
use crate::error::{Error, Result};
use crate::extract::{extract, ArchiveFormat};
use crate::odata::{CatalogOps, ContentOps};
use futures_util::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Upper bound on the buffer reserved up front from a server-declared length.
const PREALLOCATION_LIMIT: u64 = 64 << 20;

const BAR_TEMPLATE: &str = "{prefix:>12.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

const SPINNER_TEMPLATE: &str = "{spinner:.blue} {prefix:>12.cyan.bold} [{elapsed_precise}] {bytes} ({bytes_per_sec})";

const REDIRECT_CODES: [StatusCode; 4] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
];

/// Products materialised in the destination and products left for a later run.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct RetrievalOutcome {
    pub downloaded: Vec<String>,
    pub pending: Vec<String>,
}

impl RetrievalOutcome {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.downloaded.iter().chain(&self.pending).any(|n| n == name)
    }
}

/// Searches the catalogue and retrieves every match into `destination`.
///
/// Authentication and search failures abort the call. Offline products and
/// products whose transfer or extraction fails are reported as pending; they
/// are not retried here, a later call picks them up again while skipping
/// whatever already exists under `destination`.
pub async fn download(
    ops: &impl CatalogOps,
    criteria: &SearchCriteria,
    credentials: &Credentials,
    destination: &Path,
) -> Result<RetrievalOutcome> {
    let token = authenticate(ops, credentials).await?;
    let records = search(ops, criteria).await?;
    fs::create_dir_all(destination)?;

    let mut outcome = RetrievalOutcome::default();
    if records.is_empty() {
        info!("No products found");
        return Ok(outcome);
    }

    let session = ops
        .open_session(&token)
        .map_err(|e| Error::Transfer(format!("Unable to open download session: {e:#}")))?;

    info!(count = records.len(), "Retrieving products");
    for record in &records {
        if outcome.contains(&record.name) {
            debug!(product = %record.name, "Duplicate catalogue entry skipped");
            continue;
        }

        if !record.online {
            warn!(product = %record.name, "Product is offline, marked as pending");
            outcome.pending.push(record.name.clone());
            continue;
        }

        if destination.join(&record.name).exists() {
            info!(product = %record.name, "Product already downloaded");
            outcome.downloaded.push(record.name.clone());
            continue;
        }

        match try_download(&session, ops.catalogue_url(), record, destination).await {
            Ok(()) => {
                info!(product = %record.name, "Download complete");
                outcome.downloaded.push(record.name.clone());
            }
            Err(e) => {
                warn!(product = %record.name, error = %e, "Download failed, marked as pending");
                outcome.pending.push(record.name.clone());
            }
        }
    }

    Ok(outcome)
}

async fn try_download(
    session: &impl ContentOps,
    catalogue_url: &str,
    record: &ProductRecord,
    destination: &Path,
) -> Result<()> {
    let url = resolve_location(session, content_url(catalogue_url, &record.id)).await?;
    let payload = fetch(session, &url, &record.name).await?;

    let destination: PathBuf = destination.to_path_buf();
    tokio::task::spawn_blocking(move || extract(&payload, &ArchiveFormat::Zip, &destination))
        .await
        .map_err(|e| Error::Extraction(e.to_string()))?
}

/// The content endpoint usually answers with a redirect to the storage host.
async fn resolve_location(session: &impl ContentOps, url: String) -> Result<String> {
    let head = session
        .head(&url)
        .await
        .map_err(|e| Error::Transfer(format!("HEAD {url}: {e:#}")))?;

    if REDIRECT_CODES.contains(&head.status) {
        if let Some(location) = head.location {
            debug!(from = %url, to = %location, "Redirected");
            return Ok(location);
        }
    }
    Ok(url)
}

async fn fetch(session: &impl ContentOps, url: &str, name: &str) -> Result<Vec<u8>> {
    let content = session
        .get_stream(url)
        .await
        .map_err(|e| Error::Transfer(format!("GET {url}: {e:#}")))?;

    if !content.status.is_success() {
        return Err(Error::Transfer(format!(
            "{name} failed to download, status: {}",
            content.status
        )));
    }

    let bar = progress_bar(name, content.content_length);
    let capacity = content.content_length.unwrap_or(0).min(PREALLOCATION_LIMIT);
    let mut data = Vec::with_capacity(capacity as usize);
    let mut body = content.body;
    while let Some(chunk) = body.try_next().await.map_err(|e| {
        bar.abandon();
        Error::Transfer(format!("{name} stream interrupted: {e:#}"))
    })? {
        bar.inc(chunk.len() as u64);
        data.extend_from_slice(&chunk);
    }
    bar.finish();

    debug!(product = %name, size = data.len(), "Payload received");
    Ok(data)
}

/// A byte progress bar for one product, or a spinner when the length is unknown.
fn progress_bar(name: &str, len: Option<u64>) -> ProgressBar {
    let (bar, template) = match len {
        Some(len) => (ProgressBar::new(len), BAR_TEMPLATE),
        None => (ProgressBar::new_spinner(), SPINNER_TEMPLATE),
    };
    let bar = match ProgressStyle::with_template(template) {
        Ok(style) => bar.with_style(style.progress_chars("█▓▒░  ")),
        Err(_) => bar,
    };
    bar.with_prefix(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copernicus::AuthToken;
    use crate::extract::fixtures::zip_bytes;
    use crate::odata::fake::{FakeCatalog, Routes, CATALOGUE};
    use serde_json::json;
    use tempfile::TempDir;

    fn credentials() -> Credentials {
        Credentials::new("dummy", "dummy")
    }

    fn by_name(name: &str) -> SearchCriteria {
        SearchCriteria::ByName(name.to_string())
    }

    fn content(id: &str) -> String {
        format!("{CATALOGUE}/Products({id})/$value")
    }

    #[tokio::test]
    async fn test_redirect_then_download() {
        let dir = TempDir::new().unwrap();
        let routes = Routes::default()
            .redirect(&content("1"), "https://download.test/T1.zip")
            .content(
                "https://download.test/T1.zip",
                StatusCode::OK,
                zip_bytes(&[("T1/file.txt", "scene")]),
            );
        let catalog = FakeCatalog::new(json!({
            "value": [{"Id": "1", "Name": "T1", "Online": true}]
        }))
        .with_routes(routes);

        let outcome = download(&catalog, &by_name("T1"), &credentials(), dir.path())
            .await
            .unwrap();

        assert_eq!(outcome.downloaded, vec!["T1"]);
        assert!(outcome.pending.is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("T1/file.txt")).unwrap(),
            "scene"
        );
        let requests = catalog.requests();
        assert!(requests.contains(&"SESSION Bearer secret".to_string()));
        assert!(requests.contains(&format!("HEAD {}", content("1"))));
        assert!(requests.contains(&"GET https://download.test/T1.zip".to_string()));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let routes = Routes::default().content(
            &content("1"),
            StatusCode::OK,
            zip_bytes(&[("T1/file.txt", "scene")]),
        );
        let feed = json!({"value": [{"Id": "1", "Name": "T1", "Online": true}]});

        let first = FakeCatalog::new(feed.clone()).with_routes(routes);
        let outcome = download(&first, &by_name("T1"), &credentials(), dir.path())
            .await
            .unwrap();
        assert_eq!(outcome.downloaded, vec!["T1"]);

        let second = FakeCatalog::new(feed);
        let again = download(&second, &by_name("T1"), &credentials(), dir.path())
            .await
            .unwrap();
        assert_eq!(again, outcome);
        assert!(!second
            .requests()
            .iter()
            .any(|r| r.starts_with("HEAD") || r.contains("$value")));
    }

    #[tokio::test]
    async fn test_offline_is_pending_without_fetch() {
        let dir = TempDir::new().unwrap();
        let catalog = FakeCatalog::new(json!({
            "value": [{"Id": "7", "Name": "cold", "Online": false}]
        }));

        let outcome = download(&catalog, &by_name("cold"), &credentials(), dir.path())
            .await
            .unwrap();

        assert_eq!(outcome.pending, vec!["cold"]);
        assert!(outcome.downloaded.is_empty());
        assert!(!catalog.requests().iter().any(|r| r.contains("Products(7)")));
    }

    #[tokio::test]
    async fn test_failed_item_does_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let routes = Routes::default()
            .redirect(&content("a"), "https://download.test/a.zip")
            .content("https://download.test/a.zip", StatusCode::NOT_FOUND, vec![])
            .content(
                &content("b"),
                StatusCode::OK,
                zip_bytes(&[("B/band.jp2", "pixels")]),
            );
        let catalog = FakeCatalog::new(json!({
            "value": [
                {"Id": "a", "Name": "A", "Online": true},
                {"Id": "b", "Name": "B", "Online": true}
            ]
        }))
        .with_routes(routes);
        let criteria = SearchCriteria::ByList(vec!["A".to_string(), "B".to_string()]);

        let outcome = download(&catalog, &criteria, &credentials(), dir.path())
            .await
            .unwrap();

        assert_eq!(outcome.pending, vec!["A"]);
        assert_eq!(outcome.downloaded, vec!["B"]);
        assert!(dir.path().join("B/band.jp2").exists());
    }

    #[tokio::test]
    async fn test_transport_and_extraction_faults_are_pending() {
        let dir = TempDir::new().unwrap();
        // No route for "gone": the GET fails at the transport level.
        let routes = Routes::default().content(&content("bad"), StatusCode::OK, b"garbage".to_vec());
        let catalog = FakeCatalog::new(json!({
            "value": [
                {"Id": "gone", "Name": "Gone", "Online": true},
                {"Id": "bad", "Name": "Corrupt", "Online": true}
            ]
        }))
        .with_routes(routes);

        let outcome = download(&catalog, &by_name("x"), &credentials(), dir.path())
            .await
            .unwrap();

        assert_eq!(outcome.pending, vec!["Gone", "Corrupt"]);
        assert!(outcome.downloaded.is_empty());
    }

    #[tokio::test]
    async fn test_empty_search_short_circuits() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("never-created");
        let catalog = FakeCatalog::new(json!({"value": []}));

        let outcome = download(&catalog, &by_name("T1"), &credentials(), &destination)
            .await
            .unwrap();

        assert_eq!(outcome, RetrievalOutcome::default());
        assert!(destination.is_dir());
        assert!(!catalog.requests().iter().any(|r| r.starts_with("SESSION")));
    }

    #[tokio::test]
    async fn test_search_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let catalog = FakeCatalog::new(json!({})).with_feed(None);

        let result = download(&catalog, &by_name("T1"), &credentials(), dir.path()).await;

        assert!(matches!(result, Err(Error::Search(_))));
        let requests = catalog.requests();
        assert!(requests[0].starts_with("TOKEN"));
        assert!(!requests
            .iter()
            .any(|r| r.starts_with("SESSION") || r.starts_with("HEAD")));
    }

    #[tokio::test]
    async fn test_oversized_length_is_not_trusted() {
        let routes = Routes::default()
            .content("https://download.test/x", StatusCode::OK, b"x".to_vec())
            .declared_length("https://download.test/x", u64::MAX);
        let catalog = FakeCatalog::new(json!({})).with_routes(routes);
        let session = catalog.open_session(&AuthToken::new("secret")).unwrap();

        let payload = fetch(&session, "https://download.test/x", "T1").await.unwrap();

        assert_eq!(payload, b"x");
    }

    #[tokio::test]
    async fn test_oversized_length_item_is_pending() {
        let dir = TempDir::new().unwrap();
        let routes = Routes::default()
            .content(&content("1"), StatusCode::OK, b"x".to_vec())
            .declared_length(&content("1"), u64::MAX)
            .content(
                &content("2"),
                StatusCode::OK,
                zip_bytes(&[("T2/file.txt", "scene")]),
            );
        let catalog = FakeCatalog::new(json!({
            "value": [
                {"Id": "1", "Name": "T1", "Online": true},
                {"Id": "2", "Name": "T2", "Online": true}
            ]
        }))
        .with_routes(routes);

        let outcome = download(&catalog, &by_name("x"), &credentials(), dir.path())
            .await
            .unwrap();

        assert_eq!(outcome.pending, vec!["T1"]);
        assert_eq!(outcome.downloaded, vec!["T2"]);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let catalog = FakeCatalog::new(json!({
            "value": [{"Id": "1", "Name": "T1", "Online": true}]
        }))
        .with_token(None);

        let result = download(&catalog, &by_name("T1"), &credentials(), dir.path()).await;

        assert!(matches!(result, Err(Error::Auth(_))));
        assert_eq!(catalog.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_names_land_in_one_list() {
        let dir = TempDir::new().unwrap();
        let catalog = FakeCatalog::new(json!({
            "value": [
                {"Id": "1", "Name": "T1", "Online": false},
                {"Id": "2", "Name": "T1", "Online": true}
            ]
        }));

        let outcome = download(&catalog, &by_name("T1"), &credentials(), dir.path())
            .await
            .unwrap();

        assert_eq!(outcome.pending, vec!["T1"]);
        assert!(outcome.downloaded.is_empty());
    }

    #[test]
    fn test_outcome_write_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("retrieval_outcome.json");
        let outcome = RetrievalOutcome {
            downloaded: vec!["A".to_string()],
            pending: vec!["B".to_string()],
        };
        outcome.write(&path).unwrap();
        assert_eq!(RetrievalOutcome::read(&path).unwrap(), outcome);
    }
}
