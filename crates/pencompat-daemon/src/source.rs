//! Dataset sources: local files or remote URLs
//!
//! Fetching is the only asynchronous step. Once the text of every source is
//! in memory the core pipeline runs synchronously.

use chrono::{DateTime, Utc};
use pencompat_core::{
    check_definitions, merge_datasets, parse_dataset, DatasetError, Dataset, Diagnostics,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid dataset {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: DatasetError,
    },
    #[error("No dataset sources configured")]
    NoSources,
}

impl SourceError {
    /// True for transport failures, false for documents that arrived but could not be used
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            SourceError::Fetch { .. } | SourceError::Status { .. } | SourceError::Read { .. }
        )
    }
}

/// Where a dataset comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Url(String),
}

impl DatasetSource {
    /// Classify a configured source string
    pub fn parse(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DatasetSource::Url(location.to_string())
        } else {
            DatasetSource::File(PathBuf::from(location))
        }
    }

    pub fn location(&self) -> String {
        match self {
            DatasetSource::File(path) => path.display().to_string(),
            DatasetSource::Url(url) => url.clone(),
        }
    }

    /// Fetch and decode the source text
    pub async fn fetch(&self, client: &reqwest::Client) -> Result<String, SourceError> {
        match self {
            DatasetSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| SourceError::Read {
                        path: path.display().to_string(),
                        source,
                    })
            }
            DatasetSource::Url(url) => {
                let response = client.get(url).send().await.map_err(|source| SourceError::Fetch {
                    url: url.clone(),
                    source,
                })?;

                if !response.status().is_success() {
                    return Err(SourceError::Status {
                        url: url.clone(),
                        status: response.status().as_u16(),
                    });
                }

                response.text().await.map_err(|source| SourceError::Fetch {
                    url: url.clone(),
                    source,
                })
            }
        }
    }
}

/// Diagnostics of one source: unknown families and definitions without an id
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub location: String,
    pub diagnostics: Diagnostics,
}

/// Merged result of loading every configured source
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub dataset: Dataset,
    pub reports: Vec<SourceReport>,
    /// Missing and unused definitions, checked across every source
    pub definitions: Diagnostics,
    pub loaded_at: DateTime<Utc>,
}

/// Source loader holding the HTTP client
pub struct SourceLoader {
    client: reqwest::Client,
    sources: Vec<DatasetSource>,
}

impl SourceLoader {
    pub fn new(locations: &[String], timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            sources: locations.iter().map(|l| DatasetSource::parse(l)).collect(),
        })
    }

    /// Fetch, parse and merge every source in order.
    ///
    /// Any failing source fails the whole load so callers never see a
    /// partially merged dataset.
    pub async fn load(&self) -> Result<Snapshot, SourceError> {
        if self.sources.is_empty() {
            return Err(SourceError::NoSources);
        }

        let mut datasets = Vec::with_capacity(self.sources.len());
        let mut reports = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let location = source.location();
            info!(source = %location, "Loading dataset source");

            let text = source.fetch(&self.client).await?;
            debug!(source = %location, bytes = text.len(), "Fetched dataset source");

            let loaded = parse_dataset(&text).map_err(|e| SourceError::Parse {
                location: location.clone(),
                source: e,
            })?;
            loaded.diagnostics.log(&location);

            datasets.push(loaded.dataset);
            reports.push(SourceReport {
                location,
                diagnostics: loaded.diagnostics,
            });
        }

        let dataset = merge_datasets(&datasets);
        let mut definitions = Diagnostics::new();
        check_definitions(&dataset, &mut definitions);
        definitions.log("merged");

        info!(
            sources = datasets.len(),
            rows = dataset.rows.len(),
            warnings = definitions.len(),
            "Dataset ready"
        );

        Ok(Snapshot {
            dataset,
            reports,
            definitions,
            loaded_at: Utc::now(),
        })
    }
}
