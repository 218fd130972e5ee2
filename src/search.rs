//! Query construction and catalog search against the ASF param service.

use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use log::{info, warn};
use serde::Deserialize;
use url::Url;

use crate::aoi::AreaOfInterest;
use crate::error::FetchError;
use crate::timing::{Phase, TimingRecorder};

// Hard-coded ASF search endpoint.
const ASF_BASE_URL: &str = "https://api.daac.asf.alaska.edu/services/search/param";

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub dataset: String,
    pub aoi: AreaOfInterest,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub polarization: Option<String>,
    pub beam_mode: Option<String>,
    pub processing_level: Option<String>,
}

impl SearchQuery {
    pub fn new(
        dataset: &str,
        aoi: AreaOfInterest,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, FetchError> {
        if end < start {
            return Err(FetchError::SearchQueryRejected(format!(
                "end date {} precedes start date {}",
                end, start
            )));
        }
        Ok(Self {
            dataset: dataset.to_string(),
            aoi,
            start,
            end,
            polarization: None,
            beam_mode: None,
            processing_level: None,
        })
    }

    pub fn to_params(self: &Self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("dataset", self.dataset.clone()),
            ("intersectsWith", self.aoi.to_wkt()),
            ("start", self.start.to_string()),
            ("end", self.end.to_string()),
            ("output", "json".to_string()),
        ];
        if let Some(polarization) = &self.polarization {
            params.push(("polarization", polarization.clone()));
        }
        if let Some(beam_mode) = &self.beam_mode {
            params.push(("beamMode", beam_mode.clone()));
        }
        if let Some(level) = &self.processing_level {
            params.push(("processingLevel", level.clone()));
        }
        params
    }
}

/// One catalog entry with everything the download step needs.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub guid: String,
    pub granule_name: String,
    pub dataset: String,
    pub download_url: Url,
    pub size_mb: Option<f64>,
}

/// Raw catalog record; the service returns more fields than we consume and
/// leaves any of these out for some product types.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "productID")]
    product_id: Option<String>,
    #[serde(rename = "granuleName")]
    granule_name: Option<String>,
    #[serde(rename = "platform")]
    platform: Option<String>,
    #[serde(rename = "downloadUrl")]
    download_url: Option<String>,
    #[serde(rename = "sizeMB")]
    size_mb: Option<f64>,
}

pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
}

impl SearchClient {
    pub fn new() -> Self {
        Self::with_base_url(ASF_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// Run the query once. A failed search aborts the run; there is no
    /// automatic retry. When `query_log_dir` is set, the raw response body is
    /// saved there for later inspection.
    pub async fn search(
        self: &Self,
        query: &SearchQuery,
        query_log_dir: Option<&Path>,
        recorder: &mut TimingRecorder,
    ) -> Result<Vec<ProductRecord>, FetchError> {
        let _timer = recorder.start(Phase::Search);

        let response = self
            .client
            .post(self.base_url.as_str())
            .query(&query.to_params())
            .send()
            .await
            .map_err(|e| FetchError::SearchUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::SearchUnavailable(e.to_string()))?;

        if status.is_client_error() {
            return Err(FetchError::SearchQueryRejected(format!(
                "{}: {}",
                status,
                body.trim()
            )));
        }
        if !status.is_success() {
            return Err(FetchError::SearchUnavailable(format!("{}", status)));
        }

        if let Some(dir) = query_log_dir {
            save_query_log(dir, &body);
        }

        let records = parse_records(&body, &query.dataset)
            .map_err(|e| FetchError::SearchQueryRejected(format!("undecodable response: {}", e)))?;
        info!("Search returned {} product(s)", records.len());
        Ok(records)
    }
}

impl Default for SearchClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the service's JSON output (a list of record lists) into the records
/// the pipeline can act on, preserving the returned order. Entries without a
/// usable identifier or download URL are dropped with a warning, as are
/// duplicate GUIDs within the same result set.
pub fn parse_records(body: &str, dataset: &str) -> Result<Vec<ProductRecord>, serde_json::Error> {
    let pages: Vec<Vec<RawRecord>> = serde_json::from_str(body)?;

    let mut seen = std::collections::HashSet::new();
    let mut records = vec![];
    for raw in pages.into_iter().flatten() {
        let (Some(guid), Some(granule_name)) = (raw.product_id, raw.granule_name) else {
            warn!("Skipping catalog entry with no product id or granule name");
            continue;
        };
        let Some(url) = raw.download_url else {
            warn!("Skipping {}: no download URL", granule_name);
            continue;
        };
        let download_url = match Url::parse(&url) {
            Ok(u) => u,
            Err(e) => {
                warn!("Skipping {}: malformed download URL ({})", granule_name, e);
                continue;
            }
        };
        if !seen.insert(guid.clone()) {
            warn!("Skipping duplicate product id {}", guid);
            continue;
        }
        records.push(ProductRecord {
            guid,
            granule_name,
            dataset: raw.platform.unwrap_or_else(|| dataset.to_string()),
            download_url,
            size_mb: raw.size_mb,
        });
    }
    Ok(records)
}

fn save_query_log(dir: &Path, body: &str) {
    let stamp = chrono::Local::now().format("%Y_%m_%d-%H_%M_%S");
    let path = dir.join(format!("asf_query_{}.json", stamp));
    match std::fs::write(&path, body) {
        Ok(()) => info!("Query result saved to {}", path.display()),
        Err(e) => warn!("Unable to save query log to {}: {}", path.display(), e),
    }
}
