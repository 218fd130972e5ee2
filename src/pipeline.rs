//! The acquisition pipeline: build filters, search once, then download and
//! unpack each candidate in catalog order.
//!
//! A search failure aborts the run. Per-product failures are recorded and the
//! loop moves on, so one bad product never blocks the rest.

use std::fs;

use anyhow::{Context, Result};
use log::{error, info};

use crate::aoi::{AreaOfInterest, DEFAULT_BUFFER_DEG};
use crate::config::Acquisition;
use crate::download::download_product;
use crate::http::{HttpClient, HttpOps};
use crate::paths::PathPlanner;
use crate::search::{ProductRecord, SearchClient, SearchQuery};
use crate::timing::TimingRecorder;
use crate::unpack::expand_archive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    /// Downloaded and expanded into the product directory.
    Ready,
    /// Downloaded; unpack skipped by operator flag.
    DownloadedOnly,
    FailedDownload,
    FailedUnpack,
}

impl ProductStatus {
    pub fn label(self: &Self) -> &'static str {
        match self {
            ProductStatus::Ready => "downloaded-and-unpacked",
            ProductStatus::DownloadedOnly => "downloaded-only",
            ProductStatus::FailedDownload => "failed-download",
            ProductStatus::FailedUnpack => "failed-unpack",
        }
    }

    pub fn is_failure(self: &Self) -> bool {
        matches!(
            self,
            ProductStatus::FailedDownload | ProductStatus::FailedUnpack
        )
    }
}

#[derive(Debug, Clone)]
pub struct ProductReport {
    pub guid: String,
    pub granule_name: String,
    pub status: ProductStatus,
}

#[derive(Debug)]
pub struct RunSummary {
    pub products: Vec<ProductReport>,
    pub timings: TimingRecorder,
}

impl RunSummary {
    pub fn failures(self: &Self) -> usize {
        self.products
            .iter()
            .filter(|p| p.status.is_failure())
            .count()
    }

    /// Any per-product failure makes the whole run exit non-zero, so scripted
    /// callers notice incomplete acquisitions.
    pub fn exit_code(self: &Self) -> u8 {
        if self.failures() > 0 {
            1
        } else {
            0
        }
    }

    pub fn render(self: &Self) -> String {
        let mut lines = vec![];
        for product in &self.products {
            lines.push(format!(
                "{} ({}): {}",
                product.granule_name,
                product.guid,
                product.status.label()
            ));
        }
        lines.push(format!(
            "{} product(s), {} failure(s)",
            self.products.len(),
            self.failures()
        ));
        lines.push(self.timings.report());
        lines.join("\n")
    }
}

/// Run one acquisition end to end.
pub async fn run(cfg: &Acquisition) -> Result<RunSummary> {
    let aoi = AreaOfInterest::from_point(cfg.latitude, cfg.longitude, DEFAULT_BUFFER_DEG)?;
    let mut query = SearchQuery::new(&cfg.dataset, aoi, cfg.start, cfg.end)?;
    query.polarization = cfg.polarization.clone();
    query.beam_mode = cfg.beam_mode.clone();
    query.processing_level = cfg.processing_level.clone();

    let planner = PathPlanner::new(&cfg.working_dir, &cfg.dataset);
    fs::create_dir_all(planner.working_dir()).with_context(|| {
        format!(
            "Unable to create working directory {}",
            planner.working_dir().display()
        )
    })?;

    let mut recorder = TimingRecorder::new();

    let products = SearchClient::new()
        .search(&query, Some(planner.working_dir()), &mut recorder)
        .await?;

    let http = match (&cfg.username, &cfg.password) {
        (Some(user), Some(pass)) => HttpClient::with_credentials(user, pass),
        _ => HttpClient::new(),
    };

    let reports =
        process_products(&http, &products, &planner, cfg.skip_unpack, &mut recorder).await;

    Ok(RunSummary {
        products: reports,
        timings: recorder,
    })
}

/// Sequential per-product download and unpack. Always reports on every
/// product, failures included.
pub async fn process_products(
    http: &impl HttpOps,
    products: &[ProductRecord],
    planner: &PathPlanner,
    skip_unpack: bool,
    recorder: &mut TimingRecorder,
) -> Vec<ProductReport> {
    let mut reports = vec![];
    for record in products {
        let status = process_one(http, record, planner, skip_unpack, recorder).await;
        info!("{} ({}): {}", record.granule_name, record.guid, status.label());
        reports.push(ProductReport {
            guid: record.guid.clone(),
            granule_name: record.granule_name.clone(),
            status,
        });
    }
    reports
}

async fn process_one(
    http: &impl HttpOps,
    record: &ProductRecord,
    planner: &PathPlanner,
    skip_unpack: bool,
    recorder: &mut TimingRecorder,
) -> ProductStatus {
    let target_dir = match planner.ensure_product_dir(&record.guid) {
        Ok(dir) => dir,
        Err(e) => {
            error!("{} ({}): {}", record.granule_name, record.guid, e);
            return ProductStatus::FailedDownload;
        }
    };

    let archive = match download_product(http, record, &target_dir, recorder).await {
        Ok(path) => path,
        Err(e) => {
            error!("{}", e);
            return ProductStatus::FailedDownload;
        }
    };

    match expand_archive(
        &archive,
        &target_dir,
        &record.granule_name,
        skip_unpack,
        recorder,
    ) {
        Ok(()) if skip_unpack => ProductStatus::DownloadedOnly,
        Ok(()) => ProductStatus::Ready,
        Err(e) => {
            error!("{}", e);
            ProductStatus::FailedUnpack
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ByteStream;
    use anyhow::anyhow;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use std::io::{Cursor, Write};
    use url::Url;

    /// Serves every URL from one body, except URLs whose path contains
    /// "fail", which die with a transport error.
    struct MockHttp {
        body: Vec<u8>,
    }

    impl HttpOps for MockHttp {
        async fn content_length(self: &Self, url: &Url) -> anyhow::Result<Option<u64>> {
            if url.path().contains("fail") {
                return Err(anyhow!("connection refused"));
            }
            Ok(Some(self.body.len() as u64))
        }

        async fn get_from(self: &Self, url: &Url, start_byte: u64) -> anyhow::Result<ByteStream> {
            if url.path().contains("fail") {
                return Err(anyhow!("connection refused"));
            }
            let rest = self
                .body
                .get(start_byte as usize..)
                .unwrap_or_default()
                .to_vec();
            Ok(futures_util::stream::iter(vec![Ok(Bytes::from(rest))]).boxed())
        }
    }

    fn record(n: u32, fail: bool) -> ProductRecord {
        let file = if fail {
            format!("product-{}-fail.zip", n)
        } else {
            format!("product-{}.zip", n)
        };
        ProductRecord {
            guid: format!("GUID-{:04}", n),
            granule_name: format!("S1A_GRANULE_{:04}", n),
            dataset: "SENTINEL-1".to_string(),
            download_url: Url::parse(&format!("https://archive.example.com/{}", file)).unwrap(),
            size_mb: None,
        }
    }

    fn zip_bytes() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(
                "GRANULE.SAFE/manifest.safe",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer.write_all(b"manifest contents").unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn test_one_failed_download_does_not_stop_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let planner = PathPlanner::new(tmp.path(), "SENTINEL-1");
        let http = MockHttp {
            body: b"archive bytes".to_vec(),
        };
        let products = vec![record(1, false), record(2, true), record(3, false)];
        let mut recorder = TimingRecorder::new();

        let reports = process_products(&http, &products, &planner, true, &mut recorder).await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].status, ProductStatus::DownloadedOnly);
        assert_eq!(reports[1].status, ProductStatus::FailedDownload);
        assert_eq!(reports[2].status, ProductStatus::DownloadedOnly);

        let summary = RunSummary {
            products: reports,
            timings: recorder,
        };
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_download_and_unpack_produces_ready_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let planner = PathPlanner::new(tmp.path(), "SENTINEL-1");
        let http = MockHttp { body: zip_bytes() };
        let products = vec![record(7, false)];
        let mut recorder = TimingRecorder::new();

        let reports = process_products(&http, &products, &planner, false, &mut recorder).await;

        assert_eq!(reports[0].status, ProductStatus::Ready);
        let product_dir = tmp.path().join("SENTINEL-1").join("GUID-0007");
        assert!(product_dir.join("GUID-0007.zip").exists());
        assert_eq!(
            fs::read(product_dir.join("manifest.safe")).unwrap(),
            b"manifest contents"
        );
    }

    #[tokio::test]
    async fn test_corrupt_archive_reports_failed_unpack() {
        let tmp = tempfile::tempdir().unwrap();
        let planner = PathPlanner::new(tmp.path(), "SENTINEL-1");
        let http = MockHttp {
            body: b"not a zip archive".to_vec(),
        };
        let products = vec![record(9, false)];
        let mut recorder = TimingRecorder::new();

        let reports = process_products(&http, &products, &planner, false, &mut recorder).await;
        assert_eq!(reports[0].status, ProductStatus::FailedUnpack);
    }

    #[test]
    fn test_exit_code_zero_without_failures() {
        let summary = RunSummary {
            products: vec![ProductReport {
                guid: "GUID-1".to_string(),
                granule_name: "G1".to_string(),
                status: ProductStatus::Ready,
            }],
            timings: TimingRecorder::new(),
        };
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_render_lists_every_product_and_phase() {
        let summary = RunSummary {
            products: vec![
                ProductReport {
                    guid: "GUID-1".to_string(),
                    granule_name: "G1".to_string(),
                    status: ProductStatus::Ready,
                },
                ProductReport {
                    guid: "GUID-2".to_string(),
                    granule_name: "G2".to_string(),
                    status: ProductStatus::FailedDownload,
                },
            ],
            timings: TimingRecorder::new(),
        };
        let rendered = summary.render();
        assert!(rendered.contains("G1 (GUID-1): downloaded-and-unpacked"));
        assert!(rendered.contains("G2 (GUID-2): failed-download"));
        assert!(rendered.contains("2 product(s), 1 failure(s)"));
        assert!(rendered.contains("search:"));
        assert!(rendered.contains("download:"));
        assert!(rendered.contains("unpack:"));
    }
}
