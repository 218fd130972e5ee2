//! Streams product archives to disk with resume and completeness checks.
//!
//! Transfers go into a `.partial` file that is renamed only once the byte
//! count matches the remote-reported size. A `.partial` left behind by a
//! killed run is resumed with a range request; a `.partial` left by a
//! detected failure is removed so the next run starts clean.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use futures_util::TryStreamExt;
use log::{info, warn};

use crate::error::FetchError;
use crate::http::HttpOps;
use crate::search::ProductRecord;
use crate::timing::{Phase, TimingRecorder};

/// Download one product archive into its target directory as `<GUID>.zip`.
/// Returns the archive path. On failure the partial file is removed and the
/// error carries the granule name for the run summary.
pub async fn download_product(
    http: &impl HttpOps,
    record: &ProductRecord,
    target_dir: &Path,
    recorder: &mut TimingRecorder,
) -> Result<PathBuf, FetchError> {
    let _timer = recorder.start(Phase::Download);

    let dest = target_dir.join(format!("{}.zip", record.guid));
    let partial = target_dir.join(format!("{}.zip.partial", record.guid));

    match transfer(http, record, &dest, &partial).await {
        Ok(path) => Ok(path),
        Err(e) => {
            if partial.exists() {
                if let Err(rm_err) = fs::remove_file(&partial) {
                    warn!(
                        "Unable to remove partial file {}: {}",
                        partial.display(),
                        rm_err
                    );
                }
            }
            Err(FetchError::DownloadFailed {
                granule: record.granule_name.clone(),
                reason: e.to_string(),
            })
        }
    }
}

async fn transfer(
    http: &impl HttpOps,
    record: &ProductRecord,
    dest: &Path,
    partial: &Path,
) -> Result<PathBuf> {
    // A completed archive from an earlier run is left alone.
    if dest.exists() {
        if fs::metadata(dest)?.len() > 0 {
            info!("{} already downloaded", record.granule_name);
            return Ok(dest.to_path_buf());
        }
        fs::remove_file(dest)?;
    }

    // Check if a partial file exists and get its size
    let mut partial_file = OpenOptions::new()
        .read(true)
        .create(true)
        .append(true)
        .open(partial)?;
    let mut byte_count = partial_file.metadata()?.len();

    let total_size = http.content_length(&record.download_url).await?;

    match total_size {
        Some(total) => {
            if byte_count > total {
                bail!(
                    "partial file is larger than the remote object ({} > {} bytes)",
                    byte_count,
                    total
                );
            }
            let progress = (byte_count as f64 / total as f64) * 100.;
            if progress > 0.0 {
                info!("Resuming download from {:.2}% completion", progress);
            }
        }
        None if byte_count > 0 => {
            // Cannot verify a resume without a remote size; start over.
            partial_file.set_len(0)?;
            byte_count = 0;
        }
        None => {}
    }

    if total_size.map_or(true, |total| byte_count < total) {
        info!("Downloading {}", record.granule_name);
        let mut stream = http.get_from(&record.download_url, byte_count).await?;
        while let Some(bytes) = stream.try_next().await? {
            let bytes_len = bytes.len() as u64;
            partial_file.write_all(&bytes)?;
            byte_count += bytes_len;
        }
        partial_file.flush()?;
    }

    if byte_count == 0 {
        bail!("downloaded file is empty");
    }
    if let Some(total) = total_size {
        if byte_count != total {
            bail!("size mismatch: wrote {} bytes, remote reports {}", byte_count, total);
        }
    }

    // Rename the file to remove the .partial suffix
    fs::rename(partial, dest)?;
    info!("Download complete: {}", dest.display());
    Ok(dest.to_path_buf())
}
