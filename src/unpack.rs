//! Expands a downloaded product archive into its GUID directory.

use std::fs;
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use log::{info, warn};
use zip::ZipArchive;

use crate::error::FetchError;
use crate::timing::{Phase, TimingRecorder};

/// Extract `archive` into `target_dir`, overwriting entries that conflict by
/// name. When `skip` is set the archive is treated as already-expanded
/// content and nothing is written. Product archives wrap their contents in a
/// single `<granule>.SAFE/` directory; that lone top-level directory is
/// stripped so the product files land directly in the GUID directory.
pub fn expand_archive(
    archive: &Path,
    target_dir: &Path,
    granule: &str,
    skip: bool,
    recorder: &mut TimingRecorder,
) -> Result<(), FetchError> {
    let _timer = recorder.start(Phase::Unpack);

    if skip {
        info!("Skipping unpack for {} (archives already expanded)", granule);
        return Ok(());
    }

    extract(archive, target_dir).map_err(|e| FetchError::UnpackFailed {
        granule: granule.to_string(),
        reason: e.to_string(),
    })
}

fn extract(archive: &Path, target_dir: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;

    let strip = common_top_level_dir(zip.file_names());

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(raw_path) = entry.enclosed_name() else {
            warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let Some(relative) = strip_top_level(&raw_path, strip.as_deref()) else {
            continue;
        };
        let out_path = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file)?;
    }

    info!("Expanded {} into {}", archive.display(), target_dir.display());
    Ok(())
}

/// The shared first path component when every entry lives under one
/// directory, as product archives do.
fn common_top_level_dir<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut top: Option<&str> = None;
    for name in names {
        let first = name.split('/').next()?;
        // A bare top-level file means there is nothing to strip.
        if first == name && !name.ends_with('/') {
            return None;
        }
        match top {
            None => top = Some(first),
            Some(existing) if existing == first => {}
            Some(_) => return None,
        }
    }
    top.map(|s| s.to_string())
}

fn strip_top_level(path: &Path, strip: Option<&str>) -> Option<PathBuf> {
    let Some(strip) = strip else {
        return Some(path.to_path_buf());
    };
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == std::ffi::OsStr::new(strip) => {
            let rest: PathBuf = components.collect();
            if rest.as_os_str().is_empty() {
                None
            } else {
                Some(rest)
            }
        }
        _ => Some(path.to_path_buf()),
    }
}
