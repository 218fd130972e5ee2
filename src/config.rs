//! Resolved acquisition settings: a TOML file, command-line flags, or both
//! (flags win field by field).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use toml;

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Acquisition {
    pub dataset: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    #[serde(default)]
    pub skip_unpack: bool,
    #[serde(default)]
    pub polarization: Option<String>,
    #[serde(default)]
    pub beam_mode: Option<String>,
    #[serde(default)]
    pub processing_level: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Acquisition {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read {}", path.as_ref().display()))?;
        let acquisition: Self = toml::from_str(&content)?;
        Ok(acquisition)
    }

    #[allow(dead_code)]
    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
