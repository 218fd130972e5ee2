//! Command line interface

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Parser;

use crate::config::Acquisition;

/// Search the ASF catalog for Sentinel-1 products around a point and
/// download the matches into `<working-dir>/<dataset>/<GUID>/`.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Acquisition settings file (TOML); other flags override its values
    #[clap(short, long)]
    pub config: Option<PathBuf>,
    /// Center latitude in degrees
    #[clap(long, allow_hyphen_values = true)]
    pub latitude: Option<f64>,
    /// Center longitude in degrees
    #[clap(long, allow_hyphen_values = true)]
    pub longitude: Option<f64>,
    /// Dataset to query, e.g. SENTINEL-1
    #[clap(long)]
    pub dataset: Option<String>,
    /// Start date, YYYY-MM-DD
    #[clap(long)]
    pub start: Option<NaiveDate>,
    /// End date, YYYY-MM-DD
    #[clap(long)]
    pub end: Option<NaiveDate>,
    /// Root directory for downloaded products
    #[clap(short, long)]
    pub working_dir: Option<PathBuf>,
    /// Treat archives as already expanded; download only
    #[clap(long)]
    pub skip_unpack: bool,
    /// Polarization filter, e.g. VV+VH
    #[clap(long)]
    pub polarization: Option<String>,
    /// Beam mode filter, e.g. IW
    #[clap(long)]
    pub beam_mode: Option<String>,
    /// Processing level filter, e.g. SLC
    #[clap(long)]
    pub processing_level: Option<String>,
    /// Archive username
    #[clap(long)]
    pub username: Option<String>,
    /// Archive password
    #[clap(long)]
    pub password: Option<String>,
    /// Level of logging output
    #[clap(short, long, default_value_t = log::Level::Info)]
    pub verbosity: log::Level,
}

impl Args {
    /// Resolve the final acquisition settings. With `--config`, flags
    /// override the file field by field; without it, the positional filters
    /// are required on the command line.
    pub fn resolve(self: &Self) -> Result<Acquisition> {
        let mut acquisition = match &self.config {
            Some(path) => Acquisition::read(path)?,
            None => Acquisition {
                dataset: self.require("--dataset", &self.dataset)?,
                latitude: self.require("--latitude", &self.latitude)?,
                longitude: self.require("--longitude", &self.longitude)?,
                start: self.require("--start", &self.start)?,
                end: self.require("--end", &self.end)?,
                working_dir: PathBuf::from("."),
                skip_unpack: false,
                polarization: None,
                beam_mode: None,
                processing_level: None,
                username: None,
                password: None,
            },
        };

        if let Some(dataset) = &self.dataset {
            acquisition.dataset = dataset.clone();
        }
        if let Some(latitude) = self.latitude {
            acquisition.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            acquisition.longitude = longitude;
        }
        if let Some(start) = self.start {
            acquisition.start = start;
        }
        if let Some(end) = self.end {
            acquisition.end = end;
        }
        if let Some(working_dir) = &self.working_dir {
            acquisition.working_dir = working_dir.clone();
        }
        if self.skip_unpack {
            acquisition.skip_unpack = true;
        }
        if let Some(polarization) = &self.polarization {
            acquisition.polarization = Some(polarization.clone());
        }
        if let Some(beam_mode) = &self.beam_mode {
            acquisition.beam_mode = Some(beam_mode.clone());
        }
        if let Some(level) = &self.processing_level {
            acquisition.processing_level = Some(level.clone());
        }
        if let Some(username) = &self.username {
            acquisition.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            acquisition.password = Some(password.clone());
        }

        Ok(acquisition)
    }

    fn require<T: Clone>(self: &Self, flag: &str, value: &Option<T>) -> Result<T> {
        match value {
            Some(v) => Ok(v.clone()),
            None => bail!("{} is required when no config file is given", flag),
        }
    }
}
