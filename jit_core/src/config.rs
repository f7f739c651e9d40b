//! Repository configuration (`.git/config`).

use crate::error::{Error, Result};
use flate2::Compression;
use std::fs;
use std::path::Path;

/// The only repository format this crate reads and writes.
pub const FORMAT_VERSION: u32 = 0;

/// Settings read from the repository's `config` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// `core.repositoryformatversion`.
    pub format_version: u32,
    /// zlib level for new objects (`core.compression`, -1 for the default).
    pub compression: Compression,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            compression: Compression::default(),
        }
    }
}

impl Config {
    /// Read and parse the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::invalid_repository(path, "config file not found"));
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|reason| Error::invalid_repository(path, reason))
    }

    /// Parse config text.
    ///
    /// Keys are matched by name regardless of section; blank lines, `#`/`;`
    /// comments and `[section]` headers are skipped.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let mut version = None;
        let mut compression = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(['#', ';', '[']) {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "repositoryformatversion" => version = Some(value.trim()),
                    "compression" => compression = Some(value.trim()),
                    _ => {}
                }
            }
        }

        let format_version = match version {
            Some(v) => v
                .parse::<u32>()
                .map_err(|_| format!("Invalid repositoryformatversion: {:?}", v))?,
            None => return Err("Missing repositoryformatversion in config".to_string()),
        };
        if format_version != FORMAT_VERSION {
            return Err(format!(
                "Unsupported repositoryformatversion: {} (expected {})",
                format_version, FORMAT_VERSION
            ));
        }

        let compression = match compression {
            None | Some("-1") => Compression::default(),
            Some(level) => match level.parse::<u32>() {
                Ok(level @ 0..=9) => Compression::new(level),
                _ => return Err(format!("Invalid compression level: {:?}", level)),
            },
        };

        Ok(Self {
            format_version,
            compression,
        })
    }

    /// Render as config file text.
    pub fn to_file_string(&self) -> String {
        let compression = if self.compression == Compression::default() {
            "-1".to_string()
        } else {
            self.compression.level().to_string()
        };
        format!(
            "[core]\n\trepositoryformatversion = {}\n\tcompression = {}\n",
            self.format_version, compression
        )
    }
}
