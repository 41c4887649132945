//! Ad source backed by JSON dumps on disk.
//!
//! Layout of the directory:
//!
//! ```text
//! startd.json            array of startd slot ads
//! any.json               array of ads of any type (optional)
//! schedds/<name>.json    array of job ads, one file per schedd
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::query::{AdType, Query};
use crate::records::Ad;
use crate::source::{AdSource, ScheddLocation};

const STARTD_FILE: &str = "startd.json";
const ANY_FILE: &str = "any.json";
const SCHEDD_DIR: &str = "schedds";

/// Reads ads from a directory of JSON dumps.
///
/// Files are re-read on every call, so a dump refreshed between polls is
/// picked up without restarting.
#[derive(Debug, Clone)]
pub struct DirAdSource {
    root: PathBuf,
}

impl DirAdSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the directory ads are read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_ads(path: &Path) -> Result<Vec<Ad>> {
        debug!(path = %path.display(), "reading ads");
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| MetricsError::MalformedAd {
            reason: format!("{}: {e}", path.display()),
        })
    }

    fn schedd_path(&self, name: &str) -> PathBuf {
        self.root.join(SCHEDD_DIR).join(format!("{name}.json"))
    }
}

impl AdSource for DirAdSource {
    fn query(&self, pool: &str, query: &Query) -> Result<Vec<Ad>> {
        let ads = match query.ad_type {
            AdType::Startd => Self::read_ads(&self.root.join(STARTD_FILE))?,
            AdType::Any => {
                let any = self.root.join(ANY_FILE);
                if any.exists() {
                    Self::read_ads(&any)?
                } else {
                    Self::read_ads(&self.root.join(STARTD_FILE))?
                }
            }
            AdType::Schedd => self
                .locate_schedds(pool)?
                .into_iter()
                .map(|location| {
                    let mut ad = Ad::new();
                    ad.insert("MyType".to_string(), "Scheduler".into());
                    ad.insert("Name".to_string(), location.name.into());
                    ad
                })
                .collect(),
        };
        Ok(query.apply(&ads))
    }

    fn locate_schedds(&self, _pool: &str) -> Result<Vec<ScheddLocation>> {
        let dir = self.root.join(SCHEDD_DIR);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut schedds = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    schedds.push(
                        ScheddLocation::new(name).with_address(path.display().to_string()),
                    );
                }
            }
        }
        schedds.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(schedds)
    }

    fn query_schedd(&self, schedd: &ScheddLocation, query: &Query) -> Result<Vec<Ad>> {
        let ads = Self::read_ads(&self.schedd_path(&schedd.name))?;
        Ok(query.apply(&ads))
    }

    fn name(&self) -> &'static str {
        "DirAdSource"
    }
}
