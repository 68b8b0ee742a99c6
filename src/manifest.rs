use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;
use chrono::{DateTime, Utc};

use crate::{
    error::{PhotoreelError, PhotoreelResult},
    model::{OutputFormat, SecondsPerFrame, suggest_label},
    overlay::OverlayLayout,
    selection::Selection,
};

/// JSON input document for the CLI: render settings plus the ordered
/// item list.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub seconds_per_frame: SecondsPerFrame,
    /// Output preset key (`square`, `landscape`, `portrait`, `widescreen`).
    #[serde(default = "default_format_key")]
    pub format: String,
    #[serde(default)]
    pub overlay: OverlayLayout,
    pub items: Vec<ManifestItem>,
}

fn default_format_key() -> String {
    OutputFormat::default_format().key().to_string()
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ManifestItem {
    pub source: String,
    /// Omitted labels get a deterministic suggested one.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub measurement: f64,
    /// Omitted timestamps default to the time of loading.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub selected: bool,
}

fn default_true() -> bool {
    true
}

impl Manifest {
    pub fn from_path(path: &Path) -> PhotoreelResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open manifest '{}'", path.display()))?;
        let manifest: Manifest = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| PhotoreelError::validation(format!("parse manifest JSON: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_str(json: &str) -> PhotoreelResult<Self> {
        let manifest: Manifest = serde_json::from_str(json)
            .map_err(|e| PhotoreelError::validation(format!("parse manifest JSON: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> PhotoreelResult<()> {
        self.resolved_format()?;
        self.overlay.validate()?;
        for (i, item) in self.items.iter().enumerate() {
            if item.source.trim().is_empty() {
                return Err(PhotoreelError::validation(format!(
                    "item {i} has an empty source"
                )));
            }
            if !item.measurement.is_finite() {
                return Err(PhotoreelError::validation(format!(
                    "item {i} has a non-finite measurement"
                )));
            }
        }
        Ok(())
    }

    pub fn resolved_format(&self) -> PhotoreelResult<&'static OutputFormat> {
        OutputFormat::by_key(&self.format).ok_or_else(|| {
            PhotoreelError::validation(format!(
                "unknown output format '{}', expected one of: {}",
                self.format,
                OutputFormat::catalog()
                    .iter()
                    .map(|f| f.key())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }

    /// Materialize the item list as an ordered [`Selection`].
    pub fn build_selection(&self) -> Selection {
        let mut selection = Selection::new();
        for (i, item) in self.items.iter().enumerate() {
            let label = item
                .label
                .clone()
                .unwrap_or_else(|| suggest_label(i as u64));
            let timestamp = item.timestamp.unwrap_or_else(Utc::now);
            let id = selection.add(item.source.clone(), timestamp, label, item.measurement);
            if !item.selected {
                selection.set_selected(id, false);
            }
        }
        selection
    }
}
