use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{PhotoreelError, PhotoreelResult};

/// Unique, creation-ordered identifier of a [`MediaItem`] within one
/// [`Selection`](crate::selection::Selection).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ItemId(pub u64);

/// One user-selected photo plus the display metadata drawn on its frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaItem {
    pub id: ItemId,
    /// Opaque source locator. The filesystem loader treats it as a path,
    /// absolute or relative to its root.
    pub source: String,
    pub timestamp: DateTime<Utc>,
    /// Location name drawn on the overlay's first line.
    pub label: String,
    /// Numeric measurement drawn on the overlay, value only (unit comes
    /// from the overlay layout).
    pub measurement: f64,
    pub selected: bool,
}

impl MediaItem {
    /// Timestamp formatted the way the overlay shows it, e.g. `Aug 6, 2026`.
    pub fn formatted_date(&self) -> String {
        self.timestamp.format("%b %-d, %Y").to_string()
    }
}

/// Aspect-ratio tag of an [`OutputFormat`] preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    Square,
    Landscape,
    Portrait,
    Widescreen,
}

impl AspectRatio {
    pub fn key(self) -> &'static str {
        match self {
            AspectRatio::Square => "square",
            AspectRatio::Landscape => "landscape",
            AspectRatio::Portrait => "portrait",
            AspectRatio::Widescreen => "widescreen",
        }
    }
}

/// Named output preset with explicit pixel dimensions.
///
/// All presets keep both dimensions even (yuv420p encoding requirement).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputFormat {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub aspect: AspectRatio,
    pub platform_hint: &'static str,
}

/// The fixed preset catalog.
pub const OUTPUT_FORMATS: [OutputFormat; 4] = [
    OutputFormat {
        name: "Square (1:1)",
        width: 640,
        height: 640,
        aspect: AspectRatio::Square,
        platform_hint: "Instagram, Facebook",
    },
    OutputFormat {
        name: "Landscape (4:3)",
        width: 640,
        height: 480,
        aspect: AspectRatio::Landscape,
        platform_hint: "Facebook, Twitter",
    },
    OutputFormat {
        name: "Portrait (9:16)",
        width: 540,
        height: 960,
        aspect: AspectRatio::Portrait,
        platform_hint: "Instagram Stories, TikTok",
    },
    OutputFormat {
        name: "Widescreen (16:9)",
        width: 960,
        height: 540,
        aspect: AspectRatio::Widescreen,
        platform_hint: "YouTube, Twitter",
    },
];

impl OutputFormat {
    pub fn catalog() -> &'static [OutputFormat] {
        &OUTPUT_FORMATS
    }

    pub fn key(&self) -> &'static str {
        self.aspect.key()
    }

    /// Look up a preset by its key (`square`, `landscape`, `portrait`,
    /// `widescreen`).
    pub fn by_key(key: &str) -> Option<&'static OutputFormat> {
        OUTPUT_FORMATS.iter().find(|f| f.key() == key)
    }

    pub fn default_format() -> &'static OutputFormat {
        &OUTPUT_FORMATS[1]
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    /// Must be non-zero.
    pub den: u32,
}

impl Fps {
    pub fn new(num: u32, den: u32) -> PhotoreelResult<Self> {
        if num == 0 {
            return Err(PhotoreelError::validation("Fps num must be > 0"));
        }
        if den == 0 {
            return Err(PhotoreelError::validation("Fps den must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }
}

/// Minimum hold time per photo, in seconds.
pub const SECONDS_PER_FRAME_MIN: f64 = 0.5;
/// Maximum hold time per photo, in seconds.
pub const SECONDS_PER_FRAME_MAX: f64 = 5.0;
/// Slider step for the hold time.
pub const SECONDS_PER_FRAME_STEP: f64 = 0.5;

/// Validated seconds-per-photo control (0.5–5.0 in steps of 0.5).
///
/// The output fps is `1 / seconds_per_frame`, carried exactly as the
/// rational `2 / (2 * seconds_per_frame)` so that half-second steps never
/// lose precision on the way to the encoder.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SecondsPerFrame(f64);

impl SecondsPerFrame {
    pub fn new(secs: f64) -> PhotoreelResult<Self> {
        if !secs.is_finite()
            || secs < SECONDS_PER_FRAME_MIN
            || secs > SECONDS_PER_FRAME_MAX
        {
            return Err(PhotoreelError::validation(format!(
                "seconds per frame must be within {SECONDS_PER_FRAME_MIN}..={SECONDS_PER_FRAME_MAX}, got {secs}"
            )));
        }
        let steps = secs / SECONDS_PER_FRAME_STEP;
        if (steps - steps.round()).abs() > 1e-9 {
            return Err(PhotoreelError::validation(format!(
                "seconds per frame must be a multiple of {SECONDS_PER_FRAME_STEP}, got {secs}"
            )));
        }
        Ok(Self(secs))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Exact rational fps for this hold time.
    pub fn fps(self) -> Fps {
        Fps {
            num: 2,
            den: (self.0 * 2.0).round() as u32,
        }
    }

    /// Hold time per frame as a [`Duration`].
    pub fn frame_interval(self) -> Duration {
        Duration::from_secs_f64(self.0)
    }

    /// Total output duration for `count` rendered slots, in seconds.
    pub fn duration_secs(self, count: usize) -> f64 {
        self.0 * count as f64
    }
}

impl Default for SecondsPerFrame {
    fn default() -> Self {
        Self(2.0)
    }
}

impl TryFrom<f64> for SecondsPerFrame {
    type Error = PhotoreelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SecondsPerFrame> for f64 {
    fn from(value: SecondsPerFrame) -> Self {
        value.0
    }
}

const LABEL_PREFIXES: [&str; 10] = [
    "Crystal", "Blue", "Silver", "Golden", "Deep", "Hidden", "Emerald", "Tranquil", "Misty",
    "Shadow",
];
const LABEL_SUFFIXES: [&str; 7] = ["Lake", "Pond", "Reservoir", "Waters", "Bay", "Cove", "Lagoon"];

/// Deterministic placeholder label for an unlabeled item.
pub fn suggest_label(seed: u64) -> String {
    let prefix = LABEL_PREFIXES[(seed % LABEL_PREFIXES.len() as u64) as usize];
    let suffix =
        LABEL_SUFFIXES[((seed / LABEL_PREFIXES.len() as u64) % LABEL_SUFFIXES.len() as u64) as usize];
    format!("{prefix} {suffix}")
}
