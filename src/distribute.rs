//! Distribution helpers: download, copy-link and share, behind injected
//! capability traits so every platform effect is mockable.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::artifact::{DEFAULT_FILE_NAME, VideoArtifact};
use crate::error::{PhotoreelError, PhotoreelResult};

/// Prefilled message attached to URL-based shares.
pub const SHARE_TEXT: &str = "Check out my new slideshow!";

/// Clipboard capability.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> PhotoreelResult<()>;
}

/// System clipboard backed by arboard.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> PhotoreelResult<()> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| PhotoreelError::clipboard_denied(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| PhotoreelError::clipboard_denied(e.to_string()))
    }
}

/// File persistence capability.
pub trait FileSaver {
    /// Persist `src` under `file_name`, returning the destination path.
    fn save(&mut self, src: &Path, file_name: &str) -> PhotoreelResult<PathBuf>;
}

/// Saver that copies artifacts into a fixed directory.
#[derive(Debug)]
pub struct DirFileSaver {
    dir: PathBuf,
}

impl DirFileSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSaver for DirFileSaver {
    fn save(&mut self, src: &Path, file_name: &str) -> PhotoreelResult<PathBuf> {
        use anyhow::Context as _;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create download dir '{}'", self.dir.display()))?;
        let dest = self.dir.join(file_name);
        std::fs::copy(src, &dest)
            .with_context(|| format!("copy '{}' to '{}'", src.display(), dest.display()))?;
        Ok(dest)
    }
}

/// Window/URL-opening capability.
pub trait WindowOpener {
    fn open(&mut self, url: &str) -> PhotoreelResult<()>;
}

/// Opens URLs through the platform launcher.
#[derive(Debug, Default)]
pub struct SystemWindowOpener;

impl WindowOpener for SystemWindowOpener {
    fn open(&mut self, url: &str) -> PhotoreelResult<()> {
        let mut cmd = if cfg!(target_os = "macos") {
            let mut c = Command::new("open");
            c.arg(url);
            c
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", "", url]);
            c
        } else {
            let mut c = Command::new("xdg-open");
            c.arg(url);
            c
        };

        cmd.spawn()
            .map_err(|e| PhotoreelError::validation(format!("failed to open '{url}': {e}")))?;
        Ok(())
    }
}

/// Sharing targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SharePlatform {
    Facebook,
    Twitter,
    Instagram,
    Youtube,
}

impl SharePlatform {
    pub fn all() -> [SharePlatform; 4] {
        [
            SharePlatform::Facebook,
            SharePlatform::Twitter,
            SharePlatform::Instagram,
            SharePlatform::Youtube,
        ]
    }

    pub fn key(self) -> &'static str {
        match self {
            SharePlatform::Facebook => "facebook",
            SharePlatform::Twitter => "twitter",
            SharePlatform::Instagram => "instagram",
            SharePlatform::Youtube => "youtube",
        }
    }
}

impl std::fmt::Display for SharePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SharePlatform {
    type Err = PhotoreelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "facebook" => Ok(SharePlatform::Facebook),
            "twitter" => Ok(SharePlatform::Twitter),
            "instagram" => Ok(SharePlatform::Instagram),
            "youtube" => Ok(SharePlatform::Youtube),
            other => Err(PhotoreelError::validation(format!(
                "unknown share platform '{other}'"
            ))),
        }
    }
}

/// What `share` did for the chosen platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShareOutcome {
    /// A prefilled share URL was opened.
    Opened { url: String },
    /// The platform has no URL-based sharing; the artifact must be saved
    /// and uploaded manually. Informational, not an error.
    ManualUpload { instructions: &'static str },
}

/// Prefilled share URL for URL-shareable platforms, `None` for platforms
/// that require a manual upload.
pub fn share_url(platform: SharePlatform, handle: &str) -> Option<String> {
    let enc = |s: &str| utf8_percent_encode(s, NON_ALPHANUMERIC).to_string();
    match platform {
        SharePlatform::Facebook => Some(format!(
            "https://www.facebook.com/sharer/sharer.php?u={}",
            enc(handle)
        )),
        SharePlatform::Twitter => Some(format!(
            "https://twitter.com/intent/tweet?url={}&text={}",
            enc(handle),
            enc(SHARE_TEXT)
        )),
        SharePlatform::Instagram | SharePlatform::Youtube => None,
    }
}

fn manual_instructions(platform: SharePlatform) -> &'static str {
    match platform {
        SharePlatform::Youtube => {
            "To share on YouTube: save the video first, then upload it through YouTube Studio"
        }
        SharePlatform::Instagram => {
            "To share on Instagram: save the video first, then upload it through the Instagram app"
        }
        SharePlatform::Facebook | SharePlatform::Twitter => "",
    }
}

/// Dispatch a share for `handle`: open a prefilled URL where the platform
/// supports it, otherwise return the manual-upload instructions.
pub fn share(
    platform: SharePlatform,
    handle: &str,
    opener: &mut dyn WindowOpener,
) -> PhotoreelResult<ShareOutcome> {
    match share_url(platform, handle) {
        Some(url) => {
            opener.open(&url)?;
            Ok(ShareOutcome::Opened { url })
        }
        None => Ok(ShareOutcome::ManualUpload {
            instructions: manual_instructions(platform),
        }),
    }
}

/// Persist the artifact under `file_name` (default `slideshow.webm`).
pub fn download(
    artifact: &VideoArtifact,
    saver: &mut dyn FileSaver,
    file_name: Option<&str>,
) -> PhotoreelResult<PathBuf> {
    saver.save(artifact.path(), file_name.unwrap_or(DEFAULT_FILE_NAME))
}

/// Copy the artifact handle to the clipboard. Returns `false` on denial
/// instead of propagating the error.
pub fn copy_link(clipboard: &mut dyn Clipboard, handle: &str) -> bool {
    match clipboard.set_text(handle) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "failed to copy artifact link");
            false
        }
    }
}
