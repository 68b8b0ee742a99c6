use std::path::{Path, PathBuf};

use crate::error::{PhotoreelError, PhotoreelResult};

/// Default filename used when persisting an artifact for the user.
pub const DEFAULT_FILE_NAME: &str = "slideshow.webm";

/// Media type of produced artifacts.
pub const MEDIA_TYPE_WEBM: &str = "video/webm";

/// One finished render output: the encoded file plus a dereferenceable
/// handle for preview, download and copy-link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoArtifact {
    path: PathBuf,
    byte_len: u64,
}

impl VideoArtifact {
    /// Wrap an existing encoded file. Fails when the file is missing or
    /// empty (a failed job must not expose a partial artifact).
    pub fn from_path(path: impl Into<PathBuf>) -> PhotoreelResult<Self> {
        let path = path.into();
        let meta = std::fs::metadata(&path).map_err(|e| {
            PhotoreelError::validation(format!("artifact '{}' not readable: {e}", path.display()))
        })?;
        if !meta.is_file() {
            return Err(PhotoreelError::validation(format!(
                "artifact '{}' is not a file",
                path.display()
            )));
        }
        if meta.len() == 0 {
            return Err(PhotoreelError::validation(format!(
                "artifact '{}' is empty",
                path.display()
            )));
        }
        Ok(Self {
            path,
            byte_len: meta.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn media_type(&self) -> &'static str {
        MEDIA_TYPE_WEBM
    }

    /// Dereferenceable `file://` URL naming this artifact.
    pub fn handle(&self) -> String {
        let abs = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());
        let mut url = String::from("file://");
        for part in abs.components() {
            use std::path::Component;
            match part {
                Component::RootDir => {}
                Component::Prefix(p) => {
                    url.push('/');
                    url.push_str(&p.as_os_str().to_string_lossy().replace('\\', "/"));
                    continue;
                }
                other => {
                    url.push('/');
                    url.push_str(&other.as_os_str().to_string_lossy());
                }
            }
        }
        url
    }
}
