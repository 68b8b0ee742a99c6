pub type PhotoreelResult<T> = Result<T, PhotoreelError>;

#[derive(thiserror::Error, Debug)]
pub enum PhotoreelError {
    #[error("validation error: {0}")]
    Validation(String),

    /// Starting a render job with zero selected items.
    #[error("no items selected for rendering")]
    EmptySelection,

    /// A single frame source failed to load or decode. The pipeline
    /// absorbs this per-frame (the slot is skipped); it only aborts when
    /// returned from outside the frame loop.
    #[error("frame load error: {0}")]
    FrameLoad(String),

    /// The encoding mechanism is missing from the runtime (no `ffmpeg`
    /// on PATH). Job-level: no artifact is produced.
    #[error("encoder unavailable: {0}")]
    EncodeUnavailable(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("clipboard denied: {0}")]
    ClipboardDenied(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PhotoreelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn frame_load(msg: impl Into<String>) -> Self {
        Self::FrameLoad(msg.into())
    }

    pub fn encode_unavailable(msg: impl Into<String>) -> Self {
        Self::EncodeUnavailable(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn clipboard_denied(msg: impl Into<String>) -> Self {
        Self::ClipboardDenied(msg.into())
    }
}
