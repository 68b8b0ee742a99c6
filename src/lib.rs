//! Photoreel renders an ordered selection of annotated photos into a
//! WebM slideshow with per-frame text overlays.
//!
//! The pipeline is offline and sequential:
//!
//! - Build a [`Selection`] of [`MediaItem`]s (or load a [`Manifest`])
//! - Composite each selected item into a letterboxed frame with its
//!   overlay ([`compose_frame`])
//! - Drive the frames through a [`RenderJob`] into a [`FrameSink`]
//!   ([`render_to_webm`] wires up the ffmpeg sink)
//! - Hand the resulting [`VideoArtifact`] to the distribution helpers
//!   (download, copy-link, share)
#![forbid(unsafe_code)]

pub mod artifact;
pub mod compose;
pub mod distribute;
pub mod encode;
pub mod error;
pub mod manifest;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod selection;

pub use artifact::{DEFAULT_FILE_NAME, MEDIA_TYPE_WEBM, VideoArtifact};
pub use compose::{
    FitRect, FrameRgba, FsImageLoader, ImageLoader, compose_frame, fit_rect, save_frame_png,
};
pub use distribute::{
    Clipboard, DirFileSaver, FileSaver, SHARE_TEXT, SharePlatform, ShareOutcome, SystemClipboard,
    SystemWindowOpener, WindowOpener, copy_link, download, share, share_url,
};
pub use encode::{
    FfmpegSink, FfmpegSinkOpts, FrameSink, InMemorySink, SinkConfig, ensure_parent_dir,
    is_ffmpeg_on_path,
};
pub use error::{PhotoreelError, PhotoreelResult};
pub use manifest::{Manifest, ManifestItem};
pub use model::{
    AspectRatio, Fps, ItemId, MediaItem, OUTPUT_FORMATS, OutputFormat, SECONDS_PER_FRAME_MAX,
    SECONDS_PER_FRAME_MIN, SECONDS_PER_FRAME_STEP, SecondsPerFrame, suggest_label,
};
pub use overlay::{BandPlacement, OverlayLayout};
pub use pipeline::{
    JobState, NoWaitScheduler, RealTimeScheduler, RenderJob, RenderStats, RenderToWebmOpts,
    Scheduler, render_to_webm,
};
pub use selection::Selection;
