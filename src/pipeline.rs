//! The encoder pipeline: an explicit state machine driving composited
//! frames into a [`FrameSink`].

use std::path::PathBuf;
use std::time::Duration;

use crate::{
    artifact::VideoArtifact,
    compose::{ImageLoader, compose_frame},
    encode::{FfmpegSink, FfmpegSinkOpts, FrameSink, SinkConfig},
    error::{PhotoreelError, PhotoreelResult},
    model::{MediaItem, OutputFormat, SecondsPerFrame},
    overlay::OverlayLayout,
    selection::Selection,
};

/// Hold-time seam between frames.
///
/// The offline encoder carries per-frame duration in the container fps,
/// so the default scheduler returns immediately; a real-time scheduler
/// paces a live preview. Tests inject a recording fake to observe holds
/// without timers.
pub trait Scheduler {
    /// Hold the current frame for `interval` before advancing.
    fn after(&mut self, interval: Duration);
}

/// No-op scheduler for offline encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoWaitScheduler;

impl Scheduler for NoWaitScheduler {
    fn after(&mut self, _interval: Duration) {}
}

/// Wall-clock scheduler for paced playback of the frame loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealTimeScheduler;

impl Scheduler for RealTimeScheduler {
    fn after(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Render job lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Recording,
    Draining,
    Complete,
    Failed,
}

/// Counters for one finished (or failed) job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Selected slots the job iterated.
    pub frames_total: u64,
    /// Slots actually composited and pushed to the sink.
    pub frames_rendered: u64,
    /// Slots skipped because their source failed to load.
    pub frames_skipped: u64,
}

/// One render job from `Idle` to artifact (or failure).
///
/// Jobs are single-shot: `run` rejects any state other than `Idle`, so a
/// second start while recording is impossible and a finished job must be
/// replaced, never restarted.
#[derive(Debug)]
pub struct RenderJob {
    format: OutputFormat,
    seconds_per_frame: SecondsPerFrame,
    state: JobState,
    progress: u8,
}

impl RenderJob {
    pub fn new(format: OutputFormat, seconds_per_frame: SecondsPerFrame) -> Self {
        Self {
            format,
            seconds_per_frame,
            state: JobState::Idle,
            progress: 0,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Last reported progress percentage.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    pub fn seconds_per_frame(&self) -> SecondsPerFrame {
        self.seconds_per_frame
    }

    /// Drive the full frame loop over the selected items.
    ///
    /// Per-frame source failures are absorbed: the slot is skipped with a
    /// warning and the job continues. Sink failures abort the job with
    /// exactly one error and leave it `Failed`.
    pub fn run(
        &mut self,
        selection: &Selection,
        layout: &OverlayLayout,
        loader: &dyn ImageLoader,
        sink: &mut dyn FrameSink,
        scheduler: &mut dyn Scheduler,
        mut on_progress: impl FnMut(u8),
    ) -> PhotoreelResult<RenderStats> {
        if self.state != JobState::Idle {
            return Err(PhotoreelError::validation("render job already started"));
        }

        let items = selection.selected_items();
        if items.is_empty() {
            // Capture never begins; the job stays startable-looking but
            // callers get the user-visible error.
            return Err(PhotoreelError::EmptySelection);
        }

        let result = self.run_frames(&items, layout, loader, sink, scheduler, &mut on_progress);
        match &result {
            Ok(_) => self.state = JobState::Complete,
            Err(_) => self.state = JobState::Failed,
        }
        result
    }

    fn run_frames(
        &mut self,
        items: &[&MediaItem],
        layout: &OverlayLayout,
        loader: &dyn ImageLoader,
        sink: &mut dyn FrameSink,
        scheduler: &mut dyn Scheduler,
        on_progress: &mut dyn FnMut(u8),
    ) -> PhotoreelResult<RenderStats> {
        sink.begin(SinkConfig {
            width: self.format.width,
            height: self.format.height,
            fps: self.seconds_per_frame.fps(),
        })?;
        self.state = JobState::Recording;

        let total = items.len() as u64;
        let interval = self.seconds_per_frame.frame_interval();
        let mut stats = RenderStats {
            frames_total: total,
            ..RenderStats::default()
        };

        for (slot, item) in items.iter().enumerate() {
            self.report(percent(slot as u64, total), on_progress);

            match compose_frame(item, &self.format, layout, loader) {
                Ok(frame) => {
                    sink.push_frame(slot as u64, &frame)?;
                    stats.frames_rendered += 1;
                }
                Err(PhotoreelError::FrameLoad(reason)) => {
                    tracing::warn!(source = %item.source, %reason, "skipping slot: frame source failed to load");
                    stats.frames_skipped += 1;
                }
                Err(other) => return Err(other),
            }

            scheduler.after(interval);
        }

        self.state = JobState::Draining;
        sink.end()?;
        self.report(100, on_progress);
        Ok(stats)
    }

    fn report(&mut self, pct: u8, on_progress: &mut dyn FnMut(u8)) {
        self.progress = pct;
        on_progress(pct);
    }
}

fn percent(done: u64, total: u64) -> u8 {
    ((done as f64 / total as f64) * 100.0).round() as u8
}

/// Options for [`render_to_webm`].
#[derive(Clone, Debug)]
pub struct RenderToWebmOpts {
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha for the encoder.
    pub bg_rgb: [u8; 3],
    /// Target video bitrate in bits per second.
    pub bits_per_second: u64,
}

impl Default for RenderToWebmOpts {
    fn default() -> Self {
        let defaults = FfmpegSinkOpts::new(PathBuf::new());
        Self {
            overwrite: defaults.overwrite,
            bg_rgb: defaults.bg_rgb,
            bits_per_second: defaults.bits_per_second,
        }
    }
}

/// Render the selection into a WebM file by invoking the system `ffmpeg`
/// binary, and wrap the result as a [`VideoArtifact`].
pub fn render_to_webm(
    selection: &Selection,
    format: OutputFormat,
    seconds_per_frame: SecondsPerFrame,
    layout: &OverlayLayout,
    loader: &dyn ImageLoader,
    out_path: impl Into<PathBuf>,
    opts: RenderToWebmOpts,
    on_progress: impl FnMut(u8),
) -> PhotoreelResult<(VideoArtifact, RenderStats)> {
    let out_path = out_path.into();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path: out_path.clone(),
        overwrite: opts.overwrite,
        bg_rgb: opts.bg_rgb,
        bits_per_second: opts.bits_per_second,
    });

    let mut job = RenderJob::new(format, seconds_per_frame);
    let stats = job.run(
        selection,
        layout,
        loader,
        &mut sink,
        &mut NoWaitScheduler,
        on_progress,
    )?;

    let artifact = VideoArtifact::from_path(&out_path)?;
    Ok((artifact, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    use crate::compose::{FrameRgba, MemoryImageLoader};
    use crate::encode::InMemorySink;
    use crate::model::Fps;

    fn selection_of(sources: &[&str]) -> Selection {
        let mut sel = Selection::new();
        let ts = chrono::Utc.with_ymd_and_hms(2026, 8, 6, 0, 0, 0).unwrap();
        for (i, src) in sources.iter().enumerate() {
            sel.add(*src, ts, format!("Spot {i}"), i as f64 + 1.0);
        }
        sel
    }

    fn loader_with(sources: &[&str]) -> MemoryImageLoader {
        let mut loader = MemoryImageLoader::new();
        for (i, src) in sources.iter().enumerate() {
            loader.insert(src, 32 + i as u32, 24, [100, 150, 200, 255]);
        }
        loader
    }

    /// Scheduler test double recording every hold.
    #[derive(Default)]
    struct RecordingScheduler {
        holds: Vec<Duration>,
    }

    impl Scheduler for RecordingScheduler {
        fn after(&mut self, interval: Duration) {
            self.holds.push(interval);
        }
    }

    /// Sink that fails at a chosen call.
    #[derive(Default)]
    struct FailingSink {
        fail_on_begin: bool,
        fail_on_end: bool,
        begun: bool,
        pushed: u64,
    }

    impl FrameSink for FailingSink {
        fn begin(&mut self, _cfg: SinkConfig) -> PhotoreelResult<()> {
            if self.fail_on_begin {
                return Err(PhotoreelError::encode_unavailable("no encoder in runtime"));
            }
            self.begun = true;
            Ok(())
        }

        fn push_frame(&mut self, _index: u64, _frame: &FrameRgba) -> PhotoreelResult<()> {
            self.pushed += 1;
            Ok(())
        }

        fn end(&mut self) -> PhotoreelResult<()> {
            if self.fail_on_end {
                return Err(PhotoreelError::encode("muxer exploded"));
            }
            Ok(())
        }
    }

    #[test]
    fn empty_selection_never_begins_capture() {
        let sel = Selection::new();
        let loader = MemoryImageLoader::new();
        let mut sink = InMemorySink::new();
        let mut job = RenderJob::new(
            *OutputFormat::by_key("landscape").unwrap(),
            SecondsPerFrame::default(),
        );

        let err = job
            .run(
                &sel,
                &OverlayLayout::default(),
                &loader,
                &mut sink,
                &mut NoWaitScheduler,
                |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, PhotoreelError::EmptySelection));
        assert!(sink.config().is_none(), "sink must never begin");
        assert_eq!(job.state(), JobState::Idle);
    }

    #[test]
    fn deselected_items_are_excluded() {
        let mut sel = selection_of(&["a", "b", "c"]);
        let b = sel.items()[1].id;
        sel.set_selected(b, false);

        let loader = loader_with(&["a", "b", "c"]);
        let mut sink = InMemorySink::new();
        let mut job = RenderJob::new(
            *OutputFormat::by_key("square").unwrap(),
            SecondsPerFrame::default(),
        );
        let stats = job
            .run(
                &sel,
                &OverlayLayout::default(),
                &loader,
                &mut sink,
                &mut NoWaitScheduler,
                |_| {},
            )
            .unwrap();
        assert_eq!(stats.frames_total, 2);
        assert_eq!(sink.frames().len(), 2);
    }

    #[test]
    fn two_item_scenario_renders_in_order_with_exact_fps() {
        // selection = [A, B], seconds_per_frame = 2 => fps 1/2, 2 frames,
        // final progress exactly 100.
        let mut sel = Selection::new();
        let ts = chrono::Utc.with_ymd_and_hms(2026, 8, 6, 0, 0, 0).unwrap();
        sel.add("a", ts, "Crystal Lake", 5.2);
        sel.add("b", ts, "Silver Pond", 3.0);

        let loader = loader_with(&["a", "b"]);
        let mut sink = InMemorySink::new();
        let mut scheduler = RecordingScheduler::default();
        let mut job = RenderJob::new(
            *OutputFormat::by_key("landscape").unwrap(),
            SecondsPerFrame::new(2.0).unwrap(),
        );

        let mut reported = Vec::new();
        let stats = job
            .run(
                &sel,
                &OverlayLayout::default(),
                &loader,
                &mut sink,
                &mut scheduler,
                |p| reported.push(p),
            )
            .unwrap();

        assert_eq!(job.state(), JobState::Complete);
        assert_eq!(stats.frames_rendered, 2);
        assert_eq!(stats.frames_skipped, 0);
        assert_eq!(reported, vec![0, 50, 100]);
        assert_eq!(job.progress(), 100);

        let slots: Vec<u64> = sink.frames().iter().map(|(i, _)| *i).collect();
        assert_eq!(slots, vec![0, 1]);
        assert_eq!(sink.config().unwrap().fps, Fps { num: 2, den: 4 });
        assert!(sink.ended());

        // Every slot is held once for the frame interval.
        assert_eq!(scheduler.holds, vec![Duration::from_secs(2); 2]);
    }

    #[test]
    fn progress_is_monotone_and_ends_at_100() {
        let sel = selection_of(&["a", "b", "c"]);
        let loader = loader_with(&["a", "b", "c"]);
        let mut sink = InMemorySink::new();
        let mut job = RenderJob::new(
            *OutputFormat::by_key("widescreen").unwrap(),
            SecondsPerFrame::new(0.5).unwrap(),
        );

        let mut reported = Vec::new();
        job.run(
            &sel,
            &OverlayLayout::default(),
            &loader,
            &mut sink,
            &mut NoWaitScheduler,
            |p| reported.push(p),
        )
        .unwrap();

        assert_eq!(reported, vec![0, 33, 67, 100]);
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reported.last().unwrap(), 100);
    }

    #[test]
    fn broken_source_is_skipped_and_job_completes() {
        let sel = selection_of(&["a", "broken", "c"]);
        // "broken" is missing from the loader.
        let loader = loader_with(&["a", "c"]);
        let mut sink = InMemorySink::new();
        let mut scheduler = RecordingScheduler::default();
        let mut job = RenderJob::new(
            *OutputFormat::by_key("square").unwrap(),
            SecondsPerFrame::new(1.0).unwrap(),
        );

        let mut reported = Vec::new();
        let stats = job
            .run(
                &sel,
                &OverlayLayout::default(),
                &loader,
                &mut sink,
                &mut scheduler,
                |p| reported.push(p),
            )
            .unwrap();

        assert_eq!(job.state(), JobState::Complete);
        assert_eq!(stats.frames_total, 3);
        assert_eq!(stats.frames_rendered, 2);
        assert_eq!(stats.frames_skipped, 1);
        // One fewer frame in the output; timing still advanced per slot.
        assert_eq!(sink.frames().len(), 2);
        assert_eq!(scheduler.holds.len(), 3);
        assert_eq!(*reported.last().unwrap(), 100);
    }

    #[test]
    fn missing_encoder_fails_job_with_single_error() {
        let sel = selection_of(&["a"]);
        let loader = loader_with(&["a"]);
        let mut sink = FailingSink {
            fail_on_begin: true,
            ..FailingSink::default()
        };
        let mut job = RenderJob::new(
            *OutputFormat::by_key("square").unwrap(),
            SecondsPerFrame::default(),
        );

        let err = job
            .run(
                &sel,
                &OverlayLayout::default(),
                &loader,
                &mut sink,
                &mut NoWaitScheduler,
                |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, PhotoreelError::EncodeUnavailable(_)));
        assert_eq!(job.state(), JobState::Failed);
        assert!(!sink.begun);
    }

    #[test]
    fn drain_failure_leaves_job_failed_without_100_report() {
        let sel = selection_of(&["a"]);
        let loader = loader_with(&["a"]);
        let mut sink = FailingSink {
            fail_on_end: true,
            ..FailingSink::default()
        };
        let mut job = RenderJob::new(
            *OutputFormat::by_key("square").unwrap(),
            SecondsPerFrame::default(),
        );

        let mut reported = Vec::new();
        let err = job
            .run(
                &sel,
                &OverlayLayout::default(),
                &loader,
                &mut sink,
                &mut NoWaitScheduler,
                |p| reported.push(p),
            )
            .unwrap_err();
        assert!(matches!(err, PhotoreelError::Encode(_)));
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(sink.pushed, 1);
        assert!(!reported.contains(&100), "100 must only be reported on success");
    }

    #[test]
    fn job_cannot_be_started_twice() {
        let sel = selection_of(&["a"]);
        let loader = loader_with(&["a"]);
        let mut sink = InMemorySink::new();
        let mut job = RenderJob::new(
            *OutputFormat::by_key("square").unwrap(),
            SecondsPerFrame::default(),
        );

        job.run(
            &sel,
            &OverlayLayout::default(),
            &loader,
            &mut sink,
            &mut NoWaitScheduler,
            |_| {},
        )
        .unwrap();
        assert_eq!(job.state(), JobState::Complete);

        let err = job
            .run(
                &sel,
                &OverlayLayout::default(),
                &loader,
                &mut sink,
                &mut NoWaitScheduler,
                |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, PhotoreelError::Validation(_)));
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(2, 2), 100);
    }
}
