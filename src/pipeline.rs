//! Frame pipeline driver.
//!
//! Starts one streaming session per attached device, then on every
//! iteration polls each session without blocking, aligns new frame sets to
//! the configured stream, runs every frame through the filter chain and
//! keeps the latest result per stream for the display.

use std::collections::btree_map;
use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::traits::{
    CameraSubsystem, DisplaySurface, Frame, FrameAligner, FrameFilter, FrameSet, Options,
    StreamId, StreamingSession,
};

/// Latest filtered frame per stream identity.
///
/// Entries are replaced, never removed, so a stream that produced nothing
/// on an iteration keeps showing its previous frame.
#[derive(Debug)]
pub struct RenderFrames<F> {
    frames: BTreeMap<StreamId, F>,
}

impl<F> Default for RenderFrames<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> RenderFrames<F> {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
        }
    }

    /// Store `frame` for `id`, returning the frame it replaced.
    pub fn upsert(&mut self, id: StreamId, frame: F) -> Option<F> {
        self.frames.insert(id, frame)
    }

    /// Frame currently held for `id`.
    pub fn get(&self, id: StreamId) -> Option<&F> {
        self.frames.get(&id)
    }

    /// Number of distinct streams seen so far.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no stream has produced a frame yet.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames in ascending stream id order.
    pub fn iter(&self) -> btree_map::Iter<'_, StreamId, F> {
        self.frames.iter()
    }

    /// Stream ids in ascending order.
    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.frames.keys().copied().collect()
    }
}

impl<'a, F> IntoIterator for &'a RenderFrames<F> {
    type Item = (&'a StreamId, &'a F);
    type IntoIter = btree_map::Iter<'a, StreamId, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ordered filter chain applied to every frame.
struct FilterChain<T> {
    stages: Vec<T>,
}

impl<T> FilterChain<T> {
    fn apply<F>(&mut self, frame: F) -> Result<F>
    where
        F: Frame,
        T: FrameFilter<F>,
    {
        self.stages
            .iter_mut()
            .try_fold(frame, |frame, stage| stage.process(frame))
    }
}

/// A running session together with the serial it is pinned to.
struct Session<S> {
    serial: String,
    session: S,
}

/// Drives every device's session through alignment and the filter chain.
pub struct FramePipeline<C: CameraSubsystem> {
    // Fields drop in declaration order: frames go before the sessions that produced them.
    render_frames: RenderFrames<C::Frame>,
    sessions: Vec<Session<C::Session>>,
    aligner: C::Aligner,
    filters: FilterChain<C::Filter>,
}

impl<C: CameraSubsystem> FramePipeline<C> {
    /// Build the processing blocks, then start one session per attached device.
    ///
    /// No attached device is not an error: the pipeline runs with no sessions.
    pub fn start(camera: &C, config: &PipelineConfig) -> Result<Self> {
        let aligner = camera.create_aligner(config.align_to)?;

        let mut stages = Vec::new();
        for stage in config.filters.stages() {
            let mut filter = camera.create_filter(stage.kind)?;
            for (option, value) in stage.options {
                filter.set_option(option, value)?;
            }
            stages.push(filter);
        }

        let devices = camera.query_devices()?;
        if devices.is_empty() {
            warn!("No devices attached");
        }

        let mut sessions = Vec::with_capacity(devices.len());
        for device in devices {
            let session = camera.start_session(&device.serial, &config.streams)?;
            info!(name = %device.name, serial = %device.serial, "Started streaming session");
            sessions.push(Session {
                serial: device.serial,
                session,
            });
        }

        Ok(Self {
            render_frames: RenderFrames::new(),
            sessions,
            aligner,
            filters: FilterChain { stages },
        })
    }

    /// Run one iteration: poll, align, split, filter and store.
    ///
    /// Returns the number of frames filtered.
    pub fn step(&mut self) -> Result<usize> {
        let mut new_frames = Vec::new();
        for entry in &mut self.sessions {
            let Some(frames) = entry.session.poll_for_frames()? else {
                continue;
            };
            let aligned = self.aligner.process(frames)?;
            let frames = aligned.frames()?;
            debug!(serial = %entry.serial, count = frames.len(), "New frame set");
            new_frames.extend(frames);
        }

        let count = new_frames.len();
        for frame in new_frames {
            let id = frame.profile()?.unique_id;
            let filtered = self.filters.apply(frame)?;
            self.render_frames.upsert(id, filtered);
        }

        Ok(count)
    }

    /// Step and render until the display closes. Any error ends the loop.
    pub fn run<D: DisplaySurface<C::Frame>>(&mut self, display: &mut D) -> Result<()> {
        while display.is_open() {
            self.step()?;
            display.show(&self.render_frames)?;
        }
        info!("Display closed");
        Ok(())
    }

    /// Latest filtered frame per stream.
    pub const fn render_frames(&self) -> &RenderFrames<C::Frame> {
        &self.render_frames
    }

    /// Number of running sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Serials of the devices with a running session, in start order.
    pub fn serials(&self) -> Vec<&str> {
        self.sessions
            .iter()
            .map(|entry| entry.serial.as_str())
            .collect()
    }
}
