//! Mock camera subsystem and display for testing without hardware.
//!
//! Every call is appended to a shared log so tests can check ordering.
//! Sessions replay a script of polls; an exhausted script polls empty.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::error::{CameraError, Result};
use crate::pipeline::RenderFrames;
use crate::traits::{
    CameraSubsystem, DeviceInfo, DisplaySurface, FilterKind, FilterOption, Frame, FrameAligner,
    FrameFilter, FrameImage, FrameSet, Options, PixelFormat, StreamId, StreamKind, StreamProfile,
    StreamRequest, StreamingSession,
};

const WIDTH: u32 = 4;
const HEIGHT: u32 = 2;

/// Recorded interaction with the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// `query_devices`.
    QueryDevices,
    /// `start_session`.
    StartSession {
        /// Device serial.
        serial: String,
        /// Requested streams.
        streams: Vec<StreamRequest>,
    },
    /// `create_aligner`.
    CreateAligner(StreamKind),
    /// `create_filter`.
    CreateFilter(FilterKind),
    /// `set_option` on a filter.
    SetOption {
        /// Filter the option was set on.
        kind: FilterKind,
        /// Option.
        option: FilterOption,
        /// Value.
        value: f32,
    },
    /// `poll_for_frames` on the session with this serial.
    Poll(String),
    /// Alignment of a frame set from this serial.
    Align(String),
    /// Splitting of a frame set from this serial.
    Split(String),
    /// A filter processed a frame of this stream.
    Filter {
        /// Filter.
        kind: FilterKind,
        /// Stream of the processed frame.
        stream: StreamId,
    },
    /// A frame handed out by a split was dropped.
    ReleaseFrame(StreamId),
    /// The session with this serial was dropped.
    StopSession(String),
}

/// Processing stages a frame went through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Aligner.
    Align,
    /// Threshold filter.
    Threshold,
    /// Disparity transform.
    Disparity,
    /// Spatial filter.
    Spatial,
    /// Temporal filter.
    Temporal,
    /// Colorizer.
    Colorizer,
}

impl From<FilterKind> for Stage {
    fn from(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Threshold => Self::Threshold,
            FilterKind::DisparityTransform { .. } => Self::Disparity,
            FilterKind::Spatial => Self::Spatial,
            FilterKind::Temporal => Self::Temporal,
            FilterKind::Colorizer => Self::Colorizer,
        }
    }
}

/// One scripted poll result.
#[derive(Debug)]
pub enum Poll {
    /// A new frame set with these frames.
    Frames(Vec<MockFrame>),
    /// Nothing new.
    Empty,
    /// The poll fails.
    Fail(CameraError),
}

/// Frame carrying its stream identity, a sequence number and the stages it went through.
#[derive(Debug, Clone, PartialEq)]
pub struct MockFrame {
    /// Stream identity.
    pub id: StreamId,
    /// Stream kind.
    pub stream: StreamKind,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Position in its stream.
    pub seq: u32,
    /// Stages applied so far.
    pub trace: Vec<Stage>,
    /// Pixel bytes.
    pub data: Vec<u8>,
    /// Log that records this frame's release; set on split.
    release: Option<Log>,
}

impl MockFrame {
    /// 4x2 RGB8 color frame.
    #[must_use]
    pub fn color(id: StreamId, seq: u32) -> Self {
        Self {
            id,
            stream: StreamKind::Color,
            format: PixelFormat::Rgb8,
            seq,
            trace: Vec::new(),
            data: vec![200; (WIDTH * HEIGHT * 3) as usize],
            release: None,
        }
    }

    /// 4x2 Z16 depth frame.
    #[must_use]
    pub fn depth(id: StreamId, seq: u32) -> Self {
        Self {
            id,
            stream: StreamKind::Depth,
            format: PixelFormat::Z16,
            seq,
            trace: Vec::new(),
            data: vec![0x10; (WIDTH * HEIGHT * 2) as usize],
            release: None,
        }
    }
}

impl Frame for MockFrame {
    fn profile(&self) -> Result<StreamProfile> {
        Ok(StreamProfile {
            stream: self.stream,
            format: self.format,
            index: 0,
            unique_id: self.id,
            framerate: 30,
        })
    }

    fn image(&self) -> Result<FrameImage<'_>> {
        let bpp = self
            .format
            .bytes_per_pixel()
            .ok_or_else(|| CameraError::UnsupportedFormat(self.format.to_string()))?;
        Ok(FrameImage {
            width: WIDTH,
            height: HEIGHT,
            stride: WIDTH * bpp,
            format: self.format,
            data: &self.data,
        })
    }
}

impl Drop for MockFrame {
    fn drop(&mut self) {
        if let Some(log) = &self.release {
            log.borrow_mut().push(Call::ReleaseFrame(self.id));
        }
    }
}

type Log = Rc<RefCell<Vec<Call>>>;

/// Frame set from one mock session.
pub struct MockFrameSet {
    serial: String,
    frames: Vec<MockFrame>,
    log: Log,
}

impl FrameSet for MockFrameSet {
    type Frame = MockFrame;

    fn frames(&self) -> Result<Vec<MockFrame>> {
        self.log.borrow_mut().push(Call::Split(self.serial.clone()));
        Ok(self
            .frames
            .iter()
            .map(|frame| {
                let mut frame = frame.clone();
                frame.release = Some(Rc::clone(&self.log));
                frame
            })
            .collect())
    }
}

/// Session replaying a poll script.
pub struct MockSession {
    serial: String,
    script: VecDeque<Poll>,
    log: Log,
}

impl StreamingSession for MockSession {
    type FrameSet = MockFrameSet;

    fn poll_for_frames(&mut self) -> Result<Option<MockFrameSet>> {
        self.log.borrow_mut().push(Call::Poll(self.serial.clone()));
        match self.script.pop_front() {
            Some(Poll::Frames(frames)) => Ok(Some(MockFrameSet {
                serial: self.serial.clone(),
                frames,
                log: Rc::clone(&self.log),
            })),
            Some(Poll::Empty) | None => Ok(None),
            Some(Poll::Fail(err)) => Err(err),
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.log
            .borrow_mut()
            .push(Call::StopSession(self.serial.clone()));
    }
}

/// Aligner that tags every frame of the set.
pub struct MockAligner {
    fail: bool,
    log: Log,
}

impl FrameAligner<MockFrameSet> for MockAligner {
    fn process(&mut self, mut frames: MockFrameSet) -> Result<MockFrameSet> {
        if self.fail {
            return Err(CameraError::sdk(
                "rs2_process_frame",
                format!("block:align, serial:{}", frames.serial),
                "injected failure",
            ));
        }
        self.log
            .borrow_mut()
            .push(Call::Align(frames.serial.clone()));
        for frame in &mut frames.frames {
            frame.trace.push(Stage::Align);
        }
        Ok(frames)
    }
}

/// Filter that tags frames with its stage; the colorizer also turns them into RGB8.
pub struct MockFilter {
    kind: FilterKind,
    fail: bool,
    log: Log,
}

impl Options for MockFilter {
    fn set_option(&mut self, option: FilterOption, value: f32) -> Result<()> {
        self.log.borrow_mut().push(Call::SetOption {
            kind: self.kind,
            option,
            value,
        });
        Ok(())
    }
}

impl FrameFilter<MockFrame> for MockFilter {
    fn process(&mut self, mut frame: MockFrame) -> Result<MockFrame> {
        if self.fail {
            return Err(CameraError::sdk(
                "rs2_process_frame",
                format!("block:{}, frame:{}", self.kind, frame.id),
                "injected failure",
            ));
        }
        self.log.borrow_mut().push(Call::Filter {
            kind: self.kind,
            stream: frame.id,
        });
        frame.trace.push(Stage::from(self.kind));
        if self.kind == FilterKind::Colorizer && frame.format != PixelFormat::Rgb8 {
            frame.format = PixelFormat::Rgb8;
            frame.data = vec![0x40; (WIDTH * HEIGHT * 3) as usize];
        }
        Ok(frame)
    }
}

/// Mock camera subsystem built up with devices and failure injection.
#[derive(Default)]
pub struct MockCamera {
    devices: Vec<DeviceInfo>,
    scripts: RefCell<HashMap<String, Vec<Poll>>>,
    failing_filter: Option<FilterKind>,
    failing_start: Option<String>,
    failing_align: bool,
    log: Log,
}

impl MockCamera {
    /// Create a mock with no devices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device whose session replays `script`.
    #[must_use]
    pub fn with_device(mut self, serial: &str, script: Vec<Poll>) -> Self {
        self.devices.push(DeviceInfo {
            name: format!("Mock D4xx {serial}"),
            serial: serial.to_owned(),
        });
        self.scripts.get_mut().insert(serial.to_owned(), script);
        self
    }

    /// Make every `process` call on filters of `kind` fail.
    #[must_use]
    pub fn failing_filter(mut self, kind: FilterKind) -> Self {
        self.failing_filter = Some(kind);
        self
    }

    /// Make starting the session for `serial` fail.
    #[must_use]
    pub fn failing_start(mut self, serial: &str) -> Self {
        self.failing_start = Some(serial.to_owned());
        self
    }

    /// Make every alignment fail.
    #[must_use]
    pub fn failing_align(mut self) -> Self {
        self.failing_align = true;
        self
    }

    /// Snapshot of all recorded calls.
    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }
}

impl CameraSubsystem for MockCamera {
    type Frame = MockFrame;
    type FrameSet = MockFrameSet;
    type Session = MockSession;
    type Aligner = MockAligner;
    type Filter = MockFilter;

    fn query_devices(&self) -> Result<Vec<DeviceInfo>> {
        self.log.borrow_mut().push(Call::QueryDevices);
        Ok(self.devices.clone())
    }

    fn start_session(&self, serial: &str, streams: &[StreamRequest]) -> Result<MockSession> {
        self.log.borrow_mut().push(Call::StartSession {
            serial: serial.to_owned(),
            streams: streams.to_vec(),
        });
        if self.failing_start.as_deref() == Some(serial) {
            return Err(CameraError::sdk(
                "rs2_pipeline_start_with_config",
                format!("serial:{serial}"),
                "No device connected",
            ));
        }
        let script = self
            .scripts
            .borrow_mut()
            .remove(serial)
            .unwrap_or_default();
        Ok(MockSession {
            serial: serial.to_owned(),
            script: script.into(),
            log: Rc::clone(&self.log),
        })
    }

    fn create_aligner(&self, align_to: StreamKind) -> Result<MockAligner> {
        self.log.borrow_mut().push(Call::CreateAligner(align_to));
        Ok(MockAligner {
            fail: self.failing_align,
            log: Rc::clone(&self.log),
        })
    }

    fn create_filter(&self, kind: FilterKind) -> Result<MockFilter> {
        self.log.borrow_mut().push(Call::CreateFilter(kind));
        Ok(MockFilter {
            kind,
            fail: self.failing_filter == Some(kind),
            log: Rc::clone(&self.log),
        })
    }
}

/// Display that stays open for a fixed number of renders and records them.
pub struct MockDisplay {
    remaining: Option<usize>,
    /// `(stream, seq)` pairs of every rendered table.
    pub shown: Vec<Vec<(StreamId, u32)>>,
}

impl MockDisplay {
    /// Close after `renders` calls to `show`.
    #[must_use]
    pub const fn closing_after(renders: usize) -> Self {
        Self {
            remaining: Some(renders),
            shown: Vec::new(),
        }
    }

    /// Never close on its own.
    #[must_use]
    pub const fn never_closing() -> Self {
        Self {
            remaining: None,
            shown: Vec::new(),
        }
    }
}

impl DisplaySurface<MockFrame> for MockDisplay {
    fn is_open(&self) -> bool {
        self.remaining != Some(0)
    }

    fn show(&mut self, frames: &RenderFrames<MockFrame>) -> Result<()> {
        self.shown
            .push(frames.iter().map(|(id, frame)| (*id, frame.seq)).collect());
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_replays_script() {
        let camera = MockCamera::new().with_device(
            "A1",
            vec![
                Poll::Frames(vec![MockFrame::color(StreamId(1), 0)]),
                Poll::Empty,
            ],
        );
        let mut session = camera
            .start_session("A1", &[])
            .expect("start_session should succeed");

        let set = session
            .poll_for_frames()
            .expect("poll should succeed")
            .expect("frames expected");
        let frames = set.frames().expect("frames should succeed");
        assert_eq!(frames.len(), 1);
        assert!(session.poll_for_frames().expect("poll").is_none());
        assert!(session.poll_for_frames().expect("poll").is_none());
    }

    #[test]
    fn test_colorizer_outputs_rgb() {
        let camera = MockCamera::new();
        let mut colorizer = camera
            .create_filter(FilterKind::Colorizer)
            .expect("create_filter should succeed");

        let frame = colorizer
            .process(MockFrame::depth(StreamId(2), 0))
            .expect("process should succeed");

        assert_eq!(frame.format, PixelFormat::Rgb8);
        let image = frame.image().expect("image should succeed");
        assert_eq!(image.pixel_at(0, 0), Some((0x40, 0x40, 0x40)));
    }

    #[test]
    fn test_display_countdown() {
        let mut display = MockDisplay::closing_after(1);
        assert!(display.is_open());
        display.show(&RenderFrames::new()).expect("show");
        assert!(!display.is_open());
        assert!(MockDisplay::never_closing().is_open());
    }
}
