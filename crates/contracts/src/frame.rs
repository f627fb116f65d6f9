//! Frame - reference-counted pipeline payload.
//!
//! A frame is mutable only while the producing stage fills it; wrapping it
//! in [`FrameRef`] for delivery freezes it. The profile is fixed at
//! allocation time and never changes.

use std::fmt;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use bytes::BytesMut;

use crate::{PixelFormat, SensorHandle, StreamFilter, StreamKind, StreamProfile};

/// Shared, immutable frame handle.
pub type FrameRef = Arc<Frame>;

/// Frame delivery callback.
///
/// Uses `Arc` to allow callback sharing across multiple contexts.
pub type FrameCallback = Arc<dyn Fn(FrameRef) + Send + Sync>;

/// One 3-D point of a point-cloud frame, metric units.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vertex {
    pub const ZERO: Vertex = Vertex { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero-depth pixels deproject to the zero vertex and are invalid.
    pub fn is_valid(&self) -> bool {
        self.z != 0.0
    }
}

/// Normalized texture coordinate in [0,1], or a raw projected pixel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TexCoord {
    pub u: f32,
    pub v: f32,
}

impl TexCoord {
    pub const ZERO: TexCoord = TexCoord { u: 0.0, v: 0.0 };

    pub fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }
}

/// Frame payload variants
#[derive(Clone)]
pub enum FramePayload {
    /// Pixel data (depth, color, infrared)
    Video {
        /// Bytes per pixel
        bpp: usize,
        /// Bytes per row
        stride: usize,
        /// Raw pixel buffer, `stride * height` bytes
        data: BytesMut,
    },

    /// Single motion sample
    Motion { data: [f32; 3] },

    /// Point cloud: one vertex and one texture coordinate per depth pixel
    Points {
        vertices: Vec<Vertex>,
        texcoords: Vec<TexCoord>,
    },

    /// Bundle of frames delivered and processed together
    Composite(Vec<FrameRef>),
}

/// A single frame moving through the pipeline.
#[derive(Clone)]
pub struct Frame {
    profile: StreamProfile,
    timestamp: f64,
    frame_number: u64,
    sensor: Option<Arc<dyn SensorHandle>>,
    payload: FramePayload,
}

impl Frame {
    /// Create a video frame over an existing buffer.
    pub fn video(
        profile: StreamProfile,
        timestamp: f64,
        frame_number: u64,
        sensor: Option<Arc<dyn SensorHandle>>,
        bpp: usize,
        data: BytesMut,
    ) -> Self {
        let stride = profile.width as usize * bpp;
        Self {
            profile,
            timestamp,
            frame_number,
            sensor,
            payload: FramePayload::Video { bpp, stride, data },
        }
    }

    /// Create a motion frame.
    pub fn motion(
        profile: StreamProfile,
        timestamp: f64,
        frame_number: u64,
        sensor: Option<Arc<dyn SensorHandle>>,
        data: [f32; 3],
    ) -> Self {
        Self {
            profile,
            timestamp,
            frame_number,
            sensor,
            payload: FramePayload::Motion { data },
        }
    }

    /// Create a point-cloud frame with zeroed buffers sized to the profile.
    pub fn points(
        profile: StreamProfile,
        timestamp: f64,
        frame_number: u64,
        sensor: Option<Arc<dyn SensorHandle>>,
    ) -> Self {
        let count = profile.pixel_count();
        Self {
            profile,
            timestamp,
            frame_number,
            sensor,
            payload: FramePayload::Points {
                vertices: vec![Vertex::ZERO; count],
                texcoords: vec![TexCoord::ZERO; count],
            },
        }
    }

    /// Create a composite frame bundling `frames`.
    ///
    /// The composite inherits timestamp/number/sensor from the first frame.
    pub fn composite(frames: Vec<FrameRef>) -> Self {
        let (profile, timestamp, frame_number, sensor) = match frames.first() {
            Some(first) => (
                first.profile.clone(),
                first.timestamp,
                first.frame_number,
                first.sensor.clone(),
            ),
            None => (StreamProfile::video(StreamKind::Any, PixelFormat::Any, 0, 0, 0, 0), 0.0, 0, None),
        };
        Self {
            profile,
            timestamp,
            frame_number,
            sensor,
            payload: FramePayload::Composite(frames),
        }
    }

    pub fn profile(&self) -> &StreamProfile {
        &self.profile
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn sensor(&self) -> Option<&Arc<dyn SensorHandle>> {
        self.sensor.as_ref()
    }

    /// Depth scale in meters per raw unit, from the owning sensor.
    pub fn depth_units(&self) -> Option<f32> {
        self.sensor.as_ref().and_then(|s| s.depth_units())
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.payload, FramePayload::Composite(_))
    }

    /// True for a raw depth frame (Depth / Z16).
    pub fn is_depth(&self) -> bool {
        self.profile.kind == StreamKind::Depth && self.profile.format == PixelFormat::Z16
    }

    /// Child frames of a composite, empty slice otherwise.
    pub fn frames(&self) -> &[FrameRef] {
        match &self.payload {
            FramePayload::Composite(frames) => frames,
            _ => &[],
        }
    }

    /// First child of a composite matching (kind, format); wildcards allowed.
    pub fn first(&self, kind: StreamKind, format: PixelFormat) -> Option<&FrameRef> {
        let filter = StreamFilter::new(kind, format, None);
        self.frames().iter().find(|f| filter.matches_frame(f))
    }

    /// Raw pixel buffer of a video frame.
    pub fn video_data(&self) -> Option<&[u8]> {
        match &self.payload {
            FramePayload::Video { data, .. } => Some(data.as_ref()),
            _ => None,
        }
    }

    /// Mutable pixel buffer; only available while the frame is still owned.
    pub fn video_data_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.payload {
            FramePayload::Video { data, .. } => Some(data.as_mut()),
            _ => None,
        }
    }

    /// Bytes per pixel of a video frame.
    pub fn bpp(&self) -> Option<usize> {
        match &self.payload {
            FramePayload::Video { bpp, .. } => Some(*bpp),
            _ => None,
        }
    }

    pub fn motion_data(&self) -> Option<[f32; 3]> {
        match &self.payload {
            FramePayload::Motion { data } => Some(*data),
            _ => None,
        }
    }

    /// Vertex/texcoord buffers of a points frame.
    pub fn points_data(&self) -> Option<(&[Vertex], &[TexCoord])> {
        match &self.payload {
            FramePayload::Points { vertices, texcoords } => Some((vertices, texcoords)),
            _ => None,
        }
    }

    /// Mutable vertex/texcoord buffers; only available while owned.
    pub fn points_data_mut(&mut self) -> Option<(&mut [Vertex], &mut [TexCoord])> {
        match &mut self.payload {
            FramePayload::Points { vertices, texcoords } => Some((vertices, texcoords)),
            _ => None,
        }
    }

    /// Vertex buffer viewed as raw bytes (for export/serialization).
    pub fn raw_vertices(&self) -> Option<&[u8]> {
        self.points_data().map(|(v, _)| bytemuck::cast_slice(v))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = match &self.payload {
            FramePayload::Video { data, .. } => format!("Video({} bytes)", data.len()),
            FramePayload::Motion { .. } => "Motion".to_string(),
            FramePayload::Points { vertices, .. } => format!("Points({} vertices)", vertices.len()),
            FramePayload::Composite(frames) => format!("Composite({} frames)", frames.len()),
        };
        f.debug_struct("Frame")
            .field("profile", &self.profile)
            .field("timestamp", &self.timestamp)
            .field("frame_number", &self.frame_number)
            .field("payload", &payload)
            .finish()
    }
}
