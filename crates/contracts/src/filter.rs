//! StreamFilter - wildcard pattern over (kind, format, index).

use serde::{Deserialize, Serialize};

use crate::{Frame, PixelFormat, StreamKind, StreamProfile};

/// Stream pattern with wildcard support.
///
/// `StreamKind::Any`, `PixelFormat::Any` and `index: None` always match;
/// fully-specified fields must match exactly. The derived `PartialEq` is
/// strict field-wise equality, meaningful only between fully-specified
/// filters (two filters differing in a wildcard field are not equal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamFilter {
    pub kind: StreamKind,
    pub format: PixelFormat,
    pub index: Option<i32>,
}

impl StreamFilter {
    /// Fully-wildcard filter that matches every stream.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(kind: StreamKind, format: PixelFormat, index: Option<i32>) -> Self {
        Self { kind, format, index }
    }

    /// True iff every non-wildcard field equals the profile's field.
    pub fn matches(&self, profile: &StreamProfile) -> bool {
        if self.kind != StreamKind::Any && self.kind != profile.kind {
            return false;
        }
        if self.format != PixelFormat::Any && self.format != profile.format {
            return false;
        }
        if let Some(index) = self.index {
            if index != profile.index {
                return false;
            }
        }
        true
    }

    /// Match against a frame's profile.
    pub fn matches_frame(&self, frame: &Frame) -> bool {
        self.matches(frame.profile())
    }

    /// True when no field is a wildcard.
    pub fn is_fully_specified(&self) -> bool {
        self.kind != StreamKind::Any && self.format != PixelFormat::Any && self.index.is_some()
    }
}
