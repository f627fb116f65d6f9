//! Static extrinsics graph.

use std::collections::HashMap;

use contracts::{Extrinsics, ExtrinsicsGraph, StreamKind, StreamProfile};
use parking_lot::RwLock;

/// Identity of a stream inside the calibration graph.
type StreamKey = (StreamKind, i32);

fn key(profile: &StreamProfile) -> StreamKey {
    (profile.kind, profile.index)
}

/// Table-driven [`ExtrinsicsGraph`].
///
/// Pairs are registered once at setup; a stream queried against itself
/// answers with the identity transform. Lookups are synchronized here so
/// the pipeline can treat the graph as shared process-wide state.
#[derive(Default)]
pub struct StaticExtrinsicsGraph {
    edges: RwLock<HashMap<(StreamKey, StreamKey), Extrinsics>>,
}

impl StaticExtrinsicsGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link two streams. The inverse direction is not derived; register it
    /// explicitly when needed.
    pub fn register(&self, from: &StreamProfile, to: &StreamProfile, extrinsics: Extrinsics) {
        self.edges
            .write()
            .insert((key(from), key(to)), extrinsics);
    }
}

impl ExtrinsicsGraph for StaticExtrinsicsGraph {
    fn try_fetch_extrinsics(&self, from: &StreamProfile, to: &StreamProfile) -> Option<Extrinsics> {
        if key(from) == key(to) {
            return Some(Extrinsics::IDENTITY);
        }
        self.edges.read().get(&(key(from), key(to))).copied()
    }
}
