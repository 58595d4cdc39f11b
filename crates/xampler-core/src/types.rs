//! Core type definitions shared across the engine.

use crate::opcodes::Opcodes;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Default MIDI key range when a region declares none.
pub const DEFAULT_KEY_RANGE: (i32, i32) = (0, 127);
/// Default velocity range when a region declares none.
pub const DEFAULT_VEL_RANGE: (i32, i32) = (0, 127);
/// An inverted range that expands to no cells.
pub const EMPTY_RANGE: (i32, i32) = (0, -1);

/// A leaf playback unit with fully resolved parameters.
///
/// Regions are produced once by consolidation and never change afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Region {
    /// Sample reference, relative to the instrument's default path.
    pub sample: Option<String>,
    /// MIDI key range (lokey, hikey), both inclusive.
    pub key_range: (i32, i32),
    /// Velocity range (lovel, hivel), both inclusive.
    pub vel_range: (i32, i32),
    /// Volume in dB.
    pub volume: f64,
    /// Playback start in sample frames.
    pub offset: Option<u64>,
    /// Playback end in sample frames.
    pub end: Option<u64>,
    /// Pan (-100 to 100).
    pub pan: Option<f64>,
    /// Transposition in semitones.
    pub transpose: Option<f64>,
    /// The merged opcode set this region was built from.
    pub opcodes: Opcodes,
}

impl Region {
    /// Resolve a leaf's merged opcode set into a region.
    ///
    /// A range with an unreadable bound is left empty, so the region covers
    /// no cells.
    pub fn from_opcodes(opcodes: Opcodes) -> Self {
        let invalid = |names: &[&str]| names.iter().any(|name| opcodes.has_invalid_bound(name));

        let key_range = match opcodes.key {
            _ if invalid(&["lokey", "hikey", "key"]) => EMPTY_RANGE,
            Some(key) => (opcodes.lokey.unwrap_or(key), opcodes.hikey.unwrap_or(key)),
            None => (
                opcodes.lokey.unwrap_or(DEFAULT_KEY_RANGE.0),
                opcodes.hikey.unwrap_or(DEFAULT_KEY_RANGE.1),
            ),
        };
        let vel_range = if invalid(&["lovel", "hivel"]) {
            EMPTY_RANGE
        } else {
            (
                opcodes.lovel.unwrap_or(DEFAULT_VEL_RANGE.0),
                opcodes.hivel.unwrap_or(DEFAULT_VEL_RANGE.1),
            )
        };

        Self {
            sample: opcodes.sample.clone(),
            key_range,
            vel_range,
            volume: opcodes.volume.unwrap_or(0.0),
            offset: opcodes.offset,
            end: opcodes.end,
            pan: opcodes.pan,
            transpose: opcodes.transpose,
            opcodes,
        }
    }

    /// Midpoint of the velocity range, rounded half up.
    pub fn mid_velocity(&self) -> i32 {
        let (lovel, hivel) = self.vel_range;
        if lovel == hivel {
            return lovel;
        }
        (lovel as f64 + (hivel - lovel) as f64 / 2.0 + 0.5).floor() as i32
    }
}

/// Composite key addressing one lookup cell: a note and an integer velocity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NoteKey {
    pub note: i32,
    pub velocity: i32,
}

impl NoteKey {
    pub fn new(note: i32, velocity: i32) -> Self {
        Self { note, velocity }
    }
}

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.note, self.velocity)
    }
}

/// One lookup-table row: a region plus the velocity scaling for its cell.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyVelocityEntry {
    pub region: Arc<Region>,
    /// `velocity / mid_velocity` for the cell this entry lives in.
    pub velocity_modulation: f64,
}

/// Metadata of a loaded audio buffer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BufferInfo {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Length in frames.
    pub frames: u64,
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl BufferInfo {
    pub fn new(sample_rate: f64, frames: u64, channels: u16) -> Self {
        Self {
            sample_rate,
            frames,
            channels,
        }
    }

    /// Total duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.frames as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

/// A request to preload one sample.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetRequest {
    /// Sample reference as used by regions.
    pub sample: String,
    /// Resolved path: base URL followed by the sample reference.
    pub path: String,
}

/// Ready-to-play values for one trigger.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaybackParams {
    /// Sample to play.
    pub sample: String,
    /// Metadata of the sample's buffer.
    pub buffer: BufferInfo,
    /// Linear gain (before headroom).
    pub gain: f64,
    /// Start offset into the buffer in seconds.
    pub offset: f64,
    /// Playback duration in seconds.
    pub duration: f64,
    /// Playback rate multiplier (1.0 = original pitch).
    pub playback_rate: f64,
    /// Pan (-1.0 to 1.0).
    pub pan: f64,
}
