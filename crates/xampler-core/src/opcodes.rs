//! Opcode sets and the parent-to-child merge rule.
//!
//! An opcode set is the parameter bag attached to one node of the region
//! tree. Sets are merged top-down: whatever a child defines overrides its
//! parent, except `volume`, which accumulates along the path to a leaf.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Opcodes that bound a region's key or velocity range.
pub const RANGE_OPCODES: [&str; 5] = ["lokey", "hikey", "key", "lovel", "hivel"];

/// Parameters attached to a region tree node.
///
/// The engine interprets the typed fields. Any other opcode found in a
/// descriptor (`ampeg_release`, `cutoff`, ...) lands in `extra` and is
/// carried through merging unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Opcodes {
    /// Sample reference, relative to the instrument's `default_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    /// Lowest MIDI key (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lokey: Option<i32>,
    /// Highest MIDI key (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hikey: Option<i32>,
    /// Single key shorthand, sets both key bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<i32>,
    /// Lowest velocity (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lovel: Option<i32>,
    /// Highest velocity (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hivel: Option<i32>,
    /// Volume in dB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Playback start in sample frames. Fractions are truncated, negative
    /// values are dropped.
    #[serde(
        default,
        deserialize_with = "deserialize_frames",
        skip_serializing_if = "Option::is_none"
    )]
    pub offset: Option<u64>,
    /// Playback end in sample frames, same rules as `offset`.
    #[serde(
        default,
        deserialize_with = "deserialize_frames",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<u64>,
    /// Pan (-100 to 100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<f64>,
    /// Transposition in semitones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpose: Option<f64>,
    /// Opcodes the engine does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Opcodes {
    /// Returns true if no opcode is set at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set an opcode from its textual SFZ form.
    ///
    /// Values that fail to parse for a typed opcode are kept as strings in
    /// `extra` so nothing in the source is silently dropped.
    pub fn set(&mut self, name: &str, value: &str) {
        let value = value.trim();
        let parsed = match name {
            "sample" => {
                self.sample = Some(value.to_string());
                true
            }
            "lokey" => parse_key(value, &mut self.lokey),
            "hikey" => parse_key(value, &mut self.hikey),
            "key" => parse_key(value, &mut self.key),
            "lovel" => parse_into(value, &mut self.lovel),
            "hivel" => parse_into(value, &mut self.hivel),
            "volume" => parse_into(value, &mut self.volume),
            "offset" => parse_frames(value, &mut self.offset),
            "end" => parse_frames(value, &mut self.end),
            "pan" => parse_into(value, &mut self.pan),
            "transpose" => parse_into(value, &mut self.transpose),
            _ => false,
        };
        if parsed {
            self.extra.remove(name);
            return;
        }
        if is_typed(name) {
            log::warn!("Invalid value '{}' for opcode '{}'", value, name);
            if let Some(slot) = self.range_slot(name) {
                *slot = None;
            }
        }
        self.extra
            .insert(name.to_string(), Value::String(value.to_string()));
    }

    /// Returns true if a range opcode was given a value that could not be read.
    pub fn has_invalid_bound(&self, name: &str) -> bool {
        RANGE_OPCODES.contains(&name) && self.extra.contains_key(name)
    }

    fn bound(&self, name: &str) -> Option<i32> {
        match name {
            "lokey" => self.lokey,
            "hikey" => self.hikey,
            "key" => self.key,
            "lovel" => self.lovel,
            "hivel" => self.hivel,
            _ => None,
        }
    }

    fn range_slot(&mut self, name: &str) -> Option<&mut Option<i32>> {
        match name {
            "lokey" => Some(&mut self.lokey),
            "hikey" => Some(&mut self.hikey),
            "key" => Some(&mut self.key),
            "lovel" => Some(&mut self.lovel),
            "hivel" => Some(&mut self.hivel),
            _ => None,
        }
    }
}

/// Parse an SFZ note name (`c4`, `c#4`, `eb3`) to a MIDI note number, C4 = 60.
pub fn parse_note_name(name: &str) -> Option<i32> {
    let mut chars = name.trim().chars().peekable();

    let base = match chars.next()?.to_ascii_lowercase() {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };

    let accidental = match chars.peek() {
        Some('#') => 1,
        Some('b') => -1,
        _ => 0,
    };
    if accidental != 0 {
        chars.next();
    }

    let octave: i32 = chars.collect::<String>().parse().ok()?;
    Some((octave + 1) * 12 + base + accidental)
}

fn parse_key(value: &str, slot: &mut Option<i32>) -> bool {
    match value.parse().ok().or_else(|| parse_note_name(value)) {
        Some(key) => {
            *slot = Some(key);
            true
        }
        None => false,
    }
}

fn frames_from(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.trunc() as u64)
}

fn parse_frames(value: &str, slot: &mut Option<u64>) -> bool {
    match value.parse::<f64>().ok().and_then(frames_from) {
        Some(frames) => {
            *slot = Some(frames);
            true
        }
        None => false,
    }
}

fn deserialize_frames<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        let frames = frames_from(v);
        if frames.is_none() {
            log::warn!("Ignoring invalid frame position {}", v);
        }
        frames
    }))
}

fn parse_into<T: std::str::FromStr>(value: &str, slot: &mut Option<T>) -> bool {
    match value.parse() {
        Ok(v) => {
            *slot = Some(v);
            true
        }
        Err(_) => false,
    }
}

fn is_typed(name: &str) -> bool {
    matches!(
        name,
        "lokey" | "hikey" | "key" | "lovel" | "hivel" | "volume" | "offset" | "end" | "pan"
            | "transpose"
    )
}

/// Merge a parent opcode set into a child's.
///
/// Every opcode the child defines overrides the parent's. When both define
/// `volume`, the merged volume is the sum of the two. Neither input is
/// modified.
pub fn merge(parent: &Opcodes, child: &Opcodes) -> Opcodes {
    let volume = match (parent.volume, child.volume) {
        (Some(p), Some(c)) => Some(p + c),
        (p, c) => c.or(p),
    };

    let mut extra = parent.extra.clone();
    extra.extend(child.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut merged = Opcodes {
        sample: child.sample.clone().or_else(|| parent.sample.clone()),
        lokey: child.lokey.or(parent.lokey),
        hikey: child.hikey.or(parent.hikey),
        key: child.key.or(parent.key),
        lovel: child.lovel.or(parent.lovel),
        hivel: child.hivel.or(parent.hivel),
        volume,
        offset: child.offset.or(parent.offset),
        end: child.end.or(parent.end),
        pan: child.pan.or(parent.pan),
        transpose: child.transpose.or(parent.transpose),
        extra,
    };

    // A bound the child sets, readable or not, replaces the parent's.
    for name in RANGE_OPCODES {
        if child.has_invalid_bound(name) {
            if let Some(slot) = merged.range_slot(name) {
                *slot = None;
            }
        } else if child.bound(name).is_some() {
            merged.extra.remove(name);
        }
    }
    merged
}
