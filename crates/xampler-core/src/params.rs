//! Conversion of stored region parameters into ready-to-play values.

use crate::engine::BufferPool;
use crate::types::{KeyVelocityEntry, PlaybackParams};

/// Convert dB to linear gain.
pub fn decibel_to_gain(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a transposition in semitones to a playback rate multiplier.
pub fn pitch_to_playback_rate(semitones: f64) -> f64 {
    2.0_f64.powf(semitones / 12.0)
}

/// Convert pan (-100 to 100) to the -1.0 to 1.0 range.
pub fn pan_to_unit(pan: f64) -> f64 {
    pan / 100.0
}

/// Resolve a lookup entry against the buffer pool.
///
/// Returns `None` when the entry's region has no sample, or when the pool
/// has no buffer for it.
pub fn resolve_entry(entry: &KeyVelocityEntry, pool: &dyn BufferPool) -> Option<PlaybackParams> {
    let region = &entry.region;
    let sample = region.sample.as_deref()?;
    let Some(buffer) = pool.buffer(sample) else {
        log::debug!("No buffer loaded for sample '{}'", sample);
        return None;
    };

    let offset_frames = region.offset.unwrap_or(0);
    let offset = if offset_frames > 0 {
        offset_frames as f64 / buffer.sample_rate
    } else {
        0.0
    };

    let duration = match region.end {
        Some(end) if end > 0 => (end as f64 - offset_frames as f64) / buffer.sample_rate,
        _ => buffer.duration(),
    };

    let playback_rate = match region.transpose {
        Some(t) if t != 0.0 => pitch_to_playback_rate(t),
        _ => 1.0,
    };

    Some(PlaybackParams {
        sample: sample.to_string(),
        buffer,
        gain: entry.velocity_modulation * decibel_to_gain(region.volume),
        offset,
        duration,
        playback_rate,
        pan: region.pan.map(pan_to_unit).unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::MemoryBufferPool;
    use crate::opcodes::Opcodes;
    use crate::types::{BufferInfo, Region};
    use std::sync::Arc;

    fn entry(opcodes: Opcodes, velocity_modulation: f64) -> KeyVelocityEntry {
        KeyVelocityEntry {
            region: Arc::new(Region::from_opcodes(opcodes)),
            velocity_modulation,
        }
    }

    fn pool() -> MemoryBufferPool {
        let pool = MemoryBufferPool::new();
        pool.insert("a.wav", BufferInfo::new(48000.0, 96000, 2));
        pool
    }

    #[test]
    fn test_decibel_to_gain() {
        assert!((decibel_to_gain(0.0) - 1.0).abs() < 1e-12);
        assert!((decibel_to_gain(-20.0) - 0.1).abs() < 1e-12);
        assert!((decibel_to_gain(-6.0) - 0.501187).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_to_playback_rate() {
        assert!((pitch_to_playback_rate(12.0) - 2.0).abs() < 1e-12);
        assert!((pitch_to_playback_rate(0.0) - 1.0).abs() < 1e-12);
        assert!((pitch_to_playback_rate(-12.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pan_to_unit() {
        assert_eq!(pan_to_unit(-100.0), -1.0);
        assert_eq!(pan_to_unit(50.0), 0.5);
    }

    #[test]
    fn test_defaults_play_whole_buffer() {
        let opcodes = Opcodes {
            sample: Some("a.wav".to_string()),
            ..Default::default()
        };
        let params = resolve_entry(&entry(opcodes, 1.0), &pool()).unwrap();
        assert_eq!(params.sample, "a.wav");
        assert_eq!(params.gain, 1.0);
        assert_eq!(params.offset, 0.0);
        assert!((params.duration - 2.0).abs() < 1e-12);
        assert_eq!(params.playback_rate, 1.0);
        assert_eq!(params.pan, 0.0);
    }

    #[test]
    fn test_offset_end_transpose_pan() {
        let opcodes = Opcodes {
            sample: Some("a.wav".to_string()),
            volume: Some(-20.0),
            offset: Some(24000),
            end: Some(72000),
            transpose: Some(-12.0),
            pan: Some(-50.0),
            ..Default::default()
        };
        let params = resolve_entry(&entry(opcodes, 0.5), &pool()).unwrap();
        assert!((params.gain - 0.05).abs() < 1e-12);
        assert!((params.offset - 0.5).abs() < 1e-12);
        assert!((params.duration - 1.0).abs() < 1e-12);
        assert!((params.playback_rate - 0.5).abs() < 1e-12);
        assert_eq!(params.pan, -0.5);
    }

    #[test]
    fn test_end_without_offset() {
        let opcodes = Opcodes {
            sample: Some("a.wav".to_string()),
            end: Some(4800),
            ..Default::default()
        };
        let params = resolve_entry(&entry(opcodes, 1.0), &pool()).unwrap();
        assert!((params.duration - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_missing_sample_or_buffer() {
        assert!(resolve_entry(&entry(Opcodes::default(), 1.0), &pool()).is_none());

        let opcodes = Opcodes {
            sample: Some("unknown.wav".to_string()),
            ..Default::default()
        };
        assert!(resolve_entry(&entry(opcodes, 1.0), &pool()).is_none());
    }
}
