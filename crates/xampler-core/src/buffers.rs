//! Buffer pool implementations.

use crate::engine::BufferPool;
use crate::error::{Error, Result};
use crate::types::{AssetRequest, BufferInfo};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A buffer pool whose metadata is registered up front.
///
/// Useful when the host engine decodes assets itself and only hands the
/// sampler sample rates and lengths.
#[derive(Debug, Default)]
pub struct MemoryBufferPool {
    buffers: RwLock<HashMap<String, BufferInfo>>,
}

impl MemoryBufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata for a sample reference.
    pub fn insert(&self, sample: impl Into<String>, info: BufferInfo) {
        self.buffers
            .write()
            .expect("Buffer pool lock poisoned")
            .insert(sample.into(), info);
    }
}

impl BufferPool for MemoryBufferPool {
    fn preload(&self, assets: &[AssetRequest]) -> anyhow::Result<()> {
        let buffers = self.buffers.read().expect("Buffer pool lock poisoned");
        for asset in assets {
            if !buffers.contains_key(&asset.sample) {
                log::warn!("No buffer registered for '{}' ({})", asset.sample, asset.path);
            }
        }
        Ok(())
    }

    fn buffer(&self, sample: &str) -> Option<BufferInfo> {
        self.buffers
            .read()
            .expect("Buffer pool lock poisoned")
            .get(sample)
            .copied()
    }
}

/// A buffer pool that reads WAV headers from disk.
///
/// Asset paths are `/`-rooted (`"/" + default_path + sample`) and are
/// resolved under `root`.
#[derive(Debug)]
pub struct WavBufferPool {
    root: PathBuf,
    buffers: RwLock<HashMap<String, BufferInfo>>,
}

impl WavBufferPool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            buffers: RwLock::new(HashMap::new()),
        }
    }

    /// Filesystem location of an asset path.
    pub fn resolve(&self, asset_path: &str) -> PathBuf {
        self.root.join(asset_path.trim_start_matches('/'))
    }

    /// Number of loaded buffers.
    pub fn len(&self) -> usize {
        self.buffers.read().expect("Buffer pool lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read WAV file info (sample rate, frames, channels).
pub fn read_wav_info(path: &Path) -> Result<BufferInfo> {
    if !path.exists() {
        return Err(Error::MissingAsset(path.to_path_buf()));
    }
    let reader = hound::WavReader::open(path).map_err(|source| Error::Wav {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = reader.spec();
    Ok(BufferInfo::new(
        spec.sample_rate as f64,
        reader.duration() as u64,
        spec.channels,
    ))
}

impl BufferPool for WavBufferPool {
    fn preload(&self, assets: &[AssetRequest]) -> anyhow::Result<()> {
        let mut loaded = 0;
        for asset in assets {
            let path = self.resolve(&asset.path);
            match read_wav_info(&path) {
                Ok(info) => {
                    log::debug!(
                        "Loaded '{}': {} frames at {} Hz, {} channel(s)",
                        asset.sample,
                        info.frames,
                        info.sample_rate,
                        info.channels
                    );
                    self.buffers
                        .write()
                        .expect("Buffer pool lock poisoned")
                        .insert(asset.sample.clone(), info);
                    loaded += 1;
                }
                Err(e) => {
                    log::warn!("Failed to load sample '{}': {}", asset.sample, e);
                    // Continue loading other samples
                }
            }
        }
        log::info!("Loaded {} of {} samples from {}", loaded, assets.len(), self.root.display());
        Ok(())
    }

    fn buffer(&self, sample: &str) -> Option<BufferInfo> {
        self.buffers
            .read()
            .expect("Buffer pool lock poisoned")
            .get(sample)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * channels as u32 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_memory_pool() {
        let pool = MemoryBufferPool::new();
        pool.insert("a.wav", BufferInfo::new(44100.0, 44100, 1));
        assert_eq!(pool.buffer("a.wav").unwrap().duration(), 1.0);
        assert!(pool.buffer("b.wav").is_none());
        assert!(pool
            .preload(&[AssetRequest {
                sample: "b.wav".to_string(),
                path: "/b.wav".to_string(),
            }])
            .is_ok());
    }

    #[test]
    fn test_wav_pool_reads_headers() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("piano")).unwrap();
        write_wav(&dir.path().join("piano/C4.wav"), 22050, 2, 11025);

        let pool = WavBufferPool::new(dir.path());
        pool.preload(&[
            AssetRequest {
                sample: "C4.wav".to_string(),
                path: "/piano/C4.wav".to_string(),
            },
            AssetRequest {
                sample: "missing.wav".to_string(),
                path: "/piano/missing.wav".to_string(),
            },
        ])
        .unwrap();

        assert_eq!(pool.len(), 1);
        let info = pool.buffer("C4.wav").unwrap();
        assert_eq!(info.sample_rate, 22050.0);
        assert_eq!(info.frames, 11025);
        assert_eq!(info.channels, 2);
        assert!((info.duration() - 0.5).abs() < 1e-12);
        assert!(pool.buffer("missing.wav").is_none());
    }

    #[test]
    fn test_read_wav_info_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.wav");
        assert!(matches!(read_wav_info(&missing), Err(Error::MissingAsset(_))));

        let garbage = dir.path().join("garbage.wav");
        fs::write(&garbage, b"not a wav file").unwrap();
        assert!(matches!(read_wav_info(&garbage), Err(Error::Wav { .. })));
    }
}
