//! Capabilities the sampler needs from an audio-rendering engine.
//!
//! The sampler does no decoding, mixing or DSP itself. A host engine
//! provides buffer storage, playback sources and the output graph through
//! these traits, and the sampler is handed them at construction.

use crate::types::{AssetRequest, BufferInfo};
use anyhow::Result;
use std::sync::Arc;

/// Notification invoked once when a playback source finishes.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Loads audio assets and reports their metadata.
pub trait BufferPool: Send + Sync {
    /// Load every requested asset. Loading may complete asynchronously.
    fn preload(&self, assets: &[AssetRequest]) -> Result<()>;

    /// Metadata for a loaded sample, looked up by its region reference.
    fn buffer(&self, sample: &str) -> Option<BufferInfo>;
}

/// One playback instance of a buffer.
///
/// Methods take `&self`: the registry owns the handle while the engine may
/// still be driving it from its own thread.
pub trait PlaybackSource: Send + Sync {
    /// Schedule playback at `time` (seconds), starting `offset` seconds into
    /// the buffer and lasting `duration` seconds, at linear `gain`.
    fn start(&self, time: f64, offset: f64, duration: f64, gain: f64);

    /// Register the notification fired when playback ends.
    fn set_on_ended(&self, callback: CompletionCallback);
}

/// Creates playback sources.
pub trait PlaybackSourceFactory: Send + Sync {
    fn create_source(
        &self,
        sample: &str,
        buffer: &BufferInfo,
        playback_rate: f64,
    ) -> Result<Arc<dyn PlaybackSource>>;
}

/// The output chain a source is connected to.
pub trait OutputNode: Send + Sync {
    /// Route `source` through a panner set to `pan` (-1.0 to 1.0).
    fn connect(&self, source: &Arc<dyn PlaybackSource>, pan: f64);
}

/// The set of capabilities a sampler is constructed with.
#[derive(Clone)]
pub struct EngineHandles {
    pub buffers: Arc<dyn BufferPool>,
    pub sources: Arc<dyn PlaybackSourceFactory>,
    pub output: Arc<dyn OutputNode>,
}

impl EngineHandles {
    pub fn new(
        buffers: Arc<dyn BufferPool>,
        sources: Arc<dyn PlaybackSourceFactory>,
        output: Arc<dyn OutputNode>,
    ) -> Self {
        Self {
            buffers,
            sources,
            output,
        }
    }
}
