//! An engine that renders nothing and records everything.
//!
//! `OfflineEngine` implements the source factory and the output chain. It
//! logs every source it creates, how each was connected and started, and it
//! lets the host decide when sources end, either one at a time or by
//! advancing a virtual clock.

use crate::engine::{CompletionCallback, OutputNode, PlaybackSource, PlaybackSourceFactory};
use crate::types::BufferInfo;
use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// A recorded start request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScheduledStart {
    pub source: u64,
    pub sample: String,
    pub time: f64,
    pub offset: f64,
    pub duration: f64,
    pub gain: f64,
    pub playback_rate: f64,
    /// Pan of the output connection, if the source was connected.
    pub pan: Option<f64>,
}

impl ScheduledStart {
    /// Time at which playback ends, in seconds.
    pub fn end_time(&self) -> f64 {
        self.time + self.duration / self.playback_rate
    }
}

#[derive(Default)]
struct SourceState {
    pan: Option<f64>,
    on_ended: Option<CompletionCallback>,
    started: bool,
    ended: bool,
}

/// A source created by the offline engine.
pub struct OfflineSource {
    id: u64,
    sample: String,
    playback_rate: f64,
    engine: Weak<Inner>,
    state: Mutex<SourceState>,
}

impl OfflineSource {
    pub fn id(&self) -> u64 {
        self.id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SourceState> {
        self.state.lock().expect("Source lock poisoned")
    }

    /// End playback, firing the completion notification once.
    fn finish(&self) -> bool {
        let callback = {
            let mut state = self.lock();
            if state.ended || !state.started {
                return false;
            }
            state.ended = true;
            state.on_ended.take()
        };
        if let Some(callback) = callback {
            callback();
        }
        true
    }
}

impl PlaybackSource for OfflineSource {
    fn start(&self, time: f64, offset: f64, duration: f64, gain: f64) {
        let pan = {
            let mut state = self.lock();
            state.started = true;
            state.pan
        };
        log::debug!(
            "[OFFLINE] source {} '{}' start at {:.3}s offset={:.3} dur={:.3} gain={:.4} rate={:.4}",
            self.id,
            self.sample,
            time,
            offset,
            duration,
            gain,
            self.playback_rate
        );
        if let Some(engine) = self.engine.upgrade() {
            engine
                .starts
                .lock()
                .expect("Engine lock poisoned")
                .push(ScheduledStart {
                    source: self.id,
                    sample: self.sample.clone(),
                    time,
                    offset,
                    duration,
                    gain,
                    playback_rate: self.playback_rate,
                    pan,
                });
        }
    }

    fn set_on_ended(&self, callback: CompletionCallback) {
        self.lock().on_ended = Some(callback);
    }
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    /// Sources that have not ended; a source is dropped here once it ends.
    sources: Mutex<Vec<Arc<OfflineSource>>>,
    starts: Mutex<Vec<ScheduledStart>>,
    unavailable: Mutex<HashSet<String>>,
}

/// Recording engine. Cloning shares the same recording.
#[derive(Clone, Default)]
pub struct OfflineEngine {
    inner: Arc<Inner>,
}

impl OfflineEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make source creation fail for a sample.
    pub fn make_unavailable(&self, sample: impl Into<String>) {
        self.inner
            .unavailable
            .lock()
            .expect("Engine lock poisoned")
            .insert(sample.into());
    }

    /// Every start request so far, in call order.
    pub fn starts(&self) -> Vec<ScheduledStart> {
        self.inner.starts.lock().expect("Engine lock poisoned").clone()
    }

    /// Number of sources created so far, ended ones included.
    pub fn sources_created(&self) -> usize {
        self.inner.next_id.load(Ordering::Relaxed) as usize
    }

    /// Number of sources that have not ended yet.
    pub fn live_sources(&self) -> usize {
        self.inner.sources.lock().expect("Engine lock poisoned").len()
    }

    fn release(&self, ended: &[u64]) {
        self.inner
            .sources
            .lock()
            .expect("Engine lock poisoned")
            .retain(|source| !ended.contains(&source.id));
    }

    fn source(&self, id: u64) -> Option<Arc<OfflineSource>> {
        self.inner
            .sources
            .lock()
            .expect("Engine lock poisoned")
            .iter()
            .find(|source| source.id == id)
            .cloned()
    }

    /// End one source. Returns false if it is unknown, not started, or already ended.
    pub fn finish(&self, id: u64) -> bool {
        let ended = self.source(id).is_some_and(|source| source.finish());
        if ended {
            self.release(&[id]);
        }
        ended
    }

    /// End every started source. Returns how many ended.
    pub fn finish_all(&self) -> usize {
        let sources = self.inner.sources.lock().expect("Engine lock poisoned").clone();
        let ended: Vec<u64> = sources
            .iter()
            .filter(|source| source.finish())
            .map(|source| source.id)
            .collect();
        self.release(&ended);
        ended.len()
    }

    /// End every source whose playback is over at `time`. Returns how many ended.
    pub fn advance_to(&self, time: f64) -> usize {
        let due: Vec<u64> = self
            .starts()
            .into_iter()
            .filter(|start| start.end_time() <= time)
            .map(|start| start.source)
            .collect();
        due.into_iter().filter(|id| self.finish(*id)).count()
    }
}

impl PlaybackSourceFactory for OfflineEngine {
    fn create_source(
        &self,
        sample: &str,
        _buffer: &BufferInfo,
        playback_rate: f64,
    ) -> Result<Arc<dyn PlaybackSource>> {
        if self
            .inner
            .unavailable
            .lock()
            .expect("Engine lock poisoned")
            .contains(sample)
        {
            bail!("sample '{}' is unavailable", sample);
        }
        let source = Arc::new(OfflineSource {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            sample: sample.to_string(),
            playback_rate,
            engine: Arc::downgrade(&self.inner),
            state: Mutex::new(SourceState::default()),
        });
        self.inner
            .sources
            .lock()
            .expect("Engine lock poisoned")
            .push(Arc::clone(&source));
        Ok(source as Arc<dyn PlaybackSource>)
    }
}

impl OutputNode for OfflineEngine {
    fn connect(&self, source: &Arc<dyn PlaybackSource>, pan: f64) {
        let target = Arc::as_ptr(source) as *const u8;
        let sources = self.inner.sources.lock().expect("Engine lock poisoned");
        match sources
            .iter()
            .find(|known| Arc::as_ptr(known) as *const u8 == target)
        {
            Some(known) => known.lock().pan = Some(pan),
            None => log::warn!("[OFFLINE] connect called with a foreign source"),
        }
    }
}
