//! Bookkeeping of playing voices.
//!
//! Voices are grouped in buckets by the (note, velocity) cell they were
//! triggered on. A voice stays in its bucket until the engine reports that
//! its source has ended; that notification is the only way out.

use crate::engine::{CompletionCallback, PlaybackSource};
use crate::types::NoteKey;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one voice, unique for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

impl VoiceId {
    fn next() -> Self {
        Self(NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// One playing instance.
pub struct Voice {
    id: VoiceId,
    key: NoteKey,
    sample: String,
    /// Ownership handle of the engine's source; released on removal.
    source: Arc<dyn PlaybackSource>,
}

impl Voice {
    pub fn new(key: NoteKey, sample: impl Into<String>, source: Arc<dyn PlaybackSource>) -> Self {
        Self {
            id: VoiceId::next(),
            key,
            sample: sample.into(),
            source,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn key(&self) -> NoteKey {
        self.key
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn source(&self) -> &Arc<dyn PlaybackSource> {
        &self.source
    }
}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voice")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("sample", &self.sample)
            .finish_non_exhaustive()
    }
}

type Buckets = HashMap<NoteKey, Vec<Voice>>;

/// Registry of playing voices, keyed by trigger cell.
///
/// A single lock guards all buckets. Completion callbacks only hold a weak
/// reference, so once the registry is dropped they do nothing.
#[derive(Default)]
pub struct VoiceRegistry {
    buckets: Arc<Mutex<Buckets>>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        lock_buckets(&self.buckets)
    }

    /// Append a voice to its cell's bucket.
    pub fn insert(&self, voice: Voice) -> VoiceId {
        let id = voice.id;
        self.lock().entry(voice.key).or_default().push(voice);
        id
    }

    /// Build the completion notification for a voice.
    ///
    /// Invoking it removes exactly that voice; if the voice or the registry
    /// is already gone it does nothing.
    pub fn completion_callback(&self, key: NoteKey, id: VoiceId) -> CompletionCallback {
        let buckets: Weak<Mutex<Buckets>> = Arc::downgrade(&self.buckets);
        Box::new(move || {
            let Some(buckets) = buckets.upgrade() else {
                log::trace!("{} ended after registry teardown", id);
                return;
            };
            if take_voice(&buckets, key, id).is_some() {
                log::debug!("{} on {} ended", id, key);
            }
        })
    }

    /// Remove a voice by identity. Returns false if it was not registered.
    pub fn remove(&self, key: NoteKey, id: VoiceId) -> bool {
        take_voice(&self.buckets, key, id).is_some()
    }

    /// IDs of the voices currently playing on a cell, oldest first.
    pub fn voices_for(&self, key: NoteKey) -> Vec<VoiceId> {
        self.lock()
            .get(&key)
            .map(|voices| voices.iter().map(Voice::id).collect())
            .unwrap_or_default()
    }

    /// Total number of playing voices.
    pub fn active_count(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    /// Drop every voice, releasing all source handles.
    ///
    /// Completion notifications that arrive afterwards find nothing to remove.
    pub fn clear(&self) {
        let drained: Vec<Voice> = self.lock().drain().flat_map(|(_, voices)| voices).collect();
        log::debug!("Released {} voices", drained.len());
        drop(drained);
    }
}

impl fmt::Debug for VoiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceRegistry")
            .field("active", &self.active_count())
            .finish()
    }
}

fn lock_buckets(buckets: &Mutex<Buckets>) -> MutexGuard<'_, Buckets> {
    buckets.lock().expect("Voice registry lock poisoned")
}

fn take_voice(buckets: &Mutex<Buckets>, key: NoteKey, id: VoiceId) -> Option<Voice> {
    let mut buckets = lock_buckets(buckets);
    let voices = buckets.get_mut(&key)?;
    let index = voices.iter().position(|voice| voice.id == id)?;
    let voice = voices.remove(index);
    if voices.is_empty() {
        buckets.remove(&key);
    }
    Some(voice)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSource;

    impl PlaybackSource for NullSource {
        fn start(&self, _time: f64, _offset: f64, _duration: f64, _gain: f64) {}
        fn set_on_ended(&self, _callback: CompletionCallback) {}
    }

    fn voice(key: NoteKey) -> Voice {
        Voice::new(key, "a.wav", Arc::new(NullSource))
    }

    #[test]
    fn test_ids_are_unique() {
        let key = NoteKey::new(60, 127);
        assert_ne!(voice(key).id(), voice(key).id());
    }

    #[test]
    fn test_completion_removes_only_that_voice() {
        let registry = VoiceRegistry::new();
        let key = NoteKey::new(60, 127);
        let first = registry.insert(voice(key));
        let second = registry.insert(voice(key));
        let third = registry.insert(voice(key));

        registry.completion_callback(key, second)();
        assert_eq!(registry.voices_for(key), vec![first, third]);
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_completion_is_idempotent() {
        let registry = VoiceRegistry::new();
        let key = NoteKey::new(60, 127);
        let id = registry.insert(voice(key));

        registry.completion_callback(key, id)();
        registry.completion_callback(key, id)();
        assert!(registry.is_empty());
        assert!(registry.voices_for(key).is_empty());
        assert!(!registry.remove(key, id));
    }

    #[test]
    fn test_completion_after_teardown_is_noop() {
        let registry = VoiceRegistry::new();
        let key = NoteKey::new(60, 127);
        let id = registry.insert(voice(key));
        let callback = registry.completion_callback(key, id);
        drop(registry);
        callback();
    }

    #[test]
    fn test_clear_releases_sources() {
        let registry = VoiceRegistry::new();
        let key = NoteKey::new(61, 64);
        let source: Arc<dyn PlaybackSource> = Arc::new(NullSource);
        let id = registry.insert(Voice::new(key, "a.wav", Arc::clone(&source)));
        assert_eq!(Arc::strong_count(&source), 2);

        registry.clear();
        assert_eq!(Arc::strong_count(&source), 1);
        registry.completion_callback(key, id)();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_completions() {
        let registry = VoiceRegistry::new();
        let key = NoteKey::new(60, 100);
        let callbacks: Vec<_> = (0..32)
            .map(|_| {
                let id = registry.insert(voice(key));
                registry.completion_callback(key, id)
            })
            .collect();

        let handles: Vec<_> = callbacks
            .into_iter()
            .map(|callback| std::thread::spawn(callback))
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
