//! Process-wide cache of the character creation options.
//!
//! The options are fetched at most once per process (unless invalidated).
//! Callers that ask while the first fetch is still running wait on that same
//! request instead of issuing their own. A failed fetch leaves the cache
//! empty so the next call tries again.

use crate::backend::{RequestFailure, StoryBackend};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use story_api::CharacterOptions;
use tracing::{info, warn};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<CharacterOptions>, RequestFailure>>>;

enum Slot {
    Empty,
    Fetching { generation: u64, fetch: SharedFetch },
    Ready(Arc<CharacterOptions>),
}

struct CacheState {
    slot: Slot,
    generation: u64,
}

/// Lazily populated, single-flight cache of [`CharacterOptions`].
pub struct CharacterOptionsCache {
    backend: Arc<dyn StoryBackend>,
    state: Mutex<CacheState>,
}

impl CharacterOptionsCache {
    pub fn new(backend: Arc<dyn StoryBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(CacheState {
                slot: Slot::Empty,
                generation: 0,
            }),
        }
    }

    /// Get the options, fetching them if they are not cached yet.
    pub async fn fetch(&self) -> Result<Arc<CharacterOptions>, RequestFailure> {
        let (generation, fetch) = {
            let mut state = self.lock();
            match &state.slot {
                Slot::Ready(options) => return Ok(Arc::clone(options)),
                Slot::Fetching { generation, fetch } => (*generation, fetch.clone()),
                Slot::Empty => {
                    state.generation += 1;
                    let generation = state.generation;
                    let backend = Arc::clone(&self.backend);
                    let fetch = async move { backend.character_options().await.map(Arc::new) }
                        .boxed()
                        .shared();
                    state.slot = Slot::Fetching {
                        generation,
                        fetch: fetch.clone(),
                    };
                    (generation, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut state = self.lock();
        let settles_current =
            matches!(&state.slot, Slot::Fetching { generation: current, .. } if *current == generation);
        if settles_current {
            state.slot = match &result {
                Ok(options) => {
                    info!(
                        races = options.races.len(),
                        classes = options.classes.len(),
                        backgrounds = options.backgrounds.len(),
                        "Character options cached"
                    );
                    Slot::Ready(Arc::clone(options))
                }
                Err(e) => {
                    warn!(error = %e, "Character options fetch failed");
                    Slot::Empty
                }
            };
        }

        result
    }

    /// The cached options, if a fetch has succeeded.
    pub fn current(&self) -> Option<Arc<CharacterOptions>> {
        match &self.lock().slot {
            Slot::Ready(options) => Some(Arc::clone(options)),
            _ => None,
        }
    }

    /// Whether a fetch is currently running.
    pub fn is_fetching(&self) -> bool {
        matches!(self.lock().slot, Slot::Fetching { .. })
    }

    /// Forget the cached options so the next [`fetch`](Self::fetch) hits the
    /// backend again. A fetch already running is not stored when it lands.
    pub fn invalidate(&self) {
        self.lock().slot = Slot::Empty;
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
