/* 📖 # Why time-based revalidation instead of invalidating on change?

Doc pages are regenerated at most once per window (60 seconds by default): the
first request after an entry turns stale renders the page again and replaces
the entry. This needs no knowledge of which files a page depends on, and in
`watch` mode the snapshot additionally clears the cache as soon as the docs
change. A window of zero turns caching off entirely.
*/

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use docportal_base::PortalResult;

#[derive(Debug, Clone)]
struct CachedPage {
    rendered_at: Instant,
    html: Arc<str>,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped by `clear`; a render that started in an older generation is not stored.
    generation: u64,
    pages: HashMap<String, CachedPage>,
}

/// Rendered pages keyed by request path, each fresh for a fixed window.
#[derive(Debug)]
pub struct PageCache {
    revalidate: Duration,
    state: Mutex<CacheState>,
}

impl PageCache {
    pub fn new(revalidate: Duration) -> Self {
        Self {
            revalidate,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.revalidate.is_zero()
    }

    /// Value for the `Cache-Control` header of cached pages.
    pub fn cache_control(&self) -> String {
        if self.is_enabled() {
            format!("public, max-age={}", self.revalidate.as_secs())
        } else {
            "no-cache".to_string()
        }
    }

    /// The cached page for `key`, or the result of `render` (which is then cached).
    pub fn get_or_render(
        &self,
        key: &str,
        render: impl FnOnce() -> PortalResult<String>,
    ) -> PortalResult<Arc<str>> {
        self.get_or_render_at(key, Instant::now(), render)
    }

    fn get_or_render_at(
        &self,
        key: &str,
        now: Instant,
        render: impl FnOnce() -> PortalResult<String>,
    ) -> PortalResult<Arc<str>> {
        if !self.is_enabled() {
            return render().map(Arc::from);
        }
        let generation = {
            let state = self.state.lock();
            if let Some(page) = state.pages.get(key) {
                if now.saturating_duration_since(page.rendered_at) < self.revalidate {
                    trace!(key, "page cache hit");
                    return Ok(page.html.clone());
                }
            }
            state.generation
        };
        // Rendered outside the lock: concurrent misses may render twice, last one wins.
        let html: Arc<str> = Arc::from(render()?);
        let mut state = self.state.lock();
        if state.generation == generation {
            state.pages.insert(
                key.to_string(),
                CachedPage {
                    rendered_at: now,
                    html: html.clone(),
                },
            );
        } else {
            trace!(key, "cache cleared during render, not storing page");
        }
        Ok(html)
    }

    /// Drop every cached page, including pages still being rendered.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.pages.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().pages.is_empty()
    }
}
