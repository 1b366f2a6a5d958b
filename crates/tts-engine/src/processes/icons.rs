//! Icon lookup for process groups.
//!
//! How an icon is produced is up to the [`IconProvider`]. The registry only
//! sees an opaque [`ImageBlob`] and relies on [`IconCache`] to remember every
//! answer, including "no icon", for the lifetime of the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::debug;
use tts_core::ImageBlob;

use crate::bus::isolate;

/// Errors an icon provider may report. Never surfaced past the cache.
#[derive(Debug, Error)]
pub enum IconError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no usable icon in {0}")]
    Unsupported(PathBuf),
}

/// Produces an icon image for an executable path.
///
/// Implementations must return in bounded time.
pub trait IconProvider: Send + Sync {
    fn resolve_icon(&self, executable: &Path) -> Result<Option<ImageBlob>, IconError>;
}

/// Provider for platforms without icon extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIcons;

impl IconProvider for NoIcons {
    fn resolve_icon(&self, _executable: &Path) -> Result<Option<ImageBlob>, IconError> {
        Ok(None)
    }
}

/// Process-lifetime cache of icon lookups keyed by executable path.
pub struct IconCache {
    provider: Arc<dyn IconProvider>,
    entries: Mutex<HashMap<PathBuf, Option<ImageBlob>>>,
}

impl IconCache {
    pub fn new(provider: Arc<dyn IconProvider>) -> Self {
        Self {
            provider,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the icon for `executable`, asking the provider at most once.
    ///
    /// Provider errors and panics yield `None`, which is cached like any
    /// other answer.
    pub fn get(&self, executable: &Path) -> Option<ImageBlob> {
        if let Some(cached) = self.lock().get(executable) {
            return cached.clone();
        }

        // Provider runs without the lock so slow lookups don't serialize.
        let mut resolved = None;
        let completed = isolate("icon provider", || {
            resolved = match self.provider.resolve_icon(executable) {
                Ok(icon) => icon,
                Err(e) => {
                    debug!(path = %executable.display(), error = %e, "Icon lookup failed");
                    None
                }
            };
        });
        if !completed {
            resolved = None;
        }

        self.lock()
            .entry(executable.to_path_buf())
            .or_insert(resolved)
            .clone()
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Option<ImageBlob>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new(Arc::new(NoIcons))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    impl IconProvider for Counting {
        fn resolve_icon(&self, executable: &Path) -> Result<Option<ImageBlob>, IconError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match executable.to_str() {
                Some("/bin/ok") => Ok(Some(ImageBlob::new(vec![1u8, 2, 3]))),
                Some("/bin/none") => Ok(None),
                Some("/bin/panic") => panic!("decoder crashed"),
                _ => Err(IconError::Unsupported(executable.to_path_buf())),
            }
        }
    }

    fn cache() -> (Arc<Counting>, IconCache) {
        let provider = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let cache = IconCache::new(provider.clone());
        (provider, cache)
    }

    #[test]
    fn test_repeated_lookup_hits_cache() {
        let (provider, cache) = cache();
        let first = cache.get(Path::new("/bin/ok"));
        let second = cache.get(Path::new("/bin/ok"));

        assert_eq!(first, second);
        assert_eq!(first.map(|b| b.len()), Some(3));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_yields_no_icon_and_is_cached() {
        let (provider, cache) = cache();
        assert_eq!(cache.get(Path::new("/bin/broken")), None);
        assert_eq!(cache.get(Path::new("/bin/broken")), None);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_provider_panic_yields_no_icon() {
        let (_, cache) = cache();
        assert_eq!(cache.get(Path::new("/bin/panic")), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_no_icons_provider() {
        let cache = IconCache::default();
        assert_eq!(cache.get(Path::new("/usr/bin/env")), None);
        assert!(!cache.is_empty());
    }
}
