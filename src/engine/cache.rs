use crate::engine::catalog::{parse_listing, ProviderCatalog};
use crate::engine::runner::CommandRunner;
use crate::engine::EngineCommand;
use crate::shared::logging::{EventSink, Level, NullSink};
use crate::shared::time::now_secs;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
struct CachedCatalog {
    catalog: ProviderCatalog,
    fetched_at: i64,
}

/// Result of a provider lookup. A failed refresh yields an empty catalog
/// plus the runner's error text instead of an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderLookup {
    pub catalog: ProviderCatalog,
    pub error: Option<String>,
    pub from_cache: bool,
}

/// TTL cache in front of `<engine> --listmodels`.
///
/// The check-fetch-store sequence runs under one lock, so concurrent
/// callers never trigger duplicate engine invocations.
pub struct MetadataCache {
    runner: Arc<dyn CommandRunner>,
    engine: EngineCommand,
    ttl_secs: i64,
    state: Mutex<Option<CachedCatalog>>,
    sink: Arc<dyn EventSink>,
}

impl MetadataCache {
    pub fn new(runner: Arc<dyn CommandRunner>, engine: EngineCommand) -> Self {
        Self {
            runner,
            engine,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            state: Mutex::new(None),
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn providers(&self) -> ProviderLookup {
        self.providers_at(now_secs())
    }

    pub fn providers_at(&self, now: i64) -> ProviderLookup {
        let mut state = self.lock_state();

        if let Some(cached) = state.as_ref() {
            if now - cached.fetched_at < self.ttl_secs {
                self.sink.emit(Level::Debug, "cache.hit", "using cached models", &[]);
                return ProviderLookup {
                    catalog: cached.catalog.clone(),
                    error: None,
                    from_cache: true,
                };
            }
        }

        let result = self.runner.run(&self.engine.list_models(), None, true);
        if !result.success {
            self.sink.emit(
                Level::Error,
                "cache.refresh_failed",
                &format!("failed to fetch models: {}", result.stderr),
                &[],
            );
            return ProviderLookup {
                catalog: ProviderCatalog::new(),
                error: Some(result.stderr),
                from_cache: false,
            };
        }

        let catalog = parse_listing(&result.stdout);
        self.sink.emit(
            Level::Info,
            "cache.refresh",
            "fetched models",
            &[("providers", Value::from(catalog.len()))],
        );
        *state = Some(CachedCatalog {
            catalog: catalog.clone(),
            fetched_at: now,
        });
        ProviderLookup {
            catalog,
            error: None,
            from_cache: false,
        }
    }

    /// Drops the cached catalog so the next lookup refetches.
    pub fn invalidate(&self) {
        *self.lock_state() = None;
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<CachedCatalog>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::runner::ProcessResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingRunner {
        calls: AtomicUsize,
        result: ProcessResult,
        delay: Duration,
    }

    impl CountingRunner {
        fn new(result: ProcessResult) -> Arc<Self> {
            Self::slow(result, Duration::ZERO)
        }

        fn slow(result: ProcessResult, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result,
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CommandRunner for CountingRunner {
        fn run(&self, command: &[String], _input: Option<&str>, allow_retry: bool) -> ProcessResult {
            assert_eq!(command[1], "--listmodels");
            assert!(allow_retry);
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.result.clone()
        }
    }

    const LISTING: &str = "Available models:\nOpenAI\n[1] gpt-4\n";

    #[test]
    fn second_lookup_within_ttl_reuses_catalog() {
        let runner = CountingRunner::new(ProcessResult::ok(LISTING));
        let cache = MetadataCache::new(runner.clone(), EngineCommand::default());

        let first = cache.providers_at(1_000);
        let second = cache.providers_at(1_299);

        assert_eq!(runner.calls(), 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.catalog, second.catalog);
    }

    #[test]
    fn concurrent_lookups_share_one_fetch() {
        let runner = CountingRunner::slow(ProcessResult::ok(LISTING), Duration::from_millis(100));
        let cache = MetadataCache::new(runner.clone(), EngineCommand::default());

        let lookups: Vec<ProviderLookup> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.providers_at(1_000)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("lookup thread"))
                .collect()
        });

        assert_eq!(runner.calls(), 1);
        assert_eq!(lookups.iter().filter(|lookup| !lookup.from_cache).count(), 1);
        assert!(lookups.iter().all(|lookup| lookup.catalog.contains("OpenAI")));
    }

    #[test]
    fn lookup_after_ttl_refetches() {
        let runner = CountingRunner::new(ProcessResult::ok(LISTING));
        let cache = MetadataCache::new(runner.clone(), EngineCommand::default());

        cache.providers_at(1_000);
        cache.providers_at(1_300);

        assert_eq!(runner.calls(), 2);
    }

    #[test]
    fn failed_fetch_returns_empty_catalog_and_is_not_cached() {
        let runner = CountingRunner::new(ProcessResult::failed("no api key"));
        let cache = MetadataCache::new(runner.clone(), EngineCommand::default());

        let lookup = cache.providers_at(10);
        assert!(lookup.catalog.is_empty());
        assert_eq!(lookup.error.as_deref(), Some("no api key"));

        cache.providers_at(11);
        assert_eq!(runner.calls(), 2);
    }

    #[test]
    fn invalidate_forces_refetch() {
        let runner = CountingRunner::new(ProcessResult::ok(LISTING));
        let cache = MetadataCache::new(runner.clone(), EngineCommand::default());
        cache.providers_at(0);
        cache.invalidate();
        cache.providers_at(1);
        assert_eq!(runner.calls(), 2);
    }
}
