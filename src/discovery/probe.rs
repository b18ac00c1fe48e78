//! Prober - single-flight discovery probe with a replace-only cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use reflection_bridge::{BridgeError, ProbeResult, ReflectionBridge};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::status::DiscoveryStatus;
use super::store::ProbeStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("A discovery probe is already running")]
    AlreadyProbing,

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl ProbeError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyProbing => "ALREADY_PROBING",
            Self::Bridge(e) => e.code(),
        }
    }
}

/// Holds the probing flag for the lifetime of one probe.
/// Released on drop, so a cancelled probe also returns to idle.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Prober {
    bridge: Arc<dyn ReflectionBridge>,
    store: Option<Arc<dyn ProbeStore>>,
    probing: AtomicBool,
    cache: RwLock<Option<ProbeResult>>,
    last_failure: Mutex<Option<BridgeError>>,
}

impl Prober {
    pub fn new(bridge: Arc<dyn ReflectionBridge>) -> Self {
        Self {
            bridge,
            store: None,
            probing: AtomicBool::new(false),
            cache: RwLock::new(None),
            last_failure: Mutex::new(None),
        }
    }

    /// Persist every successful probe to `store` and fall back to it in
    /// [`load_persisted`](Self::load_persisted).
    pub fn with_store(mut self, store: Arc<dyn ProbeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Run the discovery battery.
    ///
    /// A success replaces the cached result wholesale; roles missing from the
    /// new result are gone. A failure leaves the cached result untouched.
    pub async fn probe(&self, force: bool) -> Result<ProbeResult, ProbeError> {
        let _in_flight = InFlight::acquire(&self.probing).ok_or(ProbeError::AlreadyProbing)?;
        debug!(force, "discovery probe started");

        match self.bridge.probe(force).await {
            Ok(result) => {
                info!(
                    force,
                    found = result.found_count(),
                    total = result.total(),
                    "discovery probe complete"
                );
                self.replace_cache(Some(result.clone()));
                *self.failure_slot() = None;

                if let Some(store) = &self.store {
                    if let Err(e) = store.save(&result).await {
                        warn!(error = %e, "failed to persist discovery result");
                    }
                }
                Ok(result)
            }
            Err(e) => {
                warn!(force, code = e.code(), error = %e, "discovery probe failed");
                *self.failure_slot() = Some(e.clone());
                Err(ProbeError::Bridge(e))
            }
        }
    }

    /// Warm the cache at session start from the bridge's saved result, or the
    /// local store when the bridge has none.
    ///
    /// Best effort: absence and errors leave the cache empty. A result already
    /// obtained by `probe` in this session is never overwritten.
    pub async fn load_persisted(&self) -> Option<ProbeResult> {
        let loaded = match self.bridge.load_persisted_probe().await {
            Ok(result) => Some(result),
            Err(e) => {
                debug!(error = %e, "bridge has no saved discovery result");
                self.load_from_store().await
            }
        }?;

        let mut cache = self.cache.write().unwrap_or_else(|p| p.into_inner());
        if cache.is_some() {
            debug!("discovery cache already populated, keeping it");
            return cache.clone();
        }
        info!(
            found = loaded.found_count(),
            total = loaded.total(),
            "loaded saved discovery result"
        );
        *cache = Some(loaded.clone());
        Some(loaded)
    }

    async fn load_from_store(&self) -> Option<ProbeResult> {
        let store = self.store.as_ref()?;
        match store.load().await {
            Ok(result) => result,
            Err(e) => {
                debug!(error = %e, "no usable local discovery result");
                None
            }
        }
    }

    fn replace_cache(&self, result: Option<ProbeResult>) {
        *self.cache.write().unwrap_or_else(|p| p.into_inner()) = result;
    }

    fn failure_slot(&self) -> std::sync::MutexGuard<'_, Option<BridgeError>> {
        self.last_failure.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn cached(&self) -> Option<ProbeResult> {
        self.cache.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Discovered path for `role`, if the cached result has one.
    pub fn resolve(&self, role: &str) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .and_then(|r| r.resolve(role))
            .map(str::to_string)
    }

    pub fn is_probing(&self) -> bool {
        self.probing.load(Ordering::Acquire)
    }

    /// The error of the most recent probe, cleared by the next success.
    pub fn last_failure(&self) -> Option<BridgeError> {
        self.failure_slot().clone()
    }

    /// Indicator for the cached result. Marked as failed when the most
    /// recent probe failed and no probe is running.
    pub fn status(&self) -> DiscoveryStatus {
        let cached = self.cached();
        let probing = self.is_probing();
        if !probing && self.failure_slot().is_some() {
            return DiscoveryStatus::failed(cached.as_ref());
        }
        DiscoveryStatus::of(cached.as_ref(), probing)
    }

    /// Tooltip text for [`status`](Self::status), with the bridge error when
    /// the last probe failed.
    pub fn status_detail(&self) -> String {
        let status = self.status();
        match self.last_failure().filter(|_| status.is_failure()) {
            Some(e) => format!("{}: {e}", status.describe()),
            None => status.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_flag_is_exclusive_and_released() {
        let flag = AtomicBool::new(false);
        let first = InFlight::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlight::acquire(&flag).is_none());

        drop(first);
        assert!(!flag.load(Ordering::Acquire));
        assert!(InFlight::acquire(&flag).is_some());
    }
}
