//! High-level geocoding facade rotating across all registered providers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hints::HintBook;
use crate::model::{BatchProgress, Coordinates, ProviderMeta};
use crate::plugin::ProviderRegistry;
use crate::ports::{GeocodeError, GeocodePort};
use crate::settings::GeocodingSettings;

/// Public entry point for resolving addresses to coordinates.
pub struct GeocodingService {
    registry: Mutex<ProviderRegistry>,
    hints: HintBook,
    call_timeout: Duration,
    progress_every: usize,
    batch_pause: Duration,
}

impl GeocodingService {
    /// Create a new service bound to the provided registry, with default settings.
    #[must_use]
    pub fn new(registry: ProviderRegistry) -> Self {
        Self::from_settings(registry, &GeocodingSettings::default())
    }

    /// Create a new service bound to the provided registry.
    #[must_use]
    pub fn from_settings(registry: ProviderRegistry, settings: &GeocodingSettings) -> Self {
        Self {
            registry: Mutex::new(registry),
            hints: HintBook::default(),
            call_timeout: settings.call_timeout(),
            progress_every: settings.progress_every.max(1),
            batch_pause: settings.batch_pause(),
        }
    }

    /// Replace the business hint rules.
    #[must_use]
    pub fn with_hints(mut self, hints: HintBook) -> Self {
        self.hints = hints;
        self
    }

    /// Replace the per-call timeout.
    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Replace the pause between batch addresses.
    #[must_use]
    pub fn with_batch_pause(mut self, batch_pause: Duration) -> Self {
        self.batch_pause = batch_pause;
        self
    }

    /// Metadata for all registered providers, in rotation order.
    pub async fn providers(&self) -> Vec<ProviderMeta> {
        self.registry.lock().await.providers()
    }

    /// Index of the provider that served the last successful lookup.
    pub async fn last_used_index(&self) -> Option<usize> {
        self.registry.lock().await.last_used()
    }

    /// Resolve an address with one full rotation over the providers.
    pub async fn geocode_address(&self, address: &str) -> Option<Coordinates> {
        self.rotate(address, None).await
    }

    /// Resolve an address, retrying with hints derived from the business at that address.
    ///
    /// Order of attempts: the plain address, then each business hint, then the business name
    /// itself. Every attempt is a full rotation.
    pub async fn enhanced_geocode(
        &self,
        address: &str,
        business_name: Option<&str>,
    ) -> Option<Coordinates> {
        if let Some(coordinates) = self.geocode_address(address).await {
            return Some(coordinates);
        }

        let business = business_name.map(str::trim).filter(|name| !name.is_empty())?;

        for hint in self.hints.hints_for(business) {
            if let Some(coordinates) = self.rotate(address, Some(&hint)).await {
                info!(address, hint = %hint, "address resolved with business hint");
                return Some(coordinates);
            }
        }

        let outcome = self.rotate(address, Some(business)).await;
        if outcome.is_none() {
            info!(address, business, "no coordinates available");
        }
        outcome
    }

    /// Resolve addresses one after another.
    ///
    /// Results are keyed by the input string; repeated inputs are resolved once. `on_progress`
    /// fires after every `progress_every` addresses and once at the end. Flipping `cancel` to
    /// `true` stops the batch, dropping the in-flight call.
    pub async fn batch_geocode<S, F>(
        &self,
        addresses: &[S],
        mut cancel: watch::Receiver<bool>,
        mut on_progress: F,
    ) -> HashMap<String, Option<Coordinates>>
    where
        S: AsRef<str>,
        F: FnMut(BatchProgress),
    {
        let mut progress = BatchProgress {
            processed: 0,
            total: addresses.len(),
            succeeded: 0,
        };
        let mut results: HashMap<String, Option<Coordinates>> = HashMap::new();
        let mut issued_any = false;

        for address in addresses {
            let address = address.as_ref();
            if *cancel.borrow() {
                info!(processed = progress.processed, "batch geocoding cancelled");
                break;
            }

            let outcome = if let Some(previous) = results.get(address) {
                *previous
            } else {
                let pause = if issued_any {
                    self.batch_pause
                } else {
                    Duration::ZERO
                };
                issued_any = true;

                let call = async {
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                    self.geocode_address(address).await
                };

                tokio::select! {
                    outcome = call => outcome,
                    () = cancelled(&mut cancel) => {
                        info!(processed = progress.processed, "batch geocoding cancelled");
                        break;
                    }
                }
            };

            results.insert(address.to_owned(), outcome);
            progress.processed += 1;
            if outcome.is_some() {
                progress.succeeded += 1;
            }

            if progress.processed.is_multiple_of(self.progress_every)
                && progress.processed < progress.total
            {
                report(&mut on_progress, progress);
            }
        }

        report(&mut on_progress, progress);
        results
    }

    async fn rotate(&self, address: &str, hint: Option<&str>) -> Option<Coordinates> {
        let mut registry = self.registry.lock().await;
        let mut resolved = None;

        for (index, port) in registry.rotation() {
            let provider = port.provider().id.clone();
            if !port.has_quota() && !self.cool_down(port.as_ref()).await {
                debug!(provider = %provider, "quota exhausted, skipping provider");
                continue;
            }

            debug!(provider = %provider, address, hint, "geocoding attempt");
            match self.attempt(port, address, hint).await {
                Ok(Some(coordinates)) => {
                    resolved = Some((index, provider, coordinates));
                    break;
                }
                Ok(None) => debug!(provider = %provider, "provider returned no coordinates"),
                Err(err) => warn!(provider = %provider, error = %err, "geocoding attempt failed"),
            }
        }

        let (index, provider, coordinates) = resolved?;
        registry.record_success(index);
        debug!(provider = %provider, index, %coordinates, "address resolved");
        Some(coordinates)
    }

    // A rate-limited provider is waited for when its interval fits inside the call timeout.
    async fn cool_down(&self, port: &dyn GeocodePort) -> bool {
        let Some(wait) = port.cooldown().filter(|wait| *wait <= self.call_timeout) else {
            return false;
        };
        debug!(
            provider = %port.provider().id,
            wait_ms = wait.as_millis(),
            "waiting for rate limit"
        );
        tokio::time::sleep(wait).await;
        true
    }

    // Runs the call on its own task so a panicking adapter counts as a failed attempt.
    async fn attempt(
        &self,
        port: &Arc<dyn GeocodePort>,
        address: &str,
        hint: Option<&str>,
    ) -> Result<Option<Coordinates>, GeocodeError> {
        let port = Arc::clone(port);
        let address = address.to_owned();
        let hint = hint.map(str::to_owned);
        let mut task = AbortOnDrop(tokio::spawn(async move {
            port.geocode(&address, hint.as_deref()).await
        }));

        match tokio::time::timeout(self.call_timeout, &mut task.0).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(join_err)) => Err(GeocodeError::Internal(join_err.to_string())),
            Err(_elapsed) => Err(GeocodeError::Timeout(self.call_timeout)),
        }
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Resolves once `cancel` flips to `true`; never, if every sender is gone first.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let sender_gone = cancel.wait_for(|flag| *flag).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

fn report<F: FnMut(BatchProgress)>(on_progress: &mut F, progress: BatchProgress) {
    info!(
        processed = progress.processed,
        total = progress.total,
        succeeded = progress.succeeded,
        failed = progress.failed(),
        "batch geocoding progress"
    );
    on_progress(progress);
}
