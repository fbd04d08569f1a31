//! Ordered registry of geocoding providers and the rotation cursor.

use std::sync::Arc;

use crate::model::ProviderMeta;
use crate::ports::GeocodePort;

/// Providers in rotation order plus the index of the last one that succeeded.
///
/// The cursor only moves on success, so a provider that keeps failing never becomes the
/// starting point of the next rotation.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn GeocodePort>>,
    last_used: Option<usize>,
}

impl ProviderRegistry {
    /// Build a registry from the provided ports, keeping their order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn GeocodePort>>) -> Self {
        Self {
            providers,
            last_used: None,
        }
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Metadata for all registered providers, in rotation order.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderMeta> {
        self.providers
            .iter()
            .map(|port| port.provider().clone())
            .collect()
    }

    /// Index of the provider that served the last successful lookup.
    #[must_use]
    pub fn last_used(&self) -> Option<usize> {
        self.last_used
    }

    /// One full cycle of `(index, port)` pairs starting after the last successful provider.
    pub fn rotation(&self) -> impl Iterator<Item = (usize, &Arc<dyn GeocodePort>)> {
        let count = self.providers.len();
        let start = self.last_used.map_or(0, |index| index + 1);
        (0..count).filter_map(move |offset| {
            let index = (start + offset).checked_rem(count)?;
            self.providers.get(index).map(|port| (index, port))
        })
    }

    /// Record that the provider at `index` produced a result.
    pub fn record_success(&mut self, index: usize) {
        if index < self.providers.len() {
            self.last_used = Some(index);
        }
    }
}
