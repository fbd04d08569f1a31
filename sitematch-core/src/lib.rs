//! Core types and service wiring for the sitematch address reconciler.

/// Business-name hint rules used to disambiguate geocoding queries.
pub mod hints;
/// Greedy one-to-one matching between two address lists.
pub mod matcher;
/// Domain models shared by the matcher, the providers, and clients.
pub mod model;
/// Canonical address form used for exact comparisons.
pub mod normalize;
/// Ordered registry of geocoding providers and the rotation cursor.
pub mod plugin;
/// Traits describing the geocoding provider interface.
pub mod ports;
/// Request counters and rate limits tracked per provider.
pub mod quota;
/// High-level geocoding facade used by clients.
pub mod service;
/// Tunables for matching and geocoding.
pub mod settings;
/// Similarity score between two canonical addresses.
pub mod similarity;

pub use hints::*;
pub use matcher::*;
pub use model::*;
pub use normalize::*;
pub use plugin::*;
pub use ports::*;
pub use quota::*;
pub use service::*;
pub use settings::*;
pub use similarity::*;
