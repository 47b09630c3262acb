//! Search-to-enrichment orchestration for SkyCast.
//!
//! A [`Session`] turns raw query text into a race-free set of city cards,
//! each enriched with current weather and favorite status, and drives the
//! detail view and the favorites list. All state lives in one
//! [`StateStore`] and is published as immutable [`SessionState`] snapshots.

pub mod detail;
pub mod enrichment;
pub mod favorites;
pub mod search;
pub mod session;
pub mod state;

pub use detail::DetailController;
pub use enrichment::{EnrichmentCoordinator, MergeOutcome};
pub use favorites::FavoriteToggleController;
pub use search::{SearchOrchestrator, SearchSettings};
pub use session::{Session, SessionClients};
pub use state::{CityCard, SessionState, StateStore};
