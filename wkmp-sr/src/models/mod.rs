//! Data models for the search & rank engine

pub mod filter_state;
pub mod preset;
pub mod ranking_context;
pub mod record;
pub mod search_session;
pub mod weights;

pub use filter_state::{FilterState, FilterUpdate};
pub use preset::{Preset, PresetFilter};
pub use ranking_context::RankingContext;
pub use record::{normalize_format, RawCandidate, RecordId, ResultRecord, TrackStatus};
pub use search_session::{SearchSession, SearchState, StateTransition};
pub use weights::{WeightComponent, WeightVector};
