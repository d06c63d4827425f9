//! Batch matcher: runs the comparator over every template and picks the best.
//!
//! Results are folded in template enumeration order whatever the fan-out, so
//! the first-seen candidate wins exact score ties.

pub mod best_match;
pub mod error;
pub mod options;
pub mod selector;
pub mod types;


pub use best_match::find_best_match;
pub use error::MatchError;
pub use options::{CancelHandle, CancelSignal, MatchOptions};
pub use selector::BestMatchSelector;
pub use types::{BestObserved, CandidateError, MatchDecision, MatchMode, MatchWinner};
