//! Turns a raw [`MatchDecision`](crate::matcher::MatchDecision) into the
//! caller-facing [`Verdict`]. The confidence threshold is enforced here and
//! nowhere else.

pub mod policy;
pub mod verdict;


pub use policy::{DecisionPolicy, decide};
pub use verdict::{BIOMATCH_STATUS_HEADER, Verdict, VerdictStatus, VerdictSubject};
