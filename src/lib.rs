//! Biomatch library crate (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! ## Verification pipeline
//! - [`TemplateStore`], [`HttpTemplateStore`] - Enrolled template access
//! - [`PairComparator`], [`DescriptorComparator`], [`RemoteComparator`] - One-to-one comparison
//! - [`find_best_match`], [`MatchOptions`], [`MatchDecision`] - One-to-many matching
//! - [`FallbackController`] - Batch call with per-candidate fallback for cold services
//! - [`decide`], [`DecisionPolicy`], [`Verdict`] - Threshold enforcement and caller-facing result
//! - [`Verifier`] - The whole flow for one modality
//!
//! ## Supporting modules
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`AuditSink`], [`HttpAuditSink`] - Outcome records for attendance
//! - [`gateway`] - Axum routes
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod audit;
pub mod biometric;
pub mod compare;
pub mod config;
pub mod constants;
pub mod decision;
pub mod fallback;
pub mod gateway;
pub mod hashing;
pub mod matcher;
pub mod store;
pub mod verifier;

pub use audit::{AuditError, AuditRecord, AuditSink, HttpAuditSink, NoopAuditSink};
#[cfg(any(test, feature = "mock"))]
pub use audit::MockAuditSink;
pub use biometric::{
    BiometricTemplate, Modality, ProbeError, ProbeSample, SamplePayload, SubjectProfile, Transport,
};
#[cfg(any(test, feature = "mock"))]
pub use compare::{MockBatchMode, MockComparator};
pub use compare::{
    ComparatorError, ComparisonResult, DescriptorComparator, PairComparator, RawComparison,
    ReadinessGate, RemoteComparator, RemoteComparatorConfig, compare, refresh_readiness,
};
pub use config::{Config, ConfigError};
pub use decision::{
    BIOMATCH_STATUS_HEADER, DecisionPolicy, Verdict, VerdictStatus, VerdictSubject, decide,
};
pub use fallback::{
    BatchComparator, BatchOutcome, FallbackConfig, FallbackController, FallbackRun, FallbackState,
};
pub use hashing::{payload_digest, payload_digest_hex};
pub use matcher::{
    CancelHandle, CancelSignal, CandidateError, MatchDecision, MatchError, MatchMode,
    MatchOptions, find_best_match,
};
#[cfg(any(test, feature = "mock"))]
pub use store::MockTemplateStore;
pub use store::{HttpTemplateStore, StoreError, TemplateStore};
pub use verifier::{Verifier, VerifyContext, VerifyError};
