//! End-to-end verification: validate, fetch, match, decide, audit.

pub mod context;
pub mod error;
pub mod service;


pub use context::VerifyContext;
pub use error::VerifyError;
pub use service::Verifier;
