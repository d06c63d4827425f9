//! Template store client: lists enrolled templates for active subjects.
//!
//! An empty listing means "no registrations" and is a normal outcome. Only a
//! store that cannot be reached (or answers garbage) is an error. A single
//! undecodable row is reported next to the good ones and the listing goes on.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use client::{
    HttpTemplateStore, RejectedTemplate, TemplateListResponse, TemplateListing, TemplateStore,
};
pub use error::StoreError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTemplateStore;
