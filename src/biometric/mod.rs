//! Biometric data model: probes, stored templates and the subjects they belong to.

pub mod error;
pub mod model;


pub use error::ProbeError;
pub use model::{
    BiometricTemplate, Modality, ProbeSample, SamplePayload, SubjectProfile, Transport,
};
