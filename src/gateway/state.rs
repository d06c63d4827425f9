use std::sync::Arc;

use crate::biometric::Modality;
use crate::verifier::Verifier;

#[derive(Clone)]
pub struct HandlerState {
    pub face: Arc<Verifier>,

    pub fingerprint: Arc<Verifier>,
}

impl HandlerState {
    pub fn new(face: Arc<Verifier>, fingerprint: Arc<Verifier>) -> Self {
        Self { face, fingerprint }
    }

    pub fn verifier(&self, modality: Modality) -> &Arc<Verifier> {
        match modality {
            Modality::Face => &self.face,
            Modality::Fingerprint => &self.fingerprint,
        }
    }
}
