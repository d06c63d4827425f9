use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ProbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Kind of biometric sample.
pub enum Modality {
    /// Fixed-length face descriptor vectors.
    Face,
    /// Encoded fingerprint images.
    Fingerprint,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Face => "face",
            Modality::Fingerprint => "fingerprint",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "face" => Ok(Self::Face),
            "fingerprint" | "finger" => Ok(Self::Fingerprint),
            _ => Err(format!("Unknown modality: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Where a comparison is computed.
pub enum Transport {
    /// In-process descriptor distance.
    Local,
    /// Remote comparison service over HTTP.
    Remote,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Local => "local",
            Transport::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Opaque sample body. Images travel base64-encoded in JSON.
pub enum SamplePayload {
    Descriptor(Vec<f32>),
    Image(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl SamplePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            SamplePayload::Descriptor(_) => "descriptor",
            SamplePayload::Image(_) => "image",
        }
    }

    /// Canonical byte form: little-endian `f32`s for descriptors, raw bytes for images.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            SamplePayload::Descriptor(values) => {
                values.iter().flat_map(|v| v.to_le_bytes()).collect()
            }
            SamplePayload::Image(bytes) => bytes.clone(),
        }
    }

    /// Returns `true` when both payloads are the same kind with identical bytes.
    ///
    /// Descriptors are compared bitwise, so `-0.0` and `0.0` differ and `NaN`
    /// components only equal themselves bit-for-bit.
    pub fn is_byte_identical(&self, other: &SamplePayload) -> bool {
        match (self, other) {
            (SamplePayload::Descriptor(a), SamplePayload::Descriptor(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (SamplePayload::Image(a), SamplePayload::Image(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_descriptor(&self) -> Option<&[f32]> {
        match self {
            SamplePayload::Descriptor(values) => Some(values),
            SamplePayload::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&[u8]> {
        match self {
            SamplePayload::Image(bytes) => Some(bytes),
            SamplePayload::Descriptor(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Public identity of an enrolled subject. Never carries template data.
pub struct SubjectProfile {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub public_fields: BTreeMap<String, String>,
}

impl SubjectProfile {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            public_fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.public_fields.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One stored reference sample for one subject-and-modality pair.
///
/// Re-enrollment replaces the whole template; it is never mutated in place.
pub struct BiometricTemplate {
    pub template_id: String,
    pub subject: SubjectProfile,
    pub modality: Modality,
    /// Free-form label such as the finger name.
    #[serde(default)]
    pub label: Option<String>,
    pub payload: SamplePayload,
    pub captured_at: DateTime<Utc>,
}

impl BiometricTemplate {
    pub fn new(
        template_id: impl Into<String>,
        subject: SubjectProfile,
        modality: Modality,
        payload: SamplePayload,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            subject,
            modality,
            label: None,
            payload,
            captured_at: Utc::now(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
/// The just-captured sample awaiting verification. Lives for one request.
pub struct ProbeSample {
    pub modality: Modality,
    pub payload: SamplePayload,
}

impl ProbeSample {
    pub fn face(descriptor: Vec<f32>) -> Self {
        Self {
            modality: Modality::Face,
            payload: SamplePayload::Descriptor(descriptor),
        }
    }

    pub fn fingerprint(image: Vec<u8>) -> Self {
        Self {
            modality: Modality::Fingerprint,
            payload: SamplePayload::Image(image),
        }
    }

    /// Builds a face probe from an optional client-side extraction.
    pub fn from_face_capture(descriptor: Option<Vec<f32>>) -> Result<Self, ProbeError> {
        descriptor.map(Self::face).ok_or(ProbeError::NoFaceDetected)
    }

    /// Builds a fingerprint probe from a base64-encoded image.
    pub fn from_fingerprint_base64(encoded: &str) -> Result<Self, ProbeError> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| ProbeError::Undecodable {
                reason: e.to_string(),
            })?;
        Ok(Self::fingerprint(bytes))
    }

    /// Checks the probe is comparable before any template is fetched.
    pub fn validate(&self, descriptor_dim: usize) -> Result<(), ProbeError> {
        match (self.modality, &self.payload) {
            (Modality::Face, SamplePayload::Descriptor(values)) => {
                if values.is_empty() {
                    return Err(ProbeError::NoFaceDetected);
                }
                if values.len() != descriptor_dim {
                    return Err(ProbeError::InvalidDimension {
                        expected: descriptor_dim,
                        actual: values.len(),
                    });
                }
                if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                    return Err(ProbeError::NonFiniteComponent { index });
                }
                Ok(())
            }
            (Modality::Fingerprint, SamplePayload::Image(bytes)) => {
                if bytes.is_empty() {
                    return Err(ProbeError::EmptyImage);
                }
                Ok(())
            }
            (modality, payload) => Err(ProbeError::ModalityMismatch {
                modality,
                payload_kind: payload.kind(),
            }),
        }
    }
}

pub(crate) mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}
