//! Serialization boundary between domain entities and flat records
//!
//! Encoding always produces structured JSON. Decoding accepts a document
//! either as a structure or as JSON text (including text that itself wraps
//! a JSON string once more), since backends differ in what they hand back.
//! A document that cannot be decoded is reported as `CorruptRecord`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::{Error, Result};
use crate::artifact::{normalize_name, Artifact};
use crate::rating::ModelRating;
use crate::storage::ArtifactRecord;

/// Encode an artifact as its stored document
pub fn encode_artifact(artifact: &Artifact) -> Result<Value> {
    serde_json::to_value(artifact).map_err(|e| Error::corrupt(artifact.id(), e))
}

/// Decode a stored artifact document; `id` is only used for error context
pub fn decode_artifact(id: &str, document: &Value) -> Result<Artifact> {
    decode_document(id, document)
}

pub fn encode_rating(rating: &ModelRating) -> Result<Value> {
    serde_json::to_value(rating).map_err(|e| Error::corrupt(&rating.name, e))
}

/// Decode a stored rating. Absence (missing attribute, `null`, or empty
/// text) is `Ok(None)`, not an error.
pub fn decode_rating(id: &str, document: Option<&Value>) -> Result<Option<ModelRating>> {
    match document {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(doc) => decode_document(id, doc).map(Some),
    }
}

fn decode_document<T: DeserializeOwned>(id: &str, document: &Value) -> Result<T> {
    let mut current = document.clone();
    // Text may wrap JSON text once more (double-encoded attribute)
    for _ in 0..2 {
        match current {
            Value::String(text) => {
                current = serde_json::from_str(&text).map_err(|e| Error::corrupt(id, e))?;
            }
            structured => return serde_json::from_value(structured).map_err(|e| Error::corrupt(id, e)),
        }
    }
    serde_json::from_value(current).map_err(|e| Error::corrupt(id, e))
}

/// Project an artifact onto a fresh record.
///
/// Link, hint, and rating fields start empty; the linker and the registry
/// fill them in for models. `name_normalized` is derived here and nowhere
/// else.
pub fn to_record(artifact: &Artifact) -> Result<ArtifactRecord> {
    Ok(ArtifactRecord {
        id: artifact.metadata.id.clone(),
        artifact_type: artifact.metadata.artifact_type,
        artifact: encode_artifact(artifact)?,
        url: artifact.data.url.clone(),
        name_normalized: normalize_name(&artifact.metadata.name),
        rating: None,
        dataset_id: None,
        dataset_name: None,
        dataset_url: None,
        code_id: None,
        code_name: None,
        code_url: None,
    })
}

/// Decode the artifact held by a record, checking it against the record's
/// own id and type attributes.
pub fn record_artifact(record: &ArtifactRecord) -> Result<Artifact> {
    let artifact = decode_artifact(&record.id, &record.artifact)?;
    if artifact.metadata.artifact_type != record.artifact_type {
        return Err(Error::corrupt(
            &record.id,
            format!(
                "document type {} disagrees with record type {}",
                artifact.metadata.artifact_type, record.artifact_type
            ),
        ));
    }
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactType;
    use serde_json::json;

    fn sample() -> Artifact {
        Artifact::new(ArtifactType::Model, "ResNet-50", "https://hf.co/resnet")
            .with_id("m1")
            .with_version("1.0.0")
            .with_payload(json!({"card": {"license": "apache-2.0"}}))
    }

    #[test]
    fn test_artifact_roundtrip() {
        let artifact = sample();
        let encoded = encode_artifact(&artifact).unwrap();
        assert_eq!(decode_artifact("m1", &encoded).unwrap(), artifact);

        let minimal = Artifact::new(ArtifactType::Code, "x", "u").with_id("c1");
        let encoded = encode_artifact(&minimal).unwrap();
        assert_eq!(decode_artifact("c1", &encoded).unwrap(), minimal);
    }

    #[test]
    fn test_decode_accepts_text_forms() {
        let artifact = sample();
        let text = serde_json::to_string(&artifact).unwrap();

        let from_text = decode_artifact("m1", &Value::String(text.clone())).unwrap();
        assert_eq!(from_text, artifact);

        let double = Value::String(serde_json::to_string(&text).unwrap());
        assert_eq!(decode_artifact("m1", &double).unwrap(), artifact);
    }

    #[test]
    fn test_decode_corrupt_is_error() {
        let err = decode_artifact("m1", &Value::String("{not json".into())).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { ref id, .. } if id == "m1"));

        // Parses, but required fields are missing
        let err = decode_artifact("m1", &json!({"metadata": {"name": "x"}})).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
    }

    #[test]
    fn test_rating_absent_vs_corrupt() {
        assert!(decode_rating("m1", None).unwrap().is_none());
        assert!(decode_rating("m1", Some(&Value::Null)).unwrap().is_none());
        assert!(decode_rating("m1", Some(&json!(""))).unwrap().is_none());
        assert!(decode_rating("m1", Some(&json!({"name": "x"}))).is_err());

        let rating = ModelRating::zeroed("bert");
        let encoded = encode_rating(&rating).unwrap();
        assert_eq!(decode_rating("m1", Some(&encoded)).unwrap(), Some(rating.clone()));

        let as_text = Value::String(encoded.to_string());
        assert_eq!(decode_rating("m1", Some(&as_text)).unwrap(), Some(rating));
    }

    #[test]
    fn test_to_record_normalizes_name() {
        let mut artifact = sample();
        artifact.metadata.name = "  ResNet-50 ".to_string();
        let record = to_record(&artifact).unwrap();
        assert_eq!(record.name_normalized, "resnet-50");
        assert_eq!(record.url, "https://hf.co/resnet");
        assert!(record.rating.is_none());
    }

    #[test]
    fn test_record_type_disagreement_is_corrupt() {
        let mut record = to_record(&sample()).unwrap();
        record.artifact_type = ArtifactType::Dataset;
        assert!(matches!(record_artifact(&record), Err(Error::CorruptRecord { .. })));
    }
}
