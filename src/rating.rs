//! Model rating value object
//!
//! A rating is owned by exactly one model record and is never addressed on
//! its own. Numeric fields tolerate wire encodings that carry numbers as
//! text (`"0.75"`), and the nested size score may arrive as a JSON string.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Per-deployment-target size suitability, each in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeScore {
    #[serde(deserialize_with = "lenient_f64")]
    pub raspberry_pi: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub jetson_nano: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub desktop_pc: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub aws_server: f64,
}

/// Named sub-scores plus the weighted aggregate `net_score`.
///
/// Every score has a matching `*_latency` (seconds spent computing it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRating {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,

    #[serde(deserialize_with = "lenient_f64")]
    pub net_score: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub net_score_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub ramp_up_time: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ramp_up_time_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub bus_factor: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bus_factor_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub performance_claims: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub performance_claims_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub license: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub license_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub dataset_and_code_score: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub dataset_and_code_score_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub dataset_quality: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub dataset_quality_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub code_quality: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub code_quality_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub reproducibility: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub reproducibility_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub reviewedness: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub reviewedness_latency: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub tree_score: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tree_score_latency: f64,

    #[serde(deserialize_with = "lenient_size_score")]
    pub size_score: SizeScore,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub size_score_latency: f64,
}

fn default_category() -> String {
    "MODEL".to_string()
}

impl ModelRating {
    /// A rating with every score set to zero
    pub fn zeroed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: default_category(),
            net_score: 0.0,
            net_score_latency: 0.0,
            ramp_up_time: 0.0,
            ramp_up_time_latency: 0.0,
            bus_factor: 0.0,
            bus_factor_latency: 0.0,
            performance_claims: 0.0,
            performance_claims_latency: 0.0,
            license: 0.0,
            license_latency: 0.0,
            dataset_and_code_score: 0.0,
            dataset_and_code_score_latency: 0.0,
            dataset_quality: 0.0,
            dataset_quality_latency: 0.0,
            code_quality: 0.0,
            code_quality_latency: 0.0,
            reproducibility: 0.0,
            reproducibility_latency: 0.0,
            reviewedness: 0.0,
            reviewedness_latency: 0.0,
            tree_score: 0.0,
            tree_score_latency: 0.0,
            size_score: SizeScore::default(),
            size_score_latency: 0.0,
        }
    }

    /// Sub-scores by name, in a stable order (excludes the aggregate)
    pub fn sub_scores(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("ramp_up_time", self.ramp_up_time),
            ("bus_factor", self.bus_factor),
            ("performance_claims", self.performance_claims),
            ("license", self.license),
            ("dataset_and_code_score", self.dataset_and_code_score),
            ("dataset_quality", self.dataset_quality),
            ("code_quality", self.code_quality),
            ("reproducibility", self.reproducibility),
            ("reviewedness", self.reviewedness),
            ("tree_score", self.tree_score),
        ]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("expected a number, got {:?}", s))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeScoreOrText {
    Score(SizeScore),
    Text(String),
}

fn lenient_size_score<'de, D>(deserializer: D) -> Result<SizeScore, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeScoreOrText::deserialize(deserializer)? {
        SizeScoreOrText::Score(score) => Ok(score),
        SizeScoreOrText::Text(s) => serde_json::from_str(&s).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_as_text() {
        let mut value = serde_json::to_value(ModelRating::zeroed("bert")).unwrap();
        value["net_score"] = json!("0.82");
        value["license"] = json!(" 1 ");

        let rating: ModelRating = serde_json::from_value(value).unwrap();
        assert!((rating.net_score - 0.82).abs() < 1e-9);
        assert_eq!(rating.license, 1.0);
    }

    #[test]
    fn test_size_score_as_text() {
        let mut value = serde_json::to_value(ModelRating::zeroed("bert")).unwrap();
        value["size_score"] = json!(r#"{"raspberry_pi": "0.1", "jetson_nano": 0.2, "desktop_pc": 0.9, "aws_server": 1.0}"#);

        let rating: ModelRating = serde_json::from_value(value).unwrap();
        assert_eq!(rating.size_score.raspberry_pi, 0.1);
        assert_eq!(rating.size_score.aws_server, 1.0);
    }

    #[test]
    fn test_missing_latencies_default() {
        let mut value = serde_json::to_value(ModelRating::zeroed("bert")).unwrap();
        value.as_object_mut().unwrap().remove("bus_factor_latency");
        value.as_object_mut().unwrap().remove("category");

        let rating: ModelRating = serde_json::from_value(value).unwrap();
        assert_eq!(rating.bus_factor_latency, 0.0);
        assert_eq!(rating.category, "MODEL");
    }

    #[test]
    fn test_non_numeric_text_rejected() {
        let mut value = serde_json::to_value(ModelRating::zeroed("bert")).unwrap();
        value["bus_factor"] = json!("high");
        assert!(serde_json::from_value::<ModelRating>(value).is_err());
    }
}
