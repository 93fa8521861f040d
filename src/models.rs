//! Modelos de dominio (quejas, resultados de análisis y payloads de alta).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proyección binaria del aspecto `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplaintType {
    Technical,
    #[serde(rename = "Non-Technical")]
    NonTechnical,
}

impl ComplaintType {
    /// Normaliza la etiqueta cruda del modelo: sólo "technical" (sin distinguir
    /// mayúsculas) es técnica; cualquier otra cosa es no técnica.
    pub fn from_raw_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("technical") {
            Self::Technical
        } else {
            Self::NonTechnical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "Technical",
            Self::NonTechnical => "Non-Technical",
        }
    }
}

impl fmt::Display for ComplaintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Umbrales sobre la puntuación compuesta: >= 0.05 positivo, <= -0.05 negativo.
    pub fn from_compound(compound: f64) -> Self {
        if compound >= 0.05 {
            Self::Positive
        } else if compound <= -0.05 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

/// Resultado del análisis de una queja. Se adjunta a la queja al crearla.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub category: String,
    pub priority: String,
    pub department: String,
    #[serde(rename = "type")]
    pub complaint_type: ComplaintType,
    pub sentiment: Option<SentimentLabel>,
    pub sentiment_score: Option<f64>,
    /// Probabilidad máxima del clasificador de categoría, en porcentaje (0-100).
    pub confidence: f64,
}

/// Estado de tramitación de una queja. Cualquier transición es válida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComplaintStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queja persistida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub department: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub complaint_type: Option<String>,
    pub contact_info: Option<String>,
    pub user_type: Option<String>,
    #[serde(default)]
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ai_analyzed: bool,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default)]
    pub sentiment: Option<SentimentLabel>,
}

/// Payload de alta de una queja. Sólo `description` es obligatoria; los campos
/// de clasificación que falten los rellena el analizador.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaint {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category: Option<String>,
    pub department: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub complaint_type: Option<String>,
    pub contact_info: Option<String>,
    pub user_type: Option<String>,
}

impl NewComplaint {
    /// `true` si falta (o está en blanco) alguno de los cuatro aspectos.
    pub fn needs_analysis(&self) -> bool {
        [
            &self.category,
            &self.priority,
            &self.department,
            &self.complaint_type,
        ]
        .iter()
        .any(|field| field.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_label_normalisation() {
        assert_eq!(ComplaintType::from_raw_label("Technical"), ComplaintType::Technical);
        assert_eq!(ComplaintType::from_raw_label(" TECHNICAL "), ComplaintType::Technical);
        assert_eq!(ComplaintType::from_raw_label("Non-Technical"), ComplaintType::NonTechnical);
        assert_eq!(ComplaintType::from_raw_label("Infrastructure"), ComplaintType::NonTechnical);
        assert_eq!(ComplaintType::from_raw_label(""), ComplaintType::NonTechnical);
    }

    #[test]
    fn sentiment_thresholds() {
        assert_eq!(SentimentLabel::from_compound(0.05), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_compound(-0.05), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_compound(0.049), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_compound(0.0), SentimentLabel::Neutral);
    }

    #[test]
    fn status_wire_format() {
        let json = serde_json::to_string(&ComplaintStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let parsed: ComplaintStatus = serde_json::from_str("\"Resolved\"").unwrap();
        assert_eq!(parsed, ComplaintStatus::Resolved);
    }

    #[test]
    fn analysis_result_uses_type_key() {
        let result = AnalysisResult {
            category: "Facilities".into(),
            priority: "High".into(),
            department: "IT".into(),
            complaint_type: ComplaintType::NonTechnical,
            sentiment: None,
            sentiment_score: None,
            confidence: 87.5,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], "Non-Technical");
        assert_eq!(value["confidence"], 87.5);
        assert!(value["sentimentScore"].is_null());
    }

    #[test]
    fn needs_analysis_when_any_aspect_missing() {
        let mut payload = NewComplaint {
            description: "El proyector del aula 3 no enciende".into(),
            category: Some("Facilities".into()),
            priority: Some("High".into()),
            department: Some("IT".into()),
            complaint_type: Some("Technical".into()),
            ..Default::default()
        };
        assert!(!payload.needs_analysis());
        payload.department = Some("  ".into());
        assert!(payload.needs_analysis());
        payload.department = None;
        assert!(payload.needs_analysis());
    }
}
