//! Ensamblado del análisis de una queja.
//!
//! Flujo de `ComplaintAnalyzer::analyze`:
//!   1. Rechaza texto vacío o demasiado largo.
//!   2. Si los modelos no se cargaron al arrancar, devuelve `ModelsUnavailable`.
//!   3. Calcula el vector de características una sola vez y lo pasa a los
//!      cuatro clasificadores.
//!   4. Proyecta `type` a {Technical, Non-Technical}.
//!   5. La confianza es la probabilidad máxima del clasificador de categoría.
//!      Limitación conocida: ignora la certeza de los otros tres aspectos.
//!   6. El sentimiento se calcula aparte; si falla, se omite.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::classifier::{Aspect, NaiveBayesModel, Prediction};
use crate::error::{text_fingerprint, AnalysisError, ModelLoadError};
use crate::features::Vocabulary;
use crate::models::{AnalysisResult, ComplaintType, SentimentLabel};
use crate::sentiment::SentimentScorer;

pub const DEFAULT_MAX_COMPLAINT_CHARS: usize = 5000;

/// Los cuatro modelos por aspecto.
#[derive(Debug, Clone)]
pub struct AspectModels {
    pub category: NaiveBayesModel,
    pub priority: NaiveBayesModel,
    pub department: NaiveBayesModel,
    pub complaint_type: NaiveBayesModel,
}

impl AspectModels {
    pub fn get(&self, aspect: Aspect) -> &NaiveBayesModel {
        match aspect {
            Aspect::Category => &self.category,
            Aspect::Priority => &self.priority,
            Aspect::Department => &self.department,
            Aspect::Type => &self.complaint_type,
        }
    }
}

/// Vocabulario congelado + los cuatro clasificadores. Inmutable tras construirse.
#[derive(Debug, Clone)]
pub struct InferenceContext {
    vocabulary: Vocabulary,
    vocabulary_fingerprint: String,
    models: AspectModels,
}

impl InferenceContext {
    /// Construye el contexto comprobando que cada modelo corresponde a su
    /// aspecto y que se entrenó exactamente con este vocabulario.
    pub fn new(
        vocabulary: Vocabulary,
        vocabulary_fingerprint: String,
        models: AspectModels,
    ) -> Result<Self, ModelLoadError> {
        vocabulary.validate()?;
        for aspect in Aspect::ALL {
            let model = models.get(aspect);
            if model.aspect() != aspect {
                return Err(ModelLoadError::Invalid(format!(
                    "se esperaba el modelo '{aspect}' y se encontró '{}'",
                    model.aspect()
                )));
            }
            model.validate()?;
            if model.vocabulary_fingerprint() != vocabulary_fingerprint {
                return Err(ModelLoadError::VocabularyMismatch {
                    aspect: aspect.to_string(),
                    expected: vocabulary_fingerprint.clone(),
                    found: model.vocabulary_fingerprint().to_string(),
                });
            }
            if model.n_features() != vocabulary.len() {
                return Err(ModelLoadError::Invalid(format!(
                    "el modelo '{aspect}' tiene {} características y el vocabulario {}",
                    model.n_features(),
                    vocabulary.len()
                )));
            }
        }

        Ok(Self {
            vocabulary,
            vocabulary_fingerprint,
            models,
        })
    }

    /// Contexto a partir de artefactos recién entrenados en memoria.
    pub fn from_trained(vocabulary: Vocabulary, models: AspectModels) -> Result<Self, ModelLoadError> {
        let fingerprint = vocabulary
            .fingerprint()
            .map_err(|e| ModelLoadError::Invalid(format!("vocabulario no serializable: {e}")))?;
        Self::new(vocabulary, fingerprint, models)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn vocabulary_fingerprint(&self) -> &str {
        &self.vocabulary_fingerprint
    }

    pub fn models(&self) -> &AspectModels {
        &self.models
    }

    pub fn labels(&self, aspect: Aspect) -> &[String] {
        self.models.get(aspect).labels()
    }

    /// Predicción de los cuatro aspectos sobre el mismo vector.
    fn predict_all(&self, text: &str) -> Result<[Prediction; 4], AnalysisError> {
        let vector = self.vocabulary.transform(text);
        if vector.is_empty() {
            debug!("Ningún término del vocabulario: se usan las probabilidades a priori");
        }
        debug!(
            "Vector de características: {} términos activos de {}",
            vector.nnz(),
            vector.dimension()
        );
        Ok([
            self.models.category.predict(&vector)?,
            self.models.priority.predict(&vector)?,
            self.models.department.predict(&vector)?,
            self.models.complaint_type.predict(&vector)?,
        ])
    }
}

/// Estado de los modelos registrado en el arranque.
#[derive(Debug, Clone)]
pub enum ModelState {
    Ready(Arc<InferenceContext>),
    Unavailable { reason: String },
}

impl ModelState {
    pub fn from_load_result(result: Result<InferenceContext, ModelLoadError>) -> Self {
        match result {
            Ok(context) => Self::Ready(Arc::new(context)),
            Err(err) => Self::Unavailable {
                reason: err.to_string(),
            },
        }
    }
}

/// Analizador de quejas. Se comparte entre peticiones detrás de un `Arc`.
#[derive(Debug, Clone)]
pub struct ComplaintAnalyzer {
    models: ModelState,
    sentiment: Option<SentimentScorer>,
    max_chars: usize,
}

impl ComplaintAnalyzer {
    pub fn new(models: ModelState, sentiment: Option<SentimentScorer>, max_chars: usize) -> Self {
        Self {
            models,
            sentiment,
            max_chars,
        }
    }

    pub fn models_loaded(&self) -> bool {
        matches!(self.models, ModelState::Ready(_))
    }

    pub fn sentiment_available(&self) -> bool {
        self.sentiment.is_some()
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn context(&self) -> Option<&InferenceContext> {
        match &self.models {
            ModelState::Ready(context) => Some(context.as_ref()),
            ModelState::Unavailable { .. } => None,
        }
    }

    /// Rechaza texto vacío o más largo que `max_chars` (tras recortar espacios).
    pub fn validate_text<'a>(&self, text: &'a str) -> Result<&'a str, AnalysisError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        let length = trimmed.chars().count();
        if length > self.max_chars {
            return Err(AnalysisError::InputTooLong {
                max: self.max_chars,
                actual: length,
            });
        }
        Ok(trimmed)
    }

    pub fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalysisError> {
        let trimmed = self.validate_text(text)?;

        let context = match &self.models {
            ModelState::Ready(context) => context,
            ModelState::Unavailable { reason } => {
                return Err(AnalysisError::ModelsUnavailable(reason.clone()))
            }
        };

        let [category, priority, department, raw_type] =
            context.predict_all(trimmed).map_err(|err| {
                error!(
                    "Fallo inesperado analizando la queja (hash {}): {}",
                    text_fingerprint(trimmed),
                    err
                );
                err
            })?;

        let confidence = round2(category.max_probability() * 100.0);
        if !(0.0..=100.0).contains(&confidence) {
            error!(
                "Confianza fuera de rango ({confidence}) para la queja (hash {})",
                text_fingerprint(trimmed)
            );
            return Err(AnalysisError::Unexpected(format!(
                "confianza fuera de rango: {confidence}"
            )));
        }

        let (sentiment, sentiment_score) = self.score_sentiment(trimmed);

        Ok(AnalysisResult {
            category: category.label,
            priority: priority.label,
            department: department.label,
            complaint_type: ComplaintType::from_raw_label(&raw_type.label),
            sentiment,
            sentiment_score,
            confidence,
        })
    }

    fn score_sentiment(&self, text: &str) -> (Option<SentimentLabel>, Option<f64>) {
        let Some(scorer) = &self.sentiment else {
            return (None, None);
        };
        match scorer.score(text) {
            Ok(compound) => (
                Some(SentimentLabel::from_compound(compound)),
                Some((compound * 10_000.0).round() / 10_000.0),
            ),
            Err(err) => {
                warn!(
                    "Sentimiento omitido para la queja (hash {}): {}",
                    text_fingerprint(text),
                    err
                );
                (None, None)
            }
        }
    }
}

/// Ejecuta `analyze` en el pool de tareas bloqueantes de tokio.
pub async fn analyze_blocking(
    analyzer: Arc<ComplaintAnalyzer>,
    text: String,
) -> Result<AnalysisResult, AnalysisError> {
    tokio::task::spawn_blocking(move || analyzer.analyze(&text))
        .await
        .map_err(|err| {
            error!("La tarea de análisis terminó de forma anómala: {err}");
            AnalysisError::Unexpected(format!("tarea de análisis interrumpida: {err}"))
        })?
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture_analyzer, fixture_context};

    #[test]
    fn empty_input_is_rejected() {
        let analyzer = fixture_analyzer();
        assert_eq!(analyzer.analyze(""), Err(AnalysisError::EmptyInput));
        assert_eq!(analyzer.analyze("   "), Err(AnalysisError::EmptyInput));
        assert_eq!(analyzer.analyze("\n\t"), Err(AnalysisError::EmptyInput));
    }

    #[test]
    fn over_long_input_is_rejected() {
        let analyzer = ComplaintAnalyzer::new(
            ModelState::Ready(Arc::new(fixture_context())),
            Some(SentimentScorer::new()),
            10,
        );
        let err = analyzer.analyze("the wifi in the library is down").unwrap_err();
        assert!(matches!(err, AnalysisError::InputTooLong { max: 10, .. }));
    }

    #[test]
    fn labels_come_from_the_fitted_label_sets() {
        let analyzer = fixture_analyzer();
        let context = analyzer.context().unwrap();
        for text in [
            "The wifi keeps disconnecting in the library",
            "Hostel bathroom is dirty",
            "Exam results were published late",
            "xyz",
        ] {
            let result = analyzer.analyze(text).unwrap();
            assert!(context.labels(Aspect::Category).contains(&result.category));
            assert!(context.labels(Aspect::Priority).contains(&result.priority));
            assert!(context.labels(Aspect::Department).contains(&result.department));
            assert!(matches!(
                result.complaint_type,
                ComplaintType::Technical | ComplaintType::NonTechnical
            ));
            assert!((0.0..=100.0).contains(&result.confidence));
        }
    }

    #[test]
    fn wifi_complaint_is_technical() {
        let analyzer = fixture_analyzer();
        let result = analyzer
            .analyze("The wifi keeps disconnecting in the library")
            .unwrap();
        assert_eq!(result.department, "IT Department");
        assert_eq!(result.complaint_type, ComplaintType::Technical);
    }

    #[test]
    fn confidence_matches_category_probability() {
        let analyzer = fixture_analyzer();
        let text = "Hostel bathroom is dirty and smelly";
        let result = analyzer.analyze(text).unwrap();

        let context = analyzer.context().unwrap();
        let vector = context.vocabulary().transform(text);
        let category = context.models().category.predict(&vector).unwrap();
        assert_eq!(result.confidence, round2(category.max_probability() * 100.0));
    }

    #[test]
    fn analysis_is_idempotent() {
        let analyzer = fixture_analyzer();
        let text = "Projector in lecture hall is broken";
        let first = analyzer.analyze(text).unwrap();
        let second = analyzer.analyze(text).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.confidence.to_bits(), second.confidence.to_bits());
    }

    #[test]
    fn unavailable_models_are_reported() {
        let analyzer = ComplaintAnalyzer::new(
            ModelState::Unavailable {
                reason: "faltan artefactos".into(),
            },
            Some(SentimentScorer::new()),
            DEFAULT_MAX_COMPLAINT_CHARS,
        );
        assert!(!analyzer.models_loaded());
        assert!(matches!(
            analyzer.analyze("the wifi is down"),
            Err(AnalysisError::ModelsUnavailable(_))
        ));
        // Entrada vacía sigue siendo un error del usuario.
        assert_eq!(analyzer.analyze(" "), Err(AnalysisError::EmptyInput));
    }

    #[test]
    fn missing_sentiment_scorer_only_omits_sentiment() {
        let analyzer = ComplaintAnalyzer::new(
            ModelState::Ready(Arc::new(fixture_context())),
            None,
            DEFAULT_MAX_COMPLAINT_CHARS,
        );
        let result = analyzer.analyze("The hostel food is terrible").unwrap();
        assert!(result.sentiment.is_none());
        assert!(result.sentiment_score.is_none());
        assert!(!result.category.is_empty());
    }

    #[test]
    fn sentiment_is_attached_when_available() {
        let analyzer = fixture_analyzer();
        let result = analyzer.analyze("The hostel food is terrible").unwrap();
        assert_eq!(result.sentiment, Some(SentimentLabel::Negative));
        assert!(result.sentiment_score.unwrap() < 0.0);
    }

    #[test]
    fn context_rejects_models_from_another_vocabulary() {
        let context = fixture_context();
        let other = Vocabulary::fit(&["a completely different training corpus"][..]).unwrap();
        let err = InferenceContext::from_trained(other, context.models().clone()).unwrap_err();
        assert!(matches!(err, ModelLoadError::VocabularyMismatch { .. }));
    }

    #[test]
    fn context_rejects_swapped_aspects() {
        let context = fixture_context();
        let mut models = context.models().clone();
        std::mem::swap(&mut models.priority, &mut models.department);
        let err = InferenceContext::from_trained(context.vocabulary().clone(), models).unwrap_err();
        assert!(matches!(err, ModelLoadError::Invalid(_)));
    }

    #[tokio::test]
    async fn blocking_analysis_matches_direct_call() {
        let analyzer = Arc::new(fixture_analyzer());
        let text = "Exam timetable clashes with another exam";
        let direct = analyzer.analyze(text).unwrap();
        let background = analyze_blocking(analyzer.clone(), text.to_string()).await.unwrap();
        assert_eq!(direct, background);
    }
}
