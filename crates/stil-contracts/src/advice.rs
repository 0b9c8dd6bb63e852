use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::Product;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleAdvice {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub vibe_description: String,
    #[serde(default)]
    pub combination_logic: String,
    #[serde(default)]
    pub pro_tip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferredStyle {
    #[serde(default)]
    pub style_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    #[serde(default)]
    pub item_description: String,
    #[serde(default)]
    pub inferred_style: InferredStyle,
}

/// Success payload of POST `/api/analyze-style`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleAnalysis {
    #[serde(default)]
    pub image_analysis: ImageAnalysis,
    #[serde(default)]
    pub style_advice: StyleAdvice,
    #[serde(default)]
    pub matched_products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleMix {
    pub style: String,
    #[serde(default)]
    pub percentage: f64,
}

/// Success payload of POST `/api/create-style-profile`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub style_profile: Vec<StyleMix>,
    #[serde(default)]
    pub dominant_colors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Success payload of POST `/api/event-stylist`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCombos {
    #[serde(default)]
    pub combinations: Vec<Combination>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply_text: String,
    #[serde(default)]
    pub detected_intent: Option<String>,
    #[serde(default)]
    pub is_return_prevented: Option<bool>,
}

/// Success payload of POST `/api/fit-score`. The score is a bare number on
/// success; the failure placeholder carries the `"?"` sentinel instead, so
/// the field stays an open JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitScore {
    pub fit_score: Value,
    #[serde(default)]
    pub reasoning: String,
}

impl FitScore {
    /// Displayable placeholder used when the lookup fails transport-wise.
    pub fn unavailable() -> Self {
        Self {
            fit_score: Value::String("?".to_string()),
            reasoning: "Puan hesaplanırken bir hata oluştu.".to_string(),
        }
    }

    pub fn score_display(&self) -> String {
        match &self.fit_score {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            other => other.to_string(),
        }
    }
}

/// Success payload of POST `/api/generate-visual-combo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualCombo {
    #[serde(default)]
    pub image_description: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn style_analysis_deserializes_service_payload() -> anyhow::Result<()> {
        let analysis: StyleAnalysis = serde_json::from_value(json!({
            "image_analysis": {
                "item_description": "beyaz pamuklu gömlek",
                "inferred_style": {"style_tags": ["klasik", "minimal"]}
            },
            "style_advice": {
                "title": "Casual Chic",
                "vibe_description": "Rahat ama özenli.",
                "combination_logic": "Nötr tonlar birbirini dengeler.",
                "pro_tip": "Aksesuarı tek parçayla sınırlayın."
            },
            "matched_products": [
                {"id": 1, "name": "Bej Pantolon", "image": "static/img/bej.jpg",
                 "price": "899 TL", "style_tags": ["klasik"]}
            ]
        }))?;
        assert_eq!(analysis.style_advice.title, "Casual Chic");
        assert_eq!(analysis.matched_products.len(), 1);
        assert_eq!(
            analysis.image_analysis.inferred_style.style_tags,
            vec!["klasik", "minimal"]
        );
        Ok(())
    }

    #[test]
    fn style_analysis_tolerates_sparse_payload() -> anyhow::Result<()> {
        let analysis: StyleAnalysis =
            serde_json::from_value(json!({"style_advice": {"title": "Sade"}}))?;
        assert_eq!(analysis.style_advice.title, "Sade");
        assert!(analysis.matched_products.is_empty());
        Ok(())
    }

    #[test]
    fn fit_score_accepts_numeric_score() -> anyhow::Result<()> {
        let score: FitScore =
            serde_json::from_value(json!({"fit_score": 8, "reasoning": "Kalça hattı uyumlu."}))?;
        assert_eq!(score.score_display(), "8");
        Ok(())
    }

    #[test]
    fn fit_score_unavailable_carries_sentinel() {
        let score = FitScore::unavailable();
        assert_eq!(score.score_display(), "?");
        assert_eq!(score.reasoning, "Puan hesaplanırken bir hata oluştu.");
    }

    #[test]
    fn chat_reply_keeps_optional_intent() -> anyhow::Result<()> {
        let reply: ChatReply = serde_json::from_value(json!({
            "reply_text": "Bedeniniz için değişim önerebilirim. [STIL_ANALISTI_LINK]",
            "detected_intent": "BEDEN",
            "is_return_prevented": true
        }))?;
        assert_eq!(reply.detected_intent.as_deref(), Some("BEDEN"));
        assert_eq!(reply.is_return_prevented, Some(true));

        let bare: ChatReply = serde_json::from_value(json!({"reply_text": "Merhaba"}))?;
        assert_eq!(bare.detected_intent, None);
        Ok(())
    }
}
