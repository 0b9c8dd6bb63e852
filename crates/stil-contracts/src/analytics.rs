use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnAnalytics {
    #[serde(default)]
    pub total_returns: u64,
    #[serde(default)]
    pub product_analysis: Vec<ProductReturnAnalysis>,
}

impl ReturnAnalytics {
    pub fn is_empty(&self) -> bool {
        self.total_returns == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReturnAnalysis {
    pub product_name: String,
    #[serde(default)]
    pub total_returns: u64,
    #[serde(default)]
    pub reasons: Vec<ReturnReason>,
    #[serde(default)]
    pub strategic_advice: StrategicAdvice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnReason {
    pub intent: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategicAdvice {
    #[serde(default)]
    pub common_theme: String,
    #[serde(default)]
    pub actionable_advice: String,
}

/// Display labels for the return-intent codes, in presentation order.
/// Unknown codes fall through to the raw code via [`intent_label`].
pub fn intent_labels() -> IndexMap<&'static str, &'static str> {
    IndexMap::from([
        ("BEDEN", "Beden Uyumsuzluğu"),
        ("RENK_STIL", "Stil/Renk Beğenmeme"),
        ("KUSURLU_URUN", "Kusurlu Ürün"),
        ("BEKLENTI_FARKI", "Beklenti Farkı"),
        ("COZULEBILIR_SORUN", "Çözülebilir Sorun"),
        ("BELIRSIZ", "Diğer/Belirsiz"),
    ])
}

pub fn intent_label(intent: &str) -> String {
    intent_labels()
        .get(intent)
        .map(|label| (*label).to_string())
        .unwrap_or_else(|| intent.to_string())
}
