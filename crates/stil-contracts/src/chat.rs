use serde::{Deserialize, Serialize};

/// Reserved token the assistant embeds in replies that should surface a
/// shortcut back to the single-analysis workflow. This is the only server
/// text interpreted at render time; everything else passes through verbatim.
pub const ANALYST_MARKER: &str = "[STIL_ANALISTI_LINK]";

const ANALYST_CTA: &str = "\n>> Stil Analistini Dene: /";

pub const FAILURE_REPLY: &str = "Üzgünüm, bir hata oluştu. Lütfen tekrar deneyin.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }
}

pub fn greeting(context: &str) -> String {
    format!("Merhaba! \"{context}\" ürününü iade etme sebebinizi kısaca öğrenebilir miyim?")
}

/// Render-time substitution for [`ANALYST_MARKER`].
///
/// Pure and idempotent: the replacement text never contains the marker, so
/// rendering an already-rendered message changes nothing. The stored
/// transcript entry is left untouched by callers.
pub fn render_message(text: &str) -> String {
    if !text.contains(ANALYST_MARKER) {
        return text.to_string();
    }
    text.replace(ANALYST_MARKER, ANALYST_CTA)
}
