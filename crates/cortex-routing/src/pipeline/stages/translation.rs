//! Language detection and translation of the prompt for analysis.
//!
//! The original prompt is never touched; the translation only goes to
//! `prompt_for_analysis`. Translation errors are swallowed and analysis falls
//! back to the original text.

use async_trait::async_trait;
use cortex_core::{ChatClient, ChatMessage, ChatRequest};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::analyzer::{Language, detect_language};
use crate::error::Result;
use crate::pipeline::{PipelineStage, StageKind};
use crate::types::PipelineContext;

fn system_prompt(target: Language) -> String {
    format!(
        "Translate the user's text to {}. \
         Output only the translation, without quotes, notes or explanations.",
        target.name()
    )
}

const QUOTE_CHARS: &[char] = &['"', '\'', '“', '”', '„', '«', '»', '‚', '‘', '’'];

/// Detects the prompt language and translates prompts written in anything
/// other than the analysis language (English by default).
pub struct TranslationStage {
    translator: Option<Arc<dyn ChatClient>>,
    model: String,
    target: Language,
}

impl TranslationStage {
    /// Creates the stage. Without a translator only detection runs.
    #[must_use]
    pub fn new(translator: Option<Arc<dyn ChatClient>>, model: impl Into<String>) -> Self {
        Self {
            translator,
            model: model.into(),
            target: Language::English,
        }
    }

    /// Sets the language analysis stages expect.
    #[must_use]
    pub const fn with_target(mut self, target: Language) -> Self {
        self.target = target;
        self
    }

    async fn translate(&self, translator: &dyn ChatClient, text: &str) -> Option<String> {
        let request = ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(system_prompt(self.target)),
                ChatMessage::user(text),
            ],
        )
        .with_temperature(0.0);

        match translator.chat(request).await {
            Ok(response) => {
                let cleaned = strip_quotes(&response.content);
                if cleaned.is_empty() {
                    warn!("translation came back empty, analyzing the original prompt");
                    None
                } else {
                    Some(cleaned.to_owned())
                }
            }
            Err(error) => {
                warn!(%error, "translation failed, analyzing the original prompt");
                None
            }
        }
    }
}

/// Trims whitespace and one layer of surrounding quote characters.
fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if QUOTE_CHARS.contains(&first) && QUOTE_CHARS.contains(&last) => {
            trimmed[first.len_utf8()..trimmed.len() - last.len_utf8()].trim()
        }
        _ => trimmed,
    }
}

#[async_trait]
impl PipelineStage for TranslationStage {
    fn name(&self) -> &'static str {
        "translation"
    }

    fn kind(&self) -> StageKind {
        StageKind::Translation
    }

    async fn process(&self, _cancel: &CancellationToken, pctx: &mut PipelineContext) -> Result<()> {
        let language = detect_language(pctx.prompt());
        pctx.source_language = Some(language.code().to_owned());
        debug!(language = language.code(), "language detected");

        let translator = self
            .translator
            .as_ref()
            .filter(|_| language != self.target && !pctx.options.skip_translation);
        let translated = match translator {
            Some(translator) => self.translate(translator.as_ref(), pctx.prompt()).await,
            None => None,
        };

        let analysis_prompt = translated.unwrap_or_else(|| pctx.prompt().to_owned());
        pctx.prompt_for_analysis = Some(analysis_prompt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::mock::MockChatClient;
    use tokio_test::assert_err;

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("  \"What is the news?\" \n"), "What is the news?");
        assert_eq!(strip_quotes("«Bonjour»"), "Bonjour");
        assert_eq!(strip_quotes("it's fine"), "it's fine");
        assert_eq!(strip_quotes("\""), "\"");
    }

    #[tokio::test]
    async fn test_english_prompt_skips_translator() {
        let chat = Arc::new(MockChatClient::new());
        let stage = TranslationStage::new(Some(Arc::clone(&chat) as Arc<dyn ChatClient>), "m");
        let mut pctx = PipelineContext::new("What is the weather like?");

        stage.process(&CancellationToken::new(), &mut pctx).await.unwrap();
        assert_eq!(pctx.source_language.as_deref(), Some("en"));
        assert_eq!(pctx.analysis_prompt(), "What is the weather like?");
        assert_eq!(chat.call_count(), 0);
    }

    #[tokio::test]
    async fn test_translation_goes_to_analysis_prompt_only() {
        let chat = MockChatClient::new().with_default_response("\"What is the current news?\"");
        let stage = TranslationStage::new(Some(Arc::new(chat)), "m");
        let prompt = "Was sind die aktuellen Nachrichten?";
        let mut pctx = PipelineContext::new(prompt);

        stage.process(&CancellationToken::new(), &mut pctx).await.unwrap();
        assert_eq!(pctx.source_language.as_deref(), Some("de"));
        assert_eq!(pctx.analysis_prompt(), "What is the current news?");
        assert_eq!(pctx.prompt(), prompt);
    }

    #[tokio::test]
    async fn test_translation_failure_is_swallowed() {
        let stage = TranslationStage::new(Some(Arc::new(MockChatClient::new().failing())), "m");
        let prompt = "Pourquoi le ciel est bleu et pas vert ?";
        let mut pctx = PipelineContext::new(prompt);

        stage.process(&CancellationToken::new(), &mut pctx).await.unwrap();
        assert_eq!(pctx.source_language.as_deref(), Some("fr"));
        assert_eq!(pctx.analysis_prompt(), prompt);
    }

    #[tokio::test]
    async fn test_prompt_in_target_language_is_left_alone() {
        let chat = Arc::new(MockChatClient::new());
        let stage = TranslationStage::new(Some(Arc::clone(&chat) as Arc<dyn ChatClient>), "m")
            .with_target(Language::German);
        let prompt = "Was sind die aktuellen Nachrichten?";
        let mut pctx = PipelineContext::new(prompt);

        stage.process(&CancellationToken::new(), &mut pctx).await.unwrap();
        assert_eq!(pctx.analysis_prompt(), prompt);
        assert_eq!(chat.call_count(), 0);
    }

    #[test]
    fn test_language_codes_parse() {
        assert_eq!("DE".parse::<Language>(), Ok(Language::German));
        assert_err!("xx".parse::<Language>());
    }
}
