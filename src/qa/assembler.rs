use serde::Serialize;
use std::sync::Arc;

use super::prompt::{QaContext, NO_ANSWER};
use crate::completion::CompletionService;
use crate::error::{Result, RodeoError};

/// Result of one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub question: String,
    pub text: String,
    /// Characters of document text that were sent
    pub context_chars: usize,
    /// Whether the document was cut to fit the context budget
    pub truncated: bool,
    /// Whether `text` is the fixed no-answer message
    pub fallback: bool,
}

/// Answers questions against extracted document text
pub struct QaAssembler {
    completion: Arc<dyn CompletionService>,
    model: String,
    max_context_chars: usize,
}

impl QaAssembler {
    pub fn new(completion: Arc<dyn CompletionService>, model: String, max_context_chars: usize) -> Self {
        Self {
            completion,
            model,
            max_context_chars,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer `question` using the first `max_context_chars` characters of
    /// `extracted_text` as the only source.
    ///
    /// A question that is empty after trimming is rejected before anything
    /// is sent. Otherwise the question goes into the prompt as given.
    pub async fn answer(&self, question: &str, extracted_text: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(RodeoError::InvalidInput("Please enter a question.".to_string()));
        }

        let context = QaContext::new(question, extracted_text, self.max_context_chars);
        if context.truncated {
            log::info!(
                "Document truncated to {} characters for this question",
                self.max_context_chars
            );
        }

        let start = std::time::Instant::now();
        let generated = self.completion.complete(&self.model, &context.prompt).await?;

        let (text, fallback) = match generated {
            Some(text) => (text, false),
            None => {
                log::warn!("{} returned no answer, using fallback text", self.completion.name());
                (NO_ANSWER.to_string(), true)
            }
        };

        log::info!(
            "Answered with {} ({} context chars, {} answer chars) in {:?}",
            self.model,
            context.context_chars(),
            text.chars().count(),
            start.elapsed()
        );

        let context_chars = context.context_chars();
        Ok(Answer {
            question: context.question,
            text,
            context_chars,
            truncated: context.truncated,
            fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::prompt::NOT_IN_DOCUMENT;
    use crate::test_support::ScriptedCompletion;

    fn assembler(completion: Arc<ScriptedCompletion>, max: usize) -> QaAssembler {
        QaAssembler::new(completion, "llama3.1-70b".to_string(), max)
    }

    #[tokio::test]
    async fn test_empty_question_never_sent() {
        let completion = Arc::new(ScriptedCompletion::answering("anything"));
        let qa = assembler(completion.clone(), 100);

        for question in ["", "   ", "\n\t"] {
            let err = qa.answer(question, "some text").await.unwrap_err();
            assert!(matches!(err, RodeoError::InvalidInput(_)));
        }
        assert!(completion.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_revenue_question() {
        let completion = Arc::new(ScriptedCompletion::answering("The revenue was $5M in 2023."));
        let qa = assembler(completion.clone(), 30_000);

        let answer = qa.answer("What was the revenue?", "Revenue was $5M in 2023.").await.unwrap();
        assert!(answer.text.contains("$5M"));
        assert!(!answer.fallback);
        assert!(!answer.truncated);
        assert_eq!(answer.question, "What was the revenue?");

        let prompts = completion.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, "llama3.1-70b");
        assert!(prompts[0].1.contains("DOCUMENT:\nRevenue was $5M in 2023.\n"));
        assert!(prompts[0].1.contains("QUESTION: What was the revenue?"));
    }

    #[tokio::test]
    async fn test_empty_document_prompt_carries_fallback_instruction() {
        let completion = Arc::new(ScriptedCompletion::answering(NOT_IN_DOCUMENT));
        let qa = assembler(completion.clone(), 30_000);

        let answer = qa.answer("Who signed it?", "").await.unwrap();
        assert_eq!(answer.text, NOT_IN_DOCUMENT);
        assert_eq!(answer.context_chars, 0);
        assert!(completion.prompts()[0].1.contains(NOT_IN_DOCUMENT));
    }

    #[tokio::test]
    async fn test_empty_completion_uses_fixed_text() {
        let completion = Arc::new(ScriptedCompletion::silent());
        let qa = assembler(completion, 30_000);

        let answer = qa.answer("What?", "text").await.unwrap();
        assert_eq!(answer.text, "Unable to generate an answer.");
        assert!(answer.fallback);
    }

    #[tokio::test]
    async fn test_completion_failure_surfaces() {
        let completion = Arc::new(ScriptedCompletion::failing());
        let qa = assembler(completion, 30_000);

        let err = qa.answer("What?", "text").await.unwrap_err();
        assert!(matches!(err, RodeoError::Completion { .. }));
    }

    #[tokio::test]
    async fn test_long_document_truncated() {
        let completion = Arc::new(ScriptedCompletion::answering("ok"));
        let qa = assembler(completion.clone(), 50);

        let text = format!("{}{}", "a".repeat(50), "TAIL-MARKER");
        let answer = qa.answer("q", &text).await.unwrap();
        assert!(answer.truncated);
        assert_eq!(answer.context_chars, 50);
        assert!(!completion.prompts()[0].1.contains("TAIL-MARKER"));
    }

    #[tokio::test]
    async fn test_question_inserted_as_given() {
        let completion = Arc::new(ScriptedCompletion::answering("ok"));
        let qa = assembler(completion.clone(), 100);

        let answer = qa.answer("What?  ", "t").await.unwrap();
        assert_eq!(answer.question, "What?  ");
        assert!(completion.prompts()[0].1.ends_with("QUESTION: What?  \n\nANSWER:"));
    }

    #[tokio::test]
    async fn test_answer_reports_context_chars() {
        let completion = Arc::new(ScriptedCompletion::answering("ok"));
        let qa = assembler(completion, 5);

        let answer = qa.answer("q", "héllo wörld").await.unwrap();
        assert_eq!(answer.context_chars, 5);
        assert!(answer.truncated);
        assert_eq!(answer.question, "q");
    }
}
