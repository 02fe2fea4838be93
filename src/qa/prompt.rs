//! Fixed prompt template for document question answering.

/// Default context budget in characters
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 30_000;

/// Phrase the model is told to use when the document lacks the answer
pub const NOT_IN_DOCUMENT: &str = "I cannot find this information in the document.";

/// Answer text used when the completion service returns nothing
pub const NO_ANSWER: &str = "Unable to generate an answer.";

/// Take the first `max_chars` characters of `text`.
///
/// Returns the prefix and whether anything was dropped. Cuts on character
/// boundaries, never inside a multi-byte sequence.
pub fn bound_context(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Fill the template with already-bounded document text and the question.
pub fn build_prompt(bounded_text: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions based on the provided document.\n\
         Answer the question based ONLY on the information in the document below.\n\
         If the answer is not in the document, say \"{NOT_IN_DOCUMENT}\"\n\
         \n\
         DOCUMENT:\n\
         {bounded_text}\n\
         \n\
         QUESTION: {question}\n\
         \n\
         ANSWER:"
    )
}

/// Per-question context: the bounded document text, the question and the
/// prompt built from them
#[derive(Debug, Clone, PartialEq)]
pub struct QaContext {
    pub bounded_text: String,
    pub question: String,
    pub prompt: String,
    pub truncated: bool,
}

impl QaContext {
    pub fn new(question: &str, extracted_text: &str, max_chars: usize) -> Self {
        let (bounded, truncated) = bound_context(extracted_text, max_chars);
        Self {
            prompt: build_prompt(bounded, question),
            bounded_text: bounded.to_string(),
            question: question.to_string(),
            truncated,
        }
    }

    pub fn context_chars(&self) -> usize {
        self.bounded_text.chars().count()
    }
}
