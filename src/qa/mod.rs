pub mod assembler;
pub mod prompt;

pub use assembler::{Answer, QaAssembler};
pub use prompt::{
    bound_context, build_prompt, QaContext, DEFAULT_MAX_CONTEXT_CHARS, NOT_IN_DOCUMENT, NO_ANSWER,
};
