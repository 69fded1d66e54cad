//! Answer generator trait and the context-only prompt.

use async_trait::async_trait;

use crate::document::{Chunk, NO_ANSWER_SENTINEL};
use crate::error::Result;

/// A text generator that answers a question from retrieved context.
///
/// Implementations are expected to honour the prompt built by
/// [`build_prompt`]: answer only from the supplied context and reply with
/// [`NO_ANSWER_SENTINEL`] when the context is insufficient. This is a
/// behavioural contract of the model and cannot be verified here.
///
/// Failures must be reported as
/// [`RagError::GenerationService`](crate::RagError::GenerationService).
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Answer `query` using only `context`, best chunk first.
    async fn answer(&self, query: &str, context: &[Chunk]) -> Result<String>;

    /// Identifier of the underlying model, used in logs.
    fn model_id(&self) -> &str {
        "unknown"
    }
}

/// Build the prompt sent to the generation model.
///
/// Chunks are separated by blank lines, in retrieval order.
pub fn build_prompt(query: &str, context: &[Chunk]) -> String {
    let context = context.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!(
        "Answer the question as detailed as possible from the provided context.\n\
         If the answer is not in the context, just say \"{NO_ANSWER_SENTINEL}\".\n\
         Do not make up an answer.\n\n\
         Context:\n{context}\n\n\
         Question:\n{query}\n\n\
         Answer:\n"
    )
}
