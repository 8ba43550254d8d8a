//! Grounding prompt template

/// Build the grounded prompt: instructions, one context per line, then the question
///
/// The output is the exact string hashed by the response cache, so any change
/// here makes previously cached answers unreachable.
#[must_use]
pub fn build_grounded_prompt<S: AsRef<str>>(contexts: &[S], query: &str) -> String {
    let context = contexts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r"You are a helpful assistant. Use the context below to answer the question.

Context:
{context}

Question: {query}
Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_one_per_line_in_order() {
        let prompt = build_grounded_prompt(&["The red shoe", "sells well"], "Which shoe sells well?");
        assert_eq!(
            prompt,
            "You are a helpful assistant. Use the context below to answer the question.\n\nContext:\nThe red shoe\nsells well\n\nQuestion: Which shoe sells well?\nAnswer:"
        );
    }

    #[test]
    fn test_no_contexts() {
        let prompt = build_grounded_prompt::<&str>(&[], "anything?");
        assert!(prompt.contains("Context:\n\nQuestion: anything?"));
    }
}
