use super::models::QandAPair;

const GROUNDING_INSTRUCTION: &str = "You should only make use of the provided Relevant Documents. \
They are important information belonging to the user, and it is important that any advice you \
give is grounded in these documents. If the documents are irrelevant to the question, simply \
state that you do not have the relevant information available in the database.";

/// Renders the grounded prompt sent as the final user message of a turn.
pub fn render_prompt(query: &str, examples: &[QandAPair], fragments: &[String]) -> String {
    // Serializing plain strings and string pairs cannot fail.
    let examples_json = serde_json::to_string(examples).unwrap_or_else(|_| "[]".to_string());
    let documents_json = serde_json::to_string(fragments).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Prompt: {}\n\nExample Responses: {}\n\nRelevant Documents: {}\n\n{}",
        query.trim(),
        examples_json,
        documents_json,
        GROUNDING_INSTRUCTION
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_query_examples_and_documents() {
        let examples = vec![QandAPair {
            question: "What is the capital of France?".to_string(),
            answer: "Paris".to_string(),
        }];
        let fragments = vec!["France is a country \"in\" Europe.".to_string()];

        let prompt = render_prompt("  capital?  ", &examples, &fragments);

        assert!(prompt.starts_with("Prompt: capital?\n"));
        assert!(prompt.contains(
            r#"Example Responses: [{"question":"What is the capital of France?","answer":"Paris"}]"#
        ));
        assert!(prompt.contains(r#"Relevant Documents: ["France is a country \"in\" Europe."]"#));
        assert!(prompt.ends_with("available in the database."));
    }

    #[test]
    fn empty_examples_render_as_empty_list() {
        let prompt = render_prompt("q", &[], &["doc".to_string()]);
        assert!(prompt.contains("Example Responses: []"));
    }
}
