//! Prompt composition for the generation call.

use std::fs;

use super::types::RetrievalItem;
use crate::core::paths::AppPaths;

const QUERY_SLOT: &str = "{query}";
const CONTEXT_SLOT: &str = "{context}";

/// Pure, deterministic rendering of the query and budgeted snippets.
///
/// An operator-supplied template file may override the built-in format; it
/// must contain `{query}` and `{context}` placeholders. Any load problem
/// falls back to the built-in format. Both paths share the same context
/// rendering, so prompt numbering and citation order always match and every
/// source stays traceable even when the template degrades.
#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    template: Option<String>,
}

impl PromptComposer {
    pub fn from_paths(paths: &AppPaths) -> Self {
        let template = match fs::read_to_string(&paths.prompt_template_path) {
            Ok(text) if text.contains(QUERY_SLOT) && text.contains(CONTEXT_SLOT) => Some(text),
            Ok(_) => {
                tracing::warn!(
                    "prompt template {} lacks {{query}}/{{context}} placeholders; using built-in format",
                    paths.prompt_template_path.display()
                );
                None
            }
            Err(_) => None,
        };
        Self { template }
    }

    pub fn compose(&self, query: &str, items: &[RetrievalItem]) -> String {
        let context = render_context(items);
        match &self.template {
            Some(template) => template
                .replace(QUERY_SLOT, query)
                .replace(CONTEXT_SLOT, &context),
            None => builtin_prompt(query, &context),
        }
    }
}

/// Machine-parseable reference block per item, 1-based, in the given order.
fn render_context(items: &[RetrievalItem]) -> String {
    let mut context = String::new();
    for (position, item) in items.iter().enumerate() {
        context.push_str(&format!(
            "[{}] doc={} chunk={} score={:.4}\n{}\n\n",
            position + 1,
            item.document_id,
            item.chunk_index,
            item.score,
            item.snippet
        ));
    }
    context
}

fn builtin_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a legal research assistant. Answer the question using only the \
numbered context passages below and cite them by their bracketed number.\n\n\
Question: {query}\n\nContext:\n{context}Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(chunk_index: i64, score: f64, snippet: &str) -> RetrievalItem {
        RetrievalItem {
            document_id: Uuid::parse_str("cccccccc-cccc-cccc-cccc-cccccccccccc").expect("uuid"),
            chunk_index,
            score,
            snippet: snippet.to_string(),
        }
    }

    #[test]
    fn prompt_numbers_items_and_identifies_sources() {
        let composer = PromptComposer::default();
        let items = vec![
            item(0, 0.95, "offer and acceptance"),
            item(3, 0.87, "consideration"),
        ];

        let prompt = composer.compose("What makes a contract?", &items);

        assert!(prompt.contains("What makes a contract?"));
        assert!(prompt.contains("[1] doc=cccccccc-cccc-cccc-cccc-cccccccccccc chunk=0 score=0.9500"));
        assert!(prompt.contains("[2] doc=cccccccc-cccc-cccc-cccc-cccccccccccc chunk=3 score=0.8700"));
        assert!(prompt.contains("offer and acceptance"));

        // Numbering follows the provided order.
        let first = prompt.find("[1]").expect("first marker");
        let second = prompt.find("[2]").expect("second marker");
        assert!(first < second);
    }

    #[test]
    fn empty_items_still_produce_a_prompt() {
        let composer = PromptComposer::default();
        let prompt = composer.compose("Test query", &[]);
        assert!(prompt.contains("Test query"));
        assert!(prompt.contains("Context:"));
    }

    #[test]
    fn template_override_keeps_the_same_context_block() {
        let composer = PromptComposer {
            template: Some("Q: {query}\nPassages:\n{context}Respond concisely.".to_string()),
        };
        let items = vec![item(1, 0.5, "snippet text")];

        let prompt = composer.compose("query text", &items);

        assert!(prompt.starts_with("Q: query text"));
        assert!(prompt.contains("[1] doc="));
        assert!(prompt.contains("snippet text"));
        assert!(prompt.ends_with("Respond concisely."));
    }

    #[test]
    fn template_without_placeholders_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::with_data_dir(dir.path().to_path_buf());
        fs::create_dir_all(paths.prompt_template_path.parent().expect("parent")).expect("mkdir");
        fs::write(&paths.prompt_template_path, "no placeholders here").expect("write");

        let composer = PromptComposer::from_paths(&paths);
        assert!(composer.template.is_none());
    }
}
