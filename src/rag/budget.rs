//! Token budgeting for retrieved context.

use super::types::RetrievalItem;

/// Documented approximation: four characters per token. May under- or
/// over-count for non-Latin text or unusual tokenizers.
pub const CHARS_PER_TOKEN: usize = 4;
pub const TRUNCATION_MARKER: &str = "...";

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Greedy prefix of `items` whose cumulative estimated cost fits
/// `budget_tokens`.
///
/// If the top-ranked item alone exceeds the budget, its snippet is truncated
/// to `budget_tokens * 4` characters and returned as the sole item: a
/// non-empty retrieval never degrades to an empty context from a tight
/// budget. The model identifier is the seam for per-model estimators; the
/// reference estimator ignores it.
pub fn trim_to_token_budget(
    items: Vec<RetrievalItem>,
    budget_tokens: usize,
    _model: &str,
) -> Vec<RetrievalItem> {
    let total = items.len();
    let mut budgeted = Vec::new();
    let mut used_tokens = 0usize;

    for item in items {
        let item_tokens = estimate_tokens(&item.snippet);
        if used_tokens + item_tokens <= budget_tokens {
            used_tokens += item_tokens;
            budgeted.push(item);
            continue;
        }

        if budgeted.is_empty() {
            budgeted.push(truncate_item(item, budget_tokens));
        }
        break;
    }

    tracing::debug!(
        "trimmed context from {} to {} items ({}/{} tokens)",
        total,
        budgeted.len(),
        used_tokens,
        budget_tokens
    );
    budgeted
}

fn truncate_item(item: RetrievalItem, budget_tokens: usize) -> RetrievalItem {
    let max_chars = budget_tokens * CHARS_PER_TOKEN;
    let mut snippet: String = item.snippet.chars().take(max_chars).collect();
    snippet.push_str(TRUNCATION_MARKER);
    RetrievalItem { snippet, ..item }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(chunk_index: i64, snippet: &str) -> RetrievalItem {
        RetrievalItem {
            document_id: Uuid::parse_str("bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb").expect("uuid"),
            chunk_index,
            score: 0.9,
            snippet: snippet.to_string(),
        }
    }

    #[test]
    fn estimates_round_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn list_within_budget_is_unchanged() {
        let items = vec![item(0, &"a".repeat(400)), item(1, &"b".repeat(400))];
        let result = trim_to_token_budget(items.clone(), 2000, "gpt-4o-mini");
        assert_eq!(result, items);
    }

    #[test]
    fn stops_before_the_item_that_would_overflow() {
        // 100 tokens each; budget fits two.
        let items = vec![
            item(0, &"a".repeat(400)),
            item(1, &"b".repeat(400)),
            item(2, &"c".repeat(400)),
        ];
        let result = trim_to_token_budget(items, 250, "gpt-4o-mini");
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].chunk_index, 1);
    }

    #[test]
    fn oversized_first_item_is_truncated_not_dropped() {
        let items = vec![item(0, &"a".repeat(1000)), item(1, &"b".repeat(400))];
        let result = trim_to_token_budget(items, 100, "gpt-4o-mini");

        assert_eq!(result.len(), 1);
        let snippet = &result[0].snippet;
        assert!(snippet.ends_with(TRUNCATION_MARKER));
        assert!(snippet.chars().count() <= 100 * CHARS_PER_TOKEN + TRUNCATION_MARKER.len());
    }

    #[test]
    fn empty_input_stays_empty() {
        let result = trim_to_token_budget(Vec::new(), 1000, "gpt-4o-mini");
        assert!(result.is_empty());
    }
}
