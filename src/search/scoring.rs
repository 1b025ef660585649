use std::cmp::Ordering;

use chrono::NaiveTime;
use rayon::prelude::*;

use crate::models::{
    ConversationRecord, ConversationSummary, MatchLocation, SearchMatch, SearchOptions, SearchResult,
    SearchScope,
};
use crate::render::{content_text, ordered_messages};

pub const TITLE_HIT_SCORE: u32 = 10;
pub const CONTENT_HIT_SCORE: u32 = 2;
pub const EXACT_MESSAGE_BONUS: u32 = 3;
pub const USER_AUTHOR_BONUS: u32 = 1;

/// Characters of context kept on each side of the first hit
pub const SNIPPET_CONTEXT_CHARS: usize = 50;

const ELLIPSIS: char = '…';

/// Plain-text view of one message, prepared for scoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchableMessage {
    pub node_id: String,
    pub role: String,
    pub text: String,
}

/// A conversation reduced to what search needs
#[derive(Debug, Clone, PartialEq)]
pub struct SearchableConversation {
    pub summary: ConversationSummary,
    pub messages: Vec<SearchableMessage>,
}

impl SearchableConversation {
    pub fn from_record(record: &ConversationRecord, file_name: &str) -> Self {
        let messages = ordered_messages(record)
            .into_iter()
            .filter_map(|view| {
                let text = content_text(view.message.content.as_ref()?);
                if text.is_empty() {
                    return None;
                }
                Some(SearchableMessage {
                    node_id: view.node_id.to_string(),
                    role: view.message.author.role.clone(),
                    text,
                })
            })
            .collect();

        Self { summary: ConversationSummary::from_record(record, file_name), messages }
    }
}

/// Lower-cases `text`, recording where each original char starts in the result
///
/// Some chars lower-case to several (`İ` becomes `i̇`), so offsets in the lowered text
/// cannot be used on the original directly.
fn lowercase_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut lowered = String::with_capacity(text.len());
    let mut starts = Vec::with_capacity(text.len());
    for c in text.chars() {
        starts.push(lowered.len());
        lowered.extend(c.to_lowercase());
    }
    (lowered, starts)
}

/// Non-overlapping, case-insensitive occurrences of `needle_lower` in `haystack`
///
/// Returns the hit count and, for the first hit, its char offset and length in `haystack`.
fn find_hits(haystack: &str, needle_lower: &str) -> (usize, Option<(usize, usize)>) {
    let (lowered, starts) = lowercase_with_offsets(haystack);
    let mut hits = 0;
    let mut first = None;

    for (byte_pos, matched) in lowered.match_indices(needle_lower) {
        if first.is_none() {
            let start = starts.partition_point(|&s| s <= byte_pos).saturating_sub(1);
            let end = starts.partition_point(|&s| s < byte_pos + matched.len());
            first = Some((start, end.saturating_sub(start)));
        }
        hits += 1;
    }
    (hits, first)
}

/// Up to [`SNIPPET_CONTEXT_CHARS`] characters either side of a hit, `…` where cut
pub fn snippet_around(text: &str, hit_char: usize, hit_len_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let hit_char = hit_char.min(chars.len());
    let start = hit_char.saturating_sub(SNIPPET_CONTEXT_CHARS);
    let end = (hit_char + hit_len_chars + SNIPPET_CONTEXT_CHARS).min(chars.len());

    let mut snippet = String::new();
    if start > 0 {
        snippet.push(ELLIPSIS);
    }
    snippet.extend(chars[start..end].iter().map(|c| if c.is_control() { ' ' } else { *c }));
    if end < chars.len() {
        snippet.push(ELLIPSIS);
    }
    snippet
}

/// Scores one conversation against a lower-cased, trimmed query
///
/// Returns `None` when nothing in scope matches.
pub fn score_conversation(
    conversation: &SearchableConversation,
    query_lower: &str,
    scope: SearchScope,
) -> Option<(u32, Vec<SearchMatch>)> {
    let mut score: u32 = 0;
    let mut matches = Vec::new();

    if scope.includes_title() {
        let title = &conversation.summary.title;
        if let (hits, Some((first, len))) = find_hits(title, query_lower) {
            score += TITLE_HIT_SCORE * hits as u32;
            matches.push(SearchMatch {
                location: MatchLocation::Title,
                hits,
                snippet: snippet_around(title, first, len),
            });
        }
    }

    if scope.includes_content() {
        for message in &conversation.messages {
            let (hits, Some((first, len))) = find_hits(&message.text, query_lower) else {
                continue;
            };
            score += CONTENT_HIT_SCORE * hits as u32;
            if message.text.trim().to_lowercase() == query_lower {
                score += EXACT_MESSAGE_BONUS;
            }
            if message.role == "user" {
                score += USER_AUTHOR_BONUS;
            }
            matches.push(SearchMatch {
                location: MatchLocation::Message {
                    node_id: message.node_id.clone(),
                    role: message.role.clone(),
                },
                hits,
                snippet: snippet_around(&message.text, first, len),
            });
        }
    }

    if matches.is_empty() { None } else { Some((score, matches)) }
}

fn passes_since(summary: &ConversationSummary, options: &SearchOptions) -> bool {
    let Some(since) = options.since else {
        return true;
    };
    let cutoff = since.and_time(NaiveTime::MIN).and_utc();
    summary.recency().is_some_and(|at| at >= cutoff)
}

/// Runs a search over prepared conversations
///
/// An empty (or all-whitespace) query returns every conversation unscored, in input order.
/// Otherwise only conversations with at least one match are returned, by score descending
/// then recency descending. `since` and `limit` apply in both cases.
pub fn search(conversations: &[SearchableConversation], query: &str, options: &SearchOptions) -> Vec<SearchResult> {
    let query_lower = query.trim().to_lowercase();

    let mut results: Vec<SearchResult> = if query_lower.is_empty() {
        conversations
            .iter()
            .filter(|c| passes_since(&c.summary, options))
            .map(|c| SearchResult { summary: c.summary.clone(), matches: Vec::new(), relevance_score: None })
            .collect()
    } else {
        let mut scored: Vec<SearchResult> = conversations
            .par_iter()
            .filter(|c| passes_since(&c.summary, options))
            .filter_map(|c| {
                let (score, matches) = score_conversation(c, &query_lower, options.scope)?;
                Some(SearchResult { summary: c.summary.clone(), matches, relevance_score: Some(score) })
            })
            .collect();
        scored.sort_by(compare_ranked);
        scored
    };

    if let Some(limit) = options.limit {
        results.truncate(limit);
    }
    results
}

fn compare_ranked(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.relevance_score
        .cmp(&a.relevance_score)
        .then_with(|| b.summary.recency().cmp(&a.summary.recency()))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use super::*;

    fn conversation(title: &str, updated: i64, messages: &[(&str, &str)]) -> SearchableConversation {
        SearchableConversation {
            summary: ConversationSummary {
                id: title.to_lowercase(),
                title: title.to_string(),
                create_time: None,
                update_time: DateTime::from_timestamp(updated, 0),
                file_name: format!("{}.json", title),
                message_count: messages.len(),
            },
            messages: messages
                .iter()
                .enumerate()
                .map(|(i, (role, text))| SearchableMessage {
                    node_id: format!("n{}", i),
                    role: role.to_string(),
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_title_and_content_weights() {
        let c = conversation("Rust tips", 0, &[("assistant", "rust is fast, rust is safe")]);
        let (score, matches) = score_conversation(&c, "rust", SearchScope::All).unwrap();
        assert_eq!(score, 10 + 2 * 2);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].hits, 2);
    }

    #[test]
    fn test_exact_message_and_user_bonus() {
        let c = conversation("Chat", 0, &[("user", "  Hello  ")]);
        let (score, _) = score_conversation(&c, "hello", SearchScope::Content).unwrap();
        assert_eq!(score, 2 + 3 + 1);
    }

    #[test]
    fn test_scope_restricts_matching() {
        let c = conversation("Rust", 0, &[("assistant", "nothing here")]);
        assert!(score_conversation(&c, "rust", SearchScope::Content).is_none());
        assert!(score_conversation(&c, "nothing", SearchScope::Title).is_none());
    }

    #[test]
    fn test_empty_query_returns_everything_in_input_order() {
        let convs = vec![conversation("B", 1, &[]), conversation("A", 2, &[])];
        let results = search(&convs, "   ", &SearchOptions::default());
        let titles: Vec<&str> = results.iter().map(|r| r.summary.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert!(results.iter().all(|r| r.relevance_score.is_none()));
    }

    #[test]
    fn test_ranking_by_score_then_recency() {
        let convs = vec![
            conversation("old match", 100, &[("assistant", "match")]),
            conversation("none", 300, &[("assistant", "other")]),
            conversation("new match", 200, &[("assistant", "match")]),
            conversation("Match match", 50, &[]),
        ];

        let results = search(&convs, "Match", &SearchOptions::default());
        let titles: Vec<&str> = results.iter().map(|r| r.summary.title.as_str()).collect();
        assert_eq!(titles, vec!["Match match", "new match", "old match"]);
    }

    #[test]
    fn test_since_and_limit() {
        let convs = vec![
            conversation("a", 1_700_000_000, &[]),
            conversation("b", 1_600_000_000, &[]),
            conversation("c", 1_700_000_100, &[]),
        ];
        let options = SearchOptions {
            since: NaiveDate::from_ymd_opt(2023, 1, 1),
            limit: Some(1),
            ..SearchOptions::default()
        };

        let results = search(&convs, "", &options);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].summary.title, "a");
    }

    #[test]
    fn test_snippet_context() {
        let text = format!("{}needle{}", "x".repeat(80), "y".repeat(80));
        let snippet = snippet_around(&text, 80, 6);
        assert!(snippet.starts_with('…'));
        assert!(snippet.ends_with('…'));
        assert_eq!(snippet.chars().count(), 50 + 6 + 50 + 2);

        assert_eq!(snippet_around("short needle", 6, 6), "short needle");
    }

    #[test]
    fn test_unicode_snippet_offsets() {
        let c = conversation("Chat", 0, &[("assistant", "Ünïcödé text with Needle inside")]);
        let (_, matches) = score_conversation(&c, "needle", SearchScope::Content).unwrap();
        assert!(matches[0].snippet.contains("Needle"));
    }

    #[test]
    fn test_snippet_window_with_expanding_lowercase() {
        let text = format!("{}{}needle{}", "İ".repeat(60), "y".repeat(60), "z".repeat(60));
        let c = conversation("Chat", 0, &[("assistant", text.as_str())]);
        let (_, matches) = score_conversation(&c, "needle", SearchScope::Content).unwrap();

        let expected = format!("…{}needle{}…", "y".repeat(50), "z".repeat(50));
        assert_eq!(matches[0].snippet, expected);
    }

    #[test]
    fn test_hit_length_measured_in_original_chars() {
        assert_eq!(find_hits("x\u{130}y", "i\u{307}"), (1, Some((1, 1))));
        assert_eq!(find_hits("ab AB ab", "ab"), (3, Some((0, 2))));
    }
}
