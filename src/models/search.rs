use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::ConversationSummary;

/// Which parts of a conversation a query is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchScope {
    Title,
    Content,
    #[default]
    All,
}

impl SearchScope {
    pub fn includes_title(self) -> bool {
        matches!(self, SearchScope::Title | SearchScope::All)
    }

    pub fn includes_content(self) -> bool {
        matches!(self, SearchScope::Content | SearchScope::All)
    }
}

impl FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(SearchScope::Title),
            "content" => Ok(SearchScope::Content),
            "all" => Ok(SearchScope::All),
            other => Err(format!("unknown search scope '{}' (expected title, content or all)", other)),
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchScope::Title => "title",
            SearchScope::Content => "content",
            SearchScope::All => "all",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub scope: SearchScope,
    /// Drop conversations last active before this date
    pub since: Option<NaiveDate>,
    /// Keep at most this many results
    pub limit: Option<usize>,
}

impl SearchOptions {
    pub fn with_scope(scope: SearchScope) -> Self {
        Self { scope, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchLocation {
    Title,
    Message { node_id: String, role: String },
}

/// One place a query matched, with surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub location: MatchLocation,
    pub hits: usize,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub summary: ConversationSummary,
    pub matches: Vec<SearchMatch>,
    /// `None` for unscored results (empty query)
    pub relevance_score: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parsing() {
        assert_eq!("title".parse::<SearchScope>(), Ok(SearchScope::Title));
        assert_eq!("CONTENT".parse::<SearchScope>(), Ok(SearchScope::Content));
        assert_eq!("all".parse::<SearchScope>(), Ok(SearchScope::All));
        assert!("body".parse::<SearchScope>().is_err());
    }

    #[test]
    fn test_scope_coverage() {
        assert!(SearchScope::All.includes_title());
        assert!(SearchScope::All.includes_content());
        assert!(!SearchScope::Title.includes_content());
        assert!(!SearchScope::Content.includes_title());
    }
}
