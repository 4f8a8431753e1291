//! Keyword search and ranking
//!
//! A query is split on whitespace into lowercase terms. A document matches
//! only if every term is a substring of its name or description (or content,
//! when content search is enabled). Name hits weigh the most, content hits
//! the least.

use serde::Serialize;

use super::doc::DocSummary;

/// Score for a term found in the name
pub const NAME_WEIGHT: u32 = 10;

/// Score for a term found in the description
pub const DESCRIPTION_WEIGHT: u32 = 5;

/// Score for a term found in the content
pub const CONTENT_WEIGHT: u32 = 2;

/// Default number of results
pub const DEFAULT_LIMIT: usize = 10;

/// Which fields a query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    NameAndDescription,
    IncludeContent,
}

/// A parsed search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    terms: Vec<String>,
}

impl Query {
    pub fn parse(query: &str) -> Self {
        Self {
            terms: query.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// An empty query matches nothing
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Scores a candidate, or returns None if some term matches nowhere
    pub fn score(&self, name: &str, description: &str, content: Option<&str>) -> Option<u32> {
        if self.is_empty() {
            return None;
        }

        let name = name.to_lowercase();
        let description = description.to_lowercase();
        let content = content.map(str::to_lowercase);

        let mut total = 0;
        for term in &self.terms {
            let in_name = name.contains(term.as_str());
            let in_description = description.contains(term.as_str());
            let in_content = content.as_deref().is_some_and(|c| c.contains(term.as_str()));

            if !(in_name || in_description || in_content) {
                return None;
            }

            if in_name {
                total += NAME_WEIGHT;
            }
            if in_description {
                total += DESCRIPTION_WEIGHT;
            }
            if in_content {
                total += CONTENT_WEIGHT;
            }
        }

        Some(total)
    }
}

/// A ranked search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub doc: DocSummary,
    pub score: u32,
}

/// Ranks candidates against a query
///
/// `content_of` supplies bodies for content-inclusive search; it is only
/// consulted when `scope` is [`SearchScope::IncludeContent`].
pub fn rank<F>(
    query: &Query,
    candidates: Vec<DocSummary>,
    scope: SearchScope,
    limit: usize,
    mut content_of: F,
) -> Vec<SearchHit>
where
    F: FnMut(&DocSummary) -> Option<String>,
{
    if query.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter_map(|doc| {
            let content = match scope {
                SearchScope::NameAndDescription => None,
                SearchScope::IncludeContent => content_of(&doc),
            };
            query
                .score(doc.name.as_str(), &doc.description, content.as_deref())
                .map(|score| SearchHit { doc, score })
        })
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.doc.name.cmp(&b.doc.name)));
    hits.truncate(limit);
    hits
}
