use regex::{Regex, RegexBuilder};

use crate::error::Result;

/// One hit in the output buffer, as byte offsets (`start..end`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    pub start: usize,
    pub end: usize,
}

impl Match {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Search index state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    HasMatches,
}

/// Regex search over a text buffer with cyclic navigation.
///
/// Pure state over offsets: highlighting and scrolling belong to the caller.
#[derive(Debug, Default, Clone)]
pub struct SearchIndex {
    matches: Vec<Match>,
    current: Option<usize>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find every match of `pattern` in `buffer`, replacing previous results.
    ///
    /// The selection is reset. An empty pattern clears everything. A pattern
    /// that does not compile clears the matches and returns the error.
    ///
    /// Each match extends from where the regex matched for as many
    /// characters as the *pattern text* has, not as far as the regex
    /// actually matched. For literal patterns the two agree; for something
    /// like `a+` the highlighted span may be shorter or longer than the
    /// real match.
    pub fn search(&mut self, buffer: &str, pattern: &str) -> Result<&[Match]> {
        self.matches.clear();
        self.current = None;

        if pattern.is_empty() {
            return Ok(&self.matches);
        }

        let regex = compile(pattern)?;
        let extent = pattern.chars().count();

        let mut cursor = 0;
        while cursor <= buffer.len() {
            let Some(found) = regex.find_at(buffer, cursor) else {
                break;
            };
            let start = found.start();
            let end = advance_chars(buffer, start, extent);
            if end == start {
                // Only possible at the very end of the buffer
                break;
            }
            self.matches.push(Match { start, end });
            cursor = end;
        }

        tracing::debug!(
            "search for {:?} found {} matches",
            pattern,
            self.matches.len()
        );
        Ok(&self.matches)
    }

    /// Drop all matches and the selection
    pub fn clear(&mut self) {
        self.matches.clear();
        self.current = None;
    }

    pub fn state(&self) -> SearchState {
        if self.matches.is_empty() {
            SearchState::Idle
        } else {
            SearchState::HasMatches
        }
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_match(&self) -> Option<Match> {
        self.current.and_then(|i| self.matches.get(i).copied())
    }

    /// Select the following match, wrapping from last to first
    pub fn next(&mut self) -> Option<usize> {
        let count = self.matches.len();
        if count == 0 {
            return self.current;
        }
        self.current = Some(match self.current {
            Some(i) => (i + 1) % count,
            None => 0,
        });
        self.current
    }

    /// Select the preceding match, wrapping from first to last
    pub fn previous(&mut self) -> Option<usize> {
        let count = self.matches.len();
        if count == 0 {
            return self.current;
        }
        self.current = Some(match self.current {
            Some(i) => (i + count - 1) % count,
            None => count - 1,
        });
        self.current
    }

    /// `(displayed_current, total)`: 1-based selection, or 0 without one
    pub fn status(&self) -> (usize, usize) {
        status(self.current, self.matches.len())
    }
}

/// Status pair for a selection over `count` matches
pub fn status(current: Option<usize>, count: usize) -> (usize, usize) {
    (current.map_or(0, |i| i + 1), count)
}

/// Check that `pattern` compiles, without searching anything
pub fn validate_pattern(pattern: &str) -> Result<()> {
    compile(pattern).map(|_| ())
}

fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).multi_line(true).build()?)
}

/// Byte offset `n` characters past `start`, clamped to the end of `text`
fn advance_chars(text: &str, start: usize, n: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(offset, _)| start + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn spans(index: &SearchIndex) -> Vec<(usize, usize)> {
        index.matches().iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn test_literal_matches() {
        let mut index = SearchIndex::new();
        index.search("foo bar foo", "foo").unwrap();
        assert_eq!(spans(&index), vec![(0, 3), (8, 11)]);
        assert_eq!(index.state(), SearchState::HasMatches);
        assert_eq!(index.status(), (0, 2));

        index.next();
        assert_eq!(index.status(), (1, 2));
    }

    #[test]
    fn test_empty_pattern_resets() {
        let mut index = SearchIndex::new();
        index.search("foo", "o").unwrap();
        index.next();

        assert!(index.search("foo", "").unwrap().is_empty());
        assert_eq!(index.current(), None);
        assert_eq!(index.state(), SearchState::Idle);
        assert_eq!(index.status(), (0, 0));
    }

    #[test]
    fn test_invalid_pattern_clears_matches() {
        let mut index = SearchIndex::new();
        index.search("foo foo", "foo").unwrap();
        index.next();

        let err = index.search("foo foo", "foo(").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
        assert!(index.matches().is_empty());
        assert_eq!(index.current(), None);
    }

    #[test]
    fn test_search_is_idempotent() {
        let buffer = "module.vpc: Refreshing state...\nmodule.db: Refreshing state...\n";
        let mut index = SearchIndex::new();
        let first = index.search(buffer, r"Refresh\w+").unwrap().to_vec();
        let second = index.search(buffer, r"Refresh\w+").unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_extent_uses_pattern_length() {
        let mut index = SearchIndex::new();
        // `a+` matches "aaaa" but the span is two characters wide
        index.search("aaaa b", "a+").unwrap();
        assert_eq!(spans(&index), vec![(0, 2), (2, 4)]);

        // Pattern text longer than the match
        index.search("ab ab", r"a\w").unwrap();
        assert_eq!(spans(&index), vec![(0, 3), (3, 5)]);
    }

    #[test]
    fn test_extent_clamped_at_buffer_end() {
        let mut index = SearchIndex::new();
        index.search("xx ab", r"a\w").unwrap();
        assert_eq!(spans(&index), vec![(3, 5)]);
    }

    #[test]
    fn test_extent_counts_characters() {
        let mut index = SearchIndex::new();
        let buffer = "héllo héllo";
        index.search(buffer, "é").unwrap();
        assert_eq!(spans(&index), vec![(1, 3), (8, 10)]);
        for m in index.matches() {
            assert_eq!(&buffer[m.range()], "é");
        }
    }

    #[test]
    fn test_anchors_are_per_line() {
        let mut index = SearchIndex::new();
        index.search("Plan: 1\nPlan: 2\n", "^Plan").unwrap();
        assert_eq!(spans(&index), vec![(0, 5), (8, 13)]);
    }

    #[test]
    fn test_end_anchor_does_not_loop() {
        let mut index = SearchIndex::new();
        index.search("abc", "$").unwrap();
        assert!(index.matches().is_empty());
    }

    #[test]
    fn test_next_cycles() {
        let mut index = SearchIndex::new();
        index.search("x x x", "x").unwrap();
        assert_eq!(index.next(), Some(0));

        let n = index.matches().len();
        for _ in 0..n {
            index.next();
        }
        assert_eq!(index.current(), Some(0));
    }

    #[test]
    fn test_previous_wraps() {
        let mut index = SearchIndex::new();
        index.search("x x x", "x").unwrap();
        index.next();
        assert_eq!(index.previous(), Some(2));
        assert_eq!(index.previous(), Some(1));
    }

    #[test]
    fn test_previous_without_selection_goes_to_last() {
        let mut index = SearchIndex::new();
        index.search("x x x", "x").unwrap();
        assert_eq!(index.previous(), Some(2));
    }

    #[test]
    fn test_navigation_without_matches_is_noop() {
        let mut index = SearchIndex::new();
        index.search("abc", "z").unwrap();
        assert_eq!(index.next(), None);
        assert_eq!(index.previous(), None);
        assert_eq!(index.current_match(), None);
    }

    #[test]
    fn test_status_helper() {
        assert_eq!(status(None, 4), (0, 4));
        assert_eq!(status(Some(3), 4), (4, 4));
    }
}
