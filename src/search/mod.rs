//! Regex search over the command output.
//!
//! ```
//! use lieutenant::search::SearchIndex;
//!
//! let mut index = SearchIndex::new();
//! index.search("foo bar foo", "foo").unwrap();
//! index.next();
//! assert_eq!(index.status(), (1, 2));
//! ```

mod index;

pub use index::{status, validate_pattern, Match, SearchIndex, SearchState};
