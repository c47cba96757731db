//! # Lieutenant - a terminal shell for long-running commands
//!
//! Lieutenant runs an external command (typically `terraform`), streams its
//! output into a scrollable pane and lets you search that output with a
//! regular expression, stepping through the hits in a cycle.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`prefs`] - Layered JSON preferences (settings, command paths, aliases)
//! - [`search`] - Regex search over the output buffer with cyclic navigation
//! - [`runner`] - Background command execution and alias resolution
//! - [`output`] - Plain streaming output with highlighted matches
//! - `tui` - Interactive terminal UI (`interactive` feature)
//!
//! ## Quick Start
//!
//! ```no_run
//! use lieutenant::prefs::PreferenceStore;
//! use lieutenant::runner::{resolve_argv, spawn, RunEvent, RunOptions};
//! use lieutenant::search::SearchIndex;
//!
//! let (store, _) = PreferenceStore::discover();
//! let argv = resolve_argv(&["terraform".into(), "plan".into()], store.prefs()).unwrap();
//!
//! let mut buffer = String::new();
//! let handle = spawn(&argv, RunOptions::attached());
//! while let Some(RunEvent::Line(line)) = handle.recv() {
//!     buffer.push_str(&line);
//!     buffer.push('\n');
//! }
//!
//! let mut index = SearchIndex::new();
//! index.search(&buffer, "will be created").unwrap();
//! index.next();
//! let (current, total) = index.status();
//! println!("{}/{} matches", current, total);
//! ```

pub mod error;
pub mod output;
pub mod prefs;
pub mod runner;
pub mod search;
#[cfg(feature = "interactive")]
pub mod tui;

pub use error::{CommandFailure, Error, Result};
