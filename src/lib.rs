//! A tag-based syntax highlighting core: an interned tag lattice with
//! a modifier algebra, a selector DSL that compiles to per-node-type
//! rule chains, tag-to-class highlighter mapping, and a tree-walking
//! resolver that turns a host's syntax tree into emitted text spans.
//!
//! This crate owns none of a syntax tree, a parser, or a text buffer —
//! see [`tree`] for the collaborator interfaces a host implements.

pub mod emit;
pub mod error;
pub mod mapping;
pub mod rule;
pub mod selector;
pub mod tag;
pub mod tree;
pub mod walk;

pub use emit::{highlight_code, Sink, TextSource};
pub use error::Error;
pub use mapping::{class_highlighter, compose, tag_highlighter, Highlighter};
pub use rule::{match_cursor, Mode, Rule, RULE_PROP};
pub use selector::{style_tags, RuleTable};
pub use tag::{Lattice, Modifier, Tag};
pub use tree::{Cursor, Mount, MountedTree, NodeProp, OverlayRange, PropStore};
pub use walk::highlight_tree;
