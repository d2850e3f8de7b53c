//! Compile-time failure reasons. Runtime lattice/rule/walk operations are
//! total and never return an error (spec §7).

/// Reasons a language definition fails to compile.
///
/// Both variants are programmer errors in a language definition, not
/// something a document's content can trigger, so they are reported
/// with enough context (the offending selector, the offending tag
/// names) to fix the definition rather than retry anything.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A selector string passed to [`crate::selector::style_tags`] is
    /// malformed: unbalanced quotes, an empty target piece, a stray
    /// `!`/`/...`, or an unrecognized character.
    #[error("invalid selector {part:?}: {reason}")]
    InvalidSelector { part: String, reason: &'static str },

    /// [`crate::tag::Tag::define`] was asked to derive an unmodified
    /// tag from a parent that already carries modifiers.
    #[error("cannot derive a tag from modified tag {parent:?}; base must be unmodified")]
    IllegalTagDerivation { parent: String },
}
