//! Components C+D: compiled `Rule`s, the node-type property that
//! attaches them, and context matching against a cursor position.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::tag::Tag;
use crate::tree::{Cursor, NodeProp, PropStore};

/// How a matched rule's classes propagate to descendants (spec.md §3/§9).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Apply to this node only.
    Normal,
    /// Apply to this node and force the classes onto every descendant
    /// (until a mount boundary without an overlay intervenes).
    Inherit,
    /// Apply to this node; do not descend into children at all.
    Opaque,
}

/// One compiled selector fragment: the tags to apply, the mode, an
/// optional ancestor-name context, and the next rule for the same
/// target name (ordered by context depth descending).
pub struct Rule {
    pub tags: Vec<Tag>,
    pub mode: Mode,
    /// `[p1, .., pk]` in the order they were written (`p1` outermost,
    /// `pk` the immediate parent); `None` means "matches everywhere".
    pub context: Option<Vec<String>>,
    pub next: Option<Arc<Rule>>,
}

impl Rule {
    pub fn depth(&self) -> usize {
        self.context.as_ref().map_or(0, Vec::len)
    }
}

/// The single well-known property key this crate reserves on node
/// types (spec.md §4.C): the head of a node type's compiled rule
/// chain, attached once at language-authoring time and read with no
/// further allocation at match time.
pub static RULE_PROP: Lazy<NodeProp<Arc<Rule>>> = Lazy::new(NodeProp::new);

/// Attaches `rule` as `node_type`'s compiled rule chain.
///
/// Called once per node type when a language installs a compiled
/// [`crate::selector::RuleTable`] (see `RuleTable::install`).
pub fn attach(store: &mut PropStore, rule: Arc<Rule>) {
    store.set(&RULE_PROP, rule);
}

/// Component D: returns the first rule in the cursor's node type's
/// chain whose context is absent or satisfied by the cursor's
/// ancestors, per spec.md §4.D. Total — a node with no attached rule,
/// or no context-satisfying rule in its chain, simply yields `None`.
pub fn match_cursor(cursor: &dyn Cursor) -> Option<Arc<Rule>> {
    let mut next = cursor.rule();
    let had_chain = next.is_some();
    while let Some(rule) = next {
        let satisfied = match &rule.context {
            None => true,
            Some(context) => {
                let path: Vec<&str> = context.iter().map(String::as_str).collect();
                cursor.match_context(&path)
            }
        };
        if satisfied {
            return Some(rule);
        }
        next = rule.next.clone();
    }
    if had_chain {
        log::trace!(
            "node type {:?} has a rule chain but none of its contexts matched here",
            cursor.name()
        );
    }
    None
}
