//! External collaborator interfaces (spec.md §6).
//!
//! The core never implements a concrete syntax tree, text store, or
//! node-type property facility — those are supplied by the host. This
//! module only defines the contract: [`Cursor`], [`MountedTree`], the
//! generic [`NodeProp`] attachment facility, and [`Mount`]/[`OverlayRange`].
//!
//! Grounded on `helix-syntax/src/tree_sitter/syntax_tree_node.rs` for
//! the cursor navigation shape (`first_child`/`next_sibling`/`parent`
//! returning `bool`), abstracted into a trait since the concrete tree
//! provider is explicitly out of scope here.

use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;

use crate::rule::Rule;

/// A typed, process-unique property key, analogous to a tree-sitter
/// capture index or a lezer `NodeProp`: hosts use it to attach
/// arbitrary per-node-type data (most importantly, this crate's own
/// compiled [`Rule`] chains) without per-node allocation at match time.
pub struct NodeProp<T> {
    id: u32,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> NodeProp<T> {
    pub fn new() -> Self {
        static NEXT_ID: AtomicU32 = AtomicU32::new(0);
        NodeProp {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl<T> Default for NodeProp<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple per-node-type property store a host's `NodeType`
/// implementation can embed; provided as a convenience so language
/// authors don't each need to hand-roll a `HashMap<u32, Box<dyn Any>>`.
#[derive(Default)]
pub struct PropStore {
    values: HashMap<u32, Box<dyn Any + Send + Sync>>,
}

impl PropStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Any + Send + Sync>(&mut self, prop: &NodeProp<T>, value: T) {
        self.values.insert(prop.id(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self, prop: &NodeProp<T>) -> Option<&T> {
        self.values.get(&prop.id()).and_then(|v| v.downcast_ref())
    }
}

/// A half-open, ordered overlay range relative to the mount's host
/// node start (spec.md §6).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OverlayRange {
    pub from: usize,
    pub to: usize,
}

/// A sub-tree mounted at a cursor position, with optional overlay
/// ranges restricting it to a subset of the host node's span.
pub struct Mount<'a> {
    pub tree: Option<&'a dyn MountedTree>,
    pub overlay: Option<&'a [OverlayRange]>,
}

/// A sub-tree a [`Mount`] points at: just enough surface to get a
/// cursor over it and know its length.
pub trait MountedTree {
    fn len(&self) -> usize;
    fn cursor(&self) -> Box<dyn Cursor + '_>;
}

/// A stateful cursor over a syntax tree, per spec.md §6.
///
/// `Cursor` is dyn-safe on purpose: a mounted sub-tree may be backed by
/// a wholly different concrete tree implementation than its host, so
/// the walker in [`crate::walk`] recurses across mount boundaries
/// through `Box<dyn Cursor>` rather than a single generic parameter.
pub trait Cursor {
    /// The current node's debug/matching name.
    fn name(&self) -> &str;
    /// Whether the current node is a language top node (used to
    /// switch the active highlighter scope, spec.md §4.F step 2).
    fn is_top(&self) -> bool;

    fn from(&self) -> usize;
    fn to(&self) -> usize;

    fn first_child(&mut self) -> bool;
    fn next_sibling(&mut self) -> bool;
    fn parent(&mut self) -> bool;

    /// `path` is `[p1, .., pk]` in the same left-to-right order a
    /// selector context was written in (spec.md §4.D); an empty
    /// string piece matches any parent. Satisfied when the cursor's
    /// `k` immediate ancestors, innermost first, equal `pk, .., p1`.
    fn match_context(&self, path: &[&str]) -> bool;

    /// The compiled rule chain attached to this node's type, if any —
    /// the host resolves this via its own [`PropStore`]/[`NodeProp`]
    /// under [`crate::rule::RULE_PROP`].
    fn rule(&self) -> Option<Arc<Rule>>;

    /// Mount metadata for this node, if it is a mount point.
    fn mount(&self) -> Option<Mount<'_>>;
}
