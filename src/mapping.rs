//! Component E: mapping tags to renderable classes.
//!
//! A [`Highlighter`] turns a tag into zero or more class strings; when
//! several apply to the same emitted span they compose by
//! concatenation (space-separated), each respecting its own optional
//! scope predicate. Grounded on `helix-view/src/theme.rs`'s style
//! lookup (fall back through a specificity chain until something
//! matches) and on `helix-syntax/src/highlighter.rs`'s layered
//! highlighter composition.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::tag::{Lattice, Tag};

/// A single mapping from tags to style output, with an optional scope
/// gate (spec.md §6: "highlighters may be scoped to only apply within
/// a given language/region").
#[derive(Clone)]
pub struct Highlighter {
    style: Arc<dyn Fn(&Lattice, Tag) -> Option<String> + Send + Sync>,
    scope: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl Highlighter {
    /// Builds a highlighter directly from a style function, with no
    /// scope restriction.
    pub fn new(style: impl Fn(&Lattice, Tag) -> Option<String> + Send + Sync + 'static) -> Self {
        Highlighter {
            style: Arc::new(style),
            scope: None,
        }
    }

    /// Restricts this highlighter to apply only when `predicate`
    /// accepts the active scope name (spec.md §4.F: "only consider
    /// highlighters whose scope predicate accepts the current top
    /// node's language name").
    pub fn scoped(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.scope = Some(Arc::new(predicate));
        self
    }

    /// Whether this highlighter is active for the given scope name. A
    /// highlighter with no scope predicate is always active.
    pub fn accepts_scope(&self, scope: &str) -> bool {
        self.scope.as_ref().map_or(true, |pred| pred(scope))
    }

    /// Resolves `tag` to a style string through this highlighter
    /// alone, without scope gating (callers that already filtered by
    /// scope call this directly).
    pub fn resolve(&self, lattice: &Lattice, tag: Tag) -> Option<String> {
        (self.style)(lattice, tag)
    }
}

/// Builds a [`Highlighter`] from an explicit tag -> class table,
/// falling back through the tag's specificity chain (spec.md §4.E
/// step 2: "scan `T.set` in order, first hit wins") so an unmapped
/// modified tag still resolves through its less-specific ancestors.
///
/// `all`, if present, is a baseline class prepended to whatever the
/// table matches, and returned alone when the table matches nothing
/// (spec.md §4.E steps 1 and 3). Useful for a highlighter that wants
/// every styled tag to carry a common class regardless of which
/// specific one it is.
pub fn tag_highlighter(table: impl IntoIterator<Item = (Tag, String)>, all: Option<String>) -> Highlighter {
    let table: HashMap<Tag, String, ahash::RandomState> = table.into_iter().collect();
    Highlighter::new(move |lattice, tag| {
        let matched = lattice
            .set(tag)
            .iter()
            .find_map(|candidate| table.get(candidate).cloned());
        match (&all, matched) {
            (Some(all), Some(m)) => Some(format!("{all} {m}")),
            (Some(all), None) => Some(all.clone()),
            (None, matched) => matched,
        }
    })
}

/// Builds a [`Highlighter`] that maps every tag in a lattice to a CSS
/// class of the form `"{prefix}{dotted.name}"`, joining a modified
/// tag's own modifier names with its base's name (e.g.
/// `"hl-bold-variableName"`), mirroring `@lezer/highlight`'s
/// `classHighlighter` default naming and `helix-view/src/theme.rs`'s
/// `.`-joined scope-to-class convention.
pub fn class_highlighter(prefix: impl Into<String>) -> Highlighter {
    let prefix = prefix.into();
    Highlighter::new(move |lattice, tag| {
        let mut parts: Vec<String> = lattice
            .modified(tag)
            .iter()
            .filter_map(|m| lattice.modifier_name(*m))
            .map(str::to_owned)
            .collect();
        parts.sort();
        let base = lattice.base(tag).unwrap_or(tag);
        let base_name = lattice.name(base)?;
        parts.push(base_name.to_owned());
        Some(format!("{prefix}{}", parts.join("-")))
    })
}

/// Composes several highlighters into one: for a given tag and active
/// scope, each highlighter that accepts the scope and resolves the tag
/// to a non-empty class contributes it; results are joined with a
/// single space in highlighter order (spec.md §4.F step 5).
pub fn compose(highlighters: &[Highlighter], lattice: &Lattice, tag: Tag, scope: &str) -> Option<String> {
    let mut out = String::new();
    let mut any_accepted_scope = false;
    for highlighter in highlighters {
        if !highlighter.accepts_scope(scope) {
            continue;
        }
        any_accepted_scope = true;
        if let Some(class) = highlighter.resolve(lattice, tag) {
            if class.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&class);
        }
    }
    if !highlighters.is_empty() && !any_accepted_scope {
        log::trace!("no highlighter's scope predicate accepted {scope:?}");
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
