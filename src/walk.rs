//! Component F: the tree-walking resolver.
//!
//! Recurses a [`Cursor`] left to right, resolving each node's rule
//! (if any) to a class string through the active [`Highlighter`]s,
//! honoring [`Mode`] propagation and mount/overlay boundaries, and
//! coalescing adjacent same-class spans before emission.
//!
//! Grounded on `helix-core/src/syntax/overlay.rs`'s host-gap/inner-range
//! alternation (a mount's overlay ranges carve its host node's span
//! into "outside the mount" and "inside the mount" stretches, emitted
//! in ascending order) and on `helix-syntax/src/highlighter.rs`'s
//! `HighlightEvent` merge/coalesce discipline.

use crate::mapping::{compose, Highlighter};
use crate::rule::{match_cursor, Mode};
use crate::tag::Lattice;
use crate::tree::Cursor;

/// Resolves a rule's tags against every active highlighter for the
/// current scope, joining non-empty results with a space (spec.md
/// §4.F: a rule may carry more than one tag at once, e.g. a token that
/// is simultaneously `comment` and `lineComment`).
fn resolve_tags(lattice: &Lattice, highlighters: &[Highlighter], scope: &str, tags: &[crate::tag::Tag]) -> Option<String> {
    let mut out = String::new();
    for tag in tags {
        if let Some(class) = compose(highlighters, lattice, *tag, scope) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&class);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn combine(inherited: Option<&str>, own: Option<&str>) -> Option<String> {
    match (inherited, own) {
        (None, None) => None,
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (Some(a), Some(b)) => Some(format!("{a} {b}")),
    }
}

/// Merges adjacent spans carrying the same class before handing them
/// to the caller's emit closure, so a run of several same-class
/// leaves produces one callback instead of many.
struct Coalescer<'a> {
    pending: Option<(usize, usize, Option<String>)>,
    emit: &'a mut dyn FnMut(usize, usize, Option<&str>),
}

impl<'a> Coalescer<'a> {
    fn new(emit: &'a mut dyn FnMut(usize, usize, Option<&str>)) -> Self {
        Coalescer { pending: None, emit }
    }

    fn push(&mut self, from: usize, to: usize, class: Option<String>) {
        if from >= to {
            return;
        }
        match &mut self.pending {
            Some((_, end, pending_class)) if *end == from && *pending_class == class => {
                *end = to;
            }
            _ => {
                self.flush();
                self.pending = Some((from, to, class));
            }
        }
    }

    fn flush(&mut self) {
        if let Some((from, to, class)) = self.pending.take() {
            (self.emit)(from, to, class.as_deref());
        }
    }
}

/// Walks `cursor` over `[from, to)`, emitting coalesced
/// `(from, to, class)` spans left to right through `emit`.
///
/// `scope` is the active highlighter scope name, switched whenever the
/// walk crosses into a node for which [`Cursor::is_top`] is true
/// (spec.md §4.F step 2 — a mounted embedded-language sub-tree's own
/// top node takes over scope selection from there down).
pub fn highlight_tree(
    cursor: &mut dyn Cursor,
    lattice: &Lattice,
    highlighters: &[Highlighter],
    scope: &str,
    from: usize,
    to: usize,
    emit: &mut dyn FnMut(usize, usize, Option<&str>),
) {
    let mut out = Coalescer::new(emit);
    walk_node(cursor, lattice, highlighters, scope, None, 0, from, to, &mut out);
    out.flush();
}

/// `offset` translates the local coordinates a mounted cursor reports
/// back into the coordinate space `emit` expects (spec.md §6: overlay
/// ranges, and by extension a mount's own cursor positions, are
/// relative to the host node's start).
#[allow(clippy::too_many_arguments)]
fn walk_node(
    cursor: &mut dyn Cursor,
    lattice: &Lattice,
    highlighters: &[Highlighter],
    scope: &str,
    inherited: Option<&str>,
    offset: usize,
    from: usize,
    to: usize,
    out: &mut Coalescer<'_>,
) {
    let node_from = cursor.from();
    let node_to = cursor.to();
    if node_to <= from || node_from >= to {
        return;
    }

    let scope_owned;
    let scope = if cursor.is_top() {
        scope_owned = cursor.name().to_string();
        scope_owned.as_str()
    } else {
        scope
    };

    let rule = match_cursor(cursor);
    let own_class = rule
        .as_ref()
        .and_then(|r| resolve_tags(lattice, highlighters, scope, &r.tags));
    let effective = combine(inherited, own_class.as_deref());
    let mode = rule.as_ref().map_or(Mode::Normal, |r| r.mode);

    let clip = |p: usize| p.clamp(from, to);

    if let Mode::Opaque = mode {
        out.push(offset + clip(node_from), offset + clip(node_to), effective);
        return;
    }

    if let Some(mount) = cursor.mount() {
        walk_mount(
            cursor, mount, lattice, highlighters, scope, effective.as_deref(), offset, from, to, out,
        );
        return;
    }

    let child_inherited = match mode {
        Mode::Inherit => effective.clone(),
        _ => inherited.map(str::to_string),
    };

    let node_start = offset + clip(node_from);
    let node_end = offset + clip(node_to);

    if !cursor.first_child() {
        out.push(node_start, node_end, effective);
        return;
    }

    // Accumulating-span model (spec.md §4.F): the node's own class
    // covers every stretch between and around its children, not just
    // the children themselves. Re-asserted after each child and
    // flushed once recursion finishes, mirroring the host-gap handling
    // `walk_mount` already does for overlay ranges.
    let mut at = node_start;
    loop {
        let child_start = offset + clip(cursor.from());
        if child_start > at {
            out.push(at, child_start, effective.clone());
        }
        walk_node(
            cursor,
            lattice,
            highlighters,
            scope,
            child_inherited.as_deref(),
            offset,
            from,
            to,
            out,
        );
        at = offset + clip(cursor.to());
        if !cursor.next_sibling() {
            break;
        }
    }
    cursor.parent();
    if at < node_end {
        out.push(at, node_end, effective);
    }
}

#[allow(clippy::too_many_arguments)]
fn walk_mount(
    cursor: &mut dyn Cursor,
    mount: crate::tree::Mount<'_>,
    lattice: &Lattice,
    highlighters: &[Highlighter],
    scope: &str,
    own_effective: Option<&str>,
    offset: usize,
    from: usize,
    to: usize,
    out: &mut Coalescer<'_>,
) {
    let host_from = cursor.from();
    let host_to = cursor.to();
    let window_from = host_from.max(from);
    let window_to = host_to.min(to);
    if window_from >= window_to {
        return;
    }

    let Some(tree) = mount.tree else {
        out.push(
            offset + window_from,
            offset + window_to,
            own_effective.map(str::to_string),
        );
        return;
    };

    let Some(overlay) = mount.overlay else {
        // Whole node delegates to the mounted tree; its cursor's own
        // coordinates are local to the mount, so the host's absolute
        // start becomes the new translation offset.
        let mut inner = tree.cursor();
        let local_from = window_from.saturating_sub(host_from);
        let local_to = window_to.saturating_sub(host_from);
        walk_node(
            &mut *inner,
            lattice,
            highlighters,
            scope,
            None,
            offset + host_from,
            local_from,
            local_to,
            out,
        );
        return;
    };

    let mut pos = window_from;
    for range in overlay {
        let abs_from = (host_from + range.from).max(window_from);
        let abs_to = (host_from + range.to).min(window_to);
        if abs_from >= pos.max(window_from) && pos < abs_from {
            out.push(offset + pos, offset + abs_from, own_effective.map(str::to_string));
        }
        if abs_from < abs_to {
            let mut inner = tree.cursor();
            walk_node(
                &mut *inner,
                lattice,
                highlighters,
                scope,
                None,
                offset + host_from,
                abs_from.saturating_sub(host_from),
                abs_to.saturating_sub(host_from),
                out,
            );
        }
        pos = pos.max(abs_to);
    }
    if pos < window_to {
        out.push(offset + pos, offset + window_to, own_effective.map(str::to_string));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;
    use crate::tag::Lattice;
    use crate::tree::{Mount, OverlayRange};
    use std::sync::Arc;

    /// A tiny in-memory tree: each `StubNode` knows its children and
    /// an optional attached rule. The cursor is a path (stack of
    /// indices) into this tree, matching `helix-syntax`'s cursor shape
    /// of "current position plus enough state to navigate".
    struct StubNode {
        name: &'static str,
        from: usize,
        to: usize,
        rule: Option<Arc<Rule>>,
        children: Vec<StubNode>,
        mount: Option<(Box<StubNode>, Option<Vec<OverlayRange>>)>,
    }

    impl crate::tree::MountedTree for StubNode {
        fn len(&self) -> usize {
            self.to - self.from
        }
        fn cursor(&self) -> Box<dyn Cursor + '_> {
            Box::new(StubCursor::new(self))
        }
    }

    struct StubCursor<'a> {
        root: &'a StubNode,
        path: Vec<usize>,
    }

    impl<'a> StubCursor<'a> {
        fn new(root: &'a StubNode) -> Self {
            StubCursor { root, path: vec![] }
        }

        fn current(&self) -> &'a StubNode {
            let mut node = self.root;
            for &i in &self.path {
                node = &node.children[i];
            }
            node
        }
    }

    impl<'a> Cursor for StubCursor<'a> {
        fn name(&self) -> &str {
            self.current().name
        }
        fn is_top(&self) -> bool {
            self.path.is_empty()
        }
        fn from(&self) -> usize {
            self.current().from
        }
        fn to(&self) -> usize {
            self.current().to
        }
        fn first_child(&mut self) -> bool {
            if self.current().children.is_empty() {
                false
            } else {
                self.path.push(0);
                true
            }
        }
        fn next_sibling(&mut self) -> bool {
            let Some(last) = self.path.last_mut() else {
                return false;
            };
            let parent_children_len = {
                let mut node = self.root;
                for &i in &self.path[..self.path.len() - 1] {
                    node = &node.children[i];
                }
                node.children.len()
            };
            if *last + 1 < parent_children_len {
                *last += 1;
                true
            } else {
                false
            }
        }
        fn parent(&mut self) -> bool {
            self.path.pop().is_some()
        }
        fn match_context(&self, _path: &[&str]) -> bool {
            true
        }
        fn rule(&self) -> Option<Arc<Rule>> {
            self.current().rule.clone()
        }
        fn mount(&self) -> Option<Mount<'_>> {
            self.current().mount.as_ref().map(|(tree, overlay)| Mount {
                tree: Some(tree.as_ref() as &dyn crate::tree::MountedTree),
                overlay: overlay.as_deref(),
            })
        }
    }

    fn leaf_rule(tags: Vec<crate::tag::Tag>, mode: Mode) -> Arc<Rule> {
        Arc::new(Rule {
            tags,
            mode,
            context: None,
            next: None,
        })
    }

    #[test]
    fn plain_rule_emits_one_span() {
        let mut lattice = Lattice::new();
        let keyword = lattice.define(Some("keyword"), None).unwrap();
        let highlighter = crate::mapping::tag_highlighter([(keyword, "kw".to_string())], None);

        let root = StubNode {
            name: "root",
            from: 0,
            to: 3,
            rule: Some(leaf_rule(vec![keyword], Mode::Normal)),
            children: vec![],
            mount: None,
        };

        let mut spans = Vec::new();
        let mut cursor = StubCursor::new(&root);
        highlight_tree(&mut cursor, &lattice, &[highlighter], "lang", 0, 3, &mut |f, t, c| {
            spans.push((f, t, c.map(str::to_string)));
        });
        assert_eq!(spans, vec![(0, 3, Some("kw".to_string()))]);
    }

    /// The trailing `[4, 5)` has no child at all, so the parent's own
    /// `Inherit`-mode class must re-open there too (spec.md §4.F).
    #[test]
    fn inherit_mode_propagates_to_children_until_overridden() {
        let mut lattice = Lattice::new();
        let string = lattice.define(Some("string"), None).unwrap();
        let escape = lattice.define(Some("escape"), None).unwrap();
        let highlighter = crate::mapping::tag_highlighter(
            [(string, "str".to_string()), (escape, "esc".to_string())],
            None,
        );

        let root = StubNode {
            name: "string",
            from: 0,
            to: 5,
            rule: Some(leaf_rule(vec![string], Mode::Inherit)),
            children: vec![
                StubNode {
                    name: "text",
                    from: 0,
                    to: 2,
                    rule: None,
                    children: vec![],
                    mount: None,
                },
                StubNode {
                    name: "escape",
                    from: 2,
                    to: 4,
                    rule: Some(leaf_rule(vec![escape], Mode::Normal)),
                    children: vec![],
                    mount: None,
                },
            ],
            mount: None,
        };

        let mut spans = Vec::new();
        let mut cursor = StubCursor::new(&root);
        highlight_tree(&mut cursor, &lattice, &[highlighter], "lang", 0, 5, &mut |f, t, c| {
            spans.push((f, t, c.map(str::to_string)));
        });
        assert_eq!(
            spans,
            vec![
                (0, 2, Some("str".to_string())),
                (2, 4, Some("str esc".to_string())),
                (4, 5, Some("str".to_string())),
            ]
        );
    }

    #[test]
    fn opaque_mode_stops_descent() {
        let mut lattice = Lattice::new();
        let comment = lattice.define(Some("comment"), None).unwrap();
        let keyword = lattice.define(Some("keyword"), None).unwrap();
        let highlighter = crate::mapping::tag_highlighter(
            [(comment, "cmt".to_string()), (keyword, "kw".to_string())],
            None,
        );

        let root = StubNode {
            name: "comment",
            from: 0,
            to: 4,
            rule: Some(leaf_rule(vec![comment], Mode::Opaque)),
            children: vec![StubNode {
                name: "fake_keyword",
                from: 0,
                to: 4,
                rule: Some(leaf_rule(vec![keyword], Mode::Normal)),
                children: vec![],
                mount: None,
            }],
            mount: None,
        };

        let mut spans = Vec::new();
        let mut cursor = StubCursor::new(&root);
        highlight_tree(&mut cursor, &lattice, &[highlighter], "lang", 0, 4, &mut |f, t, c| {
            spans.push((f, t, c.map(str::to_string)));
        });
        assert_eq!(spans, vec![(0, 4, Some("cmt".to_string()))]);
    }

    #[test]
    fn adjacent_same_class_leaves_coalesce() {
        let mut lattice = Lattice::new();
        let keyword = lattice.define(Some("keyword"), None).unwrap();
        let highlighter = crate::mapping::tag_highlighter([(keyword, "kw".to_string())], None);

        let root = StubNode {
            name: "root",
            from: 0,
            to: 6,
            rule: None,
            children: vec![
                StubNode {
                    name: "a",
                    from: 0,
                    to: 3,
                    rule: Some(leaf_rule(vec![keyword], Mode::Normal)),
                    children: vec![],
                    mount: None,
                },
                StubNode {
                    name: "b",
                    from: 3,
                    to: 6,
                    rule: Some(leaf_rule(vec![keyword], Mode::Normal)),
                    children: vec![],
                    mount: None,
                },
            ],
            mount: None,
        };

        let mut spans = Vec::new();
        let mut cursor = StubCursor::new(&root);
        highlight_tree(&mut cursor, &lattice, &[highlighter], "lang", 0, 6, &mut |f, t, c| {
            spans.push((f, t, c.map(str::to_string)));
        });
        assert_eq!(spans, vec![(0, 6, Some("kw".to_string()))]);
    }

    #[test]
    fn range_clipping_respects_from_to_window() {
        let mut lattice = Lattice::new();
        let keyword = lattice.define(Some("keyword"), None).unwrap();
        let highlighter = crate::mapping::tag_highlighter([(keyword, "kw".to_string())], None);

        let root = StubNode {
            name: "root",
            from: 0,
            to: 10,
            rule: Some(leaf_rule(vec![keyword], Mode::Normal)),
            children: vec![],
            mount: None,
        };

        let mut spans = Vec::new();
        let mut cursor = StubCursor::new(&root);
        highlight_tree(&mut cursor, &lattice, &[highlighter], "lang", 3, 7, &mut |f, t, c| {
            spans.push((f, t, c.map(str::to_string)));
        });
        assert_eq!(spans, vec![(3, 7, Some("kw".to_string()))]);
    }

    /// A mount without an overlay replaces the host node's own
    /// subtree entirely; the host's `Inherit`-mode class must not leak
    /// into the mounted tree — the embedded grammar's own rules (or
    /// lack of them) are all that apply from the boundary down.
    #[test]
    fn mount_without_overlay_resets_inherited_class() {
        let mut lattice = Lattice::new();
        let string = lattice.define(Some("string"), None).unwrap();
        let embedded_word = lattice.define(Some("embeddedWord"), None).unwrap();
        let highlighter = crate::mapping::tag_highlighter(
            [(string, "str".to_string()), (embedded_word, "ew".to_string())],
            None,
        );

        let embedded_root = StubNode {
            name: "embeddedRoot",
            from: 0,
            to: 5,
            rule: None,
            children: vec![StubNode {
                name: "word",
                from: 0,
                to: 5,
                rule: Some(leaf_rule(vec![embedded_word], Mode::Normal)),
                children: vec![],
                mount: None,
            }],
            mount: None,
        };
        let root = StubNode {
            name: "string",
            from: 0,
            to: 5,
            rule: Some(leaf_rule(vec![string], Mode::Inherit)),
            children: vec![],
            mount: Some((Box::new(embedded_root), None)),
        };

        let mut spans = Vec::new();
        let mut cursor = StubCursor::new(&root);
        highlight_tree(&mut cursor, &lattice, &[highlighter], "lang", 0, 5, &mut |f, t, c| {
            spans.push((f, t, c.map(str::to_string)));
        });
        // Only "ew" from the embedded tree's own rule — the host's
        // inherited "str" never crosses the mount boundary.
        assert_eq!(spans, vec![(0, 5, Some("ew".to_string()))]);
    }
}
