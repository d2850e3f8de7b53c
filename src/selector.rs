//! Component B: the `style_tags` selector compiler.
//!
//! Compiles the bit-exact grammar from spec.md §6 —
//! `selector := part (WS+ part)*`, `part := piece ("/" piece)* mode?`,
//! `mode := "!" | "/..."`, `piece := "*" | quoted | [^/!]+` — into
//! per-target-name [`Rule`](crate::rule::Rule) chains ordered by
//! context depth descending.
//!
//! Grounded on `helix-syntax/src/tree_sitter/query/predicate.rs`'s
//! `bail!`/`ensure!` macros for validation-heavy hand-written parsing,
//! and on the fact that none of the teacher's own small grammars
//! (query predicates, the `inherits:` directive in `config.rs`) reach
//! for a parser-combinator crate — this one doesn't either.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::Error;
use crate::rule::{self, Mode, Rule};
use crate::tag::Tag;
use crate::tree::PropStore;

/// The compiled output of [`style_tags`]: one `Rule` chain head per
/// target node-type name, ready to [`RuleTable::install`] onto a
/// grammar's node types.
pub struct RuleTable {
    by_name: HashMap<String, Arc<Rule>>,
}

impl RuleTable {
    /// Attaches this node type's compiled rule chain, if it has one,
    /// under the crate's reserved [`rule::RULE_PROP`] key. A no-op for
    /// node types with no matching selector.
    pub fn install(&self, store: &mut PropStore, node_type_name: &str) {
        if let Some(head) = self.by_name.get(node_type_name) {
            rule::attach(store, head.clone());
        }
    }

    /// The compiled chain head for a node-type name, if any. Exposed
    /// mainly for tests; production code goes through [`Self::install`]
    /// once at language-load time instead of looking this up per node.
    pub fn get(&self, node_type_name: &str) -> Option<Arc<Rule>> {
        self.by_name.get(node_type_name).cloned()
    }
}

/// Compiles a selector-string -> tag(s) mapping into a [`RuleTable`].
///
/// `pairs` may map a single selector string to one or more tags; the
/// string itself may contain several whitespace-separated parts, each
/// compiling to an independent rule for (possibly different) target
/// names, all carrying the same tag sequence.
pub fn style_tags<S, T>(pairs: impl IntoIterator<Item = (S, T)>) -> Result<RuleTable, Error>
where
    S: AsRef<str>,
    T: Into<Vec<Tag>>,
{
    let mut by_name: HashMap<String, Arc<Rule>> = HashMap::new();

    for (selector, tags) in pairs {
        let tags: Vec<Tag> = tags.into();
        for part in selector.as_ref().split_whitespace() {
            let compiled = compile_part(part)?;
            let depth = compiled.context.as_ref().map_or(0, Vec::len);
            let rule = Rule {
                tags: tags.clone(),
                mode: compiled.mode,
                context: compiled.context,
                next: None,
            };
            let entry = by_name.remove(&compiled.target);
            by_name.insert(compiled.target.clone(), splice(entry, rule, depth));
        }
    }

    Ok(RuleTable { by_name })
}

struct CompiledPart {
    target: String,
    context: Option<Vec<String>>,
    mode: Mode,
}

/// Inserts `rule` (at `depth`) into the chain rooted at `existing`,
/// ordered by depth descending; among equal depths, the most recently
/// compiled rule sorts first (spec.md §4.B/§9 — the Open Question is
/// pinned exactly this way).
fn splice(existing: Option<Arc<Rule>>, mut rule: Rule, depth: usize) -> Arc<Rule> {
    match existing {
        None => {
            rule.next = None;
            Arc::new(rule)
        }
        Some(head) if head.depth() <= depth => {
            rule.next = Some(head);
            Arc::new(rule)
        }
        Some(head) => Arc::new(Rule {
            tags: head.tags.clone(),
            mode: head.mode,
            context: head.context.clone(),
            next: Some(splice(head.next.clone(), rule, depth)),
        }),
    }
}

fn compile_part(part: &str) -> Result<CompiledPart, Error> {
    let (mode, body) = if let Some(stripped) = part.strip_suffix('!') {
        (Mode::Opaque, stripped)
    } else if let Some(stripped) = part.strip_suffix("/...") {
        (Mode::Inherit, stripped)
    } else {
        (Mode::Normal, part)
    };

    if body.is_empty() {
        return Err(Error::InvalidSelector {
            part: part.to_string(),
            reason: "selector has no target piece",
        });
    }

    let mut pieces = tokenize(body, part)?;
    if pieces.is_empty() {
        return Err(Error::InvalidSelector {
            part: part.to_string(),
            reason: "selector has no target piece",
        });
    }
    let target = pieces.pop().unwrap();
    if target.is_empty() {
        return Err(Error::InvalidSelector {
            part: part.to_string(),
            reason: "target piece cannot be a wildcard",
        });
    }

    let context = if pieces.is_empty() { None } else { Some(pieces) };
    Ok(CompiledPart {
        target,
        context,
        mode,
    })
}

/// Splits `body` on `/`, honoring JSON-quoted pieces that may
/// themselves contain `/`, `!`, `*`, or `...`. A bare `*` piece
/// compiles to the empty string (spec.md §6: "matches any single
/// ancestor").
fn tokenize(body: &str, whole_part: &str) -> Result<Vec<String>, Error> {
    let invalid = |reason: &'static str| Error::InvalidSelector {
        part: whole_part.to_string(),
        reason,
    };

    let bytes = body.as_bytes();
    let mut pieces = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            let (piece, consumed) =
                parse_quoted(&body[i..]).ok_or_else(|| invalid("unbalanced quote"))?;
            pieces.push(piece);
            i += consumed;
            if i < bytes.len() {
                if bytes[i] != b'/' {
                    return Err(invalid("expected '/' after quoted piece"));
                }
                i += 1;
                if i == bytes.len() {
                    return Err(invalid("trailing '/' with no following piece"));
                }
            }
        } else {
            let start = i;
            while i < bytes.len() && bytes[i] != b'/' {
                if bytes[i] == b'!' {
                    return Err(invalid("stray '!' is only valid as the final character"));
                }
                i += 1;
            }
            let raw = &body[start..i];
            if raw.is_empty() {
                return Err(invalid("empty piece between '/' separators"));
            }
            pieces.push(if raw == "*" { String::new() } else { raw.to_string() });
            if i < bytes.len() {
                i += 1;
                if i == bytes.len() {
                    return Err(invalid("trailing '/' with no following piece"));
                }
            }
        }
    }
    Ok(pieces)
}

/// Parses a JSON string literal starting at `input[0] == '"'`.
/// Returns the decoded contents and the number of bytes consumed
/// (including both quotes).
fn parse_quoted(input: &str) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    debug_assert_eq!(bytes[0], b'"');
    let mut out = String::new();
    let mut i = 1;
    loop {
        let b = *bytes.get(i)?;
        match b {
            b'"' => return Some((out, i + 1)),
            b'\\' => {
                i += 1;
                let esc = *bytes.get(i)?;
                match esc {
                    b'"' => out.push('"'),
                    b'\\' => out.push('\\'),
                    b'/' => out.push('/'),
                    b'n' => out.push('\n'),
                    b't' => out.push('\t'),
                    b'r' => out.push('\r'),
                    b'u' => {
                        let hex = input.get(i + 1..i + 5)?;
                        let code = u32::from_str_radix(hex, 16).ok()?;
                        out.push(char::from_u32(code)?);
                        i += 4;
                    }
                    _ => return None,
                }
                i += 1;
            }
            _ => {
                let ch_len = input[i..].chars().next()?.len_utf8();
                out.push_str(&input[i..i + ch_len]);
                i += ch_len;
            }
        }
    }
}
