//! Component G: the text emitter.
//!
//! Wraps [`crate::walk::highlight_tree`], splitting each emitted span
//! on line breaks into `put_text`/`put_break` calls and maintaining
//! the position invariant spec.md §4.G requires: consecutive calls
//! cover `[from, to)` with no gaps, no overlaps, and breaks reported
//! on their own.
//!
//! Grounded on `helix-syntax/src/ropey.rs`'s `RopeProvider` for
//! treating `ropey::RopeSlice` as the host text source, and on
//! `helix-syntax/src/merge.rs`'s queue-draining `Iterator::next` shape
//! for the chunk/newline bookkeeping below.

use ropey::RopeSlice;

use crate::mapping::Highlighter;
use crate::tag::Lattice;
use crate::tree::Cursor;

/// The minimal text-access surface [`highlight_code`] needs from a
/// host's document representation.
pub trait TextSource {
    /// The byte length of the full backing text.
    fn len(&self) -> usize;
    /// Yields the text in `[from, to)` as UTF-8 chunks, in order. A
    /// single chunk covering the whole range is always valid; hosts
    /// backed by a rope may yield one chunk per rope segment instead.
    fn chunks(&self, from: usize, to: usize) -> Box<dyn Iterator<Item = &str> + '_>;
}

impl<'r> TextSource for RopeSlice<'r> {
    fn len(&self) -> usize {
        RopeSlice::len_bytes(self)
    }

    fn chunks(&self, from: usize, to: usize) -> Box<dyn Iterator<Item = &str> + '_> {
        let byte_slice = self.byte_slice(from..to);
        Box::new(byte_slice.chunks())
    }
}

/// A sink receiving the emitter's output. `put_text` reports a run of
/// non-newline text under the given (possibly absent) class; `put_break`
/// reports a single `\n` and resets any in-flight line state in the
/// caller (spec.md §4.G).
pub trait Sink {
    fn put_text(&mut self, text: &str, class: Option<&str>);
    fn put_break(&mut self);
}

impl<F: FnMut(&str, Option<&str>, bool)> Sink for F {
    fn put_text(&mut self, text: &str, class: Option<&str>) {
        self(text, class, false)
    }

    fn put_break(&mut self) {
        self("\n", None, true)
    }
}

/// Runs the tree walker over `[from, to)` and reports fully
/// materialized text through `sink`, splitting every span at each
/// `\n` into a trailing `put_text` (the text before the break) and a
/// `put_break` (spec.md §4.G: breaks are never folded into a class's
/// text run, even when the class doesn't change across them).
///
/// The walker only yields spans it has an opinion about; text between
/// and around those spans is unstyled but still covers real source
/// bytes, so it is reported here with class `None` to uphold the
/// position invariant that every offset in `[from, to)` is emitted
/// exactly once, in order.
pub fn highlight_code(
    cursor: &mut dyn Cursor,
    lattice: &Lattice,
    highlighters: &[Highlighter],
    scope: &str,
    text: &impl TextSource,
    from: usize,
    to: usize,
    sink: &mut impl Sink,
) {
    let mut emitted_to = from;
    crate::walk::highlight_tree(cursor, lattice, highlighters, scope, from, to, &mut |span_from, span_to, class| {
        if span_from > emitted_to {
            emit_range(text, emitted_to, span_from, None, sink);
        }
        emit_range(text, span_from, span_to, class, sink);
        emitted_to = span_to;
    });
    if emitted_to < to {
        emit_range(text, emitted_to, to, None, sink);
    }
}

fn emit_range(text: &impl TextSource, from: usize, to: usize, class: Option<&str>, sink: &mut impl Sink) {
    let mut pos = from;
    for chunk in text.chunks(from, to) {
        emit_chunk(chunk, class, sink, &mut pos);
    }
}

fn emit_chunk(chunk: &str, class: Option<&str>, sink: &mut impl Sink, pos: &mut usize) {
    let mut rest = chunk;
    while let Some(nl) = rest.find('\n') {
        let (before, after) = rest.split_at(nl);
        if !before.is_empty() {
            sink.put_text(before, class);
        }
        sink.put_break();
        *pos += before.len() + 1;
        rest = &after[1..];
    }
    if !rest.is_empty() {
        sink.put_text(rest, class);
        *pos += rest.len();
    }
}
