//! Component A: the tag lattice.
//!
//! Tags are interned values with a precomputed specificity chain
//! (`set`, most specific first) and obey two algebraic laws under
//! modifier application: idempotence (`m(m(t)) == m(t)`) and
//! commutativity (`m1(m2(t)) == m2(m1(t))`, with structural identity —
//! same interned [`Tag`]). See spec.md §3/§4.A.

use hashbrown::HashMap;

use crate::error::Error;

/// A process-unique, interned highlight tag.
///
/// `Tag` is a cheap `Copy` handle into a [`Lattice`]; every field spec.md
/// ascribes to a tag (`name`, `base`, `modified`, `set`) is reached
/// through the owning `Lattice`, the same way the rest of this crate's
/// host collaborators (node types, cursors) are handles into state the
/// caller owns rather than self-contained values.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Tag(u32);

/// A modifier: a function `Tag -> Tag` that commutes with other
/// modifiers and is idempotent, identified by its own interned id.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Modifier(u32);

impl Modifier {
    /// Sugar for [`Lattice::apply`].
    pub fn apply(self, lattice: &mut Lattice, tag: Tag) -> Tag {
        lattice.apply(self, tag)
    }
}

struct TagData {
    name: Option<String>,
    base: Option<Tag>,
    modified: Vec<Modifier>,
    set: Vec<Tag>,
}

struct ModifierData {
    name: Option<String>,
}

/// Owns every interned [`Tag`] and [`Modifier`] and the instance cache
/// that makes modifier application idempotent and commutative.
///
/// Registration is expected to happen at start-up, before any
/// concurrent highlighting begins (spec.md §5); a `Lattice` has no
/// internal locking of its own — wrap it in a `Mutex` if registration
/// must race with reads from other threads.
#[derive(Default)]
pub struct Lattice {
    tags: Vec<TagData>,
    modifiers: Vec<ModifierData>,
    // Keyed by (unmodified base id, sorted modifier ids). A single
    // canonical key regardless of application order is what makes
    // commutativity hold by construction: m1(m2(t)) and m2(m1(t))
    // both normalize to the same sorted key and therefore the same
    // cached Tag.
    instance_cache: HashMap<(u32, Vec<u32>), u32, ahash::RandomState>,
}

impl Lattice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh unmodified tag, optionally rooted under `parent`.
    ///
    /// Fails with [`Error::IllegalTagDerivation`] if `parent` itself
    /// carries modifiers (invariant 6).
    pub fn define(&mut self, name: Option<&str>, parent: Option<Tag>) -> Result<Tag, Error> {
        if let Some(parent) = parent {
            if !self.tags[parent.0 as usize].modified.is_empty() {
                return Err(Error::IllegalTagDerivation {
                    parent: self.debug_name(parent),
                });
            }
        }

        let id = self.tags.len() as u32;
        let set = match parent {
            Some(parent) => {
                let mut set = Vec::with_capacity(self.tags[parent.0 as usize].set.len() + 1);
                set.push(Tag(id));
                set.extend_from_slice(&self.tags[parent.0 as usize].set);
                set
            }
            None => vec![Tag(id)],
        };

        self.tags.push(TagData {
            name: name.map(str::to_owned),
            base: None,
            modified: Vec::new(),
            set,
        });
        Ok(Tag(id))
    }

    /// Registers a fresh modifier.
    pub fn define_modifier(&mut self, name: Option<&str>) -> Modifier {
        let id = self.modifiers.len() as u32;
        self.modifiers.push(ModifierData {
            name: name.map(str::to_owned),
        });
        Modifier(id)
    }

    /// Applies `modifier` to `tag`, following the normative algorithm
    /// in spec.md §4.A.
    pub fn apply(&mut self, modifier: Modifier, tag: Tag) -> Tag {
        let data = &self.tags[tag.0 as usize];
        // Step 1: already modified by `modifier` — identity, not just equality.
        if data.modified.iter().any(|m| *m == modifier) {
            return tag;
        }

        let base = data.base.unwrap_or(tag);
        let mut new_mods = data.modified.clone();
        new_mods.push(modifier);
        new_mods.sort_unstable_by_key(|m| m.0);

        self.get_or_create(new_mods, base)
    }

    /// Returns the (possibly newly created) tag for `base` — which
    /// must itself be unmodified — with `mods` (sorted, non-empty)
    /// applied. Creates every intermediate subset/ancestor combination
    /// the specificity chain needs along the way, per invariant 3.
    fn get_or_create(&mut self, mods: Vec<Modifier>, base: Tag) -> Tag {
        if mods.is_empty() {
            return base;
        }
        let key = (base.0, mods.iter().map(|m| m.0).collect::<Vec<_>>());
        if let Some(&id) = self.instance_cache.get(&key) {
            return Tag(id);
        }

        let id = self.tags.len() as u32;
        // Reserve the slot before recursing so nested get_or_create
        // calls (for smaller subsets) never collide with this id.
        self.tags.push(TagData {
            name: None,
            base: Some(base),
            modified: mods.clone(),
            set: Vec::new(),
        });
        let new_tag = Tag(id);
        self.instance_cache.insert(key, id);

        let set = self.compute_modified_set(&mods, base, new_tag);
        self.tags[id as usize].set = set;
        new_tag
    }

    fn compute_modified_set(&mut self, mods: &[Modifier], base: Tag, self_tag: Tag) -> Vec<Tag> {
        let base_set = self.tags[base.0 as usize].set.clone();
        let mut set = vec![self_tag];

        for subset in nonempty_subsets_by_decreasing_size(mods) {
            let is_full_subset = subset.len() == mods.len();
            for ancestor in &base_set {
                if is_full_subset && *ancestor == base {
                    // That combination *is* self_tag, already at the front.
                    continue;
                }
                let derived = self.get_or_create(subset.clone(), *ancestor);
                set.push(derived);
            }
        }
        set
    }

    /// The tag's debug label, if any, falling back to its numeric id.
    pub fn debug_name(&self, tag: Tag) -> String {
        match &self.tags[tag.0 as usize].name {
            Some(name) => name.clone(),
            None => format!("tag#{}", tag.0),
        }
    }

    pub fn name(&self, tag: Tag) -> Option<&str> {
        self.tags[tag.0 as usize].name.as_deref()
    }

    pub fn base(&self, tag: Tag) -> Option<Tag> {
        self.tags[tag.0 as usize].base
    }

    pub fn modified(&self, tag: Tag) -> &[Modifier] {
        &self.tags[tag.0 as usize].modified
    }

    /// The specificity chain: `set[0] == tag`, most specific first.
    pub fn set(&self, tag: Tag) -> &[Tag] {
        &self.tags[tag.0 as usize].set
    }

    pub fn modifier_name(&self, modifier: Modifier) -> Option<&str> {
        self.modifiers[modifier.0 as usize].name.as_deref()
    }
}

/// Yields every non-empty subset of `mods` (which must already be
/// sorted), largest first; subsets of equal size are yielded in the
/// order their bitmask increases, which — since `mods` is sorted by
/// modifier id — is a deterministic, reproducible order.
fn nonempty_subsets_by_decreasing_size(mods: &[Modifier]) -> Vec<Vec<Modifier>> {
    let n = mods.len();
    let mut subsets: Vec<Vec<Modifier>> = (1u32..(1 << n))
        .map(|mask| {
            (0..n)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| mods[i])
                .collect()
        })
        .collect();
    subsets.sort_by_key(|s| std::cmp::Reverse(s.len()));
    subsets
}
