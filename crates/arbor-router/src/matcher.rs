//! Depth-first route search with ordered backtracking
//!
//! ## Priority at each node
//! 1. Literal child
//! 2. Literal child after stripping an allowed extension (last segment only)
//! 3. Regex children, first registered first
//! 4. `:name`
//! 5. `*.*`
//! 6. `*`, longest run first
//!
//! A tree mounted at a node is searched as part of that node: inside each
//! tier, the node's own child is tried first and then the same tier of every
//! mounted root, in mount order. A literal route of a mounted tree therefore
//! still beats a `*` registered next to the mount.
//!
//! Captures are kept positionally while descending and only receive names
//! once a leaf (or a mount) accepts them.

use crate::node::Node;
use crate::params::Params;
use crate::sanitize;
use crate::segment::EXT;
use crate::tree::{Tree, TreeOptions};
use smallvec::SmallVec;
use std::borrow::Cow;

/// Child kinds in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Literal,
    Suffix,
    Regex,
    Param,
    PathExt,
    Splat,
}

const TIERS: [Tier; 6] = [
    Tier::Literal,
    Tier::Suffix,
    Tier::Regex,
    Tier::Param,
    Tier::PathExt,
    Tier::Splat,
];

/// Search state for one `find` call
pub(crate) struct Walk<'p> {
    segments: &'p [&'p str],
    captures: SmallVec<[Cow<'p, str>; 8]>,
    /// Start of the captures owned by the innermost tree
    base: usize,
}

impl<'p> Walk<'p> {
    pub(crate) fn new(segments: &'p [&'p str]) -> Self {
        Self {
            segments,
            captures: SmallVec::new(),
            base: 0,
        }
    }

    fn len(&self) -> usize {
        self.segments.len()
    }
}

/// Enter `tree` at segment `idx`
pub(crate) fn walk_tree<H: Clone>(
    tree: &Tree<H>,
    idx: usize,
    walk: &mut Walk<'_>,
    params: &mut Params,
) -> Option<H> {
    enter_tree(tree, idx, None, walk, params)
}

/// Enter `tree` at segment `idx`, restricted to one tier of its root when given
///
/// A tree prefix always starts with a literal, so a prefixed tree only takes
/// part in the literal tier and is searched normally past its prefix.
fn enter_tree<H: Clone>(
    tree: &Tree<H>,
    idx: usize,
    tier: Option<Tier>,
    walk: &mut Walk<'_>,
    params: &mut Params,
) -> Option<H> {
    let prefix = tree.prefix_segments();
    let rest = walk.segments.get(idx..)?;
    if rest.len() < prefix.len() || !rest.iter().zip(prefix).all(|(a, b)| *a == b.as_str()) {
        return None;
    }
    let root = tree.read_root();
    match tier {
        Some(tier) if prefix.is_empty() => walk_tier(&root, tree.options(), idx, tier, walk, params),
        Some(Tier::Literal) | None => {
            walk_node(&root, tree.options(), idx + prefix.len(), walk, params)
        }
        Some(_) => None,
    }
}

fn walk_node<H: Clone>(
    node: &Node<H>,
    options: &TreeOptions,
    idx: usize,
    walk: &mut Walk<'_>,
    params: &mut Params,
) -> Option<H> {
    if idx == walk.len() {
        return accept_leaf(node, walk, params)
            .or_else(|| walk_mounts(node, idx, None, walk, params));
    }
    TIERS
        .into_iter()
        .find_map(|tier| walk_tier(node, options, idx, tier, walk, params))
}

/// Try the children of `node` in one tier, then the same tier of its mounts
fn walk_tier<'p, H: Clone>(
    node: &Node<H>,
    options: &TreeOptions,
    idx: usize,
    tier: Tier,
    walk: &mut Walk<'p>,
    params: &mut Params,
) -> Option<H> {
    let seg: &'p str = walk.segments[idx];

    let found = match tier {
        Tier::Literal => node
            .literals
            .get(seg)
            .and_then(|child| walk_node(child, options, idx + 1, walk, params)),
        Tier::Suffix => walk_suffix(node, options, idx, walk, params),
        Tier::Regex => walk_regexes(node, options, idx, walk, params),
        Tier::Param => node.param.as_deref().and_then(|child| {
            walk.captures.push(Cow::Borrowed(seg));
            let found = walk_node(child, options, idx + 1, walk, params);
            if found.is_none() {
                walk.captures.pop();
            }
            found
        }),
        Tier::PathExt => node
            .path_ext
            .as_deref()
            .and_then(|child| walk_path_ext(child, options, idx, walk, params)),
        Tier::Splat => node
            .splat
            .as_deref()
            .and_then(|child| walk_splat(child, options, idx, walk, params)),
    };
    found.or_else(|| walk_mounts(node, idx, Some(tier), walk, params))
}

/// Final segment with an allowed extension stripped, bound to `:ext`
fn walk_suffix<H: Clone>(
    node: &Node<H>,
    options: &TreeOptions,
    idx: usize,
    walk: &mut Walk<'_>,
    params: &mut Params,
) -> Option<H> {
    if idx + 1 != walk.len() {
        return None;
    }
    let seg = walk.segments[idx];
    for ext in &options.suffix_exts {
        let Some(stem) = seg.strip_suffix(ext.as_str()) else {
            continue;
        };
        let Some(child) = node.literals.get(stem) else {
            continue;
        };
        if let Some(found) = walk_node(child, options, idx + 1, walk, params) {
            params.set(EXT, ext.trim_start_matches('.'));
            return Some(found);
        }
    }
    None
}

fn walk_regexes<H: Clone>(
    node: &Node<H>,
    options: &TreeOptions,
    idx: usize,
    walk: &mut Walk<'_>,
    params: &mut Params,
) -> Option<H> {
    let seg = walk.segments[idx];
    for child in &node.regexes {
        let Some(values) = child.regex.captures(seg) else {
            continue;
        };
        let mark = walk.captures.len();
        walk.captures.extend(values.into_iter().map(Cow::Borrowed));
        if let Some(found) = walk_node(&child.node, options, idx + 1, walk, params) {
            return Some(found);
        }
        walk.captures.truncate(mark);
    }
    None
}

fn walk_path_ext<H: Clone>(
    child: &Node<H>,
    options: &TreeOptions,
    idx: usize,
    walk: &mut Walk<'_>,
    params: &mut Params,
) -> Option<H> {
    for end in (idx + 1..=walk.len()).rev() {
        let Some((path, ext)) = split_path_ext(&walk.segments[idx..end]) else {
            continue;
        };
        let mark = walk.captures.len();
        walk.captures.push(Cow::Owned(path));
        walk.captures.push(Cow::Borrowed(ext));
        if let Some(found) = walk_node(child, options, end, walk, params) {
            return Some(found);
        }
        walk.captures.truncate(mark);
    }
    None
}

fn walk_splat<H: Clone>(
    child: &Node<H>,
    options: &TreeOptions,
    idx: usize,
    walk: &mut Walk<'_>,
    params: &mut Params,
) -> Option<H> {
    for end in (idx + 1..=walk.len()).rev() {
        let Some(value) = sanitize::join_capture(&walk.segments[idx..end]) else {
            continue;
        };
        walk.captures.push(Cow::Owned(value));
        if let Some(found) = walk_node(child, options, end, walk, params) {
            return Some(found);
        }
        walk.captures.pop();
    }
    None
}

/// Bind the pending captures to the first leaf that takes them
fn accept_leaf<H: Clone>(node: &Node<H>, walk: &Walk<'_>, params: &mut Params) -> Option<H> {
    let captured = &walk.captures[walk.base..];
    let leaf = node.leaves.iter().find(|l| l.names.len() == captured.len())?;
    for (name, value) in leaf.names.iter().zip(captured) {
        params.set(name.as_str(), &**value);
    }
    for name in &leaf.defaults {
        params.set(name.as_str(), "");
    }
    Some(leaf.handler.clone())
}

fn walk_mounts<H: Clone>(
    node: &Node<H>,
    idx: usize,
    tier: Option<Tier>,
    walk: &mut Walk<'_>,
    params: &mut Params,
) -> Option<H> {
    for mount in &node.mounts {
        if mount.names.len() != walk.captures.len() - walk.base {
            continue;
        }
        let mark = params.mark();
        for (name, value) in mount.names.iter().zip(&walk.captures[walk.base..]) {
            params.set(name.as_str(), &**value);
        }

        let (base, len) = (walk.base, walk.captures.len());
        walk.base = len;
        if let Some(found) = enter_tree(&mount.tree, idx, tier, walk, params) {
            return Some(found);
        }
        walk.base = base;
        walk.captures.truncate(len);
        params.restore(mark);
    }
    None
}

/// `:path` and `:ext` for a `*.*` run, split at the last dot of its final segment
fn split_path_ext<'p>(run: &[&'p str]) -> Option<(String, &'p str)> {
    let (&last, head) = run.split_last()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    let mut parts: SmallVec<[&str; 8]> = head.iter().copied().collect();
    if !stem.is_empty() {
        parts.push(stem);
    }
    let path = sanitize::join_capture(&parts)?;
    Some((path, ext))
}
