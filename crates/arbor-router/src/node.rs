//! Tree vertices
//!
//! A node owns its children outright, except mounted trees which are shared
//! handles. Parameter names are kept on leaves rather than on nodes, so
//! `/user/:id` and `/user/:name` walk the same nodes and end as two leaves.

use crate::segment::{Segment, SegmentKind, SegmentRegex};
use crate::tree::Tree;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct Node<H> {
    /// Exact-text children
    pub(crate) literals: HashMap<String, Node<H>>,
    /// Ordered regex children, first registered is tried first
    pub(crate) regexes: Vec<RegexChild<H>>,
    /// `:name`
    pub(crate) param: Option<Box<Node<H>>>,
    /// `*.*`
    pub(crate) path_ext: Option<Box<Node<H>>>,
    /// `*`
    pub(crate) splat: Option<Box<Node<H>>>,
    /// Trees entered at this position
    pub(crate) mounts: Vec<Mount<H>>,
    /// Routes terminating here, best first
    pub(crate) leaves: Vec<Leaf<H>>,
}

#[derive(Debug)]
pub(crate) struct RegexChild<H> {
    pub(crate) regex: SegmentRegex,
    pub(crate) node: Node<H>,
}

#[derive(Debug)]
pub(crate) struct Mount<H> {
    pub(crate) prefix: String,
    /// Names bound to the captures taken on the way down to this node
    pub(crate) names: SmallVec<[String; 4]>,
    pub(crate) tree: Tree<H>,
}

#[derive(Debug)]
pub(crate) struct Leaf<H> {
    /// Pattern text as registered
    pub(crate) pattern: String,
    /// Which optional segments are present, leftmost optional in the high bit
    pub(crate) presence: u32,
    /// Optional segments left out
    pub(crate) skipped: u32,
    /// Capture names in walk order
    pub(crate) names: SmallVec<[String; 4]>,
    /// Names bound to `""` when this leaf matches
    pub(crate) defaults: SmallVec<[String; 1]>,
    pub(crate) handler: H,
}

impl<H> Leaf<H> {
    fn rank(&self) -> (u32, Reverse<u32>) {
        (self.skipped, Reverse(self.presence))
    }
}

impl<H> Default for Node<H> {
    fn default() -> Self {
        Self {
            literals: HashMap::new(),
            regexes: Vec::new(),
            param: None,
            path_ext: None,
            splat: None,
            mounts: Vec::new(),
            leaves: Vec::new(),
        }
    }
}

impl<H> Node<H> {
    /// Child reached through `segment`, created when missing
    pub(crate) fn child_or_insert(&mut self, segment: &Segment) -> &mut Node<H> {
        match segment.kind() {
            SegmentKind::Literal(text) => self.literals.entry(text.clone()).or_default(),
            SegmentKind::Param(_) => &mut **self.param.get_or_insert_with(Box::default),
            SegmentKind::PathExt => &mut **self.path_ext.get_or_insert_with(Box::default),
            SegmentKind::Splat => &mut **self.splat.get_or_insert_with(Box::default),
            SegmentKind::Regex(re) => {
                let index = match self.regexes.iter().position(|c| c.regex.key() == re.key()) {
                    Some(index) => index,
                    None => {
                        self.regexes.push(RegexChild {
                            regex: re.clone(),
                            node: Node::default(),
                        });
                        self.regexes.len() - 1
                    }
                };
                &mut self.regexes[index].node
            }
        }
    }

    pub(crate) fn child_mut(&mut self, segment: &Segment) -> Option<&mut Node<H>> {
        match segment.kind() {
            SegmentKind::Literal(text) => self.literals.get_mut(text),
            SegmentKind::Param(_) => self.param.as_deref_mut(),
            SegmentKind::PathExt => self.path_ext.as_deref_mut(),
            SegmentKind::Splat => self.splat.as_deref_mut(),
            SegmentKind::Regex(re) => self
                .regexes
                .iter_mut()
                .find(|c| c.regex.key() == re.key())
                .map(|c| &mut c.node),
        }
    }

    /// Drop the edge for `segment` together with everything below it
    fn detach(&mut self, segment: &Segment) -> bool {
        match segment.kind() {
            SegmentKind::Literal(text) => self.literals.remove(text).is_some(),
            SegmentKind::Param(_) => self.param.take().is_some(),
            SegmentKind::PathExt => self.path_ext.take().is_some(),
            SegmentKind::Splat => self.splat.take().is_some(),
            SegmentKind::Regex(re) => {
                let before = self.regexes.len();
                self.regexes.retain(|c| c.regex.key() != re.key());
                self.regexes.len() != before
            }
        }
    }

    /// Store a leaf, replacing the one registered for the same pattern and variant
    pub(crate) fn insert_leaf(&mut self, leaf: Leaf<H>) {
        if let Some(existing) = self
            .leaves
            .iter_mut()
            .find(|l| l.pattern == leaf.pattern && l.presence == leaf.presence)
        {
            *existing = leaf;
            return;
        }
        let rank = leaf.rank();
        let at = self
            .leaves
            .iter()
            .position(|l| l.rank() > rank)
            .unwrap_or(self.leaves.len());
        self.leaves.insert(at, leaf);
    }

    /// Remove the branch addressed by `path`, relative to this node
    ///
    /// A target that still routes to descendants only loses its leaves;
    /// otherwise the whole edge is detached from its parent. Nodes left with
    /// no leaves, children or mounts on the way back up are detached too.
    pub(crate) fn remove(&mut self, path: &[&Segment]) -> bool {
        let Some((first, rest)) = path.split_first() else {
            let had = !self.leaves.is_empty();
            self.leaves.clear();
            return had;
        };

        let Some(child) = self.child_mut(first) else {
            return false;
        };
        let removed = child.remove(rest);
        let emptied = child.is_empty();
        if emptied {
            self.detach(first);
        }
        removed || (emptied && rest.is_empty())
    }

    pub(crate) fn has_children(&self) -> bool {
        !self.literals.is_empty()
            || !self.regexes.is_empty()
            || self.param.is_some()
            || self.path_ext.is_some()
            || self.splat.is_some()
            || !self.mounts.is_empty()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.leaves.is_empty() && !self.has_children()
    }

    /// Owned children, mounts excluded
    pub(crate) fn children(&self) -> impl Iterator<Item = &Node<H>> {
        self.literals
            .values()
            .chain(self.regexes.iter().map(|c| &c.node))
            .chain(self.param.as_deref())
            .chain(self.path_ext.as_deref())
            .chain(self.splat.as_deref())
    }

    /// Whether `f` holds for any tree mounted in this subtree
    pub(crate) fn any_mount(&self, f: &mut dyn FnMut(&Tree<H>) -> bool) -> bool {
        self.mounts.iter().any(|m| f(&m.tree)) || self.children().any(|c| c.any_mount(&mut *f))
    }

    pub(crate) fn count(&self) -> usize {
        1 + self.children().map(Node::count).sum::<usize>()
    }

    pub(crate) fn collect_patterns(&self, out: &mut Vec<String>) {
        out.extend(self.leaves.iter().map(|l| l.pattern.clone()));
        for child in self.children() {
            child.collect_patterns(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::parse_pattern;

    fn leaf(pattern: &str, presence: u32, skipped: u32, handler: u32) -> Leaf<u32> {
        Leaf {
            pattern: pattern.to_string(),
            presence,
            skipped,
            names: SmallVec::new(),
            defaults: SmallVec::new(),
            handler,
        }
    }

    #[test]
    fn test_leaf_order_prefers_fewer_skips() {
        let mut node = Node::default();
        node.insert_leaf(leaf("/a/?:x", 0b0, 1, 1));
        node.insert_leaf(leaf("/a", 0, 0, 2));
        node.insert_leaf(leaf("/?:x/?:y", 0b10, 1, 3));
        node.insert_leaf(leaf("/?:x/?:y", 0b01, 1, 4));

        let handlers: Vec<u32> = node.leaves.iter().map(|l| l.handler).collect();
        assert_eq!(handlers, vec![2, 3, 4, 1]);
    }

    #[test]
    fn test_same_variant_replaces_handler() {
        let mut node = Node::default();
        node.insert_leaf(leaf("/a", 0, 0, 1));
        node.insert_leaf(leaf("/a", 0, 0, 2));
        assert_eq!(node.leaves.len(), 1);
        assert_eq!(node.leaves[0].handler, 2);
    }

    #[test]
    fn test_regex_children_shared_by_source() {
        let mut root: Node<u32> = Node::default();
        for pattern in ["/:id:int", "/:num:int", "/:id([a-z]+)"] {
            let segments = parse_pattern(pattern).unwrap();
            root.child_or_insert(&segments[0]);
        }
        assert_eq!(root.regexes.len(), 2);
    }

    fn insert(root: &mut Node<u32>, pattern: &str, handler: u32) {
        let segments = parse_pattern(pattern).unwrap();
        let mut node = root;
        for seg in &segments {
            node = node.child_or_insert(seg);
        }
        node.insert_leaf(leaf(pattern, 0, 0, handler));
    }

    fn remove(root: &mut Node<u32>, pattern: &str) -> bool {
        let segments = parse_pattern(pattern).unwrap();
        let path: Vec<&Segment> = segments.iter().collect();
        root.remove(&path)
    }

    #[test]
    fn test_remove_keeps_descendants() {
        let mut root: Node<u32> = Node::default();
        for (pattern, h) in [("/a", 1), ("/a/b", 2), ("/c", 3)] {
            insert(&mut root, pattern, h);
        }

        assert!(remove(&mut root, "/a"));
        let a = &root.literals["a"];
        assert!(a.leaves.is_empty());
        assert_eq!(a.literals["b"].leaves[0].handler, 2);

        assert!(remove(&mut root, "/c"));
        assert!(!root.literals.contains_key("c"));
        assert!(!remove(&mut root, "/missing"));
    }

    #[test]
    fn test_remove_prunes_emptied_ancestors() {
        let mut root: Node<u32> = Node::default();
        insert(&mut root, "/a/b/c", 1);
        insert(&mut root, "/x/y", 2);

        assert!(remove(&mut root, "/a/b/c"));
        assert!(!root.literals.contains_key("a"));
        assert_eq!(root.count(), 3);

        assert!(remove(&mut root, "/x/y"));
        assert!(root.is_empty());
        assert_eq!(root.count(), 1);
    }
}
