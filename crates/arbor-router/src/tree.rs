//! Route tree: insertion, mounting, removal and the match entry point

use crate::error::{Error, Result};
use crate::matcher::{self, Walk};
use crate::node::{Leaf, Mount, Node};
use crate::params::Params;
use crate::sanitize;
use crate::segment::{self, Segment};
use parking_lot::{RwLock, RwLockReadGuard};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Optional segments a single pattern may carry (each one doubles the variants)
const MAX_OPTIONAL: usize = 8;

/// Tree configuration
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Literal prefix every route of the tree lives under
    pub prefix: String,
    /// Match literal segments case-sensitively
    pub case_sensitive: bool,
    /// Extensions a final literal segment may carry, bound to `:ext`
    pub suffix_exts: Vec<String>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            case_sensitive: true,
            suffix_exts: vec![".json".to_string(), ".xml".to_string(), ".html".to_string()],
        }
    }
}

impl TreeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn case_sensitive(mut self, enabled: bool) -> Self {
        self.case_sensitive = enabled;
        self
    }

    pub fn suffix_exts<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suffix_exts = exts.into_iter().map(Into::into).collect();
        self
    }
}

struct Inner<H> {
    prefix_segments: Vec<String>,
    options: TreeOptions,
    root: RwLock<Node<H>>,
}

/// Routing tree
///
/// A `Tree` is a shared handle: cloning it, or mounting it inside another
/// tree, never copies nodes, so routes added later are visible everywhere the
/// tree is reachable.
///
/// Registration takes a write lock and matching takes read locks, so a match
/// sees each registration step either completely or not at all. Routes are
/// meant to be registered before traffic starts; removing routes while
/// requests are in flight is safe but racy in outcome.
///
/// ## Example
/// ```
/// use arbor_router::{Params, Tree};
///
/// let tree = Tree::new();
/// tree.add_route("/topic/?:auth:int", "topic").unwrap();
///
/// let mut params = Params::new();
/// assert_eq!(tree.find("/topic/123", &mut params), Some("topic"));
/// assert_eq!(params.param(":auth"), "123");
///
/// params.reset();
/// assert_eq!(tree.find("/topic", &mut params), Some("topic"));
/// assert!(params.is_empty());
/// ```
pub struct Tree<H> {
    inner: Arc<Inner<H>>,
}

impl<H> Clone for Tree<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H> Default for Tree<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: fmt::Debug> fmt::Debug for Tree<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("prefix", &self.inner.options.prefix)
            .field("root", &*self.inner.root.read())
            .finish()
    }
}

/// One expansion of a pattern's optional segments
struct Variant<'s> {
    segments: SmallVec<[&'s Segment; 8]>,
    presence: u32,
    skipped: u32,
}

impl Variant<'_> {
    fn names(&self) -> SmallVec<[String; 4]> {
        self.segments
            .iter()
            .flat_map(|s| s.names())
            .map(str::to_string)
            .collect()
    }
}

impl<H> Tree<H> {
    /// Create an empty tree with default options
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), TreeOptions::default())
    }

    /// Create an empty tree
    ///
    /// Fails when the prefix contains anything but literal segments.
    pub fn with_options(options: TreeOptions) -> Result<Self> {
        let mut prefix_segments = Vec::new();
        for raw in segment::split_path(&options.prefix) {
            let parsed = segment::parse_segment(raw)?;
            if parsed.is_pattern() {
                return Err(Error::invalid(&options.prefix, "tree prefix must be literal"));
            }
            prefix_segments.push(if options.case_sensitive {
                raw.to_string()
            } else {
                raw.to_lowercase()
            });
        }
        Ok(Self::from_parts(prefix_segments, options))
    }

    /// Create an empty tree whose routes live under `prefix`
    pub fn with_prefix(prefix: &str) -> Result<Self> {
        Self::with_options(TreeOptions::default().prefix(prefix))
    }

    fn from_parts(prefix_segments: Vec<String>, options: TreeOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                prefix_segments,
                options,
                root: RwLock::new(Node::default()),
            }),
        }
    }

    /// The literal prefix this tree was created with, without surrounding slashes
    pub fn prefix(&self) -> String {
        self.inner.prefix_segments.join("/")
    }

    pub fn options(&self) -> &TreeOptions {
        &self.inner.options
    }

    /// Whether both handles point at the same tree
    pub fn ptr_eq(&self, other: &Tree<H>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register `pattern`, relative to the tree prefix
    ///
    /// Registering the same pattern again only replaces its handler. Each
    /// optional segment doubles the number of stored variants, so a pattern
    /// may carry at most eight of them.
    pub fn add_route(&self, pattern: &str, handler: H) -> Result<()>
    where
        H: Clone,
    {
        let segments = self.parse(pattern)?;
        let variants = expand(&segments, pattern)?;
        let defaults = skipped_defaults(&segments);

        let mut root = self.inner.root.write();
        for variant in &variants {
            let mut node = &mut *root;
            for seg in &variant.segments {
                node = node.child_or_insert(seg);
            }
            node.insert_leaf(Leaf {
                pattern: pattern.to_string(),
                presence: variant.presence,
                skipped: variant.skipped,
                names: variant.names(),
                defaults: if variant.skipped > 0 {
                    defaults.clone()
                } else {
                    SmallVec::new()
                },
                handler: handler.clone(),
            });
        }

        debug!(pattern, variants = variants.len(), "route added");
        Ok(())
    }

    /// Mount `tree` below `prefix`
    ///
    /// Parameters captured by `prefix` are bound before the mounted tree is
    /// searched, so its handlers see them alongside their own.
    pub fn mount(&self, prefix: &str, tree: &Tree<H>) -> Result<()> {
        let segments = self.parse(prefix)?;
        if segments.is_empty() {
            return Err(Error::EmptyPrefix);
        }
        if self.ptr_eq(tree) || tree.reaches(self) {
            return Err(Error::MountCycle {
                prefix: prefix.to_string(),
            });
        }
        let variants = expand(&segments, prefix)?;

        let mut root = self.inner.root.write();
        for variant in &variants {
            let mut node = &mut *root;
            for seg in &variant.segments {
                node = node.child_or_insert(seg);
            }
            let names = variant.names();
            let exists = node
                .mounts
                .iter()
                .any(|m| m.tree.ptr_eq(tree) && m.names == names);
            if !exists {
                node.mounts.push(Mount {
                    prefix: prefix.to_string(),
                    names,
                    tree: tree.clone(),
                });
            }
        }

        debug!(prefix, sub_prefix = %tree.prefix(), "tree mounted");
        Ok(())
    }

    /// Remove the branch at `path`
    ///
    /// `path` uses pattern syntax and is walked along the same edges
    /// insertion would take, once per optional-segment variant. A node that
    /// still routes to descendants only loses its own handlers; otherwise it
    /// is detached with everything below it, along with any ancestors left
    /// empty. Sibling branches are never touched. A `path` equal to the tree
    /// prefix removes the root handlers, see [`Tree::remove_root`].
    pub fn remove(&self, path: &str) -> Result<bool> {
        let raw = segment::split_path(path);
        let prefix_len = self.inner.prefix_segments.len();
        if raw.len() < prefix_len
            || !raw
                .iter()
                .zip(&self.inner.prefix_segments)
                .all(|(a, b)| self.fold_case(a) == *b)
        {
            return Ok(false);
        }

        let relative: Vec<Segment> = raw[prefix_len..]
            .iter()
            .map(|s| self.parse_one(s))
            .collect::<Result<_>>()?;
        if relative.is_empty() {
            return Ok(self.remove_root());
        }
        let variants = expand(&relative, path)?;

        let mut root = self.inner.root.write();
        let mut removed = false;
        for variant in &variants {
            removed |= root.remove(&variant.segments);
        }
        debug!(path, variants = variants.len(), removed, "route removed");
        Ok(removed)
    }

    /// Drop the handlers registered at the tree root
    pub fn remove_root(&self) -> bool {
        let removed = self.inner.root.write().remove(&[]);
        debug!(prefix = %self.prefix(), removed, "root route removed");
        removed
    }

    /// Match `path` and return the handler it routes to
    ///
    /// Captures are appended to `params`. When nothing matches, `params` is
    /// left exactly as it was passed in.
    pub fn find(&self, path: &str, params: &mut Params) -> Option<H>
    where
        H: Clone,
    {
        if !path.starts_with('/') {
            trace!(path, "path is not absolute");
            return None;
        }
        let Some(cleaned) = sanitize::clean(path) else {
            trace!(path, "path escapes the root");
            return None;
        };
        let cleaned = self.fold_case(&cleaned);
        let segments: Vec<&str> = cleaned.split('/').filter(|s| !s.is_empty()).collect();

        let mark = params.mark();
        let mut walk = Walk::new(&segments);
        let found = matcher::walk_tree(self, 0, &mut walk, params);
        if found.is_none() {
            params.restore(mark);
            trace!(path, "no route matched");
        }
        found
    }

    /// No routes, no children and no mounts
    pub fn is_empty(&self) -> bool {
        self.inner.root.read().is_empty()
    }

    /// Registered patterns, including those of mounted trees behind their prefix
    pub fn routes(&self) -> Vec<String> {
        let mut out = Vec::new();
        let root = self.inner.root.read();
        root.collect_patterns(&mut out);
        collect_mounted(&root, &mut out);
        out.sort();
        out.dedup();
        out
    }

    /// Nodes owned by this tree, mounted trees excluded
    pub fn node_count(&self) -> usize {
        self.inner.root.read().count()
    }

    pub(crate) fn read_root(&self) -> RwLockReadGuard<'_, Node<H>> {
        self.inner.root.read()
    }

    pub(crate) fn prefix_segments(&self) -> &[String] {
        &self.inner.prefix_segments
    }

    /// Whether `target` is mounted anywhere below this tree
    pub(crate) fn reaches(&self, target: &Tree<H>) -> bool {
        self.read_root()
            .any_mount(&mut |mounted| mounted.ptr_eq(target) || mounted.reaches(target))
    }

    fn fold_case(&self, text: &str) -> String {
        if self.inner.options.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }

    fn parse(&self, pattern: &str) -> Result<Vec<Segment>> {
        let mut segments = segment::parse_pattern(pattern)?;
        if !self.inner.options.case_sensitive {
            segments.iter_mut().for_each(Segment::lowercase_literal);
        }
        Ok(segments)
    }

    fn parse_one(&self, raw: &str) -> Result<Segment> {
        let mut segment = segment::parse_segment(raw)?;
        if !self.inner.options.case_sensitive {
            segment.lowercase_literal();
        }
        Ok(segment)
    }
}

fn collect_mounted<H>(node: &Node<H>, out: &mut Vec<String>) {
    for mount in &node.mounts {
        let base = mount.prefix.trim_end_matches('/');
        let sub_prefix = mount.tree.prefix();
        for route in mount.tree.routes() {
            let route = route.trim_start_matches('/');
            let mut full = String::from(base);
            if !sub_prefix.is_empty() {
                full.push('/');
                full.push_str(&sub_prefix);
            }
            if !route.is_empty() {
                full.push('/');
                full.push_str(route);
            }
            out.push(full);
        }
    }
    for child in node.children() {
        collect_mounted(child, out);
    }
}

/// Every combination of present and skipped optional segments
fn expand<'s>(segments: &'s [Segment], pattern: &str) -> Result<Vec<Variant<'s>>> {
    let optional: SmallVec<[usize; 8]> = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_optional())
        .map(|(i, _)| i)
        .collect();
    if optional.len() > MAX_OPTIONAL {
        return Err(Error::invalid(pattern, "too many optional segments"));
    }

    let k = optional.len() as u32;
    let variants = (0..1u32 << k)
        .map(|presence| {
            let segments = segments
                .iter()
                .enumerate()
                .filter(|(i, _)| match optional.iter().position(|o| o == i) {
                    Some(j) => presence & (1 << (k - 1 - j as u32)) != 0,
                    None => true,
                })
                .map(|(_, s)| s)
                .collect();
            Variant {
                segments,
                presence,
                skipped: k - presence.count_ones(),
            }
        })
        .collect();
    Ok(variants)
}

/// A lone, trailing, untyped optional parameter binds `""` when skipped
fn skipped_defaults(segments: &[Segment]) -> SmallVec<[String; 1]> {
    let optional = segments.iter().filter(|s| s.is_optional()).count();
    match segments.last() {
        Some(last) if optional == 1 && last.is_optional() && last.is_plain_param() => {
            last.names().iter().map(|n| n.to_string()).collect()
        }
        _ => SmallVec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<H: Clone>(tree: &Tree<H>, path: &str) -> (Option<H>, Params) {
        let mut params = Params::new();
        let found = tree.find(path, &mut params);
        (found, params)
    }

    #[test]
    fn test_static_over_param() {
        let tree = Tree::new();
        tree.add_route("/topic/:id", "wildcard").unwrap();
        tree.add_route("/topic", "static").unwrap();

        assert_eq!(find(&tree, "/topic").0, Some("static"));
        assert_eq!(find(&tree, "/topic/1").0, Some("wildcard"));
    }

    #[test]
    fn test_idempotent_insert() {
        let once = Tree::new();
        once.add_route("/v1/shop/:id:int/?:page", 1).unwrap();

        let twice = Tree::new();
        twice.add_route("/v1/shop/:id:int/?:page", 1).unwrap();
        twice.add_route("/v1/shop/:id:int/?:page", 1).unwrap();

        assert_eq!(once.node_count(), twice.node_count());
        assert_eq!(twice.read_root().literals["v1"].literals["shop"].regexes.len(), 1);
    }

    #[test]
    fn test_reregister_replaces_handler() {
        let tree = Tree::new();
        tree.add_route("/a/:id", 1).unwrap();
        tree.add_route("/a/:id", 2).unwrap();
        assert_eq!(find(&tree, "/a/7").0, Some(2));
    }

    #[test]
    fn test_param_names_coexist() {
        let tree = Tree::new();
        tree.add_route("/user/:id", "by-id").unwrap();
        tree.add_route("/user/:name", "by-name").unwrap();

        let (found, params) = find(&tree, "/user/alice");
        assert_eq!(found, Some("by-id"));
        assert_eq!(params.param(":id"), "alice");
        assert_eq!(tree.routes(), vec!["/user/:id", "/user/:name"]);
    }

    #[test]
    fn test_trailing_slash_route() {
        let tree = Tree::new();
        tree.add_route("/v1/shop/:id", "shopdetail").unwrap();
        tree.add_route("/v1/shop/", "shophome").unwrap();

        assert_eq!(find(&tree, "/v1/shop/").0, Some("shophome"));
        assert_eq!(find(&tree, "/v1/shop/9").0, Some("shopdetail"));
    }

    #[test]
    fn test_prefixed_tree() {
        let tree = Tree::with_prefix("/api/v1").unwrap();
        tree.add_route("/users/:id", "user").unwrap();
        tree.add_route("/", "index").unwrap();

        assert_eq!(tree.prefix(), "api/v1");
        assert_eq!(find(&tree, "/api/v1/users/3").0, Some("user"));
        assert_eq!(find(&tree, "/api/v1").0, Some("index"));
        assert_eq!(find(&tree, "/users/3").0, None);
        assert!(Tree::<u8>::with_prefix("/api/:v").is_err());
    }

    #[test]
    fn test_case_insensitive() {
        let tree = Tree::with_options(TreeOptions::new().case_sensitive(false)).unwrap();
        tree.add_route("/Users/:Name", 1).unwrap();

        let (found, params) = find(&tree, "/USERS/Bob");
        assert_eq!(found, Some(1));
        assert_eq!(params.param(":Name"), "bob");
    }

    #[test]
    fn test_failed_find_leaves_params_untouched() {
        let tree = Tree::new();
        tree.add_route("/a/:x/b", 1).unwrap();

        let mut params = Params::new();
        params.set(":keep", "1");
        assert_eq!(tree.find("/a/1/c", &mut params), None);
        assert_eq!(params.len(), 1);
        assert_eq!(params.param(":x"), "");
    }

    #[test]
    fn test_construction_errors_leave_tree_unchanged() {
        let tree: Tree<u8> = Tree::new();
        assert!(tree.add_route("/a/:id([0-9]+", 1).is_err());
        assert!(tree.is_empty());
        assert!(matches!(tree.mount("/", &Tree::new()), Err(Error::EmptyPrefix)));

        let eight = "/?:a/?:b/?:c/?:d/?:e/?:f/?:g/?:h";
        assert!(tree.add_route(eight, 1).is_ok());
        assert!(matches!(
            tree.add_route(&format!("{eight}/?:i"), 2),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_mount_cycle_rejected() {
        let a: Tree<u8> = Tree::new();
        let b: Tree<u8> = Tree::new();
        a.mount("/b", &b).unwrap();

        assert!(matches!(a.mount("/self", &a), Err(Error::MountCycle { .. })));
        assert!(matches!(b.mount("/a", &a), Err(Error::MountCycle { .. })));
    }

    #[test]
    fn test_mount_is_shared() {
        let sub = Tree::new();
        sub.add_route("/create", "create").unwrap();
        let outer = Tree::new();
        outer.mount("/table/:num", &sub).unwrap();

        sub.add_route("/late", "late").unwrap();
        let (found, params) = find(&outer, "/table/9/late");
        assert_eq!(found, Some("late"));
        assert_eq!(params.param(":num"), "9");
        assert_eq!(outer.routes(), vec!["/table/:num/create", "/table/:num/late"]);
    }

    #[test]
    fn test_remove_branch() {
        let tree = Tree::new();
        tree.add_route("/", "root").unwrap();
        tree.add_route("/level1", "l1").unwrap();
        tree.add_route("/level1/level2", "l2").unwrap();
        tree.add_route("/shop/:id:int", "shop").unwrap();

        assert!(tree.remove("/level1/level2").unwrap());
        assert_eq!(find(&tree, "/level1/level2").0, None);
        assert_eq!(find(&tree, "/level1").0, Some("l1"));
        assert_eq!(find(&tree, "/").0, Some("root"));

        assert!(tree.remove("/shop/:id:int").unwrap());
        assert_eq!(find(&tree, "/shop/1").0, None);

        tree.add_route("/level1/level2", "l2-new").unwrap();
        assert_eq!(find(&tree, "/level1/level2").0, Some("l2-new"));
        assert_eq!(find(&tree, "/level1").0, Some("l1"));
    }

    #[test]
    fn test_remove_optional_route() {
        let tree = Tree::new();
        tree.add_route("/a/?:id", 1).unwrap();
        tree.add_route("/b", 2).unwrap();

        assert!(tree.remove("/a/?:id").unwrap());
        assert_eq!(find(&tree, "/a").0, None);
        assert_eq!(find(&tree, "/a/7").0, None);
        assert_eq!(tree.routes(), vec!["/b"]);
    }

    #[test]
    fn test_remove_deep_route_empties_tree() {
        let tree = Tree::new();
        tree.add_route("/a/b/c", 1).unwrap();

        assert!(tree.remove("/a/b/c").unwrap());
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.routes().is_empty());

        tree.add_route("/a/b/c", 2).unwrap();
        assert_eq!(find(&tree, "/a/b/c").0, Some(2));
    }

    #[test]
    fn test_remove_root() {
        let tree = Tree::new();
        tree.add_route("/", "root").unwrap();
        tree.add_route("/level1", "l1").unwrap();

        assert!(tree.remove("/").unwrap());
        assert_eq!(find(&tree, "/").0, None);
        assert_eq!(find(&tree, "/level1").0, Some("l1"));
        assert!(!tree.remove_root());
    }
}
