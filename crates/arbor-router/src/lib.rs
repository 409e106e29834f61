//! arbor-router: Hierarchical path-matching tree
//!
//! Routes are split on `/` and stored one segment per edge. A tree can be
//! mounted inside another below a prefix, and the mounted tree stays a live,
//! shared handle.
//!
//! ## Path Syntax
//! - `admin` - Literal segment
//! - `:id` - Named parameter (captures one segment)
//! - `?:id` - Optional parameter
//! - `:id:int`, `:name:string` - Typed parameter (`[0-9]+`, `[\w]+`)
//! - `:id([0-9]+)` - Regex-constrained parameter
//! - `cms_:id(.+)_:page(.+).html` - Several parameters inside one segment
//! - `*` - Wildcard, one or more segments bound to `:splat`
//! - `*.*` - Path and extension, bound to `:path` and `:ext`
//!
//! ## Priority
//! 1. Literal match (highest)
//! 2. Literal match with a `.json`, `.xml` or `.html` suffix stripped
//! 3. Regex and typed parameters, first registered first
//! 4. Parameter match
//! 5. `*.*`
//! 6. `*` (lowest)
//!
//! A mounted tree is searched as a descendant of the node it is mounted at:
//! its root's children compete inside the same tiers, right after that
//! node's own children. A lower-priority branch is tried whenever a higher
//! one dead-ends deeper down.
//!
//! ## Example
//! ```
//! use arbor_router::{Params, Tree};
//!
//! let tree = Tree::new();
//! tree.add_route("/users", 0).unwrap();
//! tree.add_route("/users/:id:int", 1).unwrap();
//! tree.add_route("/files/*", 2).unwrap();
//!
//! let mut params = Params::new();
//! assert_eq!(tree.find("/users/123", &mut params), Some(1));
//! assert_eq!(params.param(":id"), "123");
//!
//! params.reset();
//! assert_eq!(tree.find("/files/a/b.txt", &mut params), Some(2));
//! assert_eq!(params.param(":splat"), "a/b.txt");
//! ```

mod error;
mod matcher;
mod node;
mod params;
pub mod sanitize;
pub mod segment;
mod tree;

pub use error::{Error, Result};
pub use params::{Mark, Params};
pub use segment::{Segment, SegmentKind, SegmentRegex};
pub use tree::{Tree, TreeOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_static_routes() {
        let tree = Tree::new();
        tree.add_route("/", 0).unwrap();
        tree.add_route("/users", 1).unwrap();
        tree.add_route("/api/v1/health", 2).unwrap();

        assert_eq!(tree.find("/", &mut Params::new()), Some(0));
        assert_eq!(tree.find("/users", &mut Params::new()), Some(1));
        assert_eq!(tree.find("/api/v1/health", &mut Params::new()), Some(2));
        assert_eq!(tree.find("/unknown", &mut Params::new()), None);
    }

    #[test]
    fn test_complex_nested_params() {
        let tree = Tree::new();
        tree.add_route("/users/:userId/posts/:postId/comments/:commentId", 0)
            .unwrap();

        let mut params = Params::new();
        assert_eq!(tree.find("/users/1/posts/2/comments/3", &mut params), Some(0));
        assert_eq!(params.param(":userId"), "1");
        assert_eq!(params.param(":postId"), "2");
        assert_eq!(params.param(":commentId"), "3");
    }

    #[test]
    fn test_priority_exact_over_param() {
        let tree = Tree::new();
        tree.add_route("/users/:id", 0).unwrap();
        tree.add_route("/users/me", 1).unwrap();

        assert_eq!(tree.find("/users/me", &mut Params::new()), Some(1));
        assert_eq!(tree.find("/users/123", &mut Params::new()), Some(0));
    }

    #[test]
    fn test_nested_mounts() {
        let leaf = Tree::new();
        leaf.add_route("/detail/:item", "detail").unwrap();
        let mid = Tree::new();
        mid.mount("/shop/:shop", &leaf).unwrap();
        let top = Tree::with_prefix("/api").unwrap();
        top.mount("/:version(v1|v2)", &mid).unwrap();

        let mut params = Params::new();
        assert_eq!(top.find("/api/v2/shop/9/detail/x", &mut params), Some("detail"));
        assert_eq!(params.param(":version"), "v2");
        assert_eq!(params.param(":shop"), "9");
        assert_eq!(params.param(":item"), "x");
        assert_eq!(top.routes(), vec!["/:version(v1|v2)/shop/:shop/detail/:item"]);
    }

    #[test]
    fn test_mounted_prefixed_tree() {
        let sub = Tree::with_prefix("/admin").unwrap();
        sub.add_route("/users", "users").unwrap();
        let top = Tree::new();
        top.mount("/:tenant", &sub).unwrap();

        let mut params = Params::new();
        assert_eq!(top.find("/acme/admin/users", &mut params), Some("users"));
        assert_eq!(params.param(":tenant"), "acme");
        assert_eq!(top.find("/acme/users", &mut Params::new()), None);
        assert_eq!(top.routes(), vec!["/:tenant/admin/users"]);
    }

    #[test]
    fn test_concurrent_find() {
        let tree = Arc::new(Tree::new());
        tree.add_route("/n/:id:int", 1u32).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let tree = Arc::clone(&tree);
                thread::spawn(move || {
                    let mut params = Params::new();
                    let path = format!("/n/{i}");
                    assert_eq!(tree.find(&path, &mut params), Some(1));
                    assert_eq!(params.param(":id"), i.to_string());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
