//! Per-method routing
//!
//! Every HTTP method gets its own [`Tree`] (a bucket), created the first time
//! a route is registered for it. `*` registrations go into every bucket.

use crate::mapping::MethodMapping;
use crate::method::{parse_method, Method, ALL_METHODS};
use crate::{Result, RouterConfig};
use arbor_router::{Params, Tree};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Route match result
#[derive(Debug, Clone)]
pub struct RouteMatch<T> {
    /// The matched handler/value
    pub value: T,
    /// Captured path parameters
    pub params: Params,
}

/// HTTP router
///
/// Routes are organized by HTTP method for O(1) method dispatch, then
/// matched against that method's tree.
///
/// ## Example
/// ```
/// use arbor_core::{Method, Router};
/// use arbor_router::Params;
///
/// let mut router = Router::new();
/// router.get("/users/:id:int", "get_user").unwrap();
/// router.any("/health", "health").unwrap();
///
/// let mut params = Params::new();
/// assert_eq!(router.match_route(&Method::GET, "/users/7", &mut params), Some("get_user"));
/// assert_eq!(params.param(":id"), "7");
/// assert_eq!(router.match_route(&Method::DELETE, "/health", &mut Params::new()), Some("health"));
/// ```
pub struct Router<T> {
    buckets: HashMap<Method, Tree<T>>,
    config: RouterConfig,
}

impl<T: Clone> Router<T> {
    /// Create a new router
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            buckets: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Tree holding the routes of `method`, if any were registered
    pub fn tree(&self, method: &Method) -> Option<&Tree<T>> {
        self.buckets.get(method)
    }

    fn bucket(&mut self, method: Method) -> Result<&Tree<T>> {
        Ok(match self.buckets.entry(method) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Tree::with_options(self.config.tree_options())?),
        })
    }

    /// Add a route
    pub fn route(&mut self, method: Method, pattern: &str, value: T) -> Result<()> {
        self.bucket(method.clone())?.add_route(pattern, value)?;
        debug!(%method, pattern, "route registered");
        Ok(())
    }

    /// Add a GET route
    pub fn get(&mut self, pattern: &str, value: T) -> Result<()> {
        self.route(Method::GET, pattern, value)
    }

    /// Add a POST route
    pub fn post(&mut self, pattern: &str, value: T) -> Result<()> {
        self.route(Method::POST, pattern, value)
    }

    /// Add a PUT route
    pub fn put(&mut self, pattern: &str, value: T) -> Result<()> {
        self.route(Method::PUT, pattern, value)
    }

    /// Add a DELETE route
    pub fn delete(&mut self, pattern: &str, value: T) -> Result<()> {
        self.route(Method::DELETE, pattern, value)
    }

    /// Add a PATCH route
    pub fn patch(&mut self, pattern: &str, value: T) -> Result<()> {
        self.route(Method::PATCH, pattern, value)
    }

    /// Add a HEAD route
    pub fn head(&mut self, pattern: &str, value: T) -> Result<()> {
        self.route(Method::HEAD, pattern, value)
    }

    /// Add an OPTIONS route
    pub fn options(&mut self, pattern: &str, value: T) -> Result<()> {
        self.route(Method::OPTIONS, pattern, value)
    }

    /// Add a route for every method
    pub fn any(&mut self, pattern: &str, value: T) -> Result<()> {
        for method in ALL_METHODS {
            self.route(method, pattern, value.clone())?;
        }
        Ok(())
    }

    /// Mount `tree` below `prefix` in the bucket of `method`
    pub fn mount(&mut self, method: Method, prefix: &str, tree: &Tree<T>) -> Result<()> {
        self.bucket(method)?.mount(prefix, tree)?;
        Ok(())
    }

    /// Register `pattern` for every method named in `mapping`
    ///
    /// `make_handler` is called once per distinct handler name, and the
    /// value it returns is shared by all methods mapped to that name.
    ///
    /// ```
    /// use arbor_core::{Method, Router};
    /// use arbor_router::Params;
    ///
    /// let mut router = Router::new();
    /// router
    ///     .add_mapped("/user/:id", "get:Show;put,patch:Update", |name| name.to_string())
    ///     .unwrap();
    ///
    /// let found = router.match_route(&Method::PATCH, "/user/1", &mut Params::new());
    /// assert_eq!(found.as_deref(), Some("Update"));
    /// ```
    pub fn add_mapped<F>(&mut self, pattern: &str, mapping: &str, mut make_handler: F) -> Result<()>
    where
        F: FnMut(&str) -> T,
    {
        let mapping = MethodMapping::parse(mapping)?;
        let mut made: Vec<(&str, T)> = Vec::new();
        for (method, name) in mapping.resolve() {
            let value = match made.iter().find(|(n, _)| *n == name) {
                Some((_, value)) => value.clone(),
                None => {
                    let value = make_handler(name);
                    made.push((name, value.clone()));
                    value
                }
            };
            self.route(method, pattern, value)?;
        }
        Ok(())
    }

    /// Remove the route at `path` for `method`, or for every method with `"*"`
    ///
    /// Only the handlers at `path` go away; routes below it keep working.
    /// Buckets left with no routes are dropped.
    pub fn unregister_fixed_route(&mut self, path: &str, method: &str) -> Result<bool> {
        let methods: Vec<Method> = if method.trim() == "*" {
            self.buckets.keys().cloned().collect()
        } else {
            vec![parse_method(method)?]
        };

        let mut removed = false;
        for method in methods {
            let Some(tree) = self.buckets.get(&method) else {
                continue;
            };
            removed |= tree.remove(path)?;
            if tree.is_empty() {
                self.buckets.remove(&method);
            }
        }
        debug!(path, method, removed, "route unregistered");
        Ok(removed)
    }

    /// Match a request
    ///
    /// `HEAD` falls back to the `GET` routes unless disabled in the config.
    pub fn match_route(&self, method: &Method, path: &str, params: &mut Params) -> Option<T> {
        let found = self.buckets.get(method).and_then(|tree| tree.find(path, params));
        let found = match found {
            None if *method == Method::HEAD && self.config.head_fallback => self
                .buckets
                .get(&Method::GET)
                .and_then(|tree| tree.find(path, params)),
            found => found,
        };
        if found.is_none() {
            trace!(%method, path, "no route");
        }
        found
    }

    /// Match using string method
    pub fn match_str(&self, method: &str, path: &str) -> Result<Option<RouteMatch<T>>> {
        let method = parse_method(method)?;
        let mut params = Params::new();
        Ok(self
            .match_route(&method, path, &mut params)
            .map(|value| RouteMatch { value, params }))
    }

    /// Registered patterns per method
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut out: Vec<(Method, String)> = self
            .buckets
            .iter()
            .flat_map(|(method, tree)| tree.routes().into_iter().map(move |r| (method.clone(), r)))
            .collect();
        out.sort_by(|a, b| (a.0.as_str(), &a.1).cmp(&(b.0.as_str(), &b.1)));
        out
    }
}

impl<T: Clone> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}
