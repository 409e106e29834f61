//! arbor-core: Method-aware routing on top of arbor-router
//!
//! Routes are registered per HTTP method, or for every method at once, and
//! each method owns one [`arbor_router::Tree`]. Handler names can be spread
//! over methods with mapping strings such as `"get,post:Create;*:Any"`.
//!
//! ## Example
//! ```
//! use arbor_core::{Method, Router, RouterConfig};
//! use arbor_router::Params;
//!
//! let mut router = Router::with_config(RouterConfig::new().case_sensitive(false));
//! router.get("/Shop/:id:int", 1).unwrap();
//!
//! let mut params = Params::new();
//! assert_eq!(router.match_route(&Method::HEAD, "/shop/42.json", &mut params), None);
//! assert_eq!(router.match_route(&Method::HEAD, "/shop/42", &mut params), Some(1));
//! assert_eq!(params.param(":id"), "42");
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod mapping;
pub mod method;
pub mod router;

// Re-exports
pub use config::RouterConfig;
pub use error::{Error, Result};
pub use mapping::MethodMapping;
pub use method::{parse_method, Method, ALL_METHODS};
pub use router::{RouteMatch, Router};
