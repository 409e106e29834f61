//! Method-to-handler mapping strings
//!
//! A mapping names the handler each method is served by:
//! `"get,post:Create;*:Any"` serves `GET` and `POST` with `Create` and every
//! other method with `Any`. An explicit method always wins over `*`,
//! whatever order the entries are written in.

use crate::method::{parse_method, Method, ALL_METHODS};
use crate::{Error, Result};
use smallvec::SmallVec;

/// Methods an entry applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSet {
    /// `*`
    Any,
    Only(SmallVec<[Method; 4]>),
}

/// One `methods:Handler` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub methods: MethodSet,
    pub handler: String,
}

/// Parsed mapping string
///
/// # Example
/// ```
/// use arbor_core::{mapping::MethodMapping, Method};
///
/// let mapping = MethodMapping::parse("get,post:Create;*:Any").unwrap();
/// assert_eq!(mapping.handler_for(&Method::POST), Some("Create"));
/// assert_eq!(mapping.handler_for(&Method::DELETE), Some("Any"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodMapping {
    entries: Vec<MappingEntry>,
}

impl MethodMapping {
    /// Parse `methods:Handler` entries separated by `;`
    pub fn parse(mapping: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidMapping {
            mapping: mapping.to_string(),
            reason: reason.to_string(),
        };

        let mut entries = Vec::new();
        for entry in mapping.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (methods, handler) = entry
                .split_once(':')
                .ok_or_else(|| invalid("entry must be `methods:Handler`"))?;
            let handler = handler.trim();
            if handler.is_empty() {
                return Err(invalid("empty handler name"));
            }

            let methods = if methods.trim() == "*" {
                MethodSet::Any
            } else {
                let parsed = methods
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(parse_method)
                    .collect::<Result<SmallVec<[Method; 4]>>>()?;
                if parsed.is_empty() {
                    return Err(invalid("no methods before `:`"));
                }
                MethodSet::Only(parsed)
            };

            entries.push(MappingEntry {
                methods,
                handler: handler.to_string(),
            });
        }

        if entries.is_empty() {
            return Err(invalid("no entries"));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Handler serving `method`; the last explicit entry wins, then the last `*`
    pub fn handler_for(&self, method: &Method) -> Option<&str> {
        let explicit = self.entries.iter().rev().find(|e| match &e.methods {
            MethodSet::Only(methods) => methods.contains(method),
            MethodSet::Any => false,
        });
        explicit
            .or_else(|| {
                self.entries
                    .iter()
                    .rev()
                    .find(|e| e.methods == MethodSet::Any)
            })
            .map(|e| e.handler.as_str())
    }

    /// Every method with a handler, paired with that handler
    pub fn resolve(&self) -> impl Iterator<Item = (Method, &str)> + '_ {
        ALL_METHODS
            .into_iter()
            .filter_map(|m| self.handler_for(&m).map(|h| (m, h)))
    }
}
