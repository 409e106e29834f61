//! Router configuration

use arbor_router::TreeOptions;

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Match literal segments case-sensitively
    ///
    /// When disabled, literal pattern segments and request paths are both
    /// lowercased, so captured values come back lowercased too.
    pub case_sensitive: bool,
    /// Extensions a final literal segment may carry, bound to `:ext`
    pub suffix_exts: Vec<String>,
    /// Answer `HEAD` from the `GET` routes when no `HEAD` route matches
    pub head_fallback: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            suffix_exts: TreeOptions::default().suffix_exts,
            head_fallback: true,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
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

    pub fn head_fallback(mut self, enabled: bool) -> Self {
        self.head_fallback = enabled;
        self
    }

    /// Options every method bucket is created with
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions::new()
            .case_sensitive(self.case_sensitive)
            .suffix_exts(self.suffix_exts.iter().cloned())
    }
}
