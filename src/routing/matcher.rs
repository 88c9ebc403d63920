//! Route matching module
//!
//! Implements method and path matching for a single route rule.

use hyper::Method;

/// Path condition of a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    /// Whole path must be equal
    Exact(String),
    /// Path must start with the prefix
    Prefix(String),
    /// Matches every path
    Any,
}

/// Method condition of a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatch {
    Any,
    OneOf(Vec<Method>),
}

/// Combined match rule (method + path)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub method: MethodMatch,
    pub path: PathMatch,
}

impl RouteMatch {
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        match_method(&self.method, method) && match_path(&self.path, path)
    }
}

/// Check if a path matches a path rule
pub fn match_path(rule: &PathMatch, path: &str) -> bool {
    match rule {
        PathMatch::Exact(exact) => path == exact,
        PathMatch::Prefix(prefix) => path.starts_with(prefix.as_str()),
        PathMatch::Any => true,
    }
}

/// Check if a method matches a method rule
pub fn match_method(rule: &MethodMatch, method: &Method) -> bool {
    match rule {
        MethodMatch::Any => true,
        MethodMatch::OneOf(methods) => methods.contains(method),
    }
}
