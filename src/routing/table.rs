//! Route table module
//!
//! Ordered list of route rules. The first matching rule wins; requests that
//! match nothing resolve to [`Endpoint::NotFound`].

use hyper::Method;

use super::matcher::{MethodMatch, PathMatch, RouteMatch};
use crate::config::HealthConfig;

pub const LIST_PATH: &str = "/api/pgn-files";
pub const SAVE_PATH: &str = "/api/pgn-files-save";
pub const READ_PREFIX: &str = "/api/pgn-files/";

/// What a matched request is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// CORS preflight, answered with an empty 204
    Preflight,
    ListFiles,
    SaveFile,
    ReadFile,
    Health,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub match_rule: RouteMatch,
    pub endpoint: Endpoint,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(health: &HealthConfig) -> Self {
        let read_methods = || MethodMatch::OneOf(vec![Method::GET, Method::HEAD]);

        let mut routes = vec![
            Route {
                match_rule: RouteMatch {
                    method: MethodMatch::OneOf(vec![Method::OPTIONS]),
                    path: PathMatch::Any,
                },
                endpoint: Endpoint::Preflight,
            },
            Route {
                match_rule: RouteMatch {
                    method: MethodMatch::OneOf(vec![Method::GET]),
                    path: PathMatch::Exact(LIST_PATH.to_string()),
                },
                endpoint: Endpoint::ListFiles,
            },
            Route {
                match_rule: RouteMatch {
                    method: MethodMatch::Any,
                    path: PathMatch::Exact(SAVE_PATH.to_string()),
                },
                endpoint: Endpoint::SaveFile,
            },
            Route {
                match_rule: RouteMatch {
                    method: read_methods(),
                    path: PathMatch::Prefix(READ_PREFIX.to_string()),
                },
                endpoint: Endpoint::ReadFile,
            },
        ];

        if health.enabled {
            for path in [&health.liveness_path, &health.readiness_path] {
                routes.push(Route {
                    match_rule: RouteMatch {
                        method: read_methods(),
                        path: PathMatch::Exact(path.clone()),
                    },
                    endpoint: Endpoint::Health,
                });
            }
        }

        Self { routes }
    }

    /// Find the first route matching the request
    pub fn match_route(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.match_rule.matches(method, path))
    }

    /// Endpoint for the request, falling back to [`Endpoint::NotFound`]
    pub fn resolve(&self, method: &Method, path: &str) -> Endpoint {
        self.match_route(method, path)
            .map_or(Endpoint::NotFound, |route| route.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(&HealthConfig::default())
    }

    #[test]
    fn test_options_always_preflight() {
        let t = table();
        for path in ["/", "/api/pgn-files", "/api/pgn-files-save", "/nope"] {
            assert_eq!(t.resolve(&Method::OPTIONS, path), Endpoint::Preflight);
        }
    }

    #[test]
    fn test_api_routes() {
        let t = table();
        assert_eq!(t.resolve(&Method::GET, "/api/pgn-files"), Endpoint::ListFiles);
        assert_eq!(
            t.resolve(&Method::GET, "/api/pgn-files/a_b_2020.pgn"),
            Endpoint::ReadFile
        );
        assert_eq!(
            t.resolve(&Method::HEAD, "/api/pgn-files/a_b_2020.pgn"),
            Endpoint::ReadFile
        );
        assert_eq!(t.resolve(&Method::POST, "/api/pgn-files-save"), Endpoint::SaveFile);
        assert_eq!(t.resolve(&Method::PUT, "/api/pgn-files-save"), Endpoint::SaveFile);
    }

    #[test]
    fn test_method_sensitive_routes_fall_through() {
        let t = table();
        assert_eq!(t.resolve(&Method::POST, "/api/pgn-files"), Endpoint::NotFound);
        assert_eq!(
            t.resolve(&Method::DELETE, "/api/pgn-files/a_b_2020.pgn"),
            Endpoint::NotFound
        );
    }

    #[test]
    fn test_match_route_order() {
        let t = table();
        let route = t.match_route(&Method::OPTIONS, "/api/pgn-files").unwrap();
        assert_eq!(route.endpoint, Endpoint::Preflight);
        assert!(t.match_route(&Method::GET, "/").is_none());
    }

    #[test]
    fn test_health_routes() {
        let t = table();
        assert_eq!(t.resolve(&Method::GET, "/healthz"), Endpoint::Health);
        assert_eq!(t.resolve(&Method::GET, "/readyz"), Endpoint::Health);

        let disabled = RouteTable::new(&HealthConfig {
            enabled: false,
            ..HealthConfig::default()
        });
        assert_eq!(disabled.resolve(&Method::GET, "/healthz"), Endpoint::NotFound);
    }
}
