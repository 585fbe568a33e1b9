use http::Method;
use std::collections::HashMap;

#[derive(Debug)]
enum PathSegment {
    Static(String),
    Param(String),
}

#[derive(Debug)]
struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// Parses a path pattern string into a Path struct
    /// Supports:
    /// - Static segments: "/restaurants"
    /// - Dynamic parameters: "/restaurants/{id}"
    pub fn parse(path_str: &str) -> Self {
        let normalized_path = path_str.trim().trim_matches('/');

        let segments: Vec<PathSegment> = if normalized_path.is_empty() {
            vec![]
        } else {
            normalized_path
                .split('/')
                .map(|s| {
                    if let Some(stripped) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                        PathSegment::Param(stripped.to_string())
                    } else {
                        PathSegment::Static(s.to_string())
                    }
                })
                .collect()
        };

        Path { segments }
    }

    /// Matches a request path against this path pattern
    /// Returns Some(params) if match succeeds, None otherwise
    fn matches<'a>(&self, request_path: &'a str) -> Option<HashMap<String, &'a str>> {
        let normalized_path = request_path.trim().trim_matches('/');

        let request_segments: Vec<&'a str> = if normalized_path.is_empty() {
            vec![]
        } else {
            normalized_path.split('/').collect()
        };

        if request_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (seg, req_segment) in self.segments.iter().zip(request_segments) {
            match seg {
                PathSegment::Static(s) => {
                    if req_segment != s {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    if req_segment.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), req_segment);
                }
            }
        }

        Some(params)
    }
}

#[derive(Debug, PartialEq)]
pub struct RouteMatch<'a, A> {
    pub params: HashMap<String, &'a str>,
    pub action: &'a A,
}

impl<A> RouteMatch<'_, A> {
    /// Returns the value captured for a `{name}` segment.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).copied()
    }
}

/// Why a request could not be resolved to an action.
#[derive(Debug, PartialEq, Eq)]
pub enum RouteMiss {
    /// No route pattern matches the path.
    NotFound,
    /// The path matches, but not with this method.
    MethodNotAllowed,
}

#[derive(Debug)]
pub struct Route<A> {
    method: Method,
    path: Path,
    action: A,
}

impl<A> Route<A> {
    /// Creates a new Route with the given method, path pattern, and action
    pub fn new(method: Method, path: &str, action: A) -> Self {
        Self {
            method,
            path: Path::parse(path),
            action,
        }
    }

    /// Returns Some(params) if the path matches this route, ignoring the method.
    /// Trailing slash normalization is applied to incoming requests.
    fn match_path<'a>(&self, request_path: &'a str) -> Option<HashMap<String, &'a str>> {
        self.path.matches(request_path)
    }
}

pub struct RouteActions<A> {
    routes: Vec<Route<A>>,
}

impl<A> RouteActions<A> {
    pub fn new(routes: Vec<Route<A>>) -> Self {
        Self { routes }
    }

    /// Matches the method and path to a route, and returns the first matched route.
    ///
    /// A path that matches some route under a different method resolves to
    /// `RouteMiss::MethodNotAllowed`.
    pub fn resolve<'a>(
        &'a self,
        method: &Method,
        path: &'a str,
    ) -> Result<RouteMatch<'a, A>, RouteMiss> {
        let mut path_matched = false;

        for route in &self.routes {
            let Some(params) = route.match_path(path) else {
                continue;
            };
            if route.method == *method {
                return Ok(RouteMatch {
                    params,
                    action: &route.action,
                });
            }
            path_matched = true;
        }

        match path_matched {
            true => Err(RouteMiss::MethodNotAllowed),
            false => Err(RouteMiss::NotFound),
        }
    }
}
