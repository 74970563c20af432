//! Route table for the user resource
//!
//! The table is an ordered list of `(method, path template) -> operation`
//! bindings, built once at startup. The HTTP layer turns it into its own
//! router; [`RouteTable::resolve`] answers the same question without one.

use crate::error::{Result, UsergateError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default protected prefix
pub const DEFAULT_PROTECTED_PREFIX: &str = "/api/rest";

/// Name of the user path parameter
pub const USER_ID_PARAM: &str = "userId";

/// HTTP methods the table can bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = UsergateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(UsergateError::ConfigError(format!(
                "unsupported HTTP method: {}",
                other
            ))),
        }
    }
}

/// CRUD operation a route dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Get all users
    List,
    /// Create a user
    Create,
    /// Get one user
    GetOne,
    /// Update one user
    Update,
    /// Delete one user
    Delete,
}

impl Operation {
    /// Stable name, also used as a metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::GetOne => "get-one",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a path template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Must match exactly
    Literal(String),
    /// Captures one non-empty path segment
    Param(String),
}

/// Path captured parameters, by name
pub type PathParams = BTreeMap<String, String>;

/// Parsed path template such as `/api/rest/users/{userId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template; at most one `{param}` segment is allowed
    pub fn parse(template: &str) -> Result<Self> {
        if !template.starts_with('/') {
            return Err(UsergateError::InvalidTemplate(format!(
                "{:?} must start with '/'",
                template
            )));
        }

        let mut segments = Vec::new();
        for part in split_segments(template) {
            if let Some(inner) = part.strip_prefix('{') {
                let name = inner.strip_suffix('}').ok_or_else(|| {
                    UsergateError::InvalidTemplate(format!("unclosed parameter in {:?}", template))
                })?;
                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(UsergateError::InvalidTemplate(format!(
                        "bad parameter name in {:?}",
                        template
                    )));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(UsergateError::InvalidTemplate(format!(
                    "unbalanced braces in {:?}",
                    template
                )));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        let params = segments
            .iter()
            .filter(|s| matches!(s, Segment::Param(_)))
            .count();
        if params > 1 {
            return Err(UsergateError::InvalidTemplate(format!(
                "{:?} has more than one path parameter",
                template
            )));
        }

        Ok(PathTemplate {
            raw: template.to_string(),
            segments,
        })
    }

    /// Template as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Name of the path parameter, if any
    pub fn param(&self) -> Option<&str> {
        self.segments.iter().find_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path, returning captured parameters
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = split_segments(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// A single binding in the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// HTTP method
    pub method: Method,
    /// Path template
    #[serde(serialize_with = "serialize_template")]
    pub template: PathTemplate,
    /// Operation the route dispatches to
    pub operation: Operation,
}

fn serialize_template<S: serde::Serializer>(
    template: &PathTemplate,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(template.as_str())
}

/// Result of resolving a request against the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Operation to dispatch to
    pub operation: Operation,
    /// Captured path parameters
    pub params: PathParams,
}

impl RouteMatch {
    /// The captured `userId`, if the route has one
    pub fn user_id(&self) -> Option<&str> {
        self.params.get(USER_ID_PARAM).map(String::as_str)
    }
}

/// Ordered, immutable-after-startup route table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    protected_prefix: String,
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create an empty table guarding `protected_prefix`
    pub fn new(protected_prefix: impl Into<String>) -> Self {
        let prefix = protected_prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        let protected_prefix = if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        };
        RouteTable {
            protected_prefix,
            routes: Vec::new(),
        }
    }

    /// The standard five user bindings under `{prefix}/users`
    pub fn users(protected_prefix: impl Into<String>) -> Result<Self> {
        let mut table = RouteTable::new(protected_prefix);
        table.register_user_routes()?;
        Ok(table)
    }

    /// Register the five user bindings
    ///
    /// Safe to call more than once; identical bindings are not duplicated.
    pub fn register_user_routes(&mut self) -> Result<()> {
        let collection = format!("{}/users", self.base());
        let item = format!("{}/{{{}}}", collection, USER_ID_PARAM);

        self.register(Method::Get, &collection, Operation::List)?;
        self.register(Method::Post, &collection, Operation::Create)?;
        self.register(Method::Get, &item, Operation::GetOne)?;
        self.register(Method::Patch, &item, Operation::Update)?;
        self.register(Method::Delete, &item, Operation::Delete)?;
        Ok(())
    }

    /// Bind `method template` to `operation`
    ///
    /// Re-registering an identical binding is a no-op. Binding an already
    /// bound method and template to a different operation is an error.
    pub fn register(&mut self, method: Method, template: &str, operation: Operation) -> Result<()> {
        let template = PathTemplate::parse(template)?;

        if let Some(existing) = self
            .routes
            .iter()
            .find(|r| r.method == method && r.template == template)
        {
            if existing.operation == operation {
                return Ok(());
            }
            return Err(UsergateError::RouteConflict {
                method: method.to_string(),
                template: template.to_string(),
                existing: existing.operation.to_string(),
            });
        }

        tracing::debug!("Registered route {} {} -> {}", method, template, operation);
        self.routes.push(Route {
            method,
            template,
            operation,
        });
        Ok(())
    }

    /// All bindings in registration order
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Protected prefix without trailing slash
    pub fn protected_prefix(&self) -> &str {
        &self.protected_prefix
    }

    /// Prefix to join resource paths onto; empty for a root prefix
    pub fn base(&self) -> &str {
        if self.protected_prefix == "/" {
            ""
        } else {
            &self.protected_prefix
        }
    }

    /// Whether the gate must run for `path`
    pub fn is_protected(&self, path: &str) -> bool {
        if self.protected_prefix == "/" {
            return true;
        }
        match path.strip_prefix(self.protected_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Find the operation for a request, first match wins
    pub fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|r| r.method == method)
            .find_map(|r| {
                r.template.matches(path).map(|params| RouteMatch {
                    operation: r.operation,
                    params,
                })
            })
    }

    /// Methods bound to templates matching `path`, for 405 answers
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = self
            .routes
            .iter()
            .filter(|r| r.template.matches(path).is_some())
            .map(|r| r.method)
            .collect();
        methods.sort();
        methods.dedup();
        methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::users(DEFAULT_PROTECTED_PREFIX).unwrap()
    }

    #[test]
    fn test_user_table_has_five_routes() {
        let table = table();
        let summary: Vec<(Method, &str, Operation)> = table
            .routes()
            .iter()
            .map(|r| (r.method, r.template.as_str(), r.operation))
            .collect();

        assert_eq!(
            summary,
            vec![
                (Method::Get, "/api/rest/users", Operation::List),
                (Method::Post, "/api/rest/users", Operation::Create),
                (Method::Get, "/api/rest/users/{userId}", Operation::GetOne),
                (Method::Patch, "/api/rest/users/{userId}", Operation::Update),
                (Method::Delete, "/api/rest/users/{userId}", Operation::Delete),
            ]
        );
    }

    #[test]
    fn test_list_is_not_get_one() {
        let m = table().resolve(Method::Get, "/api/rest/users").unwrap();
        assert_eq!(m.operation, Operation::List);
        assert_eq!(m.user_id(), None);
    }

    #[test]
    fn test_item_routes_capture_user_id() {
        let table = table();
        for (method, operation) in [
            (Method::Get, Operation::GetOne),
            (Method::Patch, Operation::Update),
            (Method::Delete, Operation::Delete),
        ] {
            let m = table.resolve(method, "/api/rest/users/42").unwrap();
            assert_eq!(m.operation, operation);
            assert_eq!(m.user_id(), Some("42"));
        }
    }

    #[test]
    fn test_post_maps_to_create() {
        let m = table().resolve(Method::Post, "/api/rest/users").unwrap();
        assert_eq!(m.operation, Operation::Create);
    }

    #[test]
    fn test_unbound_requests_do_not_resolve() {
        let table = table();
        assert!(table.resolve(Method::Post, "/api/rest/users/42").is_none());
        assert!(table.resolve(Method::Put, "/api/rest/users/42").is_none());
        assert!(table.resolve(Method::Get, "/api/rest/users/42/extra").is_none());
        assert!(table.resolve(Method::Get, "/api/rest").is_none());
        assert!(table.resolve(Method::Get, "/users").is_none());
    }

    #[test]
    fn test_trailing_slash_is_not_significant() {
        let m = table().resolve(Method::Get, "/api/rest/users/").unwrap();
        assert_eq!(m.operation, Operation::List);
    }

    #[test]
    fn test_registering_twice_is_idempotent() {
        let mut twice = table();
        twice.register_user_routes().unwrap();
        assert_eq!(twice, table());
        assert_eq!(
            twice.resolve(Method::Delete, "/api/rest/users/7"),
            table().resolve(Method::Delete, "/api/rest/users/7")
        );
    }

    #[test]
    fn test_conflicting_registration_fails() {
        let mut table = table();
        let err = table
            .register(Method::Get, "/api/rest/users", Operation::Create)
            .unwrap_err();
        assert!(matches!(err, UsergateError::RouteConflict { .. }));
        assert_eq!(table.routes().len(), 5);
    }

    #[test]
    fn test_protected_prefix() {
        let table = table();
        assert!(table.is_protected("/api/rest"));
        assert!(table.is_protected("/api/rest/"));
        assert!(table.is_protected("/api/rest/users/42"));
        assert!(table.is_protected("/api/rest/anything"));
        assert!(!table.is_protected("/api/restful"));
        assert!(!table.is_protected("/api"));
        assert!(!table.is_protected("/health/live"));
    }

    #[test]
    fn test_prefix_trailing_slash_is_trimmed() {
        let table = RouteTable::users("/v2/").unwrap();
        assert_eq!(table.protected_prefix(), "/v2");
        assert!(table.resolve(Method::Get, "/v2/users").is_some());
    }

    #[test]
    fn test_base_for_root_prefix() {
        assert_eq!(table().base(), "/api/rest");

        let table = RouteTable::users("/").unwrap();
        assert_eq!(table.base(), "");
        assert!(table.resolve(Method::Get, "/users/1").is_some());
    }

    #[test]
    fn test_allowed_methods() {
        let table = table();
        assert_eq!(
            table.allowed_methods("/api/rest/users/1"),
            vec![Method::Get, Method::Patch, Method::Delete]
        );
        assert_eq!(
            table.allowed_methods("/api/rest/users"),
            vec![Method::Get, Method::Post]
        );
        assert!(table.allowed_methods("/nope").is_empty());
    }

    #[test]
    fn test_template_parsing() {
        let t = PathTemplate::parse("/api/rest/users/{userId}").unwrap();
        assert_eq!(t.param(), Some("userId"));
        assert_eq!(t.segments().len(), 4);

        assert!(PathTemplate::parse("api/users").is_err());
        assert!(PathTemplate::parse("/users/{}").is_err());
        assert!(PathTemplate::parse("/users/{id").is_err());
        assert!(PathTemplate::parse("/users/id}").is_err());
        assert!(PathTemplate::parse("/{a}/{b}").is_err());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn test_route_serializes_for_listing() {
        let json = serde_json::to_value(&table().routes()[2]).unwrap();
        assert_eq!(json["method"], "GET");
        assert_eq!(json["template"], "/api/rest/users/{userId}");
        assert_eq!(json["operation"], "get-one");
    }
}
