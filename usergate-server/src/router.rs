//! axum router built from the core route table

use crate::handlers;
use crate::state::AppState;
use axum::{
    http,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use std::collections::BTreeMap;
use usergate_core::routes::Segment;
use usergate_core::{Method, Operation, PathTemplate, RouteTable};

/// Map an HTTP method onto the ones the table knows
pub fn core_method(method: &http::Method) -> Option<Method> {
    method.as_str().parse().ok()
}

fn method_filter(method: Method) -> MethodFilter {
    match method {
        Method::Get => MethodFilter::GET,
        Method::Post => MethodFilter::POST,
        Method::Put => MethodFilter::PUT,
        Method::Patch => MethodFilter::PATCH,
        Method::Delete => MethodFilter::DELETE,
    }
}

/// Render a template in axum's `/:param` syntax
pub fn axum_path(template: &PathTemplate) -> String {
    if template.segments().is_empty() {
        return "/".to_string();
    }
    template
        .segments()
        .iter()
        .map(|segment| match segment {
            Segment::Literal(lit) => format!("/{}", lit),
            Segment::Param(name) => format!("/:{}", name),
        })
        .collect()
}

fn operation_route(method: Method, operation: Operation) -> MethodRouter<AppState> {
    let filter = method_filter(method);
    match operation {
        Operation::List => on(filter, handlers::list_users),
        Operation::Create => on(filter, handlers::create_user),
        Operation::GetOne => on(filter, handlers::get_user),
        Operation::Update => on(filter, handlers::update_user),
        Operation::Delete => on(filter, handlers::delete_user),
    }
}

/// One axum route per distinct template, with all its methods merged
pub fn resource_router(table: &RouteTable) -> Router<AppState> {
    let mut by_path: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();

    for route in table.routes() {
        let path = axum_path(&route.template);
        let method_router = operation_route(route.method, route.operation);
        let merged = match by_path.remove(&path) {
            Some(existing) => existing.merge(method_router),
            None => method_router,
        };
        by_path.insert(path, merged);
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(&path, method_router)
        })
}
