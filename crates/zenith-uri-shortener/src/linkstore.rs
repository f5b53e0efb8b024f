//! A minimal standalone data service speaking the wire contract
//! `zenith_dataservice` expects: JSON over HTTP/2, the HTTP status code
//! itself carrying the outcome (404/409/400 for the three business
//! failures), an `{"error": "..."}"` body for humans. Runs as its own
//! `Http2Server` so the demo binary has a real peer to dispatch against
//! instead of a mock.

use std::sync::Arc;

use serde_json::Value;

use zenith_router::{Method, Router};
use zenith_transport_http2::{Http2Server, Request, Response, RouteHandler};

use crate::domain::LinkRepository;

pub fn build(repository: Arc<dyn LinkRepository>) -> Router<RouteHandler> {
    let mut router: Router<RouteHandler> = Router::new();
    router.register(Method::Post, "/api/v1/links", save_handler(repository.clone()));
    router.register(Method::Get, "/api/v1/links/:code", find_handler(repository.clone()));
    router.register(Method::Delete, "/api/v1/links/:code", delete_handler(repository));
    router
}

fn save_handler(repository: Arc<dyn LinkRepository>) -> RouteHandler {
    Arc::new(move |request: Request, response: Response| {
        let url = serde_json::from_slice::<Value>(request.body())
            .ok()
            .and_then(|v| v.get("url").and_then(Value::as_str).map(str::to_string));
        match url {
            Some(url) => {
                let record = repository.save(url);
                write_json(&response, 201, &record);
            }
            None => write_error(&response, 400, "missing url"),
        }
    })
}

fn find_handler(repository: Arc<dyn LinkRepository>) -> RouteHandler {
    Arc::new(move |request: Request, response: Response| {
        let code = request.path_param("code").unwrap_or_default();
        match repository.find(&code) {
            Some(record) => write_json(&response, 200, &record),
            None => write_error(&response, 404, "link not found"),
        }
    })
}

fn delete_handler(repository: Arc<dyn LinkRepository>) -> RouteHandler {
    Arc::new(move |request: Request, response: Response| {
        let code = request.path_param("code").unwrap_or_default();
        if repository.delete(&code) {
            write_json(&response, 200, &serde_json::json!({ "deleted": true }));
        } else {
            write_error(&response, 404, "link not found");
        }
    })
}

fn write_json(response: &Response, status: u16, value: &impl serde::Serialize) {
    response.set_status(status);
    response.set_header("content-type", "application/json");
    response.write(serde_json::to_vec(value).unwrap_or_default().as_slice());
    response.close();
}

fn write_error(response: &Response, status: u16, message: &str) {
    write_json(response, status, &serde_json::json!({ "error": message }));
}

/// Binds the link-store on its own listener; returns the server handle so
/// the caller can stop it alongside the rest of the service.
pub fn spawn(addr: std::net::SocketAddr, repository: Arc<dyn LinkRepository>) -> anyhow::Result<Http2Server> {
    let server = Http2Server::new(addr, build(repository));
    server.start()?;
    Ok(server)
}
