//! HTTP response handlers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Request, Response, StatusCode};

use super::revision::{NO_STORE, payload};
use crate::embed::serve::{DOC_PAGE_HTML, DocPageVars, RELOAD_JS, ReloadVars};
use crate::utils::mime::types::{HTML, JAVASCRIPT, JSON, PLAIN};

/// Body of the health check.
pub const HEALTH_BODY: &str = "course-docs-site-stub";

pub fn respond_health(request: Request) -> Result<()> {
    send_body(request, 200, PLAIN, HEALTH_BODY.as_bytes().to_vec(), None)
}

/// Respond with a static file from `public/`.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = crate::utils::mime::from_path(path);
    let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    send_body(request, 200, content_type, body, None)
}

/// Placeholder page of an existing doc, carrying the reload client.
pub fn respond_doc(request: Request, slug: &str) -> Result<()> {
    let body = DOC_PAGE_HTML.render(&DocPageVars {
        slug: slug.to_string(),
    });
    send_body(request, 200, HTML, body.into_bytes(), None)
}

/// Pull transport of the revision channel.
pub fn respond_revision(request: Request, revision: &str) -> Result<()> {
    send_body(request, 200, JSON, payload(revision).into_bytes(), Some(NO_STORE))
}

pub fn respond_reload_js(request: Request) -> Result<()> {
    let body = RELOAD_JS.render(&ReloadVars::default());
    send_body(request, 200, JAVASCRIPT, body.into_bytes(), Some(NO_STORE))
}

pub fn respond_not_found(request: Request) -> Result<()> {
    send_body(request, 404, PLAIN, b"not found".to_vec(), None)
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec(), None)
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    cache_control: Option<&'static str>,
) -> Result<()> {
    let mut response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    if let Some(value) = cache_control {
        response = response.with_header(make_header("Cache-Control", value));
    }
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).expect("static header is valid ASCII")
}
