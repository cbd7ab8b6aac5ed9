//! HTTP front end for TOC lookups.
//!
//! Exposes one route, `GET /ws/1/toc/<toc>[?distance=<ms>]`, where the TOC
//! fields are joined with `+`. Replies with a JSON array of
//! `[tracklist_id, distance_ms]` pairs.

use std::num::ParseIntError;
use std::string::FromUtf8Error;

use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server};
use tocmatch_search::{format_matches, LookupService, SearchError};
use url::form_urlencoded;

const TOC_ROUTE: &str = "/ws/1/toc/";

/// Request parts that fail to decode before a lookup is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("The toc is not valid UTF-8 once decoded.")]
    TocEncoding(#[from] FromUtf8Error),

    #[error("The distance parameter must be a non-negative integer.")]
    Distance(#[from] ParseIntError),
}

/// Status and body for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub json: bool,
}

impl Reply {
    fn json(body: String) -> Self {
        Self {
            status: 200,
            body,
            json: true,
        }
    }

    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            json: false,
        }
    }
}

/// Answer requests until the listener is closed.
///
/// Several workers may run this loop against the same listener; each
/// request is taken by exactly one of them.
pub fn serve(server: &Server, service: &LookupService, default_threshold_ms: u64) {
    for request in server.incoming_requests() {
        let reply = handle(request.method(), request.url(), service, default_threshold_ms);
        if reply.status == 200 {
            log::debug!("{} {} -> {}", request.method(), request.url(), reply.body);
        } else {
            log::info!(
                "{} {} -> {} {}",
                request.method(),
                request.url(),
                reply.status,
                reply.body.trim_end()
            );
        }
        respond(request, reply);
    }
}

/// Route and answer one request.
pub fn handle(
    method: &Method,
    url: &str,
    service: &LookupService,
    default_threshold_ms: u64,
) -> Reply {
    if *method != Method::Get {
        return Reply::text(405, "Only GET method accepted\n");
    }

    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let Some(raw_toc) = path.strip_prefix(TOC_ROUTE) else {
        return Reply::text(
            404,
            "Invalid URL requested. Only /ws/1/toc/<toc> is supported.\n",
        );
    };
    let (toc, distance) = match decode_request(raw_toc, query) {
        Ok(decoded) => decoded,
        Err(e) => return Reply::text(400, format!("{e}\n")),
    };
    let threshold_ms = distance.unwrap_or(default_threshold_ms);

    match service.lookup(&toc, threshold_ms) {
        Ok(matches) => match format_matches(&matches) {
            Ok(body) => Reply::json(body),
            Err(e) => {
                log::error!("Failed to encode matches: {e}");
                Reply::text(500, "Internal error\n")
            }
        },
        Err(SearchError::InvalidToc(e)) => Reply::text(400, format!("Invalid toc passed: {e}\n")),
        Err(SearchError::IndexNotReady) => {
            Reply::text(503, "The index is not ready yet. Try again shortly.\n")
        }
        Err(e) => {
            log::error!("Lookup failed: {e}");
            Reply::text(500, "Internal error\n")
        }
    }
}

fn decode_request(raw_toc: &str, query: &str) -> Result<(String, Option<u64>), RequestError> {
    Ok((decode_toc(raw_toc)?, distance_param(query)?))
}

/// Turn the URL form of a TOC back into its space-separated form.
fn decode_toc(raw: &str) -> Result<String, RequestError> {
    let spaced = raw.replace('+', " ");
    Ok(urlencoding::decode(&spaced)?.into_owned())
}

/// `Ok(None)` when no `distance` is given.
fn distance_param(query: &str) -> Result<Option<u64>, RequestError> {
    let distance = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "distance")
        .map(|(_, value)| value.parse::<u64>())
        .transpose()?;
    Ok(distance)
}

fn respond(request: Request, reply: Reply) {
    let content_type: &[u8] = if reply.json {
        b"application/json"
    } else {
        b"text/plain; charset=utf-8"
    };

    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], content_type) {
        response = response.with_header(header);
    }

    if let Err(e) = request.respond(response) {
        log::warn!("Failed to send response: {e}");
    }
}
