//! Minimal HTTP/1.1 request routing for the logger API
//!
//! Requests are answered one at a time with `Connection: close`, so only the
//! request line matters: headers and bodies are ignored.
//!
//! | Path            | Response                                    |
//! |-----------------|---------------------------------------------|
//! | `/currenttemp`  | latest temperature                          |
//! | `/currenthumid` | latest humidity                             |
//! | `/dailytemp`    | every retained temperature, oldest first    |
//! | `/dailyhumid`   | every retained humidity, oldest first       |
//! | `/`             | `/index.html` from the asset store          |
//! | `/img/*`        | the same path from the asset store          |
//!
//! An API query made before the first sample is answered with status 500
//! and an empty body.

use core::fmt::Write as _;

use alloc::string::String;
use log::{debug, error, warn};
use thiserror_no_std::Error;

use crate::assets::{Asset, AssetStore};
use crate::history::History;
use crate::query::{self, QueryError};
use crate::sample::Quantity;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    #[error("request line is incomplete")]
    Incomplete,
    #[error("request is not valid UTF-8")]
    InvalidEncoding,
    #[error("malformed request line")]
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other,
}

impl Method {
    fn parse(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: Method,
    /// Request path without the query string
    pub path: &'a str,
}

impl<'a> Request<'a> {
    /// Parse the request line from the start of a raw request.
    pub fn parse(raw: &'a [u8]) -> Result<Self, HttpError> {
        let line_end = raw
            .iter()
            .position(|b| *b == b'\n')
            .ok_or(HttpError::Incomplete)?;
        let line = core::str::from_utf8(&raw[..line_end]).map_err(|_| HttpError::InvalidEncoding)?;

        let mut parts = line.trim_end_matches('\r').split_ascii_whitespace();
        let method = parts.next().ok_or(HttpError::Malformed)?;
        let target = parts.next().ok_or(HttpError::Malformed)?;
        let version = parts.next().ok_or(HttpError::Malformed)?;
        if !version.starts_with("HTTP/") || parts.next().is_some() || !target.starts_with('/') {
            return Err(HttpError::Malformed);
        }

        let path = target.split_once('?').map_or(target, |(path, _)| path);
        Ok(Self {
            method: Method::parse(method),
            path,
        })
    }
}

/// What a request path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Latest(Quantity),
    Series(Quantity),
    Asset(&'a str),
    NotFound,
}

impl<'a> Route<'a> {
    pub fn resolve(path: &'a str) -> Self {
        match path {
            "/currenttemp" => Self::Latest(Quantity::Temperature),
            "/currenthumid" => Self::Latest(Quantity::Humidity),
            "/dailytemp" => Self::Series(Quantity::Temperature),
            "/dailyhumid" => Self::Series(Quantity::Humidity),
            "/" => Self::Asset("/index.html"),
            _ if path.starts_with("/img/") => Self::Asset(path),
            _ => Self::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Status {
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::InternalServerError => 500,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Owned(String),
    Static(&'static [u8]),
}

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Empty => &[],
            Self::Owned(text) => text.as_bytes(),
            Self::Static(bytes) => *bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    body: Body,
    // HEAD: advertise the length but send no body
    head_only: bool,
}

impl Response {
    pub fn new(status: Status, content_type: &'static str, body: Body) -> Self {
        Self {
            status,
            content_type,
            body,
            head_only: false,
        }
    }

    pub fn empty(status: Status, content_type: &'static str) -> Self {
        Self::new(status, content_type, Body::Empty)
    }

    pub fn json(body: String) -> Self {
        Self::new(Status::Ok, CONTENT_TYPE_JSON, Body::Owned(body))
    }

    pub fn asset(asset: Asset) -> Self {
        Self::new(Status::Ok, asset.content_type, Body::Static(asset.body))
    }

    /// Map a query result: an empty history is a server error with no body.
    pub fn from_query(result: Result<String, QueryError>) -> Self {
        match result {
            Ok(body) => Self::json(body),
            Err(QueryError::HistoryEmpty) => {
                Self::empty(Status::InternalServerError, CONTENT_TYPE_JSON)
            }
            Err(e) => {
                error!("Query failed: {}", e);
                Self::empty(Status::InternalServerError, CONTENT_TYPE_JSON)
            }
        }
    }

    pub fn without_body(mut self) -> Self {
        self.head_only = true;
        self
    }

    /// Status line and headers, terminated by the blank line.
    pub fn head(&self) -> String {
        let mut head = String::new();
        let _ = write!(
            head,
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body.as_bytes().len()
        );
        head
    }

    /// Bytes to send after [`Response::head`]
    pub fn body(&self) -> &[u8] {
        if self.head_only {
            &[]
        } else {
            self.body.as_bytes()
        }
    }
}

/// Answer one request from the history and the static assets.
pub fn handle<const N: usize, A: AssetStore>(
    request: &Request<'_>,
    history: &History<N>,
    assets: &A,
) -> Response {
    if request.method == Method::Other {
        warn!("Rejecting non-GET request for {}", request.path);
        return Response::empty(Status::MethodNotAllowed, CONTENT_TYPE_TEXT);
    }

    debug!("{:?} {}", request.method, request.path);

    let response = match Route::resolve(request.path) {
        Route::Latest(quantity) => Response::from_query(query::latest(history, quantity)),
        Route::Series(quantity) => Response::from_query(query::all(history, quantity)),
        Route::Asset(path) => match assets.get(path) {
            Some(asset) => Response::asset(asset),
            None => Response::empty(Status::NotFound, CONTENT_TYPE_TEXT),
        },
        Route::NotFound => Response::empty(Status::NotFound, CONTENT_TYPE_TEXT),
    };

    if request.method == Method::Head {
        response.without_body()
    } else {
        response
    }
}

/// Response for bytes that could not be parsed as a request.
pub fn bad_request(e: HttpError) -> Response {
    warn!("Bad request: {}", e);
    Response::empty(Status::BadRequest, CONTENT_TYPE_TEXT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_line() {
        let request = Request::parse(b"GET /dailytemp?fresh=1 HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "/dailytemp");

        let request = Request::parse(b"HEAD / HTTP/1.0\n").unwrap();
        assert_eq!(request.method, Method::Head);
        assert_eq!(request.path, "/");
    }

    #[test]
    fn test_parse_rejects_bad_requests() {
        assert_eq!(Request::parse(b"GET / HTTP/1.1"), Err(HttpError::Incomplete));
        assert_eq!(Request::parse(b"GET\r\n"), Err(HttpError::Malformed));
        assert_eq!(Request::parse(b"GET / FTP\r\n"), Err(HttpError::Malformed));
        assert_eq!(
            Request::parse(b"GET nope HTTP/1.1\r\n"),
            Err(HttpError::Malformed)
        );
        assert_eq!(
            Request::parse(b"GET /\xff HTTP/1.1\r\n"),
            Err(HttpError::InvalidEncoding)
        );
    }

    #[test]
    fn test_route_resolution() {
        assert_eq!(
            Route::resolve("/currenttemp"),
            Route::Latest(Quantity::Temperature)
        );
        assert_eq!(
            Route::resolve("/currenthumid"),
            Route::Latest(Quantity::Humidity)
        );
        assert_eq!(
            Route::resolve("/dailytemp"),
            Route::Series(Quantity::Temperature)
        );
        assert_eq!(
            Route::resolve("/dailyhumid"),
            Route::Series(Quantity::Humidity)
        );
        assert_eq!(Route::resolve("/"), Route::Asset("/index.html"));
        assert_eq!(Route::resolve("/img/a.png"), Route::Asset("/img/a.png"));
        assert_eq!(Route::resolve("/secret.txt"), Route::NotFound);
    }

    #[test]
    fn test_response_head() {
        let response = Response::json(String::from("[]"));
        assert_eq!(
            response.head(),
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n"
        );
        assert_eq!(response.body(), b"[]");
    }

    #[test]
    fn test_head_only_keeps_length() {
        let response = Response::json(String::from("{}")).without_body();
        assert!(response.head().contains("Content-Length: 2\r\n"));
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_empty_history_maps_to_server_error() {
        let response = Response::from_query(Err(QueryError::HistoryEmpty));
        assert_eq!(response.status, Status::InternalServerError);
        assert_eq!(response.content_type, CONTENT_TYPE_JSON);
        assert!(response.body().is_empty());
        assert!(response.head().starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }
}
