//! HTTP response builders.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::handler::Page;
use crate::permission::Right;

/// Response body type used throughout taskgate.
pub type Body = Full<Bytes>;

/// Full response type used throughout taskgate.
pub type HttpResponse = Response<Body>;

/// Header carrying the number of pages of a listing.
pub const TOTAL_PAGES: &str = "x-pagination-total-pages";
/// Header carrying the number of items on this page.
pub const RESULT_COUNT: &str = "x-pagination-result-count";
/// Header carrying the caller's right on a single entity.
pub const MAX_RIGHT: &str = "x-max-right";

/// Build a JSON response with the given status code and body.
pub fn json<T: Serialize>(status: StatusCode, body: &T) -> crate::Result<HttpResponse> {
    let json = serde_json::to_string(body)?;
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

/// Build a 200 OK JSON response.
pub fn ok<T: Serialize>(body: &T) -> crate::Result<HttpResponse> {
    json(StatusCode::OK, body)
}

/// Build a 201 Created JSON response.
pub fn created<T: Serialize>(body: &T) -> crate::Result<HttpResponse> {
    json(StatusCode::CREATED, body)
}

/// Build a 204 No Content response.
pub fn no_content() -> crate::Result<HttpResponse> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    Ok(response)
}

/// A single entity with the caller's right in [`MAX_RIGHT`].
pub fn entity<T: Serialize>(body: &T, right: Right) -> crate::Result<HttpResponse> {
    let mut response = ok(body)?;
    response.headers_mut().insert(
        HeaderName::from_static(MAX_RIGHT),
        HeaderValue::from_static(right.as_str()),
    );
    Ok(response)
}

/// A page of items with the pagination metadata in headers.
pub fn paginated<T: Serialize>(page: &Page<T>) -> crate::Result<HttpResponse> {
    let mut response = ok(&page.items)?;
    let headers = response.headers_mut();
    headers.insert(HeaderName::from_static(TOTAL_PAGES), HeaderValue::from(page.total_pages));
    headers.insert(
        HeaderName::from_static(RESULT_COUNT),
        HeaderValue::from(page.result_count),
    );
    headers.insert(
        hyper::header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("x-pagination-total-pages, x-pagination-result-count, x-max-right"),
    );
    Ok(response)
}
