//! Request context handed to route handlers.
//!
//! The body is read up front. Requests declaring a JSON content type have it
//! parsed before the handler runs; malformed JSON is rejected with 400 and
//! the handler never sees it.

use std::collections::HashMap;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, RawPathParams},
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HandlerError;
use crate::pubsub::PubSubLayer;

/// Upper bound for buffered request bodies; larger ones are answered with 413.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Everything a route handler gets about the request it answers.
#[derive(Debug, Clone)]
pub struct HttpContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Bytes,
    json: Option<Value>,
    pubsub: PubSubLayer,
}

impl HttpContext {
    pub(crate) async fn from_request(
        params: RawPathParams,
        request: Request<Body>,
        pubsub: PubSubLayer,
    ) -> Result<Self, HandlerError> {
        let params = params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        // The body limit travels in the request extensions.
        let (mut parts, body) = request.into_parts();
        let mut buffered = Request::new(body);
        *buffered.extensions_mut() = std::mem::take(&mut parts.extensions);
        let body = Bytes::from_request(buffered, &()).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                HandlerError::PayloadTooLarge(MAX_BODY_BYTES)
            } else {
                HandlerError::BadRequest(format!("unreadable body: {}", rejection.body_text()))
            }
        })?;

        let json = if is_json(&parts.headers) && !body.is_empty() {
            let value = serde_json::from_slice(&body)
                .map_err(|e| HandlerError::BadRequest(format!("invalid JSON body: {e}")))?;
            Some(value)
        } else {
            None
        };

        let query = parts
            .uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            params,
            query,
            body,
            json,
            pubsub,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// A path parameter declared as `:name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Result<&str, HandlerError> {
        std::str::from_utf8(&self.body).map_err(|e| HandlerError::BadRequest(e.to_string()))
    }

    /// The parsed body when the request declared a JSON content type.
    pub fn json_body(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    /// Deserialize the body as `T`, whatever its declared content type.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let parsed = match &self.json {
            Some(value) => serde_json::from_value(value.clone()),
            None => serde_json::from_slice(&self.body),
        };
        parsed.map_err(|e| HandlerError::BadRequest(format!("unexpected body: {e}")))
    }

    /// The application's pub/sub layer, for pushing events to sockets.
    pub fn pubsub(&self) -> &PubSubLayer {
        &self.pubsub
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}
