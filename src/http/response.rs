//! Response model.
//!
//! Handlers describe their output as a [`MockResponse`] and the dispatcher
//! turns it into transport output with [`flush`]. Handlers that build the
//! transport response themselves return [`Reply::Handled`] instead and the
//! dispatcher passes it through untouched.

use std::path::{Component, Path, PathBuf};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::HandlerError;
use crate::http::xml;

/// What a handler hands back to the dispatcher.
#[derive(Debug)]
pub enum Reply {
    /// Described output; the dispatcher sets status and headers and writes
    /// the body according to its kind.
    Mock(MockResponse),
    /// Output already produced by the handler.
    Handled(Response),
}

impl Reply {
    pub fn handled(response: impl IntoResponse) -> Self {
        Reply::Handled(response.into_response())
    }
}

impl From<MockResponse> for Reply {
    fn from(response: MockResponse) -> Self {
        Reply::Mock(response)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Handled(response)
    }
}

/// Body kinds of a [`MockResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Generic(Bytes),
    Json(Value),
    XmlFromJson { root: String, content: Value },
    /// Path relative to the configured files directory.
    File(PathBuf),
}

/// Scripted response: status (default 200), headers (default none) and body.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl MockResponse {
    fn with_body(body: ResponseBody) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn generic(body: impl Into<Bytes>) -> Self {
        Self::with_body(ResponseBody::Generic(body.into()))
    }

    pub fn json(content: Value) -> Self {
        Self::with_body(ResponseBody::Json(content))
    }

    /// Serialize `content` up front; fails for values JSON cannot represent.
    pub fn try_json<T: Serialize>(content: &T) -> Result<Self, HandlerError> {
        Ok(Self::json(serde_json::to_value(content)?))
    }

    /// XML rendered from `content` under a `<root>` element.
    pub fn xml_from_json(content: Value) -> Self {
        Self::xml_from_json_as("root", content)
    }

    pub fn xml_from_json_as(root: impl Into<String>, content: Value) -> Self {
        Self::with_body(ResponseBody::XmlFromJson {
            root: root.into(),
            content,
        })
    }

    pub fn file(filename: impl Into<PathBuf>) -> Self {
        Self::with_body(ResponseBody::File(filename.into()))
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a header. Names or values that are not valid HTTP are dropped
    /// with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Ignoring invalid response header"),
        }
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }
}

/// Write `response` to the transport. `File` bodies are resolved against
/// `files_root`.
pub async fn flush(response: MockResponse, files_root: &Path) -> Response {
    let MockResponse { status, headers, body } = response;

    let mut forced_content_type = None;
    let mut out = match body {
        ResponseBody::Generic(bytes) => {
            let mut out = Response::new(Body::from(bytes));
            out.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            out
        }
        ResponseBody::Json(content) => Json(content).into_response(),
        ResponseBody::XmlFromJson { root, content } => {
            forced_content_type = Some(HeaderValue::from_static("text/xml"));
            Response::new(Body::from(xml::render(&root, &content)))
        }
        ResponseBody::File(filename) => match send_file(files_root, &filename).await {
            Ok(out) => out,
            // Missing or refused files keep their 404 instead of the scripted status.
            Err(out) => return out,
        },
    };

    *out.status_mut() = status;
    out.headers_mut().extend(headers);
    if let Some(content_type) = forced_content_type {
        out.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }

    out
}

async fn send_file(root: &Path, filename: &Path) -> Result<Response, Response> {
    let relative: PathBuf = filename
        .components()
        .filter(|c| !matches!(c, Component::RootDir))
        .collect();

    if relative.as_os_str().is_empty()
        || relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        tracing::warn!(file = %filename.display(), "Refusing file outside the public directory");
        return Err(StatusCode::NOT_FOUND.into_response());
    }

    let path = root.join(relative);
    let served = match ServeFile::new(&path).oneshot(Request::new(Body::empty())).await {
        Ok(res) => res.map(Body::new),
        Err(never) => match never {},
    };

    if served.status().is_success() {
        Ok(served)
    } else {
        tracing::warn!(file = %path.display(), status = %served.status(), "File response not served");
        Err(served)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn read(res: Response) -> (StatusCode, HeaderMap, String) {
        let (parts, body) = res.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        (parts.status, parts.headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn defaults_are_ok_and_empty() {
        let res = MockResponse::json(json!({"a": 1}));
        assert_eq!(res.status_code(), StatusCode::OK);
        assert!(res.headers().is_empty());
        assert_eq!(res.body(), &ResponseBody::Json(json!({"a": 1})));
    }

    #[tokio::test]
    async fn flush_json() {
        let out = flush(MockResponse::json(json!({"a": 1})), Path::new(".")).await;
        let (status, headers, body) = read(out).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(body, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn flush_applies_status_and_headers() {
        let response = MockResponse::generic("gone")
            .status(StatusCode::GONE)
            .header("x-mock", "yes")
            .header("bad header", "ignored");
        let (status, headers, body) = read(flush(response, Path::new(".")).await).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(headers["x-mock"], "yes");
        assert_eq!(headers.len(), 2);
        assert_eq!(body, "gone");
    }

    #[tokio::test]
    async fn flush_xml_forces_content_type() {
        let response = MockResponse::xml_from_json_as("tweet", json!({"text": "hi"}))
            .header("content-type", "application/json");
        let (_, headers, body) = read(flush(response, Path::new(".")).await).await;
        assert_eq!(headers[header::CONTENT_TYPE], "text/xml");
        assert!(body.ends_with("<tweet><text>hi</text></tweet>"));
    }

    #[tokio::test]
    async fn flush_file_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), r#"{"from":"disk"}"#).unwrap();

        let response = MockResponse::file("/data.json").status(StatusCode::ACCEPTED);
        let (status, _, body) = read(flush(response, dir.path()).await).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, r#"{"from":"disk"}"#);

        let missing = MockResponse::file("nope.json").status(StatusCode::ACCEPTED);
        let (status, _, _) = read(flush(missing, dir.path()).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn flush_file_refuses_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let response = MockResponse::file("../etc/passwd");
        let (status, _, _) = read(flush(response, dir.path()).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
