//! HTTP implementation of [`DocumentStore`].

use bytes::Bytes;
use http::{Method, Request, StatusCode, Uri, header};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::bulk::{self, BulkOperation, BulkResult};
use crate::error::{StoreError, StoreResult};
use crate::search::{SearchRequest, SearchResponse};
use crate::{DocumentStore, StoreFuture};

const USER_AGENT: &str = "flowgrid/0.1";
const CONTENT_JSON: &str = "application/json";
const CONTENT_NDJSON: &str = "application/x-ndjson";

/// Document store reached over plain HTTP.
#[derive(Clone)]
pub struct HttpDocumentStore {
    base: String,
    client: Client<HttpConnector, Full<Bytes>>,
    authorization: Option<String>,
}

impl std::fmt::Debug for HttpDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDocumentStore")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl HttpDocumentStore {
    pub fn new(base_url: &str) -> StoreResult<Self> {
        let uri: Uri = base_url.parse().map_err(|e: http::uri::InvalidUri| StoreError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if uri.scheme_str() != Some("http") || uri.host().is_none() {
            return Err(StoreError::InvalidUrl {
                url: base_url.to_string(),
                reason: "expected http://host[:port]".to_string(),
            });
        }
        let client = Client::builder(TokioExecutor::new()).build_http();
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            client,
            authorization: None,
        })
    }

    /// Send this `Authorization` header value with every request.
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<(Bytes, &'static str)>,
    ) -> StoreResult<(StatusCode, Bytes)> {
        let uri = format!("{}{path}", self.base);
        let transport = |reason: String| StoreError::Transport {
            operation,
            target: path.to_string(),
            reason,
        };

        let mut builder = Request::builder()
            .method(method)
            .uri(&uri)
            .header(header::USER_AGENT, USER_AGENT);
        if let Some(auth) = &self.authorization {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let req = match body {
            Some((bytes, content_type)) => builder
                .header(header::CONTENT_TYPE, content_type)
                .body(Full::new(bytes)),
            None => builder.body(Full::new(Bytes::new())),
        }
        .map_err(|e| transport(e.to_string()))?;

        debug!(%uri, operation, "store request");
        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| transport(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| transport(e.to_string()))?
            .to_bytes();
        Ok((status, bytes))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<(Bytes, &'static str)>,
    ) -> StoreResult<T> {
        let (status, bytes) = self.send(operation, method, path, body).await?;
        if !status.is_success() {
            return Err(status_error(operation, path, status, &bytes));
        }
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode {
            operation,
            target: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn put_json(&self, operation: &'static str, path: &str, body: &Value) -> StoreResult<()> {
        let _: Value = self
            .send_json(operation, Method::PUT, path, Some(json_body(body)?))
            .await?;
        Ok(())
    }
}

fn json_body<T: serde::Serialize>(value: &T) -> StoreResult<(Bytes, &'static str)> {
    let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Serialize(e.to_string()))?;
    Ok((Bytes::from(bytes), CONTENT_JSON))
}

fn status_error(operation: &'static str, path: &str, status: StatusCode, body: &[u8]) -> StoreError {
    StoreError::Status {
        operation,
        target: path.to_string(),
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).chars().take(512).collect(),
    }
}

impl DocumentStore for HttpDocumentStore {
    fn search<'a>(&'a self, index: &'a str, request: &'a SearchRequest) -> StoreFuture<'a, SearchResponse> {
        Box::pin(async move {
            let path = if request.pit.is_some() {
                "/_search".to_string()
            } else {
                format!(
                    "/{}/_search?ignore_unavailable=true&allow_no_indices=true",
                    urlencoding::encode(index)
                )
            };
            self.send_json("search", Method::POST, &path, Some(json_body(request)?))
                .await
        })
    }

    fn bulk<'a>(&'a self, operations: &'a [BulkOperation]) -> StoreFuture<'a, BulkResult> {
        Box::pin(async move {
            if operations.is_empty() {
                return Ok(BulkResult::default());
            }
            let body = bulk::to_ndjson(operations)?;
            self.send_json(
                "bulk",
                Method::POST,
                "/_bulk",
                Some((Bytes::from(body), CONTENT_NDJSON)),
            )
            .await
        })
    }

    fn open_point_in_time<'a>(&'a self, index: &'a str, keep_alive: &'a str) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let path = format!(
                "/{}/_pit?keep_alive={}",
                urlencoding::encode(index),
                urlencoding::encode(keep_alive)
            );
            let v: Value = self.send_json("open pit", Method::POST, &path, None).await?;
            v.get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| StoreError::Decode {
                    operation: "open pit",
                    target: path,
                    reason: "response has no id".to_string(),
                })
        })
    }

    fn close_point_in_time<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let body = json_body(&json!({"id": id}))?;
            let _: Value = self
                .send_json("close pit", Method::DELETE, "/_pit", Some(body))
                .await?;
            Ok(())
        })
    }

    fn index_exists<'a>(&'a self, name: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let path = format!("/{}", urlencoding::encode(name));
            let (status, body) = self.send("index exists", Method::HEAD, &path, None).await?;
            match status {
                StatusCode::OK => Ok(true),
                StatusCode::NOT_FOUND => Ok(false),
                other => Err(status_error("index exists", &path, other, &body)),
            }
        })
    }

    fn create_index<'a>(&'a self, name: &'a str, body: &'a Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/{}", urlencoding::encode(name));
            let (status, resp) = self
                .send("create index", Method::PUT, &path, Some(json_body(body)?))
                .await?;
            if status.is_success() {
                return Ok(());
            }
            // Another writer won the race to bootstrap.
            if status == StatusCode::BAD_REQUEST
                && String::from_utf8_lossy(&resp).contains("resource_already_exists_exception")
            {
                debug!(%path, "index already exists");
                return Ok(());
            }
            Err(status_error("create index", &path, status, &resp))
        })
    }

    fn put_index_template<'a>(&'a self, name: &'a str, body: &'a Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/_index_template/{}", urlencoding::encode(name));
            self.put_json("put template", &path, body).await
        })
    }

    fn put_lifecycle_policy<'a>(&'a self, name: &'a str, body: &'a Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/_ilm/policy/{}", urlencoding::encode(name));
            self.put_json("put lifecycle policy", &path, body).await
        })
    }
}
