//! End-to-end tests for the RustMWS request engine.
//!
//! Offline scenarios run against the mock harness; transport scenarios run
//! against an in-process HTTP server that verifies every signature it
//! receives, so no network access or real seller account is needed.
//!
//! ```text
//! cargo test -p rustmws-integration
//! ```

use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use rustmws_auth::SignatureAlgorithm;
use rustmws_core::{EngineConfig, StoreConfig, keys};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Secret key of the `us` test store.
pub const US_SECRET: &str = "SEC1";

/// Fixed clock: `Timestamp` becomes `2024-01-01T00:00:00Z`.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// The `us` store, optionally pointed at a custom endpoint.
#[must_use]
pub fn us_store(endpoint: Option<String>) -> StoreConfig {
    StoreConfig {
        name: "us".to_owned(),
        merchant_id: "M1".to_owned(),
        access_key_id: "AK1".to_owned(),
        secret_key: US_SECRET.to_owned(),
        marketplace_id: "ATVPDKIKX0DER".to_owned(),
        endpoint,
        auth_token: None,
    }
}

/// Engine configuration with the `us` store.
#[must_use]
pub fn test_config(algorithm: &str) -> EngineConfig {
    init_tracing();
    EngineConfig::builder()
        .stores(vec![us_store(None)])
        .signature_algorithm(algorithm)
        .application_name("rustmws-it")
        .application_version("1.0")
        .build()
}

/// A `ListOrders`-shaped page.
#[must_use]
pub fn orders_page(ids: &[&str], token: Option<&str>) -> String {
    let orders: String = ids
        .iter()
        .map(|id| format!("<Order><AmazonOrderId>{id}</AmazonOrderId></Order>"))
        .collect();
    let token = token
        .map(|t| format!("<NextToken>{t}</NextToken>"))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0"?>
<ListOrdersResponse xmlns="https://mws.amazonservices.com/Orders/2013-09-01">
  <ListOrdersResult>{token}<Orders>{orders}</Orders></ListOrdersResult>
  <ResponseMetadata><RequestId>it-request</RequestId></ResponseMetadata>
</ListOrdersResponse>"#
    )
}

/// An `ErrorResponse` body.
#[must_use]
pub fn error_body(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<ErrorResponse xmlns="https://mws.amazonservices.com/Orders/2013-09-01">
  <Error><Type>Sender</Type><Code>{code}</Code><Message>{message}</Message></Error>
  <RequestId>it-error</RequestId>
</ErrorResponse>"#
    )
}

/// Response the test server answers with.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    /// HTTP status.
    pub status: u16,
    /// Extra response headers.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: String,
    /// Delay before answering.
    pub delay: Option<Duration>,
}

impl CannedResponse {
    /// 200 with `body`.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
            delay: None,
        }
    }

    /// Custom status with `body`.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            ..Self::ok(body)
        }
    }

    /// Add a response header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Answer only after `delay`.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// `Host` header.
    pub host: Option<String>,
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// `User-Agent` header.
    pub user_agent: Option<String>,
    /// Raw form body.
    pub body: String,
    /// Decoded form fields, in wire order.
    pub form: Vec<(String, String)>,
    /// Whether the signature verified against the store secret.
    pub signature_valid: bool,
}

impl RecordedRequest {
    /// Decoded value of a form field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct ServerState {
    secret: String,
    responses: Mutex<VecDeque<CannedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ServerState {
    fn next_response(&self) -> CannedResponse {
        let mut responses = self.responses.lock();
        if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        }
        .unwrap_or_else(|| CannedResponse::status(500, "no canned response"))
    }
}

/// In-process HTTP server that records and verifies signed calls.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Start a server answering with `responses` (the last one is sticky).
    pub async fn start(responses: Vec<CannedResponse>) -> anyhow::Result<Self> {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(ServerState {
            secret: US_SECRET.to_owned(),
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        });
        let shutdown = CancellationToken::new();

        tokio::spawn(serve(listener, Arc::clone(&state), shutdown.clone()));

        Ok(Self {
            addr,
            state,
            shutdown,
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:49152`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn serve(listener: TcpListener, state: Arc<ServerState>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let Ok((stream, _)) = accepted else {
                    continue;
                };
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let svc = service_fn(move |req| handle(req, Arc::clone(&state)));
                    if let Err(e) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        tracing::debug!(error = %e, "test server connection error");
                    }
                });
            }
            () = shutdown.cancelled() => break,
        }
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();
    let body = String::from_utf8_lossy(&body).into_owned();

    let header = |name: http::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    let host = header(http::header::HOST);
    let form = decode_form(&body);
    let path = parts.uri.path().to_owned();
    let signature_valid = verify_form(&form, host.as_deref().unwrap_or_default(), &path, &state.secret);

    state.requests.lock().push(RecordedRequest {
        method: parts.method.to_string(),
        path,
        host,
        content_type: header(http::header::CONTENT_TYPE),
        user_agent: header(http::header::USER_AGENT),
        body,
        form,
        signature_valid,
    });

    let canned = if signature_valid {
        state.next_response()
    } else {
        CannedResponse::status(
            403,
            error_body(
                "SignatureDoesNotMatch",
                "The request signature we calculated does not match the signature you provided.",
            ),
        )
    };

    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }

    let mut response = Response::new(Full::new(Bytes::from(canned.body)));
    *response.status_mut() =
        http::StatusCode::from_u16(canned.status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in &canned.headers {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    Ok(response)
}

fn decode_form(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (
                percent_decode_str(k).decode_utf8_lossy().into_owned(),
                percent_decode_str(v).decode_utf8_lossy().into_owned(),
            )
        })
        .collect()
}

fn verify_form(form: &[(String, String)], host: &str, path: &str, secret: &str) -> bool {
    let field = |key: &str| form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
    let (Some(signature), Some(method)) = (field(keys::SIGNATURE), field(keys::SIGNATURE_METHOD))
    else {
        return false;
    };
    let Ok(algorithm) = method.parse::<SignatureAlgorithm>() else {
        return false;
    };

    let params = form
        .iter()
        .filter(|(k, _)| k != keys::SIGNATURE)
        .map(|(k, v)| (k.as_str(), v.as_str()));
    rustmws_auth::verify("POST", host, path, params, secret, algorithm, signature).unwrap_or(false)
}

/// A local URL nothing listens on.
pub async fn closed_endpoint() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

mod test_config;
mod test_signing;
mod test_transport;
