//! HTTP request handlers for the docsign server

use crate::error::{json_response, ApiError};
use bytes::Bytes;
use docsign_core::{DocSignError, DocumentSummary, User};
use docsign_engine::{parse_document_id, DocSignServices};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info};

/// Cap for JSON request bodies
const MAX_JSON_BODY: usize = 64 * 1024;
/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Process-wide state shared by every request
pub struct AppState {
    pub services: DocSignServices,
    pub max_upload_bytes: u64,
}

#[derive(Deserialize)]
struct CredentialsBody {
    email: String,
    password: String,
}

/// Main request handler
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("Handling {} {}", method, path);

    let result = route(req, &state, &method, &path).await;

    let response = match result {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    info!("{} {} -> {}", method, path, response.status());
    Ok(response)
}

async fn route<B>(
    req: Request<B>,
    state: &Arc<AppState>,
    method: &Method,
    path: &str,
) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match (method, path) {
        (&Method::GET, "/health") => handle_health(),
        (&Method::POST, "/register") => handle_register(req, state).await,
        (&Method::POST, "/login") => handle_login(req, state).await,
        (&Method::POST, "/upload") => handle_upload(req, state).await,
        (&Method::GET, "/documents") => handle_list(req, state).await,
        (&Method::GET, "/me") => handle_me(req, state).await,
        (&Method::POST, p) if p.starts_with("/sign/") => {
            let id = &p["/sign/".len()..];
            handle_sign(req, state, id).await
        }
        (&Method::GET, p) if p.starts_with("/download/") => {
            let id = &p["/download/".len()..];
            handle_download(req, state, id).await
        }
        (_, "/health" | "/register" | "/login" | "/upload" | "/documents" | "/me") => {
            Err(ApiError::MethodNotAllowed)
        }
        (_, p) if p.starts_with("/sign/") || p.starts_with("/download/") => {
            Err(ApiError::MethodNotAllowed)
        }
        _ => Err(ApiError::RouteNotFound),
    }
}

/// Health check handler
fn handle_health() -> Result<Response<Full<Bytes>>, ApiError> {
    Ok(json_response(
        StatusCode::OK,
        json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "service": "docsign"
        })
        .to_string(),
    ))
}

async fn handle_register<B>(req: Request<B>, state: &Arc<AppState>) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body: CredentialsBody = read_json(req).await?;

    let services = state.services.clone();
    let id = blocking(move || services.credentials.register(&body.email, &body.password)).await?;

    Ok(json_response(
        StatusCode::OK,
        json!({ "message": "User created", "id": id }).to_string(),
    ))
}

async fn handle_login<B>(req: Request<B>, state: &Arc<AppState>) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body: CredentialsBody = read_json(req).await?;

    let services = state.services.clone();
    let (_user, token) = blocking(move || services.login(&body.email, &body.password)).await?;

    Ok(json_response(
        StatusCode::OK,
        json!({
            "access_token": token.access_token,
            "token_type": "bearer",
            "expires_at": token.expires_at.to_rfc3339(),
        })
        .to_string(),
    ))
}

async fn handle_upload<B>(req: Request<B>, state: &Arc<AppState>) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let user = authenticate(&req, state).await?;

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let query_filename = query_param(&req, "filename");

    let file_limit = usize::try_from(state.max_upload_bytes).unwrap_or(usize::MAX);
    let body = read_body(req, file_limit.saturating_add(MULTIPART_OVERHEAD)).await?;

    let (filename, data) = match content_type.as_deref().map(multer::parse_boundary) {
        Some(Ok(boundary)) => read_file_field(body, boundary).await?,
        _ => {
            let filename = query_filename.ok_or_else(|| {
                ApiError::BadRequest(
                    "expected multipart/form-data with a 'file' field, or a 'filename' query parameter"
                        .to_string(),
                )
            })?;
            (filename, body)
        }
    };

    let services = state.services.clone();
    let id = blocking(move || services.registry.upload(&user.id, &filename, data.as_ref())).await?;

    Ok(json_response(
        StatusCode::OK,
        json!({ "msg": "Uploaded", "id": id }).to_string(),
    ))
}

async fn handle_list<B>(req: Request<B>, state: &Arc<AppState>) -> Result<Response<Full<Bytes>>, ApiError> {
    let user = authenticate(&req, state).await?;

    let services = state.services.clone();
    let docs = blocking(move || services.registry.list_for(&user.id)).await?;
    let summaries: Vec<DocumentSummary> = docs.iter().map(DocumentSummary::from).collect();

    let body = serde_json::to_string(&summaries).map_err(DocSignError::from)?;
    Ok(json_response(StatusCode::OK, body))
}

async fn handle_me<B>(req: Request<B>, state: &Arc<AppState>) -> Result<Response<Full<Bytes>>, ApiError> {
    let user = authenticate(&req, state).await?;

    Ok(json_response(
        StatusCode::OK,
        json!({ "id": user.id, "email": user.email.as_str() }).to_string(),
    ))
}

async fn handle_sign<B>(
    req: Request<B>,
    state: &Arc<AppState>,
    raw_id: &str,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let user = authenticate(&req, state).await?;
    let id = parse_document_id(raw_id)?;

    let services = state.services.clone();
    let doc = blocking(move || services.signer.sign(&user.id, &id)).await?;

    Ok(json_response(
        StatusCode::OK,
        json!({ "message": "Signed", "id": doc.id, "status": doc.status }).to_string(),
    ))
}

async fn handle_download<B>(
    req: Request<B>,
    state: &Arc<AppState>,
    raw_id: &str,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let user = authenticate(&req, state).await?;
    let id = parse_document_id(raw_id)?;

    let services = state.services.clone();
    let artifact = blocking(move || services.registry.download(&user.id, &id)).await?;

    let mut response = Response::new(Full::new(Bytes::from(artifact.bytes)));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(artifact.content_type));
    headers.insert(
        CONTENT_DISPOSITION,
        content_disposition(artifact.filename.as_str()),
    );
    Ok(response)
}

/// Resolve the principal for a protected route
async fn authenticate<B>(req: &Request<B>, state: &Arc<AppState>) -> Result<User, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let services = state.services.clone();
    blocking(move || services.guard.resolve(header.as_deref())).await
}

/// Run an engine call on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> docsign_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn read_body<B>(req: Request<B>, limit: usize) -> Result<Bytes, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ApiError::BodyTooLarge),
        Err(e) => Err(ApiError::BadRequest(format!("failed to read body: {}", e))),
    }
}

async fn read_json<T, B>(req: Request<B>) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = read_body(req, MAX_JSON_BODY).await?;
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))
}

/// Pull the `file` field out of a multipart body
async fn read_file_field(body: Bytes, boundary: String) -> Result<(String, Bytes), ApiError> {
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        return Ok((filename, data));
    }

    Err(ApiError::BadRequest("missing 'file' field".to_string()))
}

fn query_param<B>(req: &Request<B>, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name
fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::new();
    for byte in filename.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }

    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
