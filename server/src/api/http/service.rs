use crate::config::{Selection, SelectionMode};
use crate::errors::GatewayError;
use crate::extractor::MetadataExtractor;
use crate::model::{FormatDescriptor, FormatSelector, InfoResponse};
use crate::relay::{Relay, ResponseBody};
use crate::resolver;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{header, HeaderMap, Method, Request, Response, StatusCode, Uri};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, warn};

lazy_static! {
    // The recognized video URL shapes, with an 11-character video id.
    static ref VIDEO_URL: Regex = Regex::new(
        r"^https?://(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|v/)|youtu\.be/)[A-Za-z0-9_-]{11}(?:[?&#/].*)?$"
    )
    .unwrap();
}

#[derive(Debug, Deserialize)]
struct InfoRequest {
    url: String,
}

#[derive(Clone)]
pub struct GatewayService {
    extractor: Arc<dyn MetadataExtractor>,
    relay: Arc<Relay>,
    selection: Selection,
    allowed_origins: Arc<Vec<String>>,
}

impl GatewayService {
    pub fn new(
        extractor: Arc<dyn MetadataExtractor>,
        relay: Arc<Relay>,
        selection: Selection,
        allowed_origins: Vec<String>,
    ) -> Self {
        Self {
            extractor,
            relay,
            selection,
            allowed_origins: Arc::new(allowed_origins),
        }
    }

    async fn handle(&self, req: Request<Incoming>) -> Result<Response<ResponseBody>, Infallible> {
        let origin = allow_origin(&self.allowed_origins, req.headers());
        let path = req.uri().path().to_string();

        let result = match (req.method().clone(), path.as_str()) {
            (Method::OPTIONS, "/api/info") | (Method::OPTIONS, "/api/download") => {
                Ok(preflight_response())
            }
            (Method::POST, "/api/info") => self.info(req).await,
            (Method::GET, "/api/download") => self.download(req).await,
            (method, "/api/info") | (method, "/api/download") => {
                warn!("{} {}: method not allowed", method, path);
                Ok(json_error(
                    StatusCode::METHOD_NOT_ALLOWED,
                    "method not allowed",
                ))
            }
            _ => Ok(json_error(StatusCode::NOT_FOUND, "no such endpoint")),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if e.status() == StatusCode::INTERNAL_SERVER_ERROR {
                    error!("{}: {}", path, e);
                } else {
                    warn!("{}: {}", path, e);
                }
                json_error(e.status(), &e.to_string())
            }
        };

        Ok(with_cors(response, origin))
    }

    async fn info(&self, req: Request<Incoming>) -> Result<Response<ResponseBody>, GatewayError> {
        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| GatewayError::InvalidInput(format!("read body: {}", e)))?
            .to_bytes();

        let request: InfoRequest = serde_json::from_slice(&body).map_err(|_| {
            GatewayError::InvalidInput("expected a JSON body with a url field".to_string())
        })?;

        let info = info_pipeline(self.extractor.as_ref(), &self.selection, &request.url).await?;
        json_response(StatusCode::OK, &info)
    }

    async fn download(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<ResponseBody>, GatewayError> {
        let params = query_params(req.uri());
        let url = params
            .get("url")
            .ok_or_else(|| GatewayError::InvalidInput("missing url parameter".to_string()))?;
        validate_video_url(url)?;

        let selector = selector_from_query(&params);
        let meta = self.extractor.fetch(url).await?;
        let variant = resolver::resolve(&meta.variants, &selector)?;

        self.relay.stream(variant, &meta.title).await
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { this.handle(req).await })
    }
}

/// Validate, fetch, and shape the `/api/info` answer for the configured
/// selection mode.
pub async fn info_pipeline(
    extractor: &dyn MetadataExtractor,
    selection: &Selection,
    url: &str,
) -> Result<InfoResponse, GatewayError> {
    validate_video_url(url)?;
    let meta = extractor.fetch(url).await?;

    match selection.mode {
        SelectionMode::Catalogue => {
            let formats: Vec<FormatDescriptor> = meta
                .variants
                .iter()
                .filter(|v| v.is_progressive())
                .map(FormatDescriptor::from)
                .collect();

            // Metadata without a single usable variant is a miss, not an
            // empty success.
            if formats.is_empty() {
                return Err(GatewayError::NotFound(
                    "no downloadable formats".to_string(),
                ));
            }

            Ok(InfoResponse::Catalogue {
                title: meta.title,
                duration: meta.duration_secs,
                thumbnail: meta.thumbnail,
                formats,
            })
        }
        SelectionMode::Single => {
            let selector = FormatSelector::Filtered {
                quality: selection.quality.clone(),
                container: selection.container.clone(),
            };
            let format = FormatDescriptor::from(resolver::resolve(&meta.variants, &selector)?);

            Ok(InfoResponse::Single {
                title: meta.title,
                duration: meta.duration_secs,
                thumbnail: meta.thumbnail,
                format,
            })
        }
    }
}

fn validate_video_url(url: &str) -> Result<(), GatewayError> {
    if VIDEO_URL.is_match(url) {
        Ok(())
    } else {
        Err(GatewayError::InvalidInput(format!(
            "not a recognized video URL: {}",
            url
        )))
    }
}

fn query_params(uri: &Uri) -> HashMap<String, String> {
    url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .into_owned()
        .collect()
}

/// itag wins over quality; "highest" (or no quality at all) means the best
/// audio+video variant; any other quality is an exact filtered match.
fn selector_from_query(params: &HashMap<String, String>) -> FormatSelector {
    if let Some(itag) = params.get("itag") {
        return FormatSelector::Itag(itag.clone());
    }

    match params.get("quality").map(String::as_str) {
        None | Some("highest") | Some("best") => FormatSelector::Highest,
        Some(quality) => FormatSelector::Filtered {
            quality: quality.to_string(),
            container: params
                .get("container")
                .cloned()
                .unwrap_or_else(|| "mp4".to_string()),
        },
    }
}

fn allow_origin(allowed: &[String], headers: &HeaderMap) -> Option<String> {
    if allowed.iter().any(|o| o == "*") {
        return Some("*".to_string());
    }

    let origin = headers.get(header::ORIGIN)?.to_str().ok()?;
    allowed.iter().find(|o| o.as_str() == origin).cloned()
}

fn with_cors(
    mut response: Response<ResponseBody>,
    origin: Option<String>,
) -> Response<ResponseBody> {
    if let Some(origin) = origin {
        if let Ok(value) = header::HeaderValue::from_str(&origin) {
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
    }
    response
}

fn preflight_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
        .body(empty_body())
        .unwrap()
}

fn json_response<T: serde::Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<Response<ResponseBody>, GatewayError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| GatewayError::upstream(format!("serialize response: {}", e)))?;

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full_body(Bytes::from(body)))
        .map_err(|e| GatewayError::upstream(format!("build response: {}", e)))
}

fn json_error(status: StatusCode, message: &str) -> Response<ResponseBody> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full_body(Bytes::from(body)))
        .unwrap()
}

fn full_body(bytes: Bytes) -> ResponseBody {
    Full::new(bytes)
        .map_err(|never| match never {})
        .boxed_unsync()
}

fn empty_body() -> ResponseBody {
    full_body(Bytes::new())
}
