use crate::config::Upstream;
use crate::errors::GatewayError;
use crate::model::{sanitize_filename, StreamVariant};
use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::{header, Response, StatusCode};
use std::io;
use std::time::Duration;
use tracing::debug;

pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Relays a chosen variant's bytes from its access locator to the client.
pub struct Relay {
    client: reqwest::Client,
}

impl Relay {
    pub fn new(upstream: &Upstream) -> Result<Self, GatewayError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(cookie) = &upstream.cookie {
            let value = reqwest::header::HeaderValue::from_str(cookie)
                .map_err(|e| GatewayError::ConfigError(format!("invalid cookie: {}", e)))?;
            headers.insert(reqwest::header::COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(upstream.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(upstream.timeout_secs))
            .build()
            .map_err(|e| GatewayError::ConfigError(format!("http client: {}", e)))?;

        Ok(Self { client })
    }

    /// Opens the upstream stream and builds a download response over it.
    /// Bytes are relayed frame by frame; the payload is never buffered.
    /// Upstream refusal before the first byte becomes an error response;
    /// a failure mid-stream surfaces as a body error, which aborts the
    /// connection instead of ending the response as if it were complete.
    pub async fn stream(
        &self,
        variant: &StreamVariant,
        title: &str,
    ) -> Result<Response<ResponseBody>, GatewayError> {
        let upstream = self
            .client
            .get(&variant.url)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(format!("open stream: {}", e)))?;

        let status = upstream.status();
        if !status.is_success() {
            // Most likely an expired access locator.
            return Err(GatewayError::upstream(format!(
                "upstream answered {} for itag {}",
                status, variant.itag
            )));
        }

        let filename = download_filename(title, &variant.container);
        debug!("relay: itag {} as \"{}\"", variant.itag, filename);

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, variant.content_type())
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            );
        // Only the exact size may frame the response. An approximate size
        // would make the declared length disagree with the relayed bytes.
        if let Some(len) = variant.byte_length {
            response = response.header(header::CONTENT_LENGTH, len);
        }

        let stream = upstream
            .bytes_stream()
            .map_ok(Frame::data)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let body = StreamBody::new(stream).boxed_unsync();

        response
            .body(body)
            .map_err(|e| GatewayError::upstream(format!("build response: {}", e)))
    }
}

fn download_filename(title: &str, container: &str) -> String {
    format!("{}.{}", sanitize_filename(title), container)
}
