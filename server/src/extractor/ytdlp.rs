use crate::config::Upstream;
use crate::extractor::{classify_stderr, ExtractError, MetadataExtractor};
use crate::model::{StreamVariant, VideoMetadata};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Production extractor: shells out to the yt-dlp binary and parses its
/// JSON dump. yt-dlp owns all knowledge of the platform's internals.
pub struct YtDlpExtractor {
    path: String,
    user_agent: String,
    cookie: Option<String>,
    timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(upstream: &Upstream) -> Self {
        let path = upstream
            .ytdlp_path
            .clone()
            .unwrap_or_else(Self::find_ytdlp);
        Self {
            path,
            user_agent: upstream.user_agent.clone(),
            cookie: upstream.cookie.clone(),
            timeout: Duration::from_secs(upstream.timeout_secs),
        }
    }

    /// Probe common install locations, then fall back to PATH lookup.
    fn find_ytdlp() -> String {
        let candidates = [
            "/usr/local/bin/yt-dlp",
            "/usr/bin/yt-dlp",
            "/opt/homebrew/bin/yt-dlp",
        ];

        for path in candidates {
            if Path::new(path).exists() {
                return path.to_string();
            }
        }

        "yt-dlp".to_string()
    }

    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-json",
            "--no-playlist",
            "--no-warnings",
            // No state may survive the request.
            "--no-cache-dir",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.push("--socket-timeout".to_string());
        args.push(self.timeout.as_secs().to_string());
        args.push("--user-agent".to_string());
        args.push(self.user_agent.clone());

        if let Some(cookie) = &self.cookie {
            args.push("--add-header".to_string());
            args.push(format!("Cookie: {}", cookie));
        }

        args.push(url.to_string());
        args
    }

    fn parse_dump(stdout: &[u8]) -> Result<VideoMetadata, ExtractError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| ExtractError::Parse(format!("invalid JSON: {}", e)))?;

        let formats = json["formats"]
            .as_array()
            .ok_or_else(|| ExtractError::Parse("no formats array".to_string()))?;

        let mut variants = Vec::new();
        for f in formats {
            // Manifest-only and DRM entries carry no direct URL; they cannot
            // be relayed, so they never enter the catalogue.
            let url = match f["url"].as_str() {
                Some(u) => u.to_string(),
                None => continue,
            };

            let vcodec = f["vcodec"].as_str().unwrap_or("none");
            let acodec = f["acodec"].as_str().unwrap_or("none");
            let has_video = !vcodec.is_empty() && vcodec != "none";
            let has_audio = !acodec.is_empty() && acodec != "none";

            let quality = match f["height"].as_u64() {
                Some(h) => format!("{}p", h),
                None => f["format_note"].as_str().unwrap_or("unknown").to_string(),
            };

            variants.push(StreamVariant {
                itag: f["format_id"].as_str().unwrap_or("").to_string(),
                quality,
                container: f["ext"].as_str().unwrap_or("").to_string(),
                mime_type: None,
                has_audio,
                has_video,
                byte_length: f["filesize"].as_u64(),
                approx_byte_length: f["filesize_approx"].as_u64(),
                bitrate: f["tbr"].as_f64().map(|t| t as f32),
                url,
            });
        }

        Ok(VideoMetadata {
            id: json["id"].as_str().unwrap_or("unknown").to_string(),
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            duration_secs: json["duration"].as_f64().map(|d| d as u64),
            thumbnail: json["thumbnail"].as_str().map(|s| s.to_string()),
            variants,
        })
    }
}

#[async_trait]
impl MetadataExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch(&self, url: &str) -> Result<VideoMetadata, ExtractError> {
        let args = self.build_args(url);
        debug!("extractor: {} {}", self.path, args.join(" "));

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.path)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ExtractError::Timeout)?
        .map_err(|e| ExtractError::Tool(format!("{}: {}", self.path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("extractor failed for {}: {}", url, stderr.trim());
            return Err(classify_stderr(&stderr));
        }

        Self::parse_dump(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Test Video",
        "duration": 212.5,
        "thumbnail": "https://i.ytimg.invalid/vi/dQw4w9WgXcQ/hq720.jpg",
        "formats": [
            {
                "format_id": "sb0",
                "ext": "mhtml",
                "vcodec": "none",
                "acodec": "none"
            },
            {
                "format_id": "140",
                "ext": "m4a",
                "vcodec": "none",
                "acodec": "mp4a.40.2",
                "filesize": 3400000,
                "tbr": 129.5,
                "format_note": "medium",
                "url": "https://rr1.invalid/audio"
            },
            {
                "format_id": "22",
                "ext": "mp4",
                "vcodec": "avc1.64001F",
                "acodec": "mp4a.40.2",
                "height": 720,
                "filesize_approx": 52000000,
                "tbr": 1200.0,
                "url": "https://rr1.invalid/720"
            }
        ]
    }"#;

    fn upstream() -> Upstream {
        Upstream {
            user_agent: "test-agent".to_string(),
            cookie: None,
            timeout_secs: 30,
            ytdlp_path: Some("yt-dlp".to_string()),
        }
    }

    #[test]
    fn parse_dump_extracts_metadata() {
        let meta = YtDlpExtractor::parse_dump(DUMP.as_bytes()).unwrap();
        assert_eq!(meta.title, "Test Video");
        assert_eq!(meta.duration_secs, Some(212));
        assert!(meta.thumbnail.is_some());
    }

    #[test]
    fn parse_dump_skips_formats_without_url() {
        let meta = YtDlpExtractor::parse_dump(DUMP.as_bytes()).unwrap();
        assert_eq!(meta.variants.len(), 2);
        assert!(meta.variants.iter().all(|v| !v.url.is_empty()));
    }

    #[test]
    fn parse_dump_derives_quality_and_flags() {
        let meta = YtDlpExtractor::parse_dump(DUMP.as_bytes()).unwrap();
        let progressive = meta.variants.iter().find(|v| v.itag == "22").unwrap();
        assert_eq!(progressive.quality, "720p");
        assert!(progressive.is_progressive());

        let audio = meta.variants.iter().find(|v| v.itag == "140").unwrap();
        assert_eq!(audio.quality, "medium");
        assert!(audio.has_audio);
        assert!(!audio.has_video);
    }

    #[test]
    fn parse_dump_keeps_exact_and_approximate_sizes_apart() {
        let meta = YtDlpExtractor::parse_dump(DUMP.as_bytes()).unwrap();

        let audio = meta.variants.iter().find(|v| v.itag == "140").unwrap();
        assert_eq!(audio.byte_length, Some(3400000));
        assert_eq!(audio.approx_byte_length, None);

        // filesize_approx is an estimate; it never lands in byte_length.
        let progressive = meta.variants.iter().find(|v| v.itag == "22").unwrap();
        assert_eq!(progressive.byte_length, None);
        assert_eq!(progressive.approx_byte_length, Some(52000000));
    }

    #[test]
    fn parse_dump_rejects_garbage() {
        assert!(matches!(
            YtDlpExtractor::parse_dump(b"not json"),
            Err(ExtractError::Parse(_))
        ));
        assert!(matches!(
            YtDlpExtractor::parse_dump(b"{\"title\": \"x\"}"),
            Err(ExtractError::Parse(_))
        ));
    }

    #[test]
    fn build_args_include_headers_and_cookie() {
        let mut cfg = upstream();
        cfg.cookie = Some("SID=abc".to_string());
        let extractor = YtDlpExtractor::new(&cfg);
        let args = extractor.build_args("https://youtu.be/dQw4w9WgXcQ");

        assert!(args.contains(&"--no-cache-dir".to_string()));
        assert!(args.contains(&"test-agent".to_string()));
        assert!(args.contains(&"Cookie: SID=abc".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn build_args_omit_cookie_when_unset() {
        let extractor = YtDlpExtractor::new(&upstream());
        let args = extractor.build_args("https://youtu.be/dQw4w9WgXcQ");
        assert!(!args.iter().any(|a| a.starts_with("Cookie:")));
    }
}
