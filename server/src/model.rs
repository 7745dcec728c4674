use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One encoded rendition of a video, as reported by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamVariant {
    /// Opaque format identifier assigned by the upstream platform.
    pub itag: String,
    /// Quality label, e.g. "720p" or "1080p60".
    pub quality: String,
    /// Container extension, e.g. "mp4", "webm".
    pub container: String,
    pub mime_type: Option<String>,
    pub has_audio: bool,
    pub has_video: bool,
    /// Exact size in bytes when the upstream declares it. Unknown for
    /// live/adaptive renditions.
    pub byte_length: Option<u64>,
    /// Upstream's size estimate when the exact size is unknown. Good
    /// enough for listings and ranking, not for response framing.
    pub approx_byte_length: Option<u64>,
    /// Total bitrate in kbps.
    pub bitrate: Option<f32>,
    /// Transient access locator. Time-limited; valid only for the lifetime
    /// of the current request.
    pub url: String,
}

impl StreamVariant {
    /// Whether the variant carries both audio and video tracks.
    pub fn is_progressive(&self) -> bool {
        self.has_audio && self.has_video
    }

    /// Numeric rank of the quality label: "1080p60" ranks as 1080. Labels
    /// without a leading number rank lowest.
    pub fn quality_rank(&self) -> u32 {
        let digits: String = self
            .quality
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().unwrap_or(0)
    }

    /// Best available size: the exact byte length, or the upstream's
    /// estimate when that is all there is.
    pub fn size_hint(&self) -> Option<u64> {
        self.byte_length.or(self.approx_byte_length)
    }

    /// Content type for the download response: the declared mime type when
    /// present, otherwise a default for the container.
    pub fn content_type(&self) -> String {
        if let Some(mime) = &self.mime_type {
            return mime.clone();
        }

        match self.container.as_str() {
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "3gp" => "video/3gpp",
            "m4a" => "audio/mp4",
            _ => "application/octet-stream",
        }
        .to_string()
    }
}

/// Video metadata for a single request. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub duration_secs: Option<u64>,
    pub thumbnail: Option<String>,
    pub variants: Vec<StreamVariant>,
}

/// Policy for picking one variant out of a catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSelector {
    /// Exact format identifier.
    Itag(String),
    /// All predicates must hold; no silent fallback to another quality.
    Filtered { quality: String, container: String },
    /// Greatest quality rank among variants with both audio and video.
    Highest,
}

/// One entry of the `/api/info` formats listing.
#[derive(Debug, Clone, Serialize)]
pub struct FormatDescriptor {
    pub itag: String,
    pub quality: String,
    pub container: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl From<&StreamVariant> for FormatDescriptor {
    fn from(v: &StreamVariant) -> Self {
        Self {
            itag: v.itag.clone(),
            quality: v.quality.clone(),
            container: v.container.clone(),
            bitrate: v.bitrate,
            size: v.size_hint(),
        }
    }
}

/// Response shape of `/api/info`. Which variant is produced is decided by
/// the configured selection mode, not by ad hoc field presence.
#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum InfoResponse {
    Catalogue {
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
        formats: Vec<FormatDescriptor>,
    },
    Single {
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
        format: FormatDescriptor,
    },
}

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\-]+").unwrap();
}

/// Derive a download filename stem from the video title: runs of non-word
/// characters collapse to a single underscore.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned = NON_WORD.replace_all(title, "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}
