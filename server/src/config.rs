use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Setting {
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default)]
    pub http: HttpServer,
    #[serde(default)]
    pub cors: Cors,
    #[serde(default)]
    pub upstream: Upstream,
    #[serde(default)]
    pub selection: Selection,
}

impl Setting {
    /// Deploy-time overrides from the environment, matching the original
    /// deployment surface: PORT, FRONTEND_ORIGIN, UPSTREAM_COOKIE.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("PORT").ok(),
            std::env::var("FRONTEND_ORIGIN").ok(),
            std::env::var("UPSTREAM_COOKIE").ok(),
        );
    }

    fn apply_overrides(
        &mut self,
        port: Option<String>,
        origin: Option<String>,
        cookie: Option<String>,
    ) {
        if let Some(port) = port {
            self.http.addr = format!(":{}", port);
        }
        if let Some(origin) = origin {
            if !self.cors.allowed_origins.contains(&origin) {
                self.cors.allowed_origins.push(origin);
            }
        }
        if let Some(cookie) = cookie {
            self.upstream.cookie = Some(cookie);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Runtime {
    pub threads: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct HttpServer {
    #[serde(default = "HttpServer::default_addr")]
    pub addr: String,
}

impl HttpServer {
    fn default_addr() -> String {
        ":5000".to_string()
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self {
            addr: Self::default_addr(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Cors {
    /// Origins allowed to call the API. "*" allows everyone.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Upstream {
    #[serde(default = "Upstream::default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default = "Upstream::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Explicit path to the yt-dlp binary; discovered when unset.
    #[serde(default)]
    pub ytdlp_path: Option<String>,
}

impl Upstream {
    fn default_user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/121.0.0.0 Safari/537.36"
            .to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            user_agent: Self::default_user_agent(),
            cookie: None,
            timeout_secs: Self::default_timeout_secs(),
            ytdlp_path: None,
        }
    }
}

/// Which `/api/info` response variant the service produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Full filtered catalogue of audio+video variants.
    Catalogue,
    /// One preselected variant per the configured quality and container.
    Single,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Selection {
    #[serde(default = "Selection::default_mode")]
    pub mode: SelectionMode,
    #[serde(default = "Selection::default_quality")]
    pub quality: String,
    #[serde(default = "Selection::default_container")]
    pub container: String,
}

impl Selection {
    fn default_mode() -> SelectionMode {
        SelectionMode::Catalogue
    }

    fn default_quality() -> String {
        "720p".to_string()
    }

    fn default_container() -> String {
        "mp4".to_string()
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            mode: Self::default_mode(),
            quality: Self::default_quality(),
            container: Self::default_container(),
        }
    }
}
