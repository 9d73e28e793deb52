//! Access-token acquisition and on-disk caching.
//!
//! Tokens are valid for roughly two hours; the manager persists each grant
//! to a JSON cache file so consecutive runs reuse it, and treats a token
//! as stale five minutes before its actual expiry so one is never handed
//! out mid-request.
//!
//! The cache file is written atomically (temp file + rename), a crashed
//! run can leave a stale cache but never a torn one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::http::WeChatHttpClient;

/// Seconds a token is considered stale before its reported expiry.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 300;
/// TTL assumed when the grant response omits `expires_in`.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7200;

/// One persisted token grant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedToken {
    pub access_token: String,
    /// Unix timestamp after which the platform rejects the token.
    pub expires_at: i64,
    /// Local wall-clock time of the grant, kept for humans inspecting the
    /// cache file.
    pub updated_at: String,
}

impl CachedToken {
    /// Whether the token is still usable at `now`, safety margin included.
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - TOKEN_SAFETY_MARGIN_SECS
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Fetches access tokens and caches them on disk.
#[derive(Debug)]
pub struct TokenManager {
    app_id: String,
    app_secret: String,
    cache_path: PathBuf,
    http: Arc<WeChatHttpClient>,
}

impl TokenManager {
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        cache_path: impl Into<PathBuf>,
        http: Arc<WeChatHttpClient>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            cache_path: cache_path.into(),
            http,
        }
    }

    /// Returns a usable access token, from cache when possible.
    pub fn access_token(&self) -> Result<String> {
        self.token(false)
    }

    /// Discards the cache and requests a brand-new token.
    pub fn force_refresh(&self) -> Result<String> {
        self.token(true)
    }

    /// Cache-first token lookup. `force_refresh` skips the cache entirely,
    /// used after the API rejects a token that looked fresh locally.
    pub fn token(&self, force_refresh: bool) -> Result<String> {
        if !force_refresh {
            if let Some(cached) = self.read_cache() {
                if cached.is_fresh(Utc::now().timestamp()) {
                    info!("使用缓存的access_token");
                    return Ok(cached.access_token);
                }
                debug!("缓存的access_token已过期");
            }
        }
        self.request_token()
    }

    /// Loads the cache file. Any read or parse failure is treated as a
    /// cache miss, never an error.
    fn read_cache(&self) -> Option<CachedToken> {
        if !self.cache_path.exists() {
            return None;
        }
        let raw = match fs::read_to_string(&self.cache_path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("读取token缓存失败，当作缓存未命中: {err}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(cached) => Some(cached),
            Err(err) => {
                warn!("token缓存已损坏，当作缓存未命中: {err}");
                None
            }
        }
    }

    fn request_token(&self) -> Result<String> {
        info!("正在获取新的access_token...");
        let response = self.http.get_json::<TokenGrant>(
            "/cgi-bin/token",
            &[
                ("grant_type", "client_credential"),
                ("appid", &self.app_id),
                ("secret", &self.app_secret),
            ],
        )?;
        let grant = response.into_result("获取access_token")?;

        let expires_in = grant.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let cached = CachedToken {
            access_token: grant.access_token,
            expires_at: Utc::now().timestamp() + expires_in,
            updated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        self.write_cache(&cached)?;
        info!("获取access_token成功 (有效期: {expires_in}秒)");
        Ok(cached.access_token)
    }

    fn write_cache(&self, token: &CachedToken) -> Result<()> {
        let dir = match self.cache_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };
        // Write beside the destination so the rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), token)?;
        tmp.persist(&self.cache_path).map_err(|err| err.error)?;
        Ok(())
    }
}
