//! Image upload and draft submission.
//!
//! Images become permanent material (`material/add_material`) so the
//! returned URLs stay valid inside published articles. Draft creation
//! treats a stale-token rejection as recoverable exactly once: refresh
//! the token, resubmit, and report whatever happens next.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::TokenManager;
use crate::error::{self, Result, WeChatError};
use crate::http::WeChatHttpClient;

/// Permanent material created by an image upload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadedImage {
    pub media_id: String,
    /// Public URL of the stored image; empty when the platform omits it.
    #[serde(default)]
    pub url: String,
}

/// Uploads images as permanent material.
#[derive(Debug)]
pub struct ImageUploader {
    http: Arc<WeChatHttpClient>,
    tokens: Arc<TokenManager>,
}

impl ImageUploader {
    pub fn new(http: Arc<WeChatHttpClient>, tokens: Arc<TokenManager>) -> Self {
        Self { http, tokens }
    }

    /// Uploads the image at `path`. The file must exist; everything else
    /// (type, size) is left for the platform to judge.
    pub fn upload_image(&self, path: &Path) -> Result<UploadedImage> {
        if !path.exists() {
            return Err(WeChatError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        info!("正在上传图片: {}", path.display());
        let token = self.tokens.access_token()?;
        let response = self.http.upload_media::<UploadedImage>(
            "/cgi-bin/material/add_material",
            &token,
            "image",
            path,
        )?;
        let uploaded = response.into_result("上传图片")?;
        info!("图片上传成功 (media_id: {})", uploaded.media_id);
        Ok(uploaded)
    }
}

/// One article of a draft, in the platform's payload shape.
///
/// Flag fields are `0`/`1` integers on the wire, hence `u8` instead of
/// `bool`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub author: String,
    pub digest: String,
    pub content: String,
    pub content_source_url: String,
    pub thumb_media_id: String,
    pub show_cover_pic: u8,
    pub need_open_comment: u8,
    pub only_fans_can_comment: u8,
}

impl Article {
    /// An article with the draft defaults: cover shown, comments closed.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            digest: String::new(),
            content: content.into(),
            content_source_url: String::new(),
            thumb_media_id: String::new(),
            show_cover_pic: 1,
            need_open_comment: 0,
            only_fans_can_comment: 0,
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = digest.into();
        self
    }

    pub fn with_cover(mut self, thumb_media_id: impl Into<String>) -> Self {
        self.thumb_media_id = thumb_media_id.into();
        self
    }

    pub fn with_show_cover(mut self, show: bool) -> Self {
        self.show_cover_pic = if show { 1 } else { 0 };
        self
    }
}

/// Submission state: a stale-token failure moves `First` to `Retried`,
/// nothing moves past `Retried`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitAttempt {
    First,
    Retried,
}

impl SubmitAttempt {
    /// Whether a submission that failed with `errcode` warrants one more
    /// attempt with a freshly forced token.
    fn may_retry(self, errcode: i64) -> bool {
        self == SubmitAttempt::First && error::is_token_expired_code(errcode)
    }
}

#[derive(Debug, Deserialize)]
struct DraftReceipt {
    media_id: String,
}

#[derive(Debug, Serialize)]
struct DraftPayload<'a> {
    articles: &'a [Article],
}

/// Creates drafts in the Official Account's draft box.
#[derive(Debug)]
pub struct DraftManager {
    http: Arc<WeChatHttpClient>,
    tokens: Arc<TokenManager>,
}

impl DraftManager {
    pub fn new(http: Arc<WeChatHttpClient>, tokens: Arc<TokenManager>) -> Self {
        Self { http, tokens }
    }

    /// Submits `articles` as one draft and returns the draft `media_id`.
    pub fn create_draft(&self, articles: &[Article]) -> Result<String> {
        let payload = DraftPayload { articles };
        let mut attempt = SubmitAttempt::First;
        loop {
            let token = match attempt {
                SubmitAttempt::First => self.tokens.access_token()?,
                SubmitAttempt::Retried => self.tokens.force_refresh()?,
            };
            let response = self.http.post_json_with_token::<DraftReceipt, _>(
                "/cgi-bin/draft/add",
                &token,
                &payload,
            )?;
            if attempt.may_retry(response.errcode) {
                warn!("access_token已失效 (错误码{})，刷新后重试", response.errcode);
                attempt = SubmitAttempt::Retried;
                continue;
            }
            let receipt = response.into_result("创建草稿")?;
            info!("草稿创建成功 (media_id: {})", receipt.media_id);
            return Ok(receipt.media_id);
        }
    }
}
