//! High-level publisher tying the pieces together.
//!
//! [`WeChatPublisher`] owns one HTTP client, one token manager, an image
//! uploader and a draft manager, and runs the whole publish pipeline:
//! cover, body normalization, field limits, submission.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::TokenManager;
use crate::config::Config;
use crate::error::Result;
use crate::html::{self, NormalizedContent};
use crate::http::WeChatHttpClient;
use crate::limits::{self, Truncation};
use crate::upload::{Article, DraftManager, ImageUploader, UploadedImage};

/// Everything needed to publish one article as a draft.
///
/// Built with [`PublishRequest::new`] plus builder methods:
///
/// ```rust
/// use wechat_draft_rs::PublishRequest;
///
/// let request = PublishRequest::new("标题", "<p>正文</p>")
///     .author("作者")
///     .digest("一句话摘要")
///     .base_dir("articles/2026-08");
/// ```
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub title: String,
    /// Body HTML, straight from the authoring tool's export.
    pub content: String,
    /// Byline; falls back to the configured default author.
    pub author: Option<String>,
    /// Summary; derived from the title when absent.
    pub digest: Option<String>,
    /// Cover material id from an earlier upload; when absent the
    /// publisher's default cover is tried.
    pub thumb_media_id: Option<String>,
    pub show_cover_pic: bool,
    /// Directory that relative image paths in `content` resolve against.
    pub base_dir: PathBuf,
}

impl PublishRequest {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            author: None,
            digest: None,
            thumb_media_id: None,
            show_cover_pic: true,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn thumb_media_id(mut self, media_id: impl Into<String>) -> Self {
        self.thumb_media_id = Some(media_id.into());
        self
    }

    pub fn show_cover_pic(mut self, show: bool) -> Self {
        self.show_cover_pic = show;
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }
}

/// Outcome of a publish: the draft id plus everything the pipeline had to
/// do along the way.
#[derive(Debug, Clone)]
pub struct PublishReport {
    /// Draft `media_id`, visible in the Official Account draft box.
    pub media_id: String,
    /// Fields shortened to fit platform limits.
    pub truncations: Vec<Truncation>,
    pub images_uploaded: usize,
    pub images_skipped: usize,
    pub has_cover: bool,
}

/// Client for publishing articles to the WeChat Official Account draft box.
#[derive(Debug)]
pub struct WeChatPublisher {
    uploader: ImageUploader,
    drafts: DraftManager,
    default_author: String,
    default_cover: Option<PathBuf>,
}

impl WeChatPublisher {
    /// Builds a publisher from validated credentials.
    ///
    /// # Arguments
    /// * `config` - Credentials and default author
    /// * `token_cache` - Path of the JSON file access tokens persist to
    pub fn new(config: Config, token_cache: impl Into<PathBuf>) -> Result<Self> {
        let mut config = config;
        config.validate()?;

        let http = Arc::new(WeChatHttpClient::new()?);
        let tokens = Arc::new(TokenManager::new(
            config.app_id.clone(),
            config.app_secret.clone(),
            token_cache,
            Arc::clone(&http),
        ));
        let uploader = ImageUploader::new(Arc::clone(&http), Arc::clone(&tokens));
        let drafts = DraftManager::new(http, tokens);

        Ok(Self {
            uploader,
            drafts,
            default_author: config.author,
            default_cover: None,
        })
    }

    /// Cover image uploaded when a request brings no `thumb_media_id`.
    pub fn with_default_cover(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_cover = Some(path.into());
        self
    }

    /// Uploads a single image as permanent material.
    pub fn upload_image(&self, path: &Path) -> Result<UploadedImage> {
        self.uploader.upload_image(path)
    }

    /// Runs the full pipeline and creates the draft.
    pub fn publish(&self, request: PublishRequest) -> Result<PublishReport> {
        // Step 1: settle the cover
        let thumb_media_id = match &request.thumb_media_id {
            Some(id) if !id.is_empty() => Some(id.clone()),
            _ => self.upload_default_cover()?,
        };
        let has_cover = thumb_media_id.is_some();

        // Step 2: normalize the body, uploading referenced local images.
        // A failed content-image upload keeps the original tag; only the
        // cover is allowed to abort the run.
        let mut upload = |path: &Path| match self.uploader.upload_image(path) {
            Ok(uploaded) if !uploaded.url.is_empty() => Some(uploaded.url),
            Ok(_) => {
                warn!("未获取到URL，保持原路径: {}", path.display());
                None
            }
            Err(err) => {
                warn!("上传图片失败 {}: {err}", path.display());
                None
            }
        };
        let NormalizedContent {
            html: body,
            images_uploaded,
            images_skipped,
        } = html::normalize(&request.content, &request.base_dir, &mut upload);

        // Step 3: enforce field limits
        let author = request
            .author
            .clone()
            .unwrap_or_else(|| self.default_author.clone());
        let (fields, truncations) =
            limits::enforce(&request.title, &author, request.digest.as_deref());
        for truncation in &truncations {
            warn!("{truncation}");
        }

        // Step 4: submit
        info!("正在创建草稿: {}", fields.title);
        let mut article = Article::new(fields.title, fields.author, body)
            .with_digest(fields.digest)
            .with_show_cover(request.show_cover_pic);
        if let Some(id) = thumb_media_id {
            article = article.with_cover(id);
        }
        let media_id = self.drafts.create_draft(&[article])?;

        Ok(PublishReport {
            media_id,
            truncations,
            images_uploaded,
            images_skipped,
            has_cover,
        })
    }

    /// Uploads the configured default cover. A missing file demotes the
    /// draft to coverless; an upload failure propagates.
    fn upload_default_cover(&self) -> Result<Option<String>> {
        let Some(path) = &self.default_cover else {
            debug!("未配置默认封面");
            return Ok(None);
        };
        if !path.exists() {
            warn!("未找到默认封面图，草稿将无封面");
            return Ok(None);
        }
        info!("未提供封面，使用默认封面");
        let uploaded = self.uploader.upload_image(path)?;
        Ok(Some(uploaded.media_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeChatError;
    use tempfile::tempdir;

    fn valid_config() -> Config {
        Config::new(
            "wx1234567890123456",
            "0123456789abcdef0123456789abcdef",
            "默认作者",
        )
    }

    #[test]
    fn test_request_defaults() {
        let request = PublishRequest::new("标题", "<p>a</p>");
        assert_eq!(request.title, "标题");
        assert!(request.author.is_none());
        assert!(request.digest.is_none());
        assert!(request.thumb_media_id.is_none());
        assert!(request.show_cover_pic);
        assert_eq!(request.base_dir, PathBuf::from("."));
    }

    #[test]
    fn test_request_builder_chain() {
        let request = PublishRequest::new("标题", "<p>a</p>")
            .author("作者")
            .digest("摘要")
            .thumb_media_id("MEDIA_ID")
            .show_cover_pic(false)
            .base_dir("/tmp/articles");
        assert_eq!(request.author.as_deref(), Some("作者"));
        assert_eq!(request.digest.as_deref(), Some("摘要"));
        assert_eq!(request.thumb_media_id.as_deref(), Some("MEDIA_ID"));
        assert!(!request.show_cover_pic);
        assert_eq!(request.base_dir, PathBuf::from("/tmp/articles"));
    }

    #[test]
    fn test_new_rejects_placeholder_credentials() {
        let dir = tempdir().unwrap();
        let config = Config::new("your_appid_here", "secret-secret-secret-secret-1234", "");
        let err = WeChatPublisher::new(config, dir.path().join("cache.json")).unwrap_err();
        assert!(matches!(err, WeChatError::Config { .. }));
    }

    #[test]
    fn test_new_accepts_valid_credentials() {
        let dir = tempdir().unwrap();
        let publisher = WeChatPublisher::new(valid_config(), dir.path().join("cache.json"));
        assert!(publisher.is_ok());
    }

    #[test]
    fn test_missing_default_cover_is_not_fatal() {
        let dir = tempdir().unwrap();
        let publisher = WeChatPublisher::new(valid_config(), dir.path().join("cache.json"))
            .unwrap()
            .with_default_cover(dir.path().join("absent_cover.png"));
        assert_eq!(publisher.upload_default_cover().unwrap(), None);
    }

    #[test]
    fn test_no_default_cover_configured() {
        let dir = tempdir().unwrap();
        let publisher =
            WeChatPublisher::new(valid_config(), dir.path().join("cache.json")).unwrap();
        assert_eq!(publisher.upload_default_cover().unwrap(), None);
    }
}
