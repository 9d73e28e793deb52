//! # WeChat Official Account Draft Publisher
//!
//! Publishes locally-authored HTML articles to a WeChat Official Account's
//! draft box: authenticates with a cached access token, uploads referenced
//! images, normalizes the body for the draft editor and submits the draft.
//!
//! ## Features
//!
//! - **Cached authentication**: access tokens persist to a JSON file and
//!   are reused across runs, with a five-minute safety margin before expiry
//! - **Editor-safe HTML**: a three-stage pipeline strips embedded cover
//!   art, rewrites local image references to platform URLs and hardens
//!   inline styles against the editor's paste behavior
//! - **Limit enforcement**: title, author and digest are clipped to the
//!   platform's limits client-side, and every clip is reported
//! - **Actionable errors**: API error codes translate into Chinese
//!   diagnostics with remediation steps, including the caller's live
//!   public IP when the allowlist is the problem
//! - **Sequential and simple**: one article per run, blocking I/O, no
//!   runtime to configure
//!
//! ## Architecture
//!
//! - [`WeChatPublisher`] - High-level client running the publish pipeline
//! - [`auth`] - Access token acquisition and on-disk caching
//! - [`http`] - Shared blocking HTTP client and the API response envelope
//! - [`html`] - Cover stripping, image rewriting and editor fixes
//! - [`limits`] - Platform field limits and truncation
//! - [`upload`] - Image material upload and draft submission
//! - [`config`] - Credential store with placeholder detection
//! - [`error`] - Error types and errcode translation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wechat_draft_rs::{Config, PublishRequest, Result, WeChatPublisher};
//!
//! fn main() -> Result<()> {
//!     // Credentials live in a local JSON file, never in code
//!     let config = Config::load("wechat_config.json")?;
//!     let publisher = WeChatPublisher::new(config, "wechat_token_cache.json")?
//!         .with_default_cover("assets/default_cover.png");
//!
//!     let content = std::fs::read_to_string("article.html")?;
//!     let request = PublishRequest::new("文章标题", content)
//!         .author("作者")
//!         .base_dir(".");
//!
//!     let report = publisher.publish(request)?;
//!     println!("草稿已创建: {}", report.media_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Content Expectations
//!
//! The body is the HTML an authoring tool exports, untouched:
//!
//! - `<img>` tags with relative `src` paths are uploaded from
//!   `base_dir` and rewritten to the returned platform URLs
//! - `http(s)://` image sources are assumed to be hosted already
//! - cover art inside the body (a `cover.*` file, or `alt`/`title`
//!   mentioning 封面) is stripped; the cover travels separately as
//!   `thumb_media_id`
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! use wechat_draft_rs::{Config, PublishRequest, Result, WeChatError, WeChatPublisher};
//!
//! # fn main() -> Result<()> {
//! let config = Config::load("wechat_config.json")?;
//! let publisher = WeChatPublisher::new(config, "wechat_token_cache.json")?;
//! let request = PublishRequest::new("标题", "<p>正文</p>");
//!
//! match publisher.publish(request) {
//!     Ok(report) => println!("草稿已创建: {}", report.media_id),
//!     Err(WeChatError::FileNotFound { path }) => {
//!         eprintln!("文件不存在: {path}");
//!     }
//!     Err(WeChatError::Api { code, message, .. }) => {
//!         eprintln!("API调用失败 ({code}): {message}");
//!     }
//!     Err(WeChatError::Network { message }) => {
//!         eprintln!("网络错误: {message}");
//!     }
//!     Err(err) => eprintln!("其他错误: {err}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod html;
pub mod http;
pub mod limits;
pub mod upload;
pub mod utils;

// Re-export main types for convenience
pub use client::{PublishReport, PublishRequest, WeChatPublisher};
pub use config::Config;
pub use error::{ErrorSeverity, Result, WeChatError};
pub use limits::Truncation;
pub use upload::UploadedImage;
