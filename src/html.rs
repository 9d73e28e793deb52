//! HTML normalization for the draft editor.
//!
//! Exported article HTML goes through three stages, in order:
//!
//! 1. [`strip_cover_images`]: remove cover art embedded in the body (the
//!    cover travels separately as `thumb_media_id`).
//! 2. [`rewrite_local_images`]: upload images referenced by relative path
//!    and substitute the returned platform URLs.
//! 3. [`apply_editor_fixes`]: counter the editor's habit of rewriting
//!    inline styles on paste.
//!
//! This module never touches the network itself; the caller injects the
//! upload step as a closure so the rewriting logic stays testable.

use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, info, warn};

lazy_static! {
    static ref COVER_SRC_RE: Regex =
        Regex::new(r#"(?i)<img[^>]*src=["']cover\.(?:png|jpg|jpeg|gif)["'][^>]*>"#).unwrap();
    static ref COVER_ALT_RE: Regex =
        Regex::new(r#"(?i)<img[^>]*alt=["'][^"']*封面[^"']*["'][^>]*>"#).unwrap();
    static ref COVER_TITLE_RE: Regex =
        Regex::new(r#"(?i)<img[^>]*title=["'][^"']*封面[^"']*["'][^>]*>"#).unwrap();
    static ref TITLE_COMMENT_IMG_RE: Regex =
        Regex::new(r"(?i)(<!--[^>]*标题[^>]*-->)\s*<img[^>]*>").unwrap();
    static ref IMG_SRC_RE: Regex =
        Regex::new(r#"<img([^>]*?)src=["']([^"']+)["']([^>]*?)>"#).unwrap();
    static ref TAG_GAP_RE: Regex = Regex::new(r">\s+<").unwrap();
    static ref DECLARATION_RE: Regex = Regex::new(r"([a-z-]+:\s*[^;]+);").unwrap();
    static ref STYLE_ATTR_RE: Regex = Regex::new(r#"style="([^"]*)""#).unwrap();
    static ref BANNED_PROP_RES: Vec<Regex> = ["box-shadow", "text-shadow", "transform", "transition"]
        .iter()
        .map(|prop| Regex::new(&format!(r"{prop}:[^;]+;?\s*")).unwrap())
        .collect();
}

/// Counters for the image-rewriting stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    /// Local images uploaded and substituted.
    pub uploaded: usize,
    /// Local images left untouched (file missing or upload failed).
    pub skipped: usize,
}

/// Body HTML after the full pipeline, with upload counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    pub html: String,
    pub images_uploaded: usize,
    pub images_skipped: usize,
}

/// Runs the full normalization pipeline.
pub fn normalize<F>(html: &str, base_dir: &Path, upload: &mut F) -> NormalizedContent
where
    F: FnMut(&Path) -> Option<String>,
{
    let stripped = strip_cover_images(html);
    info!("正在处理内容中的图片...");
    let (rewritten, stats) = rewrite_local_images(&stripped, base_dir, upload);
    if stats.uploaded > 0 {
        info!("成功上传 {} 张内容图片", stats.uploaded);
    }
    let html = apply_editor_fixes(&rewritten);
    info!("已优化HTML格式（防止编辑模式样式错位）");
    NormalizedContent {
        html,
        images_uploaded: stats.uploaded,
        images_skipped: stats.skipped,
    }
}

/// Removes cover art from the body: `<img>` tags whose `src` is a
/// `cover.*` file, or whose `alt`/`title` mentions 封面.
///
/// Markdown converters also leave a title comment directly before the
/// cover; the first comment-then-image pair collapses to the comment
/// alone.
pub fn strip_cover_images(html: &str) -> String {
    let stripped = COVER_SRC_RE.replace_all(html, "");
    let stripped = COVER_ALT_RE.replace_all(&stripped, "");
    let stripped = COVER_TITLE_RE.replace_all(&stripped, "");
    let stripped = TITLE_COMMENT_IMG_RE.replacen(&stripped, 1, "${1}");
    stripped.into_owned()
}

/// Uploads every locally-referenced image through `upload` and substitutes
/// the returned URL into the `src` attribute, keeping all other attributes.
///
/// Skipped entirely: `http(s)://` sources (already hosted) and any source
/// whose path mentions `cover` (cover art is handled by
/// [`strip_cover_images`]); the substring check also spares names like
/// `undercover.png`. A missing file or a failed upload keeps the original
/// tag and counts as skipped.
pub fn rewrite_local_images<F>(html: &str, base_dir: &Path, upload: &mut F) -> (String, RewriteStats)
where
    F: FnMut(&Path) -> Option<String>,
{
    let mut stats = RewriteStats::default();
    let rewritten = IMG_SRC_RE.replace_all(html, |caps: &Captures<'_>| {
        let before = &caps[1];
        let src = &caps[2];
        let after = &caps[3];

        if src.starts_with("http://") || src.starts_with("https://") {
            return caps[0].to_string();
        }
        if src.to_lowercase().contains("cover") {
            return caps[0].to_string();
        }

        let image_path = base_dir.join(src);
        if !image_path.exists() {
            warn!("图片不存在，跳过: {src}");
            stats.skipped += 1;
            return caps[0].to_string();
        }
        match upload(&image_path) {
            Some(url) => {
                stats.uploaded += 1;
                format!(r#"<img{before}src="{url}"{after}>"#)
            }
            None => {
                stats.skipped += 1;
                caps[0].to_string()
            }
        }
    });
    (rewritten.into_owned(), stats)
}

/// Reworks inline styles so the draft editor cannot mangle them on paste.
///
/// In order: collapse whitespace between adjacent tags, force every inline
/// declaration to `!important`, pin `text-indent: 0` on styled elements
/// that do not set one, then strip shadow/transform/transition effects the
/// editor renders badly. The bare `transform:` pattern also eats the tail
/// of `text-transform`.
pub fn apply_editor_fixes(html: &str) -> String {
    let fixed = TAG_GAP_RE.replace_all(html, "><");

    let fixed = DECLARATION_RE.replace_all(&fixed, |caps: &Captures<'_>| {
        let declaration = &caps[1];
        if declaration.contains("!important") {
            format!("{declaration};")
        } else {
            format!("{declaration} !important;")
        }
    });

    let fixed = STYLE_ATTR_RE.replace_all(&fixed, |caps: &Captures<'_>| {
        let inner = &caps[1];
        if inner.contains("text-indent") {
            caps[0].to_string()
        } else {
            format!(r#"style="{inner} text-indent: 0 !important;""#)
        }
    });

    let mut fixed = fixed.into_owned();
    for re in BANNED_PROP_RES.iter() {
        fixed = re.replace_all(&fixed, "").into_owned();
    }
    debug!("完成轻量修复（空白、!important、缩进、不支持样式）");
    fixed
}
