//! Command-line front end for the draft publisher.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use tracing_subscriber::EnvFilter;

use wechat_draft_rs::{Config, PublishReport, PublishRequest, WeChatError, WeChatPublisher};

#[derive(Parser)]
#[command(
    name = "wechat-draft",
    version,
    about = "发布文章到微信公众号草稿箱",
    after_help = "使用示例:\n  \
        wechat-draft --title \"文章标题\" --content article.html\n  \
        wechat-draft --title \"文章标题\" --content article.html --cover cover.png --author \"作者名\"\n  \
        wechat-draft --interactive"
)]
struct Cli {
    /// 文章标题
    #[arg(short, long)]
    title: Option<String>,

    /// 内容HTML文件路径
    #[arg(short, long)]
    content: Option<PathBuf>,

    /// 作者名（默认使用配置文件中的作者）
    #[arg(short, long)]
    author: Option<String>,

    /// 封面图片路径
    #[arg(long, default_value = "cover.png")]
    cover: PathBuf,

    /// 摘要（默认从标题截取）
    #[arg(short, long)]
    digest: Option<String>,

    /// 交互式输入文章信息
    #[arg(long)]
    interactive: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 上传单张图片为永久素材
    UploadImage {
        /// 图片文件路径
        path: PathBuf,

        /// 不打印图片URL
        #[arg(long)]
        no_url: bool,
    },
}

enum CliError {
    /// User backed out of a prompt (Ctrl-C); not a failure.
    Cancelled,
    /// Bad invocation; print usage help.
    Usage(String),
    WeChat(WeChatError),
}

impl From<WeChatError> for CliError {
    fn from(err: WeChatError) -> Self {
        CliError::WeChat(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::WeChat(WeChatError::Io(err))
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(_: dialoguer::Error) -> Self {
        CliError::Cancelled
    }
}

/// Well-known file locations under the user's config directory.
struct AppPaths {
    config: PathBuf,
    token_cache: PathBuf,
    default_cover: PathBuf,
}

fn app_paths() -> AppPaths {
    let base = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wechat-draft");
    AppPaths {
        config: base.join("config.json"),
        token_cache: base.join("token_cache.json"),
        default_cover: base.join("default_cover.png"),
    }
}

fn main() {
    init_tracing();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            process::exit(code);
        }
    };
    let code = match run(cli) {
        Ok(()) => 0,
        Err(CliError::Cancelled) => {
            println!("\n操作已取消");
            0
        }
        Err(CliError::Usage(message)) => {
            eprintln!("{} {message}\n", "✗".red().bold());
            let _ = Cli::command().print_help();
            1
        }
        Err(CliError::WeChat(err)) => {
            eprintln!("\n{} {err}", "✗ 发布失败:".red().bold());
            1
        }
    };
    process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(mut cli: Cli) -> Result<(), CliError> {
    let paths = app_paths();
    match cli.command.take() {
        Some(Commands::UploadImage { path, no_url }) => run_upload_image(&paths, &path, no_url),
        None => run_publish(cli, &paths),
    }
}

fn run_publish(cli: Cli, paths: &AppPaths) -> Result<(), CliError> {
    let config = ensure_config(paths)?;
    let default_author = config.author.clone();

    let (title, content_path, author, cover, digest) = if cli.interactive {
        prompt_article(&default_author)?
    } else {
        match (cli.title, cli.content) {
            (Some(title), Some(content)) => (title, content, cli.author, cli.cover, cli.digest),
            _ => {
                return Err(CliError::Usage(
                    "缺少必要参数，请指定 --title 和 --content，或使用 --interactive".to_string(),
                ))
            }
        }
    };

    if !content_path.exists() {
        return Err(WeChatError::FileNotFound {
            path: content_path.display().to_string(),
        }
        .into());
    }
    let content = fs::read_to_string(&content_path)?;

    print_banner(
        &title,
        author.as_deref().unwrap_or(&default_author),
        &content_path,
        content.chars().count(),
        &cover,
    );

    let publisher = WeChatPublisher::new(config, &paths.token_cache)?
        .with_default_cover(&paths.default_cover);

    // An explicitly named cover that exists is uploaded up front; its
    // absence silently falls back to the default cover.
    let thumb_media_id = if cover.exists() {
        println!("{} 正在上传封面: {}", "→".cyan(), cover.display());
        Some(publisher.upload_image(&cover)?.media_id)
    } else {
        None
    };

    let base_dir = content_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let mut request = PublishRequest::new(title, content).base_dir(base_dir);
    if let Some(author) = author {
        request = request.author(author);
    }
    if let Some(digest) = digest {
        request = request.digest(digest);
    }
    if let Some(media_id) = thumb_media_id {
        request = request.thumb_media_id(media_id);
    }

    let report = publisher.publish(request)?;
    print_report(&report);
    Ok(())
}

fn run_upload_image(paths: &AppPaths, path: &Path, no_url: bool) -> Result<(), CliError> {
    let config = ensure_config(paths)?;
    let publisher = WeChatPublisher::new(config, &paths.token_cache)?;

    let uploaded = publisher.upload_image(path)?;
    println!("{}", "✓ 上传成功".green().bold());
    println!("media_id: {}", uploaded.media_id);
    if !no_url && !uploaded.url.is_empty() {
        println!("url: {}", uploaded.url);
    }
    Ok(())
}

/// Loads the config, walking the user through first-run setup when the
/// file does not exist yet.
fn ensure_config(paths: &AppPaths) -> Result<Config, CliError> {
    if paths.config.exists() {
        let config = Config::load(&paths.config)?;
        let masked: String = config.app_id.chars().take(6).collect();
        let author_info = if config.author.is_empty() {
            String::new()
        } else {
            format!(", 作者: {}", config.author)
        };
        println!(
            "{} 配置加载成功 (AppID: {masked}***{author_info})",
            "✓".green()
        );
        return Ok(config);
    }

    println!("{}", "首次使用，需要配置公众号凭据".yellow().bold());
    println!("AppID和AppSecret可在微信公众平台「设置与开发」→「基本配置」中查看\n");

    let theme = ColorfulTheme::default();
    let proceed = Confirm::with_theme(&theme)
        .with_prompt("是否现在配置?")
        .default(true)
        .interact()?;
    if !proceed {
        println!("\n请手动创建配置文件: {}", paths.config.display());
        println!("格式:");
        println!("{{");
        println!("  \"appid\": \"wx...\",");
        println!("  \"appsecret\": \"...\",");
        println!("  \"author\": \"默认作者名\"");
        println!("}}");
        return Err(WeChatError::config_error("配置未完成").into());
    }

    let app_id: String = Input::with_theme(&theme)
        .with_prompt("AppID (以wx开头)")
        .interact_text()?;
    let app_secret: String = Input::with_theme(&theme)
        .with_prompt("AppSecret")
        .interact_text()?;
    let author: String = Input::with_theme(&theme)
        .with_prompt("默认作者名 (可留空)")
        .allow_empty(true)
        .interact_text()?;

    let mut config = Config::new(app_id, app_secret, author);
    config.validate()?;
    config.save(&paths.config)?;
    println!("\n{} 配置已保存到: {}", "✓".green(), paths.config.display());
    println!("  (已设置权限为600，仅当前用户可读写)\n");
    Ok(config)
}

fn prompt_article(
    default_author: &str,
) -> Result<(String, PathBuf, Option<String>, PathBuf, Option<String>), CliError> {
    println!("{}\n", "=== 微信公众号草稿发布工具（交互式） ===".bold());
    let theme = ColorfulTheme::default();

    let title: String = Input::with_theme(&theme)
        .with_prompt("文章标题")
        .interact_text()?;
    let content: String = Input::with_theme(&theme)
        .with_prompt("内容文件路径")
        .interact_text()?;
    let author: String = Input::with_theme(&theme)
        .with_prompt("作者")
        .default(default_author.to_string())
        .allow_empty(true)
        .interact_text()?;
    let cover: String = Input::with_theme(&theme)
        .with_prompt("封面图片路径")
        .default("cover.png".to_string())
        .interact_text()?;
    let digest: String = Input::with_theme(&theme)
        .with_prompt("摘要 (可留空)")
        .allow_empty(true)
        .interact_text()?;

    Ok((
        title,
        PathBuf::from(content),
        if author.is_empty() { None } else { Some(author) },
        PathBuf::from(cover),
        if digest.is_empty() { None } else { Some(digest) },
    ))
}

fn print_banner(title: &str, author: &str, content_path: &Path, content_chars: usize, cover: &Path) {
    println!("\n{}", "=".repeat(50).bright_black());
    println!("{}", "微信公众号草稿发布".bold());
    println!("{}", "=".repeat(50).bright_black());
    println!("标题: {title}");
    println!(
        "作者: {}",
        if author.is_empty() { "(未设置)" } else { author }
    );
    println!("内容: {} ({content_chars} 字符)", content_path.display());
    println!("封面: {}", cover.display());
    println!();
}

fn print_report(report: &PublishReport) {
    println!("\n{}", "✓ 草稿创建成功！".green().bold());
    println!("media_id: {}", report.media_id);
    if report.images_uploaded > 0 {
        println!("内容图片: 已上传 {} 张", report.images_uploaded);
    }
    if report.images_skipped > 0 {
        println!(
            "{} {} 张内容图片未替换，请检查日志",
            "⚠".yellow(),
            report.images_skipped
        );
    }
    if !report.has_cover {
        println!("{} 草稿没有封面图", "⚠".yellow());
    }
    for truncation in &report.truncations {
        println!("{} {truncation}", "⚠".yellow());
    }
    println!("\n请登录微信公众平台查看并发布草稿");
}
