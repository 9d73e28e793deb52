//! Credential store: a small JSON file holding `appid`, `appsecret` and an
//! optional default author.
//!
//! Loading fails fast on missing or template values so a half-filled
//! config never reaches the API; a wrong-looking `appid` only warns,
//! since the format is not contractual.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, WeChatError};

/// Template values shipped in setup instructions; treated the same as an
/// empty `appid`.
pub const PLACEHOLDER_APP_IDS: [&str; 2] = ["your_appid_here", "your_appid"];
/// Same, for `appsecret`.
pub const PLACEHOLDER_APP_SECRETS: [&str; 2] = ["your_appsecret_here", "your_appsecret"];
/// Same, for `author`; a placeholder author degrades to empty instead of
/// failing, a byline is optional.
pub const PLACEHOLDER_AUTHORS: [&str; 2] = ["Your Name", "your_name_here"];

/// Official Account credentials plus the default byline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "appid")]
    pub app_id: String,
    #[serde(rename = "appsecret")]
    pub app_secret: String,
    #[serde(default)]
    pub author: String,
}

impl Config {
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into().trim().to_string(),
            app_secret: app_secret.into().trim().to_string(),
            author: author.into().trim().to_string(),
        }
    }

    /// Reads and validates the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WeChatError::config_error(format!(
                "配置文件不存在: {}\n请创建该文件，内容格式:\n{}",
                path.display(),
                TEMPLATE
            )));
        }
        let raw = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&raw).map_err(|err| {
            WeChatError::config_error(format!(
                "配置文件格式错误 ({}): {err}",
                path.display()
            ))
        })?;
        config.app_id = config.app_id.trim().to_string();
        config.app_secret = config.app_secret.trim().to_string();
        config.author = config.author.trim().to_string();
        config.validate()?;
        Ok(config)
    }

    /// Rejects empty or template credentials and clears a template author.
    pub fn validate(&mut self) -> Result<()> {
        if self.app_id.is_empty() || PLACEHOLDER_APP_IDS.contains(&self.app_id.as_str()) {
            return Err(WeChatError::config_error(
                "请在配置文件中填写有效的appid",
            ));
        }
        if self.app_secret.is_empty()
            || PLACEHOLDER_APP_SECRETS.contains(&self.app_secret.as_str())
        {
            return Err(WeChatError::config_error(
                "请在配置文件中填写有效的appsecret",
            ));
        }
        if PLACEHOLDER_AUTHORS.contains(&self.author.as_str()) {
            warn!("未配置作者名，将使用空值或调用时指定的作者名");
            self.author.clear();
        }
        if !self.app_id.starts_with("wx") || self.app_id.len() != 18 {
            warn!("AppID格式可能不正确（应为wx开头的18位字符）");
        }
        Ok(())
    }

    /// Writes the config as pretty JSON, world-unreadable on Unix.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

const TEMPLATE: &str = r#"{
  "appid": "your_appid_here",
  "appsecret": "your_appsecret_here",
  "author": "your_name_here"
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_valid_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"appid": " wx1234567890123456 ", "appsecret": "0123456789abcdef0123456789abcdef", "author": "测试"}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.app_id, "wx1234567890123456");
        assert_eq!(config.author, "测试");
    }

    #[test]
    fn test_load_missing_file_mentions_template() {
        let dir = tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.json")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("配置文件不存在"));
        assert!(message.contains("your_appid_here"));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("配置文件格式错误"));
    }

    #[test]
    fn test_validate_rejects_placeholder_appid() {
        let mut config = Config::new("your_appid_here", "secret000000000000000000000000000", "");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("appid"));
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = Config::new("wx1234567890123456", "  ", "");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("appsecret"));
    }

    #[test]
    fn test_validate_clears_placeholder_author() {
        let mut config = Config::new(
            "wx1234567890123456",
            "0123456789abcdef0123456789abcdef",
            "Your Name",
        );
        config.validate().unwrap();
        assert_eq!(config.author, "");
    }

    #[test]
    fn test_validate_accepts_odd_appid_format_with_warning_only() {
        let mut config = Config::new("gh_not_standard", "0123456789abcdef0123456789abcdef", "");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config::new("wx1234567890123456", "0123456789abcdef0123456789abcdef", "作者");
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.app_id, config.app_id);
        assert_eq!(loaded.author, "作者");
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        Config::new("wx1234567890123456", "0123456789abcdef0123456789abcdef", "")
            .save(&path)
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
