//! Error types and WeChat API error-code translation.
//!
//! The platform reports failures as an `errcode`/`errmsg` pair. The raw
//! `errmsg` is terse English; [`translate`] turns the pair into an
//! actionable Chinese diagnostic, including remediation steps for the
//! codes operators hit most often (IP allowlist, bad credentials, quota).

use thiserror::Error;
use tracing::info;

use crate::utils;

/// Convenient result type used throughout the crate.
pub type Result<T> = std::result::Result<T, WeChatError>;

/// Error codes that mean the access token is no longer accepted and a
/// forced refresh is worth one retry.
pub const TOKEN_EXPIRED_CODES: [i64; 2] = [40001, 42001];

/// Error code returned when the caller's IP is not on the allowlist.
pub const ERRCODE_IP_NOT_ALLOWLISTED: i64 = 40164;

/// Errors that can occur while talking to the WeChat Official Account API.
#[derive(Error, Debug)]
pub enum WeChatError {
    /// Local file referenced by the caller does not exist.
    #[error("文件不存在: {path}")]
    FileNotFound { path: String },

    /// The API answered with a non-zero `errcode`. `message` carries the
    /// translated diagnostic, `context` names the operation that failed.
    #[error("{message}")]
    Api {
        code: i64,
        message: String,
        context: &'static str,
    },

    /// The API answered `errcode == 0` but the payload was missing the
    /// fields the operation needs.
    #[error("{context}失败: 响应缺少预期字段")]
    UnexpectedResponse { context: &'static str },

    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("网络请求失败: {message}")]
    Network { message: String },

    /// Configuration file missing, unreadable or holding placeholder values.
    #[error("配置错误: {message}")]
    Config { message: String },

    /// Local I/O failure (token cache, content file, image file).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure outside of HTTP responses.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used by callers that retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Worth exactly one retry after a forced token refresh.
    Recoverable,
    /// Retrying will not help; surface to the operator.
    Fatal,
}

impl WeChatError {
    /// Builds an [`WeChatError::Api`] with the translated diagnostic.
    ///
    /// For errcode 40164 this performs a live public-IP lookup so the
    /// allowlist advice names the exact address to add.
    pub fn from_api(code: i64, errmsg: &str, context: &'static str) -> Self {
        WeChatError::Api {
            code,
            message: translate(code, errmsg, context),
            context,
        }
    }

    /// Creates a configuration error with a custom message.
    pub fn config_error(message: impl Into<String>) -> Self {
        WeChatError::Config {
            message: message.into(),
        }
    }

    /// Whether this error reports an expired or otherwise rejected token.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, WeChatError::Api { code, .. } if is_token_expired_code(*code))
    }

    pub fn severity(&self) -> ErrorSeverity {
        if self.is_token_expired() {
            ErrorSeverity::Recoverable
        } else {
            ErrorSeverity::Fatal
        }
    }
}

impl From<reqwest::Error> for WeChatError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("请求超时: {err}")
        } else if err.is_connect() {
            format!("无法连接到微信服务器: {err}")
        } else {
            err.to_string()
        };
        WeChatError::Network { message }
    }
}

/// Whether `code` is one the platform uses for stale access tokens.
pub fn is_token_expired_code(code: i64) -> bool {
    TOKEN_EXPIRED_CODES.contains(&code)
}

/// Chinese description for the error codes this tool runs into in practice.
/// Returns `None` for codes outside the table.
pub fn describe_errcode(code: i64) -> Option<&'static str> {
    let text = match code {
        -1 => "系统繁忙，请稍后重试",
        40001 => "AppSecret错误或者AppSecret不属于这个AppID",
        40002 => "请确保grant_type字段值为client_credential",
        40013 => "不合法的AppID，请检查AppID是否正确",
        40125 => "无效的appsecret，请检查AppSecret是否正确",
        40164 => "调用接口的IP地址不在白名单中",
        41001 => "缺少access_token参数",
        42001 => "access_token超时，请检查缓存是否正常",
        45009 => "接口调用超过限制（每日API调用量已用完）",
        47003 => "参数错误，请检查必填字段是否完整",
        48001 => "api功能未授权，请确认公众号类型",
        50005 => "用户未关注公众号",
        _ => return None,
    };
    Some(text)
}

/// Translates an `errcode`/`errmsg` pair into a diagnostic, detecting the
/// current public IP when the code calls for allowlist advice.
pub fn translate(code: i64, errmsg: &str, context: &str) -> String {
    let public_ip = if code == ERRCODE_IP_NOT_ALLOWLISTED {
        info!("正在检测公网IP...");
        utils::detect_public_ip()
    } else {
        None
    };
    translate_with_ip(code, errmsg, context, public_ip.as_deref())
}

/// Pure variant of [`translate`]: the caller supplies the detected public
/// IP (or `None` when detection failed or was not attempted).
pub fn translate_with_ip(
    code: i64,
    errmsg: &str,
    context: &str,
    public_ip: Option<&str>,
) -> String {
    let explained = describe_errcode(code).unwrap_or(errmsg);
    let mut detail = format!("{context}失败 (错误码{code}): {explained}");

    match code {
        ERRCODE_IP_NOT_ALLOWLISTED => {
            detail.push_str(
                "\n\n解决方法：\
                 \n  1. 登录微信公众平台 https://mp.weixin.qq.com\
                 \n  2. 设置与开发 → 基本配置 → IP白名单\
                 \n  3. 添加以下公网IP到白名单",
            );
            match public_ip {
                Some(ip) => {
                    detail.push_str(&format!(
                        "\n\n  需要添加到白名单的IP: {ip}\
                         \n  （这是微信服务器看到的您的真实公网IP）"
                    ));
                }
                None => {
                    detail.push_str(
                        "\n\n  无法自动检测公网IP，请手动查询：\
                         \n  - 访问 https://ipinfo.io 查看您的公网IP\
                         \n  - 或访问 https://ifconfig.me",
                    );
                }
            }
        }
        40001 | 40013 | 40125 => {
            detail.push_str(
                "\n\n解决方法：\
                 \n  检查配置文件中的AppID和AppSecret是否正确\
                 \n  AppID应该以wx开头，长度18位",
            );
        }
        45009 => {
            detail.push_str(
                "\n\n解决方法：\
                 \n  API调用次数已达上限，请明天再试\
                 \n  或联系微信公众平台提升配额",
            );
        }
        _ => {}
    }

    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_known_errcode() {
        assert_eq!(
            describe_errcode(40164),
            Some("调用接口的IP地址不在白名单中")
        );
        assert_eq!(describe_errcode(-1), Some("系统繁忙，请稍后重试"));
    }

    #[test]
    fn test_describe_unknown_errcode_falls_back_to_errmsg() {
        assert_eq!(describe_errcode(99999), None);
        let detail = translate_with_ip(99999, "some odd failure", "创建草稿", None);
        assert!(detail.contains("创建草稿失败 (错误码99999): some odd failure"));
    }

    #[test]
    fn test_translate_ip_allowlist_embeds_detected_ip() {
        let detail = translate_with_ip(40164, "ip not in whitelist", "获取access_token", Some("1.2.3.4"));
        assert!(detail.contains("需要添加到白名单的IP: 1.2.3.4"));
        assert!(detail.contains("IP白名单"));
    }

    #[test]
    fn test_translate_ip_allowlist_without_detected_ip() {
        let detail = translate_with_ip(40164, "ip not in whitelist", "获取access_token", None);
        assert!(detail.contains("无法自动检测公网IP"));
        assert!(!detail.contains("需要添加到白名单的IP:"));
    }

    #[test]
    fn test_translate_credential_advice() {
        let detail = translate_with_ip(40013, "invalid appid", "获取access_token", None);
        assert!(detail.contains("AppID应该以wx开头"));
    }

    #[test]
    fn test_translate_quota_advice() {
        let detail = translate_with_ip(45009, "reach max api daily quota limit", "上传图片", None);
        assert!(detail.contains("API调用次数已达上限"));
    }

    #[test]
    fn test_token_expired_codes() {
        assert!(is_token_expired_code(40001));
        assert!(is_token_expired_code(42001));
        assert!(!is_token_expired_code(45009));
        assert!(!is_token_expired_code(0));
    }

    #[test]
    fn test_error_severity() {
        let expired = WeChatError::from_api(42001, "access_token expired", "创建草稿");
        assert!(expired.is_token_expired());
        assert_eq!(expired.severity(), ErrorSeverity::Recoverable);

        let quota = WeChatError::from_api(45009, "reach max quota", "创建草稿");
        assert!(!quota.is_token_expired());
        assert_eq!(quota.severity(), ErrorSeverity::Fatal);
    }

    #[test]
    fn test_api_error_display_uses_translated_message() {
        let err = WeChatError::from_api(45009, "reach max quota", "上传图片");
        let rendered = err.to_string();
        assert!(rendered.contains("上传图片失败 (错误码45009)"));
        assert!(rendered.contains("接口调用超过限制"));
    }

    #[test]
    fn test_config_error_helper() {
        let err = WeChatError::config_error("appid缺失");
        assert!(matches!(err, WeChatError::Config { .. }));
        assert_eq!(err.to_string(), "配置错误: appid缺失");
    }
}
