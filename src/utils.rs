//! Small helpers: public-IP discovery and image MIME lookup.

use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// Echo services tried in order when detecting the public IP. The first
/// one is reachable from mainland China, the rest are fallbacks.
const IP_ECHO_SERVICES: [&str; 4] = [
    "https://myip.ipip.net",
    "https://api-ipv4.ip.sb/ip",
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
];

const IP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

lazy_static! {
    static ref IPV4_RE: Regex = Regex::new(r"\b\d{1,3}(?:\.\d{1,3}){3}\b").unwrap();
}

/// Detects the public IP the WeChat servers see, by asking a list of echo
/// services in order. Returns `None` when every service fails; never errors.
pub fn detect_public_ip() -> Option<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(IP_PROBE_TIMEOUT)
        .build()
        .ok()?;

    for service in IP_ECHO_SERVICES {
        let body = match client.get(service).send().and_then(|res| res.text()) {
            Ok(body) => body,
            Err(err) => {
                debug!("IP检测服务不可达 {service}: {err}");
                continue;
            }
        };
        // ipip.net answers with a full sentence, the others with a bare
        // address; extracting the first IPv4-shaped token handles both.
        if let Some(ip) = extract_ipv4(&body) {
            debug!("通过 {service} 检测到公网IP: {ip}");
            return Some(ip);
        }
        debug!("{service} 的响应中没有IPv4地址");
    }
    None
}

/// Pulls the first IPv4-looking token out of `text`.
pub fn extract_ipv4(text: &str) -> Option<String> {
    IPV4_RE.find(text.trim()).map(|m| m.as_str().to_string())
}

/// MIME type sent with an image upload, guessed from the extension.
pub fn image_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ipv4_from_sentence() {
        let body = "当前 IP：123.45.67.89  来自于：中国 北京  电信";
        assert_eq!(extract_ipv4(body), Some("123.45.67.89".to_string()));
    }

    #[test]
    fn test_extract_ipv4_from_bare_address() {
        assert_eq!(extract_ipv4("8.8.8.8\n"), Some("8.8.8.8".to_string()));
    }

    #[test]
    fn test_extract_ipv4_rejects_garbage() {
        assert_eq!(extract_ipv4("<html>error</html>"), None);
        assert_eq!(extract_ipv4(""), None);
    }

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("a.png")), "image/png");
        assert_eq!(image_mime(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(image_mime(Path::new("a.GIF")), "image/gif");
        assert_eq!(image_mime(Path::new("unknown.bin")), "image/jpeg");
    }
}
