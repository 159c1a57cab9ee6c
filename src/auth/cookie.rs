//! Session token transport over HTTP cookies

use crate::config::AppConfig;
use axum::http::{header, HeaderMap, HeaderValue};

/// Carries the session token between client and server.
///
/// The middleware and handlers only talk to this trait, so tests can swap the
/// cookie transport for anything that reads and writes headers.
pub trait SessionTransport: Send + Sync {
    /// Token presented by the client, if any
    fn read_token(&self, headers: &HeaderMap) -> Option<String>;

    /// Instruct the client to store the token
    fn write_token(&self, headers: &mut HeaderMap, token: &str);

    /// Instruct the client to drop the token
    fn clear_token(&self, headers: &mut HeaderMap);
}

/// SameSite cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// `Cookie` / `Set-Cookie` based transport
#[derive(Debug, Clone)]
pub struct CookieTransport {
    name: String,
    secure: bool,
    same_site: SameSite,
    max_age_secs: i64,
}

impl CookieTransport {
    pub fn new(name: impl Into<String>, secure: bool, same_site: SameSite, max_age_secs: i64) -> Self {
        Self {
            name: name.into(),
            secure,
            same_site,
            max_age_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.cookie.name.clone(),
            config.cookie_secure(),
            // 配置加载时已校验
            SameSite::parse(&config.cookie.same_site).unwrap_or(SameSite::Strict),
            config.security.token_ttl_secs as i64,
        )
    }

    fn build_cookie(&self, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite={}",
            self.name,
            value,
            max_age_secs,
            self.same_site.as_str()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn append(&self, headers: &mut HeaderMap, cookie: String) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Invalid Set-Cookie value: {}", e),
        }
    }
}

impl SessionTransport for CookieTransport {
    fn read_token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|s| s.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn write_token(&self, headers: &mut HeaderMap, token: &str) {
        let cookie = self.build_cookie(token, self.max_age_secs);
        self.append(headers, cookie);
    }

    fn clear_token(&self, headers: &mut HeaderMap) {
        let cookie = self.build_cookie("", 0);
        self.append(headers, cookie);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(secure: bool) -> CookieTransport {
        CookieTransport::new("token", secure, SameSite::Strict, 86400)
    }

    #[test]
    fn test_read_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; token=abc.def.ghi; lang=en".parse().unwrap());

        assert_eq!(transport(false).read_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_read_token_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(transport(false).read_token(&headers), None);

        headers.insert(header::COOKIE, "token=; theme=dark".parse().unwrap());
        assert_eq!(transport(false).read_token(&headers), None);

        headers.insert(header::COOKIE, "mytoken=abc".parse().unwrap());
        assert_eq!(transport(false).read_token(&headers), None);
    }

    #[test]
    fn test_write_token_attributes() {
        let mut headers = HeaderMap::new();
        transport(true).write_token(&mut headers, "abc");

        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_clear_token() {
        let mut headers = HeaderMap::new();
        transport(false).clear_token(&mut headers);

        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_same_site_parse() {
        assert_eq!(SameSite::parse("LAX"), Some(SameSite::Lax));
        assert_eq!(SameSite::parse("none"), Some(SameSite::None));
        assert_eq!(SameSite::parse("sometimes"), None);
    }
}
