//! Cookie jar entries.

use serde::{Deserialize, Serialize};

/// SameSite policy of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// A browser cookie as stored in the cookie-jar JSON file.
///
/// Field names follow the common `name,value,domain,path,expires,httpOnly,
/// secure,sameSite` layout so files can be exchanged with other tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix timestamp in seconds; `-1` for session cookies.
    #[serde(default = "default_expires")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_expires() -> f64 {
    -1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_uses_camel_case_fields() {
        let cookie = Cookie {
            name: "sid".to_string(),
            value: "abc".to_string(),
            domain: ".example.com".to_string(),
            path: "/".to_string(),
            expires: 1_900_000_000.0,
            http_only: true,
            secure: true,
            same_site: Some(SameSite::Lax),
        };
        let json = serde_json::to_value(&cookie).unwrap();
        assert_eq!(json["httpOnly"], true);
        assert_eq!(json["sameSite"], "Lax");
    }

    #[test]
    fn test_cookie_defaults() {
        let cookie: Cookie = serde_json::from_str(r#"{"name":"a","value":"b"}"#).unwrap();
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.expires, -1.0);
        assert!(!cookie.http_only);
        assert!(cookie.same_site.is_none());
    }
}
