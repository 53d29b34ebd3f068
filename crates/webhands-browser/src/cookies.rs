//! Cookie jar file: a JSON array of cookie objects.

use std::path::Path;

use webhands_protocols::Cookie;

use crate::context::BrowserResult;

/// Read the jar at `path`. A missing file is an empty jar.
pub async fn load(path: &Path) -> BrowserResult<Vec<Cookie>> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(Vec::new());
    }
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Write `cookies` to `path`, creating parent directories.
pub async fn save(path: &Path, cookies: &[Cookie]) -> BrowserResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let content = serde_json::to_string_pretty(cookies)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use webhands_protocols::SameSite;

    #[tokio::test]
    async fn test_missing_file_is_empty_jar() {
        let dir = tempfile::tempdir().unwrap();
        let jar = load(&dir.path().join("nope.json")).await.unwrap();
        assert!(jar.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies.json");
        let cookie = Cookie {
            name: "session".into(),
            value: "abc".into(),
            domain: ".example.com".into(),
            path: "/".into(),
            expires: 1_900_000_000.0,
            http_only: true,
            secure: true,
            same_site: Some(SameSite::Lax),
        };
        save(&path, std::slice::from_ref(&cookie)).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"httpOnly\": true"));
        assert!(raw.contains("\"sameSite\": \"Lax\""));

        let jar = load(&path).await.unwrap();
        assert_eq!(jar, vec![cookie]);
    }

    #[tokio::test]
    async fn test_malformed_jar_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load(&path).await.is_err());
    }
}
