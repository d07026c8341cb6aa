//! Crawler-facing text files: robots.txt and the IndexNow key file.

use crate::config::{BaseUrl, ConfigError};

/// Render robots.txt advertising the sitemaps
pub fn robots_txt(base: &BaseUrl, news_sitemap: bool) -> String {
    let mut out = String::from("User-agent: *\nAllow: /\nDisallow: /admin\n\n");
    out.push_str(&format!("Sitemap: {}\n", base.join("/sitemap.xml")));
    if news_sitemap {
        out.push_str(&format!("Sitemap: {}\n", base.join("/news-sitemap.xml")));
    }
    out
}

/// IndexNow keys are 8-128 characters of `[A-Za-z0-9-]`
pub fn validate_indexnow_key(key: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        field: "indexnow.key".into(),
        reason: reason.to_string(),
    };
    if !(8..=128).contains(&key.len()) {
        return Err(invalid("must be 8 to 128 characters long"));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("may only contain letters, digits and '-'"));
    }
    Ok(())
}

/// File name under which the key is served at the site root
pub fn indexnow_key_file(key: &str) -> String {
    format!("{key}.txt")
}
