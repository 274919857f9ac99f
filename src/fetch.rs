use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Url;
use tracing::info;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// `Some(url)` when `input` is an absolute http(s) URL.
pub fn as_url(input: &str) -> Option<Url> {
    let url = Url::parse(input).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Read the document named by `input`: fetched when it is a URL, read from
/// disk otherwise.
pub async fn load_source(input: &str) -> Result<Vec<u8>> {
    match as_url(input) {
        Some(url) => fetch_url(url).await,
        None => tokio::fs::read(input)
            .await
            .with_context(|| format!("Failed to read {}", input)),
    }
}

async fn fetch_url(url: Url) -> Result<Vec<u8>> {
    info!("Fetching HTML from {}", url);

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_str(url.as_str())?);

    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let resp = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    let status = resp.status();
    if !status.is_success() {
        bail!("Failed to fetch {}: HTTP {}", url, status);
    }

    let body = resp.bytes().await.context("Failed to read response body")?;
    info!("Fetched {} bytes", body.len());
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_urls() {
        assert!(as_url("https://example.org/page").is_some());
        assert!(as_url("http://localhost:8080").is_some());
        assert!(as_url("ftp://example.org/file").is_none());
        assert!(as_url("pages/index.html").is_none());
        assert!(as_url("/tmp/index.html").is_none());
    }

    #[tokio::test]
    async fn reads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p>hi</p>").unwrap();
        let bytes = load_source(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"<p>hi</p>");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = load_source("definitely/not/here.html").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
