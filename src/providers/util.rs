use crate::core::error::SourceError;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use scraper::ElementRef;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Search and detail pages.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(10);
/// The disclosure listing page.
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(30);
/// Disclosure document downloads.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}

/// A client that presents itself like a desktop browser.
pub fn browser_client(url: &str, timeout: Duration) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .default_headers(browser_headers())
        .timeout(timeout)
        .build()
        .map_err(|source| SourceError::Request {
            url: url.to_string(),
            source,
        })
}

async fn get(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, SourceError> {
    debug!("Requesting {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| SourceError::Request {
            url: url.to_string(),
            source,
        })?;
    if !response.status().is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}

pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, SourceError> {
    get(client, url)
        .await?
        .text()
        .await
        .map_err(|source| SourceError::Request {
            url: url.to_string(),
            source,
        })
}

pub async fn get_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, SourceError> {
    let bytes = get(client, url)
        .await?
        .bytes()
        .await
        .map_err(|source| SourceError::Request {
            url: url.to_string(),
            source,
        })?;
    Ok(bytes.to_vec())
}

/// Resolves `href` against `base`; absolute links are returned unchanged.
pub fn absolute_url(base: &str, href: &str) -> Result<String, SourceError> {
    Ok(Url::parse(base)?.join(href)?.to_string())
}

/// Form-encodes a search query (`Axis Bluechip` becomes `Axis+Bluechip`).
pub fn encode_query(query: &str) -> String {
    url::form_urlencoded::byte_serialize(query.as_bytes()).collect()
}

/// Visible text of a cell with whitespace runs between nodes collapsed.
pub fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://www.example.com", "/funds/123/axis").unwrap(),
            "https://www.example.com/funds/123/axis"
        );
        assert_eq!(
            absolute_url("https://www.example.com/a/b", "https://other.com/x").unwrap(),
            "https://other.com/x"
        );
        assert!(absolute_url("not a url", "/x").is_err());
    }

    #[test]
    fn test_encode_query() {
        assert_eq!(encode_query("Axis Bluechip Fund"), "Axis+Bluechip+Fund");
        assert_eq!(encode_query("L&T Midcap"), "L%26T+Midcap");
    }

    #[test]
    fn test_cell_text_joins_nodes() {
        let html = Html::parse_fragment("<table><tr><td> <a>HDFC Bank</a>\n <span>Ltd</span> </td></tr></table>");
        let td = Selector::parse("td").unwrap();
        let cell = html.select(&td).next().unwrap();
        assert_eq!(cell_text(cell), "HDFC Bank Ltd");
    }

    #[tokio::test]
    async fn test_get_text_rejects_error_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let client = browser_client(&url, PAGE_TIMEOUT).unwrap();
        let err = get_text(&client, &url).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }
}
