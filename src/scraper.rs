use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use once_cell::sync::Lazy;
use url::Url;
use crate::error::{AppError, Result};

// Create static selectors to avoid recompiling them each time
static ARTICLE_PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("article p").expect("Failed to parse article paragraph selector")
});

static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p").expect("Failed to parse paragraph selector")
});

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to parse body selector")
});

/// Downloads a page and returns its readable text.
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String>;
}

pub struct HtmlArticleExtractor {
    client: Client,
}

impl HtmlArticleExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .pool_max_idle_per_host(10)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ArticleExtractor for HtmlArticleExtractor {
    async fn extract(&self, url: &str) -> Result<String> {
        let url = parse_url(url)?;

        let response = self.client.get(url.clone()).send().await?;
        check_status(&url, response.status())?;

        let html = response.text().await?;
        tracing::debug!(url = %url, bytes = html.len(), "downloaded page");

        Ok(extract_text(&html))
    }
}

fn check_status(url: &Url, status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AppError::SourceFetch(format!("{} returned {}", url, status)))
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::SourceFetch(format!("invalid URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::SourceFetch(format!("unsupported URL scheme '{}'", other))),
    }
}

/// Readable text of a page: article paragraphs, then any paragraphs, then the whole body.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let paragraphs = join_elements(document.select(&ARTICLE_PARAGRAPH_SELECTOR));
    if !paragraphs.is_empty() {
        return paragraphs;
    }

    let paragraphs = join_elements(document.select(&PARAGRAPH_SELECTOR));
    if !paragraphs.is_empty() {
        return paragraphs;
    }

    join_elements(document.select(&BODY_SELECTOR))
}

fn join_elements<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> String {
    elements
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if matches!(name, "script" | "style" | "noscript" | "template") {
                continue;
            }
            collect_text(child_element, out);
            if is_block(name) {
                out.push(' ');
            }
        }
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "br" | "li" | "ul" | "ol" | "section" | "article" | "header" | "footer"
            | "nav" | "aside" | "blockquote" | "pre" | "table" | "tr" | "td" | "th"
            | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
