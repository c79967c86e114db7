use crate::api::models::SummarizeRequest;
use crate::error::{AppError, Result};
use crate::scraper::ArticleExtractor;

/// Produces the plain text a summarize request refers to.
///
/// A URL takes precedence over inline text: the page is downloaded and its
/// extracted text replaces whatever `text` the request carried.
pub async fn resolve(request: &SummarizeRequest, extractor: &dyn ArticleExtractor) -> Result<String> {
    let text = non_empty(request.text.as_deref());
    let url = non_empty(request.url.as_deref());

    let resolved = match (text, url) {
        (None, None) => {
            return Err(AppError::InvalidInput("No text or URL provided.".to_string()));
        }
        (_, Some(url)) => {
            tracing::info!(url = %url, "fetching article");
            extractor.extract(url).await.map_err(|e| match e {
                AppError::SourceFetch(_) => e,
                other => AppError::SourceFetch(other.to_string()),
            })?
        }
        (Some(text), None) => text.to_string(),
    };

    if resolved.trim().is_empty() {
        return Err(AppError::InvalidInput("No valid text found to summarize.".to_string()));
    }

    Ok(resolved)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
