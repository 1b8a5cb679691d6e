//! Naver newspaper front-page scraper.
//!
//! The dated listing lives at
//! `https://media.naver.com/press/{press_code}/newspaper?date={YYYYMMDD}`. The
//! first story of the print front page is the first entry of the
//! `newspaper_article_lst` list inside the `_start_page` brick.

use super::PageFetcher;
use crate::error::PipelineError;
use crate::models::{ArticleContent, ArticleReference, MISSING_BODY, MISSING_TITLE};
use crate::utils::listing_date;
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

const LISTING_BASE: &str = "https://media.naver.com/press";

static BRICK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.newspaper_brick_item._start_page").unwrap());
static ARTICLE_LIST: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul.newspaper_article_lst").unwrap());
static LIST_ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.media_end_head_title").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("div#newsct_article").unwrap());

/// URL of the front-page listing for `press_code` on `date`.
pub fn listing_url(press_code: &str, date: NaiveDate) -> String {
    format!(
        "{}/{}/newspaper?date={}",
        LISTING_BASE,
        press_code,
        listing_date(date)
    )
}

/// Find the first article on the publisher's front page for `date`.
#[instrument(level = "info", skip(fetcher))]
pub async fn locate_first_article<F: PageFetcher>(
    fetcher: &F,
    press_code: &str,
    date: NaiveDate,
) -> Result<ArticleReference, PipelineError> {
    let url = listing_url(press_code, date);
    let html = fetcher.fetch(&url).await?;
    let reference = parse_first_article(&html, &url)?;
    info!(article_url = %reference.url, "Located front-page article");
    Ok(reference)
}

/// Walk brick → list → first item → anchor → `href` in a listing page.
///
/// `page_url` is used to resolve relative links.
pub fn parse_first_article(html: &str, page_url: &str) -> Result<ArticleReference, PipelineError> {
    let document = Html::parse_document(html);

    let brick = document
        .select(&BRICK)
        .next()
        .ok_or_else(|| PipelineError::Parse("front-page brick section not found".into()))?;
    let list = brick
        .select(&ARTICLE_LIST)
        .next()
        .ok_or_else(|| PipelineError::Parse("article list not found in front-page brick".into()))?;
    let first_item = list
        .select(&LIST_ITEM)
        .next()
        .ok_or_else(|| PipelineError::Parse("article list is empty".into()))?;
    let href = first_item
        .select(&ANCHOR)
        .next()
        .ok_or_else(|| PipelineError::Parse("first list item has no link".into()))?
        .value()
        .attr("href")
        .ok_or_else(|| PipelineError::Parse("first article link has no href".into()))?;

    let base = Url::parse(page_url)
        .map_err(|e| PipelineError::Parse(format!("invalid listing url {page_url}: {e}")))?;
    let resolved = base
        .join(href)
        .map_err(|e| PipelineError::Parse(format!("invalid article link {href:?}: {e}")))?;

    Ok(ArticleReference {
        url: resolved.to_string(),
    })
}

/// Download an article and extract its title and body.
///
/// Missing title or body markup is not an error; the placeholders
/// [`MISSING_TITLE`] and [`MISSING_BODY`] are used instead.
#[instrument(level = "info", skip(fetcher))]
pub async fn extract_article<F: PageFetcher>(
    fetcher: &F,
    url: &str,
) -> Result<ArticleContent, PipelineError> {
    let html = fetcher.fetch(url).await?;
    let content = parse_article(&html);
    info!(
        title = %content.title,
        body_bytes = content.body.len(),
        "Extracted article"
    );
    Ok(content)
}

/// Pull title and body text out of an article page.
pub fn parse_article(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| stripped_text(el, ""))
        .unwrap_or_else(|| {
            debug!("Title container missing");
            MISSING_TITLE.to_string()
        });
    let body = document
        .select(&BODY)
        .next()
        .map(|el| stripped_text(el, "\n"))
        .unwrap_or_else(|| {
            debug!("Body container missing");
            MISSING_BODY.to_string()
        });

    ArticleContent { title, body }
}

/// Elements whose text is never part of the visible article.
const NON_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "template"];

/// Every visible text node of `el`, trimmed, empties dropped, joined by `sep`.
///
/// Text inside [`NON_TEXT_ELEMENTS`] (inline ad scripts, stylesheets) is
/// skipped.
fn stripped_text(el: ElementRef<'_>, sep: &str) -> String {
    el.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|e| NON_TEXT_ELEMENTS.contains(&e.name()))
            });
            (!hidden).then_some(&**text)
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .join(sep)
}
