//! The per-run pipeline: locate → extract → summarize → render.
//!
//! Publishing and notification are done by the caller once a document has
//! been produced, so that stage failures and publish failures can be handled
//! differently.

use crate::api::{AskAsync, RetryPolicy, summarize};
use crate::config::PostConfig;
use crate::error::PipelineError;
use crate::models::{ArticleReference, PostDraft, RenderedDocument};
use crate::outputs::html;
use crate::scrapers::{PageFetcher, naver};
use crate::utils::{display_date, truncate_for_log};
use chrono::NaiveDate;
use tracing::{debug, error, info, instrument};

/// Result of a successful run up to (not including) publishing.
#[derive(Debug, Clone)]
pub struct BuiltPost {
    pub article: ArticleReference,
    pub document: RenderedDocument,
}

pub struct Pipeline<F, A> {
    fetcher: F,
    asker: A,
    press_code: String,
    retry: RetryPolicy,
}

impl<F: PageFetcher, A: AskAsync> Pipeline<F, A> {
    pub fn new(fetcher: F, asker: A, press_code: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            asker,
            press_code: press_code.into(),
            retry,
        }
    }

    /// Run every stage for `date`. The first failing stage aborts the run.
    #[instrument(level = "info", skip(self), fields(press_code = %self.press_code))]
    pub async fn build_post(&self, date: NaiveDate) -> Result<BuiltPost, PipelineError> {
        let article = naver::locate_first_article(&self.fetcher, &self.press_code, date).await?;
        info!(url = %article.url, "Article link");

        let content = naver::extract_article(&self.fetcher, &article.url).await?;
        info!(title = %content.title, "Article title");
        debug!(body = %content.body, "Article body");

        let response = summarize(&self.asker, &content.title, &content.body, self.retry).await;
        let Some(response) = response else {
            error!("Gemini call failed");
            return Err(PipelineError::Summarization);
        };
        info!(response = %truncate_for_log(&response, 2000), "Gemini response");

        let document = html::render(&response, &article.url)?;
        debug!(html = %document, "Rendered document");

        Ok(BuiltPost { article, document })
    }
}

/// Assemble the blog post for `date` from a rendered document.
pub fn post_draft(date: NaiveDate, document: &RenderedDocument, post: &PostConfig) -> PostDraft {
    PostDraft {
        title: format!("{} {}", display_date(date), post.title_suffix),
        content: document.as_str().to_string(),
        category: post.category.clone(),
        writer: post.writer.clone(),
        image_paths: post.images.clone(),
        thumbnail_path: post.thumbnail.clone(),
    }
}

/// Notification text for a failed publish.
pub fn publish_failure_message(message: &str) -> String {
    format!("❌ [ai-news-explainer] API 오류 발생\n\n{message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AskError;
    use crate::api::testing::ScriptedAsk;
    use crate::error::SchemaError;
    use crate::scrapers::testing::StaticFetcher;

    const LISTING: &str = "https://media.naver.com/press/009/newspaper?date=20250506";
    const ARTICLE: &str = "https://example.com/a1";
    const MODEL_JSON: &str = r#"{"title":"T","summary":"S","meaning":"M","importance":"I","impact_on_us":"U","food_for_thought":"F","key_terms":[{"term":"GDP","definition":"..."}]}"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    fn fetcher() -> StaticFetcher {
        StaticFetcher::default()
            .with_page(
                LISTING,
                r#"<html><body>
                   <div class="newspaper_brick_item _start_page">
                     <ul class="newspaper_article_lst">
                       <li><a href="https://example.com/a1">첫 기사</a></li>
                       <li><a href="https://example.com/a2">둘째 기사</a></li>
                     </ul>
                   </div></body></html>"#,
            )
            .with_page(
                ARTICLE,
                r#"<html><body>
                   <div class="media_end_head_title"><h2>테스트 제목</h2></div>
                   <div id="newsct_article">본문1<br>본문2</div>
                   </body></html>"#,
            )
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_renders_document() {
        let asker = ScriptedAsk::new(vec![Ok(MODEL_JSON.to_string())]);
        let pipeline = Pipeline::new(fetcher(), &asker, "009", RetryPolicy::default());

        let built = pipeline.build_post(date()).await.unwrap();

        assert_eq!(built.article.url, ARTICLE);
        let html = built.document.as_str();
        assert!(html.contains("T"));
        assert!(html.contains("S"));
        assert!(html.contains("GDP"));
        assert!(html.contains("https://example.com/a1"));
        assert_eq!(asker.calls(), 1);
        assert_eq!(
            asker.last_text().as_deref(),
            Some("뉴스 제목: 테스트 제목\n뉴스 본문: 본문1\n본문2")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_summarization_failure_aborts_before_render() {
        let asker = ScriptedAsk::new(vec![Err(AskError::Fatal("403 PERMISSION_DENIED".into()))]);
        let pipeline = Pipeline::new(fetcher(), &asker, "009", RetryPolicy::default());

        let result = pipeline.build_post(date()).await;

        assert!(matches!(result, Err(PipelineError::Summarization)));
        assert_eq!(asker.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_model_output_is_schema_error() {
        let asker = ScriptedAsk::new(vec![Ok(r#"{"title":"T"}"#.to_string())]);
        let pipeline = Pipeline::new(fetcher(), &asker, "009", RetryPolicy::default());

        match pipeline.build_post(date()).await {
            Err(PipelineError::Schema(SchemaError::MissingField(field))) => {
                assert_eq!(field, "summary")
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_listing_stops_before_model() {
        let asker = ScriptedAsk::new(vec![Ok(MODEL_JSON.to_string())]);
        let fetcher = StaticFetcher::default();
        let pipeline = Pipeline::new(fetcher, &asker, "009", RetryPolicy::default());

        let result = pipeline.build_post(date()).await;

        assert!(matches!(result, Err(PipelineError::Fetch { .. })));
        assert_eq!(asker.calls(), 0);
    }

    #[test]
    fn test_post_draft_uses_config() {
        let document = html::render(MODEL_JSON, ARTICLE).unwrap();
        let draft = post_draft(date(), &document, &PostConfig::default());

        assert_eq!(draft.title, "2025-05-06 오늘의 어린이 뉴스");
        assert_eq!(draft.category, "어린이뉴스");
        assert_eq!(draft.writer, "admin");
        assert!(draft.image_paths.is_empty());
        assert_eq!(draft.content, document.as_str());
    }

    #[test]
    fn test_publish_failure_message() {
        assert_eq!(
            publish_failure_message("서버 오류"),
            "❌ [ai-news-explainer] API 오류 발생\n\n서버 오류"
        );
    }
}
