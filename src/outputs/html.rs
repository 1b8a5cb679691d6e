//! HTML rendering of the model's summary.
//!
//! The fragment is a fixed Tailwind-styled card: headline, one-line summary,
//! three explanation sections, a "think about it" box, the key-term glossary
//! and a link back to the original article. Field text is inserted as-is.

use crate::error::SchemaError;
use crate::models::{KeyTerm, RenderedDocument, SummaryPayload};
use crate::utils::{looks_truncated, truncate_for_log};
use serde_json::Value;
use std::fmt::Write;
use tracing::{debug, instrument, warn};

/// Parse and validate the raw model response.
///
/// Fields are checked in [`SummaryPayload::REQUIRED_FIELDS`] order and the
/// first missing one is reported.
pub fn parse_summary(raw: &str) -> Result<SummaryPayload, SchemaError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        if looks_truncated(&e) {
            warn!(error = %e, "Model response looks truncated");
        }
        SchemaError::from(e)
    })?;

    let Some(object) = value.as_object() else {
        return Err(SchemaError::Malformed("top-level value is not an object".into()));
    };
    if let Some(missing) = SummaryPayload::REQUIRED_FIELDS
        .iter()
        .find(|field| !object.contains_key(**field))
    {
        return Err(SchemaError::MissingField(*missing));
    }

    Ok(serde_json::from_value(value)?)
}

/// Render a raw model response into the post body.
#[instrument(level = "info", skip_all, fields(%article_url))]
pub fn render(raw: &str, article_url: &str) -> Result<RenderedDocument, SchemaError> {
    let payload = parse_summary(raw).inspect_err(|e| {
        warn!(
            error = %e,
            response_preview = %truncate_for_log(raw, 300),
            "Rejected model response"
        );
    })?;
    let html = render_payload(&payload, article_url);
    debug!(bytes = html.as_str().len(), key_terms = payload.key_terms.len(), "Rendered HTML");
    Ok(html)
}

/// Render an already validated payload.
pub fn render_payload(payload: &SummaryPayload, article_url: &str) -> RenderedDocument {
    let mut out = String::new();

    write!(
        out,
        r#"
    <div class="max-w-3xl mx-auto my-8 sm:my-12">
        <div class="bg-white rounded-xl shadow-lg overflow-hidden">
            <div class="p-6 sm:p-10">

                <h1 class="text-3xl sm:text-4xl font-bold text-gray-900 leading-tight mb-4">
                    {title}
                </h1>

                <div class="bg-blue-50 border-l-4 border-blue-400 p-4 rounded-r-lg mb-10">
                    <p class="text-base sm:text-lg font-semibold text-blue-800">
                        <span class="font-bold">한 줄 요약!</span>
                        {summary}
                    </p>
                </div>

                <div class="space-y-10">"#,
        title = payload.title,
        summary = payload.summary,
    )
    .unwrap();

    section(&mut out, "💡", "무슨 뜻일까요?", &payload.meaning);
    section(&mut out, "🌍", "이게 왜 중요할까요?", &payload.importance);
    section(&mut out, "👨‍👩‍👧‍👦", "나와 우리 가족에게는?", &payload.impact_on_us);

    write!(
        out,
        r#"
                    <div class="bg-yellow-50 border-2 border-dashed border-yellow-400 p-6 rounded-lg">
                        <h2 class="text-xl font-bold text-yellow-900 mb-3 flex items-center">
                            <span class="text-2xl mr-3">🤔</span>
                            슬기롭게 생각해 보기
                        </h2>
                        <p class="text-yellow-800 text-base sm:text-lg leading-relaxed">
                            {food_for_thought}
                        </p>
                    </div>

                </div>

                <hr class="my-10 border-gray-200">

                <div class="bg-gray-50 p-6 rounded-lg">
                    <h2 class="text-2xl font-bold text-gray-800 mb-5 flex items-center">
                        <span class="text-3xl mr-3">🔍</span>
                        오늘의 경제 용어 돋보기
                    </h2>
                    <ul class="space-y-4">"#,
        food_for_thought = payload.food_for_thought,
    )
    .unwrap();

    for term in &payload.key_terms {
        key_term(&mut out, term);
    }

    write!(
        out,
        r#"
                    </ul>
                </div>

                <hr class="my-8 border-gray-200">

                <div class="text-center">
                    <a href="{article_url}"
                       target="_blank"
                       rel="noopener noreferrer"
                       class="inline-flex items-center px-6 py-3 bg-blue-600 text-white font-semibold rounded-lg hover:bg-blue-700 transition-colors duration-200 shadow-md hover:shadow-lg">
                        <span class="text-xl mr-2">📰</span>
                        뉴스 원본 보기
                        <span class="ml-2">↗</span>
                    </a>
                </div>

            </div>
        </div>
    </div>
    "#,
    )
    .unwrap();

    RenderedDocument::new(out)
}

fn section(out: &mut String, icon: &str, heading: &str, text: &str) {
    write!(
        out,
        r#"
                    <div>
                        <h2 class="text-2xl font-bold text-gray-800 mb-3 flex items-center">
                            <span class="text-3xl mr-3">{icon}</span>
                            {heading}
                        </h2>
                        <p class="text-gray-700 text-base sm:text-lg leading-relaxed">
                            {text}
                        </p>
                    </div>
"#
    )
    .unwrap();
}

fn key_term(out: &mut String, term: &KeyTerm) {
    write!(
        out,
        r#"
                        <li class="border-l-4 border-green-500 pl-4">
                            <strong class="font-bold text-green-700 text-lg block">
                                {}
                            </strong>
                            <span class="text-gray-600">
                                {}
                            </span>
                        </li>"#,
        term.term, term.definition
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "https://example.com/a1";

    fn sample() -> Value {
        json!({
            "title": "T",
            "summary": "S",
            "meaning": "M",
            "importance": "I",
            "impact_on_us": "U",
            "food_for_thought": "F",
            "key_terms": [
                {"term": "GDP", "definition": "나라 전체가 번 돈"},
                {"term": "금리", "definition": "돈을 빌린 값"}
            ]
        })
    }

    fn without(field: &str) -> String {
        let mut value = sample();
        value.as_object_mut().unwrap().remove(field);
        value.to_string()
    }

    #[test]
    fn test_render_contains_every_field_and_link() {
        let doc = render(&sample().to_string(), URL).unwrap();
        let html = doc.as_str();
        for needle in ["T", "S", "M", "I", "U", "F", "GDP", "나라 전체가 번 돈"] {
            assert!(html.contains(needle), "missing {needle}");
        }
        assert!(html.contains(r#"<a href="https://example.com/a1""#));
        assert_eq!(html.matches("<a href=").count(), 1);
    }

    #[test]
    fn test_render_keeps_key_term_order() {
        let doc = render(&sample().to_string(), URL).unwrap();
        let html = doc.as_str();
        let gdp = html.find("GDP").unwrap();
        let rate = html.find("금리").unwrap();
        assert!(gdp < rate);
        assert_eq!(html.matches("<li ").count(), 2);
    }

    #[test]
    fn test_render_is_deterministic() {
        let raw = sample().to_string();
        assert_eq!(render(&raw, URL).unwrap(), render(&raw, URL).unwrap());
    }

    #[test]
    fn test_render_embeds_text_verbatim() {
        let mut value = sample();
        value["summary"] = json!("<b>굵게</b> & 그대로");
        let doc = render(&value.to_string(), URL).unwrap();
        assert!(doc.as_str().contains("<b>굵게</b> & 그대로"));
    }

    #[test]
    fn test_empty_key_terms_render() {
        let mut value = sample();
        value["key_terms"] = json!([]);
        let doc = render(&value.to_string(), URL).unwrap();
        assert_eq!(doc.as_str().matches("<li ").count(), 0);
    }

    #[test]
    fn test_missing_meaning_is_reported() {
        assert_eq!(
            render(&without("meaning"), URL),
            Err(SchemaError::MissingField("meaning"))
        );
    }

    #[test]
    fn test_each_missing_field_is_reported() {
        for field in SummaryPayload::REQUIRED_FIELDS {
            assert_eq!(
                parse_summary(&without(field)),
                Err(SchemaError::MissingField(field)),
                "field {field}"
            );
        }
    }

    #[test]
    fn test_first_missing_field_wins() {
        let mut value = sample();
        let object = value.as_object_mut().unwrap();
        object.remove("key_terms");
        object.remove("importance");
        object.remove("summary");
        assert_eq!(
            parse_summary(&value.to_string()),
            Err(SchemaError::MissingField("summary"))
        );
    }

    #[test]
    fn test_malformed_json_is_schema_error() {
        assert!(matches!(render("{\"title\": ", URL), Err(SchemaError::Malformed(_))));
        assert!(matches!(render("not json", URL), Err(SchemaError::Malformed(_))));
        assert!(matches!(render("[1, 2]", URL), Err(SchemaError::Malformed(_))));
    }

    #[test]
    fn test_bad_key_term_shape_is_schema_error() {
        let mut value = sample();
        value["key_terms"] = json!([{"term": "GDP"}]);
        assert!(matches!(
            render(&value.to_string(), URL),
            Err(SchemaError::Malformed(_))
        ));
    }
}
