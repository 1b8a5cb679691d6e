//! # Kids News Explainer
//!
//! Takes the first story of a newspaper's front page, asks Gemini to explain
//! it for children, and publishes the explanation as a blog post.
//!
//! ## Usage
//!
//! ```sh
//! kids_news_explainer --date 2025-05-06
//! ```
//!
//! ## Architecture
//!
//! One run is a straight line:
//! 1. **Locating**: find the first article on the dated front page
//! 2. **Extracting**: scrape its title and body
//! 3. **Summarizing**: call Gemini, retrying on overload
//! 4. **Rendering**: validate the JSON reply and build the HTML fragment
//! 5. **Publishing**: create the blog post; a Telegram message goes out if
//!    that fails
//!
//! Failures in steps 1–4 are only logged. Only a publishing failure is sent
//! to Telegram.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod notify;
mod outputs;
mod pipeline;
mod publish;
mod scrapers;
mod utils;

use api::GeminiClient;
use cli::Cli;
use config::{FileConfig, Settings, SystemPrompt};
use error::PipelineError;
use notify::TelegramNotifier;
use pipeline::{Pipeline, post_draft, publish_failure_message};
use publish::BlogClient;
use scrapers::HttpFetcher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("kids_news_explainer starting up");

    if let Err(e) = dotenvy::dotenv() {
        debug!(error = %e, "No .env file loaded");
    }

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Configuration problems end the run before any network activity.
    let settings = Settings::from_env().inspect_err(|e| error!(error = %e, "Invalid environment"))?;
    let file_config = FileConfig::load(args.config.as_deref()).await?;
    let prompt = SystemPrompt::load(&args.prompt).await?;
    info!(?settings, "Configuration loaded");

    let notifier = TelegramNotifier::new(
        settings.telegram_bot_token.clone(),
        settings.telegram_chat_test_id.clone(),
    );

    if let Err(e) = run(&args, &settings, &file_config, prompt, &notifier).await {
        error!(error = %e, "Run failed");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run(
    args: &Cli,
    settings: &Settings,
    file_config: &FileConfig,
    prompt: SystemPrompt,
    notifier: &TelegramNotifier,
) -> Result<(), PipelineError> {
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    info!(%date, press_code = %settings.press_code, "Building post");

    let user_agent = utils::random_user_agent();
    debug!(user_agent, "Picked user agent");
    let fetcher = HttpFetcher::new(user_agent)?;
    let gemini = GeminiClient::new(
        settings.google_api_key.clone(),
        settings.gemini_model.clone(),
        prompt,
    )
    .with_temperature(file_config.model.temperature);

    let pipeline = Pipeline::new(
        fetcher,
        gemini,
        settings.press_code.clone(),
        file_config.model.retry_policy(),
    );
    let built = pipeline.build_post(date).await?;

    if let Some(path) = &args.html_output {
        tokio::fs::write(path, built.document.as_str()).await?;
        info!(path = %path.display(), "Wrote rendered HTML");
    }

    if args.dry_run {
        info!(article = %built.article.url, "Dry run; skipping publish");
        return Ok(());
    }

    let draft = post_draft(date, &built.document, &file_config.post);
    let blog = BlogClient::new(settings.base_url.clone());
    info!(url = %blog.posts_url(), "Creating post");
    match blog.create_post(&draft).await {
        Ok(()) => {
            info!(title = %draft.title, "Post published");
            Ok(())
        }
        Err(e) => {
            if !notifier.send_test_message(&publish_failure_message(&e.message)).await {
                warn!("Publish failure notification was not delivered");
            }
            error!(status = ?e.status, error = %e, "Post creation failed");
            Err(e.into())
        }
    }
}
