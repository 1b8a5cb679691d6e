//! Command-line interface definitions.
//!
//! Secrets and endpoints come from the environment (see [`crate::config`]);
//! the flags here only adjust a single run.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Today's front page, published to the blog
/// kids_news_explainer
///
/// # A past date, rendered to a file without publishing
/// kids_news_explainer --date 2025-05-06 --dry-run --html-output ./out.html
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Front-page date (YYYY-MM-DD); defaults to today in local time
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// System prompt file sent with every model call
    #[arg(short, long, default_value = "prompt.md")]
    pub prompt: PathBuf,

    /// Optional YAML file with post metadata and model settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write the rendered HTML to this file
    #[arg(long)]
    pub html_output: Option<PathBuf>,

    /// Build the post but do not publish it
    #[arg(long)]
    pub dry_run: bool,
}
