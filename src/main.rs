//! LineRun - Subtitle Line Translation Practice
//!
//! Command-line front end: evaluates translations, records practice attempts and
//! reports history, progress and statistics.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};

use linerun::catalog::Catalog;
use linerun::cli::{Args, Commands};
use linerun::config::Config;
use linerun::error::LineRunError;
use linerun::evaluate::{EvaluationRequest, EvaluationResult, EvaluationSource, Evaluator, EvaluatorFactory};
use linerun::storage::{PracticeRecord, PracticeStore, UserProgress};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    // Setup logging to both console and file
    let _log_guard = setup_logging(args.verbose, &config.storage.data_dir)?;

    let store = PracticeStore::new(&config.storage.data_dir);
    let catalog = match &config.storage.catalog_path {
        Some(path) => Catalog::from_file(path)?,
        None => Catalog::builtin()?,
    };

    match args.command {
        Commands::Evaluate { source, target, translation, offline } => {
            config.evaluator.offline |= offline;
            let request = EvaluationRequest::new(translation, source, target)?;
            let evaluator = EvaluatorFactory::create_evaluator(&config.evaluator)?;

            let (result, origin) = evaluator.evaluate_detailed(&request).await;
            print_result(&result, origin, args.json)?;
        }
        Commands::Practice { episode, index, translation, offline } => {
            config.evaluator.offline |= offline;
            let episode = catalog.episode(&episode)?;
            let show = catalog
                .show(&episode.show_id)
                .ok_or_else(|| LineRunError::NotFound(format!("show '{}'", episode.show_id)))?;

            let index = match index {
                Some(index) => index,
                None => {
                    let progress = store.show_progress(&show.id).await?;
                    UserProgress::resume_index(progress.as_ref(), &episode.id, episode.dialogues.len())
                }
            };
            let dialogue = catalog.dialogue(&episode.id, index)?;

            let request = EvaluationRequest::new(translation, &dialogue.chinese, &dialogue.english)?;
            let evaluator = EvaluatorFactory::create_evaluator(&config.evaluator)?;

            info!("Practicing {} line {}: {}", episode.id, index + 1, dialogue.chinese);
            let (result, origin) = evaluator.evaluate_detailed(&request).await;

            store
                .save_record(PracticeRecord::new(show, episode, dialogue, &request.user_translation, &result))
                .await?;
            store
                .save_progress(UserProgress {
                    show_id: show.id.clone(),
                    episode_id: episode.id.clone(),
                    dialogue_index: index,
                    last_practice_time: Utc::now(),
                })
                .await?;

            if !args.json {
                println!("\n[{} {}/{}] {}", episode.title_en, index + 1, episode.dialogues.len(), dialogue.chinese);
            }
            print_result(&result, origin, args.json)?;

            if !args.json && index + 1 >= episode.dialogues.len() {
                println!("\nEpisode complete!");
            }
        }
        Commands::Shows => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(catalog.shows())?);
            } else {
                println!("{:<22} {:<22} {:<14} {:<10}", "ID", "Title", "Title (zh)", "Seasons");
                println!("{}", "-".repeat(70));
                for show in catalog.shows() {
                    println!("{:<22} {:<22} {:<14} {:<10}", show.id, show.title_en, show.title, show.seasons.len());
                }
            }
        }
        Commands::Episodes { show } => {
            let show = catalog
                .show(&show)
                .ok_or_else(|| LineRunError::NotFound(format!("show '{}'", show)))?;
            let episodes: Vec<_> = catalog.episodes_for(&show.id).collect();

            if args.json {
                println!("{}", serde_json::to_string_pretty(&episodes)?);
            } else if episodes.is_empty() {
                println!("No episodes available for {}.", show.title_en);
            } else {
                println!("{:<18} {:<8} {:<24} {:<6}", "ID", "Episode", "Title", "Lines");
                println!("{}", "-".repeat(60));
                for episode in episodes {
                    println!("{:<18} S{:02}E{:02}   {:<24} {:<6}",
                        episode.id, episode.season, episode.episode, episode.title_en, episode.dialogues.len());
                }
            }
        }
        Commands::History { limit } => {
            let mut records = store.records().await?;
            records.reverse();
            records.truncate(limit);

            if args.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No practice records yet.");
            } else {
                println!("{:<17} {:<6} {:<16} {:<50}", "Time", "Score", "Episode", "Translation");
                println!("{}", "-".repeat(90));
                for record in records {
                    println!("{:<17} {:<6} {:<16} {:<50}",
                        record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                        record.score,
                        record.episode_id,
                        preview(&record.user_translation, 47));
                }
            }
        }
        Commands::Stats => {
            let stats = store.stats(Utc::now()).await?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("\nPractice Statistics:");
                println!("{:<12} {:<10} {:<10}", "Period", "Sentences", "Average");
                println!("{}", "-".repeat(34));
                println!("{:<12} {:<10} {:<10.1}", "All time", stats.total_sentences, stats.average_score);
                println!("{:<12} {:<10} {:<10.1}", "Last 7 days", stats.weekly_sentences, stats.weekly_average_score);
                println!("{:<12} {:<10} {:<10.1}", "Last 30 days", stats.monthly_sentences, stats.monthly_average_score);
            }
        }
        Commands::Progress { show } => {
            let mut progress = store.all_progress().await?;
            if let Some(show) = show {
                progress.retain(|p| p.show_id == show);
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else if progress.is_empty() {
                println!("No progress saved yet.");
            } else {
                println!("{:<22} {:<18} {:<6} {:<17}", "Show", "Episode", "Line", "Last practice");
                println!("{}", "-".repeat(66));
                for p in progress {
                    println!("{:<22} {:<18} {:<6} {:<17}",
                        p.show_id, p.episode_id, p.dialogue_index + 1,
                        p.last_practice_time.format("%Y-%m-%d %H:%M").to_string());
                }
            }
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool, data_dir: &Path) -> Result<WorkerGuard> {
    let log_dir = data_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "linerun.log");
    // The guard flushes the file writer when dropped at the end of main
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::WARN };

    // Console output stays quiet unless verbose; results go to stdout
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - level: {}, file: {}", log_level, log_dir.join("linerun.log").display());

    Ok(guard)
}

fn print_result(result: &EvaluationResult, origin: EvaluationSource, json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(result)?;
        value["source"] = serde_json::json!(origin);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("\nScore: {}/5  {}  ({})", result.score, result.rating, origin);
    println!("Reference: {}", result.original_text);
    if let Some(feedback) = &result.feedback {
        println!("Feedback: {}", feedback);
    }
    if !result.grammar_tips.is_empty() {
        println!("Grammar tips:");
        for tip in &result.grammar_tips {
            println!("  - {}", tip);
        }
    }
    Ok(())
}

/// Truncate on a char boundary for table output
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
