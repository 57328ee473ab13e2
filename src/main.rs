use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use review_insights::{
    insert_report, insert_reviews, load_reviews, load_sentiment, normalize, setup_database,
    shorten_quote, AnalysisConfig, Bank, InsightPipeline, InsightReport, ThemeCatalog,
    ThemeClassifier, QUOTE_WIDTH, VERSION,
};

/// Review Insights - themes, drivers and pain points from bank app reviews
#[derive(Parser)]
#[command(name = "review-insights")]
#[command(version)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full analysis and print per-bank insights
    Analyze {
        /// Cleaned reviews CSV
        #[arg(long, value_name = "CSV")]
        reviews: PathBuf,

        /// Sentiment annotations CSV keyed by review_id
        #[arg(long, value_name = "CSV")]
        sentiment: PathBuf,

        /// Analysis config (YAML or JSON)
        #[arg(long, env = "REVIEW_INSIGHTS_CONFIG")]
        config: Option<PathBuf>,

        /// Theme catalog (YAML or JSON); overrides the config
        #[arg(long)]
        themes: Option<PathBuf>,

        #[arg(long)]
        min_count: Option<usize>,

        #[arg(long)]
        top_k: Option<usize>,

        /// Write the JSON report here
        #[arg(long, value_name = "JSON")]
        out: Option<PathBuf>,

        /// Persist reviews and the run to this SQLite database
        #[arg(long, value_name = "SQLITE")]
        db: Option<PathBuf>,
    },

    /// Show which themes a single review text matches
    Classify {
        text: String,

        #[arg(long)]
        themes: Option<PathBuf>,
    },

    /// List the theme catalog
    Themes {
        #[arg(long)]
        themes: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "review_insights=debug" } else { "review_insights=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    info!("review-insights v{}", VERSION);

    match cli.command {
        Command::Analyze {
            reviews,
            sentiment,
            config,
            themes,
            min_count,
            top_k,
            out,
            db,
        } => {
            let mut config = match config {
                Some(path) => AnalysisConfig::from_file(path)?,
                None => AnalysisConfig::default(),
            };
            if themes.is_some() {
                config.themes = themes;
            }
            if let Some(min_count) = min_count {
                config.min_count = min_count;
            }
            if let Some(top_k) = top_k {
                config.top_k = top_k;
            }
            config.validate()?;

            run_analyze(&reviews, &sentiment, &config, out.as_deref(), db.as_deref())
        }
        Command::Classify { text, themes } => {
            let catalog = load_catalog(themes.as_deref())?;
            let normalized = normalize(&text);
            println!("📝 {}", normalized);

            let matches = catalog.classify(&normalized);
            if matches.is_empty() {
                println!("   (no theme)");
            }
            for m in matches {
                let keywords: Vec<&str> = m.keywords.iter().map(|k| k.as_str()).collect();
                println!("🏷️  {} ← {}", m.theme, keywords.join(", "));
            }
            Ok(())
        }
        Command::Themes { themes } => {
            let catalog = load_catalog(themes.as_deref())?;
            for rule in catalog.rules() {
                println!("🏷️  {} ({} keywords)", rule.theme, rule.keywords.len());
                println!("   {}", rule.keywords.join(", "));
                for action in &rule.actions {
                    println!("   → {}", action);
                }
            }
            Ok(())
        }
    }
}

fn load_catalog(path: Option<&Path>) -> Result<ThemeCatalog> {
    match path {
        Some(path) => ThemeCatalog::from_file(path),
        None => Ok(ThemeCatalog::default_catalog()),
    }
}

fn run_analyze(
    reviews_path: &Path,
    sentiment_path: &Path,
    config: &AnalysisConfig,
    out: Option<&Path>,
    db: Option<&Path>,
) -> Result<()> {
    let catalog = config.load_catalog()?;
    let reviews = load_reviews(reviews_path)?;
    let sentiments = load_sentiment(sentiment_path, config.score_scale)?;

    let output = InsightPipeline::new(&catalog, config).run(reviews, &sentiments)?;

    if let Some(db_path) = db {
        let mut conn = Connection::open(db_path)?;
        setup_database(&conn)?;
        let stats = insert_reviews(&mut conn, &output.batch.enriched)?;
        insert_report(&mut conn, &output.report)?;
        println!(
            "💾 Stored run {} ({} new reviews, {} already present)",
            output.report.run_id, stats.inserted, stats.duplicates
        );
    }

    if let Some(out_path) = out {
        output.report.write_json(out_path)?;
        println!("📄 Report written to {}", out_path.display());
    }

    print_report(&output.report);
    Ok(())
}

fn print_report(report: &InsightReport) {
    println!("\n📊 Review Insights (min_count={}, top_k={})", report.min_count, report.top_k);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for bank in Bank::ALL {
        let Some(bank_report) = report.bank(bank) else {
            continue;
        };
        let summary = &bank_report.summary;

        println!("\n🏦 {} ({})", bank.display_name(), bank.code());
        print!("   {} reviews, {} annotated", summary.total_reviews, summary.annotated);
        match summary.mean_sentiment {
            Some(mean) => println!(", mean sentiment {:+.3}", mean),
            None => println!(),
        }

        println!("   ✅ Drivers:");
        if bank_report.insight.top_drivers.is_empty() {
            println!("      (none)");
        }
        for agg in &bank_report.insight.top_drivers {
            println!(
                "      {} ({} reviews, {:.1}%, avg {:+.3})",
                agg.theme, agg.count, agg.share_pct, agg.avg_sentiment
            );
        }

        println!("   ⚠️  Pain points:");
        if bank_report.insight.top_pain_points.is_empty() {
            println!("      (none)");
        }
        for agg in &bank_report.insight.top_pain_points {
            println!(
                "      {} ({} reviews, {:.1}%, avg {:+.3})",
                agg.theme, agg.count, agg.share_pct, agg.avg_sentiment
            );
            println!("         \"{}\"", shorten_quote(&agg.example_quote, QUOTE_WIDTH));
        }

        if !bank_report.top_terms.is_empty() {
            let terms: Vec<&str> = bank_report.top_terms.iter().map(|t| t.term.as_str()).collect();
            println!("   🔑 Top terms: {}", terms.join(", "));
        }

        println!("   💡 Recommendations:");
        for rec in &bank_report.insight.recommendations {
            println!("      - {}", rec);
        }
    }
}
