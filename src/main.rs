use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use preactscraper::{
    acquire::Acquirer,
    analysis::{district_catalog, readiness_breakdown, summarize},
    cache::CacheStore,
    config::Config,
    export::write_summary,
    fetch::{HttpRemote, Sources},
    records::normalize_table,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Wisconsin PreACT results: fetch, cache and summarize")]
struct Cli {
    /// YAML settings file; flags below override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// Ignore fresh cache entries and download again.
    #[arg(long, global = true)]
    force_refresh: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// District summary, printed and exported as JSON (default).
    Summary {
        #[command(flatten)]
        range: Range,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Readiness result labels for the district.
    Readiness {
        #[command(flatten)]
        range: Range,
    },
    /// Every district in the data.
    Districts {
        #[arg(long, value_parser = year_arg())]
        start: Option<i32>,
        #[arg(long, value_parser = year_arg())]
        end: Option<i32>,
    },
    /// List cache entries.
    Cache,
    /// Acquire the newest published file.
    Latest,
}

#[derive(Args, Default)]
struct Range {
    #[arg(long)]
    district: Option<String>,
    #[arg(long, value_parser = year_arg())]
    start: Option<i32>,
    #[arg(long, value_parser = year_arg())]
    end: Option<i32>,
}

fn year_arg() -> clap::builder::RangedI64ValueParser<i32> {
    clap::value_parser!(i32).range(1900..=9998)
}

impl Range {
    fn resolve(self, config: &Config) -> (String, i32, i32) {
        (
            self.district.unwrap_or_else(|| config.district_code.clone()),
            self.start.unwrap_or(config.start_year),
            self.end.unwrap_or(config.end_year),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }

    let cache = CacheStore::new(&config.cache_dir)
        .with_context(|| format!("opening cache at {}", config.cache_dir.display()))?;
    let acquirer = Acquirer::new(
        HttpRemote::new(&config)?,
        cache,
        Sources::from_config(&config)?,
        config.cache_ttl(),
    );
    let force = cli.force_refresh;

    match cli.command.unwrap_or(Command::Summary {
        range: Range::default(),
        output: None,
    }) {
        Command::Summary { range, output } => {
            let (district, start, end) = range.resolve(&config);
            let Some(summary) = summarize(&acquirer, &district, Some(start), Some(end), force).await
            else {
                warn!(%district, "no data available for district");
                return Ok(());
            };

            println!("District: {} ({})", summary.district_name, summary.district_code);
            println!("Years: {}", summary.years_available.join(", "));
            println!("Total students tested: {}", summary.total_students_tested);
            for t in summary.trends.iter().take(5) {
                println!(
                    "  {} grade {:>2}: composite {} from {} students",
                    t.school_year,
                    t.grade_level,
                    t.composite_score.map_or("-".to_string(), |s| format!("{s:.1}")),
                    t.total_students
                );
            }

            let output = output.unwrap_or_else(|| config.output.clone());
            write_summary(&summary, &output)?;
        }
        Command::Readiness { range } => {
            let (district, start, end) = range.resolve(&config);
            let Some(table) = acquirer.merge(Some(start), Some(end), force).await else {
                warn!("no data available");
                return Ok(());
            };
            let rows = readiness_breakdown(&normalize_table(&table), &district);
            info!(rows = rows.len(), %district, "readiness breakdown");
            for r in rows {
                println!(
                    "{} grade {:>2} {:<12} {:<24} {}",
                    r.school_year,
                    r.grade_level,
                    r.test_subject,
                    r.test_result.as_deref().unwrap_or("-"),
                    r.student_count.map_or("*".to_string(), |c| c.to_string())
                );
            }
        }
        Command::Districts { start, end } => {
            let start = start.unwrap_or(config.start_year);
            let end = end.unwrap_or(config.end_year);
            let Some(table) = acquirer.merge(Some(start), Some(end), force).await else {
                warn!("no data available");
                return Ok(());
            };
            for d in district_catalog(&table) {
                println!("{:>6}  {}", d.code, d.name);
            }
        }
        Command::Cache => {
            let now = Utc::now();
            let ttl = config.cache_ttl();
            for (key, meta) in acquirer.cache().entries()? {
                match meta {
                    Some(m) => println!(
                        "{key:<8} {} {:<5} {:>8} {}",
                        m.cached_at.format("%Y-%m-%d %H:%M"),
                        if m.is_fresh_at(ttl, now) { "fresh" } else { "stale" },
                        m.record_count,
                        m.filename
                    ),
                    None => println!("{key:<8} (no metadata)"),
                }
            }
        }
        Command::Latest => match acquirer.acquire(None, force).await {
            Some(table) => println!(
                "{} records, columns: {}",
                table.num_rows(),
                table.column_names().join(", ")
            ),
            None => warn!("no data available"),
        },
    }
    Ok(())
}
