//! Maintenance jobs for published competition results.

#![warn(clippy::all, clippy::pedantic)]

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use podium_common::aggregate::{AggregationScope, ResultsAggregator};
use podium_common::config::format_score;
use podium_common::db_util;
use podium_common::repository::{Roster, ScoreRepository};
use podium_common::statistics::{self, total_mismatches};
use podium_common::{ScoringConfigSource, ScoringConfigs, ranking};

#[derive(Parser)]
#[command(about = "Maintenance jobs for published competition results")]
struct Cli {
    #[command(subcommand)]
    job: Job,
}

#[derive(Subcommand)]
enum Job {
    /// Print the ranked results of a competition.
    Standings {
        #[arg(long, env = "COMPETITION_ID")]
        competition: u32,
        /// Only aggregate this round.
        #[arg(long)]
        round: Option<u32>,
    },
    /// Print score statistics of a competition.
    Statistics {
        #[arg(long, env = "COMPETITION_ID")]
        competition: u32,
    },
    /// Report scores whose stored total no longer matches their components.
    AuditTotals {
        #[arg(long, env = "COMPETITION_ID")]
        competition: u32,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let configs = ScoringConfigs::from_env().map_err(|e| anyhow!(e))?;
    let mut conn = db_util::get_database_connection().map_err(|e| anyhow!(e))?;
    println!("Database connection established.");

    match cli.job {
        Job::Standings { competition, round } => {
            let scope = round.map_or(AggregationScope::AllRounds, AggregationScope::Round);
            let config = configs.scoring_config(Some(competition));
            let results = ResultsAggregator::new(&configs)
                .aggregate_for_competition(&mut conn, competition, scope)?;
            let ordered = ranking::order(results.into_values().collect());

            println!("=== COMPETITION {competition} STANDINGS ({scope:?}) ===");
            for (rank, result) in ordered.iter().enumerate() {
                let rank = if result.average_score.is_some() {
                    (rank + 1).to_string()
                } else {
                    "-".to_string()
                };
                println!(
                    "{rank:>4}  {:<12} {:>8}  ({} scores, {:?}){}",
                    result.registration_number,
                    format_score(result.average_score, config.decimal_places),
                    result.score_count,
                    result.validation.status,
                    result
                        .validation
                        .warnings
                        .first()
                        .map(|w| format!(" {w}"))
                        .unwrap_or_default()
                );
            }
        }
        Job::Statistics { competition } => {
            let config = configs.scoring_config(Some(competition));
            let stats =
                statistics::for_competition(&mut conn, competition, config.decimal_places)?;
            println!("=== COMPETITION {competition} STATISTICS ===");
            println!(
                "Entries: {} ({} scored, {} unscored)",
                stats.total_entries, stats.scored_entries, stats.unscored_entries
            );
            println!("Scores: {}", stats.total_scores);
            println!(
                "Average technique {} / performance {} / total {}",
                stats.average_technique_score,
                stats.average_performance_score,
                stats.average_total_score
            );
            println!("Highest {} / lowest {}", stats.highest_score, stats.lowest_score);
        }
        Job::AuditTotals { competition } => {
            let config = configs.scoring_config(Some(competition));
            println!("=== COMPETITION {competition} TOTALS AUDIT ===");
            let mut mismatched = 0;
            for entry in conn.entries_in_competition(competition)? {
                let records = conn.scores_for_entry(entry.entry_id)?;
                for record in total_mismatches(&records, config.decimal_places) {
                    mismatched += 1;
                    log::warn!(
                        "Score #{} (entry {}, judge {}, round {}) stores total {} but its components give {}",
                        record.score_id,
                        record.entry_id,
                        record.judge_id,
                        record.round_number,
                        record.total_score,
                        record.components().total(config.decimal_places)
                    );
                }
            }
            println!("{mismatched} mismatched totals found.");
        }
    }

    Ok(())
}
