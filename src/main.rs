//! Cricket Match Prediction CLI
//!
//! Trains a boosted-tree winner classifier on historical matches, predicts
//! single fixtures and prints descriptive match insights.

use clap::{Parser, Subcommand};
use cricket::features::FeatureColumn;
use cricket::insights::Chart;
use cricket::{Config, Result};

#[derive(Parser)]
#[command(name = "cricket")]
#[command(about = "Cricket match winner prediction from pre-match factors", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the winner classifier and write the artifact bundle
    Train {
        /// Dataset CSV (overrides data.dataset_path)
        #[arg(long)]
        data: Option<String>,
        /// Use only the first N rows of the dataset
        #[arg(long, conflicts_with = "all_rows")]
        sample_size: Option<usize>,
        /// Train on every row of the dataset
        #[arg(long)]
        all_rows: bool,
    },
    /// Predict the winner of a match
    Predict {
        /// First team
        team1: Option<String>,
        /// Second team
        team2: Option<String>,
        /// Team that won the toss (team1 or team2)
        toss_winner: Option<String>,
        /// Toss decision, e.g. bat or field
        toss_decision: Option<String>,
        /// Host city
        city: Option<String>,
        /// Input fixture file (JSON list of matches)
        #[arg(long, conflicts_with = "team1")]
        fixture: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// List the values the model accepts for each feature column
    Options {
        /// Only this column (team1, team2, toss_winner, toss_decision, city)
        column: Option<FeatureColumn>,
        /// List the team2 and toss-winner choices left once team1 is picked
        #[arg(long)]
        team1: Option<String>,
        /// With --team1, narrow the toss winner to this matchup
        #[arg(long, requires = "team1")]
        team2: Option<String>,
    },
    /// Descriptive statistics over the historical matches
    Insights {
        /// Only this chart
        #[arg(long)]
        chart: Option<Chart>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show the bundle manifest
    Info,
    /// Load the bundle and score it against the dataset
    Validate,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Train {
            data,
            sample_size,
            all_rows,
        } => commands::train(config, data, sample_size, all_rows),
        Commands::Predict {
            team1,
            team2,
            toss_winner,
            toss_decision,
            city,
            fixture,
            format,
        } => {
            let args = [team1, team2, toss_winner, toss_decision, city];
            commands::predict(&config, args, fixture, format)
        }
        Commands::Options {
            column,
            team1,
            team2,
        } => commands::options(&config, column, team1, team2),
        Commands::Insights { chart, format } => commands::insights(&config, chart, format),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
            ModelCommands::Validate => commands::model_validate(&config),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use cricket::data::MatchDataset;
    use cricket::insights::Insights;
    use cricket::predict::{format_prediction, Predictor};
    use cricket::training::Trainer;
    use cricket::{CricketError, MatchContext, MatchPrediction};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all(&config.data.model_dir)?;
        println!("Created data/ and {}/ directories", config.data.model_dir);

        println!("\nNext steps:");
        println!("  1. Copy the match dataset to {}", config.data.dataset_path);
        println!("  2. Edit {} to customize settings", config_path);
        println!("  3. Run 'cricket train' to train the model");
        println!(
            "  4. Run 'cricket predict \"Team A\" \"Team B\" \"Team A\" bat \"City\"' to make predictions"
        );

        Ok(())
    }

    pub fn train(
        mut config: Config,
        data: Option<String>,
        sample_size: Option<usize>,
        all_rows: bool,
    ) -> Result<()> {
        if let Some(path) = data {
            config.data.dataset_path = path;
        }
        if all_rows {
            config.training.sample_size = None;
        } else if sample_size.is_some() {
            config.training.sample_size = sample_size;
        }
        config.validate()?;

        let dataset =
            MatchDataset::for_training(&config.data.dataset_path, config.training.sample_size)?;
        println!(
            "Training on {} labeled matches ({} rows dropped)",
            dataset.len(),
            dataset.dropped()
        );

        let trainer = Trainer::new(config.clone());
        let outcome = trainer.train_and_save(&dataset, &config.data.model_dir)?;
        let summary = &outcome.bundle.manifest.summary;

        println!("\nTraining complete");
        println!("───────────────────────────────");
        println!("  Rows trained on:  {}", summary.training_rows);
        println!("  Held-out rows:    {}", summary.heldout_rows);
        println!("  Train loss:       {:.4}", outcome.train.avg_log_loss());
        match &outcome.heldout {
            Some(m) => {
                println!("  Held-out loss:    {:.4}", m.avg_log_loss());
                println!("  Accuracy:         {:.4} ({}/{})", m.accuracy(), m.correct, m.total);
            }
            None => println!("  Accuracy:         n/a (nothing held out)"),
        }
        println!("  Winner classes:   {}", outcome.bundle.label_encoder.len());
        println!("  Bundle:           {}", config.data.model_dir);

        Ok(())
    }

    pub fn predict(
        config: &Config,
        args: [Option<String>; 5],
        fixture: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let contexts = match fixture {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                let contexts: Vec<MatchContext> = serde_json::from_str(&content)?;
                log::info!("Loaded {} fixtures from {}", contexts.len(), path);
                contexts
            }
            None => match args {
                [Some(team1), Some(team2), Some(toss_winner), Some(toss_decision), Some(city)] => {
                    vec![MatchContext::new(team1, team2, toss_winner, toss_decision, city)]
                }
                _ => {
                    println!("Usage: cricket predict <TEAM1> <TEAM2> <TOSS_WINNER> <TOSS_DECISION> <CITY>");
                    println!("       cricket predict --fixture <FILE.json>");
                    println!("\nExample:");
                    println!("  cricket predict \"Mumbai Indians\" \"Chennai Super Kings\" \"Mumbai Indians\" bat Mumbai");
                    println!("\nRun 'cricket options' to list accepted values.");
                    return Ok(());
                }
            },
        };

        let predictor = Predictor::load(&config.data.model_dir)?;
        let results = predictor.predict_many(&contexts);

        match format {
            OutputFormat::Table => {
                for result in &results {
                    match result {
                        Ok(prediction) => print!("{}", format_prediction(prediction)),
                        Err(e) => println!("Prediction failed: {}", e),
                    }
                }
            }
            OutputFormat::Json => {
                let entries: Vec<serde_json::Value> = contexts
                    .iter()
                    .zip(&results)
                    .map(|(ctx, result)| prediction_json(ctx, result))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
            OutputFormat::Csv => {
                let rows = contexts
                    .iter()
                    .zip(&results)
                    .map(|(ctx, result)| {
                        let (winner, confidence, error) = match result {
                            Ok(p) => (p.winner.clone(), format!("{:.3}", p.confidence), String::new()),
                            Err(e) => (String::new(), String::new(), e.to_string()),
                        };
                        vec![
                            ctx.team1.clone(),
                            ctx.team2.clone(),
                            ctx.toss_winner.clone(),
                            ctx.toss_decision.clone(),
                            ctx.city.clone(),
                            winner,
                            confidence,
                            error,
                        ]
                    })
                    .collect::<Vec<_>>();
                write_csv(
                    &[
                        "team1",
                        "team2",
                        "toss_winner",
                        "toss_decision",
                        "city",
                        "winner",
                        "confidence",
                        "error",
                    ],
                    &rows,
                )?;
            }
        }

        Ok(())
    }

    fn prediction_json(
        ctx: &MatchContext,
        result: &std::result::Result<MatchPrediction, CricketError>,
    ) -> serde_json::Value {
        match result {
            Ok(p) => serde_json::json!({
                "context": ctx,
                "winner": p.winner,
                "confidence": p.confidence,
            }),
            Err(e) => serde_json::json!({
                "context": ctx,
                "error": format!("Prediction failed: {}", e),
            }),
        }
    }

    pub fn options(
        config: &Config,
        column: Option<FeatureColumn>,
        team1: Option<String>,
        team2: Option<String>,
    ) -> Result<()> {
        let predictor = Predictor::load(&config.data.model_dir)?;

        if let Some(team1) = team1 {
            let team2_choices = predictor.team2_options(&team1);
            println!("team2 for {} ({} values)", team1, team2_choices.len());
            for value in &team2_choices {
                println!("  {}", value);
            }
            if let Some(team2) = team2 {
                let toss = predictor.toss_winner_options(&team1, &team2);
                println!("toss_winner ({} values)", toss.len());
                for value in toss {
                    println!("  {}", value);
                }
            }
            return Ok(());
        }

        let columns = match column {
            Some(c) => vec![c],
            None => FeatureColumn::ALL.to_vec(),
        };

        for column in columns {
            let values = predictor.options(column);
            println!("{} ({} values)", column, values.len());
            for value in values {
                println!("  {}", value);
            }
        }

        Ok(())
    }

    pub fn insights(config: &Config, chart: Option<Chart>, format: OutputFormat) -> Result<()> {
        let dataset = MatchDataset::for_insights(&config.data.dataset_path)?;
        let insights = Insights::compute(dataset.records());
        let charts = match chart {
            Some(c) => vec![c],
            None => Chart::ALL.to_vec(),
        };

        match format {
            OutputFormat::Table => {
                for chart in charts {
                    let table = insights.table(chart);
                    println!("\n{}", chart.title());
                    println!("───────────────────────────────");
                    print_table(&table.headers, &table.rows);
                }
            }
            OutputFormat::Json => {
                let mut map = serde_json::Map::new();
                for chart in charts {
                    map.insert(chart.name().to_string(), insights.chart_json(chart)?);
                }
                println!("{}", serde_json::to_string_pretty(&map)?);
            }
            OutputFormat::Csv => {
                for (i, chart) in charts.into_iter().enumerate() {
                    if i > 0 {
                        println!();
                    }
                    println!("# {}", chart.name());
                    let table = insights.table(chart);
                    write_csv(&table.headers, &table.rows)?;
                }
            }
        }

        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let predictor = Predictor::load(&config.data.model_dir)?;
        let manifest = predictor.manifest();
        let summary = &manifest.summary;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:            {}", config.data.model_dir);
        println!("  Format version:  {}", manifest.format_version);
        println!(
            "  Trained:         {}",
            manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("  Features:        {}", manifest.feature_columns.join(", "));
        println!("  Winner classes:  {}", manifest.n_classes);
        println!("  Rows trained on: {}", summary.training_rows);
        println!("  Held-out rows:   {}", summary.heldout_rows);
        match summary.heldout_accuracy {
            Some(acc) => println!("  Accuracy:        {:.4}", acc),
            None => println!("  Accuracy:        n/a"),
        }
        match summary.sample_size {
            Some(n) => println!("  Sample size:     first {} rows", n),
            None => println!("  Sample size:     all rows"),
        }
        println!("  Fingerprint:     {}", manifest.encoder_fingerprint);

        Ok(())
    }

    pub fn model_validate(config: &Config) -> Result<()> {
        let predictor = Predictor::load(&config.data.model_dir)?;
        println!("Bundle verified: {}", config.data.model_dir);

        let dataset = MatchDataset::for_training(&config.data.dataset_path, None)?;
        let report = predictor.score(dataset.records())?;

        println!("\nScored against {}", config.data.dataset_path);
        println!("───────────────────────────────");
        println!("  {}", report.metrics);
        println!("  Skipped (unseen values): {}", report.skipped);
        println!("  Note: includes the rows the model was trained on");

        Ok(())
    }

    /// Display width of each column, counted in chars like `{:<width$}` pads
    pub(crate) fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        widths
    }

    fn print_table(headers: &[&str], rows: &[Vec<String>]) {
        let widths = column_widths(headers, rows);

        let line = |cells: Vec<&str>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect::<Vec<_>>()
                .join("  ")
        };

        println!("  {}", line(headers.to_vec()));
        for row in rows {
            println!("  {}", line(row.iter().map(String::as_str).collect()));
        }
        if rows.is_empty() {
            println!("  (no data)");
        }
    }

    fn write_csv(headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        writer.write_record(headers)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::commands::column_widths;

    #[test]
    fn test_column_widths_count_chars_for_headers_and_cells() {
        let rows = vec![vec!["Bengaluru".to_string(), "7".to_string()]];
        assert_eq!(column_widths(&["équipe", "matchs"], &rows), vec![9, 6]);
        assert_eq!(column_widths(&["équipe_étrangère"], &[]), vec![16]);
    }
}
