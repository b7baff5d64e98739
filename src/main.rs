use std::path::PathBuf;
use std::time::Instant;

use acidosis_detect::loader::{ObservationLoader, export_episodes};
use acidosis_detect::{CodeMatch, CohortRunner, DetectionConfig, OrderingPolicy};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::info;

#[derive(Parser, Debug)]
#[command(
    name = "acidosis-detect",
    about = "Detect prolonged acidosis episodes in lab time series and cross-reference them with diagnoses."
)]
struct Args {
    /// Lab events Parquet file or directory
    #[arg(long)]
    labs: PathBuf,

    /// Drug administrations Parquet file or directory
    #[arg(long)]
    administrations: Option<PathBuf>,

    /// Diagnoses Parquet file or directory
    #[arg(long)]
    diagnoses: Option<PathBuf>,

    /// Lab item dictionary, required when lab events are identified by itemid
    #[arg(long)]
    lab_items: Option<PathBuf>,

    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lactate threshold (mmol/L)
    #[arg(long)]
    lactate_threshold: Option<f64>,

    /// pH threshold
    #[arg(long)]
    ph_threshold: Option<f64>,

    /// Minimum episode duration in minutes
    #[arg(long)]
    min_duration: Option<i64>,

    /// Diagnosis codes (replaces the configured set)
    #[arg(long, value_delimiter = ',')]
    diagnosis_codes: Vec<String>,

    /// Diagnosis code matching
    #[arg(long, value_enum)]
    code_match: Option<MatchArg>,

    /// Handling of lab readings out of time order
    #[arg(long, value_enum)]
    ordering: Option<OrderingArg>,

    /// Cross-reference only subjects treated during a qualifying episode
    #[arg(long)]
    require_therapy: bool,

    /// Process subjects on a single thread
    #[arg(long)]
    sequential: bool,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Write the full report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write qualifying episodes to a Parquet file
    #[arg(long)]
    episodes: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MatchArg {
    Prefix,
    Exact,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrderingArg {
    Reject,
    Sort,
}

impl Args {
    fn detection_config(&self) -> anyhow::Result<DetectionConfig> {
        let mut config = match &self.config {
            Some(path) => DetectionConfig::from_json_file(path)?,
            None => DetectionConfig::default(),
        };

        if let Some(threshold) = self.lactate_threshold {
            config = config.with_lactate_threshold(threshold);
        }
        if let Some(threshold) = self.ph_threshold {
            config = config.with_ph_threshold(threshold);
        }
        if let Some(minutes) = self.min_duration {
            config = config.with_min_duration_minutes(minutes);
        }
        let code_match = match self.code_match {
            Some(MatchArg::Exact) => CodeMatch::Exact,
            Some(MatchArg::Prefix) => CodeMatch::Prefix,
            None => config.code_match,
        };
        if self.diagnosis_codes.is_empty() {
            config.code_match = code_match;
        } else {
            config = config.with_diagnosis_codes(&self.diagnosis_codes, code_match);
        }
        match self.ordering {
            Some(OrderingArg::Reject) => config = config.with_ordering(OrderingPolicy::Reject),
            Some(OrderingArg::Sort) => config = config.with_ordering(OrderingPolicy::Sort),
            None => {}
        }
        if self.require_therapy {
            config = config.with_require_therapy(true);
        }
        if self.sequential {
            config = config.with_parallel(false);
        }
        if self.progress {
            config = config.with_progress(true);
        }

        config.validate()?;
        Ok(config)
    }

    fn loader(&self) -> ObservationLoader {
        let mut loader = ObservationLoader::new(&self.labs);
        if let Some(path) = &self.administrations {
            loader = loader.with_administrations(path);
        }
        if let Some(path) = &self.diagnoses {
            loader = loader.with_diagnoses(path);
        }
        if let Some(path) = &self.lab_items {
            loader = loader.with_lab_items(path);
        }
        loader
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.detection_config()?;
    info!("{config}");

    let start = Instant::now();
    let cohort = args.loader().load()?;
    info!("Loaded input data in {:?}", start.elapsed());

    let runner = CohortRunner::new(config)?;
    let report = runner.run(&cohort.subjects, &cohort.diagnoses);

    for (subject_id, reason) in report.skipped() {
        info!("Skipped subject {subject_id}: {reason}");
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    if let Some(path) = &args.episodes {
        export_episodes(&report, path)?;
    }

    println!("{}", report.summary());
    Ok(())
}
