use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use novexon::config::{
    EmptyReferencePolicy, FilterThresholds, PartitionBy, ReportConfig, ScoringConfig, DEFAULT_GENOME,
    DEFAULT_MAX_AS_LENGTH, DEFAULT_QUANTILE, DEFAULT_RADIUS, DEFAULT_TRACK_NAME,
};

#[derive(Debug, Parser)]
#[command(name = "novexon")]
#[command(about = "novexon: novel exon detection and scoring from transcript assemblies")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 't',
        long = "threads",
        global = true,
        value_name = "THREADS",
        help = "Number of threads used for ECDF scoring [default: all cores]"
    )]
    pub threads: Option<usize>,

    #[arg(short = 'v', long = "verbose", global = true, help = "Log debug messages")]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect CE/AL/AR events in one sample
    Detect(DetectArgs),
    /// Merge per-sample events and keep the best-supported variant per sample
    Aggregate(AggregateArgs),
    /// Write the novel part of every event as BED for conservation lookup
    Regions(RegionsArgs),
    /// Attach conservation and score events against annotated ECDFs
    Score(ScoreArgs),
    /// Median conservation and support per event across samples
    Stats(ScoreArgs),
    /// Keep confidently novel events
    Filter(FilterArgs),
    /// Summarise novel exons as TSV and BED12
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[arg(long = "assembly", value_name = "PATH", help = "Transcript assembly GTF of the sample")]
    pub assembly: PathBuf,

    #[arg(long = "junctions", value_name = "PATH", help = "Headerless splice-junction quantification TSV")]
    pub junctions: PathBuf,

    #[arg(
        long = "annotation",
        value_name = "PATH",
        help = "Reference gene model, GTF or Parquet/TSV table"
    )]
    pub annotation: PathBuf,

    #[arg(long = "sample-name", value_name = "NAME")]
    pub sample_name: String,

    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct AggregateArgs {
    #[arg(
        short = 'i',
        long = "inputs",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Per-sample event tables delimited by comma"
    )]
    pub inputs: Vec<PathBuf>,

    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct RegionsArgs {
    #[arg(short = 'i', long = "input", value_name = "PATH", help = "Aggregated event table")]
    pub input: PathBuf,

    #[arg(long = "radius", value_name = "BP", default_value_t = DEFAULT_RADIUS)]
    pub radius: i64,

    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct ScoreArgs {
    #[arg(short = 'i', long = "input", value_name = "PATH", help = "Aggregated event table")]
    pub input: PathBuf,

    #[arg(
        long = "conservation",
        value_name = "PATH",
        help = "Headerless per-event conservation/annotation BED"
    )]
    pub conservation: PathBuf,

    #[arg(long = "max-as-length", value_name = "BP", default_value_t = DEFAULT_MAX_AS_LENGTH)]
    pub max_as_length: i64,

    #[arg(long = "partition", value_enum, default_value_t = PartitionBy::EventType)]
    pub partition: PartitionBy,

    #[arg(long = "empty-reference", value_enum, default_value_t = EmptyReferencePolicy::Null)]
    pub empty_reference: EmptyReferencePolicy,

    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

impl ScoreArgs {
    pub fn config(&self) -> ScoringConfig {
        ScoringConfig {
            max_as_length: self.max_as_length,
            partition: self.partition,
            empty_reference: self.empty_reference,
        }
    }
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    #[arg(short = 'i', long = "input", value_name = "PATH", help = "Scored event table")]
    pub input: PathBuf,

    #[arg(long = "annotation", value_name = "PATH", help = "Reference gene model, GTF or Parquet/TSV table")]
    pub annotation: PathBuf,

    #[arg(long = "meta", value_name = "PATH", help = "CSV with `name` and `meta` columns")]
    pub meta: PathBuf,

    #[arg(long = "quantile-expr", default_value_t = DEFAULT_QUANTILE)]
    pub quantile_expr: f64,

    #[arg(long = "quantile-ce-cons", default_value_t = DEFAULT_QUANTILE)]
    pub quantile_ce_cons: f64,

    #[arg(long = "quantile-as-cons", default_value_t = DEFAULT_QUANTILE)]
    pub quantile_as_cons: f64,

    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: PathBuf,
}

impl FilterArgs {
    pub fn thresholds(&self) -> FilterThresholds {
        FilterThresholds {
            quantile_expr: self.quantile_expr,
            quantile_ce_cons: self.quantile_ce_cons,
            quantile_as_cons: self.quantile_as_cons,
        }
    }
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(short = 'i', long = "input", value_name = "PATH", help = "Filtered novel event table")]
    pub input: PathBuf,

    #[arg(long = "output-bed", value_name = "PATH")]
    pub output_bed: PathBuf,

    #[arg(long = "output-tsv", value_name = "PATH")]
    pub output_tsv: PathBuf,

    #[arg(long = "genome", value_name = "DB", default_value = DEFAULT_GENOME)]
    pub genome: String,

    #[arg(long = "track-name", value_name = "NAME", default_value = DEFAULT_TRACK_NAME)]
    pub track_name: String,
}

impl ReportArgs {
    pub fn config(&self) -> ReportConfig {
        ReportConfig {
            genome: self.genome.clone(),
            track_name: self.track_name.clone(),
        }
    }
}
