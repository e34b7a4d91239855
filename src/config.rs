use clap::ValueEnum;

// numeric values
pub const DEFAULT_QUANTILE: f64 = 0.15;
pub const DEFAULT_MAX_AS_LENGTH: i64 = 150;
pub const DEFAULT_RADIUS: i64 = 1;
pub const CDF_DECIMALS: i32 = 4;
pub const SUMMARY_DECIMALS: i32 = 2;

// junction filters
pub const CANONICAL_MOTIF: &str = "GTAG";
pub const PROTEIN_CODING: &str = "protein_coding";

// report
pub const DEFAULT_GENOME: &str = "hg38";
pub const DEFAULT_TRACK_NAME: &str = "NExon";
pub const LINK_FLANK: i64 = 10;
pub const BED_LEFT_FLANK: i64 = 5;
pub const BED_RIGHT_FLANK: i64 = 4;

/// Which label splits events into independent ECDF reference populations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PartitionBy {
    #[default]
    EventType,
    SpliceClass,
}

/// What to do when a partition has no annotated events to fit against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EmptyReferencePolicy {
    #[default]
    Null,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    pub max_as_length: i64,
    pub partition: PartitionBy,
    pub empty_reference: EmptyReferencePolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_as_length: DEFAULT_MAX_AS_LENGTH,
            partition: PartitionBy::default(),
            empty_reference: EmptyReferencePolicy::default(),
        }
    }
}

/// ECDF cutoffs; an event passes only when every score is strictly above its cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterThresholds {
    pub quantile_expr: f64,
    pub quantile_ce_cons: f64,
    pub quantile_as_cons: f64,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            quantile_expr: DEFAULT_QUANTILE,
            quantile_ce_cons: DEFAULT_QUANTILE,
            quantile_as_cons: DEFAULT_QUANTILE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub genome: String,
    pub track_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            genome: DEFAULT_GENOME.to_string(),
            track_name: DEFAULT_TRACK_NAME.to_string(),
        }
    }
}
