use std::fmt;
use std::str::FromStr;

use crate::errors::NovexonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
        }
    }
}

impl FromStr for Strand {
    type Err = NovexonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            other => Err(NovexonError::invalid("strand", other)),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of detected splicing events.
/// - `CassetteExon`: the exon sits inside an intron that joins its two flanks
/// - `AltLeft`: same downstream flank and end, the start moves upstream
/// - `AltRight`: same upstream flank and start, the end moves downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    CassetteExon,
    AltLeft,
    AltRight,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CassetteExon => "CE",
            EventType::AltLeft => "AL",
            EventType::AltRight => "AR",
        }
    }
}

impl FromStr for EventType {
    type Err = NovexonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CE" => Ok(EventType::CassetteExon),
            "AL" => Ok(EventType::AltLeft),
            "AR" => Ok(EventType::AltRight),
            other => Err(NovexonError::invalid("event_type", other)),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strand-aware relabelling of alternative site events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpliceClass {
    CassetteExon,
    FivePrime,
    ThreePrime,
}

impl SpliceClass {
    /// An AL event on the forward strand moves the acceptor, so it is a 3' site;
    /// the reverse strand and AR each flip that once.
    pub fn of(event_type: EventType, strand: Strand) -> Self {
        match event_type {
            EventType::CassetteExon => SpliceClass::CassetteExon,
            _ if (strand == Strand::Forward) != (event_type == EventType::AltRight) => {
                SpliceClass::ThreePrime
            }
            _ => SpliceClass::FivePrime,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpliceClass::CassetteExon => "CE",
            SpliceClass::FivePrime => "5'AS",
            SpliceClass::ThreePrime => "3'AS",
        }
    }
}

impl FromStr for SpliceClass {
    type Err = NovexonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CE" => Ok(SpliceClass::CassetteExon),
            "5'AS" => Ok(SpliceClass::FivePrime),
            "3'AS" => Ok(SpliceClass::ThreePrime),
            other => Err(NovexonError::invalid("splice_class", other)),
        }
    }
}

/// One row of a gene model (reference annotation or transcript assembly).
/// Coordinates are kept in the source convention (GTF, 1-based inclusive).
#[derive(Debug, Clone, PartialEq)]
pub struct GeneModelRecord {
    pub seqname: String,
    pub feature: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub transcript_id: String,
    pub gene_id: String,
    pub transcript_type: Option<String>,
    pub cov: Option<f64>,
}

impl GeneModelRecord {
    pub fn is_exon(&self) -> bool {
        self.feature == "exon"
    }
}

/// An exon interval together with its neighbours in one transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Exon {
    pub seqname: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub gene_id: String,
    pub coord_prev: Option<i64>,
    pub coord_next: Option<i64>,
    pub is_annotated: bool,
    pub cov: f64,
    pub exon_id: String,
    pub junction_id_l: Option<String>,
    pub junction_id_r: Option<String>,
}

/// Composite key `seqname_a_b_strand`, the same layout junction tables use.
pub fn composite_id(seqname: &str, a: i64, b: i64, strand: Strand) -> String {
    format!("{}_{}_{}_{}", seqname, a, b, strand)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub junction_id: String,
    pub total_count: i64,
    pub annotation_status: i64,
    pub splice_site: String,
}

/// An exon with read support on both flanking junctions.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportedExon {
    pub seqname: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub gene_id: String,
    pub coord_prev: i64,
    pub coord_next: i64,
    pub is_annotated: bool,
    pub cov: f64,
    pub exon_id: String,
    pub junction_id_l: String,
    pub junction_id_r: String,
    pub ipsa_l: i64,
    pub ipsa_r: i64,
}

impl SupportedExon {
    pub fn ipsa_min(&self) -> i64 {
        self.ipsa_l.min(self.ipsa_r)
    }
}

/// What an event was matched against: an intron for CE, a sibling exon for AL/AR.
#[derive(Debug, Clone, PartialEq)]
pub enum Partner {
    Intron {
        is_annotated: bool,
    },
    Exon {
        start: i64,
        end: i64,
        cov: f64,
        exon_id: String,
        is_annotated: bool,
    },
}

impl Partner {
    pub fn is_annotated(&self) -> bool {
        match self {
            Partner::Intron { is_annotated } | Partner::Exon { is_annotated, .. } => *is_annotated,
        }
    }

    pub fn start(&self) -> Option<i64> {
        match self {
            Partner::Intron { .. } => None,
            Partner::Exon { start, .. } => Some(*start),
        }
    }

    pub fn end(&self) -> Option<i64> {
        match self {
            Partner::Intron { .. } => None,
            Partner::Exon { end, .. } => Some(*end),
        }
    }

    pub fn cov(&self) -> Option<f64> {
        match self {
            Partner::Intron { .. } => None,
            Partner::Exon { cov, .. } => Some(*cov),
        }
    }

    pub fn exon_id(&self) -> Option<&str> {
        match self {
            Partner::Intron { .. } => None,
            Partner::Exon { exon_id, .. } => Some(exon_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub exon: SupportedExon,
    pub event_type: EventType,
    pub partner: Partner,
    pub sample_name: String,
}

impl Event {
    pub fn ipsa_min(&self) -> i64 {
        self.exon.ipsa_min()
    }
}

/// The novel stretch of an event: the whole exon for CE, the part outside
/// the partner exon for AL/AR.
pub fn novel_span(event_type: EventType, start: i64, end: i64, partner: &Partner) -> (i64, i64) {
    let novel_start = match (event_type, partner.end()) {
        (EventType::AltRight, Some(partner_end)) => partner_end,
        _ => start,
    };
    let novel_end = match (event_type, partner.start()) {
        (EventType::AltLeft, Some(partner_start)) => partner_start,
        _ => end,
    };
    (novel_start, novel_end)
}

/// One event per (exon, sample), the variant with the highest junction support.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedEvent {
    pub exon_id: String,
    pub seqname: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub event_type: EventType,
    pub sample_name: String,
    pub is_annotated: bool,
    pub coord_prev: i64,
    pub coord_next: i64,
    pub junction_id_l: String,
    pub junction_id_r: String,
    pub cov: f64,
    pub ipsa_min: i64,
    pub partner: Partner,
    pub novel_start: i64,
    pub novel_end: i64,
    pub novel_length: i64,
}

/// Row of the per-event conservation/annotation BED produced outside the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct ConservationRecord {
    pub seqname: String,
    pub start: i64,
    pub end: i64,
    pub exon_id: String,
    pub event_type: EventType,
    pub ann_bp: i64,
    pub ann_frac: f64,
    pub cons_wmean: f64,
    pub cons_cov: f64,
    pub pc_gene_ind: i64,
}

impl ConservationRecord {
    pub fn cons_avg(&self) -> f64 {
        self.cons_wmean * self.cons_cov
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedEvent {
    pub event: AggregatedEvent,
    pub splice_class: SpliceClass,
    pub cons_avg: f64,
    pub ann_frac: f64,
}

/// ECDF scores against the annotated events of the same partition.
/// `None` when the partition had no annotated reference values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CdfScores {
    pub cons_avg: Option<f64>,
    pub ipsa_min: Option<f64>,
    pub cov: Option<f64>,
}

impl CdfScores {
    pub fn min(&self) -> Option<f64> {
        [self.cons_avg, self.ipsa_min, self.cov]
            .into_iter()
            .flatten()
            .reduce(f64::min)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEvent {
    pub annotated: AnnotatedEvent,
    pub scores: CdfScores,
    pub ann_cdf_min: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NovelEvent {
    pub scored: ScoredEvent,
    pub is_left_novel: bool,
    pub is_right_novel: bool,
    pub meta: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleMeta {
    pub name: String,
    pub meta: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_class_flips_with_strand() {
        assert_eq!(
            SpliceClass::of(EventType::AltLeft, Strand::Forward),
            SpliceClass::ThreePrime
        );
        assert_eq!(
            SpliceClass::of(EventType::AltRight, Strand::Forward),
            SpliceClass::FivePrime
        );
        assert_eq!(
            SpliceClass::of(EventType::AltLeft, Strand::Reverse),
            SpliceClass::FivePrime
        );
        assert_eq!(
            SpliceClass::of(EventType::CassetteExon, Strand::Reverse),
            SpliceClass::CassetteExon
        );
    }

    #[test]
    fn novel_span_by_event_type() {
        let partner = Partner::Exon {
            start: 150,
            end: 250,
            cov: 1.0,
            exon_id: "chr1_150_250_+".to_string(),
            is_annotated: true,
        };
        assert_eq!(novel_span(EventType::AltLeft, 100, 250, &partner), (100, 150));
        assert_eq!(novel_span(EventType::AltRight, 150, 300, &partner), (250, 300));
        let intron = Partner::Intron { is_annotated: true };
        assert_eq!(novel_span(EventType::CassetteExon, 200, 300, &intron), (200, 300));
    }

    #[test]
    fn cdf_min_skips_missing_scores() {
        let scores = CdfScores {
            cons_avg: Some(0.5),
            ipsa_min: None,
            cov: Some(0.25),
        };
        assert_eq!(scores.min(), Some(0.25));
        assert_eq!(CdfScores::default().min(), None);
    }

    #[test]
    fn strand_and_event_type_parse() {
        assert_eq!("-".parse::<Strand>().unwrap(), Strand::Reverse);
        assert!(".".parse::<Strand>().is_err());
        assert_eq!("AR".parse::<EventType>().unwrap(), EventType::AltRight);
        assert_eq!(composite_id("chr2", 10, 20, Strand::Forward), "chr2_10_20_+");
    }
}
