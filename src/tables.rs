//! Conversions between pipeline records and polars frames.
//!
//! Column names follow the tables the pipeline stages exchange on disk, so
//! every stage can be rerun from the previous stage's output.

use polars::prelude::DataFrame;

use crate::aggregate::EventStats;
use crate::errors::{NovexonError, Result};
use crate::frame::{FrameBuilder, FrameReader};
use crate::novexon_structs::{
    novel_span, AggregatedEvent, AnnotatedEvent, CdfScores, ConservationRecord, Event, EventType,
    GeneModelRecord, Junction, NovelEvent, Partner, SampleMeta, ScoredEvent, SpliceClass, Strand,
    SupportedExon,
};
use crate::report::{NovelExonSummary, NovelRegion};

/// Headerless splice-junction quantification columns.
pub const JUNCTION_COLUMNS: [&str; 6] = [
    "junction_id",
    "total_count",
    "staggered_count",
    "entropy",
    "annotation_status",
    "splice_site",
];

/// Headerless per-event conservation/annotation BED columns.
pub const CONSERVATION_COLUMNS: [&str; 10] = [
    "seqname",
    "start",
    "end",
    "exon_id",
    "event_type",
    "ann_bp",
    "ann_frac",
    "cons_wmean",
    "cons_cov",
    "pc_gene_ind",
];

const GENE_MODEL_COLUMNS: [&str; 7] = [
    "seqname",
    "feature",
    "start",
    "end",
    "strand",
    "transcript_id",
    "gene_id",
];

const EVENT_COLUMNS: [&str; 17] = [
    "seqname",
    "start",
    "end",
    "strand",
    "gene_id",
    "coord_prev",
    "coord_next",
    "is_annotated",
    "cov",
    "exon_id",
    "junction_id_l",
    "junction_id_r",
    "ipsa_l",
    "ipsa_r",
    "event_type",
    "sample_name",
    "is_annotated_right",
];

const AGGREGATED_COLUMNS: [&str; 15] = [
    "exon_id",
    "seqname",
    "start",
    "end",
    "strand",
    "event_type",
    "sample_name",
    "is_annotated",
    "coord_prev",
    "coord_next",
    "junction_id_l",
    "junction_id_r",
    "cov",
    "ipsa_min",
    "is_annotated_right",
];

const SCORED_COLUMNS: [&str; 3] = ["splice_class", "cons_avg", "ann_frac"];

const META_COLUMNS: [&str; 2] = ["name", "meta"];

pub fn junctions_from_frame(df: &DataFrame) -> Result<Vec<Junction>> {
    let r = FrameReader::new(
        "junctions",
        df,
        &["junction_id", "total_count", "annotation_status", "splice_site"],
    )?;
    let ids = r.strings("junction_id")?;
    let counts = r.i64s("total_count")?;
    let status = r.i64s("annotation_status")?;
    let sites = r.strings("splice_site")?;
    Ok(ids
        .into_iter()
        .zip(counts)
        .zip(status)
        .zip(sites)
        .map(|(((junction_id, total_count), annotation_status), splice_site)| Junction {
            junction_id,
            total_count,
            annotation_status,
            splice_site,
        })
        .collect())
}

/// Gene model table (GTF already flattened into columns). `transcript_type`
/// and `cov` are optional columns.
pub fn gene_model_from_frame(df: &DataFrame) -> Result<Vec<GeneModelRecord>> {
    let r = FrameReader::new("gene_model", df, &GENE_MODEL_COLUMNS)?;
    let seqnames = r.strings("seqname")?;
    let features = r.strings("feature")?;
    let starts = r.i64s("start")?;
    let ends = r.i64s("end")?;
    let strands: Vec<Strand> = r.parsed("strand")?;
    let transcript_ids = r.opt_strings("transcript_id")?;
    let gene_ids = r.opt_strings("gene_id")?;
    let transcript_types = if r.has("transcript_type") {
        r.opt_strings("transcript_type")?
    } else {
        vec![None; r.height()]
    };
    let covs = if r.has("cov") {
        r.opt_f64s("cov")?
    } else {
        vec![None; r.height()]
    };

    let mut records = Vec::with_capacity(r.height());
    for i in 0..r.height() {
        // gene-level rows carry no transcript
        let (Some(transcript_id), Some(gene_id)) = (&transcript_ids[i], &gene_ids[i]) else {
            continue;
        };
        records.push(GeneModelRecord {
            seqname: seqnames[i].clone(),
            feature: features[i].clone(),
            start: starts[i],
            end: ends[i],
            strand: strands[i],
            transcript_id: transcript_id.clone(),
            gene_id: gene_id.clone(),
            transcript_type: transcript_types[i].clone(),
            cov: covs[i],
        });
    }
    Ok(records)
}

pub fn conservation_from_frame(df: &DataFrame) -> Result<Vec<ConservationRecord>> {
    let r = FrameReader::new("conservation", df, &CONSERVATION_COLUMNS)?;
    let seqnames = r.strings("seqname")?;
    let starts = r.i64s("start")?;
    let ends = r.i64s("end")?;
    let exon_ids = r.strings("exon_id")?;
    let event_types: Vec<EventType> = r.parsed("event_type")?;
    let ann_bp = r.i64s("ann_bp")?;
    let ann_frac = r.f64s("ann_frac")?;
    let cons_wmean = r.f64s("cons_wmean")?;
    let cons_cov = r.f64s("cons_cov")?;
    let pc_gene_ind = r.i64s("pc_gene_ind")?;

    Ok((0..r.height())
        .map(|i| ConservationRecord {
            seqname: seqnames[i].clone(),
            start: starts[i],
            end: ends[i],
            exon_id: exon_ids[i].clone(),
            event_type: event_types[i],
            ann_bp: ann_bp[i],
            ann_frac: ann_frac[i],
            cons_wmean: cons_wmean[i],
            cons_cov: cons_cov[i],
            pc_gene_ind: pc_gene_ind[i],
        })
        .collect())
}

pub fn sample_meta_from_frame(df: &DataFrame) -> Result<Vec<SampleMeta>> {
    let r = FrameReader::new("sample_meta", df, &META_COLUMNS)?;
    Ok(r
        .strings("name")?
        .into_iter()
        .zip(r.opt_strings("meta")?)
        .map(|(name, meta)| SampleMeta { name, meta })
        .collect())
}

/// Right-element columns shared by event and aggregated tables.
fn with_partner_columns<'a>(b: FrameBuilder, partners: impl Iterator<Item = &'a Partner> + Clone) -> FrameBuilder {
    b.with(
        "is_annotated_right",
        partners.clone().map(Partner::is_annotated).collect::<Vec<bool>>(),
    )
    .with(
        "exon_id_right",
        partners.clone().map(Partner::exon_id).collect::<Vec<Option<&str>>>(),
    )
    .with("start_right", partners.clone().map(Partner::start).collect::<Vec<Option<i64>>>())
    .with("end_right", partners.clone().map(Partner::end).collect::<Vec<Option<i64>>>())
    .with("cov_right", partners.map(Partner::cov).collect::<Vec<Option<f64>>>())
}

struct PartnerColumns {
    is_annotated: Vec<bool>,
    exon_ids: Vec<Option<String>>,
    starts: Vec<Option<i64>>,
    ends: Vec<Option<i64>>,
    covs: Vec<Option<f64>>,
}

impl PartnerColumns {
    fn read(r: &FrameReader) -> Result<Self> {
        let optional_i64 = |name: &str| -> Result<Vec<Option<i64>>> {
            if r.has(name) {
                r.opt_i64s(name)
            } else {
                Ok(vec![None; r.height()])
            }
        };
        Ok(PartnerColumns {
            is_annotated: r.bools("is_annotated_right")?,
            exon_ids: if r.has("exon_id_right") {
                r.opt_strings("exon_id_right")?
            } else {
                vec![None; r.height()]
            },
            starts: optional_i64("start_right")?,
            ends: optional_i64("end_right")?,
            covs: if r.has("cov_right") {
                r.opt_f64s("cov_right")?
            } else {
                vec![None; r.height()]
            },
        })
    }

    /// A CE partner is the reference intron; AL/AR partners need their exon coordinates back.
    fn partner(&self, i: usize, event_type: EventType, exon_id: &str) -> Result<Partner> {
        if event_type == EventType::CassetteExon {
            return Ok(Partner::Intron {
                is_annotated: self.is_annotated[i],
            });
        }
        match (self.starts[i], self.ends[i], &self.exon_ids[i]) {
            (Some(start), Some(end), Some(partner_id)) => Ok(Partner::Exon {
                start,
                end,
                cov: self.covs[i].unwrap_or(f64::NAN),
                exon_id: partner_id.clone(),
                is_annotated: self.is_annotated[i],
            }),
            _ => Err(NovexonError::MissingPartner {
                exon_id: exon_id.to_string(),
                event_type: event_type.to_string(),
            }),
        }
    }
}

pub fn events_to_frame(events: &[Event]) -> Result<DataFrame> {
    let exons: Vec<&SupportedExon> = events.iter().map(|e| &e.exon).collect();
    let b = FrameBuilder::new()
        .with("seqname", exons.iter().map(|x| x.seqname.as_str()).collect::<Vec<_>>())
        .with("start", exons.iter().map(|x| x.start).collect::<Vec<_>>())
        .with("end", exons.iter().map(|x| x.end).collect::<Vec<_>>())
        .with("strand", exons.iter().map(|x| x.strand.as_str()).collect::<Vec<_>>())
        .with("gene_id", exons.iter().map(|x| x.gene_id.as_str()).collect::<Vec<_>>())
        .with("coord_prev", exons.iter().map(|x| x.coord_prev).collect::<Vec<_>>())
        .with("coord_next", exons.iter().map(|x| x.coord_next).collect::<Vec<_>>())
        .with("is_annotated", exons.iter().map(|x| x.is_annotated).collect::<Vec<_>>())
        .with("cov", exons.iter().map(|x| x.cov).collect::<Vec<_>>())
        .with("exon_id", exons.iter().map(|x| x.exon_id.as_str()).collect::<Vec<_>>())
        .with("junction_id_l", exons.iter().map(|x| x.junction_id_l.as_str()).collect::<Vec<_>>())
        .with("junction_id_r", exons.iter().map(|x| x.junction_id_r.as_str()).collect::<Vec<_>>())
        .with("ipsa_l", exons.iter().map(|x| x.ipsa_l).collect::<Vec<_>>())
        .with("ipsa_r", exons.iter().map(|x| x.ipsa_r).collect::<Vec<_>>())
        .with("ipsa_min", events.iter().map(Event::ipsa_min).collect::<Vec<_>>())
        .with("event_type", events.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>())
        .with("sample_name", events.iter().map(|e| e.sample_name.as_str()).collect::<Vec<_>>());
    with_partner_columns(b, events.iter().map(|e| &e.partner)).finish()
}

pub fn events_from_frame(df: &DataFrame) -> Result<Vec<Event>> {
    let r = FrameReader::new("events", df, &EVENT_COLUMNS)?;
    let seqnames = r.strings("seqname")?;
    let starts = r.i64s("start")?;
    let ends = r.i64s("end")?;
    let strands: Vec<Strand> = r.parsed("strand")?;
    let gene_ids = r.strings("gene_id")?;
    let coord_prev = r.i64s("coord_prev")?;
    let coord_next = r.i64s("coord_next")?;
    let is_annotated = r.bools("is_annotated")?;
    let covs = r.f64s("cov")?;
    let exon_ids = r.strings("exon_id")?;
    let junction_l = r.strings("junction_id_l")?;
    let junction_r = r.strings("junction_id_r")?;
    let ipsa_l = r.i64s("ipsa_l")?;
    let ipsa_r = r.i64s("ipsa_r")?;
    let event_types: Vec<EventType> = r.parsed("event_type")?;
    let sample_names = r.strings("sample_name")?;
    let partners = PartnerColumns::read(&r)?;

    (0..r.height())
        .map(|i| {
            Ok(Event {
                partner: partners.partner(i, event_types[i], &exon_ids[i])?,
                exon: SupportedExon {
                    seqname: seqnames[i].clone(),
                    start: starts[i],
                    end: ends[i],
                    strand: strands[i],
                    gene_id: gene_ids[i].clone(),
                    coord_prev: coord_prev[i],
                    coord_next: coord_next[i],
                    is_annotated: is_annotated[i],
                    cov: covs[i],
                    exon_id: exon_ids[i].clone(),
                    junction_id_l: junction_l[i].clone(),
                    junction_id_r: junction_r[i].clone(),
                    ipsa_l: ipsa_l[i],
                    ipsa_r: ipsa_r[i],
                },
                event_type: event_types[i],
                sample_name: sample_names[i].clone(),
            })
        })
        .collect()
}

fn with_aggregated_columns(b: FrameBuilder, events: &[&AggregatedEvent]) -> FrameBuilder {
    let b = b
        .with("exon_id", events.iter().map(|e| e.exon_id.as_str()).collect::<Vec<_>>())
        .with("seqname", events.iter().map(|e| e.seqname.as_str()).collect::<Vec<_>>())
        .with("start", events.iter().map(|e| e.start).collect::<Vec<_>>())
        .with("end", events.iter().map(|e| e.end).collect::<Vec<_>>())
        .with("strand", events.iter().map(|e| e.strand.as_str()).collect::<Vec<_>>())
        .with("event_type", events.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>())
        .with("sample_name", events.iter().map(|e| e.sample_name.as_str()).collect::<Vec<_>>())
        .with("is_annotated", events.iter().map(|e| e.is_annotated).collect::<Vec<_>>())
        .with("coord_prev", events.iter().map(|e| e.coord_prev).collect::<Vec<_>>())
        .with("coord_next", events.iter().map(|e| e.coord_next).collect::<Vec<_>>())
        .with("junction_id_l", events.iter().map(|e| e.junction_id_l.as_str()).collect::<Vec<_>>())
        .with("junction_id_r", events.iter().map(|e| e.junction_id_r.as_str()).collect::<Vec<_>>())
        .with("cov", events.iter().map(|e| e.cov).collect::<Vec<_>>())
        .with("ipsa_min", events.iter().map(|e| e.ipsa_min).collect::<Vec<_>>());
    with_partner_columns(b, events.iter().map(|e| &e.partner))
        .with("novel_start", events.iter().map(|e| e.novel_start).collect::<Vec<_>>())
        .with("novel_end", events.iter().map(|e| e.novel_end).collect::<Vec<_>>())
        .with("novel_length", events.iter().map(|e| e.novel_length).collect::<Vec<_>>())
}

fn read_aggregated(r: &FrameReader) -> Result<Vec<AggregatedEvent>> {
    let exon_ids = r.strings("exon_id")?;
    let seqnames = r.strings("seqname")?;
    let starts = r.i64s("start")?;
    let ends = r.i64s("end")?;
    let strands: Vec<Strand> = r.parsed("strand")?;
    let event_types: Vec<EventType> = r.parsed("event_type")?;
    let sample_names = r.strings("sample_name")?;
    let is_annotated = r.bools("is_annotated")?;
    let coord_prev = r.i64s("coord_prev")?;
    let coord_next = r.i64s("coord_next")?;
    let junction_l = r.strings("junction_id_l")?;
    let junction_r = r.strings("junction_id_r")?;
    let covs = r.f64s("cov")?;
    let ipsa_min = r.i64s("ipsa_min")?;
    let partners = PartnerColumns::read(r)?;

    (0..r.height())
        .map(|i| {
            let partner = partners.partner(i, event_types[i], &exon_ids[i])?;
            let (novel_start, novel_end) = novel_span(event_types[i], starts[i], ends[i], &partner);
            Ok(AggregatedEvent {
                exon_id: exon_ids[i].clone(),
                seqname: seqnames[i].clone(),
                start: starts[i],
                end: ends[i],
                strand: strands[i],
                event_type: event_types[i],
                sample_name: sample_names[i].clone(),
                is_annotated: is_annotated[i],
                coord_prev: coord_prev[i],
                coord_next: coord_next[i],
                junction_id_l: junction_l[i].clone(),
                junction_id_r: junction_r[i].clone(),
                cov: covs[i],
                ipsa_min: ipsa_min[i],
                partner,
                novel_start,
                novel_end,
                novel_length: novel_end - novel_start,
            })
        })
        .collect()
}

pub fn aggregated_to_frame(events: &[AggregatedEvent]) -> Result<DataFrame> {
    let refs: Vec<&AggregatedEvent> = events.iter().collect();
    with_aggregated_columns(FrameBuilder::new(), &refs).finish()
}

pub fn aggregated_from_frame(df: &DataFrame) -> Result<Vec<AggregatedEvent>> {
    let r = FrameReader::new("aggregated_events", df, &AGGREGATED_COLUMNS)?;
    read_aggregated(&r)
}

fn with_scored_columns(b: FrameBuilder, scored: &[&ScoredEvent]) -> FrameBuilder {
    let events: Vec<&AggregatedEvent> = scored.iter().map(|s| &s.annotated.event).collect();
    with_aggregated_columns(b, &events)
        .with(
            "splice_class",
            scored.iter().map(|s| s.annotated.splice_class.as_str()).collect::<Vec<_>>(),
        )
        .with("cons_avg", scored.iter().map(|s| s.annotated.cons_avg).collect::<Vec<_>>())
        .with("ann_frac", scored.iter().map(|s| s.annotated.ann_frac).collect::<Vec<_>>())
        .with("cons_avg_ann_cdf", scored.iter().map(|s| s.scores.cons_avg).collect::<Vec<_>>())
        .with("ipsa_min_ann_cdf", scored.iter().map(|s| s.scores.ipsa_min).collect::<Vec<_>>())
        .with("cov_ann_cdf", scored.iter().map(|s| s.scores.cov).collect::<Vec<_>>())
        .with("ann_cdf_min", scored.iter().map(|s| s.ann_cdf_min).collect::<Vec<_>>())
}

fn read_scored(r: &FrameReader) -> Result<Vec<ScoredEvent>> {
    let events = read_aggregated(r)?;
    let splice_classes: Vec<SpliceClass> = r.parsed("splice_class")?;
    let cons_avg = r.f64s("cons_avg")?;
    let ann_frac = r.f64s("ann_frac")?;
    let optional = |name: &str| -> Result<Vec<Option<f64>>> {
        if r.has(name) {
            r.opt_f64s(name)
        } else {
            Ok(vec![None; r.height()])
        }
    };
    let cons_cdf = optional("cons_avg_ann_cdf")?;
    let ipsa_cdf = optional("ipsa_min_ann_cdf")?;
    let cov_cdf = optional("cov_ann_cdf")?;

    Ok(events
        .into_iter()
        .enumerate()
        .map(|(i, event)| {
            let scores = CdfScores {
                cons_avg: cons_cdf[i],
                ipsa_min: ipsa_cdf[i],
                cov: cov_cdf[i],
            };
            ScoredEvent {
                annotated: AnnotatedEvent {
                    event,
                    splice_class: splice_classes[i],
                    cons_avg: cons_avg[i],
                    ann_frac: ann_frac[i],
                },
                ann_cdf_min: scores.min(),
                scores,
            }
        })
        .collect())
}

/// Events with conservation attached; scores are absent before the ECDF stage.
pub fn scored_to_frame(scored: &[ScoredEvent]) -> Result<DataFrame> {
    let refs: Vec<&ScoredEvent> = scored.iter().collect();
    with_scored_columns(FrameBuilder::new(), &refs).finish()
}

pub fn scored_from_frame(df: &DataFrame) -> Result<Vec<ScoredEvent>> {
    let required: Vec<&str> = AGGREGATED_COLUMNS.iter().chain(&SCORED_COLUMNS).copied().collect();
    let r = FrameReader::new("scored_events", df, &required)?;
    read_scored(&r)
}

pub fn annotated_from_frame(df: &DataFrame) -> Result<Vec<AnnotatedEvent>> {
    Ok(scored_from_frame(df)?.into_iter().map(|s| s.annotated).collect())
}

pub fn novel_to_frame(events: &[NovelEvent]) -> Result<DataFrame> {
    let scored: Vec<&ScoredEvent> = events.iter().map(|e| &e.scored).collect();
    with_scored_columns(FrameBuilder::new(), &scored)
        .with("is_left_novel", events.iter().map(|e| e.is_left_novel).collect::<Vec<_>>())
        .with("is_right_novel", events.iter().map(|e| e.is_right_novel).collect::<Vec<_>>())
        .with("meta", events.iter().map(|e| e.meta.as_deref()).collect::<Vec<_>>())
        .finish()
}

pub fn novel_from_frame(df: &DataFrame) -> Result<Vec<NovelEvent>> {
    let required: Vec<&str> = AGGREGATED_COLUMNS
        .iter()
        .chain(&SCORED_COLUMNS)
        .chain(&["is_left_novel", "is_right_novel", "meta"])
        .copied()
        .collect();
    let r = FrameReader::new("novel_events", df, &required)?;
    let scored = read_scored(&r)?;
    let left = r.bools("is_left_novel")?;
    let right = r.bools("is_right_novel")?;
    let meta = r.opt_strings("meta")?;
    Ok(scored
        .into_iter()
        .zip(left)
        .zip(right)
        .zip(meta)
        .map(|(((scored, is_left_novel), is_right_novel), meta)| NovelEvent {
            scored,
            is_left_novel,
            is_right_novel,
            meta,
        })
        .collect())
}

pub fn stats_to_frame(stats: &[EventStats]) -> Result<DataFrame> {
    FrameBuilder::new()
        .with("exon_id", stats.iter().map(|s| s.exon_id.as_str()).collect::<Vec<_>>())
        .with("event_type", stats.iter().map(|s| s.event_type.as_str()).collect::<Vec<_>>())
        .with("is_annotated", stats.iter().map(|s| s.is_annotated).collect::<Vec<_>>())
        .with("cons_avg", stats.iter().map(|s| s.cons_avg).collect::<Vec<_>>())
        .with("ipsa_min", stats.iter().map(|s| s.ipsa_min).collect::<Vec<_>>())
        .with("cov", stats.iter().map(|s| s.cov).collect::<Vec<_>>())
        .finish()
}

pub fn regions_to_frame(regions: &[NovelRegion]) -> Result<DataFrame> {
    FrameBuilder::new()
        .with("seqname", regions.iter().map(|r| r.seqname.as_str()).collect::<Vec<_>>())
        .with("start", regions.iter().map(|r| r.start).collect::<Vec<_>>())
        .with("end", regions.iter().map(|r| r.end).collect::<Vec<_>>())
        .with("exon_id", regions.iter().map(|r| r.exon_id.as_str()).collect::<Vec<_>>())
        .with("event_type", regions.iter().map(|r| r.event_type.as_str()).collect::<Vec<_>>())
        .finish()
}

pub fn summary_to_frame(rows: &[NovelExonSummary]) -> Result<DataFrame> {
    FrameBuilder::new()
        .with("seqname", rows.iter().map(|s| s.seqname.as_str()).collect::<Vec<_>>())
        .with("start", rows.iter().map(|s| s.start).collect::<Vec<_>>())
        .with("end", rows.iter().map(|s| s.end).collect::<Vec<_>>())
        .with("exon_id", rows.iter().map(|s| s.exon_id.as_str()).collect::<Vec<_>>())
        .with("strand", rows.iter().map(|s| s.strand.as_str()).collect::<Vec<_>>())
        .with("event_type", rows.iter().map(|s| s.event_type.as_str()).collect::<Vec<_>>())
        .with("junction_id_l", rows.iter().map(|s| s.junction_id_l.as_str()).collect::<Vec<_>>())
        .with("junction_id_r", rows.iter().map(|s| s.junction_id_r.as_str()).collect::<Vec<_>>())
        .with("coord_prev", rows.iter().map(|s| s.coord_prev).collect::<Vec<_>>())
        .with("coord_next", rows.iter().map(|s| s.coord_next).collect::<Vec<_>>())
        .with("novel_length", rows.iter().map(|s| s.novel_length).collect::<Vec<_>>())
        .with("expr_exon", rows.iter().map(|s| s.expr_exon).collect::<Vec<_>>())
        .with("expr_junction", rows.iter().map(|s| s.expr_junction).collect::<Vec<_>>())
        .with("phastcons", rows.iter().map(|s| s.phastcons).collect::<Vec<_>>())
        .with("meta", rows.iter().map(|s| s.meta.as_str()).collect::<Vec<_>>())
        .with("sample_count", rows.iter().map(|s| s.sample_count as i64).collect::<Vec<_>>())
        .with("GB_link", rows.iter().map(|s| s.gb_link.as_str()).collect::<Vec<_>>())
        .finish()
}
