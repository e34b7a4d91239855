use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::config::ScoringConfig;
use crate::novexon_structs::{AggregatedEvent, AnnotatedEvent, ConservationRecord, EventType, SpliceClass};
use crate::sorts::unique_by;

fn log_type_counts(stage: &str, records: &[ConservationRecord]) {
    let mut counts: FxHashMap<EventType, usize> = FxHashMap::default();
    for r in records {
        *counts.entry(r.event_type).or_default() += 1;
    }
    let mut counts: Vec<(EventType, usize)> = counts.into_iter().collect();
    counts.sort();
    info!("{}: {:?}", stage, counts);
}

/// Applies the per-event conservation filters: conserved (non-NaN `cons_avg`),
/// inside a protein-coding gene, and AL/AR no longer than `max_as_length`.
pub fn filter_conservation(records: Vec<ConservationRecord>, max_as_length: i64) -> Vec<ConservationRecord> {
    log_type_counts("Conservation records", &records);

    let records: Vec<ConservationRecord> = records.into_iter().filter(|r| !r.cons_avg().is_nan()).collect();
    log_type_counts("After removing non-conserved", &records);

    let records: Vec<ConservationRecord> = records.into_iter().filter(|r| r.pc_gene_ind == 1).collect();
    log_type_counts("After removing non-protein-coding", &records);

    let records: Vec<ConservationRecord> = records
        .into_iter()
        .filter(|r| r.event_type == EventType::CassetteExon || r.end - r.start <= max_as_length)
        .collect();
    log_type_counts(
        &format!("After removing AS longer than {}", max_as_length),
        &records,
    );

    let (records, dropped) = unique_by(records, |r| (r.exon_id.clone(), r.event_type));
    if dropped > 0 {
        warn!(
            "Dropped {} conservation records duplicating an (exon_id, event_type) key",
            dropped
        );
    }
    records
}

/// Inner join of aggregated events with filtered conservation records on
/// `(exon_id, event_type)`. Events with NaN coverage are dropped afterwards.
pub fn attach_conservation(
    events: Vec<AggregatedEvent>,
    records: Vec<ConservationRecord>,
    config: &ScoringConfig,
) -> Vec<AnnotatedEvent> {
    let records = filter_conservation(records, config.max_as_length);
    let by_event: FxHashMap<(String, EventType), (f64, f64)> = records
        .into_iter()
        .map(|r| ((r.exon_id.clone(), r.event_type), (r.cons_avg(), r.ann_frac)))
        .collect();

    let total = events.len();
    let joined: Vec<AnnotatedEvent> = events
        .into_iter()
        .filter_map(|event| {
            let (cons_avg, ann_frac) = *by_event.get(&(event.exon_id.clone(), event.event_type))?;
            Some(AnnotatedEvent {
                splice_class: SpliceClass::of(event.event_type, event.strand),
                event,
                cons_avg,
                ann_frac,
            })
        })
        .collect();
    info!("{} of {} events matched a conservation record", joined.len(), total);

    let matched = joined.len();
    let joined: Vec<AnnotatedEvent> = joined.into_iter().filter(|a| !a.event.cov.is_nan()).collect();
    if joined.len() < matched {
        warn!("Dropped {} events with NaN coverage", matched - joined.len());
    }
    joined
}
