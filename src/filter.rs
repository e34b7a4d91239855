use log::{info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::annotation::AnnotationIndex;
use crate::config::FilterThresholds;
use crate::novexon_structs::{EventType, NovelEvent, SampleMeta, ScoredEvent};

fn log_unique_events(stage: &str, events: &[NovelEvent]) {
    let mut unique: FxHashSet<(EventType, &str)> = FxHashSet::default();
    for e in events {
        let event = &e.scored.annotated.event;
        unique.insert((event.event_type, event.exon_id.as_str()));
    }
    let mut per_type: FxHashMap<EventType, usize> = FxHashMap::default();
    for (event_type, _) in unique {
        *per_type.entry(event_type).or_default() += 1;
    }
    let mut per_type: Vec<(EventType, usize)> = per_type.into_iter().collect();
    per_type.sort();
    info!("{}: {:?}", stage, per_type);
}

impl NovelEvent {
    pub fn is_cassette(&self) -> bool {
        self.scored.annotated.event.event_type == EventType::CassetteExon
    }

    /// Junction support and coverage above `quantile_expr`, conservation above
    /// the CE or AL/AR cutoff. Missing scores never pass.
    pub fn passes(&self, thresholds: &FilterThresholds) -> bool {
        let scores = &self.scored.scores;
        let cons_cutoff = if self.is_cassette() {
            thresholds.quantile_ce_cons
        } else {
            thresholds.quantile_as_cons
        };
        let above = |score: Option<f64>, cutoff: f64| score.is_some_and(|s| s > cutoff);
        above(scores.ipsa_min, thresholds.quantile_expr)
            && above(scores.cov, thresholds.quantile_expr)
            && above(scores.cons_avg, cons_cutoff)
    }
}

/// Builds the `name -> meta` lookup; a repeated name keeps its first label.
pub fn meta_lookup(meta: Vec<SampleMeta>) -> FxHashMap<String, Option<String>> {
    let mut lookup: FxHashMap<String, Option<String>> = FxHashMap::default();
    let mut repeated = 0;
    for m in meta {
        if lookup.contains_key(&m.name) {
            repeated += 1;
            continue;
        }
        lookup.insert(m.name, m.meta);
    }
    if repeated > 0 {
        warn!("Sample metadata lists {} names more than once, kept first", repeated);
    }
    lookup
}

/// Keeps confidently novel events: unannotated, not a partially annotated
/// CE, at least one boundary absent from the reference, and above every
/// ECDF cutoff. Passing events get their sample metadata attached.
pub fn filter_novel_events(
    scored: Vec<ScoredEvent>,
    index: &AnnotationIndex,
    meta: Vec<SampleMeta>,
    thresholds: &FilterThresholds,
) -> Vec<NovelEvent> {
    let events: Vec<NovelEvent> = scored
        .into_iter()
        .map(|scored| {
            let event = &scored.annotated.event;
            let is_left_novel = !index.has_exon_start(&event.seqname, event.start);
            let is_right_novel = !index.has_exon_end(&event.seqname, event.end);
            NovelEvent {
                scored,
                is_left_novel,
                is_right_novel,
                meta: None,
            }
        })
        .collect();
    log_unique_events("Scored events", &events);

    let events: Vec<NovelEvent> = events
        .into_iter()
        .filter(|e| !e.scored.annotated.event.is_annotated)
        .collect();
    log_unique_events("Novel events", &events);

    let events: Vec<NovelEvent> = events
        .into_iter()
        .filter(|e| !(e.is_cassette() && e.scored.annotated.ann_frac > 0.0))
        .collect();
    log_unique_events("After removing partially annotated CE", &events);

    let events: Vec<NovelEvent> = events
        .into_iter()
        .filter(|e| e.is_left_novel || e.is_right_novel)
        .collect();
    log_unique_events("After removing events with both sites annotated", &events);

    let (cassette, alternative): (Vec<NovelEvent>, Vec<NovelEvent>) = events
        .into_iter()
        .filter(|e| e.passes(thresholds))
        .partition(NovelEvent::is_cassette);
    let mut events = cassette;
    events.extend(alternative);
    log_unique_events(
        &format!(
            "After eCDF cutoffs (expression {}, CE conservation {}, AS conservation {})",
            thresholds.quantile_expr, thresholds.quantile_ce_cons, thresholds.quantile_as_cons
        ),
        &events,
    );

    let lookup = meta_lookup(meta);
    for e in events.iter_mut() {
        e.meta = lookup
            .get(&e.scored.annotated.event.sample_name)
            .cloned()
            .flatten();
    }
    events
}
