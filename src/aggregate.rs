use log::info;
use rustc_hash::FxHashSet;

use crate::config::PartitionBy;
use crate::novexon_structs::{novel_span, AggregatedEvent, AnnotatedEvent, Event, EventType, Strand};
use crate::sorts::{group_sorted_by, last_by};

/// (exon_id, seqname, start, end, strand, event_type, sample_name, is_annotated)
type SampleEventKey = (String, String, i64, i64, Strand, EventType, String, bool);

/// Concatenates per-sample event tables.
pub fn merge_samples(samples: Vec<Vec<Event>>) -> Vec<Event> {
    let n_samples = samples.len();
    let merged: Vec<Event> = samples.into_iter().flatten().collect();
    info!("Merged {} event tables into {} rows", n_samples, merged.len());
    merged
}

fn log_event_stats(stage: &str, events: &[AggregatedEvent]) {
    let unique: FxHashSet<&str> = events.iter().map(|e| e.exon_id.as_str()).collect();
    let novel: Vec<&AggregatedEvent> = events.iter().filter(|e| !e.is_annotated).collect();
    let novel_unique: FxHashSet<&str> = novel.iter().map(|e| e.exon_id.as_str()).collect();
    info!(
        "{}: {} events, {} novel, {} unique, {} novel unique",
        stage,
        events.len(),
        novel.len(),
        unique.len(),
        novel_unique.len()
    );
}

/// Keeps one event per (exon, event type, sample): the variant with the
/// highest `ipsa_min`. Events whose partner is not annotated are dropped.
///
/// Candidates are pre-ordered on their flanks and partner so that equal
/// `ipsa_min` values resolve the same way whatever the input order.
pub fn aggregate_right_elements(events: Vec<Event>) -> Vec<AggregatedEvent> {
    let total = events.len();
    let mut events: Vec<Event> = events.into_iter().filter(|e| e.partner.is_annotated()).collect();
    info!(
        "Dropped {} of {} events with an unannotated partner",
        total - events.len(),
        total
    );

    events.sort_by(|a, b| {
        (
            a.exon.coord_prev,
            a.exon.coord_next,
            a.partner.start(),
            a.partner.end(),
            a.partner.exon_id(),
        )
            .cmp(&(
                b.exon.coord_prev,
                b.exon.coord_next,
                b.partner.start(),
                b.partner.end(),
                b.partner.exon_id(),
            ))
    });

    let aggregated: Vec<AggregatedEvent> = last_by(events, sample_event_key, |e| e.ipsa_min())
        .into_iter()
        .map(AggregatedEvent::from)
        .collect();

    log_event_stats("After aggregating right elements", &aggregated);
    aggregated
}

fn sample_event_key(e: &Event) -> SampleEventKey {
    (
        e.exon.exon_id.clone(),
        e.exon.seqname.clone(),
        e.exon.start,
        e.exon.end,
        e.exon.strand,
        e.event_type,
        e.sample_name.clone(),
        e.exon.is_annotated,
    )
}

impl From<Event> for AggregatedEvent {
    fn from(e: Event) -> Self {
        let ipsa_min = e.ipsa_min();
        let (novel_start, novel_end) = novel_span(e.event_type, e.exon.start, e.exon.end, &e.partner);
        AggregatedEvent {
            exon_id: e.exon.exon_id,
            seqname: e.exon.seqname,
            start: e.exon.start,
            end: e.exon.end,
            strand: e.exon.strand,
            event_type: e.event_type,
            sample_name: e.sample_name,
            is_annotated: e.exon.is_annotated,
            coord_prev: e.exon.coord_prev,
            coord_next: e.exon.coord_next,
            junction_id_l: e.exon.junction_id_l,
            junction_id_r: e.exon.junction_id_r,
            cov: e.exon.cov,
            ipsa_min,
            partner: e.partner,
            novel_start,
            novel_end,
            novel_length: novel_end - novel_start,
        }
    }
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Median ignoring NaN; the mean of the two middle values for even counts.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut values: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Medians across samples of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStats {
    pub exon_id: String,
    pub event_type: String,
    pub is_annotated: bool,
    pub cons_avg: Option<f64>,
    pub ipsa_min: Option<f64>,
    pub cov: Option<f64>,
}

pub fn event_stats(events: &[AnnotatedEvent], partition: PartitionBy) -> Vec<EventStats> {
    group_sorted_by(
        events.iter().collect::<Vec<_>>(),
        |a| {
            (
                a.event.exon_id.clone(),
                a.label(partition).to_string(),
                a.event.is_annotated,
            )
        },
        |a| a.event.ipsa_min,
    )
    .into_iter()
    .map(|((exon_id, event_type, is_annotated), members)| EventStats {
        exon_id,
        event_type,
        is_annotated,
        cons_avg: median(members.iter().map(|a| a.cons_avg)),
        ipsa_min: median(members.iter().map(|a| a.event.ipsa_min as f64)),
        cov: median(members.iter().map(|a| a.event.cov)),
    })
    .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::tests::supported;
    use crate::novexon_structs::{Partner, SpliceClass};

    pub(crate) fn event(sample: &str, event_type: EventType, prev: i64, ipsa: i64) -> Event {
        let mut exon = supported(prev, 200, 300, 400, false);
        exon.ipsa_l = ipsa;
        exon.ipsa_r = ipsa + 1;
        let partner = match event_type {
            EventType::CassetteExon => Partner::Intron { is_annotated: true },
            EventType::AltLeft => Partner::Exon {
                start: 250,
                end: 300,
                cov: 1.0,
                exon_id: "chr1_250_300_+".to_string(),
                is_annotated: true,
            },
            EventType::AltRight => Partner::Exon {
                start: 200,
                end: 260,
                cov: 1.0,
                exon_id: "chr1_200_260_+".to_string(),
                is_annotated: true,
            },
        };
        Event {
            exon,
            event_type,
            partner,
            sample_name: sample.to_string(),
        }
    }

    #[test]
    fn highest_support_variant_wins() {
        let events = vec![
            event("s1", EventType::CassetteExon, 100, 5),
            event("s1", EventType::CassetteExon, 90, 20),
            event("s1", EventType::CassetteExon, 80, 1),
            event("s2", EventType::CassetteExon, 80, 3),
        ];
        let aggregated = aggregate_right_elements(events);
        assert_eq!(aggregated.len(), 2);
        let s1 = aggregated.iter().find(|a| a.sample_name == "s1").unwrap();
        assert_eq!(s1.coord_prev, 90);
        assert_eq!(s1.ipsa_min, 20);
        let s2 = aggregated.iter().find(|a| a.sample_name == "s2").unwrap();
        assert_eq!(s2.coord_prev, 80);
    }

    #[test]
    fn ties_resolve_independently_of_input_order() {
        let forward = vec![
            event("s1", EventType::CassetteExon, 100, 7),
            event("s1", EventType::CassetteExon, 90, 7),
        ];
        let mut backward = forward.clone();
        backward.reverse();
        let a = aggregate_right_elements(forward);
        let b = aggregate_right_elements(backward);
        assert_eq!(a, b);
        assert_eq!(a[0].coord_prev, 100);
    }

    #[test]
    fn unannotated_partners_are_dropped() {
        let mut e = event("s1", EventType::AltLeft, 100, 5);
        if let Partner::Exon { is_annotated, .. } = &mut e.partner {
            *is_annotated = false;
        }
        assert!(aggregate_right_elements(vec![e]).is_empty());
    }

    #[test]
    fn novel_coordinates_follow_event_type() {
        let aggregated = aggregate_right_elements(vec![
            event("s1", EventType::CassetteExon, 100, 5),
            event("s1", EventType::AltLeft, 100, 5),
            event("s1", EventType::AltRight, 100, 5),
        ]);
        let span = |t: EventType| {
            let a = aggregated.iter().find(|a| a.event_type == t).unwrap();
            assert_eq!(a.novel_length, a.novel_end - a.novel_start);
            assert!(a.novel_start < a.novel_end);
            (a.novel_start, a.novel_end)
        };
        assert_eq!(span(EventType::CassetteExon), (200, 300));
        assert_eq!(span(EventType::AltLeft), (200, 250));
        assert_eq!(span(EventType::AltRight), (260, 300));
    }

    #[test]
    fn median_and_mean_ignore_nan() {
        assert_eq!(median([3.0, 1.0, f64::NAN, 2.0]), Some(2.0));
        assert_eq!(median([4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(std::iter::empty()), None);
        assert_eq!(mean([1.0, 2.0, f64::NAN]), Some(1.5));
    }

    #[test]
    fn stats_group_samples_of_one_event() {
        let annotated: Vec<AnnotatedEvent> = aggregate_right_elements(vec![
            event("s1", EventType::CassetteExon, 100, 2),
            event("s2", EventType::CassetteExon, 100, 6),
        ])
        .into_iter()
        .map(|event| AnnotatedEvent {
            event,
            splice_class: SpliceClass::CassetteExon,
            cons_avg: 0.5,
            ann_frac: 0.0,
        })
        .collect();
        let stats = event_stats(&annotated, PartitionBy::EventType);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].event_type, "CE");
        assert_eq!(stats[0].ipsa_min, Some(4.0));
        assert_eq!(stats[0].cons_avg, Some(0.5));
    }
}
