use std::cmp::Ordering;

use log::{debug, info, warn};
use num_traits::Float;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::{EmptyReferencePolicy, PartitionBy, ScoringConfig, CDF_DECIMALS};
use crate::errors::{NovexonError, Result};
use crate::novexon_structs::{AnnotatedEvent, CdfScores, ScoredEvent};

/// Empirical CDF of a reference sample: `F(v) = #{x <= v} / n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ecdf<T: Float> {
    sorted: Vec<T>,
}

impl<T: Float> Ecdf<T> {
    /// Fits on the non-NaN values; `None` when nothing is left to fit on.
    pub fn fit(values: impl IntoIterator<Item = T>) -> Option<Self> {
        let mut sorted: Vec<T> = values.into_iter().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        Some(Ecdf { sorted })
    }

    pub fn evaluate(&self, value: T) -> Option<f64> {
        if value.is_nan() {
            return None;
        }
        let at_or_below = self.sorted.partition_point(|x| *x <= value);
        Some(at_or_below as f64 / self.sorted.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

/// Rounds half to even, matching NumPy's `round`.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

impl AnnotatedEvent {
    pub fn label(&self, partition: PartitionBy) -> &'static str {
        match partition {
            PartitionBy::EventType => self.event.event_type.as_str(),
            PartitionBy::SpliceClass => self.splice_class.as_str(),
        }
    }
}

/// Scores every event against the annotated events sharing its sample and
/// partition label. Partitions are fitted independently and in parallel.
pub fn score_events(events: Vec<AnnotatedEvent>, config: &ScoringConfig) -> Result<Vec<ScoredEvent>> {
    let mut partitions: FxHashMap<(String, &'static str), Vec<AnnotatedEvent>> = FxHashMap::default();
    for event in events {
        let key = (event.event.sample_name.clone(), event.label(config.partition));
        partitions.entry(key).or_default().push(event);
    }
    let mut partitions: Vec<((String, &'static str), Vec<AnnotatedEvent>)> = partitions.into_iter().collect();
    partitions.sort_by(|a, b| a.0.cmp(&b.0));
    info!("Scoring {} (sample, event type) partitions", partitions.len());

    let scored = partitions
        .into_par_iter()
        .map(|((sample_name, label), members)| {
            score_partition(&sample_name, label, members, config.empty_reference)
        })
        .collect::<Result<Vec<Vec<ScoredEvent>>>>()?;

    Ok(scored.into_iter().flatten().collect())
}

fn fit_metric(
    members: &[AnnotatedEvent],
    metric: &str,
    value: impl Fn(&AnnotatedEvent) -> f64,
    sample_name: &str,
    label: &str,
    policy: EmptyReferencePolicy,
) -> Result<Option<Ecdf<f64>>> {
    let reference: Vec<f64> = members.iter().filter(|a| a.event.is_annotated).map(value).collect();
    let nan = reference.iter().filter(|v| v.is_nan()).count();
    if nan > 0 {
        warn!(
            "Ignoring {} NaN {} values of sample {} partition {}",
            nan, metric, sample_name, label
        );
    }
    if let Some(ecdf) = Ecdf::fit(reference) {
        return Ok(Some(ecdf));
    }
    match policy {
        EmptyReferencePolicy::Fail => Err(NovexonError::EmptyReference {
            sample_name: sample_name.to_string(),
            partition: label.to_string(),
            metric: metric.to_string(),
        }),
        EmptyReferencePolicy::Null => {
            warn!(
                "No annotated {} values for sample {} partition {}; scores left empty",
                metric, sample_name, label
            );
            Ok(None)
        }
    }
}

fn score_partition(
    sample_name: &str,
    label: &str,
    members: Vec<AnnotatedEvent>,
    policy: EmptyReferencePolicy,
) -> Result<Vec<ScoredEvent>> {
    let cons_avg = fit_metric(&members, "cons_avg", |a| a.cons_avg, sample_name, label, policy)?;
    let ipsa_min = fit_metric(&members, "ipsa_min", |a| a.event.ipsa_min as f64, sample_name, label, policy)?;
    let cov = fit_metric(&members, "cov", |a| a.event.cov, sample_name, label, policy)?;
    debug!(
        "Partition {}/{}: {} events, {} annotated",
        sample_name,
        label,
        members.len(),
        cov.as_ref().map_or(0, Ecdf::len)
    );

    let eval = |ecdf: &Option<Ecdf<f64>>, v: f64| {
        ecdf.as_ref()
            .and_then(|f| f.evaluate(v))
            .map(|p| round_to(p, CDF_DECIMALS))
    };

    Ok(members
        .into_iter()
        .map(|annotated| {
            let scores = CdfScores {
                cons_avg: eval(&cons_avg, annotated.cons_avg),
                ipsa_min: eval(&ipsa_min, annotated.event.ipsa_min as f64),
                cov: eval(&cov, annotated.event.cov),
            };
            ScoredEvent {
                annotated,
                ann_cdf_min: scores.min(),
                scores,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_right_elements;
    use crate::aggregate::tests::event;
    use crate::novexon_structs::{EventType, SpliceClass};

    fn annotated(sample: &str, event_type: EventType, cov: f64, is_annotated: bool) -> AnnotatedEvent {
        let mut aggregated = aggregate_right_elements(vec![event(sample, event_type, 100, 5)]).remove(0);
        aggregated.cov = cov;
        aggregated.is_annotated = is_annotated;
        AnnotatedEvent {
            splice_class: SpliceClass::of(aggregated.event_type, aggregated.strand),
            event: aggregated,
            cons_avg: cov / 10.0,
            ann_frac: 0.0,
        }
    }

    #[test]
    fn ecdf_counts_reference_values_at_or_below() {
        let f = Ecdf::fit([1.0, 2.0, 5.0]).unwrap();
        assert_eq!(f.evaluate(2.0).map(|p| round_to(p, 4)), Some(0.6667));
        assert_eq!(f.evaluate(10.0), Some(1.0));
        assert_eq!(f.evaluate(0.5), Some(0.0));
        assert_eq!(f.evaluate(5.0), Some(1.0));
        assert_eq!(f.evaluate(f64::NAN), None);
    }

    #[test]
    fn ecdf_is_monotone_and_bounded() {
        let f = Ecdf::fit([3.0_f32, f32::NAN, 1.0, 1.0, 8.0]).unwrap();
        assert_eq!(f.len(), 4);
        let mut last = 0.0;
        for i in -5..20 {
            let p = f.evaluate(i as f32 * 0.5).unwrap();
            assert!((0.0..=1.0).contains(&p));
            assert!(p >= last);
            last = p;
        }
        assert_eq!(last, 1.0);
        assert!(Ecdf::<f64>::fit([f64::NAN]).is_none());
    }

    #[test]
    fn novel_events_are_scored_against_annotated_ones() {
        let events = vec![
            annotated("s1", EventType::CassetteExon, 1.0, true),
            annotated("s1", EventType::CassetteExon, 2.0, true),
            annotated("s1", EventType::CassetteExon, 5.0, true),
            annotated("s1", EventType::CassetteExon, 2.0, false),
            annotated("s1", EventType::CassetteExon, 10.0, false),
            annotated("s1", EventType::CassetteExon, 0.5, false),
        ];
        let scored = score_events(events, &ScoringConfig::default()).unwrap();
        let covs: Vec<(bool, Option<f64>)> = scored
            .iter()
            .filter(|s| !s.annotated.event.is_annotated)
            .map(|s| (s.annotated.event.is_annotated, s.scores.cov))
            .collect();
        assert_eq!(
            covs,
            vec![(false, Some(0.6667)), (false, Some(1.0)), (false, Some(0.0))]
        );
        // every event has the same ipsa_min, so that score is 1.0 everywhere
        assert!(scored.iter().all(|s| s.scores.ipsa_min == Some(1.0)));
        let lowest = scored.iter().find(|s| s.annotated.event.cov == 0.5).unwrap();
        assert_eq!(lowest.ann_cdf_min, Some(0.0));
    }

    #[test]
    fn partitions_do_not_share_references() {
        let events = vec![
            annotated("s1", EventType::CassetteExon, 1.0, true),
            annotated("s2", EventType::CassetteExon, 100.0, true),
            annotated("s1", EventType::CassetteExon, 50.0, false),
        ];
        let scored = score_events(events, &ScoringConfig::default()).unwrap();
        let novel = scored.iter().find(|s| !s.annotated.event.is_annotated).unwrap();
        assert_eq!(novel.scores.cov, Some(1.0));
    }

    #[test]
    fn empty_reference_population() {
        let events = vec![annotated("s1", EventType::AltLeft, 1.0, false)];
        let scored = score_events(events.clone(), &ScoringConfig::default()).unwrap();
        assert_eq!(scored[0].scores, CdfScores::default());
        assert_eq!(scored[0].ann_cdf_min, None);

        let strict = ScoringConfig {
            empty_reference: EmptyReferencePolicy::Fail,
            ..ScoringConfig::default()
        };
        assert!(matches!(
            score_events(events, &strict),
            Err(NovexonError::EmptyReference { .. })
        ));
    }

    #[test]
    fn splice_class_partitions_merge_opposite_sites() {
        // forward-strand AL and AR are 3' and 5' sites, so they stay apart
        let events = vec![
            annotated("s1", EventType::AltLeft, 1.0, true),
            annotated("s1", EventType::AltRight, 3.0, false),
        ];
        let config = ScoringConfig {
            partition: PartitionBy::SpliceClass,
            ..ScoringConfig::default()
        };
        let scored = score_events(events, &config).unwrap();
        let ar = scored
            .iter()
            .find(|s| s.annotated.event.event_type == EventType::AltRight)
            .unwrap();
        assert_eq!(ar.annotated.label(PartitionBy::SpliceClass), "5'AS");
        assert_eq!(ar.scores.cov, None);
    }
}
