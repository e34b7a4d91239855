use log::info;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::annotation::AnnotationIndex;
use crate::novexon_structs::{Event, EventType, Partner, SupportedExon};

/// (seqname, shared flank, shared boundary)
type FlankKey<'a> = (&'a str, i64, i64);

/// Classifies supported exons into CE, AL and AR events, in that order.
///
/// An exon is kept once per match, so it can appear under several event
/// types and with several partners.
pub fn detect_events(
    exons: &[SupportedExon],
    index: &AnnotationIndex,
    sample_name: &str,
) -> Vec<Event> {
    let cassette = cassette_exons(exons, index, sample_name);
    let alt_left = alternative_sites(exons, EventType::AltLeft, sample_name);
    let alt_right = alternative_sites(exons, EventType::AltRight, sample_name);

    info!(
        "Events in {}: {} CE, {} AL, {} AR",
        sample_name,
        cassette.len(),
        alt_left.len(),
        alt_right.len()
    );

    let mut events = cassette;
    events.extend(alt_left);
    events.extend(alt_right);
    events
}

/// Exons whose two flanks are the two ends of one reference intron.
fn cassette_exons(exons: &[SupportedExon], index: &AnnotationIndex, sample_name: &str) -> Vec<Event> {
    exons
        .iter()
        .filter(|e| index.spans_intron(&e.seqname, e.coord_prev, e.coord_next))
        .map(|e| Event {
            exon: e.clone(),
            event_type: EventType::CassetteExon,
            partner: Partner::Intron { is_annotated: true },
            sample_name: sample_name.to_string(),
        })
        .collect()
}

/// Self-join on one shared flank and boundary.
///
/// AL pairs share `(coord_prev, end)` and keep the exon that starts further
/// upstream; AR pairs share `(coord_next, start)` and keep the exon that ends
/// further downstream.
fn alternative_sites(exons: &[SupportedExon], event_type: EventType, sample_name: &str) -> Vec<Event> {
    let key_of = |e: &SupportedExon| -> (i64, i64) {
        match event_type {
            EventType::AltRight => (e.coord_next, e.start),
            _ => (e.coord_prev, e.end),
        }
    };

    // partner side is unique on (exon_id, shared flank)
    let mut seen: FxHashSet<(&str, i64)> = FxHashSet::default();
    let mut partners: FxHashMap<FlankKey<'_>, Vec<&SupportedExon>> = FxHashMap::default();
    for e in exons {
        let (flank, boundary) = key_of(e);
        if seen.insert((e.exon_id.as_str(), flank)) {
            partners
                .entry((e.seqname.as_str(), flank, boundary))
                .or_default()
                .push(e);
        }
    }

    let mut events = Vec::new();
    for e in exons {
        let (flank, boundary) = key_of(e);
        let Some(candidates) = partners.get(&(e.seqname.as_str(), flank, boundary)) else {
            continue;
        };
        for p in candidates {
            let extends = match event_type {
                EventType::AltRight => e.end > p.end,
                _ => e.start < p.start,
            };
            if !extends {
                continue;
            }
            events.push(Event {
                exon: e.clone(),
                event_type,
                partner: Partner::Exon {
                    start: p.start,
                    end: p.end,
                    cov: p.cov,
                    exon_id: p.exon_id.clone(),
                    is_annotated: p.is_annotated,
                },
                sample_name: sample_name.to_string(),
            });
        }
    }
    events
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::annotation::tests::record;
    use crate::config::PROTEIN_CODING;
    use crate::novexon_structs::{composite_id, Strand};

    pub(crate) fn supported(prev: i64, start: i64, end: i64, next: i64, annotated: bool) -> SupportedExon {
        let s = Strand::Forward;
        SupportedExon {
            seqname: "chr1".to_string(),
            start,
            end,
            strand: s,
            gene_id: "g1".to_string(),
            coord_prev: prev,
            coord_next: next,
            is_annotated: annotated,
            cov: 2.0,
            exon_id: composite_id("chr1", start, end, s),
            junction_id_l: composite_id("chr1", prev, start, s),
            junction_id_r: composite_id("chr1", end, next, s),
            ipsa_l: 10,
            ipsa_r: 4,
        }
    }

    fn reference_with_intron(end: i64, next: i64) -> AnnotationIndex {
        let pc = Some(PROTEIN_CODING);
        AnnotationIndex::from_gene_model(vec![
            record("exon", "ref", end - 50, end, pc),
            record("exon", "ref", next, next + 50, pc),
        ])
    }

    #[test]
    fn exon_inside_reference_intron_is_cassette() {
        let index = reference_with_intron(100, 400);
        let events = detect_events(&[supported(100, 200, 300, 400, false)], &index, "s1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::CassetteExon);
        assert!(events[0].partner.is_annotated());
        assert_eq!(events[0].sample_name, "s1");
    }

    #[test]
    fn flanks_must_match_the_intron_exactly() {
        let index = reference_with_intron(100, 400);
        let events = detect_events(&[supported(100, 200, 300, 450, false)], &index, "s1");
        assert!(events.is_empty());
    }

    #[test]
    fn alternative_left_keeps_the_upstream_exon() {
        let exons = vec![
            supported(100, 150, 300, 400, false),
            supported(100, 200, 300, 400, true),
        ];
        let events = detect_events(&exons, &AnnotationIndex::default(), "s1");
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.event_type, EventType::AltLeft);
        assert_eq!(e.exon.start, 150);
        assert_eq!(e.partner.start(), Some(200));
        assert_eq!(e.partner.exon_id(), Some("chr1_200_300_+"));
        assert!(e.partner.is_annotated());
    }

    #[test]
    fn alternative_right_keeps_the_downstream_exon() {
        let exons = vec![
            supported(100, 200, 300, 500, true),
            supported(100, 200, 350, 500, false),
        ];
        let events = detect_events(&exons, &AnnotationIndex::default(), "s1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::AltRight);
        assert_eq!(events[0].exon.end, 350);
        assert_eq!(events[0].partner.end(), Some(300));
    }

    #[test]
    fn partner_variants_pair_once() {
        // the partner 200-300 is seen with two different downstream neighbours
        let exons = vec![
            supported(100, 150, 300, 400, false),
            supported(100, 200, 300, 400, true),
            supported(100, 200, 300, 500, true),
        ];
        let events = detect_events(&exons, &AnnotationIndex::default(), "s1");
        let alt_left: Vec<&Event> = events.iter().filter(|e| e.event_type == EventType::AltLeft).collect();
        assert_eq!(alt_left.len(), 1);
        assert_eq!(alt_left[0].exon.start, 150);
        assert_eq!(alt_left[0].partner.exon_id(), Some("chr1_200_300_+"));
    }

    #[test]
    fn an_exon_can_be_cassette_and_alternative() {
        let index = reference_with_intron(100, 400);
        let exons = vec![
            supported(100, 200, 300, 400, false),
            supported(100, 200, 250, 400, true),
        ];
        let events = detect_events(&exons, &index, "s1");
        let types: Vec<(i64, EventType)> = events.iter().map(|e| (e.exon.end, e.event_type)).collect();
        assert_eq!(
            types,
            vec![
                (300, EventType::CassetteExon),
                (250, EventType::CassetteExon),
                (300, EventType::AltRight),
            ]
        );
    }
}
