use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use crate::aggregate::mean;
use crate::config::{ReportConfig, BED_LEFT_FLANK, BED_RIGHT_FLANK, LINK_FLANK, SUMMARY_DECIMALS};
use crate::ecdf::round_to;
use crate::novexon_structs::{AggregatedEvent, EventType, NovelEvent, Strand};
use crate::sorts::{group_sorted_by, unique_by};

/// Region handed to the external conservation/annotation lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NovelRegion {
    pub seqname: String,
    pub start: i64,
    pub end: i64,
    pub exon_id: String,
    pub event_type: EventType,
}

/// The novel part of each distinct event, widened by `radius` on both sides
/// (plus one base on the left to move from GTF to BED starts).
pub fn novel_regions(events: &[AggregatedEvent], radius: i64) -> Vec<NovelRegion> {
    let regions: Vec<NovelRegion> = events
        .iter()
        .map(|e| NovelRegion {
            seqname: e.seqname.clone(),
            start: e.novel_start,
            end: e.novel_end,
            exon_id: e.exon_id.clone(),
            event_type: e.event_type,
        })
        .collect();
    let (mut regions, _) = unique_by(regions, |r| r.clone());
    regions.sort_by_key(|r| r.event_type);
    regions
        .into_iter()
        .map(|r| NovelRegion {
            start: r.start - radius - 1,
            end: r.end + radius,
            ..r
        })
        .collect()
}

/// One line per novel exon across all samples.
#[derive(Debug, Clone, PartialEq)]
pub struct NovelExonSummary {
    pub seqname: String,
    pub start: i64,
    pub end: i64,
    pub exon_id: String,
    pub strand: Strand,
    pub event_type: EventType,
    pub junction_id_l: String,
    pub junction_id_r: String,
    pub coord_prev: i64,
    pub coord_next: i64,
    pub novel_length: i64,
    pub expr_exon: Option<f64>,
    pub expr_junction: Option<f64>,
    pub phastcons: Option<f64>,
    pub meta: String,
    pub sample_count: usize,
    pub gb_link: String,
}

pub fn genome_browser_link(genome: &str, seqname: &str, start: i64, end: i64) -> String {
    format!(
        "https://www.genome-euro.ucsc.edu/cgi-bin/hgTracks?db={}&position={}%3A{}%2D{}",
        genome, seqname, start, end
    )
}

fn flank_key(e: &AggregatedEvent) -> (i64, i64, Option<i64>, Option<i64>, Option<&str>) {
    (e.coord_prev, e.coord_next, e.partner.start(), e.partner.end(), e.partner.exon_id())
}

/// Collapses filtered events over samples. Flanks and junction ids come from
/// the best-supported sample; expression and conservation are averaged.
pub fn summarize_novel_exons(mut events: Vec<NovelEvent>, config: &ReportConfig) -> Vec<NovelExonSummary> {
    events.sort_by(|a, b| {
        let (a, b) = (&a.scored.annotated.event, &b.scored.annotated.event);
        flank_key(a)
            .cmp(&flank_key(b))
            .then_with(|| a.sample_name.cmp(&b.sample_name))
    });
    let groups = group_sorted_by(
        events,
        |e| {
            let a = &e.scored.annotated.event;
            (
                a.seqname.clone(),
                a.start,
                a.end,
                a.exon_id.clone(),
                a.strand,
                a.event_type,
            )
        },
        |e| e.scored.annotated.event.ipsa_min,
    );

    groups
        .into_iter()
        .filter_map(|((seqname, start, end, exon_id, strand, event_type), members)| {
            let best = &members.last()?.scored.annotated.event;
            let rounded = |v: Option<f64>| v.map(|x| round_to(x, SUMMARY_DECIMALS));
            let labels: BTreeSet<&str> = members.iter().filter_map(|m| m.meta.as_deref()).collect();
            let samples: FxHashSet<&str> = members
                .iter()
                .map(|m| m.scored.annotated.event.sample_name.as_str())
                .collect();
            Some(NovelExonSummary {
                gb_link: genome_browser_link(
                    &config.genome,
                    &seqname,
                    best.coord_prev - LINK_FLANK,
                    best.coord_next + LINK_FLANK,
                ),
                junction_id_l: best.junction_id_l.clone(),
                junction_id_r: best.junction_id_r.clone(),
                coord_prev: best.coord_prev,
                coord_next: best.coord_next,
                novel_length: best.novel_length,
                expr_exon: rounded(mean(members.iter().map(|m| m.scored.annotated.event.cov))),
                expr_junction: rounded(mean(
                    members.iter().map(|m| m.scored.annotated.event.ipsa_min as f64),
                )),
                phastcons: rounded(mean(members.iter().map(|m| m.scored.annotated.cons_avg))),
                meta: labels.into_iter().collect::<Vec<_>>().join(","),
                sample_count: samples.len(),
                seqname,
                start,
                end,
                exon_id,
                strand,
                event_type,
            })
        })
        .collect()
}

pub fn track_header(track_name: &str) -> String {
    format!("track name={} description=\"Novel exon predictions\"", track_name)
}

/// BED12 line drawing the exon between short blocks on its flanking exons.
pub fn bed12_line(s: &NovelExonSummary) -> String {
    let chrom_start = s.coord_prev - BED_LEFT_FLANK;
    let chrom_end = s.coord_next + BED_RIGHT_FLANK;
    let block_sizes = format!("{f},{},{f}", s.end - s.start + 1, f = BED_LEFT_FLANK);
    let block_starts = format!(
        "0,{},{}",
        s.start - s.coord_prev + BED_RIGHT_FLANK,
        s.coord_next - s.coord_prev + BED_RIGHT_FLANK
    );
    [
        s.seqname.clone(),
        chrom_start.to_string(),
        chrom_end.to_string(),
        s.exon_id.clone(),
        "0".to_string(),
        s.strand.to_string(),
        chrom_start.to_string(),
        chrom_end.to_string(),
        "0,0,0".to_string(),
        "3".to_string(),
        block_sizes,
        block_starts,
    ]
    .join("\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_right_elements;
    use crate::aggregate::tests::event;
    use crate::filter::tests::scored;

    fn novel(sample: &str, ipsa: i64, prev: i64, meta: Option<&str>) -> NovelEvent {
        let mut s = scored(EventType::CassetteExon, 0.9, 0.0);
        let a = &mut s.annotated.event;
        a.sample_name = sample.to_string();
        a.ipsa_min = ipsa;
        a.cov = ipsa as f64;
        a.coord_prev = prev;
        NovelEvent {
            scored: s,
            is_left_novel: true,
            is_right_novel: true,
            meta: meta.map(str::to_string),
        }
    }

    #[test]
    fn regions_cover_the_novel_part() {
        let events = aggregate_right_elements(vec![
            event("s1", EventType::CassetteExon, 100, 5),
            event("s2", EventType::CassetteExon, 100, 5),
            event("s1", EventType::AltLeft, 100, 5),
            event("s1", EventType::AltRight, 100, 5),
        ]);
        let regions = novel_regions(&events, 1);
        let spans: Vec<(EventType, i64, i64)> = regions.iter().map(|r| (r.event_type, r.start, r.end)).collect();
        assert_eq!(
            spans,
            vec![
                (EventType::CassetteExon, 198, 301),
                (EventType::AltLeft, 198, 251),
                (EventType::AltRight, 258, 301),
            ]
        );
    }

    #[test]
    fn summary_takes_flanks_from_best_sample() {
        let summary = summarize_novel_exons(
            vec![
                novel("s1", 3, 90, Some("liver")),
                novel("s2", 8, 100, Some("brain")),
                novel("s2", 1, 80, None),
            ],
            &ReportConfig::default(),
        );
        assert_eq!(summary.len(), 1);
        let s = &summary[0];
        assert_eq!(s.coord_prev, 100);
        assert_eq!(s.sample_count, 2);
        assert_eq!(s.meta, "brain,liver");
        assert_eq!(s.expr_exon, Some(4.0));
        assert_eq!(
            s.gb_link,
            "https://www.genome-euro.ucsc.edu/cgi-bin/hgTracks?db=hg38&position=chr1%3A90%2D410"
        );
    }

    #[test]
    fn summary_ties_resolve_independently_of_input_order() {
        let forward = vec![novel("s1", 5, 100, None), novel("s2", 5, 90, None)];
        let mut backward = forward.clone();
        backward.reverse();
        let config = ReportConfig::default();
        let a = summarize_novel_exons(forward, &config);
        let b = summarize_novel_exons(backward, &config);
        assert_eq!(a, b);
        assert_eq!(a[0].coord_prev, 100);
    }

    #[test]
    fn bed12_blocks() {
        let summary = summarize_novel_exons(vec![novel("s1", 3, 100, None)], &ReportConfig::default());
        assert_eq!(
            bed12_line(&summary[0]),
            "chr1\t95\t404\tchr1_200_300_+\t0\t+\t95\t404\t0,0,0\t3\t5,101,5\t0,104,304"
        );
        assert_eq!(
            track_header("NExon"),
            "track name=NExon description=\"Novel exon predictions\""
        );
    }
}
