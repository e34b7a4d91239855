use log::info;
use rustc_hash::FxHashMap;

use crate::annotation::AnnotationIndex;
use crate::novexon_structs::{composite_id, Exon, GeneModelRecord, Strand};
use crate::sorts::{group_sorted_by, unique_by};

type IntervalKey = (String, i64, i64, Strand);

impl Exon {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seqname: String,
        start: i64,
        end: i64,
        strand: Strand,
        gene_id: String,
        coord_prev: Option<i64>,
        coord_next: Option<i64>,
        is_annotated: bool,
        cov: f64,
    ) -> Self {
        let exon_id = composite_id(&seqname, start, end, strand);
        let junction_id_l = coord_prev.map(|prev| composite_id(&seqname, prev, start, strand));
        let junction_id_r = coord_next.map(|next| composite_id(&seqname, end, next, strand));
        Exon {
            seqname,
            start,
            end,
            strand,
            gene_id,
            coord_prev,
            coord_next,
            is_annotated,
            cov,
            exon_id,
            junction_id_l,
            junction_id_r,
        }
    }
}

/// Orders the exons of every transcript by start and pairs each with the end
/// of the previous exon and the start of the next one.
pub fn link_transcript_exons(
    exons: Vec<GeneModelRecord>,
) -> Vec<(GeneModelRecord, Option<i64>, Option<i64>)> {
    let mut linked = Vec::with_capacity(exons.len());

    for (_, transcript) in group_sorted_by(exons, |r| r.transcript_id.clone(), |r| r.start) {
        let ends: Vec<i64> = transcript.iter().map(|r| r.end).collect();
        let starts: Vec<i64> = transcript.iter().map(|r| r.start).collect();
        for (i, exon) in transcript.into_iter().enumerate() {
            let coord_prev = i.checked_sub(1).map(|j| ends[j]);
            let coord_next = starts.get(i + 1).copied();
            linked.push((exon, coord_prev, coord_next));
        }
    }

    linked
}

/// Collapses assembled exons across transcripts into one row per distinct
/// (interval, gene, neighbour pair), with coverage summed over the interval.
///
/// Isoforms that agree on the neighbours of an interval collapse into one
/// row; isoforms that disagree stay separate variants sharing an `exon_id`.
pub fn build_exon_graph(records: Vec<GeneModelRecord>, index: &AnnotationIndex) -> Vec<Exon> {
    let exons: Vec<GeneModelRecord> = records.into_iter().filter(|r| r.is_exon()).collect();
    let linked = link_transcript_exons(exons);

    let mut coverage: FxHashMap<IntervalKey, f64> = FxHashMap::default();
    for (r, _, _) in &linked {
        *coverage
            .entry((r.seqname.clone(), r.start, r.end, r.strand))
            .or_insert(0.0) += r.cov.unwrap_or(0.0);
    }

    let total = linked.len();
    let (variants, collapsed) = unique_by(linked, |(r, prev, next)| {
        (
            r.seqname.clone(),
            r.start,
            r.end,
            r.strand,
            r.gene_id.clone(),
            *prev,
            *next,
        )
    });

    let mut graph: Vec<Exon> = variants
        .into_iter()
        .map(|(r, coord_prev, coord_next)| {
            let cov = coverage
                .get(&(r.seqname.clone(), r.start, r.end, r.strand))
                .copied()
                .unwrap_or(0.0);
            let is_annotated = index.contains_exon(&r.seqname, r.start, r.end, r.strand);
            Exon::new(
                r.seqname,
                r.start,
                r.end,
                r.strand,
                r.gene_id,
                coord_prev,
                coord_next,
                is_annotated,
                cov,
            )
        })
        .collect();

    graph.sort_by(|a, b| {
        (&a.seqname, a.start, a.end, a.strand, a.coord_prev, a.coord_next, &a.gene_id).cmp(&(
            &b.seqname,
            b.start,
            b.end,
            b.strand,
            b.coord_prev,
            b.coord_next,
            &b.gene_id,
        ))
    });

    info!(
        "Exon graph: {} assembled exons, {} collapsed, {} variants over {} intervals",
        total,
        collapsed,
        graph.len(),
        coverage.len()
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::tests::record;
    use crate::config::PROTEIN_CODING;

    fn assembled(transcript_id: &str, start: i64, end: i64, cov: f64) -> GeneModelRecord {
        let mut r = record("exon", transcript_id, start, end, None);
        r.cov = Some(cov);
        r
    }

    fn assembly() -> Vec<GeneModelRecord> {
        vec![
            assembled("a", 200, 300, 2.0),
            assembled("a", 10, 100, 1.0),
            assembled("a", 400, 500, 1.0),
            assembled("b", 10, 100, 3.0),
            assembled("b", 400, 500, 3.0),
            assembled("c", 400, 500, 0.5),
            assembled("c", 10, 100, 0.5),
            assembled("c", 200, 300, 0.5),
            record("transcript", "a", 10, 500, None),
        ]
    }

    #[test]
    fn neighbours_follow_start_order() {
        let graph = build_exon_graph(assembly(), &AnnotationIndex::default());
        let middle: Vec<&Exon> = graph.iter().filter(|e| e.start == 200).collect();
        assert_eq!(middle.len(), 1);
        assert_eq!(middle[0].coord_prev, Some(100));
        assert_eq!(middle[0].coord_next, Some(400));
        assert_eq!(middle[0].junction_id_l.as_deref(), Some("chr1_100_200_+"));
        assert_eq!(middle[0].junction_id_r.as_deref(), Some("chr1_300_400_+"));
        assert_eq!(middle[0].exon_id, "chr1_200_300_+");

        for e in &graph {
            if let (Some(prev), Some(next)) = (e.coord_prev, e.coord_next) {
                assert!(prev < e.start && e.start <= e.end && e.end < next);
            }
        }
    }

    #[test]
    fn coverage_is_summed_over_isoforms() {
        let graph = build_exon_graph(assembly(), &AnnotationIndex::default());
        let first: Vec<&Exon> = graph.iter().filter(|e| e.start == 10).collect();
        // "a" and "c" share the 10-100 -> 200 neighbours, "b" skips to 400
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|e| (e.cov - 4.5).abs() < 1e-9));
        assert!(first.iter().all(|e| e.coord_prev.is_none()));
        let nexts: Vec<Option<i64>> = first.iter().map(|e| e.coord_next).collect();
        assert_eq!(nexts, vec![Some(200), Some(400)]);
    }

    #[test]
    fn graph_is_independent_of_input_order() {
        let mut reversed = assembly();
        reversed.reverse();
        let a = build_exon_graph(assembly(), &AnnotationIndex::default());
        let b = build_exon_graph(reversed, &AnnotationIndex::default());
        let ids_a: Vec<(&str, Option<i64>, Option<i64>)> =
            a.iter().map(|e| (e.exon_id.as_str(), e.coord_prev, e.coord_next)).collect();
        let ids_b: Vec<(&str, Option<i64>, Option<i64>)> =
            b.iter().map(|e| (e.exon_id.as_str(), e.coord_prev, e.coord_next)).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn annotation_flag_uses_exact_interval() {
        let pc = Some(PROTEIN_CODING);
        let index = AnnotationIndex::from_gene_model(vec![
            record("exon", "ref", 10, 100, pc),
            record("exon", "ref", 400, 500, pc),
        ]);
        let graph = build_exon_graph(assembly(), &index);
        assert!(graph.iter().filter(|e| e.start == 10).all(|e| e.is_annotated));
        assert!(graph.iter().filter(|e| e.start == 200).all(|e| !e.is_annotated));
    }
}
