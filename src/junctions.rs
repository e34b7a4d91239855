use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::config::CANONICAL_MOTIF;
use crate::novexon_structs::{Exon, Junction, SupportedExon};

/// Read support of canonical, annotated-strand junctions keyed by junction id.
#[derive(Debug, Default, Clone)]
pub struct JunctionTable {
    counts: FxHashMap<String, i64>,
}

impl JunctionTable {
    /// Keeps `GTAG` junctions with a positive annotation status. A junction id
    /// seen more than once keeps its first count.
    pub fn from_junctions(junctions: Vec<Junction>) -> Self {
        let total = junctions.len();
        let mut counts: FxHashMap<String, i64> = FxHashMap::default();
        let mut duplicates = 0;

        for j in junctions
            .into_iter()
            .filter(|j| j.splice_site == CANONICAL_MOTIF && j.annotation_status > 0)
        {
            if counts.contains_key(&j.junction_id) {
                duplicates += 1;
                continue;
            }
            counts.insert(j.junction_id, j.total_count);
        }

        if duplicates > 0 {
            warn!("Dropped {} duplicate junction ids, kept first occurrence", duplicates);
        }
        info!("Junctions: {} read, {} usable", total, counts.len());
        JunctionTable { counts }
    }

    pub fn total_count(&self, junction_id: &str) -> Option<i64> {
        self.counts.get(junction_id).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Attaches left and right junction counts to every exon. Exons missing
/// support on either flank (first/last exons included) are dropped.
pub fn merge_junction_support(exons: Vec<Exon>, junctions: &JunctionTable) -> Vec<SupportedExon> {
    let total = exons.len();

    let supported: Vec<SupportedExon> = exons
        .into_iter()
        .filter_map(|e| {
            let coord_prev = e.coord_prev?;
            let coord_next = e.coord_next?;
            let junction_id_l = e.junction_id_l?;
            let junction_id_r = e.junction_id_r?;
            let ipsa_l = junctions.total_count(&junction_id_l)?;
            let ipsa_r = junctions.total_count(&junction_id_r)?;
            Some(SupportedExon {
                seqname: e.seqname,
                start: e.start,
                end: e.end,
                strand: e.strand,
                gene_id: e.gene_id,
                coord_prev,
                coord_next,
                is_annotated: e.is_annotated,
                cov: e.cov,
                exon_id: e.exon_id,
                junction_id_l,
                junction_id_r,
                ipsa_l,
                ipsa_r,
            })
        })
        .collect();

    info!(
        "Junction support: {} of {} exons supported on both flanks",
        supported.len(),
        total
    );
    supported
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::novexon_structs::Strand;

    pub(crate) fn junction(id: &str, count: i64) -> Junction {
        Junction {
            junction_id: id.to_string(),
            total_count: count,
            annotation_status: 1,
            splice_site: CANONICAL_MOTIF.to_string(),
        }
    }

    fn exon(prev: Option<i64>, start: i64, end: i64, next: Option<i64>) -> Exon {
        Exon::new(
            "chr1".to_string(),
            start,
            end,
            Strand::Forward,
            "g1".to_string(),
            prev,
            next,
            false,
            1.0,
        )
    }

    #[test]
    fn non_canonical_and_unannotated_junctions_are_ignored() {
        let mut weak = junction("chr1_1_2_+", 7);
        weak.annotation_status = 0;
        let mut gcag = junction("chr1_3_4_+", 7);
        gcag.splice_site = "GCAG".to_string();
        let table = JunctionTable::from_junctions(vec![
            weak,
            gcag,
            junction("chr1_5_6_+", 3),
            junction("chr1_5_6_+", 9),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.total_count("chr1_5_6_+"), Some(3));
        assert_eq!(table.total_count("chr1_1_2_+"), None);
    }

    #[test]
    fn exons_need_support_on_both_flanks() {
        let table = JunctionTable::from_junctions(vec![
            junction("chr1_100_200_+", 12),
            junction("chr1_300_400_+", 5),
        ]);
        let merged = merge_junction_support(
            vec![
                exon(Some(100), 200, 300, Some(400)),
                exon(Some(100), 200, 350, Some(400)),
                exon(None, 200, 300, Some(400)),
            ],
            &table,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].ipsa_l, 12);
        assert_eq!(merged[0].ipsa_r, 5);
        assert_eq!(merged[0].ipsa_min(), 5);
    }
}
