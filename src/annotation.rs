use log::info;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::PROTEIN_CODING;
use crate::exon_graph::link_transcript_exons;
use crate::novexon_structs::{GeneModelRecord, Strand};

/// Reference boundaries of one sequence.
#[derive(Debug, Default, Clone)]
struct ChromIndex {
    /// (end of exon, start of next exon, strand)
    introns: FxHashSet<(i64, i64, Strand)>,
    /// (start, end, strand)
    exons: FxHashSet<(i64, i64, Strand)>,
    exon_starts: FxHashSet<i64>,
    exon_ends: FxHashSet<i64>,
}

/// Known introns and exons of protein-coding reference transcripts.
/// Built once and only queried afterwards.
#[derive(Debug, Default, Clone)]
pub struct AnnotationIndex {
    chroms: FxHashMap<String, ChromIndex>,
}

impl AnnotationIndex {
    pub fn from_gene_model(records: Vec<GeneModelRecord>) -> Self {
        let coding: FxHashSet<String> = records
            .iter()
            .filter(|r| r.transcript_type.as_deref() == Some(PROTEIN_CODING))
            .map(|r| r.transcript_id.clone())
            .collect();

        let exons: Vec<GeneModelRecord> = records
            .into_iter()
            .filter(|r| r.is_exon() && coding.contains(&r.transcript_id))
            .collect();

        let mut index = AnnotationIndex::default();
        for (exon, _, coord_next) in link_transcript_exons(exons) {
            let chrom = index.chroms.entry(exon.seqname).or_default();
            chrom.exons.insert((exon.start, exon.end, exon.strand));
            chrom.exon_starts.insert(exon.start);
            chrom.exon_ends.insert(exon.end);
            if let Some(next) = coord_next {
                chrom.introns.insert((exon.end, next, exon.strand));
            }
        }

        info!(
            "Annotation index: {} protein-coding transcripts, {} exons, {} introns",
            coding.len(),
            index.exon_count(),
            index.intron_count()
        );
        index
    }

    pub fn contains_exon(&self, seqname: &str, start: i64, end: i64, strand: Strand) -> bool {
        self.chroms
            .get(seqname)
            .is_some_and(|c| c.exons.contains(&(start, end, strand)))
    }

    pub fn contains_intron(&self, seqname: &str, end: i64, next: i64, strand: Strand) -> bool {
        self.chroms
            .get(seqname)
            .is_some_and(|c| c.introns.contains(&(end, next, strand)))
    }

    /// True if some reference intron (on either strand) runs from `end` to `next`.
    pub fn spans_intron(&self, seqname: &str, end: i64, next: i64) -> bool {
        self.chroms.get(seqname).is_some_and(|c| {
            [Strand::Forward, Strand::Reverse]
                .iter()
                .any(|s| c.introns.contains(&(end, next, *s)))
        })
    }

    pub fn has_exon_start(&self, seqname: &str, start: i64) -> bool {
        self.chroms
            .get(seqname)
            .is_some_and(|c| c.exon_starts.contains(&start))
    }

    pub fn has_exon_end(&self, seqname: &str, end: i64) -> bool {
        self.chroms
            .get(seqname)
            .is_some_and(|c| c.exon_ends.contains(&end))
    }

    pub fn exon_count(&self) -> usize {
        self.chroms.values().map(|c| c.exons.len()).sum()
    }

    pub fn intron_count(&self) -> usize {
        self.chroms.values().map(|c| c.introns.len()).sum()
    }
}
