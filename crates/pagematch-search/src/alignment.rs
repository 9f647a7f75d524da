//! Stage 2: exact chunk alignment and character-weighted scoring.
//!
//! Pairs at or above the chunk match threshold are "aligned". Aligned pairs
//! whose page ranges touch on both sides merge into [`SectionMatch`]es, and
//! the de-overlapped character spans of aligned chunks are summed on each
//! side to produce coverage scores.

use std::collections::BTreeSet;

use uuid::Uuid;

use pagematch_core::{Chunk, Document, DocumentTotals, Error, Result, SearchResult, SectionMatch};

use crate::deoverlap::{deoverlap, Timeline};
use crate::similarity::{AlignedPair, SimilarityMatrix};

/// Everything Stage 2 needs to know about the source, built once per search
/// and shared read-only by all workers.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub document: Document,
    pub chunks: Vec<Chunk>,
    pub timeline: Timeline,
    pub totals: DocumentTotals,
}

impl SourceProfile {
    /// Fails with `IncompleteDocument` when the source has no totals yet.
    pub fn new(document: Document, chunks: Vec<Chunk>) -> Result<Self> {
        let totals = document
            .totals()
            .ok_or(Error::IncompleteDocument(document.id))?;
        let timeline = deoverlap(&chunks);
        Ok(Self {
            document,
            chunks,
            timeline,
            totals,
        })
    }
}

#[derive(Debug, Clone)]
struct SectionBuilder {
    source_start: u32,
    source_end: u32,
    target_start: u32,
    target_end: u32,
    source_chunks: BTreeSet<u32>,
    target_chunks: BTreeSet<u32>,
    similarity_sum: f64,
    pairs: u32,
}

impl SectionBuilder {
    fn touches(&self, other: &SectionBuilder) -> bool {
        ranges_touch(
            (self.source_start, self.source_end),
            (other.source_start, other.source_end),
        ) && ranges_touch(
            (self.target_start, self.target_end),
            (other.target_start, other.target_end),
        )
    }

    fn absorb(&mut self, other: SectionBuilder) {
        self.source_start = self.source_start.min(other.source_start);
        self.source_end = self.source_end.max(other.source_end);
        self.target_start = self.target_start.min(other.target_start);
        self.target_end = self.target_end.max(other.target_end);
        self.source_chunks.extend(other.source_chunks);
        self.target_chunks.extend(other.target_chunks);
        self.similarity_sum += other.similarity_sum;
        self.pairs += other.pairs;
    }
}

/// Inclusive ranges that overlap or sit directly next to each other.
fn ranges_touch(a: (u32, u32), b: (u32, u32)) -> bool {
    a.0 <= b.1.saturating_add(1) && b.0 <= a.1.saturating_add(1)
}

/// Merge aligned pairs into page-range sections.
///
/// Pairs are taken in (source start, target start) order and join the first
/// section they touch on both sides; sections that grow into each other
/// are then merged until none touch. Section characters are the owned
/// spans of the section's aligned chunks.
pub fn build_sections(
    pairs: &[AlignedPair],
    source_chunks: &[Chunk],
    target_chunks: &[Chunk],
    source_timeline: &Timeline,
    target_timeline: &Timeline,
) -> Vec<SectionMatch> {
    let mut seeds: Vec<SectionBuilder> = pairs
        .iter()
        .filter_map(|p| {
            let s = source_chunks.get(p.source)?;
            let t = target_chunks.get(p.target)?;
            Some(SectionBuilder {
                source_start: s.start_page,
                source_end: s.end_page,
                target_start: t.start_page,
                target_end: t.end_page,
                source_chunks: BTreeSet::from([s.chunk_index]),
                target_chunks: BTreeSet::from([t.chunk_index]),
                similarity_sum: f64::from(p.similarity),
                pairs: 1,
            })
        })
        .collect();
    seeds.sort_by_key(|b| (b.source_start, b.target_start, b.source_end, b.target_end));

    let mut sections: Vec<SectionBuilder> = Vec::new();
    for seed in seeds {
        match sections.iter_mut().find(|s| s.touches(&seed)) {
            Some(section) => section.absorb(seed),
            None => sections.push(seed),
        }
    }

    let mut merged = true;
    while merged {
        merged = false;
        'outer: for i in 0..sections.len() {
            for j in (i + 1)..sections.len() {
                if sections[i].touches(&sections[j]) {
                    let other = sections.remove(j);
                    sections[i].absorb(other);
                    merged = true;
                    break 'outer;
                }
            }
        }
    }

    sections.sort_by_key(|b| (b.source_start, b.target_start));
    sections
        .into_iter()
        .map(|b| SectionMatch {
            source_start_page: b.source_start,
            source_end_page: b.source_end,
            target_start_page: b.target_start,
            target_end_page: b.target_end,
            score: (b.similarity_sum / f64::from(b.pairs.max(1))) as f32,
            aligned_pairs: b.pairs,
            source_characters: source_timeline.characters_of(b.source_chunks),
            target_characters: target_timeline.characters_of(b.target_chunks),
        })
        .collect()
}

/// `chunk_index` of every chunk at the given slice positions.
fn chunk_indices<I>(chunks: &[Chunk], positions: I) -> BTreeSet<u32>
where
    I: IntoIterator<Item = usize>,
{
    positions
        .into_iter()
        .filter_map(|i| chunks.get(i))
        .map(|c| c.chunk_index)
        .collect()
}

/// `matched / total` in `[0, 1]`. Falls back to the timeline total when the
/// stored total is zero; a zero denominator scores 0.
pub fn coverage_score(matched: u64, stored_total: u64, timeline_total: u64) -> f32 {
    let denominator = if stored_total > 0 {
        stored_total
    } else {
        timeline_total
    };
    if denominator == 0 {
        return 0.0;
    }
    (matched as f64 / denominator as f64).clamp(0.0, 1.0) as f32
}

/// Score one candidate against the source from the similarities Stage 1
/// computed.
///
/// Always produces a result, however weak the match. Fails only when the
/// matrix does not describe these two chunk lists.
pub fn score_candidate(
    source: &SourceProfile,
    candidate_id: Uuid,
    target_chunks: &[Chunk],
    similarities: &SimilarityMatrix,
    target_totals: DocumentTotals,
    chunk_match_threshold: f32,
) -> Result<SearchResult> {
    if similarities.rows() != source.chunks.len() || similarities.cols() != target_chunks.len() {
        return Err(Error::candidate(
            candidate_id,
            format!(
                "similarity matrix is {}x{}, chunks are {}x{}",
                similarities.rows(),
                similarities.cols(),
                source.chunks.len(),
                target_chunks.len()
            ),
        ));
    }

    let alignment = similarities.align(chunk_match_threshold);
    let target_timeline = deoverlap(target_chunks);

    let sections = build_sections(
        &alignment.pairs,
        &source.chunks,
        target_chunks,
        &source.timeline,
        &target_timeline,
    );

    let matched_source = chunk_indices(&source.chunks, alignment.pairs.iter().map(|p| p.source));
    let matched_target = chunk_indices(target_chunks, alignment.pairs.iter().map(|p| p.target));
    let matched_chunks = matched_source.len() as u32;
    let matched_source_characters = source.timeline.characters_of(matched_source);
    let matched_target_characters = target_timeline.characters_of(matched_target);

    Ok(SearchResult {
        document_id: candidate_id,
        source_score: coverage_score(
            matched_source_characters,
            source.totals.total_characters,
            source.timeline.total_characters(),
        ),
        target_score: coverage_score(
            matched_target_characters,
            target_totals.total_characters,
            target_timeline.total_characters(),
        ),
        matched_source_characters,
        matched_target_characters,
        matched_chunks,
        best_chunk_similarity: alignment.best_similarity.clamp(0.0, 1.0),
        sections,
    })
}
