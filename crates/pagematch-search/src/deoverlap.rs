//! Character-span de-overlapping of sliding-window chunks.
//!
//! Chunkers emit windows that repeat the tail of the window before them, so
//! summing `character_count` over a document's chunks counts that text
//! twice. De-overlapping lays the chunks end to end on one character axis,
//! each owning a half-open span, and drops the repeated characters.
//!
//! Rules:
//! 1. Chunks are visited in `chunk_index` order; empty chunks and chunks
//!    with an inverted page range are skipped.
//! 2. A chunk whose page range intersects its predecessor's repeats at most
//!    the window overlap of it, capped by both chunks' own counts. Chunks
//!    on disjoint pages repeat nothing. Several chunks sharing one dense
//!    page keep their own characters.
//! 3. The remaining characters become the chunk's [`Segment`]. A chunk left
//!    with nothing is fully overlapped and owns no segment.
//!
//! Matched characters are the union of the owned spans of matched chunks,
//! so a character is counted at most once however many pairs touch it.

use pagematch_core::{defaults, Chunk};

/// The character span one chunk owns after de-overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub chunk_index: u32,
    pub start_page: u32,
    pub end_page: u32,
    /// Inclusive start on the document's character axis
    pub start: u64,
    /// Exclusive end on the document's character axis
    pub end: u64,
}

impl Segment {
    pub fn characters(&self) -> u64 {
        self.end - self.start
    }
}

/// De-overlapped view of a document: owned spans in `chunk_index` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Sum of all owned spans.
    pub fn total_characters(&self) -> u64 {
        self.segments.iter().map(Segment::characters).sum()
    }

    /// Number of chunks that still own characters.
    pub fn effective_chunk_count(&self) -> u32 {
        self.segments.len() as u32
    }

    /// The span owned by `chunk_index`, if any.
    pub fn segment(&self, chunk_index: u32) -> Option<&Segment> {
        self.segments
            .binary_search_by_key(&chunk_index, |s| s.chunk_index)
            .ok()
            .map(|i| &self.segments[i])
    }

    /// Characters in the union of the spans owned by `chunk_indices`.
    /// Repeated indices and fully overlapped chunks add nothing.
    pub fn characters_of<I>(&self, chunk_indices: I) -> u64
    where
        I: IntoIterator<Item = u32>,
    {
        let mut spans: Vec<(u64, u64)> = chunk_indices
            .into_iter()
            .filter_map(|i| self.segment(i))
            .map(|s| (s.start, s.end))
            .collect();
        merged_length(&mut spans)
    }
}

/// Total length of the union of half-open spans.
fn merged_length(spans: &mut [(u64, u64)]) -> u64 {
    spans.sort_unstable();

    let mut total = 0;
    let mut current: Option<(u64, u64)> = None;
    for &(start, end) in spans.iter() {
        current = match current {
            Some((cs, ce)) if start <= ce => Some((cs, ce.max(end))),
            Some((cs, ce)) => {
                total += ce - cs;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((cs, ce)) = current {
        total += ce - cs;
    }
    total
}

/// Build the timeline with the default window overlap.
pub fn deoverlap(chunks: &[Chunk]) -> Timeline {
    deoverlap_with_window(chunks, defaults::CHUNK_WINDOW_OVERLAP)
}

/// Build the timeline assuming consecutive windows repeat up to
/// `window_overlap` characters.
pub fn deoverlap_with_window(chunks: &[Chunk], window_overlap: u64) -> Timeline {
    let mut ordered: Vec<&Chunk> = chunks
        .iter()
        .filter(|c| c.character_count > 0 && c.start_page <= c.end_page)
        .collect();
    ordered.sort_by_key(|c| c.chunk_index);

    let mut segments = Vec::with_capacity(ordered.len());
    let mut cursor = 0u64;
    let mut previous: Option<&Chunk> = None;

    for chunk in ordered {
        let repeated = previous.map_or(0, |prev| repeated_characters(prev, chunk, window_overlap));
        let owned = chunk.character_count - repeated;
        if owned > 0 {
            segments.push(Segment {
                chunk_index: chunk.chunk_index,
                start_page: chunk.start_page,
                end_page: chunk.end_page,
                start: cursor,
                end: cursor + owned,
            });
            cursor += owned;
        }
        previous = Some(chunk);
    }

    Timeline { segments }
}

/// Characters `chunk` is estimated to repeat from the window before it.
fn repeated_characters(previous: &Chunk, chunk: &Chunk, window_overlap: u64) -> u64 {
    if !chunk.shares_pages_with(previous) {
        return 0;
    }
    window_overlap
        .min(previous.character_count)
        .min(chunk.character_count)
}
