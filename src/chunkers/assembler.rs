//! Packing of text units into token-bounded chunks.

use std::collections::VecDeque;

use tracing::debug;

use super::splitter::{OversizeSplitter, WindowedSplitter};
use crate::model::TokenEstimator;
use crate::types::{
    Chunk, ChunkMetadata, ChunkOrigin, ChunkingConfig, RemainderPolicy, TextUnit, UnitOrigin,
};

/// Units waiting to be emitted as one chunk.
#[derive(Default)]
struct Accumulator {
    parts: Vec<String>,
    token_count: usize,
    origin: Option<UnitOrigin>,
}

impl Accumulator {
    fn fits(&self, tokens: usize, max_tokens: usize) -> bool {
        self.token_count + tokens <= max_tokens
    }

    fn push(&mut self, unit: TextUnit) {
        self.origin.get_or_insert(unit.origin);
        self.token_count += unit.token_count;
        self.parts.push(unit.text);
    }

    fn take(&mut self) -> Option<Draft> {
        if self.parts.is_empty() {
            return None;
        }
        let taken = std::mem::take(self);
        Some(Draft {
            unit_count: taken.parts.len(),
            text: taken.parts.join(" "),
            token_count: taken.token_count,
            origin: taken.origin.unwrap_or_default().into(),
        })
    }
}

/// A chunk before it receives its index.
struct Draft {
    text: String,
    token_count: usize,
    unit_count: usize,
    origin: ChunkOrigin,
}

/// Running state of one assembly pass.
struct AssemblyState {
    max_tokens: usize,
    min_tokens: usize,
    remainder: RemainderPolicy,
    current: Accumulator,
    ready: VecDeque<Draft>,
    emitted: usize,
}

impl AssemblyState {
    fn new(assembler: &ChunkAssembler) -> Self {
        Self {
            max_tokens: assembler.max_tokens,
            min_tokens: assembler.min_tokens,
            remainder: assembler.remainder,
            current: Accumulator::default(),
            ready: VecDeque::new(),
            emitted: 0,
        }
    }

    fn is_oversized(&self, unit: &TextUnit) -> bool {
        unit.token_count > self.max_tokens
    }

    fn flush(&mut self) {
        if let Some(draft) = self.current.take() {
            self.ready.push_back(draft);
        }
    }

    /// Add a unit within budget. Ties (`current + t == max`) are included.
    fn push_unit(&mut self, unit: TextUnit) {
        if !self.current.fits(unit.token_count, self.max_tokens) {
            self.flush();
        }
        self.current.push(unit);
    }

    /// Emit the pieces of an oversized unit as independent chunks.
    ///
    /// Pending units are flushed first. Pieces are packed with a fresh
    /// accumulator and everything is flushed, whatever its size.
    fn push_split(&mut self, pieces: Vec<TextUnit>) {
        self.flush();
        let mut packed = Accumulator::default();
        for piece in pieces {
            if !packed.fits(piece.token_count, self.max_tokens) {
                if let Some(draft) = packed.take() {
                    self.ready.push_back(draft);
                }
            }
            packed.push(piece);
        }
        if let Some(draft) = packed.take() {
            self.ready.push_back(draft);
        }
    }

    fn finish(&mut self) {
        let Some(draft) = self.current.take() else {
            return;
        };
        if draft.token_count >= self.min_tokens || self.remainder == RemainderPolicy::Keep {
            self.ready.push_back(draft);
        } else {
            debug!(
                tokens = draft.token_count,
                min_tokens = self.min_tokens,
                "Discarding trailing remainder below min_tokens"
            );
        }
    }

    fn pop(&mut self) -> Option<Chunk> {
        let draft = self.ready.pop_front()?;
        let index = self.emitted;
        self.emitted += 1;
        Some(Chunk::new(
            index,
            draft.text,
            draft.token_count,
            ChunkMetadata {
                origin: draft.origin,
                unit_count: draft.unit_count,
            },
        ))
    }
}

/// Packs ordered units into chunks bounded by `max_tokens`.
///
/// Single forward pass over the units:
///
/// - a unit larger than `max_tokens` flushes the pending chunk and is split,
///   each piece becoming its own chunk;
/// - a unit that fits is appended;
/// - otherwise the pending chunk is flushed and the unit starts a new one.
///
/// A trailing chunk below `min_tokens` is dropped under
/// [`RemainderPolicy::Discard`].
#[derive(Debug, Clone, Copy)]
pub struct ChunkAssembler {
    max_tokens: usize,
    min_tokens: usize,
    remainder: RemainderPolicy,
}

impl ChunkAssembler {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            min_tokens: config.min_tokens,
            remainder: config.remainder,
        }
    }

    /// Lazily assemble chunks; each `next` consumes only as many units as
    /// needed to produce one chunk.
    pub fn chunks<'a, I>(&self, units: I, splitter: &'a WindowedSplitter) -> Chunks<'a, I::IntoIter>
    where
        I: IntoIterator<Item = TextUnit>,
    {
        Chunks {
            units: units.into_iter(),
            splitter,
            state: AssemblyState::new(self),
            finished: false,
        }
    }

    /// Assemble all chunks eagerly.
    pub fn assemble<I>(&self, units: I, splitter: &WindowedSplitter) -> Vec<Chunk>
    where
        I: IntoIterator<Item = TextUnit>,
    {
        self.chunks(units, splitter).collect()
    }

    /// Assemble with an async oversize strategy.
    pub async fn assemble_with(
        &self,
        units: Vec<TextUnit>,
        splitter: OversizeSplitter<'_>,
        estimator: &dyn TokenEstimator,
    ) -> Vec<Chunk> {
        let mut state = AssemblyState::new(self);
        let mut chunks = Vec::new();

        for unit in units {
            if state.is_oversized(&unit) {
                let pieces = splitter.split(&unit, estimator).await;
                state.push_split(pieces);
            } else {
                state.push_unit(unit);
            }
            while let Some(chunk) = state.pop() {
                chunks.push(chunk);
            }
        }

        state.finish();
        while let Some(chunk) = state.pop() {
            chunks.push(chunk);
        }
        chunks
    }
}

/// Lazy, single-pass chunk sequence. See [`ChunkAssembler::chunks`].
pub struct Chunks<'a, I> {
    units: I,
    splitter: &'a WindowedSplitter,
    state: AssemblyState,
    finished: bool,
}

impl<I> Iterator for Chunks<'_, I>
where
    I: Iterator<Item = TextUnit>,
{
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        loop {
            if let Some(chunk) = self.state.pop() {
                return Some(chunk);
            }
            if self.finished {
                return None;
            }
            match self.units.next() {
                Some(unit) if self.state.is_oversized(&unit) => {
                    let pieces = self.splitter.split(&unit);
                    self.state.push_split(pieces);
                }
                Some(unit) => self.state.push_unit(unit),
                None => {
                    self.finished = true;
                    self.state.finish();
                }
            }
        }
    }
}
