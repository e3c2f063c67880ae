//! The linker: lays an ordered set of assembled files out in the virtual
//! address space and encodes them into a
//! [`MemoryLayout`](../../rvsim/layout/struct.MemoryLayout.html).
//!
//! The pipeline is fixed and irreversible:
//!
//! 1. bucket every file's chunks by section and build the local/global
//!    symbol tables,
//! 2. publish the libc trampoline symbols at their fixed addresses,
//! 3. estimate sizes pessimistically (`call` and `li` count as two
//!    commands),
//! 4. relax: fold constant immediates, shrink near calls to `jal` and
//!    small `li` to one command,
//! 5. re-estimate with the shrunken nodes, then evaluate every immediate
//!    and emit bit-exact bytes.
//!
//! Symbols are held as `{chunk, index}` handles into one chunk arena;
//! addresses are always recomputed from the owning chunk's current
//! `begin`/`offsets`, so each re-estimation retargets every symbol at
//! once.

mod encoder;
mod estimate;
mod evaluate;
mod relaxation;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use rvsim::libc;
use rvsim::MemoryLayout;

use crate::layout::AssemblyLayout;
use crate::storage::{Section, Storage, SECTION_COUNT};

/// A failure after the per-file parse stage. These carry no source
/// excerpt; they concern the program as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    DuplicateGlobal { name: String },
    UnknownSymbol { name: String },
    MissingMain,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LinkError::DuplicateGlobal { name } => {
                write!(f, "Duplicate global symbol \"{}\"", name)
            }
            LinkError::UnknownSymbol { name } => write!(f, "Unknown symbol \"{}\"", name),
            LinkError::MissingMain => write!(f, "No main function found"),
        }
    }
}

impl StdError for LinkError {}

/// One section-run of storages from one file, plus its resolved placement.
/// `offsets` has one more entry than `storages`: `offsets[k]` is the
/// distance from `begin` to the end of storage `k - 1`, so a label with
/// index `k` resolves to `begin + offsets[k]`.
pub(crate) struct ChunkDetails {
    pub file: usize,
    pub section: Section,
    pub storages: Vec<Storage>,
    pub begin: u32,
    pub offsets: Vec<u32>,
}

/// Where a symbol lives: a handle into the chunk arena, or a fixed
/// address (libc trampolines).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SymbolLocation {
    Chunk { chunk: usize, index: usize },
    Absolute(u32),
}

pub(crate) type SymbolTable = HashMap<String, SymbolLocation>;

pub(crate) struct Linker {
    pub chunks: Vec<ChunkDetails>,
    pub sections: [Vec<usize>; SECTION_COUNT],
    pub globals: SymbolTable,
    pub locals: Vec<SymbolTable>,
}

/// Link the given layouts, in order, into a memory image.
pub fn link(inputs: Vec<AssemblyLayout>) -> Result<MemoryLayout, LinkError> {
    let mut linker = Linker::new();

    for input in inputs {
        linker.add_file(input)?;
    }
    linker.add_libc()?;

    estimate::run(&mut linker);
    relaxation::run(&mut linker)?;
    estimate::run(&mut linker);

    encoder::run(&linker)
}

impl Linker {
    fn new() -> Linker {
        Linker {
            chunks: Vec::new(),
            sections: Default::default(),
            globals: SymbolTable::new(),
            locals: Vec::new(),
        }
    }

    fn add_file(&mut self, input: AssemblyLayout) -> Result<(), LinkError> {
        let file = self.locals.len();
        let chunk_base = self.chunks.len();
        let mut local = SymbolTable::new();

        for chunk in input.chunks {
            let id = self.chunks.len();
            self.sections[chunk.section.index()].push(id);
            let offsets = vec![0; chunk.storages.len() + 1];
            self.chunks.push(ChunkDetails {
                file,
                section: chunk.section,
                storages: chunk.storages,
                begin: 0,
                offsets,
            });
        }

        for label in input.labels {
            let location = SymbolLocation::Chunk {
                chunk: chunk_base + label.chunk,
                index: label.index,
            };
            let table = if label.global {
                &mut self.globals
            } else {
                &mut local
            };
            if table.insert(label.name.clone(), location).is_some() {
                return Err(LinkError::DuplicateGlobal { name: label.name });
            }
        }

        self.locals.push(local);
        Ok(())
    }

    /// Publish the libc trampoline addresses; user text begins right
    /// after the last one.
    fn add_libc(&mut self) -> Result<(), LinkError> {
        for (index, name) in libc::NAMES.iter().enumerate() {
            let address = libc::LIBC_START + (index as u32) * rvsim::constants::WORD_BYTES;
            let previous = self
                .globals
                .insert(name.to_string(), SymbolLocation::Absolute(address));
            if previous.is_some() {
                return Err(LinkError::DuplicateGlobal {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}
