//! Size estimation: assign every chunk its `begin` and offset table.
//!
//! The walk is pessimistic in the sense that `call` and `li` still count
//! as their two-instruction forms; after relaxation has rewritten the
//! shrinkable ones, a second run tightens every position. Sections are
//! laid out text, data, rodata, unknown, bss, with page alignment after
//! text and around the end of the image.

use rvsim::constants::PAGE_SIZE;
use rvsim::libc;

use super::{ChunkDetails, Linker};
use crate::storage::Section;

struct SizeEstimator {
    position: u32,
}

impl SizeEstimator {
    fn align_to(&mut self, alignment: u32) {
        debug_assert!(alignment.is_power_of_two());
        let mask = alignment - 1;
        self.position = (self.position + mask) & !mask;
    }

    fn estimate_chunk(&mut self, chunk: &mut ChunkDetails) {
        chunk.begin = self.position;
        chunk.offsets[0] = 0;
        for (index, storage) in chunk.storages.iter().enumerate() {
            self.align_to(storage.align_size());
            self.position += storage.emit_size();
            chunk.offsets[index + 1] = self.position - chunk.begin;
        }
    }

    fn estimate_section(&mut self, linker_chunks: &mut [ChunkDetails], ids: &[usize]) {
        for &id in ids {
            self.estimate_chunk(&mut linker_chunks[id]);
        }
    }
}

pub(crate) fn run(linker: &mut Linker) {
    let Linker {
        chunks, sections, ..
    } = linker;

    let mut estimator = SizeEstimator {
        position: libc::LIBC_END,
    };

    estimator.estimate_section(chunks, &sections[Section::Text.index()]);
    estimator.align_to(PAGE_SIZE);

    for &section in &[Section::Data, Section::Rodata, Section::Unknown, Section::Bss] {
        estimator.align_to(4);
        estimator.estimate_section(chunks, &sections[section.index()]);
    }

    estimator.align_to(PAGE_SIZE);
}
