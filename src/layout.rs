use std::collections::HashMap;

/// One contiguous, byte-addressed run of the linked image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub start: u32,
    pub bytes: Vec<u8>,
}

impl Section {
    pub fn begin(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.start + self.bytes.len() as u32
    }
}

/// The linker's output: a global symbol table plus the five section images
/// in address order (text, data, rodata, unknown, bss).
///
/// The bss bytes are materialized as zeroes so that the static memory area
/// can be populated with one copy per section.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayout {
    pub position_table: HashMap<String, u32>,

    pub text: Section,
    pub data: Section,
    pub rodata: Section,
    pub unknown: Section,
    pub bss: Section,
}

impl MemoryLayout {
    /// Address of the program entry point, if one was linked in.
    pub fn entry(&self) -> Option<u32> {
        self.position_table.get("main").copied()
    }

    /// End of the static image; the heap starts at the next page boundary.
    pub fn static_end(&self) -> u32 {
        self.bss.end()
    }
}
