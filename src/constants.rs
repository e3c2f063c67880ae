/// Size of one instruction word in bytes.
pub const WORD_BYTES: u32 = 4;

/// Lowest mapped text address; the libc trampolines start here.
pub const TEXT_BASE: u32 = 0x10000;

/// Page granularity used when laying out and extending memory regions.
pub const PAGE_SIZE: u32 = 0x1000;

/// Default size of the simulated address space.
pub const DEFAULT_STORAGE_SIZE: u32 = 0x2000_0000;

/// Default size of the stack region at the top of the address space.
pub const DEFAULT_STACK_SIZE: u32 = 0x1000_0000;

/// Value written into caller-saved registers when a libc call returns,
/// so that guests relying on them to survive the call fail loudly.
pub const POISON: u32 = 0xDEAD_BEEF;

pub const REGISTER_COUNT: usize = 32;

/// Round an address up to the next page boundary.
pub fn next_page(addr: u32) -> u32 {
    (addr + (PAGE_SIZE - 1)) & !(PAGE_SIZE - 1)
}
