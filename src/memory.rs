//! The simulated process memory.
//!
//! Three disjoint regions back the 32-bit guest address space:
//!
//! - the *static* area covers `[text.start, bss.end)` and is filled from
//!   the linked section images,
//! - the *heap* starts at the first page boundary above the static area
//!   and grows upward through [`sbrk`](struct.Memory.html#method.sbrk),
//! - the *stack* occupies the top `stack_size` bytes of the address space
//!   and grows downward.
//!
//! Each region is a plain byte buffer indexed by `address - region_base`.
//! Every typed access checks alignment first and bounds second; an access
//! must lie entirely within one region.

use byteorder::ByteOrder;
use util::Endian;

use crate::constants;
use crate::error::FailToInterpret;
use crate::interpreter::SimConfig;
use crate::layout::MemoryLayout;

/// Bump-allocator bookkeeping for the emulated `malloc`.
///
/// Kept here rather than in the libc module so that the state lives with
/// the heap it manages instead of in a process-wide global.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct AllocState {
    pub initialized: bool,
    pub prev: u32,
}

pub struct Memory {
    text_start: u32,
    text_end: u32,
    static_end: u32,
    static_buf: Vec<u8>,

    heap_start: u32,
    brk: u32,
    heap_limit: u32,
    heap_buf: Vec<u8>,

    stack_low: u32,
    stack_top: u32,
    stack_buf: Vec<u8>,

    pub(crate) alloc: AllocState,
}

impl Memory {
    pub fn new(layout: &MemoryLayout, config: &SimConfig) -> Memory {
        let text_start = layout.text.begin();
        let static_end = layout.bss.end();
        let mut static_buf = vec![0u8; (static_end - text_start) as usize];

        {
            let mut copy = |section: &crate::layout::Section| {
                let offset = (section.begin() - text_start) as usize;
                static_buf[offset..offset + section.bytes.len()].copy_from_slice(&section.bytes);
            };
            copy(&layout.text);
            copy(&layout.data);
            copy(&layout.rodata);
            copy(&layout.unknown);
            copy(&layout.bss);
        }

        let heap_start = constants::next_page(static_end);
        let stack_low = config.storage_size - config.stack_size;
        let stack_top = config.storage_size;

        Memory {
            text_start,
            text_end: layout.text.end(),
            static_end,
            static_buf,
            heap_start,
            brk: heap_start,
            heap_limit: stack_low,
            heap_buf: Vec::new(),
            stack_low,
            stack_top,
            stack_buf: vec![0u8; (stack_top - stack_low) as usize],
            alloc: AllocState::default(),
        }
    }

    pub fn text_range(&self) -> (u32, u32) {
        (self.text_start, self.text_end)
    }

    pub fn stack_top(&self) -> u32 {
        self.stack_top
    }

    pub fn brk(&self) -> u32 {
        self.brk
    }

    pub fn heap_start(&self) -> u32 {
        self.heap_start
    }

    /// Extend (or shrink) the heap by `delta` bytes. Returns the previous
    /// break on success; `None` when the request leaves
    /// `[heap_start, heap_limit]`.
    pub fn sbrk(&mut self, delta: i32) -> Option<u32> {
        let old = self.brk;
        let new = (i64::from(old) + i64::from(delta)) as u64;
        if new < u64::from(self.heap_start) || new > u64::from(self.heap_limit) {
            return None;
        }
        let new = new as u32;

        let needed = (new - self.heap_start) as usize;
        if needed > self.heap_buf.len() {
            // Reserve to the next power of two to amortize regrowth.
            let reserved = needed
                .checked_next_power_of_two()
                .unwrap_or(needed)
                .min((self.heap_limit - self.heap_start) as usize);
            self.heap_buf.resize(reserved.max(needed), 0);
        }

        self.brk = new;
        Some(old)
    }

    fn region_of(&self, addr: u32) -> Option<(u32, u32)> {
        if addr >= self.text_start && addr < self.static_end {
            Some((self.text_start, self.static_end))
        } else if addr >= self.heap_start && addr < self.brk {
            Some((self.heap_start, self.brk))
        } else if addr >= self.stack_low && addr < self.stack_top {
            Some((self.stack_low, self.stack_top))
        } else {
            None
        }
    }

    fn buffer(&self, base: u32) -> &[u8] {
        if base == self.text_start {
            &self.static_buf
        } else if base == self.heap_start {
            &self.heap_buf
        } else {
            &self.stack_buf
        }
    }

    fn buffer_mut(&mut self, base: u32) -> &mut [u8] {
        if base == self.text_start {
            &mut self.static_buf
        } else if base == self.heap_start {
            &mut self.heap_buf
        } else {
            &mut self.stack_buf
        }
    }

    fn slice(&self, addr: u32, size: u32) -> Option<&[u8]> {
        let (base, end) = self.region_of(addr)?;
        if addr.checked_add(size)? > end {
            return None;
        }
        let offset = (addr - base) as usize;
        Some(&self.buffer(base)[offset..offset + size as usize])
    }

    fn slice_mut(&mut self, addr: u32, size: u32) -> Option<&mut [u8]> {
        let (base, end) = self.region_of(addr)?;
        if addr.checked_add(size)? > end {
            return None;
        }
        let offset = (addr - base) as usize;
        Some(&mut self.buffer_mut(base)[offset..offset + size as usize])
    }

    fn load(&self, addr: u32, size: u32) -> Result<&[u8], FailToInterpret> {
        if addr % size != 0 {
            return Err(FailToInterpret::LoadMisAligned { addr, align: size });
        }
        self.slice(addr, size)
            .ok_or(FailToInterpret::LoadOutOfBound { addr, size })
    }

    fn store(&mut self, addr: u32, size: u32) -> Result<&mut [u8], FailToInterpret> {
        if addr % size != 0 {
            return Err(FailToInterpret::StoreMisAligned { addr, align: size });
        }
        self.slice_mut(addr, size)
            .ok_or(FailToInterpret::StoreOutOfBound { addr, size })
    }

    pub fn load_u8(&self, addr: u32) -> Result<u8, FailToInterpret> {
        Ok(self.load(addr, 1)?[0])
    }

    pub fn load_u16(&self, addr: u32) -> Result<u16, FailToInterpret> {
        Ok(Endian::read_u16(self.load(addr, 2)?))
    }

    pub fn load_u32(&self, addr: u32) -> Result<u32, FailToInterpret> {
        Ok(Endian::read_u32(self.load(addr, 4)?))
    }

    pub fn load_i8(&self, addr: u32) -> Result<i8, FailToInterpret> {
        Ok(self.load_u8(addr)? as i8)
    }

    pub fn load_i16(&self, addr: u32) -> Result<i16, FailToInterpret> {
        Ok(self.load_u16(addr)? as i16)
    }

    pub fn load_i32(&self, addr: u32) -> Result<i32, FailToInterpret> {
        Ok(self.load_u32(addr)? as i32)
    }

    pub fn store_u8(&mut self, addr: u32, value: u8) -> Result<(), FailToInterpret> {
        self.store(addr, 1)?[0] = value;
        Ok(())
    }

    pub fn store_u16(&mut self, addr: u32, value: u16) -> Result<(), FailToInterpret> {
        Endian::write_u16(self.store(addr, 2)?, value);
        Ok(())
    }

    pub fn store_u32(&mut self, addr: u32, value: u32) -> Result<(), FailToInterpret> {
        Endian::write_u32(self.store(addr, 4)?, value);
        Ok(())
    }

    /// Instruction fetch: a 4-byte aligned read restricted to the text
    /// section, with the instruction-flavored error kinds.
    pub fn load_cmd(&self, addr: u32) -> Result<u32, FailToInterpret> {
        if addr % constants::WORD_BYTES != 0 {
            return Err(FailToInterpret::InsMisAligned {
                addr,
                align: constants::WORD_BYTES,
            });
        }
        if addr < self.text_start || addr + constants::WORD_BYTES > self.text_end {
            return Err(FailToInterpret::InsOutOfBound {
                addr,
                size: constants::WORD_BYTES,
            });
        }
        let offset = (addr - self.text_start) as usize;
        Ok(Endian::read_u32(&self.static_buf[offset..offset + 4]))
    }

    /// The bytes from `addr` to the end of whichever region contains it.
    /// Libc routines use this to bound string and block operations.
    pub fn libc_access(&mut self, addr: u32) -> Option<&mut [u8]> {
        let (base, end) = self.region_of(addr)?;
        self.slice_mut(addr, end - addr)
    }
}
