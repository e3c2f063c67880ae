//! The dispatch loop driving the simulated process.

pub mod handlers;
mod register;

pub use self::register::RegisterFile;

use crate::constants;
use crate::device::Device;
use crate::error::FailToInterpret;
use crate::icache::ICache;
use crate::layout::MemoryLayout;
use crate::memory::Memory;
use crate::riscv::Register;

/// Sizing and budget knobs consumed by the core (the CLI owns their
/// defaults and parsing).
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Total size of the simulated address space.
    pub storage_size: u32,
    /// Size of the stack region at the top of the address space.
    pub stack_size: u32,
    /// Weighted-cycle budget; execution halts once reached.
    pub timeout: u64,
}

impl Default for SimConfig {
    fn default() -> SimConfig {
        SimConfig {
            storage_size: constants::DEFAULT_STORAGE_SIZE,
            stack_size: constants::DEFAULT_STACK_SIZE,
            timeout: u64::max_value(),
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    /// The program returned from `main`; carries the exit code from `a0`.
    Exited(u32),
    /// The weighted-cycle budget ran out at an instruction boundary.
    Timeout,
    /// A fatal trap.
    Trap(FailToInterpret),
}

pub struct Interpreter {
    pub memory: Memory,
    pub icache: ICache,
    pub regs: RegisterFile,
    pub device: Device,
    timeout: u64,
}

impl Interpreter {
    /// Set up a process image: registers cleared, `pc` at the entry point,
    /// `ra` at the end-of-program sentinel, `sp` at the stack top.
    pub fn new(layout: &MemoryLayout, config: &SimConfig, device: Device, entry: u32) -> Interpreter {
        let memory = Memory::new(layout, config);
        let icache = ICache::new(layout);

        let mut regs = RegisterFile::new();
        regs.set_pc(entry);
        regs[Register::RA] = 0;
        regs[Register::SP] = memory.stack_top();

        Interpreter {
            memory,
            icache,
            regs,
            device,
            timeout: config.timeout,
        }
    }

    /// Execute one instruction at the current pc.
    pub fn step(&mut self) -> Result<(), FailToInterpret> {
        self.regs[Register::ZERO] = 0;
        let exe = self
            .icache
            .ifetch(self.regs.pc(), None, &self.memory, &mut self.device)?;
        exe.run(&mut self.regs, &mut self.memory, &mut self.device)
    }

    /// Run to completion.
    pub fn run(&mut self) -> Outcome {
        loop {
            if self.regs.pc() == 0 {
                return Outcome::Exited(self.regs[Register::A0]);
            }
            if self.device.cycles() >= self.timeout {
                return Outcome::Timeout;
            }
            if let Err(trap) = self.step() {
                return Outcome::Trap(trap);
            }
        }
    }
}
