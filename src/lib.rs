//! Simulator core for the RV32IM toolchain.
//!
//! This crate owns everything that happens after linking: the
//! [`MemoryLayout`](layout/struct.MemoryLayout.html) produced by the linker is
//! loaded into a three-region virtual [`Memory`](memory/struct.Memory.html)
//! (static data, heap, stack), the text section is covered by an
//! [`ICache`](icache/struct.ICache.html) that decodes each 32-bit word into a
//! dispatchable handler on first execution, and the
//! [`Interpreter`](interpreter/struct.Interpreter.html) drives the fetch
//! loop until the program returns from `main`, the cycle budget runs out,
//! or a trap is raised.
//!
//! A small emulated libc lives at fixed addresses in low text memory; calls
//! into it are intercepted by pre-seeded instruction cache slots and served
//! host-side (see the [`libc`](libc/index.html) module).
//!
//! The crate also defines the RV32IM register and opcode model together
//! with bit-exact instruction encoding, which the assembler crate reuses
//! when emitting binary code.

extern crate num;
#[macro_use]
extern crate num_derive;

pub mod constants;
pub mod device;
pub mod error;
pub mod icache;
pub mod interpreter;
pub mod layout;
pub mod libc;
pub mod memory;
pub mod riscv;

pub use crate::device::{Device, Meter};
pub use crate::error::FailToInterpret;
pub use crate::icache::{Executable, ICache, MetaData};
pub use crate::interpreter::{Interpreter, Outcome, RegisterFile, SimConfig};
pub use crate::layout::{MemoryLayout, Section};
pub use crate::memory::Memory;
pub use crate::riscv::{ArithOp, BranchOp, MemOp, Register};

/// A 32-bit instruction word.
pub type Word = u32;

/// A 32-bit guest byte address.
pub type Address = u32;
