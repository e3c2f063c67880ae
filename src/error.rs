use std::error::Error as StdError;
use std::fmt;

/// A fatal run-time trap raised by the interpreter.
///
/// Every variant aborts execution; there is no in-band recovery. The
/// libc variants name the intercepted function that rejected its
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailToInterpret {
    LoadMisAligned { addr: u32, align: u32 },
    LoadOutOfBound { addr: u32, size: u32 },

    StoreMisAligned { addr: u32, align: u32 },
    StoreOutOfBound { addr: u32, size: u32 },

    InsMisAligned { addr: u32, align: u32 },
    InsOutOfBound { addr: u32, size: u32 },
    InsUnknown { addr: u32, word: u32 },

    LibcMisAligned { which: &'static str, addr: u32, align: u32 },
    LibcOutOfBound { which: &'static str, addr: u32, size: u32 },

    DivideByZero { pc: u32 },

    NotImplemented { message: String },
}

impl fmt::Display for FailToInterpret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use FailToInterpret::*;
        match self {
            LoadMisAligned { addr, align } => {
                write!(f, "misaligned load at {:#x} (required alignment {})", addr, align)
            }
            LoadOutOfBound { addr, size } => {
                write!(f, "out-of-bound load of {} bytes at {:#x}", size, addr)
            }
            StoreMisAligned { addr, align } => {
                write!(f, "misaligned store at {:#x} (required alignment {})", addr, align)
            }
            StoreOutOfBound { addr, size } => {
                write!(f, "out-of-bound store of {} bytes at {:#x}", size, addr)
            }
            InsMisAligned { addr, align } => {
                write!(f, "misaligned instruction fetch at {:#x} (required alignment {})", addr, align)
            }
            InsOutOfBound { addr, size } => {
                write!(f, "instruction fetch of {} bytes outside text at {:#x}", size, addr)
            }
            InsUnknown { addr, word } => {
                write!(f, "unknown instruction {:#010x} at {:#x}", word, addr)
            }
            LibcMisAligned { which, addr, align } => {
                write!(f, "{}: misaligned pointer {:#x} (required alignment {})", which, addr, align)
            }
            LibcOutOfBound { which, addr, size } => {
                write!(f, "{}: pointer {:#x} with {} bytes is out of bounds", which, addr, size)
            }
            DivideByZero { pc } => write!(f, "integer division by zero at pc {:#x}", pc),
            NotImplemented { message } => write!(f, "not implemented: {}", message),
        }
    }
}

impl StdError for FailToInterpret {}
