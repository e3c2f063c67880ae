//! Assembler and linker for the [rvsim](../rvsim/index.html) simulator core.
//!
//! The entry points are [`assemble`](fn.assemble.html), which turns one
//! source file into an [`AssemblyLayout`](layout/struct.AssemblyLayout.html),
//! and [`link`](linker/fn.link.html), which lays an ordered set of such
//! layouts out in the virtual address space and produces the
//! [`MemoryLayout`](../rvsim/layout/struct.MemoryLayout.html) consumed by
//! the interpreter.
//!
//! Parsing is implemented with [pest]; the crate's [`Error`](type.Error.html)
//! is a type alias of `pest::error::Error`, so front-end failures render
//! with the offending line, a caret under the problem, and (via
//! `with_path`) the source file name.
//!
//! # Assembly dialect
//!
//! The accepted dialect is the RV32IM subset of GNU `as` syntax:
//!
//! - `#` starts a comment running to end of line.
//! - Labels are `name:`; identifiers may contain letters, digits, `_`,
//!   `.` and `@`. A label must be defined inside a section, and at most
//!   once.
//! - Section directives: `.text`, `.data`, `.sdata`, `.rodata`, `.bss`,
//!   `.sbss` and `.section <name>`. Data directives: `.byte`, `.half`,
//!   `.short`, `.2byte`, `.word`, `.long`, `.4byte`, `.string`/`.asciz`,
//!   `.zero N`, `.align`/`.p2align N`, `.globl name` and
//!   `.set name, .`. Unrecognized directives warn once and are ignored.
//! - Immediate operands are expressions over integer literals (decimal,
//!   `0x` hex, `0b` binary, leading-`0` octal), character literals,
//!   symbols, parentheses, `+`/`-`, and the relocation operators
//!   `%hi(...)`, `%lo(...)`, `%pcrel_hi(...)`, `%pcrel_lo(...)`. The
//!   symbol `.` denotes the current location.
//! - All RV32IM instructions are accepted, plus the usual pseudo
//!   instructions (`li`, `la`, `mv`, `call`, `tail`, `j`, `jr`, `ret`,
//!   `not`, `neg`, `seqz`/`snez`/`sgtz`/`sltz`, `beqz`-family, swapped
//!   branches `ble`/`bgt`/`bleu`/`bgtu`, and the symbol forms of loads
//!   and stores).
//!
//! [pest]: https://docs.rs/pest/

mod parser;

pub mod assembler;
pub mod immediate;
pub mod layout;
pub mod linker;
pub mod operands;
pub mod storage;


use pest::Span;

pub use crate::assembler::{assemble, Assembler};
pub use crate::layout::AssemblyLayout;
pub use crate::linker::{link, LinkError};
pub use crate::parser::{Rule, RvParser};

pub type Error = pest::error::Error<Rule>;

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn new_parser_error(span: Span, message: String) -> Error {
    Error::new_from_span(pest::error::ErrorVariant::CustomError { message }, span)
}
