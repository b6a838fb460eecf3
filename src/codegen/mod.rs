//! C code generation: expression rendering, slot statements and file templates

pub mod ccode;
pub mod emitter;
pub mod template;

pub use ccode::{SymbolMap, render_c, render_number};
pub use emitter::{Emitter, Statement, comment_zero_lines};
