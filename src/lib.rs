pub mod core;
pub mod cpu;
pub mod disasm;
pub mod trace;

pub mod prelude {
    pub use crate::core::{Bus, Fault, Result};
    pub use crate::cpu::state::Z80State;
    pub use crate::cpu::z80::{Flag, InvalidOpcodePolicy, Z80};
    pub use crate::disasm::Disasm;
    pub use crate::trace::Tracer;
}
