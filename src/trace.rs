//! Per-step execution tracing.
//!
//! The tracer is an observer: it owns a line-oriented text sink and a
//! private disassembler, and the stepper feeds it before and after each
//! instruction. Sink I/O errors are swallowed so a broken sink can
//! never take the emulation down.

use std::io::Write;

use crate::core::Bus;
use crate::cpu::state::Z80State;
use crate::cpu::z80::InvalidOpcodePolicy;
use crate::disasm::Disasm;

pub struct Tracer {
    sink: Box<dyn Write>,
    disasm: Disasm,
}

impl Tracer {
    pub fn new(sink: Box<dyn Write>, policy: InvalidOpcodePolicy) -> Self {
        Self {
            sink,
            disasm: Disasm::with_policy(policy),
        }
    }

    /// Disassemble and emit the instruction about to execute.
    pub(crate) fn instruction<B: Bus + ?Sized>(&mut self, bus: &mut B, pc: u16) {
        match self.disasm.disassemble_at(bus, pc) {
            Ok(line) => {
                let _ = self.sink.write_all(line.as_bytes());
            }
            Err(_) => {
                let _ = write!(self.sink, "{:04X} : {:<17}: ?!?\r\n", pc, "");
            }
        }
    }

    /// Emit the register/flag dump for the state just produced.
    pub(crate) fn registers(&mut self, s: &Z80State) {
        let bc = ((s.b as u16) << 8) | s.c as u16;
        let de = ((s.d as u16) << 8) | s.e as u16;
        let hl = ((s.h as u16) << 8) | s.l as u16;
        let bc_p = ((s.b_prime as u16) << 8) | s.c_prime as u16;
        let de_p = ((s.d_prime as u16) << 8) | s.e_prime as u16;
        let hl_p = ((s.h_prime as u16) << 8) | s.l_prime as u16;
        let _ = write!(
            self.sink,
            "  PC={:04X} SP={:04X} IX={:04X} IY={:04X} I={:02X} R={:02X} IM={} IFF1={} IFF2={}\r\n\
             \x20 A={:02X} F={} BC={:04X} DE={:04X} HL={:04X} A'={:02X} F'={:02X} BC'={:04X} DE'={:04X} HL'={:04X}\r\n",
            s.pc,
            s.sp,
            s.ix,
            s.iy,
            s.i,
            s.r,
            s.im,
            s.iff1 as u8,
            s.iff2 as u8,
            s.a,
            flag_bits(s.f),
            bc,
            de,
            hl,
            s.a_prime,
            s.f_prime,
            bc_p,
            de_p,
            hl_p,
        );
    }

    /// Event marker line (`*** RESET! ***` and friends).
    pub(crate) fn marker(&mut self, text: &str) {
        let _ = write!(self.sink, "{}\r\n", text);
    }

    pub(crate) fn flush(&mut self) {
        let _ = self.sink.flush();
    }
}

/// `SZ5H3PNC` with `-` for clear bits.
fn flag_bits(f: u8) -> String {
    const NAMES: [char; 8] = ['S', 'Z', '5', 'H', '3', 'P', 'N', 'C'];
    NAMES
        .iter()
        .enumerate()
        .map(|(i, &ch)| if f & (0x80 >> i) != 0 { ch } else { '-' })
        .collect()
}
