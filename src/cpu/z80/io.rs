use crate::core::{Bus, Result};
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    /// IN A, (n) — 11 T: M1(4) + MR(3) + IO(4). No flags.
    pub(crate) fn op_in_a_n<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let port = self.fetch_byte(bus)?;
        self.a = bus.port_in(port)?;
        Ok(11)
    }

    /// OUT (n), A — 11 T: M1(4) + MR(3) + IO(4).
    pub(crate) fn op_out_n_a<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let port = self.fetch_byte(bus)?;
        bus.port_out(port, self.a)?;
        Ok(11)
    }

    /// IN r, (C) — 12 T (ED prefix).
    /// S/Z/P from the value; H=0, N=0; C preserved. The r=6 slot
    /// (ED 70) updates flags only.
    pub(crate) fn op_in_r_c<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let r = (opcode >> 3) & 0x07;
        let val = bus.port_in(self.c)?;
        if r != 6 {
            self.set_reg8(r, val);
        }

        let mut f = self.f & Flag::C as u8;
        if val == 0 {
            f |= Flag::Z as u8;
        }
        if (val & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(val) {
            f |= Flag::PV as u8;
        }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        Ok(12)
    }

    /// OUT (C), r — 12 T (ED prefix). No flags. The r=6 slot (ED 71)
    /// outputs 0.
    pub(crate) fn op_out_c_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let r = (opcode >> 3) & 0x07;
        let val = if r == 6 { 0 } else { self.get_reg8(r) };
        bus.port_out(self.c, val)?;
        Ok(12)
    }
}
