use crate::core::{Bus, Result};
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    // --- Block Transfer ---

    /// LDI/LDD — 16 T (ED prefix)
    /// LDI (ED A0): (DE) <- (HL), HL++, DE++, BC--
    /// LDD (ED A8): (DE) <- (HL), HL--, DE--, BC--
    /// PV = (BC != 0); H=0, N=0; S/Z/C preserved.
    pub(crate) fn op_ldi_ldd<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        self.block_transfer(opcode, bus)?;
        Ok(16)
    }

    /// LDIR/LDDR — 21 T per looping iteration, 16 T on the last.
    /// One iteration per `step()`; the repeat rewinds PC by 2 so the
    /// next step re-executes the instruction. BC=0 on entry therefore
    /// copies 65,536 bytes.
    pub(crate) fn op_ldir_lddr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        self.block_transfer(opcode, bus)?;
        if self.get_bc() != 0 {
            self.pc = self.pc.wrapping_sub(2);
            Ok(21)
        } else {
            Ok(16)
        }
    }

    fn block_transfer<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<()> {
        let dec = (opcode & 0x08) != 0;
        let val = bus.mem_read(self.get_hl())?;
        bus.mem_write(self.get_de(), val)?;

        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.set_de(self.get_de().wrapping_add(delta));
        self.set_bc(self.get_bc().wrapping_sub(1));

        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::C as u8);
        if self.get_bc() != 0 {
            f |= Flag::PV as u8;
        }
        // F3/F5 leak the ALU temporary (moved byte plus A): F3 is its
        // bit 3, F5 its bit 1
        let residue = val.wrapping_add(self.a);
        f |= residue & 0x08;
        if residue & 0x02 != 0 {
            f |= 0x20;
        }
        self.f = f;
        Ok(())
    }

    // --- Block Compare ---

    /// CPI/CPD — 16 T (ED prefix)
    /// Compare A-(HL), HL±1, BC--. Z if equal, PV = (BC != 0), N=1,
    /// C preserved.
    pub(crate) fn op_cpi_cpd<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        self.block_compare(opcode, bus)?;
        Ok(16)
    }

    /// CPIR/CPDR — 21 T per looping iteration, 16 T on the last.
    /// Repeats while BC != 0 and the comparison missed (Z = 0).
    pub(crate) fn op_cpir_cpdr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        self.block_compare(opcode, bus)?;
        if self.get_bc() != 0 && !self.flag(Flag::Z) {
            self.pc = self.pc.wrapping_sub(2);
            Ok(21)
        } else {
            Ok(16)
        }
    }

    fn block_compare<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<()> {
        let dec = (opcode & 0x08) != 0;
        let val = bus.mem_read(self.get_hl())?;
        let result = self.a.wrapping_sub(val);
        let h = (self.a & 0xF) < (val & 0xF);

        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.set_bc(self.get_bc().wrapping_sub(1));

        let mut f = self.f & Flag::C as u8; // preserve C
        f |= Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if h {
            f |= Flag::H as u8;
        }
        if self.get_bc() != 0 {
            f |= Flag::PV as u8;
        }
        // F3/F5 leak the comparison temporary (difference less the
        // half borrow): F3 is its bit 3, F5 its bit 1
        let residue = result.wrapping_sub(h as u8);
        f |= residue & 0x08;
        if residue & 0x02 != 0 {
            f |= 0x20;
        }
        self.f = f;
        Ok(())
    }

    // --- Block I/O ---

    /// INI/IND — 16 T (ED prefix)
    /// B--, IN port (C) -> (HL), HL±1. Z/S reflect the new B, N=1,
    /// C preserved.
    pub(crate) fn op_ini_ind<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        self.block_in(opcode, bus)?;
        Ok(16)
    }

    /// INIR/INDR — 21 T per looping iteration, 16 T on the last.
    pub(crate) fn op_inir_indr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        self.block_in(opcode, bus)?;
        if self.b != 0 {
            self.pc = self.pc.wrapping_sub(2);
            Ok(21)
        } else {
            Ok(16)
        }
    }

    fn block_in<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<()> {
        let dec = (opcode & 0x08) != 0;
        self.b = self.b.wrapping_sub(1);
        let val = bus.port_in(self.c)?;
        bus.mem_write(self.get_hl(), val)?;
        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.block_io_flags();
        Ok(())
    }

    /// OUTI/OUTD — 16 T (ED prefix)
    /// B--, (HL) -> OUT port (C), HL±1. Flags as INI/IND.
    pub(crate) fn op_outi_outd<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        self.block_out(opcode, bus)?;
        Ok(16)
    }

    /// OTIR/OTDR — 21 T per looping iteration, 16 T on the last.
    pub(crate) fn op_otir_otdr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        self.block_out(opcode, bus)?;
        if self.b != 0 {
            self.pc = self.pc.wrapping_sub(2);
            Ok(21)
        } else {
            Ok(16)
        }
    }

    fn block_out<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<()> {
        let dec = (opcode & 0x08) != 0;
        self.b = self.b.wrapping_sub(1);
        let val = bus.mem_read(self.get_hl())?;
        bus.port_out(self.c, val)?;
        let delta: u16 = if dec { 0xFFFF } else { 1 };
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.block_io_flags();
        Ok(())
    }

    fn block_io_flags(&mut self) {
        let mut f = self.f & Flag::C as u8;
        f |= Flag::N as u8;
        if self.b == 0 {
            f |= Flag::Z as u8;
        }
        if (self.b & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        f |= self.b & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }
}
