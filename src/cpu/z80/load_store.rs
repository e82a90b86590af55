use crate::core::{Bus, Result};
use crate::cpu::z80::{Flag, IndexMode, Z80};

impl Z80 {
    /// LD r, n — 7 T: M1(4) + MR(3)
    /// LD (HL), n — 10 T; LD (IX+d), n — 19 T (displacement before n)
    /// Opcode mask: 00 rrr 110
    pub(crate) fn op_ld_r_n<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let r = (opcode >> 3) & 0x07;

        if r == 6 {
            let indexed = self.index_mode != IndexMode::HL;
            let addr = self.operand_addr(bus)?;
            let n = self.fetch_byte(bus)?;
            bus.mem_write(addr, n)?;
            Ok(if indexed { 15 } else { 10 })
        } else {
            let n = self.fetch_byte(bus)?;
            self.set_reg8_ix(r, n);
            Ok(7)
        }
    }

    /// LD r, r' — 4 T: M1 only
    /// LD r, (HL) / LD (HL), r — 7 T; (IX+d) forms — 19 T
    /// Opcode mask: 01 dst src. H/L remap to IXH/IXL under a prefix,
    /// except in the (IX+d) forms where the register side is the real
    /// H or L.
    pub(crate) fn op_ld_r_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let src = opcode & 0x07;
        let dst = (opcode >> 3) & 0x07;

        if src == 6 {
            let indexed = self.index_mode != IndexMode::HL;
            let addr = self.operand_addr(bus)?;
            let val = bus.mem_read(addr)?;
            self.set_reg8(dst, val);
            Ok(if indexed { 15 } else { 7 })
        } else if dst == 6 {
            let indexed = self.index_mode != IndexMode::HL;
            let addr = self.operand_addr(bus)?;
            let val = self.get_reg8(src);
            bus.mem_write(addr, val)?;
            Ok(if indexed { 15 } else { 7 })
        } else {
            let val = self.get_reg8_ix(src);
            self.set_reg8_ix(dst, val);
            Ok(4)
        }
    }

    /// LD rr, nn — 10 T: M1(4) + MR(3) + MR(3)
    /// Opcode mask: 00 rr0 001 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=SP)
    pub(crate) fn op_ld_rr_nn<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let rp = (opcode >> 4) & 0x03;
        let val = self.fetch_word(bus)?;
        self.set_rp(rp, val);
        Ok(10)
    }

    /// LD A, (BC) — 7 T: M1(4) + MR(3)
    pub(crate) fn op_ld_a_bc<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        self.a = bus.mem_read(self.get_bc())?;
        Ok(7)
    }

    /// LD A, (DE) — 7 T: M1(4) + MR(3)
    pub(crate) fn op_ld_a_de<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        self.a = bus.mem_read(self.get_de())?;
        Ok(7)
    }

    /// LD (BC), A — 7 T: M1(4) + MW(3)
    pub(crate) fn op_ld_bc_a<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        bus.mem_write(self.get_bc(), self.a)?;
        Ok(7)
    }

    /// LD (DE), A — 7 T: M1(4) + MW(3)
    pub(crate) fn op_ld_de_a<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        bus.mem_write(self.get_de(), self.a)?;
        Ok(7)
    }

    /// LD A, (nn) — 13 T: M1(4) + MR(3) + MR(3) + MR(3)
    pub(crate) fn op_ld_a_nn<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let addr = self.fetch_word(bus)?;
        self.a = bus.mem_read(addr)?;
        Ok(13)
    }

    /// LD (nn), A — 13 T: M1(4) + MR(3) + MR(3) + MW(3)
    pub(crate) fn op_ld_nn_a<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let addr = self.fetch_word(bus)?;
        bus.mem_write(addr, self.a)?;
        Ok(13)
    }

    /// LD (nn), HL (or IX/IY) — 16 T: M1(4) + MR(3)x2 + MW(3)x2
    pub(crate) fn op_ld_nn_hl<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let addr = self.fetch_word(bus)?;
        let val = self.get_index();
        self.write_word(bus, addr, val)?;
        Ok(16)
    }

    /// LD HL (or IX/IY), (nn) — 16 T: M1(4) + MR(3)x4
    pub(crate) fn op_ld_hl_nn_ind<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let addr = self.fetch_word(bus)?;
        let val = self.read_word(bus, addr)?;
        self.set_index(val);
        Ok(16)
    }

    /// LD (nn), rr — 20 T (ED prefix)
    /// Opcode mask: 01 rr0 011
    pub(crate) fn op_ld_nn_rr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let rp = (opcode >> 4) & 0x03;
        let addr = self.fetch_word(bus)?;
        let val = self.get_rp(rp);
        self.write_word(bus, addr, val)?;
        Ok(20)
    }

    /// LD rr, (nn) — 20 T (ED prefix)
    /// Opcode mask: 01 rr1 011
    pub(crate) fn op_ld_rr_nn_ind<B: Bus + ?Sized>(
        &mut self,
        opcode: u8,
        bus: &mut B,
    ) -> Result<u32> {
        let rp = (opcode >> 4) & 0x03;
        let addr = self.fetch_word(bus)?;
        let val = self.read_word(bus, addr)?;
        self.set_rp(rp, val);
        Ok(20)
    }

    /// LD I, A — 9 T (ED prefix). No flags.
    pub(crate) fn op_ld_i_a(&mut self) -> Result<u32> {
        self.i = self.a;
        Ok(9)
    }

    /// LD R, A — 9 T (ED prefix). No flags; reloads the whole refresh
    /// counter including bit 7.
    pub(crate) fn op_ld_r_a(&mut self) -> Result<u32> {
        self.r = self.a;
        Ok(9)
    }

    /// LD A, I — 9 T (ED prefix).
    /// S/Z from the value, H=0, N=0, PV = IFF2, C preserved.
    pub(crate) fn op_ld_a_i(&mut self) -> Result<u32> {
        self.a = self.i;
        self.ir_load_flags();
        Ok(9)
    }

    /// LD A, R — 9 T (ED prefix). Flags as LD A, I.
    pub(crate) fn op_ld_a_r(&mut self) -> Result<u32> {
        self.a = self.r;
        self.ir_load_flags();
        Ok(9)
    }

    fn ir_load_flags(&mut self) {
        let mut f = self.f & Flag::C as u8;
        if self.a == 0 {
            f |= Flag::Z as u8;
        }
        if (self.a & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if self.iff2 {
            f |= Flag::PV as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    /// EX AF, AF' — 4 T: M1 only
    pub(crate) fn op_ex_af_af(&mut self) -> Result<u32> {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
        Ok(4)
    }

    /// EXX — 4 T: M1 only. Swaps BC/DE/HL with the primed bank.
    pub(crate) fn op_exx(&mut self) -> Result<u32> {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
        Ok(4)
    }

    /// EX DE, HL — 4 T: M1 only. Always the real HL, never IX/IY.
    pub(crate) fn op_ex_de_hl(&mut self) -> Result<u32> {
        std::mem::swap(&mut self.d, &mut self.h);
        std::mem::swap(&mut self.e, &mut self.l);
        Ok(4)
    }
}
