use crate::core::{Bus, Result};
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    /// Evaluate a condition code (3 bits from opcode bits 5-3).
    /// 0=NZ, 1=Z, 2=NC, 3=C, 4=PO, 5=PE, 6=P, 7=M
    pub(crate) fn eval_condition(&self, cc: u8) -> bool {
        match cc {
            0 => !self.flag(Flag::Z),  // NZ
            1 => self.flag(Flag::Z),   // Z
            2 => !self.flag(Flag::C),  // NC
            3 => self.flag(Flag::C),   // C
            4 => !self.flag(Flag::PV), // PO (parity odd)
            5 => self.flag(Flag::PV),  // PE (parity even)
            6 => !self.flag(Flag::S),  // P (positive)
            7 => self.flag(Flag::S),   // M (minus)
            _ => unreachable!(),
        }
    }

    /// JP nn — 10 T: M1(4) + MR(3) + MR(3)
    pub(crate) fn op_jp_nn<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        self.pc = self.fetch_word(bus)?;
        Ok(10)
    }

    /// JP cc,nn — 10 T whether taken or not.
    pub(crate) fn op_jp_cc_nn<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let cc = (opcode >> 3) & 0x07;
        let addr = self.fetch_word(bus)?;
        if self.eval_condition(cc) {
            self.pc = addr;
        }
        Ok(10)
    }

    /// JP (HL) / JP (IX) / JP (IY) — 4 T: M1 only.
    /// Really "JP HL": loads PC from the pair, no memory access.
    pub(crate) fn op_jp_hl(&mut self) -> Result<u32> {
        self.pc = self.get_index();
        Ok(4)
    }

    /// JR e — 12 T: M1(4) + MR(3) + internal(5)
    pub(crate) fn op_jr<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let disp = self.fetch_byte(bus)? as i8;
        self.pc = self.pc.wrapping_add(disp as i16 as u16);
        Ok(12)
    }

    /// JR cc,e — 12 T taken / 7 T not taken (cc: NZ/Z/NC/C only)
    pub(crate) fn op_jr_cc<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let cc = (opcode >> 3) & 0x03;
        let disp = self.fetch_byte(bus)? as i8;
        if self.eval_condition(cc) {
            self.pc = self.pc.wrapping_add(disp as i16 as u16);
            Ok(12)
        } else {
            Ok(7)
        }
    }

    /// DJNZ e — 13 T taken / 8 T not taken. B-=1; branch if B != 0.
    pub(crate) fn op_djnz<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        self.b = self.b.wrapping_sub(1);
        let disp = self.fetch_byte(bus)? as i8;
        if self.b != 0 {
            self.pc = self.pc.wrapping_add(disp as i16 as u16);
            Ok(13)
        } else {
            Ok(8)
        }
    }

    /// CALL nn — 17 T: M1(4) + MR(3) + MR(4) + MW(3) + MW(3)
    pub(crate) fn op_call_nn<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let addr = self.fetch_word(bus)?;
        self.push_word(bus, self.pc)?;
        self.pc = addr;
        Ok(17)
    }

    /// CALL cc,nn — 17 T taken / 10 T not taken.
    /// Not taken still reads both address bytes.
    pub(crate) fn op_call_cc_nn<B: Bus + ?Sized>(
        &mut self,
        opcode: u8,
        bus: &mut B,
    ) -> Result<u32> {
        let cc = (opcode >> 3) & 0x07;
        let addr = self.fetch_word(bus)?;
        if self.eval_condition(cc) {
            self.push_word(bus, self.pc)?;
            self.pc = addr;
            Ok(17)
        } else {
            Ok(10)
        }
    }

    /// RET — 10 T: M1(4) + MR(3) + MR(3)
    pub(crate) fn op_ret<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        self.pc = self.pop_word(bus)?;
        Ok(10)
    }

    /// RET cc — 11 T taken / 5 T not taken.
    pub(crate) fn op_ret_cc<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let cc = (opcode >> 3) & 0x07;
        if self.eval_condition(cc) {
            self.pc = self.pop_word(bus)?;
            Ok(11)
        } else {
            Ok(5)
        }
    }

    /// RETN (ED 45) / RETI (ED 4D) — 14 T.
    /// Pops PC and restores IFF1 from IFF2 (both forms on real silicon).
    pub(crate) fn op_retn_reti<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        self.iff1 = self.iff2;
        self.pc = self.pop_word(bus)?;
        Ok(14)
    }

    /// RST p — 11 T: M1(5) + MW(3) + MW(3)
    /// Target address = opcode & 0x38 (0x00, 0x08, ..., 0x38).
    pub(crate) fn op_rst<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let target = (opcode & 0x38) as u16;
        self.push_word(bus, self.pc)?;
        self.pc = target;
        Ok(11)
    }

    /// DI — 4 T: M1 only.
    pub(crate) fn op_di(&mut self) -> Result<u32> {
        self.iff1 = false;
        self.iff2 = false;
        Ok(4)
    }

    /// EI — 4 T: M1 only. Interrupts are not accepted until after the
    /// next instruction.
    pub(crate) fn op_ei(&mut self) -> Result<u32> {
        self.iff1 = true;
        self.iff2 = true;
        self.ei_delay = true;
        Ok(4)
    }

    /// IM 0/1/2 — 8 T (ED prefix).
    /// Bits 4-3: 00/01 -> IM 0, 10 -> IM 1, 11 -> IM 2.
    pub(crate) fn op_im(&mut self, opcode: u8) -> Result<u32> {
        self.im = match (opcode >> 3) & 0x03 {
            0 | 1 => 0,
            2 => 1,
            _ => 2,
        };
        Ok(8)
    }
}
