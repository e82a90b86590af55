use crate::core::{Bus, Result};
use crate::cpu::z80::{Flag, IndexMode, Z80};

impl Z80 {
    // --- Flag Helpers ---

    pub(crate) fn get_parity(val: u8) -> bool {
        val.count_ones() & 1 == 0
    }

    /// Flag outcome shared by AND/OR/XOR: C and N always drop, H only
    /// survives for AND, the rest follow the result.
    fn logic_flags(&mut self, result: u8, half: bool) {
        self.set_flag(Flag::S, result >= 0x80);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::H, half);
        self.set_flag(Flag::PV, Self::get_parity(result));
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::C, false);
        self.set_flag(Flag::X, result & 0x08 != 0);
        self.set_flag(Flag::Y, result & 0x20 != 0);
    }

    /// A <- A + rhs (+ carry). Full additive flag set.
    fn add8(&mut self, rhs: u8, with_carry: bool) {
        let lhs = self.a;
        let cin: u8 = (with_carry && self.flag(Flag::C)) as u8;
        let wide = lhs as u16 + rhs as u16 + cin as u16;
        let sum = wide as u8;

        // Half carry: the low-nibble sum spills into bit 4
        let low = (lhs & 0x0F) + (rhs & 0x0F) + cin;

        self.set_flag(Flag::S, sum >= 0x80);
        self.set_flag(Flag::Z, sum == 0);
        self.set_flag(Flag::H, low > 0x0F);
        // Overflow: addends agree in sign, the sum does not
        self.set_flag(
            Flag::PV,
            (lhs ^ rhs) & 0x80 == 0 && (lhs ^ sum) & 0x80 != 0,
        );
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::C, wide > 0xFF);
        self.set_flag(Flag::X, sum & 0x08 != 0);
        self.set_flag(Flag::Y, sum & 0x20 != 0);
        self.a = sum;
    }

    /// A - rhs (- borrow), returned without being stored so CP and NEG
    /// can reuse the subtractive flag set.
    fn sub8(&mut self, rhs: u8, with_carry: bool) -> u8 {
        let lhs = self.a;
        let cin: u8 = (with_carry && self.flag(Flag::C)) as u8;
        let wide = lhs as i16 - rhs as i16 - cin as i16;
        let diff = wide as u8;

        // Half borrow: the low-nibble difference goes negative
        let low = (lhs & 0x0F) as i16 - (rhs & 0x0F) as i16 - cin as i16;

        self.set_flag(Flag::S, diff >= 0x80);
        self.set_flag(Flag::Z, diff == 0);
        self.set_flag(Flag::H, low < 0);
        // Overflow: operands disagree in sign and the difference takes
        // the subtrahend's
        self.set_flag(
            Flag::PV,
            (lhs ^ rhs) & 0x80 != 0 && (rhs ^ diff) & 0x80 == 0,
        );
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::C, wide < 0);
        self.set_flag(Flag::X, diff & 0x08 != 0);
        self.set_flag(Flag::Y, diff & 0x20 != 0);
        diff
    }

    /// CP: subtractive flags, A kept. F3/F5 show the operand rather
    /// than the difference.
    fn cp8(&mut self, rhs: u8) {
        self.sub8(rhs, false);
        self.set_flag(Flag::X, rhs & 0x08 != 0);
        self.set_flag(Flag::Y, rhs & 0x20 != 0);
    }

    /// Dispatch on the ALU selector field (opcode bits 5-3):
    /// ADD ADC SUB SBC AND XOR OR CP.
    fn alu_apply(&mut self, sel: u8, val: u8) {
        match sel {
            0 | 1 => self.add8(val, sel == 1),
            2 | 3 => self.a = self.sub8(val, sel == 3),
            7 => self.cp8(val),
            _ => {
                let result = match sel {
                    4 => self.a & val,
                    5 => self.a ^ val,
                    _ => self.a | val,
                };
                self.logic_flags(result, sel == 4);
                self.a = result;
            }
        }
    }

    /// Step a value up by one. C is left alone; PV flags the
    /// 0x7F -> 0x80 crossing, H the nibble rollover.
    fn inc8(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.set_flag(Flag::S, result >= 0x80);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::H, val & 0x0F == 0x0F);
        self.set_flag(Flag::PV, val == 0x7F);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::X, result & 0x08 != 0);
        self.set_flag(Flag::Y, result & 0x20 != 0);
        result
    }

    /// Step a value down by one. C is left alone; PV flags the
    /// 0x80 -> 0x7F crossing, H the borrow out of bit 4.
    fn dec8(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.set_flag(Flag::S, result >= 0x80);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::H, val & 0x0F == 0);
        self.set_flag(Flag::PV, val == 0x80);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::X, result & 0x08 != 0);
        self.set_flag(Flag::Y, result & 0x20 != 0);
        result
    }

    // --- Instructions ---

    /// ALU A, r — 4 T
    /// ALU A, (HL) — 7 T; ALU A, (IX+d) — 19 T
    /// ADD, ADC, SUB, SBC, AND, XOR, OR, CP. Opcode mask: 10 xxx zzz
    pub(crate) fn op_alu_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let sel = (opcode >> 3) & 0x07;
        let r = opcode & 0x07;

        if r == 6 {
            let indexed = self.index_mode != IndexMode::HL;
            let addr = self.operand_addr(bus)?;
            let val = bus.mem_read(addr)?;
            self.alu_apply(sel, val);
            Ok(if indexed { 15 } else { 7 })
        } else {
            let val = self.get_reg8_ix(r);
            self.alu_apply(sel, val);
            Ok(4)
        }
    }

    /// ALU A, n — 7 T: M1(4) + MR(3)
    /// Opcode mask: 11 xxx 110
    pub(crate) fn op_alu_n<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let sel = (opcode >> 3) & 0x07;
        let val = self.fetch_byte(bus)?;
        self.alu_apply(sel, val);
        Ok(7)
    }

    /// INC/DEC r — 4 T
    /// INC/DEC (HL) — 11 T; INC/DEC (IX+d) — 23 T
    /// Opcode mask: 00 rrr 10x. C flag untouched.
    pub(crate) fn op_inc_dec_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        let r = (opcode >> 3) & 0x07;
        let is_dec = (opcode & 0x01) != 0;

        if r == 6 {
            // Read-modify-write on the memory operand
            let indexed = self.index_mode != IndexMode::HL;
            let addr = self.operand_addr(bus)?;
            let val = bus.mem_read(addr)?;
            let result = if is_dec { self.dec8(val) } else { self.inc8(val) };
            bus.mem_write(addr, result)?;
            Ok(if indexed { 19 } else { 11 })
        } else {
            let val = self.get_reg8_ix(r);
            let result = if is_dec { self.dec8(val) } else { self.inc8(val) };
            self.set_reg8_ix(r, result);
            Ok(4)
        }
    }

    /// INC/DEC rr — 6 T: M1(6). No flags affected.
    /// Opcode mask: 00 rrx 011 (bit 3 set = DEC)
    pub(crate) fn op_inc_dec_rr(&mut self, opcode: u8) -> Result<u32> {
        let rp = (opcode >> 4) & 0x03;
        let val = self.get_rp(rp);
        if (opcode & 0x08) != 0 {
            self.set_rp(rp, val.wrapping_sub(1));
        } else {
            self.set_rp(rp, val.wrapping_add(1));
        }
        Ok(6)
    }

    /// ADD HL,rr (or ADD IX/IY,rr) — 11 T: M1(4) + internal(7)
    /// Affects H (bit 11), N, C only; S/Z/PV preserved.
    pub(crate) fn op_add_hl_rr(&mut self, opcode: u8) -> Result<u32> {
        let rp = (opcode >> 4) & 0x03;
        let a = self.get_index();
        let b = self.get_rp(rp);
        let result_u32 = (a as u32) + (b as u32);
        let result = result_u32 as u16;

        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if ((a & 0x0FFF) + (b & 0x0FFF)) > 0x0FFF {
            f |= Flag::H as u8;
        }
        if result_u32 > 0xFFFF {
            f |= Flag::C as u8;
        }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.set_index(result);
        Ok(11)
    }

    /// ADC HL,rr — 15 T (ED prefix). Full 16-bit flag set.
    pub(crate) fn op_adc_hl_rr(&mut self, opcode: u8) -> Result<u32> {
        let rp = (opcode >> 4) & 0x03;
        let a = self.get_hl();
        let b = self.get_rp(rp);
        let c_val: u16 = if self.flag(Flag::C) { 1 } else { 0 };
        let result_u32 = (a as u32) + (b as u32) + (c_val as u32);
        let result = result_u32 as u16;

        let mut f = 0;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x8000) != 0 {
            f |= Flag::S as u8;
        }
        if ((a & 0x0FFF) + (b & 0x0FFF) + c_val) > 0x0FFF {
            f |= Flag::H as u8;
        }
        if ((a ^ result) & (b ^ result) & 0x8000) != 0 {
            f |= Flag::PV as u8;
        }
        if result_u32 > 0xFFFF {
            f |= Flag::C as u8;
        }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.set_hl(result);
        Ok(15)
    }

    /// SBC HL,rr — 15 T (ED prefix). Full 16-bit flag set.
    pub(crate) fn op_sbc_hl_rr(&mut self, opcode: u8) -> Result<u32> {
        let rp = (opcode >> 4) & 0x03;
        let a = self.get_hl();
        let b = self.get_rp(rp);
        let c_val: u16 = if self.flag(Flag::C) { 1 } else { 0 };
        let result_u32 = (a as u32)
            .wrapping_sub(b as u32)
            .wrapping_sub(c_val as u32);
        let result = result_u32 as u16;

        let mut f = Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x8000) != 0 {
            f |= Flag::S as u8;
        }
        if (a & 0x0FFF) < ((b & 0x0FFF) + c_val) {
            f |= Flag::H as u8;
        }
        if ((a ^ b) & (a ^ result) & 0x8000) != 0 {
            f |= Flag::PV as u8;
        }
        if result_u32 > 0xFFFF {
            f |= Flag::C as u8;
        }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.set_hl(result);
        Ok(15)
    }

    /// DAA — 4 T. Decimal adjust after ADD/SUB per the Z80 table:
    /// adjust by 00/06/60/66 from N, C, H and the nibble magnitudes.
    /// C is sticky on addition; H becomes the new bit 3->4 carry;
    /// N is preserved; S/Z/P recomputed from the new A.
    pub(crate) fn op_daa(&mut self) -> Result<u32> {
        let a = self.a;
        let n = self.flag(Flag::N);
        let h = self.flag(Flag::H);
        let mut carry = self.flag(Flag::C);

        let mut adjust: u8 = 0;
        if h || (a & 0x0F) > 9 {
            adjust |= 0x06;
        }
        if carry || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }

        let result = if n {
            a.wrapping_sub(adjust)
        } else {
            a.wrapping_add(adjust)
        };
        let new_h = if n { h && (a & 0x0F) < 6 } else { (a & 0x0F) > 9 };

        let mut f = 0;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(result) {
            f |= Flag::PV as u8;
        }
        if new_h {
            f |= Flag::H as u8;
        }
        if n {
            f |= Flag::N as u8;
        }
        if carry {
            f |= Flag::C as u8;
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.f = f;
        Ok(4)
    }

    /// CPL — 4 T. A = ~A; H=1, N=1; S/Z/PV/C preserved.
    pub(crate) fn op_cpl(&mut self) -> Result<u32> {
        self.a = !self.a;
        let mut f = self.f
            & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8 | Flag::C as u8);
        f |= Flag::H as u8 | Flag::N as u8;
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        Ok(4)
    }

    /// NEG — 8 T (ED prefix). A = 0 - A.
    /// C set iff A was non-zero; PV set iff A was 0x80.
    pub(crate) fn op_neg(&mut self) -> Result<u32> {
        let val = self.a;
        self.a = 0;
        self.a = self.sub8(val, false);
        Ok(8)
    }

    /// SCF — 4 T. C=1, H=0, N=0; S/Z/PV preserved.
    pub(crate) fn op_scf(&mut self) -> Result<u32> {
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        f |= Flag::C as u8;
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        Ok(4)
    }

    /// CCF — 4 T. C toggled, H = old C, N=0; S/Z/PV preserved.
    pub(crate) fn op_ccf(&mut self) -> Result<u32> {
        let old_c = self.flag(Flag::C);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if old_c {
            f |= Flag::H as u8;
        } else {
            f |= Flag::C as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        Ok(4)
    }
}
