use crate::core::{Bus, Result};
use crate::cpu::z80::{Flag, IndexMode, Z80};

impl Z80 {
    // --- Accumulator rotates (fast forms) ---
    // S, Z, PV preserved; H=0, N=0; C takes the shifted-out bit.

    /// RLCA — 4 T
    pub(crate) fn op_rlca(&mut self) -> Result<u32> {
        let c = self.a >> 7;
        self.a = (self.a << 1) | c;
        self.a_rotate_flags(c != 0);
        Ok(4)
    }

    /// RRCA — 4 T
    pub(crate) fn op_rrca(&mut self) -> Result<u32> {
        let c = self.a & 1;
        self.a = (self.a >> 1) | (c << 7);
        self.a_rotate_flags(c != 0);
        Ok(4)
    }

    /// RLA — 4 T (through carry)
    pub(crate) fn op_rla(&mut self) -> Result<u32> {
        let old_c: u8 = if self.flag(Flag::C) { 1 } else { 0 };
        let c = self.a >> 7;
        self.a = (self.a << 1) | old_c;
        self.a_rotate_flags(c != 0);
        Ok(4)
    }

    /// RRA — 4 T (through carry)
    pub(crate) fn op_rra(&mut self) -> Result<u32> {
        let old_c: u8 = if self.flag(Flag::C) { 0x80 } else { 0 };
        let c = self.a & 1;
        self.a = (self.a >> 1) | old_c;
        self.a_rotate_flags(c != 0);
        Ok(4)
    }

    fn a_rotate_flags(&mut self, carry: bool) {
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry {
            f |= Flag::C as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    // --- CB page ---

    /// One CB-page rotate/shift, selector from opcode bits 5-3 in
    /// hardware order: RLC RRC RL RR SLA SRA SLL SRL. Every form moves
    /// the departing bit into C and recomputes S/Z/parity from the
    /// result; H and N drop.
    fn rotate_shift(&mut self, sel: u8, val: u8) -> u8 {
        let cin: u8 = self.flag(Flag::C) as u8;
        // Left-moving forms push bit 7 out, right-moving forms bit 0.
        let out = if sel & 1 == 0 {
            val >= 0x80
        } else {
            val & 0x01 != 0
        };
        let result = match sel {
            0 => val.rotate_left(1),
            1 => val.rotate_right(1),
            2 => (val << 1) | cin,
            3 => (val >> 1) | (cin << 7),
            4 => val << 1,
            5 => (val >> 1) | (val & 0x80), // sign bit stays put
            6 => (val << 1) | 0x01,         // the undocumented SLL fills with 1
            _ => val >> 1,
        };

        self.set_flag(Flag::S, result >= 0x80);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::PV, Self::get_parity(result));
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::C, out);
        self.set_flag(Flag::X, result & 0x08 != 0);
        self.set_flag(Flag::Y, result & 0x20 != 0);
        result
    }

    /// BIT b: Z = NOT bit, PV = Z, S set only for BIT 7 of a set bit;
    /// H=1, N=0, C preserved.
    fn bit_test_flags(&mut self, b: u8, val: u8) {
        let bit_set = (val & (1 << b)) != 0;
        let mut f = (self.f & Flag::C as u8) | Flag::H as u8;
        if !bit_set {
            f |= Flag::Z as u8 | Flag::PV as u8;
        }
        if b == 7 && bit_set {
            f |= Flag::S as u8;
        }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    /// CB page entry point. Plain CB: sub-opcode is an M1 fetch.
    /// DD/FD CB: displacement first, then the sub-opcode (not an M1),
    /// operand always (IX+d)/(IY+d); non-BIT results are also copied
    /// into the register named by the sub-opcode (undocumented form).
    ///
    /// T-states (including the CB prefix, excluding any DD/FD prefix):
    /// rot/RES/SET r 8, (HL) 15, (IX+d) 19; BIT r 8, (HL) 12, (IX+d) 16.
    pub(crate) fn exec_cb<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        if self.index_mode == IndexMode::HL {
            let op = self.fetch_opcode(bus)?;
            let r = op & 0x07;
            let y = (op >> 3) & 0x07;
            match op >> 6 {
                0 => {
                    // Rotate/shift
                    if r == 6 {
                        let addr = self.get_hl();
                        let val = bus.mem_read(addr)?;
                        let result = self.rotate_shift(y, val);
                        bus.mem_write(addr, result)?;
                        Ok(15)
                    } else {
                        let val = self.get_reg8(r);
                        let result = self.rotate_shift(y, val);
                        self.set_reg8(r, result);
                        Ok(8)
                    }
                }
                1 => {
                    // BIT b
                    if r == 6 {
                        let val = bus.mem_read(self.get_hl())?;
                        self.bit_test_flags(y, val);
                        Ok(12)
                    } else {
                        let val = self.get_reg8(r);
                        self.bit_test_flags(y, val);
                        Ok(8)
                    }
                }
                _ => {
                    // RES/SET b. No flags.
                    let set = (op & 0x40) != 0;
                    if r == 6 {
                        let addr = self.get_hl();
                        let val = bus.mem_read(addr)?;
                        let result = Self::apply_res_set(val, y, set);
                        bus.mem_write(addr, result)?;
                        Ok(15)
                    } else {
                        let val = self.get_reg8(r);
                        self.set_reg8(r, Self::apply_res_set(val, y, set));
                        Ok(8)
                    }
                }
            }
        } else {
            // DD CB d op / FD CB d op
            let d = self.fetch_byte(bus)? as i8;
            let op = self.fetch_byte(bus)?;
            let addr = self.get_index().wrapping_add(d as i16 as u16);
            let r = op & 0x07;
            let y = (op >> 3) & 0x07;
            match op >> 6 {
                1 => {
                    let val = bus.mem_read(addr)?;
                    self.bit_test_flags(y, val);
                    Ok(16)
                }
                x => {
                    let val = bus.mem_read(addr)?;
                    let result = if x == 0 {
                        self.rotate_shift(y, val)
                    } else {
                        Self::apply_res_set(val, y, (op & 0x40) != 0)
                    };
                    bus.mem_write(addr, result)?;
                    if r != 6 {
                        self.set_reg8(r, result);
                    }
                    Ok(19)
                }
            }
        }
    }

    fn apply_res_set(val: u8, b: u8, set: bool) -> u8 {
        if set {
            val | (1 << b)
        } else {
            val & !(1 << b)
        }
    }

    // --- Digit rotates ---

    /// RRD — 18 T (ED prefix). Low nibble of A and both nibbles of
    /// (HL) rotate right as a 12-bit group.
    /// S/Z/P from the new A; H=0, N=0; C preserved.
    pub(crate) fn op_rrd<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let addr = self.get_hl();
        let m = bus.mem_read(addr)?;
        let new_m = (m >> 4) | (self.a << 4);
        self.a = (self.a & 0xF0) | (m & 0x0F);
        bus.mem_write(addr, new_m)?;
        self.digit_rotate_flags();
        Ok(18)
    }

    /// RLD — 18 T (ED prefix). Mirror of RRD.
    pub(crate) fn op_rld<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let addr = self.get_hl();
        let m = bus.mem_read(addr)?;
        let new_m = (m << 4) | (self.a & 0x0F);
        self.a = (self.a & 0xF0) | (m >> 4);
        bus.mem_write(addr, new_m)?;
        self.digit_rotate_flags();
        Ok(18)
    }

    fn digit_rotate_flags(&mut self) {
        let mut f = self.f & Flag::C as u8;
        if self.a == 0 {
            f |= Flag::Z as u8;
        }
        if (self.a & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(self.a) {
            f |= Flag::PV as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }
}
