//! Static Z80 disassembler.
//!
//! Decodes the same five pages as the execution engine (base, CB, ED,
//! DD/FD, DD/FD-CB) into mnemonic text. Reads through the bus only;
//! never touches CPU state.

use std::fmt::Write;

use crate::core::{Bus, Fault, Result};
use crate::cpu::z80::InvalidOpcodePolicy;

const R8: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
const RP: [&str; 4] = ["BC", "DE", "HL", "SP"];
const RP_AF: [&str; 4] = ["BC", "DE", "HL", "AF"];
const CC: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
const ROT: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];
const BLOCK: [[&str; 4]; 4] = [
    ["LDI", "CPI", "INI", "OUTI"],
    ["LDD", "CPD", "IND", "OUTD"],
    ["LDIR", "CPIR", "INIR", "OTIR"],
    ["LDDR", "CPDR", "INDR", "OTDR"],
];

/// Rendered for a decode miss under `NopSilently`.
const BAD_OPCODE: &str = "?!?";

#[derive(Clone, Copy, Debug, PartialEq)]
enum Index {
    Hl,
    Ix,
    Iy,
}

impl Index {
    fn pair(self) -> &'static str {
        match self {
            Index::Hl => "HL",
            Index::Ix => "IX",
            Index::Iy => "IY",
        }
    }
}

/// One-instruction-at-a-time decoder with an internal cursor.
///
/// The invalid-opcode policy mirrors the CPU's: `NopSilently` renders
/// a miss as `?!?`, `RaiseError` surfaces [`Fault::IllegalOpcode`].
pub struct Disasm {
    cursor: u16,
    pub policy: InvalidOpcodePolicy,
}

impl Default for Disasm {
    fn default() -> Self {
        Self::new()
    }
}

impl Disasm {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            policy: InvalidOpcodePolicy::default(),
        }
    }

    pub fn with_policy(policy: InvalidOpcodePolicy) -> Self {
        Self { cursor: 0, policy }
    }

    /// Address of the next undecoded byte.
    pub fn cursor(&self) -> u16 {
        self.cursor
    }

    /// Decode exactly one instruction at `addr` and return the line
    /// `AAAA : BB BB ..        : MNEMONIC OPERANDS\r\n`.
    pub fn disassemble_at<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> Result<String> {
        self.cursor = addr;
        let mut bytes = Vec::with_capacity(5);
        let text = self.decode(bus, &mut bytes)?;

        let mut hex = String::new();
        for (i, b) in bytes.iter().enumerate() {
            if i > 0 {
                hex.push(' ');
            }
            let _ = write!(hex, "{:02X}", b);
        }
        Ok(format!("{:04X} : {:<17}: {}\r\n", addr, hex, text))
    }

    /// Decode `n` consecutive instructions starting at `addr`.
    pub fn disassemble_many<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        addr: u16,
        n: usize,
    ) -> Result<String> {
        let mut out = String::new();
        let mut at = addr;
        for _ in 0..n {
            out.push_str(&self.disassemble_at(bus, at)?);
            at = self.cursor;
        }
        Ok(out)
    }

    /// Decode every instruction from `from` up to `to` inclusive. The
    /// final instruction may extend past `to`.
    pub fn disassemble_range<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        from: u16,
        to: u16,
    ) -> Result<String> {
        let mut out = String::new();
        let mut at = from;
        while at >= from && at <= to {
            out.push_str(&self.disassemble_at(bus, at)?);
            if self.cursor < at {
                break; // wrapped past 0xFFFF
            }
            at = self.cursor;
        }
        Ok(out)
    }

    // --- Decoding ---

    fn next<B: Bus + ?Sized>(&mut self, bus: &mut B, bytes: &mut Vec<u8>) -> Result<u8> {
        let b = bus.mem_read(self.cursor)?;
        self.cursor = self.cursor.wrapping_add(1);
        bytes.push(b);
        Ok(b)
    }

    fn next_word<B: Bus + ?Sized>(&mut self, bus: &mut B, bytes: &mut Vec<u8>) -> Result<u16> {
        let low = self.next(bus, bytes)?;
        let high = self.next(bus, bytes)?;
        Ok(((high as u16) << 8) | low as u16)
    }

    fn decode<B: Bus + ?Sized>(&mut self, bus: &mut B, bytes: &mut Vec<u8>) -> Result<String> {
        let mut ix = Index::Hl;
        loop {
            let op = self.next(bus, bytes)?;
            match op {
                0xDD => ix = Index::Ix,
                0xFD => ix = Index::Iy,
                0xCB => return self.decode_cb(bus, bytes, ix),
                0xED => return self.decode_ed(bus, bytes),
                _ => return self.decode_base(bus, bytes, op, ix),
            }
        }
    }

    /// The (HL) operand slot: plain, or indexed with a displacement
    /// byte consumed here.
    fn mem_operand<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        bytes: &mut Vec<u8>,
        ix: Index,
    ) -> Result<String> {
        if ix == Index::Hl {
            return Ok("(HL)".into());
        }
        let d = self.next(bus, bytes)? as i8;
        Ok(indexed(ix, d))
    }

    fn decode_base<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        bytes: &mut Vec<u8>,
        op: u8,
        ix: Index,
    ) -> Result<String> {
        let text = match op {
            0x00 => "NOP".into(),
            0x76 => "HALT".into(),
            0xF3 => "DI".into(),
            0xFB => "EI".into(),
            0x07 => "RLCA".into(),
            0x0F => "RRCA".into(),
            0x17 => "RLA".into(),
            0x1F => "RRA".into(),
            0x27 => "DAA".into(),
            0x2F => "CPL".into(),
            0x37 => "SCF".into(),
            0x3F => "CCF".into(),

            0x08 => "EX AF,AF'".into(),
            0xD9 => "EXX".into(),
            0xEB => "EX DE,HL".into(),
            0xE3 => format!("EX (SP),{}", ix.pair()),

            0x10 => {
                let (d, target) = self.relative(bus, bytes)?;
                format!("DJNZ {:+} (\u{2192} {:04X}h)", d, target)
            }
            0x18 => {
                let (d, target) = self.relative(bus, bytes)?;
                format!("JR {:+} (\u{2192} {:04X}h)", d, target)
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                let (d, target) = self.relative(bus, bytes)?;
                format!(
                    "JR {},{:+} (\u{2192} {:04X}h)",
                    CC[((op >> 3) & 0x03) as usize],
                    d,
                    target
                )
            }

            0x01 | 0x11 | 0x21 | 0x31 => {
                let nn = self.next_word(bus, bytes)?;
                format!("LD {},{:04X}h", rp_name(op >> 4 & 3, ix), nn)
            }
            0x09 | 0x19 | 0x29 | 0x39 => {
                format!("ADD {},{}", ix.pair(), rp_name(op >> 4 & 3, ix))
            }
            0x03 | 0x13 | 0x23 | 0x33 => format!("INC {}", rp_name(op >> 4 & 3, ix)),
            0x0B | 0x1B | 0x2B | 0x3B => format!("DEC {}", rp_name(op >> 4 & 3, ix)),

            0x02 => "LD (BC),A".into(),
            0x12 => "LD (DE),A".into(),
            0x0A => "LD A,(BC)".into(),
            0x1A => "LD A,(DE)".into(),
            0x22 => {
                let nn = self.next_word(bus, bytes)?;
                format!("LD ({:04X}h),{}", nn, ix.pair())
            }
            0x2A => {
                let nn = self.next_word(bus, bytes)?;
                format!("LD {},({:04X}h)", ix.pair(), nn)
            }
            0x32 => {
                let nn = self.next_word(bus, bytes)?;
                format!("LD ({:04X}h),A", nn)
            }
            0x3A => {
                let nn = self.next_word(bus, bytes)?;
                format!("LD A,({:04X}h)", nn)
            }

            0xC3 => {
                let nn = self.next_word(bus, bytes)?;
                format!("JP {:04X}h", nn)
            }
            0xC9 => "RET".into(),
            0xCD => {
                let nn = self.next_word(bus, bytes)?;
                format!("CALL {:04X}h", nn)
            }
            0xE9 => format!("JP ({})", ix.pair()),
            0xF9 => format!("LD SP,{}", ix.pair()),

            0xD3 => {
                let n = self.next(bus, bytes)?;
                format!("OUT (#{:02X}h),A", n)
            }
            0xDB => {
                let n = self.next(bus, bytes)?;
                format!("IN A,(#{:02X}h)", n)
            }

            op if op & 0xC7 == 0x04 || op & 0xC7 == 0x05 => {
                let mnem = if op & 1 == 0 { "INC" } else { "DEC" };
                let r = (op >> 3) & 0x07;
                let operand = if r == 6 {
                    self.mem_operand(bus, bytes, ix)?
                } else {
                    reg8_name(r, ix).into()
                };
                format!("{} {}", mnem, operand)
            }
            op if op & 0xC7 == 0x06 => {
                let r = (op >> 3) & 0x07;
                // (IX+d),n: the displacement precedes the immediate
                let operand = if r == 6 {
                    self.mem_operand(bus, bytes, ix)?
                } else {
                    reg8_name(r, ix).into()
                };
                let n = self.next(bus, bytes)?;
                format!("LD {},#{:02X}h", operand, n)
            }
            op if op & 0xC0 == 0x40 => {
                let src = op & 0x07;
                let dst = (op >> 3) & 0x07;
                if src == 6 {
                    let operand = self.mem_operand(bus, bytes, ix)?;
                    format!("LD {},{}", R8[dst as usize], operand)
                } else if dst == 6 {
                    let operand = self.mem_operand(bus, bytes, ix)?;
                    format!("LD {},{}", operand, R8[src as usize])
                } else {
                    format!("LD {},{}", reg8_name(dst, ix), reg8_name(src, ix))
                }
            }
            op if op & 0xC0 == 0x80 => {
                let r = op & 0x07;
                let operand = if r == 6 {
                    self.mem_operand(bus, bytes, ix)?
                } else {
                    reg8_name(r, ix).into()
                };
                alu_text((op >> 3) & 0x07, &operand)
            }
            op if op & 0xC7 == 0xC0 => format!("RET {}", CC[((op >> 3) & 7) as usize]),
            op if op & 0xCF == 0xC1 => format!("POP {}", rp_af_name(op >> 4 & 3, ix)),
            op if op & 0xC7 == 0xC2 => {
                let nn = self.next_word(bus, bytes)?;
                format!("JP {},{:04X}h", CC[((op >> 3) & 7) as usize], nn)
            }
            op if op & 0xC7 == 0xC4 => {
                let nn = self.next_word(bus, bytes)?;
                format!("CALL {},{:04X}h", CC[((op >> 3) & 7) as usize], nn)
            }
            op if op & 0xCF == 0xC5 => format!("PUSH {}", rp_af_name(op >> 4 & 3, ix)),
            op if op & 0xC7 == 0xC6 => {
                let n = self.next(bus, bytes)?;
                alu_text((op >> 3) & 0x07, &format!("#{:02X}h", n))
            }
            op if op & 0xC7 == 0xC7 => format!("RST {:02X}h", op & 0x38),

            _ => BAD_OPCODE.into(), // prefixes are consumed by decode()
        };
        Ok(text)
    }

    fn decode_cb<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        bytes: &mut Vec<u8>,
        ix: Index,
    ) -> Result<String> {
        if ix == Index::Hl {
            let op = self.next(bus, bytes)?;
            let r = R8[(op & 0x07) as usize];
            let y = (op >> 3) & 0x07;
            let text = match op >> 6 {
                0 => format!("{} {}", ROT[y as usize], r),
                1 => format!("BIT {},{}", y, r),
                2 => format!("RES {},{}", y, r),
                _ => format!("SET {},{}", y, r),
            };
            Ok(text)
        } else {
            // DD/FD CB d op: displacement first, then the sub-opcode
            let d = self.next(bus, bytes)? as i8;
            let op = self.next(bus, bytes)?;
            let mem = indexed(ix, d);
            let r = op & 0x07;
            let y = (op >> 3) & 0x07;
            // Undocumented non-BIT forms also copy the result into a
            // register: rendered as a second operand.
            let copy = if r != 6 {
                format!(",{}", R8[r as usize])
            } else {
                String::new()
            };
            let text = match op >> 6 {
                0 => format!("{} {}{}", ROT[y as usize], mem, copy),
                1 => format!("BIT {},{}", y, mem),
                2 => format!("RES {},{}{}", y, mem, copy),
                _ => format!("SET {},{}{}", y, mem, copy),
            };
            Ok(text)
        }
    }

    fn decode_ed<B: Bus + ?Sized>(&mut self, bus: &mut B, bytes: &mut Vec<u8>) -> Result<String> {
        let op = self.next(bus, bytes)?;
        let text = match op {
            0x44 => "NEG".into(),
            0x45 => "RETN".into(),
            0x4D => "RETI".into(),
            0x46 => "IM 0".into(),
            0x56 => "IM 1".into(),
            0x5E => "IM 2".into(),
            0x47 => "LD I,A".into(),
            0x4F => "LD R,A".into(),
            0x57 => "LD A,I".into(),
            0x5F => "LD A,R".into(),
            0x67 => "RRD".into(),
            0x6F => "RLD".into(),

            op if op & 0xC7 == 0x40 => {
                let r = (op >> 3) & 0x07;
                if r == 6 {
                    "IN (C)".into()
                } else {
                    format!("IN {},(C)", R8[r as usize])
                }
            }
            op if op & 0xC7 == 0x41 => {
                let r = (op >> 3) & 0x07;
                if r == 6 {
                    "OUT (C),0".into()
                } else {
                    format!("OUT (C),{}", R8[r as usize])
                }
            }
            op if op & 0xCF == 0x42 => format!("SBC HL,{}", RP[(op >> 4 & 3) as usize]),
            op if op & 0xCF == 0x4A => format!("ADC HL,{}", RP[(op >> 4 & 3) as usize]),
            op if op & 0xCF == 0x43 => {
                let nn = self.next_word(bus, bytes)?;
                format!("LD ({:04X}h),{}", nn, RP[(op >> 4 & 3) as usize])
            }
            op if op & 0xCF == 0x4B => {
                let nn = self.next_word(bus, bytes)?;
                format!("LD {},({:04X}h)", RP[(op >> 4 & 3) as usize], nn)
            }

            op if (0xA0..=0xBB).contains(&op) && op & 0x04 == 0 => {
                let row = ((op >> 3) & 0x07) - 4;
                BLOCK[row as usize][(op & 0x03) as usize].into()
            }

            _ => {
                return match self.policy {
                    InvalidOpcodePolicy::NopSilently => Ok(BAD_OPCODE.into()),
                    InvalidOpcodePolicy::RaiseError => Err(Fault::IllegalOpcode {
                        addr: self.cursor.wrapping_sub(1),
                        opcode: op,
                        prefix: Some(0xED),
                    }),
                };
            }
        };
        Ok(text)
    }

    /// Read a branch displacement; returns (displacement, absolute
    /// target). The cursor already points past the instruction, which
    /// is the base the displacement is relative to.
    fn relative<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        bytes: &mut Vec<u8>,
    ) -> Result<(i8, u16)> {
        let d = self.next(bus, bytes)? as i8;
        Ok((d, self.cursor.wrapping_add(d as i16 as u16)))
    }
}

fn rp_name(rp: u8, ix: Index) -> &'static str {
    if rp & 3 == 2 {
        ix.pair()
    } else {
        RP[(rp & 3) as usize]
    }
}

fn rp_af_name(rp: u8, ix: Index) -> &'static str {
    if rp & 3 == 2 {
        ix.pair()
    } else {
        RP_AF[(rp & 3) as usize]
    }
}

/// H and L address the index-register halves under a DD/FD prefix.
fn reg8_name(r: u8, ix: Index) -> &'static str {
    match (r, ix) {
        (4, Index::Ix) => "IXH",
        (5, Index::Ix) => "IXL",
        (4, Index::Iy) => "IYH",
        (5, Index::Iy) => "IYL",
        _ => R8[(r & 7) as usize],
    }
}

/// Signed-decimal indexed operand, e.g. `(IX+5)` / `(IY-3)`.
fn indexed(ix: Index, d: i8) -> String {
    format!("({}{:+})", ix.pair(), d)
}

fn alu_text(alu_op: u8, operand: &str) -> String {
    match alu_op {
        0 => format!("ADD A,{}", operand),
        1 => format!("ADC A,{}", operand),
        2 => format!("SUB {}", operand),
        3 => format!("SBC A,{}", operand),
        4 => format!("AND {}", operand),
        5 => format!("XOR {}", operand),
        6 => format!("OR {}", operand),
        _ => format!("CP {}", operand),
    }
}
