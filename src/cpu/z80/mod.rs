mod alu;
mod bit;
mod block;
mod branch;
mod io;
mod load_store;
mod stack;

use log::{error, trace};

use crate::core::{Bus, Fault, Result};
use crate::cpu::state::Z80State;
use crate::trace::Tracer;

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Unused (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Unused (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

/// What to do when a byte stream decodes to a position with no defined
/// behavior (the ED page has gaps; the other pages are fully assigned).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum InvalidOpcodePolicy {
    /// Charge the NOP cost per fetched byte and carry on.
    NopSilently,
    /// Surface a [`Fault::IllegalOpcode`] from `step()`.
    #[default]
    RaiseError,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum IndexMode {
    HL,
    IX,
    IY,
}

pub struct Z80 {
    // Registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow Registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & Special Registers
    pub ix: u16,
    pub iy: u16,
    pub i: u8,
    pub r: u8,
    pub sp: u16,
    pub pc: u16,

    // Interrupt state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,

    // Run state
    pub halted: bool,
    /// Monotonic T-state counter, reset by `reset()`.
    pub cycles: u64,

    pub policy: InvalidOpcodePolicy,

    // Prefix handling: which pair (HL/IX/IY) the current instruction
    // addresses through. Reset at each instruction boundary.
    pub(crate) index_mode: IndexMode,

    // External lines
    int_line: bool,
    nmi_line: bool,
    nmi_pending: bool,
    reset_line: bool,
    /// Byte a peripheral drives onto the data bus during interrupt
    /// acknowledge (IM 0 opcode / IM 2 vector).
    int_data: Option<u8>,
    /// EI shadows interrupt acceptance for one following instruction.
    ei_delay: bool,

    trace: Option<Tracer>,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        Self {
            a: 0xFF,
            f: 0xFF,
            b: 0xFF,
            c: 0xFF,
            d: 0xFF,
            e: 0xFF,
            h: 0xFF,
            l: 0xFF,
            a_prime: 0xFF,
            f_prime: 0xFF,
            b_prime: 0xFF,
            c_prime: 0xFF,
            d_prime: 0xFF,
            e_prime: 0xFF,
            h_prime: 0xFF,
            l_prime: 0xFF,
            ix: 0xFFFF,
            iy: 0xFFFF,
            i: 0,
            r: 0,
            sp: 0xFFFF,
            pc: 0x0000,
            iff1: false,
            iff2: false,
            im: 0,
            halted: false,
            cycles: 0,
            policy: InvalidOpcodePolicy::default(),
            index_mode: IndexMode::HL,
            int_line: false,
            nmi_line: false,
            nmi_pending: false,
            reset_line: false,
            int_data: None,
            ei_delay: false,
            trace: None,
        }
    }

    // --- 16-bit register pair access ---

    pub fn get_bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }
    pub fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    pub fn get_de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }
    pub fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn get_hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }
    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    pub fn get_af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f as u16
    }
    pub fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.f = val as u8;
    }

    // --- Flag access ---

    #[inline]
    pub fn flag(&self, flag: Flag) -> bool {
        (self.f & flag as u8) != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flag, set: bool) {
        if set {
            self.f |= flag as u8
        } else {
            self.f &= !(flag as u8)
        }
    }

    pub fn snapshot(&self) -> Z80State {
        Z80State {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            a_prime: self.a_prime,
            f_prime: self.f_prime,
            b_prime: self.b_prime,
            c_prime: self.c_prime,
            d_prime: self.d_prime,
            e_prime: self.e_prime,
            h_prime: self.h_prime,
            l_prime: self.l_prime,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            halted: self.halted,
            cycles: self.cycles,
        }
    }

    // --- External lines and control ---

    /// Architectural reset: PC, I, R, IM and the interrupt enables are
    /// cleared, the T-state counter restarts. General registers keep
    /// whatever they held (matches documented hardware behavior).
    pub fn reset(&mut self) {
        trace!("RESET at PC={:04X}", self.pc);
        self.pc = 0x0000;
        self.i = 0;
        self.r = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.im = 0;
        self.halted = false;
        self.ei_delay = false;
        self.nmi_pending = false;
        self.index_mode = IndexMode::HL;
        self.cycles = 0;
        if let Some(t) = self.trace.as_mut() {
            t.marker("*** RESET! ***");
        }
    }

    /// Latch an NMI edge; serviced before the next fetch.
    pub fn trigger_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Drive the NMI line. A low-to-high transition latches an edge.
    pub fn set_nmi_line(&mut self, high: bool) {
        if high && !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = high;
    }

    /// Drive the (level-triggered) INT line.
    pub fn set_int_line(&mut self, high: bool) {
        self.int_line = high;
    }

    /// Drive the RESET line. The rising edge performs `reset()`; while
    /// the line is high `step()` does no work and returns 0.
    pub fn set_reset_line(&mut self, high: bool) {
        if high && !self.reset_line {
            self.reset();
        }
        self.reset_line = high;
    }

    /// Set the byte a peripheral will drive onto the data bus during
    /// interrupt acknowledge: the injected opcode for IM 0, the vector
    /// for IM 2. `None` means nobody drives the bus (0xFF / vector 0).
    pub fn set_int_data(&mut self, data: Option<u8>) {
        self.int_data = data;
    }

    /// Attach a per-step trace sink (a fresh disassembler rides along),
    /// or detach and flush the current one.
    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn std::io::Write>>) {
        match sink {
            Some(s) => self.trace = Some(Tracer::new(s, self.policy)),
            None => {
                if let Some(mut t) = self.trace.take() {
                    t.flush();
                }
            }
        }
    }

    // --- Stepper ---

    /// Service pending RESET/NMI/INT, then execute one instruction.
    /// Returns the T-states consumed by this invocation.
    pub fn step<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        if self.reset_line {
            return Ok(0);
        }

        if self.nmi_pending {
            let t = self.service_nmi(bus)?;
            self.cycles += t as u64;
            return Ok(t);
        }

        if self.int_line && self.iff1 && !self.ei_delay {
            let t = self.service_irq(bus)?;
            self.cycles += t as u64;
            return Ok(t);
        }
        self.ei_delay = false;

        if self.halted {
            // Executes NOPs internally; refresh keeps running.
            self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
            self.cycles += 4;
            return Ok(4);
        }

        if self.trace.is_some() {
            let pc = self.pc;
            if let Some(t) = self.trace.as_mut() {
                t.instruction(bus, pc);
            }
        }

        let t = self.exec_one(bus)?;
        self.cycles += t as u64;

        if self.trace.is_some() {
            let snap = self.snapshot();
            if let Some(t) = self.trace.as_mut() {
                t.registers(&snap);
            }
        }
        Ok(t)
    }

    /// Execute at least `n` T-states worth of instructions. The last
    /// instruction always completes, so the return value may exceed
    /// `n`; it is 0 only when the CPU is held in RESET.
    pub fn run<B: Bus + ?Sized>(&mut self, bus: &mut B, n: u64) -> Result<u64> {
        let mut total: u64 = 0;
        while total < n {
            let t = self.step(bus)?;
            if t == 0 {
                break;
            }
            total += t as u64;
        }
        Ok(total)
    }

    // --- Interrupt acknowledge ---

    fn service_nmi<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        trace!("NMI accepted at PC={:04X}", self.pc);
        if let Some(t) = self.trace.as_mut() {
            t.marker("*** NMI! ***");
        }
        self.nmi_pending = false;
        self.halted = false;
        // IFF1 is saved in IFF2 so RETN can restore it.
        self.iff2 = self.iff1;
        self.iff1 = false;
        self.push_word(bus, self.pc)?;
        self.pc = 0x0066;
        Ok(11)
    }

    fn service_irq<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        trace!("IRQ accepted at PC={:04X} (IM {})", self.pc, self.im);
        if let Some(t) = self.trace.as_mut() {
            t.marker("*** IRQ! ***");
        }
        self.halted = false;
        self.iff1 = false;
        self.iff2 = false;
        match self.im {
            0 => {
                // Execute the byte the peripheral drives onto the bus.
                // Nobody driving reads as 0xFF (RST 38h).
                let op = self.int_data.unwrap_or(0xFF);
                self.index_mode = IndexMode::HL;
                self.exec_base(op, bus)?;
                Ok(13)
            }
            1 => {
                self.push_word(bus, self.pc)?;
                self.pc = 0x0038;
                Ok(13)
            }
            _ => {
                self.push_word(bus, self.pc)?;
                let vector = self.int_data.unwrap_or(0) & 0xFE;
                let ptr = ((self.i as u16) << 8) | vector as u16;
                self.pc = self.read_word(bus, ptr)?;
                Ok(19)
            }
        }
    }

    // --- Fetch and addressing helpers ---

    /// M1 fetch at PC: advances PC and the refresh counter (low 7 bits
    /// increment, bit 7 preserved).
    pub(crate) fn fetch_opcode<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u8> {
        let op = bus.mem_read(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
        Ok(op)
    }

    /// Immediate byte at PC (no refresh).
    pub(crate) fn fetch_byte<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u8> {
        let val = bus.mem_read(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(val)
    }

    /// Immediate little-endian word at PC.
    pub(crate) fn fetch_word<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u16> {
        let low = self.fetch_byte(bus)?;
        let high = self.fetch_byte(bus)?;
        Ok(((high as u16) << 8) | low as u16)
    }

    pub(crate) fn read_word<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> Result<u16> {
        let low = bus.mem_read(addr)?;
        let high = bus.mem_read(addr.wrapping_add(1))?;
        Ok(((high as u16) << 8) | low as u16)
    }

    pub(crate) fn write_word<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        addr: u16,
        val: u16,
    ) -> Result<()> {
        bus.mem_write(addr, val as u8)?;
        bus.mem_write(addr.wrapping_add(1), (val >> 8) as u8)
    }

    /// PUSH: high byte at SP-1, low byte at SP-2.
    pub(crate) fn push_word<B: Bus + ?Sized>(&mut self, bus: &mut B, val: u16) -> Result<()> {
        self.sp = self.sp.wrapping_sub(1);
        bus.mem_write(self.sp, (val >> 8) as u8)?;
        self.sp = self.sp.wrapping_sub(1);
        bus.mem_write(self.sp, val as u8)
    }

    /// POP: low byte at SP, high byte at SP+1.
    pub(crate) fn pop_word<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u16> {
        let low = bus.mem_read(self.sp)?;
        self.sp = self.sp.wrapping_add(1);
        let high = bus.mem_read(self.sp)?;
        self.sp = self.sp.wrapping_add(1);
        Ok(((high as u16) << 8) | low as u16)
    }

    /// HL, IX or IY depending on the active prefix.
    pub(crate) fn get_index(&self) -> u16 {
        match self.index_mode {
            IndexMode::HL => self.get_hl(),
            IndexMode::IX => self.ix,
            IndexMode::IY => self.iy,
        }
    }

    pub(crate) fn set_index(&mut self, val: u16) {
        match self.index_mode {
            IndexMode::HL => self.set_hl(val),
            IndexMode::IX => self.ix = val,
            IndexMode::IY => self.iy = val,
        }
    }

    /// Effective address for the (HL) operand slot: HL itself, or
    /// IX/IY plus the signed displacement fetched at PC.
    pub(crate) fn operand_addr<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u16> {
        if self.index_mode == IndexMode::HL {
            Ok(self.get_hl())
        } else {
            let d = self.fetch_byte(bus)? as i8;
            Ok(self.get_index().wrapping_add(d as i16 as u16))
        }
    }

    /// 8-bit register by decode field (0=B 1=C 2=D 3=E 4=H 5=L 7=A).
    /// Field 6 is the (HL) slot and is handled by the caller.
    pub(crate) fn get_reg8(&self, r: u8) -> u8 {
        match r {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            7 => self.a,
            _ => unreachable!("register field {r} is a memory operand"),
        }
    }

    pub(crate) fn set_reg8(&mut self, r: u8, val: u8) {
        match r {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            7 => self.a = val,
            _ => unreachable!("register field {r} is a memory operand"),
        }
    }

    /// Like `get_reg8` but with H/L remapped to the index-register
    /// halves under a DD/FD prefix (IXH/IXL/IYH/IYL access).
    pub(crate) fn get_reg8_ix(&self, r: u8) -> u8 {
        match (r, self.index_mode) {
            (4, IndexMode::IX) => (self.ix >> 8) as u8,
            (5, IndexMode::IX) => self.ix as u8,
            (4, IndexMode::IY) => (self.iy >> 8) as u8,
            (5, IndexMode::IY) => self.iy as u8,
            _ => self.get_reg8(r),
        }
    }

    pub(crate) fn set_reg8_ix(&mut self, r: u8, val: u8) {
        match (r, self.index_mode) {
            (4, IndexMode::IX) => self.ix = (self.ix & 0x00FF) | ((val as u16) << 8),
            (5, IndexMode::IX) => self.ix = (self.ix & 0xFF00) | val as u16,
            (4, IndexMode::IY) => self.iy = (self.iy & 0x00FF) | ((val as u16) << 8),
            (5, IndexMode::IY) => self.iy = (self.iy & 0xFF00) | val as u16,
            _ => self.set_reg8(r, val),
        }
    }

    /// Register pair by decode field (0=BC 1=DE 2=HL/IX/IY 3=SP).
    pub(crate) fn get_rp(&self, rp: u8) -> u16 {
        match rp {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.get_index(),
            _ => self.sp,
        }
    }

    pub(crate) fn set_rp(&mut self, rp: u8, val: u16) {
        match rp {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_index(val),
            _ => self.sp = val,
        }
    }

    /// Pair field for PUSH/POP (0=BC 1=DE 2=HL/IX/IY 3=AF).
    pub(crate) fn get_rp_af(&self, rp: u8) -> u16 {
        match rp {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.get_index(),
            _ => self.get_af(),
        }
    }

    pub(crate) fn set_rp_af(&mut self, rp: u8, val: u16) {
        match rp {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_index(val),
            _ => self.set_af(val),
        }
    }

    // --- Decode/execute ---

    /// Fetch and execute exactly one instruction, resolving DD/FD/CB/ED
    /// prefixes. Returns the documented T-state count.
    fn exec_one<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        self.index_mode = IndexMode::HL;
        let mut prefix_t: u32 = 0;
        loop {
            let opcode = self.fetch_opcode(bus)?;
            match opcode {
                // Each prefix byte is its own 4T M1 cycle; with chained
                // DD/FD prefixes the last one wins.
                0xDD => {
                    self.index_mode = IndexMode::IX;
                    prefix_t += 4;
                }
                0xFD => {
                    self.index_mode = IndexMode::IY;
                    prefix_t += 4;
                }
                0xCB => return Ok(prefix_t + self.exec_cb(bus)?),
                0xED => {
                    // ED drops any pending index prefix.
                    self.index_mode = IndexMode::HL;
                    return Ok(prefix_t + self.exec_ed(bus)?);
                }
                _ => return Ok(prefix_t + self.exec_base(opcode, bus)?),
            }
        }
    }

    /// Base page. Every opcode is assigned; grouped entries decode
    /// their register/condition fields from the opcode bits.
    pub(crate) fn exec_base<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Result<u32> {
        match opcode {
            0x00 => Ok(4), // NOP

            // Relative jumps and loops
            0x10 => self.op_djnz(bus),
            0x18 => self.op_jr(bus),
            0x20 | 0x28 | 0x30 | 0x38 => self.op_jr_cc(opcode, bus),

            // Exchanges
            0x08 => self.op_ex_af_af(),
            0xD9 => self.op_exx(),
            0xEB => self.op_ex_de_hl(),
            0xE3 => self.op_ex_sp_hl(bus),

            // 16-bit loads and arithmetic
            0x01 | 0x11 | 0x21 | 0x31 => self.op_ld_rr_nn(opcode, bus),
            0x09 | 0x19 | 0x29 | 0x39 => self.op_add_hl_rr(opcode),
            0x03 | 0x13 | 0x23 | 0x33 | 0x0B | 0x1B | 0x2B | 0x3B => self.op_inc_dec_rr(opcode),
            0x22 => self.op_ld_nn_hl(bus),
            0x2A => self.op_ld_hl_nn_ind(bus),
            0xF9 => self.op_ld_sp_hl(),

            // Accumulator loads through pointers
            0x02 => self.op_ld_bc_a(bus),
            0x12 => self.op_ld_de_a(bus),
            0x0A => self.op_ld_a_bc(bus),
            0x1A => self.op_ld_a_de(bus),
            0x32 => self.op_ld_nn_a(bus),
            0x3A => self.op_ld_a_nn(bus),

            // Accumulator rotates and flag ops
            0x07 => self.op_rlca(),
            0x0F => self.op_rrca(),
            0x17 => self.op_rla(),
            0x1F => self.op_rra(),
            0x27 => self.op_daa(),
            0x2F => self.op_cpl(),
            0x37 => self.op_scf(),
            0x3F => self.op_ccf(),

            0x76 => {
                // HALT: burn 4T per step until an interrupt.
                self.halted = true;
                trace!("HALT at PC={:04X}", self.pc.wrapping_sub(1));
                Ok(4)
            }

            // Jumps, calls, returns
            0xC3 => self.op_jp_nn(bus),
            0xC9 => self.op_ret(bus),
            0xCD => self.op_call_nn(bus),
            0xE9 => self.op_jp_hl(),

            // I/O
            0xD3 => self.op_out_n_a(bus),
            0xDB => self.op_in_a_n(bus),

            // Interrupt control
            0xF3 => self.op_di(),
            0xFB => self.op_ei(),

            // Grouped families (register/condition fields in the opcode)
            op if op & 0xC7 == 0x04 || op & 0xC7 == 0x05 => self.op_inc_dec_r(op, bus),
            op if op & 0xC7 == 0x06 => self.op_ld_r_n(op, bus),
            op if op & 0xC0 == 0x40 => self.op_ld_r_r(op, bus),
            op if op & 0xC0 == 0x80 => self.op_alu_r(op, bus),
            op if op & 0xC7 == 0xC0 => self.op_ret_cc(op, bus),
            op if op & 0xCF == 0xC1 => self.op_pop(op, bus),
            op if op & 0xC7 == 0xC2 => self.op_jp_cc_nn(op, bus),
            op if op & 0xC7 == 0xC4 => self.op_call_cc_nn(op, bus),
            op if op & 0xCF == 0xC5 => self.op_push(op, bus),
            op if op & 0xC7 == 0xC6 => self.op_alu_n(op, bus),
            op if op & 0xC7 == 0xC7 => self.op_rst(op, bus),

            // Only the prefix bytes remain, and exec_one consumes those
            // before dispatching here. An IM-0 injection of a prefix
            // byte degenerates to NOP.
            _ => Ok(4),
        }
    }

    /// ED page: documented opcodes only, everything else is a decode
    /// miss handled by the policy.
    fn exec_ed<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32> {
        let opcode = self.fetch_opcode(bus)?;
        match opcode {
            0x44 => self.op_neg(),
            0x45 | 0x4D => self.op_retn_reti(bus),
            0x46 | 0x56 | 0x5E => self.op_im(opcode),
            0x47 => self.op_ld_i_a(),
            0x4F => self.op_ld_r_a(),
            0x57 => self.op_ld_a_i(),
            0x5F => self.op_ld_a_r(),
            0x67 => self.op_rrd(bus),
            0x6F => self.op_rld(bus),

            op if op & 0xC7 == 0x40 => self.op_in_r_c(op, bus),
            op if op & 0xC7 == 0x41 => self.op_out_c_r(op, bus),
            op if op & 0xCF == 0x42 => self.op_sbc_hl_rr(op),
            op if op & 0xCF == 0x4A => self.op_adc_hl_rr(op),
            op if op & 0xCF == 0x43 => self.op_ld_nn_rr(op, bus),
            op if op & 0xCF == 0x4B => self.op_ld_rr_nn_ind(op, bus),

            0xA0 | 0xA8 => self.op_ldi_ldd(opcode, bus),
            0xB0 | 0xB8 => self.op_ldir_lddr(opcode, bus),
            0xA1 | 0xA9 => self.op_cpi_cpd(opcode, bus),
            0xB1 | 0xB9 => self.op_cpir_cpdr(opcode, bus),
            0xA2 | 0xAA => self.op_ini_ind(opcode, bus),
            0xB2 | 0xBA => self.op_inir_indr(opcode, bus),
            0xA3 | 0xAB => self.op_outi_outd(opcode, bus),
            0xB3 | 0xBB => self.op_otir_otdr(opcode, bus),

            // ED M1 + sub-opcode M1 = two NOPs worth when swallowed.
            _ => self.decode_miss(self.pc.wrapping_sub(1), opcode, Some(0xED), 8),
        }
    }

    /// Apply the invalid-opcode policy to a decode miss.
    fn decode_miss(
        &mut self,
        addr: u16,
        opcode: u8,
        prefix: Option<u8>,
        nop_cost: u32,
    ) -> Result<u32> {
        match self.policy {
            InvalidOpcodePolicy::RaiseError => Err(Fault::IllegalOpcode {
                addr,
                opcode,
                prefix,
            }),
            InvalidOpcodePolicy::NopSilently => {
                error!(
                    "illegal opcode {:02X}h at PC={:04X} (prefix {:02X?}), treated as NOP",
                    opcode, addr, prefix
                );
                Ok(nop_cost)
            }
        }
    }
}
