use z80_core::core::Fault;
use z80_core::cpu::z80::{InvalidOpcodePolicy, Z80};
mod common;
use common::TestBus;

fn step(cpu: &mut Z80, bus: &mut TestBus) -> u32 {
    cpu.step(bus).expect("instruction faulted")
}

#[test]
fn test_nop() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x00]); // NOP

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 4, "NOP should be 4 T-states");
    assert_eq!(cpu.pc, 1);
}

#[test]
fn test_reset_then_three_nops() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x00, 0x00, 0x00]);

    cpu.reset();
    let f_before = cpu.f;
    let total = cpu.run(&mut bus, 12).unwrap();
    assert_eq!(total, 12);
    assert_eq!(cpu.pc, 0x0003);
    assert_eq!(cpu.cycles, 12);
    assert_eq!(cpu.f, f_before, "NOP must not touch flags");
}

#[test]
fn test_ld_a_n() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x3E, 0x42]); // LD A, 0x42

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 7, "LD A,n should be 7 T-states");
    assert_eq!(cpu.a, 0x42);
    assert_eq!(cpu.pc, 2);
}

#[test]
fn test_ld_a_n_then_halt() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x3E, 0x42, 0x76]); // LD A,0x42; HALT

    step(&mut cpu, &mut bus);
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x42);
    assert_eq!(cpu.pc, 0x0003);
    assert!(cpu.halted);

    // Halted CPU burns 4 T-states per step without moving
    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.pc, 0x0003);
    assert!(cpu.halted);
}

#[test]
fn test_ld_r_r() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    // LD B, 0x55 then LD C, B
    bus.load(0, &[0x06, 0x55, 0x48]);

    let cycles = step(&mut cpu, &mut bus); // LD B, 0x55
    assert_eq!(cycles, 7);
    assert_eq!(cpu.b, 0x55);

    let cycles = step(&mut cpu, &mut bus); // LD C, B
    assert_eq!(cycles, 4, "LD r,r' should be 4 T-states");
    assert_eq!(cpu.c, 0x55);
}

#[test]
fn test_ld_c_a_copies_from_a() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0x77;
    cpu.b = 0x11;
    bus.load(0, &[0x4F]); // LD C, A

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.c, 0x77, "LD C,A copies A, not B");
}

#[test]
fn test_ld_d_hl_assigns_to_d() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x1000);
    cpu.c = 0x11;
    bus.memory[0x1000] = 0xAB;
    bus.load(0, &[0x56]); // LD D, (HL)

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.d, 0xAB, "LD D,(HL) assigns D, not C");
    assert_eq!(cpu.c, 0x11);
}

#[test]
fn test_ld_r_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x21, 0x00, 0x10, 0x7E]); // LD HL,0x1000; LD A,(HL)
    bus.memory[0x1000] = 0xAB;

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 10, "LD rr,nn should be 10 T-states");
    assert_eq!(cpu.get_hl(), 0x1000);

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 7, "LD A,(HL) should be 7 T-states");
    assert_eq!(cpu.a, 0xAB);
}

#[test]
fn test_ld_hl_r() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x2000);
    cpu.a = 0xCD;
    bus.load(0, &[0x77]); // LD (HL), A

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 7, "LD (HL),r should be 7 T-states");
    assert_eq!(bus.memory[0x2000], 0xCD);
}

#[test]
fn test_add_carry_flags() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0xFF;
    bus.load(0, &[0xC6, 0x01]); // ADD A, 0x01

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.a, 0x00);
    assert_eq!(cpu.f, 0x51, "expected Z, H and C only");
}

#[test]
fn test_inc_hl_timing() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x3000);
    bus.memory[0x3000] = 0x7F;
    bus.load(0, &[0x34]); // INC (HL)

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 11, "INC (HL) should be 11 T-states");
    assert_eq!(bus.memory[0x3000], 0x80);
}

#[test]
fn test_dd_prefix_fallthrough_timing() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    // DD 3E 42: LD A,n has no HL operand, so the prefix only costs 4T
    bus.load(0, &[0xDD, 0x3E, 0x42]);

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 11, "DD prefix + LD A,n should be 11 T-states");
    assert_eq!(cpu.a, 0x42);
    assert_eq!(cpu.pc, 3);
}

#[test]
fn test_invalid_ed_opcode_raises_by_default() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xED, 0x00]);

    assert_eq!(cpu.policy, InvalidOpcodePolicy::RaiseError);
    let err = cpu.step(&mut bus).unwrap_err();
    assert_eq!(
        err,
        Fault::IllegalOpcode {
            addr: 0x0001,
            opcode: 0x00,
            prefix: Some(0xED),
        }
    );
}

#[test]
fn test_invalid_ed_opcode_nop_policy() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.policy = InvalidOpcodePolicy::NopSilently;
    bus.load(0, &[0xED, 0x00, 0x3E, 0x42]);

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 8, "swallowed ED miss costs two NOPs");
    assert_eq!(cpu.pc, 2);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x42, "execution continues after the miss");
}

#[test]
fn test_run_overshoot_contract() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x00; 16]);

    // 10 T requested, NOPs are 4 T each: the last one completes
    let total = cpu.run(&mut bus, 10).unwrap();
    assert_eq!(total, 12);
    assert!(total >= 10);
}
