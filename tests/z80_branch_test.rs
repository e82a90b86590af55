use z80_core::cpu::z80::{Flag, Z80};
mod common;
use common::TestBus;

fn step(cpu: &mut Z80, bus: &mut TestBus) -> u32 {
    cpu.step(bus).expect("instruction faulted")
}

#[test]
fn test_jp_nn() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xC3, 0x00, 0x80]); // JP 0x8000

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 10, "JP should be 10 T-states");
    assert_eq!(cpu.pc, 0x8000);
}

#[test]
fn test_jp_cc_same_cost_either_way() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.f = 0;
    bus.load(0, &[0xC2, 0x00, 0x80]); // JP NZ, 0x8000

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 10);
    assert_eq!(cpu.pc, 0x8000, "NZ satisfied, jump taken");

    let mut cpu = Z80::new();
    cpu.f = Flag::Z as u8;
    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 10, "untaken JP cc still costs 10 T-states");
    assert_eq!(cpu.pc, 0x0003);
}

#[test]
fn test_jr_forward_and_back() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x18, 0x03]); // JR +3
    bus.load(5, &[0x18, 0xF9]); // JR -7

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 12, "JR should be 12 T-states");
    assert_eq!(cpu.pc, 0x0005);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x0000, "displacement is relative to the next opcode");
}

#[test]
fn test_jr_cc_timing() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.f = Flag::Z as u8;
    bus.load(0, &[0x20, 0x10, 0x28, 0x10]); // JR NZ,+16; JR Z,+16

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 7, "untaken JR cc should be 7 T-states");
    assert_eq!(cpu.pc, 0x0002);

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 12, "taken JR cc should be 12 T-states");
    assert_eq!(cpu.pc, 0x0014);
}

#[test]
fn test_jr_carry_conditions() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.f = Flag::C as u8;
    bus.load(0, &[0x38, 0x02]); // JR C,+2

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 12);
    assert_eq!(cpu.pc, 0x0004);

    let mut cpu = Z80::new();
    cpu.f = Flag::C as u8;
    bus.load(0, &[0x30, 0x02]); // JR NC,+2
    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc, 0x0002);
}

#[test]
fn test_djnz() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.b = 0x02;
    bus.load(0, &[0x10, 0xFE]); // DJNZ -2 (tight loop on itself)

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 13, "taken DJNZ should be 13 T-states");
    assert_eq!(cpu.b, 1);
    assert_eq!(cpu.pc, 0x0000);

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 8, "fallthrough DJNZ should be 8 T-states");
    assert_eq!(cpu.b, 0);
    assert_eq!(cpu.pc, 0x0002);
}

#[test]
fn test_call_and_ret() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0xFFF0;
    bus.load(0, &[0xCD, 0x00, 0x10]); // CALL 0x1000
    bus.load(0x1000, &[0xC9]); // RET

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 17, "CALL should be 17 T-states");
    assert_eq!(cpu.pc, 0x1000);
    assert_eq!(cpu.sp, 0xFFEE);
    assert_eq!(bus.memory[0xFFEF], 0x00, "return address high byte");
    assert_eq!(bus.memory[0xFFEE], 0x03, "return address low byte");

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 10, "RET should be 10 T-states");
    assert_eq!(cpu.pc, 0x0003);
    assert_eq!(cpu.sp, 0xFFF0);
}

#[test]
fn test_call_cc_untaken() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0xFFF0;
    cpu.f = 0;
    bus.load(0, &[0xCC, 0x00, 0x10]); // CALL Z, 0x1000

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 10, "untaken CALL cc should be 10 T-states");
    assert_eq!(cpu.pc, 0x0003, "both address bytes were still read");
    assert_eq!(cpu.sp, 0xFFF0, "nothing pushed");
}

#[test]
fn test_ret_cc_timing() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0xFFEE;
    bus.memory[0xFFEE] = 0x34;
    bus.memory[0xFFEF] = 0x12;
    cpu.f = Flag::C as u8;
    bus.load(0, &[0xD0, 0xD8]); // RET NC; RET C

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 5, "untaken RET cc should be 5 T-states");
    assert_eq!(cpu.pc, 0x0001);

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 11, "taken RET cc should be 11 T-states");
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(cpu.sp, 0xFFF0);
}

#[test]
fn test_rst_vectors() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0xFFF0;
    bus.load(0x0200, &[0xDF]); // RST 18h
    cpu.pc = 0x0200;

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 11, "RST should be 11 T-states");
    assert_eq!(cpu.pc, 0x0018);
    assert_eq!(bus.memory[0xFFEF], 0x02, "pushed PC high");
    assert_eq!(bus.memory[0xFFEE], 0x01, "pushed PC low");
}

#[test]
fn test_jp_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x4000);
    bus.load(0, &[0xE9]); // JP (HL)

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 4, "JP (HL) should be 4 T-states");
    assert_eq!(cpu.pc, 0x4000);
}

#[test]
fn test_di_ei() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xFB, 0xF3]); // EI; DI

    step(&mut cpu, &mut bus);
    assert!(cpu.iff1);
    assert!(cpu.iff2);

    step(&mut cpu, &mut bus);
    assert!(!cpu.iff1);
    assert!(!cpu.iff2);
}

#[test]
fn test_im_select() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xED, 0x56, 0xED, 0x5E, 0xED, 0x46]); // IM 1; IM 2; IM 0

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 8, "IM should be 8 T-states");
    assert_eq!(cpu.im, 1);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.im, 2);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.im, 0);
}
