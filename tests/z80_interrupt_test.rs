use z80_core::cpu::z80::Z80;
mod common;
use common::TestBus;

fn step(cpu: &mut Z80, bus: &mut TestBus) -> u32 {
    cpu.step(bus).expect("instruction faulted")
}

#[test]
fn test_im1_irq() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x1000;
    cpu.sp = 0x2000;
    cpu.iff1 = true;
    cpu.iff2 = true;
    cpu.im = 1;
    cpu.set_int_line(true);

    let cycles = step(&mut cpu, &mut bus);
    assert!(cycles >= 13);
    assert_eq!(cycles, 13);
    assert_eq!(cpu.pc, 0x0038);
    assert!(!cpu.iff1);
    assert!(!cpu.iff2);
    assert_eq!(bus.memory[0x1FFF], 0x10, "pushed PC high");
    assert_eq!(bus.memory[0x1FFE], 0x00, "pushed PC low");
    assert_eq!(cpu.sp, 0x1FFE);
}

#[test]
fn test_irq_needs_iff1() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x00, 0x00]);
    cpu.iff1 = false;
    cpu.im = 1;
    cpu.set_int_line(true);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 1, "INT ignored while IFF1 is clear");
}

#[test]
fn test_ei_shadows_one_instruction() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x2000;
    cpu.im = 1;
    cpu.set_int_line(true);
    bus.load(0, &[0xFB, 0x00, 0x00]); // EI; NOP; NOP

    step(&mut cpu, &mut bus); // EI
    assert!(cpu.iff1);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 2, "instruction after EI still runs");

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x0038, "IRQ accepted one instruction later");
}

#[test]
fn test_halt_with_masked_irq_stays_halted() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x76]); // HALT
    cpu.iff1 = false;
    cpu.set_int_line(true);

    step(&mut cpu, &mut bus);
    assert!(cpu.halted);
    let before = cpu.cycles;
    for _ in 0..3 {
        assert_eq!(step(&mut cpu, &mut bus), 4);
    }
    assert!(cpu.halted, "masked INT cannot wake the CPU");
    assert_eq!(cpu.pc, 1);
    assert_eq!(cpu.cycles, before + 12, "4 T-states accrue per step");
}

#[test]
fn test_halt_released_by_irq() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x76]); // HALT
    cpu.sp = 0x2000;
    cpu.iff1 = true;
    cpu.im = 1;

    step(&mut cpu, &mut bus);
    assert!(cpu.halted);

    cpu.set_int_line(true);
    step(&mut cpu, &mut bus);
    assert!(!cpu.halted);
    assert_eq!(cpu.pc, 0x0038);
}

#[test]
fn test_halt_nmi_retn_restores_iff1() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x76]); // HALT
    bus.load(0x0066, &[0xED, 0x45]); // RETN
    cpu.sp = 0x2000;
    cpu.iff1 = true;
    cpu.iff2 = true;

    step(&mut cpu, &mut bus); // HALT
    cpu.trigger_nmi();

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 11, "NMI acknowledge costs 11 T-states");
    assert!(!cpu.halted);
    assert_eq!(cpu.pc, 0x0066);
    assert!(!cpu.iff1, "NMI masks INT");
    assert!(cpu.iff2, "IFF2 keeps the pre-NMI IFF1");
    assert_eq!(bus.memory[0x1FFF], 0x00);
    assert_eq!(bus.memory[0x1FFE], 0x01, "PC past HALT was pushed");

    let cycles = step(&mut cpu, &mut bus); // RETN
    assert_eq!(cycles, 14, "RETN should be 14 T-states");
    assert_eq!(cpu.pc, 0x0001);
    assert!(cpu.iff1, "RETN restores IFF1 from IFF2");
}

#[test]
fn test_nmi_edge_latch() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x00, 0x00, 0x00]);
    cpu.sp = 0x2000;

    cpu.set_nmi_line(true);
    cpu.set_nmi_line(true); // still high, no second edge
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x0066, "latched edge serviced");

    cpu.pc = 0;
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 1, "level stays high but no new edge");

    cpu.set_nmi_line(false);
    cpu.set_nmi_line(true);
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x0066, "fresh low-to-high edge latches again");
}

#[test]
fn test_im0_defaults_to_rst38() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x1234;
    cpu.sp = 0x2000;
    cpu.iff1 = true;
    cpu.im = 0;
    cpu.set_int_line(true);

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 13);
    assert_eq!(cpu.pc, 0x0038, "floating bus reads 0xFF = RST 38h");
    assert_eq!(bus.memory[0x1FFF], 0x12);
    assert_eq!(bus.memory[0x1FFE], 0x34);
}

#[test]
fn test_im0_injected_opcode() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x1234;
    cpu.sp = 0x2000;
    cpu.iff1 = true;
    cpu.im = 0;
    cpu.set_int_data(Some(0xC7)); // RST 00h
    cpu.set_int_line(true);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x0000);
}

#[test]
fn test_im2_vector_fetch() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x1000;
    cpu.sp = 0x2000;
    cpu.i = 0x40;
    cpu.iff1 = true;
    cpu.im = 2;
    cpu.set_int_data(Some(0x23)); // low bit masked to 0x22
    bus.memory[0x4022] = 0x34;
    bus.memory[0x4023] = 0x12;
    cpu.set_int_line(true);

    let cycles = step(&mut cpu, &mut bus);
    assert_eq!(cycles, 19, "IM 2 acknowledge costs 19 T-states");
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(bus.memory[0x1FFF], 0x10, "old PC pushed first");
}

#[test]
fn test_im2_vector_defaults_to_zero() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x2000;
    cpu.i = 0x40;
    cpu.iff1 = true;
    cpu.im = 2;
    bus.memory[0x4000] = 0xCD;
    bus.memory[0x4001] = 0xAB;
    cpu.set_int_line(true);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0xABCD);
}

#[test]
fn test_reset_line_holds_cpu() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x3E, 0x42]);
    cpu.pc = 0x0500;
    cpu.i = 0x12;
    cpu.iff1 = true;

    cpu.set_reset_line(true);
    assert_eq!(cpu.pc, 0x0000, "rising edge performs the reset");
    assert_eq!(cpu.i, 0x00);
    assert!(!cpu.iff1);

    assert_eq!(cpu.step(&mut bus).unwrap(), 0, "held in RESET");
    assert_eq!(cpu.run(&mut bus, 100).unwrap(), 0);
    assert_eq!(cpu.pc, 0x0000);

    cpu.set_reset_line(false);
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x42, "execution resumes from 0x0000");
}

#[test]
fn test_reset_preserves_general_registers() {
    let mut cpu = Z80::new();
    cpu.a = 0x12;
    cpu.set_bc(0x3456);
    cpu.cycles = 999;
    cpu.halted = true;
    cpu.im = 2;
    cpu.iff1 = true;
    cpu.iff2 = true;

    cpu.reset();
    assert_eq!(cpu.pc, 0);
    assert_eq!(cpu.i, 0);
    assert_eq!(cpu.r, 0);
    assert_eq!(cpu.im, 0);
    assert!(!cpu.iff1);
    assert!(!cpu.iff2);
    assert!(!cpu.halted);
    assert_eq!(cpu.cycles, 0, "T-state counter restarts");
    assert_eq!(cpu.a, 0x12, "general registers survive reset");
    assert_eq!(cpu.get_bc(), 0x3456);

    // Idempotent
    cpu.reset();
    assert_eq!(cpu.pc, 0);
}

#[test]
fn test_nmi_beats_irq() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x2000;
    cpu.iff1 = true;
    cpu.im = 1;
    cpu.set_int_line(true);
    cpu.trigger_nmi();

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x0066, "NMI wins the priority check");
}
