//! The 256-entry 6502 opcode dispatch table.
//!
//! Every opcode, official and unofficial, resolves its operand through
//! [`crate::cpu::Cpu::resolve_address`] before landing here, so this module
//! only deals in already-formed effective addresses. Cycle counts are taken
//! from a fixed per-opcode table (the addressing mode alone doesn't
//! determine timing: `STA $nn,X` and `LDA $nn,X` share a mode but not a
//! cycle count) with a uniform +1 added for reads that cross a page
//! boundary.

use crate::cpu::{Bus, Cpu, addr_mode};
use crate::status::Status;
use crate::vectors;

/// Base cycle cost per opcode, before the page-cross/branch-taken penalty.
#[rustfmt::skip]
static CYCLE_TABLE: [u8; 256] = [
    7, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6,
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6,
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
    6, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6,
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6,
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4,
    2, 6, 2, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5,
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4,
    2, 5, 2, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4,
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6,
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6,
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7,
];

use crate::addressing::AddrMode;

/// Execute the instruction at `opcode` and return the number of cycles it
/// consumed, including any page-cross or branch-taken penalty.
pub(crate) fn execute(cpu: &mut Cpu, bus: &mut impl Bus, opcode: u8) -> u8 {
    let mode = addr_mode(opcode);
    let (addr, crossed) = cpu.resolve_address(bus, mode);
    let mut cycles = CYCLE_TABLE[opcode as usize];

    match opcode {
        // BRK
        0x00 => {
            cpu.fetch_byte(bus); // signature/padding byte, discarded
            let pc = cpu.pc();
            cpu.push(bus, (pc >> 8) as u8);
            cpu.push(bus, (pc & 0xFF) as u8);
            let status_byte = cpu.status().to_stack_byte(true);
            cpu.push(bus, status_byte);
            cpu.status_mut().insert(Status::I);
            let lo = bus.read(vectors::IRQ);
            let hi = bus.read(vectors::IRQ.wrapping_add(1));
            cpu.set_pc(u16::from_le_bytes([lo, hi]));
        }

        // JAM / KIL / HLT
        0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => {
            cpu.jam();
        }

        // ORA
        0x09 | 0x05 | 0x15 | 0x0D | 0x1D | 0x19 | 0x01 | 0x11 => {
            let value = bus.read(addr);
            let result = cpu.a() | value;
            cpu.set_a(result);
            cpu.status_mut().set_zn(result);
        }

        // AND
        0x29 | 0x25 | 0x35 | 0x2D | 0x3D | 0x39 | 0x21 | 0x31 => {
            let value = bus.read(addr);
            let result = cpu.a() & value;
            cpu.set_a(result);
            cpu.status_mut().set_zn(result);
        }

        // EOR
        0x49 | 0x45 | 0x55 | 0x4D | 0x5D | 0x59 | 0x41 | 0x51 => {
            let value = bus.read(addr);
            let result = cpu.a() ^ value;
            cpu.set_a(result);
            cpu.status_mut().set_zn(result);
        }

        // ADC
        0x69 | 0x65 | 0x75 | 0x6D | 0x7D | 0x79 | 0x61 | 0x71 => {
            let value = bus.read(addr);
            adc(cpu, value);
        }

        // SBC (including the unofficial duplicate at 0xEB)
        0xE9 | 0xEB | 0xE5 | 0xF5 | 0xED | 0xFD | 0xF9 | 0xE1 | 0xF1 => {
            let value = bus.read(addr);
            sbc(cpu, value);
        }

        // CMP
        0xC9 | 0xC5 | 0xD5 | 0xCD | 0xDD | 0xD9 | 0xC1 | 0xD1 => {
            let value = bus.read(addr);
            let reg = cpu.a();
            compare(cpu, reg, value);
        }

        // CPX
        0xE0 | 0xE4 | 0xEC => {
            let value = bus.read(addr);
            let reg = cpu.x();
            compare(cpu, reg, value);
        }

        // CPY
        0xC0 | 0xC4 | 0xCC => {
            let value = bus.read(addr);
            let reg = cpu.y();
            compare(cpu, reg, value);
        }

        // BIT
        0x24 | 0x2C => {
            let value = bus.read(addr);
            let result = cpu.a() & value;
            cpu.status_mut().set_flag(Status::Z, result == 0);
            cpu.status_mut().set_flag(Status::N, value & 0x80 != 0);
            cpu.status_mut().set_flag(Status::V, value & 0x40 != 0);
        }

        // LDA
        0xA9 | 0xA5 | 0xB5 | 0xAD | 0xBD | 0xB9 | 0xA1 | 0xB1 => {
            let value = bus.read(addr);
            cpu.set_a(value);
            cpu.status_mut().set_zn(value);
        }

        // LDX
        0xA2 | 0xA6 | 0xB6 | 0xAE | 0xBE => {
            let value = bus.read(addr);
            cpu.set_x(value);
            cpu.status_mut().set_zn(value);
        }

        // LDY
        0xA0 | 0xA4 | 0xB4 | 0xAC | 0xBC => {
            let value = bus.read(addr);
            cpu.set_y(value);
            cpu.status_mut().set_zn(value);
        }

        // STA
        0x85 | 0x95 | 0x8D | 0x9D | 0x99 | 0x81 | 0x91 => {
            bus.write(addr, cpu.a());
        }

        // STX
        0x86 | 0x96 | 0x8E => {
            bus.write(addr, cpu.x());
        }

        // STY
        0x84 | 0x94 | 0x8C => {
            bus.write(addr, cpu.y());
        }

        // ASL
        0x0A => {
            let a = cpu.a();
            let result = asl_value(cpu, a);
            cpu.set_a(result);
        }
        0x06 | 0x16 | 0x0E | 0x1E => {
            let value = bus.read(addr);
            let result = asl_value(cpu, value);
            bus.write(addr, result);
        }

        // LSR
        0x4A => {
            let a = cpu.a();
            let result = lsr_value(cpu, a);
            cpu.set_a(result);
        }
        0x46 | 0x56 | 0x4E | 0x5E => {
            let value = bus.read(addr);
            let result = lsr_value(cpu, value);
            bus.write(addr, result);
        }

        // ROL
        0x2A => {
            let a = cpu.a();
            let result = rol_value(cpu, a);
            cpu.set_a(result);
        }
        0x26 | 0x36 | 0x2E | 0x3E => {
            let value = bus.read(addr);
            let result = rol_value(cpu, value);
            bus.write(addr, result);
        }

        // ROR
        0x6A => {
            let a = cpu.a();
            let result = ror_value(cpu, a);
            cpu.set_a(result);
        }
        0x66 | 0x76 | 0x6E | 0x7E => {
            let value = bus.read(addr);
            let result = ror_value(cpu, value);
            bus.write(addr, result);
        }

        // INC
        0xE6 | 0xF6 | 0xEE | 0xFE => {
            let value = bus.read(addr).wrapping_add(1);
            bus.write(addr, value);
            cpu.status_mut().set_zn(value);
        }

        // DEC
        0xC6 | 0xD6 | 0xCE | 0xDE => {
            let value = bus.read(addr).wrapping_sub(1);
            bus.write(addr, value);
            cpu.status_mut().set_zn(value);
        }

        // INX / INY / DEX / DEY
        0xE8 => {
            let v = cpu.x().wrapping_add(1);
            cpu.set_x(v);
            cpu.status_mut().set_zn(v);
        }
        0xC8 => {
            let v = cpu.y().wrapping_add(1);
            cpu.set_y(v);
            cpu.status_mut().set_zn(v);
        }
        0xCA => {
            let v = cpu.x().wrapping_sub(1);
            cpu.set_x(v);
            cpu.status_mut().set_zn(v);
        }
        0x88 => {
            let v = cpu.y().wrapping_sub(1);
            cpu.set_y(v);
            cpu.status_mut().set_zn(v);
        }

        // Transfers
        0xAA => {
            let v = cpu.a();
            cpu.set_x(v);
            cpu.status_mut().set_zn(v);
        }
        0x8A => {
            let v = cpu.x();
            cpu.set_a(v);
            cpu.status_mut().set_zn(v);
        }
        0xA8 => {
            let v = cpu.a();
            cpu.set_y(v);
            cpu.status_mut().set_zn(v);
        }
        0x98 => {
            let v = cpu.y();
            cpu.set_a(v);
            cpu.status_mut().set_zn(v);
        }
        0xBA => {
            let v = cpu.sp();
            cpu.set_x(v);
            cpu.status_mut().set_zn(v);
        }
        0x9A => {
            let x = cpu.x();
            cpu.set_sp(x);
        }

        // Flag instructions
        0x18 => cpu.status_mut().set_flag(Status::C, false),
        0x38 => cpu.status_mut().set_flag(Status::C, true),
        0x58 => cpu.status_mut().set_flag(Status::I, false),
        0x78 => cpu.status_mut().set_flag(Status::I, true),
        0xB8 => cpu.status_mut().set_flag(Status::V, false),
        0xD8 => cpu.status_mut().set_flag(Status::D, false),
        0xF8 => cpu.status_mut().set_flag(Status::D, true),

        // Stack
        0x48 => {
            let a = cpu.a();
            cpu.push(bus, a);
        }
        0x68 => {
            let v = cpu.pop(bus);
            cpu.set_a(v);
            cpu.status_mut().set_zn(v);
        }
        0x08 => {
            let byte = cpu.status().to_stack_byte(true);
            cpu.push(bus, byte);
        }
        0x28 => {
            let byte = cpu.pop(bus);
            cpu.set_status(Status::from_stack_byte(byte));
        }

        // Jumps / calls
        0x4C | 0x6C => cpu.set_pc(addr),
        0x20 => {
            let return_addr = cpu.pc().wrapping_sub(1);
            cpu.push(bus, (return_addr >> 8) as u8);
            cpu.push(bus, (return_addr & 0xFF) as u8);
            cpu.set_pc(addr);
        }
        0x60 => {
            let lo = cpu.pop(bus);
            let hi = cpu.pop(bus);
            let return_addr = u16::from_le_bytes([lo, hi]);
            cpu.set_pc(return_addr.wrapping_add(1));
        }
        0x40 => {
            let status_byte = cpu.pop(bus);
            cpu.set_status(Status::from_stack_byte(status_byte));
            let lo = cpu.pop(bus);
            let hi = cpu.pop(bus);
            cpu.set_pc(u16::from_le_bytes([lo, hi]));
        }

        // Branches
        0x10 => {
            let taken = !cpu.status().contains(Status::N);
            branch(cpu, &mut cycles, addr, crossed, taken);
        }
        0x30 => {
            let taken = cpu.status().contains(Status::N);
            branch(cpu, &mut cycles, addr, crossed, taken);
        }
        0x50 => {
            let taken = !cpu.status().contains(Status::V);
            branch(cpu, &mut cycles, addr, crossed, taken);
        }
        0x70 => {
            let taken = cpu.status().contains(Status::V);
            branch(cpu, &mut cycles, addr, crossed, taken);
        }
        0x90 => {
            let taken = !cpu.status().contains(Status::C);
            branch(cpu, &mut cycles, addr, crossed, taken);
        }
        0xB0 => {
            let taken = cpu.status().contains(Status::C);
            branch(cpu, &mut cycles, addr, crossed, taken);
        }
        0xD0 => {
            let taken = !cpu.status().contains(Status::Z);
            branch(cpu, &mut cycles, addr, crossed, taken);
        }
        0xF0 => {
            let taken = cpu.status().contains(Status::Z);
            branch(cpu, &mut cycles, addr, crossed, taken);
        }

        // NOP (official and unofficial, with or without an operand to discard)
        0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA | 0x80 | 0x82 | 0x89 | 0xC2 | 0xE2
        | 0x04 | 0x44 | 0x64 | 0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 | 0x0C | 0x1C | 0x3C
        | 0x5C | 0x7C | 0xDC | 0xFC => {}

        // SLO: ASL memory, ORA with A
        0x07 | 0x17 | 0x0F | 0x1F | 0x1B | 0x03 | 0x13 => {
            let value = bus.read(addr);
            let shifted = asl_value(cpu, value);
            bus.write(addr, shifted);
            let result = cpu.a() | shifted;
            cpu.set_a(result);
            cpu.status_mut().set_zn(result);
        }

        // RLA: ROL memory, AND with A
        0x27 | 0x37 | 0x2F | 0x3F | 0x3B | 0x23 | 0x33 => {
            let value = bus.read(addr);
            let rotated = rol_value(cpu, value);
            bus.write(addr, rotated);
            let result = cpu.a() & rotated;
            cpu.set_a(result);
            cpu.status_mut().set_zn(result);
        }

        // SRE: LSR memory, EOR with A
        0x47 | 0x57 | 0x4F | 0x5F | 0x5B | 0x43 | 0x53 => {
            let value = bus.read(addr);
            let shifted = lsr_value(cpu, value);
            bus.write(addr, shifted);
            let result = cpu.a() ^ shifted;
            cpu.set_a(result);
            cpu.status_mut().set_zn(result);
        }

        // RRA: ROR memory, ADC with A
        0x67 | 0x77 | 0x6F | 0x7F | 0x7B | 0x63 | 0x73 => {
            let value = bus.read(addr);
            let rotated = ror_value(cpu, value);
            bus.write(addr, rotated);
            adc(cpu, rotated);
        }

        // LAX: load into A and X
        0xA7 | 0xB7 | 0xAF | 0xBF | 0xA3 | 0xB3 => {
            let value = bus.read(addr);
            lax(cpu, value);
        }

        // SAX: store A & X
        0x87 | 0x97 | 0x8F | 0x83 => sax(cpu, bus, addr),

        // DCP: DEC memory, CMP with A
        0xC7 | 0xD7 | 0xCF | 0xDF | 0xDB | 0xC3 | 0xD3 => {
            let value = bus.read(addr).wrapping_sub(1);
            bus.write(addr, value);
            let reg = cpu.a();
            compare(cpu, reg, value);
        }

        // ISC / ISB: INC memory, SBC with A
        0xE7 | 0xF7 | 0xEF | 0xFF | 0xFB | 0xE3 | 0xF3 => {
            let value = bus.read(addr).wrapping_add(1);
            bus.write(addr, value);
            sbc(cpu, value);
        }

        // ANC
        0x0B | 0x2B => {
            let value = bus.read(addr);
            anc(cpu, value);
        }

        // ALR / ASR
        0x4B => {
            let value = bus.read(addr);
            alr(cpu, value);
        }

        // ARR
        0x6B => {
            let value = bus.read(addr);
            arr(cpu, value);
        }

        // AXS / SBX
        0xCB => {
            let value = bus.read(addr);
            axs(cpu, value);
        }

        // LXA (unstable)
        0xAB => {
            let value = bus.read(addr);
            cpu.set_a(value);
            cpu.set_x(value);
            cpu.status_mut().set_zn(value);
        }

        // ANE / XAA (unstable)
        0x8B => {
            let value = bus.read(addr);
            let result = cpu.x() & value;
            cpu.set_a(result);
            cpu.status_mut().set_zn(result);
        }

        // LAS (unstable)
        0xBB => {
            let value = bus.read(addr);
            let result = value & cpu.sp();
            cpu.set_a(result);
            cpu.set_x(result);
            cpu.set_sp(result);
            cpu.status_mut().set_zn(result);
        }

        // TAS (unstable)
        0x9B => {
            let result = cpu.a() & cpu.x();
            cpu.set_sp(result);
            let hi = ((addr >> 8) as u8).wrapping_add(1);
            bus.write(addr, result & hi);
        }

        // SHA (unstable)
        0x93 | 0x9F => {
            let hi = ((addr >> 8) as u8).wrapping_add(1);
            bus.write(addr, cpu.a() & cpu.x() & hi);
        }

        // SHY (unstable)
        0x9C => {
            let hi = ((addr >> 8) as u8).wrapping_add(1);
            bus.write(addr, cpu.y() & hi);
        }

        // SHX (unstable)
        0x9E => {
            let hi = ((addr >> 8) as u8).wrapping_add(1);
            bus.write(addr, cpu.x() & hi);
        }

        // Every byte value is covered above; u8 has no remaining cases.
        _ => unreachable!("opcode {opcode:#04x} not covered by dispatch"),
    }

    if crossed && matches!(mode, AddrMode::Abx | AddrMode::Aby | AddrMode::Idy) {
        cycles += 1;
    }

    cycles
}

fn branch(cpu: &mut Cpu, cycles: &mut u8, target: u16, crossed: bool, taken: bool) {
    if taken {
        cpu.set_pc(target);
        *cycles += if crossed { 2 } else { 1 };
    }
}

fn adc(cpu: &mut Cpu, value: u8) {
    let a = cpu.a();
    let carry_in = u16::from(cpu.status().contains(Status::C));
    let sum = u16::from(a) + u16::from(value) + carry_in;
    let result = sum as u8;
    let overflow = (!(a ^ value) & (a ^ result) & 0x80) != 0;
    cpu.status_mut().set_flag(Status::C, sum > 0xFF);
    cpu.status_mut().set_flag(Status::V, overflow);
    cpu.set_a(result);
    cpu.status_mut().set_zn(result);
}

fn sbc(cpu: &mut Cpu, value: u8) {
    adc(cpu, !value);
}

fn compare(cpu: &mut Cpu, reg: u8, value: u8) {
    let result = reg.wrapping_sub(value);
    cpu.status_mut().set_flag(Status::C, reg >= value);
    cpu.status_mut().set_zn(result);
}

fn asl_value(cpu: &mut Cpu, value: u8) -> u8 {
    let carry = value & 0x80 != 0;
    let result = value << 1;
    cpu.status_mut().set_flag(Status::C, carry);
    cpu.status_mut().set_zn(result);
    result
}

fn lsr_value(cpu: &mut Cpu, value: u8) -> u8 {
    let carry = value & 0x01 != 0;
    let result = value >> 1;
    cpu.status_mut().set_flag(Status::C, carry);
    cpu.status_mut().set_zn(result);
    result
}

fn rol_value(cpu: &mut Cpu, value: u8) -> u8 {
    let carry_in = u8::from(cpu.status().contains(Status::C));
    let carry_out = value & 0x80 != 0;
    let result = (value << 1) | carry_in;
    cpu.status_mut().set_flag(Status::C, carry_out);
    cpu.status_mut().set_zn(result);
    result
}

fn ror_value(cpu: &mut Cpu, value: u8) -> u8 {
    let carry_in = u8::from(cpu.status().contains(Status::C));
    let carry_out = value & 0x01 != 0;
    let result = (value >> 1) | (carry_in << 7);
    cpu.status_mut().set_flag(Status::C, carry_out);
    cpu.status_mut().set_zn(result);
    result
}

fn lax(cpu: &mut Cpu, value: u8) {
    cpu.set_a(value);
    cpu.set_x(value);
    cpu.status_mut().set_zn(value);
}

fn sax(cpu: &mut Cpu, bus: &mut impl Bus, addr: u16) {
    bus.write(addr, cpu.a() & cpu.x());
}

fn anc(cpu: &mut Cpu, value: u8) {
    let result = cpu.a() & value;
    cpu.set_a(result);
    cpu.status_mut().set_zn(result);
    cpu.status_mut().set_flag(Status::C, result & 0x80 != 0);
}

fn alr(cpu: &mut Cpu, value: u8) {
    let anded = cpu.a() & value;
    let result = lsr_value(cpu, anded);
    cpu.set_a(result);
}

fn arr(cpu: &mut Cpu, value: u8) {
    let anded = cpu.a() & value;
    let carry_in = u8::from(cpu.status().contains(Status::C));
    let result = (anded >> 1) | (carry_in << 7);
    cpu.set_a(result);
    cpu.status_mut().set_zn(result);
    let bit6 = (result >> 6) & 1;
    let bit5 = (result >> 5) & 1;
    cpu.status_mut().set_flag(Status::C, bit6 != 0);
    cpu.status_mut().set_flag(Status::V, (bit6 ^ bit5) != 0);
}

fn axs(cpu: &mut Cpu, value: u8) {
    let anded = cpu.a() & cpu.x();
    let result = anded.wrapping_sub(value);
    cpu.status_mut().set_flag(Status::C, anded >= value);
    cpu.set_x(result);
    cpu.status_mut().set_zn(result);
}
