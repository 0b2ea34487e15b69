//! Static disassembly support.
//!
//! This module only names opcodes and formats operands; it does not execute
//! anything. It exists for host debug UIs (memory viewers, breakpoint lists)
//! that want to show a human-readable instruction stream without stepping
//! the CPU.

use crate::addressing::AddrMode;
use crate::cpu::addr_mode;

/// Mnemonic for every one of the 256 opcodes, official and unofficial.
#[rustfmt::skip]
static MNEMONIC_TABLE: [&str; 256] = [
    "BRK", "ORA", "JAM", "SLO", "NOP", "ORA", "ASL", "SLO", "PHP", "ORA", "ASL", "ANC", "NOP", "ORA", "ASL", "SLO",
    "BPL", "ORA", "JAM", "SLO", "NOP", "ORA", "ASL", "SLO", "CLC", "ORA", "NOP", "SLO", "NOP", "ORA", "ASL", "SLO",
    "JSR", "AND", "JAM", "RLA", "BIT", "AND", "ROL", "RLA", "PLP", "AND", "ROL", "ANC", "BIT", "AND", "ROL", "RLA",
    "BMI", "AND", "JAM", "RLA", "NOP", "AND", "ROL", "RLA", "SEC", "AND", "NOP", "RLA", "NOP", "AND", "ROL", "RLA",
    "RTI", "EOR", "JAM", "SRE", "NOP", "EOR", "LSR", "SRE", "PHA", "EOR", "LSR", "ALR", "JMP", "EOR", "LSR", "SRE",
    "BVC", "EOR", "JAM", "SRE", "NOP", "EOR", "LSR", "SRE", "CLI", "EOR", "NOP", "SRE", "NOP", "EOR", "LSR", "SRE",
    "RTS", "ADC", "JAM", "RRA", "NOP", "ADC", "ROR", "RRA", "PLA", "ADC", "ROR", "ARR", "JMP", "ADC", "ROR", "RRA",
    "BVS", "ADC", "JAM", "RRA", "NOP", "ADC", "ROR", "RRA", "SEI", "ADC", "NOP", "RRA", "NOP", "ADC", "ROR", "RRA",
    "NOP", "STA", "NOP", "SAX", "STY", "STA", "STX", "SAX", "DEY", "NOP", "TXA", "ANE", "STY", "STA", "STX", "SAX",
    "BCC", "STA", "JAM", "SHA", "STY", "STA", "STX", "SAX", "TYA", "STA", "TXS", "TAS", "SHY", "STA", "SHX", "SHA",
    "LDY", "LDA", "LDX", "LAX", "LDY", "LDA", "LDX", "LAX", "TAY", "LDA", "TAX", "LXA", "LDY", "LDA", "LDX", "LAX",
    "BCS", "LDA", "JAM", "LAX", "LDY", "LDA", "LDX", "LAX", "CLV", "LDA", "TSX", "LAS", "LDY", "LDA", "LDX", "LAX",
    "CPY", "CMP", "NOP", "DCP", "CPY", "CMP", "DEC", "DCP", "INY", "CMP", "DEX", "AXS", "CPY", "CMP", "DEC", "DCP",
    "BNE", "CMP", "JAM", "DCP", "NOP", "CMP", "DEC", "DCP", "CLD", "CMP", "NOP", "DCP", "NOP", "CMP", "DEC", "DCP",
    "CPX", "SBC", "NOP", "ISC", "CPX", "SBC", "INC", "ISC", "INX", "SBC", "NOP", "SBC", "CPX", "SBC", "INC", "ISC",
    "BEQ", "SBC", "JAM", "ISC", "NOP", "SBC", "INC", "ISC", "SED", "SBC", "NOP", "ISC", "NOP", "SBC", "INC", "ISC",
];

/// Opcodes not in the official 6502 instruction set.
#[rustfmt::skip]
const UNOFFICIAL: [bool; 256] = {
    let mut table = [false; 256];
    let unofficial_opcodes: &[u8] = &[
        0x02, 0x03, 0x04, 0x07, 0x0B, 0x0C, 0x0F, 0x12, 0x13, 0x14, 0x17, 0x1A, 0x1B, 0x1C, 0x1F,
        0x22, 0x23, 0x27, 0x2F, 0x32, 0x33, 0x34, 0x37, 0x3A, 0x3B, 0x3C, 0x3F, 0x42, 0x43, 0x44,
        0x47, 0x4B, 0x4F, 0x52, 0x53, 0x54, 0x57, 0x5A, 0x5B, 0x5C, 0x5F, 0x62, 0x63, 0x64, 0x67,
        0x6B, 0x6F, 0x72, 0x73, 0x74, 0x77, 0x7A, 0x7B, 0x7C, 0x7F, 0x80, 0x82, 0x83, 0x87, 0x89,
        0x8B, 0x8F, 0x92, 0x93, 0x9B, 0x9C, 0x9E, 0x9F, 0xA3, 0xA7, 0xAB, 0xAF, 0xB2, 0xB3, 0xBB,
        0xBF, 0xC2, 0xC3, 0xC7, 0xCB, 0xCF, 0xD2, 0xD3, 0xD4, 0xD7, 0xDA, 0xDB, 0xDC, 0xDF, 0xE2,
        0xE3, 0xE7, 0xEB, 0xEF, 0xF2, 0xF3, 0xF4, 0xF7, 0xFA, 0xFB, 0xFC, 0xFF,
    ];
    let mut i = 0;
    while i < unofficial_opcodes.len() {
        table[unofficial_opcodes[i] as usize] = true;
        i += 1;
    }
    table
};

/// Mnemonic text for `opcode`.
#[must_use]
pub fn mnemonic(opcode: u8) -> &'static str {
    MNEMONIC_TABLE[opcode as usize]
}

/// Whether `opcode` is outside the documented 6502 instruction set.
#[must_use]
pub fn is_unofficial(opcode: u8) -> bool {
    UNOFFICIAL[opcode as usize]
}

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Address of the opcode byte.
    pub address: u16,
    /// Opcode and operand bytes (1-3 bytes).
    pub bytes: Vec<u8>,
    /// Rendered mnemonic and operand, e.g. `"LDA $2000,X"`.
    pub text: String,
}

/// Disassemble one instruction starting at `address`, reading bytes through `read`.
///
/// `read` must be side-effect-free (a peek, not a bus read) since the
/// disassembler may be called on arbitrary addresses for display purposes.
pub fn disassemble_one(address: u16, read: impl Fn(u16) -> u8) -> Instruction {
    let opcode = read(address);
    let mode = addr_mode(opcode);
    let len = mode.operand_size() + 1;
    let mut bytes = Vec::with_capacity(len as usize);
    bytes.push(opcode);
    for offset in 1..len {
        bytes.push(read(address.wrapping_add(u16::from(offset))));
    }

    let mnem = mnemonic(opcode);
    let operand = match mode {
        AddrMode::Imp | AddrMode::Acc => String::new(),
        AddrMode::Imm => format!("#${:02X}", bytes[1]),
        AddrMode::Zp0 => format!("${:02X}", bytes[1]),
        AddrMode::Zpx => format!("${:02X},X", bytes[1]),
        AddrMode::Zpy => format!("${:02X},Y", bytes[1]),
        AddrMode::Rel => {
            let offset = bytes[1] as i8;
            let target = address
                .wrapping_add(2)
                .wrapping_add(offset as u16);
            format!("${target:04X}")
        }
        AddrMode::Abs => format!("${:02X}{:02X}", bytes[2], bytes[1]),
        AddrMode::Abx | AddrMode::AbxW => format!("${:02X}{:02X},X", bytes[2], bytes[1]),
        AddrMode::Aby | AddrMode::AbyW => format!("${:02X}{:02X},Y", bytes[2], bytes[1]),
        AddrMode::Ind => format!("(${:02X}{:02X})", bytes[2], bytes[1]),
        AddrMode::Idx => format!("(${:02X},X)", bytes[1]),
        AddrMode::Idy | AddrMode::IdyW => format!("(${:02X}),Y", bytes[1]),
    };

    let text = if operand.is_empty() {
        String::from(mnem)
    } else {
        format!("{mnem} {operand}")
    };

    Instruction {
        address,
        bytes,
        text,
    }
}
