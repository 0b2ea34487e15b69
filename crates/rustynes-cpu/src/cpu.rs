//! Core 6502 execution engine.
//!
//! The [`Cpu`] advances in whole instructions: [`Cpu::step`] fetches one
//! opcode, resolves its operand address through [`crate::addressing`], and
//! dispatches into [`crate::instructions`] for the actual semantics. The
//! returned cycle count already includes addressing-mode penalties (page
//! crosses, branch taken) so callers can drive the PPU/APU in lock-step
//! without tracking sub-instruction state themselves.

use crate::addressing::{ADDR_MODE_TABLE, AddrMode};
use crate::instructions;
use crate::status::Status;
use crate::vectors;

/// Memory bus the CPU reads and writes through.
///
/// Implementors own RAM, PPU/APU register decoding, and cartridge mapper
/// dispatch; the CPU itself has no notion of what lives at a given address.
pub trait Bus {
    /// Read a byte, applying any side effects (PPU register reads, mapper
    /// bank latches, etc.) real hardware would trigger.
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte, applying any side effects real hardware would trigger.
    fn write(&mut self, addr: u16, value: u8);
}

/// The interrupt, if any, serviced on the most recent [`Cpu::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// No interrupt was serviced; a normal instruction executed.
    None,
    /// A maskable IRQ was serviced.
    Irq,
    /// A non-maskable interrupt was serviced.
    Nmi,
    /// The CPU was reset.
    Reset,
}

/// Coarse execution state, mostly useful for debuggers/disassemblers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    /// The CPU is fetching and executing instructions normally.
    Running,
    /// The CPU executed a JAM (KIL/HLT) opcode and is permanently halted
    /// until the next reset.
    Jammed,
}

/// Cycle-accurate MOS 6502 CPU core.
#[derive(Debug, Clone)]
pub struct Cpu {
    a: u8,
    x: u8,
    y: u8,
    pc: u16,
    sp: u8,
    status: Status,
    cycles: u64,
    nmi_pending: bool,
    irq_line: bool,
    jammed: bool,
    last_interrupt: Interrupt,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Create a new CPU in its power-on state.
    ///
    /// The program counter is not valid until [`Cpu::reset`] is called,
    /// matching real hardware where RESET must run before the first
    /// instruction fetch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0xFD,
            status: Status::POWER_ON,
            cycles: 0,
            nmi_pending: false,
            irq_line: false,
            jammed: false,
            last_interrupt: Interrupt::None,
        }
    }

    /// Perform a RESET sequence: load PC from the reset vector, set the
    /// interrupt-disable flag, and consume 7 cycles.
    ///
    /// Real hardware decrements S by 3 as it performs three suppressed
    /// stack "writes"; the resulting value is always 0xFD regardless of S's
    /// prior contents, so we set it directly rather than modeling the
    /// suppressed bus cycles.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.sp = 0xFD;
        self.status.insert(Status::I);
        self.status.insert(Status::U);
        let lo = bus.read(vectors::RESET);
        let hi = bus.read(vectors::RESET.wrapping_add(1));
        self.pc = u16::from_le_bytes([lo, hi]);
        self.cycles = self.cycles.wrapping_add(7);
        self.nmi_pending = false;
        self.irq_line = false;
        self.jammed = false;
        self.last_interrupt = Interrupt::Reset;
    }

    /// Execute one instruction (or service a pending interrupt) and return
    /// the number of CPU cycles consumed.
    ///
    /// NMI is edge-triggered and latched by [`Cpu::trigger_nmi`]; IRQ is
    /// level-sensitive and tracked by [`Cpu::set_irq`]. Both are only
    /// sampled at instruction boundaries, matching hardware's behavior of
    /// never interrupting mid-instruction.
    pub fn step(&mut self, bus: &mut impl Bus) -> u8 {
        if self.jammed {
            self.cycles = self.cycles.wrapping_add(1);
            return 1;
        }

        if self.nmi_pending {
            self.nmi_pending = false;
            self.last_interrupt = Interrupt::Nmi;
            return self.service_interrupt(bus, vectors::NMI, false);
        }

        if self.irq_line && !self.status.contains(Status::I) {
            self.last_interrupt = Interrupt::Irq;
            return self.service_interrupt(bus, vectors::IRQ, false);
        }

        self.last_interrupt = Interrupt::None;
        let opcode = self.fetch_opcode(bus);
        let cycles = instructions::execute(self, bus, opcode);
        self.cycles = self.cycles.wrapping_add(u64::from(cycles));
        cycles
    }

    /// Latch a non-maskable interrupt request. Taken on the next
    /// instruction boundary, then automatically cleared.
    pub fn trigger_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Set the level of the IRQ line. While asserted and the interrupt
    /// disable flag is clear, an IRQ is serviced before every instruction.
    pub fn set_irq(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    /// Halt the CPU as if a JAM/KIL opcode was just executed.
    pub(crate) fn jam(&mut self) {
        self.jammed = true;
    }

    /// True if the CPU is halted on a JAM opcode.
    #[must_use]
    pub fn is_jammed(&self) -> bool {
        self.jammed
    }

    /// Coarse execution state.
    #[must_use]
    pub fn state(&self) -> CpuState {
        if self.jammed {
            CpuState::Jammed
        } else {
            CpuState::Running
        }
    }

    /// The interrupt serviced on the most recent `step`, if any.
    #[must_use]
    pub fn last_interrupt(&self) -> Interrupt {
        self.last_interrupt
    }

    /// Accumulator.
    #[must_use]
    pub fn a(&self) -> u8 {
        self.a
    }

    /// X index register.
    #[must_use]
    pub fn x(&self) -> u8 {
        self.x
    }

    /// Y index register.
    #[must_use]
    pub fn y(&self) -> u8 {
        self.y
    }

    /// Program counter.
    #[must_use]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Stack pointer (offset from $0100).
    #[must_use]
    pub fn sp(&self) -> u8 {
        self.sp
    }

    /// Status register.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Total CPU cycles executed since construction (including resets).
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Directly set the program counter. Useful for test harnesses (e.g.
    /// nestest's automated-mode entry point) that bypass the reset vector.
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    fn service_interrupt(&mut self, bus: &mut impl Bus, vector: u16, brk: bool) -> u8 {
        let pc = self.pc;
        self.push(bus, (pc >> 8) as u8);
        self.push(bus, (pc & 0xFF) as u8);
        let status_byte = self.status.to_stack_byte(brk);
        self.push(bus, status_byte);
        self.status.insert(Status::I);
        let lo = bus.read(vector);
        let hi = bus.read(vector.wrapping_add(1));
        self.pc = u16::from_le_bytes([lo, hi]);
        self.cycles = self.cycles.wrapping_add(7);
        7
    }

    fn fetch_opcode(&mut self, bus: &mut impl Bus) -> u8 {
        let opcode = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        opcode
    }

    pub(crate) fn fetch_byte(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    pub(crate) fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.fetch_byte(bus);
        let hi = self.fetch_byte(bus);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(0x0100 + u16::from(self.sp), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pop(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 + u16::from(self.sp))
    }

    pub(crate) fn set_a(&mut self, value: u8) {
        self.a = value;
    }

    pub(crate) fn set_x(&mut self, value: u8) {
        self.x = value;
    }

    pub(crate) fn set_y(&mut self, value: u8) {
        self.y = value;
    }

    pub(crate) fn set_sp(&mut self, value: u8) {
        self.sp = value;
    }

    pub(crate) fn set_status(&mut self, value: Status) {
        self.status = value;
    }

    pub(crate) fn status_mut(&mut self) -> &mut Status {
        &mut self.status
    }

    /// Resolve the addressing mode for `opcode` and return the effective
    /// address (or the implied accumulator/none marker), whether a page
    /// boundary was crossed while forming it, and the base cycle count for
    /// the addressing mode itself.
    ///
    /// `Imp` and `Acc` have no memory operand; callers must check the mode
    /// before dereferencing the address.
    pub(crate) fn resolve_address(&mut self, bus: &mut impl Bus, mode: AddrMode) -> (u16, bool) {
        match mode {
            AddrMode::Imp | AddrMode::Acc => (0, false),
            AddrMode::Imm => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, false)
            }
            AddrMode::Zp0 => {
                let addr = u16::from(self.fetch_byte(bus));
                (addr, false)
            }
            AddrMode::Zpx => {
                let base = self.fetch_byte(bus);
                let addr = u16::from(base.wrapping_add(self.x));
                (addr, false)
            }
            AddrMode::Zpy => {
                let base = self.fetch_byte(bus);
                let addr = u16::from(base.wrapping_add(self.y));
                (addr, false)
            }
            AddrMode::Rel => {
                let offset = self.fetch_byte(bus) as i8;
                let addr = self.pc.wrapping_add(offset as u16);
                (addr, page_crossed(self.pc, addr))
            }
            AddrMode::Abs => {
                let addr = self.fetch_word(bus);
                (addr, false)
            }
            AddrMode::Abx | AddrMode::AbxW => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.x));
                (addr, page_crossed(base, addr))
            }
            AddrMode::Aby | AddrMode::AbyW => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.y));
                (addr, page_crossed(base, addr))
            }
            AddrMode::Ind => {
                let ptr = self.fetch_word(bus);
                let addr = self.read_indirect(bus, ptr);
                (addr, false)
            }
            AddrMode::Idx => {
                let base = self.fetch_byte(bus).wrapping_add(self.x);
                let lo = bus.read(u16::from(base));
                let hi = bus.read(u16::from(base.wrapping_add(1)));
                (u16::from_le_bytes([lo, hi]), false)
            }
            AddrMode::Idy | AddrMode::IdyW => {
                let base = self.fetch_byte(bus);
                let lo = bus.read(u16::from(base));
                let hi = bus.read(u16::from(base.wrapping_add(1)));
                let ptr = u16::from_le_bytes([lo, hi]);
                let addr = ptr.wrapping_add(u16::from(self.y));
                (addr, page_crossed(ptr, addr))
            }
        }
    }

    /// JMP ($xxxx) reproduces the famous page-wrap hardware bug: if the
    /// pointer's low byte is $FF, the high byte is fetched from the start
    /// of the same page instead of the next one.
    fn read_indirect(&self, bus: &mut impl Bus, ptr: u16) -> u16 {
        let lo = bus.read(ptr);
        let hi_addr = if ptr & 0x00FF == 0x00FF {
            ptr & 0xFF00
        } else {
            ptr.wrapping_add(1)
        };
        let hi = bus.read(hi_addr);
        u16::from_le_bytes([lo, hi])
    }
}

fn page_crossed(a: u16, b: u16) -> bool {
    (a & 0xFF00) != (b & 0xFF00)
}

/// Look up the addressing mode for an opcode.
pub(crate) fn addr_mode(opcode: u8) -> AddrMode {
    ADDR_MODE_TABLE[opcode as usize]
}
