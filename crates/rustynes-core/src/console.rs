//! NES Console Implementation.
//!
//! The Console struct provides the high-level emulation API, managing the
//! CPU, PPU, and mapper integration with proper timing.

use crate::bus::{ControllerState, NesBus};
use rustynes_cpu::{Cpu, Status};
use rustynes_mappers::{Mapper, Rom, RomError, create_mapper};

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

/// NES emulation timing constants.
pub mod timing {
    /// Master clock frequency (NTSC).
    pub const MASTER_CLOCK_NTSC: u32 = 21_477_272;
    /// CPU clock frequency (NTSC).
    pub const CPU_CLOCK_NTSC: u32 = MASTER_CLOCK_NTSC / 12;
    /// PPU clock frequency (NTSC).
    pub const PPU_CLOCK_NTSC: u32 = MASTER_CLOCK_NTSC / 4;
    /// CPU cycles per frame (NTSC).
    pub const CPU_CYCLES_PER_FRAME: u32 = 29_780;
    /// PPU dots per scanline.
    pub const PPU_DOTS_PER_SCANLINE: u16 = 341;
    /// Total scanlines (including vblank).
    pub const PPU_SCANLINES: u16 = 262;
    /// Target frame rate (NTSC).
    pub const FRAME_RATE_NTSC: f64 = 60.0988;
}

/// Console error type.
#[derive(Debug, Clone)]
pub enum ConsoleError {
    /// ROM loading error.
    RomError(RomError),
    /// Invalid state.
    InvalidState(String),
}

impl From<RomError> for ConsoleError {
    fn from(err: RomError) -> Self {
        Self::RomError(err)
    }
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RomError(e) => write!(f, "ROM error: {e}"),
            Self::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConsoleError {}

/// NES console emulator.
pub struct Console {
    /// 6502 CPU.
    cpu: Cpu,
    /// System bus (PPU, mapper, RAM, controllers).
    bus: NesBus,
    /// Frame buffer (256x240 RGBA).
    framebuffer: Vec<u8>,
    /// Total CPU cycles executed.
    total_cycles: u64,
    /// Frame counter.
    frame_count: u64,
    /// Is emulation running?
    running: bool,
}

impl Console {
    /// Create a new console with the given ROM.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM cannot be loaded or uses an unsupported mapper.
    pub fn new(rom_data: &[u8]) -> Result<Self, ConsoleError> {
        let rom = Rom::load(rom_data)?;
        let mapper = create_mapper(&rom)?;
        Self::with_mapper(mapper)
    }

    /// Create a new console from ROM bytes (alias for `new`).
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM cannot be loaded or uses an unsupported mapper.
    pub fn from_rom_bytes(rom_data: &[u8]) -> Result<Self, ConsoleError> {
        Self::new(rom_data)
    }

    /// Create a console with a pre-created mapper.
    ///
    /// # Errors
    ///
    /// Returns an error if the console cannot be initialized.
    pub fn with_mapper(mapper: Box<dyn Mapper>) -> Result<Self, ConsoleError> {
        let bus = NesBus::new(mapper);
        let cpu = Cpu::new();

        Ok(Self {
            cpu,
            bus,
            framebuffer: vec![0; 256 * 240 * 4],
            total_cycles: 0,
            frame_count: 0,
            running: true,
        })
    }

    /// Reset the console to initial state.
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        self.bus.reset();
        self.total_cycles = 0;
        self.running = true;
    }

    /// Power on the console (cold boot).
    pub fn power_on(&mut self) {
        self.reset();
    }

    /// Run emulation for one CPU instruction.
    ///
    /// Returns the number of CPU cycles executed.
    pub fn step(&mut self) -> u8 {
        if !self.running {
            return 0;
        }

        // Handle OAM DMA
        if self.bus.oam_dma_pending() {
            let dma_cycles = self.bus.execute_oam_dma();
            self.step_components(dma_cycles);
            return dma_cycles as u8;
        }

        // Handle interrupts
        if self.bus.nmi_pending() {
            self.bus.acknowledge_nmi();
            self.cpu.trigger_nmi();
        } else if self.bus.irq_pending() && !self.cpu.status().contains(Status::I) {
            self.cpu.set_irq(true);
        }

        // Execute one CPU instruction
        let cycles = self.cpu.step(&mut self.bus);
        self.step_components(u16::from(cycles));
        self.bus.add_cpu_cycles(cycles);
        self.total_cycles += u64::from(cycles);

        cycles
    }

    /// Step the PPU for the given number of CPU cycles (3 dots each).
    fn step_components(&mut self, cpu_cycles: u16) {
        for _ in 0..cpu_cycles {
            self.bus.step_ppu();
        }
    }

    /// Run emulation until the PPU completes one full frame.
    ///
    /// Drives the master tick loop until the PPU raises `frame_complete`
    /// (at the end of scanline 260, dot 340, accounting for the odd-frame
    /// cycle skip), then clears the latch. Returns the number of CPU cycles
    /// executed, which varies by one CPU cycle between odd and even frames.
    pub fn step_frame(&mut self) -> u64 {
        let start_cycles = self.total_cycles;

        while self.running && !self.bus.take_frame_complete() {
            self.step();
        }

        // Copy PPU framebuffer
        self.update_framebuffer();
        self.frame_count += 1;

        self.total_cycles - start_cycles
    }

    /// Run emulation for one frame with cycle-accurate timing.
    ///
    /// This is an alias for `step_frame()` for API compatibility.
    /// Returns the actual number of CPU cycles executed.
    pub fn step_frame_accurate(&mut self) -> u64 {
        self.step_frame()
    }

    /// Update the framebuffer from PPU output.
    fn update_framebuffer(&mut self) {
        let ppu_buffer = self.bus.ppu.frame_buffer();

        // Convert PPU palette indices to RGBA
        for (i, &palette_idx) in ppu_buffer.iter().enumerate() {
            let rgb = crate::palette::NES_PALETTE[palette_idx as usize & 0x3F];
            let offset = i * 4;
            self.framebuffer[offset] = rgb.0; // R
            self.framebuffer[offset + 1] = rgb.1; // G
            self.framebuffer[offset + 2] = rgb.2; // B
            self.framebuffer[offset + 3] = 255; // A
        }
    }

    /// Get the current framebuffer (256x240 RGBA).
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Set controller 1 state from button byte.
    pub fn set_controller_1(&mut self, buttons: u8) {
        self.bus.controller1 = ControllerState { buttons };
    }

    /// Set controller 2 state from button byte.
    pub fn set_controller_2(&mut self, buttons: u8) {
        self.bus.controller2 = ControllerState { buttons };
    }

    /// Set controller 1 state.
    pub fn set_controller1(&mut self, state: ControllerState) {
        self.bus.controller1 = state;
    }

    /// Set controller 2 state.
    pub fn set_controller2(&mut self, state: ControllerState) {
        self.bus.controller2 = state;
    }

    /// Get controller 1 state.
    #[must_use]
    pub fn controller1(&self) -> ControllerState {
        self.bus.controller1
    }

    /// Get controller 2 state.
    #[must_use]
    pub fn controller2(&self) -> ControllerState {
        self.bus.controller2
    }

    /// Get the total CPU cycles executed.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Get the frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Check if emulation is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pause emulation.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume emulation.
    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Get a reference to the CPU for debugging.
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Get a reference to the PPU for debugging.
    #[must_use]
    pub fn ppu(&self) -> &rustynes_ppu::Ppu {
        &self.bus.ppu
    }

    /// Get the total CPU cycles (alias for `total_cycles`).
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Peek at memory without side effects.
    ///
    /// This is useful for debugging/display purposes where we don't want
    /// to trigger PPU register side effects or mapper state changes.
    #[must_use]
    pub fn peek_memory(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    /// Get a reference to the bus for debugging.
    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    /// Get a mutable reference to the bus.
    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }

    /// Get the mapper number.
    #[must_use]
    pub fn mapper_number(&self) -> u16 {
        self.bus.mapper.mapper_number()
    }

    /// Get the mapper name.
    #[must_use]
    pub fn mapper_name(&self) -> &'static str {
        self.bus.mapper.mapper_name()
    }

    /// Check if the ROM has battery-backed RAM.
    #[must_use]
    pub fn has_battery(&self) -> bool {
        self.bus.mapper.has_battery()
    }

    /// Get battery-backed RAM for saving.
    #[must_use]
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.bus.mapper.battery_ram()
    }

    /// Load battery-backed RAM.
    pub fn load_battery_ram(&mut self, data: &[u8]) {
        self.bus.mapper.set_battery_ram(data);
    }

    /// Snapshot of cartridge PRG-RAM ($6000-$7FFF), for host-side persistence.
    ///
    /// This is the same data as [`Console::battery_ram`]; the name matches
    /// the host-facing save/load vocabulary rather than the battery-specific
    /// one exposed by the mapper trait.
    #[must_use]
    pub fn prg_ram_snapshot(&self) -> Option<&[u8]> {
        self.bus.mapper.battery_ram()
    }

    /// Restore cartridge PRG-RAM from a snapshot taken by a host.
    pub fn load_prg_ram(&mut self, data: &[u8]) {
        self.bus.mapper.set_battery_ram(data);
    }

    /// Disassemble up to `count` instructions starting at `address`.
    ///
    /// Reads are done via [`Console::peek_memory`], so this never triggers
    /// PPU register side effects or mapper bank switches.
    #[must_use]
    pub fn disassemble_from(&self, address: u16, count: usize) -> Vec<rustynes_cpu::Instruction> {
        let mut out = Vec::with_capacity(count);
        let mut addr = address;
        for _ in 0..count {
            let insn = rustynes_cpu::disassemble_one(addr, |a| self.peek_memory(a));
            addr = addr.wrapping_add(insn.bytes.len() as u16);
            out.push(insn);
        }
        out
    }

    /// Snapshot of the CPU's architectural registers, for debug UIs.
    #[must_use]
    pub fn cpu_registers(&self) -> CpuRegisters {
        CpuRegisters {
            a: self.cpu.a(),
            x: self.cpu.x(),
            y: self.cpu.y(),
            sp: self.cpu.sp(),
            pc: self.cpu.pc(),
            p: self.cpu.status().bits(),
        }
    }

    /// Snapshot of the PPU's register and scroll state, for debug UIs.
    #[must_use]
    pub fn ppu_registers(&self) -> PpuRegisters {
        let ppu = &self.bus.ppu;
        PpuRegisters {
            ctrl: ppu.ctrl_bits(),
            mask: ppu.mask_bits(),
            status: ppu.status_bits(),
            oam_addr: ppu.oam_addr(),
            v: ppu.vram_addr(),
            t: ppu.temp_vram_addr(),
            fine_x: ppu.fine_x(),
            scanline: ppu.scanline(),
            dot: ppu.dot(),
        }
    }

    /// Render one of the two 128x128 CHR pattern tables as RGBA pixels, using
    /// one of the eight 4-entry NES palettes (`palette & 0x07`) to color it.
    ///
    /// `index` selects the low (0) or high (1) pattern table. The result is
    /// 128*128*4 bytes, top-left origin, row-major, matching the layout of
    /// [`Console::framebuffer`].
    #[must_use]
    pub fn pattern_table(&self, index: u8, palette: u8) -> Vec<u8> {
        const DIM: usize = 128;
        let base = u16::from(index & 1) * 0x1000;
        let palette_base = (palette & 0x07) << 2;
        let mut out = vec![0u8; DIM * DIM * 4];

        for tile_row in 0..16u16 {
            for tile_col in 0..16u16 {
                let tile_index = tile_row * 16 + tile_col;
                let tile_addr = base + tile_index * 16;
                for fine_y in 0..8u16 {
                    let lo = self.bus.mapper.read_chr(tile_addr + fine_y);
                    let hi = self.bus.mapper.read_chr(tile_addr + fine_y + 8);
                    for bit in 0..8u16 {
                        let shift = 7 - bit;
                        let lo_bit = (lo >> shift) & 1;
                        let hi_bit = (hi >> shift) & 1;
                        let pixel = (hi_bit << 1) | lo_bit;
                        let color_index = if pixel == 0 {
                            self.bus.ppu.palette_entry(0)
                        } else {
                            self.bus.ppu.palette_entry(palette_base | pixel as u8)
                        };
                        let rgb = crate::palette::NES_PALETTE[color_index as usize & 0x3F];

                        let x = (tile_col * 8 + bit) as usize;
                        let y = (tile_row * 8 + fine_y) as usize;
                        let offset = (y * DIM + x) * 4;
                        out[offset] = rgb.0;
                        out[offset + 1] = rgb.1;
                        out[offset + 2] = rgb.2;
                        out[offset + 3] = 255;
                    }
                }
            }
        }

        out
    }
}

/// Snapshot of the 6502 architectural registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuRegisters {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer.
    pub sp: u8,
    /// Program counter.
    pub pc: u16,
    /// Processor status byte (NV-BDIZC).
    pub p: u8,
}

/// Snapshot of PPU register and internal scroll state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpuRegisters {
    /// Raw PPUCTRL ($2000) byte.
    pub ctrl: u8,
    /// Raw PPUMASK ($2001) byte.
    pub mask: u8,
    /// Raw PPUSTATUS ($2002) byte.
    pub status: u8,
    /// OAMADDR ($2003).
    pub oam_addr: u8,
    /// Current VRAM address (loopy `v`).
    pub v: u16,
    /// Temporary VRAM address (loopy `t`).
    pub t: u16,
    /// Fine X scroll.
    pub fine_x: u8,
    /// Current scanline (0-261).
    pub scanline: u16,
    /// Current dot within the scanline (0-340).
    pub dot: u16,
}
