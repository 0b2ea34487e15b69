//! NES System Bus Implementation.
//!
//! The bus connects the CPU to all other components:
//! - PPU registers ($2000-$2007, mirrored every 8 bytes to $3FFF)
//! - Controller ports ($4016-$4017)
//! - Cartridge space ($4020-$FFFF)
//! - Internal RAM ($0000-$07FF, mirrored to $1FFF)

use rustynes_cpu::Bus;
use rustynes_mappers::Mapper;
use rustynes_ppu::Ppu;

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;

/// Controller input state.
///
/// Buttons are packed MSB-first to match the shift-register order the
/// console itself uses: `B, A, Select, Start, Up, Down, Left, Right`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerState {
    /// Button states: B, A, Select, Start, Up, Down, Left, Right (bit 7..0).
    pub buttons: u8,
}

impl ControllerState {
    /// B button mask.
    pub const B: u8 = 0x80;
    /// A button mask.
    pub const A: u8 = 0x40;
    /// Select button mask.
    pub const SELECT: u8 = 0x20;
    /// Start button mask.
    pub const START: u8 = 0x10;
    /// Up button mask.
    pub const UP: u8 = 0x08;
    /// Down button mask.
    pub const DOWN: u8 = 0x04;
    /// Left button mask.
    pub const LEFT: u8 = 0x02;
    /// Right button mask.
    pub const RIGHT: u8 = 0x01;
}

/// Translate a mapper-reported mirroring mode into the PPU crate's own type.
///
/// The two crates define structurally identical `Mirroring` enums so that
/// neither depends on the other; the bus is the seam that bridges them.
fn ppu_mirroring(mirroring: rustynes_mappers::Mirroring) -> rustynes_ppu::Mirroring {
    match mirroring {
        rustynes_mappers::Mirroring::Horizontal => rustynes_ppu::Mirroring::Horizontal,
        rustynes_mappers::Mirroring::Vertical => rustynes_ppu::Mirroring::Vertical,
        rustynes_mappers::Mirroring::SingleScreenLower => {
            rustynes_ppu::Mirroring::SingleScreenLower
        }
        rustynes_mappers::Mirroring::SingleScreenUpper => {
            rustynes_ppu::Mirroring::SingleScreenUpper
        }
        rustynes_mappers::Mirroring::FourScreen => rustynes_ppu::Mirroring::FourScreen,
    }
}

/// NES system bus connecting all components.
pub struct NesBus {
    /// Internal RAM (2KB, mirrored 4 times).
    pub ram: [u8; 2048],
    /// PPU (Picture Processing Unit).
    pub ppu: Ppu,
    /// Cartridge mapper.
    pub mapper: Box<dyn Mapper>,
    /// Controller 1 state.
    pub controller1: ControllerState,
    /// Controller 2 state.
    pub controller2: ControllerState,
    /// Controller 1 shift register.
    controller1_shift: u8,
    /// Controller 2 shift register.
    controller2_shift: u8,
    /// Controller strobe latch.
    controller_strobe: bool,
    /// OAM DMA page.
    oam_dma_page: Option<u8>,
    /// CPU cycle counter for DMA timing.
    cpu_cycles: u64,
    /// Last value on the data bus (for open bus behavior).
    last_bus_value: u8,
    /// NMI pending from PPU.
    nmi_pending: bool,
    /// IRQ pending from mapper.
    irq_pending: bool,
    /// Nametable mirroring last synced to the PPU.
    mirroring: rustynes_mappers::Mirroring,
    /// Set when the PPU has finished a full frame, cleared by `take_frame_complete`.
    frame_complete: bool,
}

impl NesBus {
    /// Create a new NES bus with the given mapper.
    #[must_use]
    pub fn new(mapper: Box<dyn Mapper>) -> Self {
        let mirroring = mapper.mirroring();
        Self {
            ram: [0; 2048],
            ppu: Ppu::new(ppu_mirroring(mirroring)),
            mapper,
            controller1: ControllerState::default(),
            controller2: ControllerState::default(),
            controller1_shift: 0,
            controller2_shift: 0,
            controller_strobe: false,
            oam_dma_page: None,
            cpu_cycles: 0,
            last_bus_value: 0,
            nmi_pending: false,
            irq_pending: false,
            mirroring,
            frame_complete: false,
        }
    }

    /// Reset the bus and all components.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.ppu.reset();
        self.mapper.reset();
        self.mirroring = self.mapper.mirroring();
        self.ppu.set_mirroring(ppu_mirroring(self.mirroring));
        self.controller1_shift = 0;
        self.controller2_shift = 0;
        self.controller_strobe = false;
        self.oam_dma_page = None;
        self.cpu_cycles = 0;
        self.last_bus_value = 0;
        self.nmi_pending = false;
        self.irq_pending = false;
        self.frame_complete = false;
    }

    /// Check if OAM DMA is pending.
    #[must_use]
    pub fn oam_dma_pending(&self) -> bool {
        self.oam_dma_page.is_some()
    }

    /// Execute OAM DMA transfer.
    ///
    /// Returns the number of CPU cycles consumed.
    pub fn execute_oam_dma(&mut self) -> u16 {
        if let Some(page) = self.oam_dma_page.take() {
            let base = u16::from(page) << 8;

            let mut data = [0u8; 256];
            for (i, slot) in data.iter_mut().enumerate() {
                *slot = self.cpu_read(base.wrapping_add(i as u16));
            }
            self.ppu.oam_dma(&data);

            // DMA takes 513 or 514 cycles depending on CPU cycle parity
            let cycles = if self.cpu_cycles % 2 == 1 { 514 } else { 513 };
            self.cpu_cycles += u64::from(cycles);
            cycles
        } else {
            0
        }
    }

    /// Internal CPU read without updating bus state (for DMA).
    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
            _ => self.last_bus_value,
        }
    }

    /// Re-synchronize the PPU's nametable mirroring with the mapper.
    ///
    /// Mappers such as MMC1 can switch mirroring at runtime; the bus is the
    /// only component that sees both sides, so it must propagate changes.
    fn sync_mirroring(&mut self) {
        let mirroring = self.mapper.mirroring();
        if mirroring != self.mirroring {
            self.mirroring = mirroring;
            self.ppu.set_mirroring(ppu_mirroring(mirroring));
        }
    }

    /// Step the PPU by 3 dots (one CPU cycle worth).
    ///
    /// Returns true if NMI should be triggered.
    pub fn step_ppu(&mut self) -> bool {
        self.sync_mirroring();

        let mut nmi = false;
        for _ in 0..3 {
            let (frame_complete, nmi_triggered) =
                self.ppu.step_with_chr(|addr| self.mapper.read_chr(addr));
            if frame_complete {
                self.frame_complete = true;
            }
            if nmi_triggered {
                nmi = true;
            }
        }

        self.mapper.clock(1);

        if nmi {
            self.nmi_pending = true;
        }

        nmi
    }

    /// Check if NMI is pending.
    #[must_use]
    pub fn nmi_pending(&self) -> bool {
        self.nmi_pending
    }

    /// Check whether the PPU has completed a frame since the last call to
    /// `take_frame_complete`.
    #[must_use]
    pub fn frame_complete(&self) -> bool {
        self.frame_complete
    }

    /// Return whether a frame completed, clearing the latch.
    pub fn take_frame_complete(&mut self) -> bool {
        core::mem::take(&mut self.frame_complete)
    }

    /// Acknowledge NMI.
    pub fn acknowledge_nmi(&mut self) {
        self.nmi_pending = false;
    }

    /// Check if IRQ is pending.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.irq_pending || self.mapper.irq_pending()
    }

    /// Acknowledge mapper IRQ.
    pub fn acknowledge_mapper_irq(&mut self) {
        self.mapper.irq_acknowledge();
    }

    /// Get the current CPU cycle count.
    #[must_use]
    pub fn cpu_cycles(&self) -> u64 {
        self.cpu_cycles
    }

    /// Increment CPU cycle count.
    pub fn add_cpu_cycles(&mut self, cycles: u8) {
        self.cpu_cycles += u64::from(cycles);
    }

    /// Read controller register.
    ///
    /// Each read returns bit 7 of the port's shift register, then shifts it
    /// left by one; after all 8 buttons are read, further reads return 1.
    fn read_controller(&mut self, port: u8) -> u8 {
        let shift = if port == 0 {
            &mut self.controller1_shift
        } else {
            &mut self.controller2_shift
        };

        let open_bus = self.last_bus_value & 0xE0;
        let data = ((*shift >> 7) & 1) | open_bus;
        *shift = (*shift << 1) | 1;

        data
    }

    /// Write controller strobe.
    fn write_controller_strobe(&mut self, val: u8) {
        let new_strobe = val & 1 != 0;

        // On falling edge (strobe 1->0), latch controller state
        if self.controller_strobe && !new_strobe {
            self.controller1_shift = self.controller1.buttons;
            self.controller2_shift = self.controller2.buttons;
        }

        self.controller_strobe = new_strobe;

        // While strobe is high, continuously reload
        if self.controller_strobe {
            self.controller1_shift = self.controller1.buttons;
            self.controller2_shift = self.controller2.buttons;
        }
    }

    /// Peek at memory without side effects.
    ///
    /// This is useful for debugging/display purposes where we don't want
    /// to trigger PPU register side effects or mapper state changes.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            // Internal RAM (mirrored every 2KB)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],

            // PPU registers - return last bus value to avoid side effects
            0x2000..=0x3FFF => self.last_bus_value,

            // Controller and open-bus I/O registers
            0x4000..=0x401F => self.last_bus_value,

            // Cartridge space
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
        }
    }
}

/// CPU bus implementation.
impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            // Internal RAM (mirrored every 2KB)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],

            // PPU registers (mirrored every 8 bytes)
            0x2000..=0x3FFF => {
                self.sync_mirroring();
                self.ppu
                    .read_register(addr, |chr_addr| self.mapper.read_chr(chr_addr))
            }

            // Controller ports and open-bus I/O registers
            0x4000..=0x4017 => match addr {
                0x4016 => self.read_controller(0),
                0x4017 => self.read_controller(1),
                _ => self.last_bus_value, // Write-only / unimplemented registers
            },

            // I/O test mode (normally disabled)
            0x4018..=0x401F => self.last_bus_value,

            // Cartridge space
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
        };

        self.last_bus_value = value;
        value
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.last_bus_value = val;

        match addr {
            // Internal RAM (mirrored every 2KB)
            0x0000..=0x1FFF => {
                self.ram[(addr & 0x07FF) as usize] = val;
            }

            // PPU registers (mirrored every 8 bytes)
            0x2000..=0x3FFF => {
                self.sync_mirroring();
                self.ppu
                    .write_register(addr, val, |chr_addr, chr_val| {
                        self.mapper.write_chr(chr_addr, chr_val);
                    });
            }

            // Controller ports and open-bus I/O registers
            0x4000..=0x4017 => match addr {
                0x4014 => {
                    // OAM DMA
                    self.oam_dma_page = Some(val);
                }
                0x4016 => {
                    self.write_controller_strobe(val);
                }
                _ => {}
            },

            // I/O test mode (normally disabled)
            0x4018..=0x401F => {}

            // Cartridge space
            0x4020..=0xFFFF => {
                self.mapper.write_prg(addr, val);
            }
        }
    }
}
