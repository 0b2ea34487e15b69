//! Mapper 0: NROM
//!
//! NROM is the simplest NES mapper with no bank switching capabilities.
//! It provides direct memory mapping with optional mirroring for 16KB PRG-ROM.
//!
//! # Hardware Details
//!
//! - **PRG-ROM**: 16KB or 32KB
//! - **CHR**: 8KB CHR-ROM or CHR-RAM
//! - **Mirroring**: Fixed horizontal or vertical
//! - **Battery**: Not supported
//!
//! # Variants
//!
//! - **NROM-128**: 16KB PRG-ROM (mirrored to fill 32KB)
//! - **NROM-256**: 32KB PRG-ROM (no mirroring needed)
//!
//! # Games
//!
//! - Super Mario Bros.
//! - Donkey Kong
//! - Balloon Fight
//! - Excitebike
//! - Ice Climber
//!
//! # Memory Map
//!
//! ```text
//! CPU:
//! $8000-$BFFF: First 16KB of PRG-ROM (or mirrored in NROM-128)
//! $C000-$FFFF: Last 16KB of PRG-ROM (or mirrored in NROM-128)
//!
//! PPU:
//! $0000-$1FFF: 8KB CHR-ROM/RAM (no banking)
//! ```

use crate::{Mapper, Mirroring, Rom};

/// NROM mapper implementation (Mapper 0).
#[derive(Clone)]
pub struct Nrom {
    /// PRG-ROM data (16KB or 32KB).
    prg_rom: Vec<u8>,

    /// CHR-ROM data, or empty if CHR-RAM.
    chr_rom: Vec<u8>,

    /// CHR-RAM (8KB if `chr_rom` is empty).
    chr_ram: Vec<u8>,

    /// PRG-RAM at $6000-$7FFF (defaults to 8KB per the iNES header rule).
    prg_ram: Vec<u8>,

    /// Nametable mirroring mode.
    mirroring: Mirroring,

    /// True if using CHR-RAM instead of CHR-ROM.
    has_chr_ram: bool,
}

impl Nrom {
    /// Create a new NROM mapper from a ROM.
    ///
    /// # Arguments
    ///
    /// * `rom` - Loaded ROM file
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - PRG-ROM size is not 16KB or 32KB
    /// - CHR size is not 8KB (or 0 for CHR-RAM)
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        // Validate PRG-ROM size
        assert!(
            rom.prg_rom.len() == 16384 || rom.prg_rom.len() == 32768,
            "NROM requires 16KB or 32KB PRG-ROM, got {} bytes",
            rom.prg_rom.len()
        );

        // Determine if using CHR-RAM or CHR-ROM
        let has_chr_ram = rom.chr_rom.is_empty();
        let chr_ram = if has_chr_ram {
            vec![0; 8192] // 8KB CHR-RAM
        } else {
            Vec::new()
        };

        // Validate CHR-ROM size if present
        if !has_chr_ram {
            assert_eq!(
                rom.chr_rom.len(),
                8192,
                "NROM requires 8KB CHR-ROM, got {} bytes",
                rom.chr_rom.len()
            );
        }

        Self {
            prg_rom: rom.prg_rom.clone(),
            chr_rom: rom.chr_rom.clone(),
            chr_ram,
            prg_ram: vec![0; 8192],
            mirroring: rom.header.mirroring,
            has_chr_ram,
        }
    }

    /// Get PRG-ROM size in bytes.
    #[must_use]
    pub fn prg_size(&self) -> usize {
        self.prg_rom.len()
    }

    /// Check if using CHR-RAM.
    #[must_use]
    pub fn has_chr_ram(&self) -> bool {
        self.has_chr_ram
    }
}

impl Mapper for Nrom {
    fn read_prg(&self, addr: u16) -> u8 {
        if (0x6000..=0x7FFF).contains(&addr) {
            return self.prg_ram[(addr - 0x6000) as usize];
        }

        debug_assert!(addr >= 0x8000, "Invalid PRG address: ${addr:04X}");

        let offset = (addr - 0x8000) as usize;

        // Handle mirroring for NROM-128 (16KB)
        let masked_offset = if self.prg_rom.len() == 16384 {
            offset & 0x3FFF // Mirror 16KB to fill 32KB space
        } else {
            offset
        };

        self.prg_rom[masked_offset]
    }

    fn write_prg(&mut self, addr: u16, value: u8) {
        if (0x6000..=0x7FFF).contains(&addr) {
            self.prg_ram[(addr - 0x6000) as usize] = value;
        }
        // NROM has no writable registers in $8000-$FFFF; those writes are ignored
    }

    fn read_chr(&self, addr: u16) -> u8 {
        debug_assert!(addr <= 0x1FFF, "Invalid CHR address: ${addr:04X}");

        if self.has_chr_ram {
            self.chr_ram[addr as usize]
        } else {
            self.chr_rom[addr as usize]
        }
    }

    fn write_chr(&mut self, addr: u16, value: u8) {
        debug_assert!(addr <= 0x1FFF, "Invalid CHR address: ${addr:04X}");

        if self.has_chr_ram {
            self.chr_ram[addr as usize] = value;
        }
        // CHR-ROM writes are ignored
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_number(&self) -> u16 {
        0
    }

    fn mapper_name(&self) -> &'static str {
        "NROM"
    }
}
