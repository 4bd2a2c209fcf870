//! `NROM` (Mapper 000).
//!
//! <https://wiki.nesdev.org/w/index.php?title=NROM>

use crate::{
    cart::Cart,
    common::{Clock, Regional, Reset, Sram},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// `NROM` (Mapper 000).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Nrom {
    pub mirroring: Mirroring,
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl Nrom {
    const PRG_ROM_WINDOW: usize = 16 * 1024;
    const CHR_WINDOW: usize = 8 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        if !cart.has_chr_rom() && cart.chr_ram.is_empty() {
            cart.add_chr_ram(Self::CHR_RAM_SIZE);
        }
        let chr_len = if cart.has_chr_rom() {
            cart.chr_rom.len()
        } else {
            cart.chr_ram.len()
        };
        let mut nrom = Self {
            mirroring: cart.mirroring(),
            chr_banks: Banks::new(0x0000, 0x1FFF, chr_len, Self::CHR_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        // NROM-256 has two 16K banks; NROM-128 mirrors its single bank into both halves.
        let last_bank = nrom.prg_rom_banks.last();
        nrom.prg_rom_banks.set(1, last_bank);
        Ok(nrom.into())
    }
}

impl Mapped for Nrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}

impl MemMap for Nrom {
    // PPU $0000..=$1FFF 8K Fixed CHR-ROM/RAM Bank
    // CPU $8000..=$BFFF 16K PRG-ROM Bank Fixed
    // CPU $C000..=$FFFF 16K PRG-ROM Bank Fixed (mirrors first bank on NROM-128)

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(addr.into()),
            0x8000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        match addr {
            0x0000..=0x1FFF => MappedWrite::Chr(addr.into(), val),
            _ => MappedWrite::Bus,
        }
    }
}

impl Reset for Nrom {}
impl Clock for Nrom {}
impl Regional for Nrom {}
impl Sram for Nrom {}
