//! Shared test fixtures: a minimal, synthesized NROM image standing in for the copyrighted
//! commercial/test ROMs the upstream test suite otherwise relies on.

use std::io::Cursor;
use tetanes_core::{
    control_deck::{Config, ControlDeck},
    mem::RamState,
};

const PRG_ROM_SIZE: usize = 0x4000; // 16KB, one NROM bank, mirrored across 0x8000..=0xFFFF
const CHR_ROM_SIZE: usize = 0x2000; // 8KB

/// Builds a valid iNES NROM image whose reset vector points at an infinite `JMP $8000` loop.
/// Deterministic and side-effect free: enough to drive the scheduler/movie engine through real
/// frames without needing an external ROM fixture.
pub fn test_rom_bytes() -> Vec<u8> {
    let mut rom = Vec::with_capacity(16 + PRG_ROM_SIZE + CHR_ROM_SIZE);
    rom.extend_from_slice(b"NES\x1a");
    rom.push(1); // 1 PRG-ROM bank (16KB)
    rom.push(1); // 1 CHR-ROM bank (8KB)
    rom.extend_from_slice(&[0u8; 10]); // flags 6-7, padding; mapper 0 (NROM), iNES format

    let mut prg = vec![0xEAu8; PRG_ROM_SIZE]; // NOP-filled
    prg[0x0000] = 0x4C; // JMP
    prg[0x0001] = 0x00;
    prg[0x0002] = 0x80; // -> $8000, an infinite loop at the reset vector
    let vector = |prg: &mut [u8], offset: usize| {
        prg[offset] = 0x00;
        prg[offset + 1] = 0x80;
    };
    vector(&mut prg, 0x3FFA); // NMI
    vector(&mut prg, 0x3FFC); // Reset
    vector(&mut prg, 0x3FFE); // IRQ/BRK
    rom.extend_from_slice(&prg);

    rom.extend_from_slice(&[0u8; CHR_ROM_SIZE]);
    rom
}

/// A `ControlDeck` with the synthesized test ROM loaded and deterministic RAM.
pub fn test_deck() -> ControlDeck {
    let mut deck = ControlDeck::with_config(Config {
        ram_state: RamState::AllZeros,
        ..Default::default()
    });
    let mut rom = Cursor::new(test_rom_bytes());
    deck.load_rom("test_rom", &mut rom).expect("failed to load test rom");
    deck
}
