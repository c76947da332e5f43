//! Persistence table.
//!
//! The registers that survive a power cycle are laid out in the FRAM as a
//! fixed, ordered table of byte slots starting at a configurable base:
//!
//! | slot   | register            |
//! |--------|---------------------|
//! | 0      | max level           |
//! | 1      | min level           |
//! | 2      | system failure level|
//! | 3      | power-on level      |
//! | 4      | fade time           |
//! | 5      | fade rate           |
//! | 6..=21 | scenes 0..=15       |
//! | 22     | groups 0..=7        |
//! | 23     | groups 8..=15       |
//! | 24     | short address       |
//!
//! Which slots still need writing is tracked in a [`DirtySet`].

use crate::gear::registers::Registers;
use serde::{Serialize, Deserialize};

/// Persisted register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Persisted {
    MaxLevel,
    MinLevel,
    SystemFailureLevel,
    PowerOnLevel,
    FadeTime,
    FadeRate,
    Scenes,
    Groups,
    ShortAddress,
}

impl Persisted {
    /// Table order.
    pub const ALL: [Persisted; 9] = [
        Persisted::MaxLevel,
        Persisted::MinLevel,
        Persisted::SystemFailureLevel,
        Persisted::PowerOnLevel,
        Persisted::FadeTime,
        Persisted::FadeRate,
        Persisted::Scenes,
        Persisted::Groups,
        Persisted::ShortAddress,
    ];

    /// Width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Persisted::Scenes => 16,
            Persisted::Groups => 2,
            _ => 1,
        }
    }

    /// First slot of this register.
    pub fn first_slot(self) -> usize {
        Self::ALL
            .iter()
            .take_while(|&&reg| reg != self)
            .map(|reg| reg.width())
            .sum()
    }

    /// Slot of byte `index` within this register.
    pub fn slot(self, index: usize) -> usize {
        debug_assert!(index < self.width());
        self.first_slot() + index
    }
}

/// Total number of persisted bytes.
pub const PERSIST_BYTES: usize = 25;

/// Find the register and byte index stored in `slot`.
pub fn locate(slot: usize) -> Option<(Persisted, usize)> {
    let mut first = 0;
    for reg in Persisted::ALL {
        if slot < first + reg.width() {
            return Some((reg, slot - first));
        }
        first += reg.width();
    }
    None
}

/// Byte stored in `slot` for the current register contents.
pub fn read_slot(regs: &Registers, slot: usize) -> Option<u8> {
    let (reg, index) = locate(slot)?;
    Some(match reg {
        Persisted::MaxLevel => regs.max_level,
        Persisted::MinLevel => regs.min_level,
        Persisted::SystemFailureLevel => regs.system_failure_level,
        Persisted::PowerOnLevel => regs.power_on_level,
        Persisted::FadeTime => regs.fade_time,
        Persisted::FadeRate => regs.fade_rate,
        Persisted::Scenes => regs.scenes[index],
        Persisted::Groups if index == 0 => regs.groups_low(),
        Persisted::Groups => regs.groups_high(),
        Persisted::ShortAddress => regs.short_address,
    })
}

/// Store a byte read back from `slot` verbatim.
pub fn restore_slot(regs: &mut Registers, slot: usize, byte: u8) {
    let Some((reg, index)) = locate(slot) else {
        return;
    };
    match reg {
        Persisted::MaxLevel => regs.max_level = byte,
        Persisted::MinLevel => regs.min_level = byte,
        Persisted::SystemFailureLevel => regs.system_failure_level = byte,
        Persisted::PowerOnLevel => regs.power_on_level = byte,
        Persisted::FadeTime => regs.fade_time = byte,
        Persisted::FadeRate => regs.fade_rate = byte,
        Persisted::Scenes => regs.scenes[index] = byte,
        Persisted::Groups if index == 0 => {
            regs.groups = (regs.groups & 0xFF00) | u16::from(byte);
        }
        Persisted::Groups => {
            regs.groups = (regs.groups & 0x00FF) | (u16::from(byte) << 8);
        }
        Persisted::ShortAddress => regs.short_address = byte,
    }
}

/// Set of slots waiting to be written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirtySet(u32);

impl DirtySet {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, slot: usize) -> bool {
        slot < PERSIST_BYTES && self.0 & (1 << slot) != 0
    }

    pub fn mark(&mut self, slot: usize) {
        if slot < PERSIST_BYTES {
            self.0 |= 1 << slot;
        }
    }

    /// Mark every byte of a register.
    pub fn mark_register(&mut self, reg: Persisted) {
        for index in 0..reg.width() {
            self.mark(reg.slot(index));
        }
    }

    pub fn mark_all(&mut self) {
        self.0 = (1 << PERSIST_BYTES) - 1;
    }

    /// Remove and return the lowest dirty slot.
    pub fn take_lowest(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let slot = self.0.trailing_zeros() as usize;
        self.0 &= !(1 << slot);
        Some(slot)
    }
}

/// The table placed at a base FRAM address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistMap {
    base: u16,
}

impl PersistMap {
    pub fn new(base: u16) -> Self {
        Self { base }
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    /// FRAM address of a slot.
    #[inline]
    pub fn address(&self, slot: usize) -> u16 {
        self.base.wrapping_add(slot as u16)
    }

    /// FRAM address of byte `index` of a register.
    pub fn address_of(&self, reg: Persisted, index: usize) -> u16 {
        self.address(reg.slot(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_offsets() {
        assert_eq!(Persisted::MaxLevel.first_slot(), 0);
        assert_eq!(Persisted::MinLevel.first_slot(), 1);
        assert_eq!(Persisted::SystemFailureLevel.first_slot(), 2);
        assert_eq!(Persisted::PowerOnLevel.first_slot(), 3);
        assert_eq!(Persisted::FadeTime.first_slot(), 4);
        assert_eq!(Persisted::FadeRate.first_slot(), 5);
        assert_eq!(Persisted::Scenes.slot(15), 21);
        assert_eq!(Persisted::Groups.first_slot(), 22);
        assert_eq!(Persisted::ShortAddress.first_slot(), 24);

        let total: usize = Persisted::ALL.iter().map(|r| r.width()).sum();
        assert_eq!(total, PERSIST_BYTES);
    }

    #[test]
    fn test_locate_matches_table() {
        for reg in Persisted::ALL {
            for index in 0..reg.width() {
                assert_eq!(locate(reg.slot(index)), Some((reg, index)));
            }
        }
        assert_eq!(locate(PERSIST_BYTES), None);
    }

    #[test]
    fn test_slots_restore_verbatim() {
        let mut regs = Registers::new();
        for slot in 0..PERSIST_BYTES {
            restore_slot(&mut regs, slot, slot as u8 + 5);
        }
        assert_eq!(regs.max_level, 5);
        assert_eq!(regs.min_level, 6);
        assert_eq!(regs.system_failure_level, 7);
        assert_eq!(regs.power_on_level, 8);
        assert_eq!(regs.fade_time, 9);
        assert_eq!(regs.fade_rate, 10);
        assert_eq!(regs.scenes[0], 11);
        assert_eq!(regs.scenes[15], 26);
        assert_eq!(regs.groups, 0x1C1B);
        assert_eq!(regs.short_address, 29);

        for slot in 0..PERSIST_BYTES {
            assert_eq!(read_slot(&regs, slot), Some(slot as u8 + 5));
        }
    }

    #[test]
    fn test_dirty_set_lowest_first() {
        let mut dirty = DirtySet::new();
        assert!(dirty.is_empty());
        dirty.mark(24);
        dirty.mark_register(Persisted::Groups);
        dirty.mark(1);
        dirty.mark(PERSIST_BYTES);
        assert!(dirty.contains(22) && dirty.contains(23));
        assert!(!dirty.contains(2));
        assert!(!dirty.contains(PERSIST_BYTES));

        assert_eq!(dirty.take_lowest(), Some(1));
        assert!(!dirty.contains(1));
        assert_eq!(dirty.take_lowest(), Some(22));
        assert_eq!(dirty.take_lowest(), Some(23));
        assert_eq!(dirty.take_lowest(), Some(24));
        assert_eq!(dirty.take_lowest(), None);
    }

    #[test]
    fn test_dirty_set_all() {
        let mut dirty = DirtySet::new();
        dirty.mark_all();
        let drained: Vec<usize> = std::iter::from_fn(|| dirty.take_lowest()).collect();
        assert_eq!(drained, (0..PERSIST_BYTES).collect::<Vec<_>>());
    }

    #[test]
    fn test_map_addresses() {
        let map = PersistMap::new(0x100);
        assert_eq!(map.address(0), 0x100);
        assert_eq!(map.address_of(Persisted::Scenes, 3), 0x109);
        assert_eq!(map.address_of(Persisted::ShortAddress, 0), 0x118);
    }
}
