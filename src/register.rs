use bit::BitIndex;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManufacturerId(pub u8);

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType(pub u8);

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDensity(pub u8);

impl ManufacturerId {
    pub const WINBOND: ManufacturerId = ManufacturerId(0xEF);
}

impl MemoryDensity {
    /// Capacity in bytes encoded by the JEDEC capacity code (`2^code`), `None` if it does not fit a `u32`.
    pub fn bytes(self) -> Option<u32> {
        1u32.checked_shl(self.0 as u32)
    }
}

/// Status register 1
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegister {
    pub status_register_protect: bool,
    pub sector_protect: bool,
    pub top_bottom_protect: bool,
    pub protected_block: u8,
    pub write_enable_latch: bool,
    /// Erase or program in progress
    pub busy: bool,
}

impl From<u8> for StatusRegister {
    fn from(val: u8) -> StatusRegister {
        StatusRegister {
            status_register_protect: val.bit(7),
            sector_protect: val.bit(6),
            top_bottom_protect: val.bit(5),
            protected_block: val.bit_range(2..5),
            write_enable_latch: val.bit(1),
            busy: val.bit(0),
        }
    }
}
