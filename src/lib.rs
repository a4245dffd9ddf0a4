#![no_std]
//! This is a platform agnostic library for the Winbond W25Q NOR flash series using [embedded-hal](https://github.com/rust-embedded/embedded-hal).
//!
//! The crate has two layers:
//! * [`blocking::W25Q`] sequences the raw device transactions (JEDEC id, chip erase, page read,
//!   page program) and busy-polls the status register after each of them.
//! * [`allocator::PageAllocator`] builds an append-only byte log on top of it, with a write cursor
//!   persisted in a separate byte store (usually the MCU's EEPROM) through [`embedded_storage::Storage`].
//!
//! Multiple chips are supported through type aliases:
//! * [W25Q80](https://www.winbond.com/resource-files/w25q80dv%20dl_revh_10022015.pdf)
//! * [W25Q16](https://www.winbond.com/resource-files/w25q16jv%20spi%20revh%2004082019%20plus.pdf)
//! * [W25Q32](https://www.winbond.com/resource-files/w25q32jv%20revg%2003272018%20plus.pdf)
//! * [W25Q64](https://www.winbond.com/resource-files/w25q64jv%20revj%2003272018%20plus.pdf)
//! * [W25Q128](https://www.winbond.com/resource-files/w25q128jv%20revf%2003272018%20plus.pdf)

pub mod address;
pub mod allocator;
pub mod blocking;
mod command;
pub mod cursor;
pub mod error;
pub mod poll;
pub mod register;

use embedded_hal::spi::Mode;

use crate::error::Error;

pub use crate::address::{PAGE_LEN, PAGE_SIZE};

/// SPI mode expected by the chip: clock idle low, data sampled on the leading edge.
pub const MODE: Mode = embedded_hal::spi::MODE_0;

/// Bus clock the device is known to work at for every command used by this crate.
pub const MAX_FREQUENCY_HZ: u32 = 20_000_000;

/// Largest page count addressable with the 16-bit page index of the 3-byte address scheme.
pub const MAX_PAGES: u32 = 0x1_0000;

pub(crate) fn check_span<E>(capacity: usize, offset: u32, length: usize) -> Result<(), Error<E>> {
    let capacity = capacity as u32;
    let length = length as u32;
    if length > capacity || offset > capacity - length {
        return Err(Error::OutOfBounds);
    }
    Ok(())
}
