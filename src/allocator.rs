//! Append-only byte log over the pages of the chip.
//!
//! Every appended byte costs a full page read and a full page program: the page is read, the byte
//! patched in, and the whole page programmed back. Since programming can only clear bits this works
//! as long as each byte is written once between two erases, which the advancing cursor guarantees.
//! Rewriting a byte with [`PageAllocator::write_byte`] without erasing first stores `old & new`.

use embedded_hal::spi::SpiDevice;
use embedded_storage::Storage;

use crate::{
    address::{Address, Page, PAGE_LEN},
    blocking::W25Q,
    cursor::{Cursor, CursorLayout, CursorStore},
    error::{Error, LogError},
    poll::PollStrategy,
};

/// Byte log appending to the flash chip, with its write cursor kept in a separate store
pub struct PageAllocator<const PAGES: u32, SPI, P, S> {
    flash: W25Q<PAGES, SPI, P>,
    cursor: CursorStore<S>,
}

impl<const PAGES: u32, SPI, P, S> PageAllocator<PAGES, SPI, P, S> {
    /// Direct access to the chip. Programming pages behind the log's back is not tracked by the cursor.
    pub fn flash(&mut self) -> &mut W25Q<PAGES, SPI, P> {
        &mut self.flash
    }

    /// Give back the chip driver and the cursor store
    pub fn release(self) -> (W25Q<PAGES, SPI, P>, CursorStore<S>) {
        (self.flash, self.cursor)
    }
}

impl<const PAGES: u32, SPI, E, P, S, SE> PageAllocator<PAGES, SPI, P, S>
where
    SPI: SpiDevice<Error = E>,
    P: PollStrategy,
    S: Storage<Error = SE>,
{
    /// Create a log keeping its cursor at the default location of the store
    pub fn new(flash: W25Q<PAGES, SPI, P>, store: S) -> Self {
        Self {
            flash,
            cursor: CursorStore::new(store),
        }
    }

    /// Create a log keeping its cursor at the given addresses of the store
    pub fn with_layout(flash: W25Q<PAGES, SPI, P>, store: S, layout: CursorLayout) -> Self {
        Self {
            flash,
            cursor: CursorStore::with_layout(store, layout),
        }
    }

    /// Current write cursor, as persisted
    pub fn cursor(&mut self) -> Result<Cursor, SE> {
        self.cursor.load()
    }

    /// Number of bytes appended since the last [`Self::erase_all`]
    pub fn data_size(&mut self) -> Result<u32, SE> {
        Ok(self.cursor.load()?.position())
    }

    /// Append a byte at the cursor and advance it.
    ///
    /// Fails with [`LogError::Full`] before touching the bus once the cursor went past the last page.
    /// The very last byte of a 65536 pages chip is never used, the cursor after it does not fit the
    /// 16-bit page index of the store.
    pub fn append_byte(&mut self, value: u8) -> Result<(), LogError<E, SE>> {
        let cursor = self.cursor.load().map_err(LogError::Store)?;
        let next = match cursor.advance() {
            Some(next) if cursor.page <= W25Q::<PAGES, SPI, P>::LAST_PAGE => next,
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Log full at {}", cursor);
                return Err(LogError::Full);
            }
        };

        self.write_byte(cursor.page, cursor.offset, value)?;
        self.cursor.save(next).map_err(LogError::Store)
    }

    /// Read-modify-write of a single byte, the cursor is left untouched
    pub fn write_byte(&mut self, page: Page, offset: u8, value: u8) -> Result<(), Error<E>> {
        let mut buff = [0u8; PAGE_LEN];
        self.flash.read_page(page, &mut buff)?;
        buff[offset as usize] = value;
        self.flash.write_page(page, &buff)
    }

    /// Read one byte of a page, one full page read on the bus
    pub fn read_byte(&mut self, page: Page, offset: u8) -> Result<u8, Error<E>> {
        let mut buff = [0u8; PAGE_LEN];
        self.flash.read_page(page, &mut buff)?;
        Ok(buff[offset as usize])
    }

    /// Read the byte at an absolute position of the chip
    pub fn read_byte_at(&mut self, position: u32) -> Result<u8, Error<E>> {
        if position as usize >= W25Q::<PAGES, SPI, P>::CAPACITY {
            return Err(Error::OutOfBounds);
        }
        let address = Address(position);
        self.read_byte(address.page(), address.offset())
    }

    /// Copy the bytes from `from` to `to`, both included, to the start of `out`.
    ///
    /// Returns the number of bytes copied. An inverted range copies nothing and is not an error,
    /// `out` being shorter than the range is [`Error::Value`].
    pub fn read_range(&mut self, from: u32, to: u32, out: &mut [u8]) -> Result<usize, Error<E>> {
        if to < from {
            return Ok(0);
        }
        if to as usize >= W25Q::<PAGES, SPI, P>::CAPACITY {
            return Err(Error::OutOfBounds);
        }
        let len = (to - from) as usize + 1;
        let out = out.get_mut(..len).ok_or(Error::Value)?;
        self.flash.read(from, out)?;
        Ok(len)
    }

    /// Erase the chip and move the cursor back to the start
    pub fn erase_all(&mut self) -> Result<(), LogError<E, SE>> {
        self.flash.erase_chip()?;
        self.cursor.reset().map_err(LogError::Store)
    }

    /// Read every page of the chip in order
    pub fn for_each_page<F>(&mut self, mut f: F) -> Result<(), Error<E>>
    where
        F: FnMut(Page, &[u8; PAGE_LEN]),
    {
        let mut buff = [0u8; PAGE_LEN];
        for index in 0..PAGES {
            let page = Page(index as u16);
            self.flash.read_page(page, &mut buff)?;
            f(page, &buff);
        }
        Ok(())
    }
}
