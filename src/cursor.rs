//! The write cursor of the page log and its persisted form.
//!
//! The cursor lives outside of the flash, in a small byte addressable store such as the MCU's
//! EEPROM, as three bytes: the offset within the page, then the page index in big-endian.

use embedded_storage::Storage;

use crate::address::Page;

/// Next free byte of the log
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub page: Page,
    pub offset: u8,
}

impl Cursor {
    /// First byte of the first page, where an erased log starts
    pub const START: Cursor = Cursor {
        page: Page(0),
        offset: 0,
    };

    /// Cursor at `offset` within `page`
    pub fn new(page: Page, offset: u8) -> Self {
        Self { page, offset }
    }

    /// Absolute byte position, which is also the number of bytes written before it.
    pub fn position(self) -> u32 {
        self.page.start() + self.offset as u32
    }

    /// The next byte, wrapping into the following page after offset 255.
    /// `None` once the page index itself would overflow.
    pub fn advance(self) -> Option<Self> {
        match self.offset.checked_add(1) {
            Some(offset) => Some(Self { offset, ..self }),
            None => Some(Self::new(Page(self.page.0.checked_add(1)?), 0)),
        }
    }
}

/// Where the cursor bytes live in the store
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorLayout {
    /// One byte, offset within the page
    pub offset_addr: u32,
    /// Two bytes, high byte first
    pub page_addr: u32,
}

impl Default for CursorLayout {
    fn default() -> Self {
        Self {
            offset_addr: 10,
            page_addr: 11,
        }
    }
}

/// Reads and writes the cursor in a byte store. Writes are skipped for bytes that already hold the
/// right value, EEPROM cells have a limited number of write cycles.
pub struct CursorStore<S> {
    store: S,
    layout: CursorLayout,
}

impl<S, SE> CursorStore<S>
where
    S: Storage<Error = SE>,
{
    /// Keep the cursor at the default layout of `store`
    pub fn new(store: S) -> Self {
        Self::with_layout(store, CursorLayout::default())
    }

    /// Keep the cursor at the given addresses of `store`
    pub fn with_layout(store: S, layout: CursorLayout) -> Self {
        Self { store, layout }
    }

    /// Give back the store
    pub fn release(self) -> S {
        self.store
    }

    fn read_u8(&mut self, addr: u32) -> Result<u8, SE> {
        let mut byte = [0];
        self.store.read(addr, &mut byte)?;
        Ok(byte[0])
    }

    fn update_u8(&mut self, addr: u32, value: u8) -> Result<(), SE> {
        if self.read_u8(addr)? != value {
            self.store.write(addr, &[value])?;
        }
        Ok(())
    }

    fn read_u16(&mut self, addr: u32) -> Result<u16, SE> {
        let mut bytes = [0; 2];
        self.store.read(addr, &mut bytes)?;
        Ok(u16::from_be_bytes(bytes))
    }

    fn update_u16(&mut self, addr: u32, value: u16) -> Result<(), SE> {
        let [high, low] = value.to_be_bytes();
        self.update_u8(addr, high)?;
        self.update_u8(addr + 1, low)
    }

    /// Read the cursor back from the store
    pub fn load(&mut self) -> Result<Cursor, SE> {
        let offset = self.read_u8(self.layout.offset_addr)?;
        let page = self.read_u16(self.layout.page_addr)?;
        Ok(Cursor::new(Page(page), offset))
    }

    /// Persist the cursor, only the bytes that changed are written
    pub fn save(&mut self, cursor: Cursor) -> Result<(), SE> {
        self.update_u16(self.layout.page_addr, cursor.page.0)?;
        self.update_u8(self.layout.offset_addr, cursor.offset)
    }

    /// Move the persisted cursor back to [`Cursor::START`]
    pub fn reset(&mut self) -> Result<(), SE> {
        self.save(Cursor::START)
    }
}
