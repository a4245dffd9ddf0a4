pub const PAGE_SIZE: u32 = 0x100;
pub const PAGE_LEN: usize = PAGE_SIZE as usize;

/// A page id, containing 256 bytes
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Page(pub u16);

impl Page {
    /// The page holding an absolute byte position. Positions past the 16-bit page range are truncated,
    /// bound checks belong to the caller.
    pub fn containing(position: u32) -> Self {
        Page((position / PAGE_SIZE) as u16)
    }

    /// Absolute position of the first byte of the page.
    pub fn start(self) -> u32 {
        self.0 as u32 * PAGE_SIZE
    }

    /// The three address bytes sent after a page level opcode. Page level transfers always start at
    /// the first byte of the page, so the low address byte is zero.
    pub fn address_bytes(self) -> [u8; 3] {
        [(self.0 >> 8) as u8, self.0 as u8, 0x00]
    }
}

/// An address on the memory chip
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address(pub u32);

impl Address {
    /// Page holding the address
    pub fn page(self) -> Page {
        Page::containing(self.0)
    }

    /// Position of the address within its page
    pub fn offset(self) -> u8 {
        (self.0 % PAGE_SIZE) as u8
    }
}

impl From<u16> for Page {
    fn from(page_id: u16) -> Page {
        Page(page_id)
    }
}

impl From<Page> for u16 {
    fn from(page: Page) -> u16 {
        page.0
    }
}

impl From<u32> for Address {
    fn from(addr: u32) -> Address {
        Address(addr)
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> u32 {
        addr.0
    }
}
