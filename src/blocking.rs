use core::cmp::min;

use crate::{
    address::{Page, PAGE_LEN, PAGE_SIZE},
    check_span,
    command::Command,
    error::Error,
    poll::{PollStrategy, Spin},
    register::*,
    MAX_PAGES,
};
use embedded_hal::spi::{Operation, SpiDevice};

/// Type alias for the W25Q80, 8Mbit
pub type W25Q80<SPI, P = Spin> = W25Q<0x1000, SPI, P>;

/// Type alias for the W25Q16, 16Mbit
pub type W25Q16<SPI, P = Spin> = W25Q<0x2000, SPI, P>;

/// Type alias for the W25Q32, 32Mbit
pub type W25Q32<SPI, P = Spin> = W25Q<0x4000, SPI, P>;

/// Type alias for the W25Q64, 64Mbit
pub type W25Q64<SPI, P = Spin> = W25Q<0x8000, SPI, P>;

/// Type alias for the W25Q128, 128Mbit
pub type W25Q128<SPI, P = Spin> = W25Q<0x1_0000, SPI, P>;

/// The generic W25Q driver, `PAGES` is the number of 256 bytes pages of the chip.
///
/// Every operation is one chip select framed transaction (two when the write enable latch must be
/// set first), followed by a status register poll for the ones that keep the chip busy.
pub struct W25Q<const PAGES: u32, SPI, P = Spin> {
    spi: SPI,
    poll: P,
}

impl<const PAGES: u32, SPI> W25Q<PAGES, SPI, Spin> {
    /// Create a new instance that spins on the busy bit without any bound
    pub fn new(spi: SPI) -> Self {
        Self::with_poll(spi, Spin)
    }
}

impl<const PAGES: u32, SPI, P> W25Q<PAGES, SPI, P> {
    /// Size of the chip in bytes
    pub const CAPACITY: usize = PAGES as usize * PAGE_LEN;

    /// Last addressable page
    pub const LAST_PAGE: Page = Page((PAGES - 1) as u16);

    const PAGES_IN_RANGE: () = assert!(
        PAGES > 0 && PAGES <= MAX_PAGES,
        "the page count must fit the 16-bit page index"
    );

    /// Create a new instance waiting on the chip with the given strategy
    pub fn with_poll(spi: SPI, poll: P) -> Self {
        let () = Self::PAGES_IN_RANGE;
        Self { spi, poll }
    }

    /// Give back the bus and the polling strategy
    pub fn release(self) -> (SPI, P) {
        (self.spi, self.poll)
    }
}

impl<const PAGES: u32, SPI, E, P> W25Q<PAGES, SPI, P>
where
    SPI: SpiDevice<Error = E>,
    P: PollStrategy,
{
    /// Check that the page exists on this chip
    pub fn verify_page(page: Page) -> Result<Page, Error<E>> {
        if page.0 as u32 >= PAGES {
            return Err(Error::OutOfBounds);
        }
        Ok(page)
    }

    fn command_write(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        self.spi.write(bytes).map_err(Error::Spi)
    }

    fn command_transfer(&mut self, bytes: &mut [u8]) -> Result<(), Error<E>> {
        self.spi.transfer_in_place(bytes).map_err(Error::Spi)
    }

    fn page_command(cmd: Command, page: Page) -> [u8; 4] {
        let [high, low, byte] = page.address_bytes();
        [cmd as u8, high, low, byte]
    }

    fn write_enable(&mut self) -> Result<(), Error<E>> {
        self.command_write(&[Command::WriteEnable as u8])
    }

    /// Clear the write enable latch. The chip clears it by itself after every program or erase,
    /// so the driver never needs this.
    pub fn write_disable(&mut self) -> Result<(), Error<E>> {
        self.command_write(&[Command::WriteDisable as u8])
    }

    /// Read the JEDEC identification of the device
    pub fn identify(&mut self) -> Result<(ManufacturerId, MemoryType, MemoryDensity), Error<E>> {
        let mut command = [Command::ReadJedecId as u8, 0, 0, 0];
        self.command_transfer(&mut command)?;
        Ok((
            ManufacturerId(command[1]),
            MemoryType(command[2]),
            MemoryDensity(command[3]),
        ))
    }

    /// Read the status register 1
    pub fn read_status(&mut self) -> Result<StatusRegister, Error<E>> {
        let mut command: [u8; 2] = [Command::ReadStatus1 as u8, 0];
        self.command_transfer(&mut command)?;
        Ok(command[1].into())
    }

    /// Read the busy bit, just less noisy than the `read_status()?.busy`
    pub fn is_busy(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read_status()?.busy)
    }

    /// Block until the chip clears its busy bit. Fails with [`Error::Timeout`] only if the
    /// polling strategy gives up.
    pub fn poll_until_ready(&mut self) -> Result<(), Error<E>> {
        self.poll.start();
        while self.is_busy()? {
            if !self.poll.keep_waiting() {
                #[cfg(feature = "defmt")]
                defmt::warn!("Chip still busy, giving up");
                return Err(Error::Timeout);
            }
        }
        Ok(())
    }

    /// Erase the whole chip, every byte reads `0xFF` afterwards. Blocks until the erase is done,
    /// which can take seconds on the larger chips.
    pub fn erase_chip(&mut self) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt")]
        defmt::trace!("Erase chip");
        self.write_enable()?;
        self.command_write(&[Command::ChipErase as u8])?;
        self.poll_until_ready()
    }

    /// Read a whole page
    pub fn read_page(&mut self, page: Page, buff: &mut [u8; PAGE_LEN]) -> Result<(), Error<E>> {
        let page = Self::verify_page(page)?;
        let cmd = Self::page_command(Command::Read, page);
        self.spi
            .transaction(&mut [Operation::Write(&cmd), Operation::Read(&mut buff[..])])
            .map_err(Error::Spi)?;
        #[cfg(feature = "defmt")]
        defmt::trace!("Read page {=u16}", page.0);
        self.poll_until_ready()
    }

    /// Program a whole page, the write enable latch is set first.
    ///
    /// Programming can only clear bits, so unless the page was erased since it was last programmed
    /// the chip ends up with `old & buff`. Nothing is erased here.
    pub fn write_page(&mut self, page: Page, buff: &[u8; PAGE_LEN]) -> Result<(), Error<E>> {
        let page = Self::verify_page(page)?;
        let cmd = Self::page_command(Command::ProgramPage, page);
        self.write_enable()?;
        self.spi
            .transaction(&mut [Operation::Write(&cmd), Operation::Write(&buff[..])])
            .map_err(Error::Spi)?;
        #[cfg(feature = "defmt")]
        defmt::trace!("Program page {=u16}", page.0);
        self.poll_until_ready()
    }

    /// Read n bytes from an absolute offset, one page read per page touched
    pub fn read(&mut self, offset: u32, buff: &mut [u8]) -> Result<(), Error<E>> {
        check_span(Self::CAPACITY, offset, buff.len())?;

        let mut page_buff = [0u8; PAGE_LEN];
        let mut position = offset;
        let mut rest = buff;
        while !rest.is_empty() {
            let start = (position % PAGE_SIZE) as usize;
            let len = min(PAGE_LEN - start, rest.len());
            self.read_page(Page::containing(position), &mut page_buff)?;

            let (now, later) = core::mem::take(&mut rest).split_at_mut(len);
            now.copy_from_slice(&page_buff[start..start + len]);
            rest = later;
            position += len as u32;
        }
        Ok(())
    }
}

/// Implementation of the `NorFlash` traits of the `embedded_storage` crate.
/// The chip only supports whole chip erase, so `ERASE_SIZE` is the capacity of the chip.
mod es {
    use super::*;
    use core::fmt::Debug;
    use embedded_storage::nor_flash::{
        check_erase, check_read, check_write, ErrorType, MultiwriteNorFlash, NorFlash,
        ReadNorFlash,
    };

    impl<const PAGES: u32, SPI, E, P> ErrorType for W25Q<PAGES, SPI, P>
    where
        SPI: SpiDevice<Error = E>,
        E: Debug,
    {
        type Error = Error<E>;
    }

    impl<const PAGES: u32, SPI, E, P> ReadNorFlash for W25Q<PAGES, SPI, P>
    where
        SPI: SpiDevice<Error = E>,
        E: Debug,
        P: PollStrategy,
    {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            check_read(self, offset, bytes.len())?;
            W25Q::read(self, offset, bytes)
        }

        fn capacity(&self) -> usize {
            Self::CAPACITY
        }
    }

    impl<const PAGES: u32, SPI, E, P> NorFlash for W25Q<PAGES, SPI, P>
    where
        SPI: SpiDevice<Error = E>,
        E: Debug,
        P: PollStrategy,
    {
        const WRITE_SIZE: usize = PAGE_LEN;
        const ERASE_SIZE: usize = PAGES as usize * PAGE_LEN;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            check_erase(self, from, to)?;
            if from == to {
                return Ok(());
            }
            self.erase_chip()
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            check_write(self, offset, bytes.len())?;
            let first = offset / PAGE_SIZE;
            for (page, chunk) in (first..).zip(bytes.chunks_exact(PAGE_LEN)) {
                let chunk: &[u8; PAGE_LEN] = chunk.try_into().map_err(|_| Error::NotAligned)?;
                self.write_page(Page(page as u16), chunk)?;
            }
            Ok(())
        }
    }

    impl<const PAGES: u32, SPI, E, P> MultiwriteNorFlash for W25Q<PAGES, SPI, P>
    where
        SPI: SpiDevice<Error = E>,
        E: Debug,
        P: PollStrategy,
    {
    }
}
