#![allow(dead_code)]

use core::convert::Infallible;
use std::{cell::RefCell, rc::Rc};

use embedded_hal::{digital, spi};
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use embedded_storage::{ReadStorage, Storage};
use w25q_log::blocking::W25Q;

pub const JEDEC_ID: [u8; 3] = [0xEF, 0x40, 0x18];

/// Behavioral model of a W25Q chip: programming ANDs into the array, program and erase need the
/// write enable latch and keep the chip busy for a few status reads.
pub struct Chip {
    pub mem: Vec<u8>,
    pub write_enable_latch: bool,
    pub busy_reads: u32,
    pub program_busy_reads: u32,
    pub erase_busy_reads: u32,
    pub frames: Vec<Vec<u8>>,
    pub status_reads: usize,
    selected: bool,
    frame: Vec<u8>,
}

impl Chip {
    pub fn new(pages: usize) -> Self {
        Self {
            mem: vec![0xFF; pages * 256],
            write_enable_latch: false,
            busy_reads: 0,
            program_busy_reads: 2,
            erase_busy_reads: 5,
            frames: Vec::new(),
            status_reads: 0,
            selected: false,
            frame: Vec::new(),
        }
    }

    fn select(&mut self) {
        self.selected = true;
        self.frame.clear();
    }

    fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        let frame = core::mem::take(&mut self.frame);
        if frame.is_empty() {
            return;
        }
        self.execute(&frame);
        self.frames.push(frame);
    }

    fn address(frame: &[u8]) -> usize {
        (frame[1] as usize) << 16 | (frame[2] as usize) << 8 | frame[3] as usize
    }

    fn execute(&mut self, frame: &[u8]) {
        if self.busy_reads > 0 && frame[0] != 0x05 {
            return;
        }
        match frame[0] {
            0x06 => self.write_enable_latch = true,
            0x04 => self.write_enable_latch = false,
            0xC7 if self.write_enable_latch => {
                self.mem.fill(0xFF);
                self.write_enable_latch = false;
                self.busy_reads = self.erase_busy_reads;
            }
            0x02 if self.write_enable_latch && frame.len() >= 4 => {
                let addr = Self::address(frame) % self.mem.len();
                let base = addr & !0xFF;
                for (i, byte) in frame[4..].iter().enumerate() {
                    let target = base | ((addr + i) & 0xFF);
                    self.mem[target] &= byte;
                }
                self.write_enable_latch = false;
                self.busy_reads = self.program_busy_reads;
            }
            _ => {}
        }
    }

    fn exchange(&mut self, out: u8) -> u8 {
        assert!(self.selected, "bus used without chip select");
        self.frame.push(out);
        let index = self.frame.len() - 1;
        if index == 0 {
            return 0xFF;
        }
        match self.frame[0] {
            0x9F if index <= 3 => JEDEC_ID[index - 1],
            0x05 => {
                self.status_reads += 1;
                let busy = self.busy_reads > 0;
                if busy {
                    self.busy_reads -= 1;
                }
                (self.write_enable_latch as u8) << 1 | busy as u8
            }
            0x03 if index >= 4 => {
                let addr = Self::address(&self.frame);
                self.mem[(addr + index - 4) % self.mem.len()]
            }
            _ => 0xFF,
        }
    }

    /// Frames whose first byte is `opcode`
    pub fn count(&self, opcode: u8) -> usize {
        self.frames.iter().filter(|f| f[0] == opcode).count()
    }

    pub fn page(&self, page: usize) -> &[u8] {
        &self.mem[page * 256..(page + 1) * 256]
    }
}

pub struct FakeBus(pub Rc<RefCell<Chip>>);

pub struct FakeCs(pub Rc<RefCell<Chip>>);

impl spi::ErrorType for FakeBus {
    type Error = Infallible;
}

impl spi::SpiBus for FakeBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        for word in words {
            *word = chip.exchange(0x00);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        for word in words {
            chip.exchange(*word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        for i in 0..read.len().max(write.len()) {
            let incoming = chip.exchange(write.get(i).copied().unwrap_or(0x00));
            if let Some(word) = read.get_mut(i) {
                *word = incoming;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        for word in words {
            *word = chip.exchange(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl digital::ErrorType for FakeCs {
    type Error = Infallible;
}

impl digital::OutputPin for FakeCs {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().deselect();
        Ok(())
    }
}

pub type Device = ExclusiveDevice<FakeBus, FakeCs, NoDelay>;

pub fn device(pages: usize) -> (Device, Rc<RefCell<Chip>>) {
    let chip = Rc::new(RefCell::new(Chip::new(pages)));
    let device = ExclusiveDevice::new_no_delay(FakeBus(chip.clone()), FakeCs(chip.clone())).unwrap();
    (device, chip)
}

pub fn flash<const PAGES: u32>() -> (W25Q<PAGES, Device>, Rc<RefCell<Chip>>) {
    let (device, chip) = device(PAGES as usize);
    (W25Q::new(device), chip)
}

/// Fault reported by [`FailingAfter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

impl spi::Error for BusFault {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

/// Passes `remaining` transactions to the modeled chip, then fails every following one
pub struct FailingAfter {
    pub inner: Device,
    pub remaining: usize,
}

impl spi::ErrorType for FailingAfter {
    type Error = BusFault;
}

impl spi::SpiDevice for FailingAfter {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), BusFault> {
        self.remaining = self.remaining.checked_sub(1).ok_or(BusFault)?;
        self.inner.transaction(operations).map_err(|_| BusFault)
    }
}

pub fn failing_flash<const PAGES: u32>(
    remaining: usize,
) -> (W25Q<PAGES, FailingAfter>, Rc<RefCell<Chip>>) {
    let (inner, chip) = device(PAGES as usize);
    (W25Q::new(FailingAfter { inner, remaining }), chip)
}

/// EEPROM stand-in, erased cells read `0xFF`
pub struct Eeprom {
    pub cells: Vec<u8>,
    pub writes: usize,
}

impl Eeprom {
    pub fn new() -> Self {
        Self {
            cells: vec![0xFF; 64],
            writes: 0,
        }
    }

    /// Store holding a cursor at the default layout
    pub fn with_cursor(page: u16, offset: u8) -> Self {
        let mut eeprom = Self::new();
        eeprom.cells[10] = offset;
        eeprom.cells[11..13].copy_from_slice(&page.to_be_bytes());
        eeprom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromOutOfRange;

impl ReadStorage for Eeprom {
    type Error = EepromOutOfRange;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let cells = self
            .cells
            .get(start..start + bytes.len())
            .ok_or(EepromOutOfRange)?;
        bytes.copy_from_slice(cells);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.cells.len()
    }
}

impl Storage for Eeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let cells = self
            .cells
            .get_mut(start..start + bytes.len())
            .ok_or(EepromOutOfRange)?;
        cells.copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}
