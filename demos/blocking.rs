//! Runs the log on a W25Q80 kept in RAM, the same calls work with any `SpiDevice` wired to a real chip.

use core::convert::Infallible;

use embedded_hal::spi::{ErrorType, Operation, SpiDevice};
use embedded_storage::{ReadStorage, Storage};
use w25q_log::{address::Page, allocator::PageAllocator, blocking::W25Q80, PAGE_LEN};

/// A never busy W25Q80 answering the handful of instructions the driver sends
struct RamChip {
    mem: Vec<u8>,
    write_enabled: bool,
}

impl RamChip {
    fn new() -> Self {
        Self {
            mem: vec![0xFF; 0x1000 * PAGE_LEN],
            write_enabled: false,
        }
    }

    fn answer(&self, frame: &[u8], index: usize) -> u8 {
        if index == 0 {
            return 0xFF;
        }
        let addr = |frame: &[u8]| {
            (frame[1] as usize) << 16 | (frame[2] as usize) << 8 | frame[3] as usize
        };
        match frame.first() {
            Some(0x9F) => [0xEF, 0x40, 0x14].get(index - 1).copied().unwrap_or(0xFF),
            Some(0x05) => (self.write_enabled as u8) << 1,
            Some(0x03) if index >= 4 => self.mem[addr(frame) + index - 4],
            _ => 0xFF,
        }
    }

    fn execute(&mut self, frame: &[u8]) {
        match frame.first() {
            Some(0x06) => self.write_enabled = true,
            Some(0x04) => self.write_enabled = false,
            Some(0xC7) if self.write_enabled => {
                self.mem.fill(0xFF);
                self.write_enabled = false;
            }
            Some(0x02) if self.write_enabled => {
                let start = (frame[1] as usize) << 16 | (frame[2] as usize) << 8;
                for (cell, byte) in self.mem[start..].iter_mut().zip(&frame[4..]) {
                    *cell &= byte;
                }
                self.write_enabled = false;
            }
            _ => {}
        }
    }
}

impl ErrorType for RamChip {
    type Error = Infallible;
}

impl SpiDevice for RamChip {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let mut frame = Vec::new();
        for op in operations {
            match op {
                Operation::Write(words) => frame.extend_from_slice(words),
                Operation::Read(words) => {
                    for word in words.iter_mut() {
                        frame.push(0);
                        *word = self.answer(&frame, frame.len() - 1);
                    }
                }
                Operation::TransferInPlace(words) => {
                    for word in words.iter_mut() {
                        frame.push(*word);
                        *word = self.answer(&frame, frame.len() - 1);
                    }
                }
                Operation::Transfer(read, write) => {
                    for (i, out) in write.iter().enumerate() {
                        frame.push(*out);
                        if let Some(word) = read.get_mut(i) {
                            *word = self.answer(&frame, frame.len() - 1);
                        }
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }
        self.execute(&frame);
        Ok(())
    }
}

/// Stand-in for the MCU's EEPROM
struct Eeprom([u8; 16]);

impl ReadStorage for Eeprom {
    type Error = Infallible;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Infallible> {
        let start = offset as usize;
        bytes.copy_from_slice(&self.0[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.0.len()
    }
}

impl Storage for Eeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Infallible> {
        let start = offset as usize;
        self.0[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

fn main() {
    let mut flash = W25Q80::new(RamChip::new());
    let (manufacturer, _, density) = flash.identify().unwrap();
    println!(
        "Manufacturer {:#04x}, {} bytes",
        manufacturer.0,
        density.bytes().unwrap_or(0)
    );

    let mut log = PageAllocator::new(flash, Eeprom([0xFF; 16]));

    // A blank EEPROM holds no valid cursor, start from a clean chip
    println!("Erasing chip");
    log.erase_all().unwrap();

    for byte in b"hello from the page log, this message spans more than one page. ".repeat(5) {
        log.append_byte(byte).unwrap();
    }
    let size = log.data_size().unwrap();
    println!("Stored {} bytes, cursor at {:?}", size, log.cursor().unwrap());

    let mut out = vec![0u8; size as usize];
    log.read_range(0, size - 1, &mut out).unwrap();
    println!("{}", String::from_utf8_lossy(&out[..64]));

    log.for_each_page(|page: Page, buff| {
        if buff[0] != 0xFF {
            println!("Page {} in use", page.0);
        }
    })
    .unwrap();

    println!("Example completed");
}
