/// Instruction set used by the driver, see the "Instruction Set Table 1" of the datasheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Command {
    WriteEnable = 0x06,
    WriteDisable = 0x04,
    ReadStatus1 = 0x05,
    Read = 0x03,
    ProgramPage = 0x02,
    ChipErase = 0xC7,
    ReadJedecId = 0x9F,
}
