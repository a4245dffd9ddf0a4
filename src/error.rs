use core::fmt::Debug;

use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

/// All possible errors emitted by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<SpiError> {
    /// Internal Spi error
    Spi(SpiError),

    /// Invalid value passed
    Value,

    /// Address out of bound
    OutOfBounds,

    /// Address not aligned
    NotAligned,

    /// The busy bit never cleared within the budget of a bounded [`crate::poll::PollStrategy`].
    /// The default strategy waits forever and never produces this.
    Timeout,
}

impl<E> From<NorFlashErrorKind> for Error<E> {
    fn from(e: NorFlashErrorKind) -> Self {
        match e {
            NorFlashErrorKind::NotAligned => Error::NotAligned,
            NorFlashErrorKind::OutOfBounds => Error::OutOfBounds,
            _ => Error::Value,
        }
    }
}

impl<SpiError> NorFlashError for Error<SpiError>
where
    SpiError: Debug,
{
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Error::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            Error::NotAligned => NorFlashErrorKind::NotAligned,
            Error::Value | Error::Spi(_) | Error::Timeout => NorFlashErrorKind::Other,
        }
    }
}

/// Errors emitted by the [`crate::allocator::PageAllocator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError<SpiError, StoreError> {
    /// The flash transaction failed
    Flash(Error<SpiError>),

    /// The cursor store could not be read or written
    Store(StoreError),

    /// Every page up to the end of the chip has been written. Nothing was sent to the chip.
    Full,
}

impl<SpiError, StoreError> From<Error<SpiError>> for LogError<SpiError, StoreError> {
    fn from(e: Error<SpiError>) -> Self {
        LogError::Flash(e)
    }
}
