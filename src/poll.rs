//! Strategies deciding what happens between two status register reads while the chip is busy.
//!
//! [`Spin`] re-reads the status register immediately and never gives up, which is what the chip
//! needs for a chip erase of unknown length. [`Bounded`] and [`Sleep`] are opt-in and make
//! [`crate::blocking::W25Q::poll_until_ready`] fail with [`crate::error::Error::Timeout`] once
//! their budget runs out.

use core::cmp::min;

use embedded_hal::delay::DelayNs;

/// What to do while the chip reports busy
pub trait PollStrategy {
    /// Called once at the start of every wait, before the first status read.
    fn start(&mut self) {}

    /// Called after each status read that reported busy. Returning `false` abandons the wait.
    fn keep_waiting(&mut self) -> bool;
}

impl<T: PollStrategy + ?Sized> PollStrategy for &mut T {
    fn start(&mut self) {
        T::start(self)
    }

    fn keep_waiting(&mut self) -> bool {
        T::keep_waiting(self)
    }
}

/// Tight loop without any upper bound.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default)]
pub struct Spin;

impl PollStrategy for Spin {
    fn keep_waiting(&mut self) -> bool {
        true
    }
}

/// Tight loop giving up after `max_polls` busy reads.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy)]
pub struct Bounded {
    max_polls: u32,
    remaining: u32,
}

impl Bounded {
    /// Give up after `max_polls` busy reads in a single wait
    pub const fn new(max_polls: u32) -> Self {
        Self {
            max_polls,
            remaining: max_polls,
        }
    }
}

impl PollStrategy for Bounded {
    fn start(&mut self) {
        self.remaining = self.max_polls;
    }

    fn keep_waiting(&mut self) -> bool {
        match self.remaining.checked_sub(1) {
            Some(remaining) => {
                self.remaining = remaining;
                true
            }
            None => false,
        }
    }
}

/// Sleeps `interval_us` between reads, so the bus is free for the rest of the system.
/// Without a timeout it waits forever like [`Spin`].
pub struct Sleep<D> {
    delay: D,
    interval_us: u32,
    timeout_us: Option<u32>,
    elapsed_us: u32,
}

impl<D: DelayNs> Sleep<D> {
    /// Sleep `interval_us` with `delay` after every busy read, without any bound
    pub fn new(delay: D, interval_us: u32) -> Self {
        Self {
            delay,
            interval_us,
            timeout_us: None,
            elapsed_us: 0,
        }
    }

    /// Give up once `timeout_us` have been slept in a single wait. The last sleep is shortened so the
    /// total never goes past the timeout.
    pub fn with_timeout_us(mut self, timeout_us: u32) -> Self {
        self.timeout_us = Some(timeout_us);
        self
    }

    /// Give back the delay
    pub fn release(self) -> D {
        self.delay
    }
}

impl<D: DelayNs> PollStrategy for Sleep<D> {
    fn start(&mut self) {
        self.elapsed_us = 0;
    }

    fn keep_waiting(&mut self) -> bool {
        let step = match self.timeout_us {
            Some(timeout_us) if self.elapsed_us >= timeout_us => return false,
            Some(timeout_us) => min(self.interval_us, timeout_us - self.elapsed_us),
            None => self.interval_us,
        };
        self.delay.delay_us(step);
        self.elapsed_us = self.elapsed_us.saturating_add(step);
        true
    }
}
