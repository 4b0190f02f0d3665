//! Hardware collaborators used by the ADC common block.
//!
//! The core never talks to a clock tree, a regulator framework or an
//! interrupt controller directly. Each of those is reached through one of the
//! traits below, and a [`Platform`] ties the concrete types together.

use embedded_hal_1::delay::DelayNs;
use vcell::VolatileCell;

use crate::time::Hertz;
use crate::Error;

/// 32-bit register window covering the ADC instances and the common registers.
///
/// Offsets are in bytes from the start of the ADC block.
pub trait RegisterBank {
    /// Single bus read of the register at `offset`.
    fn read(&self, offset: u32) -> u32;

    /// Single bus write of the register at `offset`.
    fn write(&self, offset: u32, value: u32);

    /// Read-modify-write.
    fn modify(&self, offset: u32, f: impl FnOnce(u32) -> u32) {
        let value = self.read(offset);
        self.write(offset, f(value));
    }
}

/// Memory mapped register window.
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Create a register window at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of the ADC block, mapped and valid for
    /// 32-bit volatile accesses over the whole block, and no other owner may
    /// write the common registers.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn cell(&self, offset: u32) -> &VolatileCell<u32> {
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        unsafe { &*((self.base + offset as usize) as *const VolatileCell<u32>) }
    }
}

impl RegisterBank for Mmio {
    fn read(&self, offset: u32) -> u32 {
        self.cell(offset).get()
    }

    fn write(&self, offset: u32, value: u32) {
        self.cell(offset).set(value)
    }
}

/// A clock feeding the ADC block.
pub trait Clock {
    /// Current rate, `0` when unknown.
    fn rate(&self) -> Hertz;

    /// Prepare and enable the clock.
    fn enable(&mut self) -> Result<(), Error>;

    /// Disable and unprepare the clock.
    fn disable(&mut self);
}

/// A voltage regulator supplying the ADC block.
pub trait Regulator {
    /// Enable the supply.
    fn enable(&mut self) -> Result<(), Error>;

    /// Disable the supply.
    fn disable(&mut self);

    /// Output voltage in microvolts.
    fn voltage_uv(&self) -> Result<u32, Error>;
}

/// Register map of a system configuration controller (syscon).
pub trait Regmap {
    /// Masked read-modify-write: bits in `mask` take their value from `val`.
    fn update_bits(&self, reg: u32, mask: u32, val: u32) -> Result<(), Error>;

    /// Plain register write.
    fn write(&self, reg: u32, val: u32) -> Result<(), Error>;
}

impl<T: Regmap + ?Sized> Regmap for &T {
    fn update_bits(&self, reg: u32, mask: u32, val: u32) -> Result<(), Error> {
        T::update_bits(self, reg, mask, val)
    }

    fn write(&self, reg: u32, val: u32) -> Result<(), Error> {
        T::write(self, reg, val)
    }
}

/// A physical interrupt line at the interrupt controller.
pub trait InterruptLine {
    /// Clear a pending request.
    fn unpend(&mut self);

    /// Unmask the line.
    fn enable(&mut self);

    /// Mask the line.
    fn disable(&mut self);
}

/// Concrete collaborator types of a board.
pub trait Platform {
    /// ADC block registers.
    type Bank: RegisterBank;
    /// vref, vdda and vdd supplies.
    type Regulator: Regulator;
    /// Analog ("adc") and bus clocks.
    type Clock: Clock;
    /// Syscfg register map holding the booster and switch select bits.
    type Syscon: Regmap;
    /// ADC and EXTI interrupt lines.
    type Irq: InterruptLine;
    /// Delay used while the booster settles.
    type Delay: DelayNs;
}
