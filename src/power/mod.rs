//! Power sequencing of the ADC common block.
//!
//! Enable order is: analog switch supplies, vref, bus clock, analog clock,
//! then the common control register is restored. A failure unwinds the steps
//! already taken in reverse order. Stopping backs up the common control
//! register first, since it may not survive the low power state.

pub mod switches;

use crate::clock::{ClockPlan, ClockRates};
use crate::hw::{Clock, Platform, RegisterBank, Regulator};
use crate::regs::CommonRegs;
use crate::Error;

use self::switches::{AnalogSwitches, SwitchSetting, SyscfgCells};

/// Power state of the common block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Everything off.
    Stopped,
    /// `hw_start` in progress.
    Starting,
    /// Supplies and clocks on, control register restored.
    Running,
    /// `hw_stop` in progress.
    Stopping,
}

/// Last step of the enable sequence that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Off,
    Switches,
    Vref,
    BusClock,
    AnalogClock,
}

/// Supplies and clocks of the common block.
pub struct PowerSequencer<P: Platform> {
    vref: P::Regulator,
    bclk: Option<P::Clock>,
    aclk: Option<P::Clock>,
    switches: AnalogSwitches<P::Regulator, P::Syscon>,
    delay: P::Delay,
    ccr_backup: u32,
    stage: Stage,
    state: PowerState,
}

impl<P: Platform> PowerSequencer<P> {
    /// Create a sequencer. Nothing is enabled until [`hw_start`](Self::hw_start).
    pub fn new(
        vref: P::Regulator,
        vdda: Option<P::Regulator>,
        vdd: Option<P::Regulator>,
        aclk: Option<P::Clock>,
        bclk: Option<P::Clock>,
        syscfg: SyscfgCells<P::Syscon>,
        delay: P::Delay,
    ) -> Self {
        Self {
            vref,
            bclk,
            aclk,
            switches: AnalogSwitches::new(vdda, vdd, syscfg),
            delay,
            ccr_backup: 0,
            stage: Stage::Off,
            state: PowerState::Stopped,
        }
    }

    /// Current power state.
    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Common control register value saved by the last [`hw_stop`](Self::hw_stop).
    pub fn ccr_backup(&self) -> u32 {
        self.ccr_backup
    }

    /// Analog switch setting in use, if the feature is wired.
    pub fn switch_setting(&self) -> Option<SwitchSetting> {
        self.switches.setting()
    }

    /// Reference voltage in µV.
    pub fn vref_uv(&self) -> Result<u32, Error> {
        self.vref.voltage_uv()
    }

    /// Rates of the clocks that are wired.
    pub fn clock_rates(&self) -> ClockRates {
        ClockRates {
            analog: self.aclk.as_ref().map(|c| c.rate()),
            bus: self.bclk.as_ref().map(|c| c.rate()),
        }
    }

    /// Power up and restore the common control register.
    ///
    /// When `plan` is given, its clock fields are programmed over the
    /// restored value. Calling this while running does nothing.
    pub fn hw_start<B: RegisterBank>(
        &mut self,
        bank: &B,
        regs: &CommonRegs,
        plan: Option<&ClockPlan>,
    ) -> Result<(), Error> {
        if self.state == PowerState::Running {
            return Ok(());
        }

        self.state = PowerState::Starting;
        if let Err(e) = self.power_up() {
            self.power_down();
            self.state = PowerState::Stopped;
            return Err(e);
        }

        let ccr = plan.map_or(self.ccr_backup, |p| p.apply(self.ccr_backup));
        bank.write(regs.ccr, ccr);
        trace!("ADC common: restored CCR {:#x}", ccr);

        self.state = PowerState::Running;
        Ok(())
    }

    /// Back up the common control register and power down.
    ///
    /// Only what the last [`hw_start`](Self::hw_start) acquired is released.
    pub fn hw_stop<B: RegisterBank>(&mut self, bank: &B, regs: &CommonRegs) {
        if self.state != PowerState::Running {
            return;
        }

        self.state = PowerState::Stopping;
        self.ccr_backup = bank.read(regs.ccr);
        self.power_down();
        self.state = PowerState::Stopped;
    }

    fn power_up(&mut self) -> Result<(), Error> {
        self.switches.enable(&mut self.delay)?;
        self.stage = Stage::Switches;

        if let Err(e) = self.vref.enable() {
            error!("vref enable failed: {:?}", e);
            return Err(e);
        }
        self.stage = Stage::Vref;

        if let Some(bclk) = self.bclk.as_mut() {
            if let Err(e) = bclk.enable() {
                error!("bus clk enable failed: {:?}", e);
                return Err(e);
            }
        }
        self.stage = Stage::BusClock;

        if let Some(aclk) = self.aclk.as_mut() {
            if let Err(e) = aclk.enable() {
                error!("adc clk enable failed: {:?}", e);
                return Err(e);
            }
        }
        self.stage = Stage::AnalogClock;

        Ok(())
    }

    fn power_down(&mut self) {
        if self.stage >= Stage::AnalogClock {
            if let Some(aclk) = self.aclk.as_mut() {
                aclk.disable();
            }
        }
        if self.stage >= Stage::BusClock {
            if let Some(bclk) = self.bclk.as_mut() {
                bclk.disable();
            }
        }
        if self.stage >= Stage::Vref {
            self.vref.disable();
        }
        if self.stage >= Stage::Switches {
            self.switches.disable();
        }
        self.stage = Stage::Off;
    }
}
