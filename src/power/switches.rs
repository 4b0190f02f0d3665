//! Analog switch supply.
//!
//! On STM32H7 and STM32MP1 the ADC inputs go through analog switches that
//! lose performance when their supply drops below 2.7 V. They can either be
//! boosted (more power) or, on STM32MP1, be supplied from VDD when VDD is high
//! enough. Both controls live in SYSCFG and are optional.

use embedded_hal_1::delay::DelayNs;

use crate::hw::{Regmap, Regulator};
use crate::Error;

/// Below this supply (in µV) the analog switches need help.
pub const SWITCH_SUPPLY_MIN_UV: u32 = 2_700_000;

/// Time for the booster output to settle.
pub const BOOSTER_SETTLE_US: u32 = 50;

/// A bit field in a syscfg register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscfgCell<M> {
    /// Register map holding the field.
    pub regmap: M,
    /// Register offset within the map.
    pub reg: u32,
    /// Field mask.
    pub mask: u32,
}

impl<M> SyscfgCell<M> {
    /// Describe the `mask` bits of register `reg` in `regmap`.
    pub const fn new(regmap: M, reg: u32, mask: u32) -> Self {
        Self { regmap, reg, mask }
    }
}

/// Syscfg controls of the analog switches. Any of them may be absent.
///
/// On parts with set/clear register pairs (STM32MP1), the `_clr` cells
/// point at the write-one-to-clear registers.
pub struct SyscfgCells<M> {
    /// BOOSTE / EN_BOOSTER.
    pub booster: Option<SyscfgCell<M>>,
    /// EN_BOOSTER clear register.
    pub booster_clr: Option<SyscfgCell<M>>,
    /// ANASWVDD.
    pub anaswvdd: Option<SyscfgCell<M>>,
    /// ANASWVDD clear register.
    pub anaswvdd_clr: Option<SyscfgCell<M>>,
}

impl<M> Default for SyscfgCells<M> {
    fn default() -> Self {
        Self {
            booster: None,
            booster_clr: None,
            anaswvdd: None,
            anaswvdd_clr: None,
        }
    }
}

impl<M> SyscfgCells<M> {
    /// Check that every configured set cell has its clear cell, when the part
    /// uses set/clear pairs.
    pub fn check_pairs(&self, has_syscfg_clr: bool) -> Result<(), Error> {
        if !has_syscfg_clr {
            return Ok(());
        }
        if self.booster.is_some() && self.booster_clr.is_none() {
            return Err(Error::ConfigurationInconsistent("booster set cell without clear cell"));
        }
        if self.anaswvdd.is_some() && self.anaswvdd_clr.is_none() {
            return Err(Error::ConfigurationInconsistent("anaswvdd set cell without clear cell"));
        }
        Ok(())
    }
}

/// Booster and switch supply selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchSetting {
    /// EN_BOOSTER.
    pub booster: bool,
    /// ANASWVDD: supply the switches from VDD.
    pub anaswvdd: bool,
}

/// Recommended switch settings for the measured supplies.
///
/// - vdda > 2.7 V: switches supplied by vdda, nothing enabled
/// - vdda <= 2.7 V and vdd < 2.7 V: booster
/// - vdda <= 2.7 V and vdd >= 2.7 V: switches supplied by vdd
pub const fn switch_setting(vdda_uv: u32, vdd_uv: u32) -> SwitchSetting {
    if vdda_uv > SWITCH_SUPPLY_MIN_UV {
        SwitchSetting {
            booster: false,
            anaswvdd: false,
        }
    } else if vdd_uv < SWITCH_SUPPLY_MIN_UV {
        SwitchSetting {
            booster: true,
            anaswvdd: false,
        }
    } else {
        SwitchSetting {
            booster: false,
            anaswvdd: true,
        }
    }
}

/// Register operation used to program a syscfg field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOp {
    /// Masked update of the set cell to the given state.
    Update(bool),
    /// Write the mask to the clear cell.
    Clear,
}

/// Setting a field, or clearing it without a clear cell, is a masked update.
/// Clearing with a clear cell writes to the clear cell.
pub const fn cell_op(enable: bool, has_clear: bool) -> CellOp {
    if enable || !has_clear {
        CellOp::Update(enable)
    } else {
        CellOp::Clear
    }
}

fn program<M: Regmap>(set: &SyscfgCell<M>, clr: Option<&SyscfgCell<M>>, enable: bool) -> Result<(), Error> {
    match (cell_op(enable, clr.is_some()), clr) {
        (CellOp::Clear, Some(clr)) => clr.regmap.write(clr.reg, clr.mask),
        (op, _) => {
            let val = if op == CellOp::Update(true) { set.mask } else { 0 };
            set.regmap.update_bits(set.reg, set.mask, val)
        }
    }
}

/// Supplies and syscfg controls of the analog switches.
pub struct AnalogSwitches<R, M> {
    vdda: Option<R>,
    vdd: Option<R>,
    cells: SyscfgCells<M>,
    vdda_on: bool,
    vdd_on: bool,
    setting: Option<SwitchSetting>,
}

impl<R: Regulator, M: Regmap> AnalogSwitches<R, M> {
    /// Analog switches supplied by `vdda`, optionally by `vdd`.
    pub fn new(vdda: Option<R>, vdd: Option<R>, cells: SyscfgCells<M>) -> Self {
        Self {
            vdda,
            vdd,
            cells,
            vdda_on: false,
            vdd_on: false,
            setting: None,
        }
    }

    /// Whether there is anything to control: a vdda supply and a booster.
    pub fn is_configured(&self) -> bool {
        self.vdda.is_some() && self.cells.booster.is_some()
    }

    fn uses_vdd(&self) -> bool {
        self.vdd.is_some() && self.cells.anaswvdd.is_some()
    }

    /// Setting applied by the last successful [`enable`](Self::enable).
    pub fn setting(&self) -> Option<SwitchSetting> {
        self.setting
    }

    /// Power the switch supplies and program booster and supply selection.
    ///
    /// On failure, everything done so far is undone.
    pub fn enable(&mut self, delay: &mut impl DelayNs) -> Result<(), Error> {
        if !self.is_configured() {
            debug!("analog switches: nothing to do");
            return Ok(());
        }

        let vdda_uv = self.enable_vdda()?;
        let vdd_uv = match self.enable_vdd() {
            Ok(uv) => uv,
            Err(e) => {
                self.release_supplies();
                return Err(e);
            }
        };

        let setting = switch_setting(vdda_uv, vdd_uv);
        debug!(
            "vdda={}, vdd={}, setting: en_booster={}, anaswvdd={}",
            vdda_uv, vdd_uv, setting.booster, setting.anaswvdd
        );

        if let Err(e) = self.program_booster(setting.booster) {
            error!("can't access voltage booster: {:?}", e);
            self.release_supplies();
            return Err(e);
        }

        if setting.booster {
            delay.delay_us(BOOSTER_SETTLE_US);
        }

        if let Err(e) = self.program_anaswvdd(setting.anaswvdd) {
            error!("can't access anaswvdd: {:?}", e);
            if self.program_booster(false).is_err() {
                warn!("can't clear voltage booster");
            }
            self.release_supplies();
            return Err(e);
        }

        self.setting = Some(setting);
        Ok(())
    }

    /// Clear switch supply selection and booster, then release the supplies.
    pub fn disable(&mut self) {
        if !self.is_configured() || !self.vdda_on {
            return;
        }

        if self.program_anaswvdd(false).is_err() {
            warn!("can't clear anaswvdd");
        }
        if self.program_booster(false).is_err() {
            warn!("can't clear voltage booster");
        }

        self.setting = None;
        self.release_supplies();
    }

    fn enable_vdda(&mut self) -> Result<u32, Error> {
        let Some(vdda) = self.vdda.as_mut() else {
            return Ok(0);
        };

        if let Err(e) = vdda.enable() {
            error!("vdda enable failed: {:?}", e);
            return Err(e);
        }
        self.vdda_on = true;

        match vdda.voltage_uv() {
            Ok(uv) => Ok(uv),
            Err(e) => {
                error!("vdda get voltage failed: {:?}", e);
                vdda.disable();
                self.vdda_on = false;
                Err(e)
            }
        }
    }

    fn enable_vdd(&mut self) -> Result<u32, Error> {
        if !self.uses_vdd() {
            return Ok(0);
        }
        let Some(vdd) = self.vdd.as_mut() else {
            return Ok(0);
        };

        if let Err(e) = vdd.enable() {
            error!("vdd enable failed: {:?}", e);
            return Err(e);
        }
        self.vdd_on = true;

        match vdd.voltage_uv() {
            Ok(uv) => Ok(uv),
            Err(e) => {
                error!("vdd get voltage failed: {:?}", e);
                vdd.disable();
                self.vdd_on = false;
                Err(e)
            }
        }
    }

    fn release_supplies(&mut self) {
        if self.vdd_on {
            if let Some(vdd) = self.vdd.as_mut() {
                vdd.disable();
            }
            self.vdd_on = false;
        }
        if self.vdda_on {
            if let Some(vdda) = self.vdda.as_mut() {
                vdda.disable();
            }
            self.vdda_on = false;
        }
    }

    fn program_booster(&self, enable: bool) -> Result<(), Error> {
        match &self.cells.booster {
            Some(set) => program(set, self.cells.booster_clr.as_ref(), enable),
            None => Ok(()),
        }
    }

    fn program_anaswvdd(&self, enable: bool) -> Result<(), Error> {
        match &self.cells.anaswvdd {
            Some(set) => program(set, self.cells.anaswvdd_clr.as_ref(), enable),
            None => Ok(()),
        }
    }
}
