//! Hardware variants and core configuration.

use heapless::Vec;

use crate::clock::ClockTopology;
use crate::regs::{CommonRegs, F4_COMMON_REGS, H7_COMMON_REGS, MAX_ADCS};
use crate::time::{mhz, Hertz};
use crate::trigger::{DeviceId, TriggerInfo, F4_EXTI_TRIGS, H7_EXTI_TRIGS};

/// Supported ADC common block generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    /// STM32F4: single analog clock, ADCPRE prescaler.
    Stm32F4,
    /// STM32H7: asynchronous or synchronous clocking.
    Stm32H7,
    /// STM32MP1: as STM32H7, with set/clear syscfg registers.
    Stm32Mp1,
}

/// Compile-time data of a [`Variant`].
#[derive(Debug)]
pub struct VariantCfg {
    /// Common register layout.
    pub regs: &'static CommonRegs,
    /// How the analog clock is derived.
    pub clock: ClockTopology,
    /// Maximum analog clock rate from the datasheet.
    pub max_clk_rate: Hertz,
    /// Syscfg bits are cleared through a separate clear register.
    pub has_syscfg_clr: bool,
    /// EXTI triggers wired to the trigger selection mux.
    pub exti_trigs: &'static [TriggerInfo],
}

static STM32F4_CFG: VariantCfg = VariantCfg {
    regs: &F4_COMMON_REGS,
    clock: ClockTopology::Adcpre,
    max_clk_rate: mhz(36),
    has_syscfg_clr: false,
    exti_trigs: &F4_EXTI_TRIGS,
};

static STM32H7_CFG: VariantCfg = VariantCfg {
    regs: &H7_COMMON_REGS,
    clock: ClockTopology::AsyncOrSync,
    max_clk_rate: mhz(36),
    has_syscfg_clr: false,
    exti_trigs: &H7_EXTI_TRIGS,
};

static STM32MP1_CFG: VariantCfg = VariantCfg {
    regs: &H7_COMMON_REGS,
    clock: ClockTopology::AsyncOrSync,
    max_clk_rate: mhz(40),
    has_syscfg_clr: true,
    exti_trigs: &H7_EXTI_TRIGS,
};

impl Variant {
    /// Variant data.
    pub fn cfg(self) -> &'static VariantCfg {
        match self {
            Self::Stm32F4 => &STM32F4_CFG,
            Self::Stm32H7 => &STM32H7_CFG,
            Self::Stm32Mp1 => &STM32MP1_CFG,
        }
    }

    /// Device tree compatible string.
    pub const fn compatible(self) -> &'static str {
        match self {
            Self::Stm32F4 => "st,stm32f4-adc-core",
            Self::Stm32H7 => "st,stm32h7-adc-core",
            Self::Stm32Mp1 => "st,stm32mp1-adc-core",
        }
    }

    /// Variant matching a device tree compatible string.
    pub fn from_compatible(compatible: &str) -> Option<Self> {
        [Self::Stm32F4, Self::Stm32H7, Self::Stm32Mp1]
            .into_iter()
            .find(|v| v.compatible() == compatible)
    }
}

/// Configuration of an [`AdcCommon`](crate::AdcCommon).
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Hardware generation.
    pub variant: Variant,
    /// Board limit on the analog clock rate. The datasheet limit of the
    /// variant still applies when this is higher.
    pub max_clk_rate: Option<Hertz>,
    /// Identity of the common block.
    pub device: DeviceId,
    /// Device name, used to name the triggers.
    pub name: &'static str,
    /// ADC instances attached to the common block.
    pub children: Vec<DeviceId, MAX_ADCS>,
}

impl Config {
    /// Configuration for a `variant` common block with no board overrides
    /// and no instances.
    pub fn new(variant: Variant, device: DeviceId, name: &'static str) -> Self {
        Self {
            variant,
            max_clk_rate: None,
            device,
            name,
            children: Vec::new(),
        }
    }

    /// Effective maximum analog clock rate.
    pub fn max_clk_rate(&self) -> Hertz {
        let max = self.variant.cfg().max_clk_rate;
        match self.max_clk_rate {
            Some(rate) => rate.min(max),
            None => max,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn compatibles() {
        assert_eq!(Variant::from_compatible("st,stm32mp1-adc-core"), Some(Variant::Stm32Mp1));
        assert_eq!(Variant::from_compatible("st,stm32f4-adc-core"), Some(Variant::Stm32F4));
        assert_eq!(Variant::from_compatible("st,stm32f7-adc-core"), None);
    }

    #[test]
    fn variant_data() {
        assert_eq!(Variant::Stm32F4.cfg().regs.ccr, 0x304);
        assert_eq!(Variant::Stm32H7.cfg().regs.ccr, 0x308);
        assert!(Variant::Stm32Mp1.cfg().has_syscfg_clr);
        assert!(!Variant::Stm32H7.cfg().has_syscfg_clr);
        assert_eq!(Variant::Stm32Mp1.cfg().max_clk_rate, mhz(40));
        assert_eq!(Variant::Stm32H7.cfg().exti_trigs[1].jextsel, 6);
    }

    #[test]
    fn max_rate_override_is_capped() {
        let mut config = Config::new(Variant::Stm32H7, DeviceId(0), "adc");
        assert_eq!(config.max_clk_rate(), mhz(36));
        config.max_clk_rate = Some(mhz(20));
        assert_eq!(config.max_clk_rate(), mhz(20));
        config.max_clk_rate = Some(mhz(50));
        assert_eq!(config.max_clk_rate(), mhz(36));
    }
}
