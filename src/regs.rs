//! Register layout of the ADC common block.
//!
//! The block maps up to three ADC instances at [`ADC_OFFSET`] strides,
//! followed by the registers shared by all of them at [`COMMON_OFFSET`].

use static_assertions::const_assert;

/// Maximum number of ADC instances sharing a common block.
pub const MAX_ADCS: usize = 3;

/// Stride between ADC instances.
pub const ADC_OFFSET: u32 = 0x100;

/// Offset of the common registers.
pub const COMMON_OFFSET: u32 = 0x300;

/// Offset of the registers of ADC instance `instance`.
pub const fn instance_offset(instance: usize) -> u32 {
    ADC_OFFSET * instance as u32
}

bitflags::bitflags! {
    /// STM32F4 common status register (ADC_CSR).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct F4Csr: u32 {
        /// ADC1 analog watchdog.
        const AWD1 = 1 << 0;
        /// ADC1 end of conversion.
        const EOC1 = 1 << 1;
        /// ADC1 injected end of conversion.
        const JEOC1 = 1 << 2;
        /// ADC1 overrun.
        const OVR1 = 1 << 5;
        /// ADC2 analog watchdog.
        const AWD2 = 1 << 8;
        /// ADC2 end of conversion.
        const EOC2 = 1 << 9;
        /// ADC2 injected end of conversion.
        const JEOC2 = 1 << 10;
        /// ADC2 overrun.
        const OVR2 = 1 << 13;
        /// ADC3 analog watchdog.
        const AWD3 = 1 << 16;
        /// ADC3 end of conversion.
        const EOC3 = 1 << 17;
        /// ADC3 injected end of conversion.
        const JEOC3 = 1 << 18;
        /// ADC3 overrun.
        const OVR3 = 1 << 21;
    }
}

bitflags::bitflags! {
    /// STM32H7 / STM32MP1 common status register (ADC_CSR).
    ///
    /// Only the master (ADC1) and slave (ADC2) instances report here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct H7Csr: u32 {
        /// Master end of conversion.
        const EOC_MST = 1 << 2;
        /// Master overrun.
        const OVR_MST = 1 << 4;
        /// Master injected end of sequence.
        const JEOS_MST = 1 << 6;
        /// Master analog watchdog 1.
        const AWD1_MST = 1 << 7;
        /// Master analog watchdog 2.
        const AWD2_MST = 1 << 8;
        /// Master analog watchdog 3.
        const AWD3_MST = 1 << 9;
        /// Slave end of conversion.
        const EOC_SLV = 1 << 18;
        /// Slave overrun.
        const OVR_SLV = 1 << 20;
        /// Slave injected end of sequence.
        const JEOS_SLV = 1 << 22;
        /// Slave analog watchdog 1.
        const AWD1_SLV = 1 << 23;
        /// Slave analog watchdog 2.
        const AWD2_SLV = 1 << 24;
        /// Slave analog watchdog 3.
        const AWD3_SLV = 1 << 25;
    }
}

const F4_EOC1: u32 = F4Csr::EOC1.union(F4Csr::AWD1).union(F4Csr::OVR1).bits();
const F4_EOC2: u32 = F4Csr::EOC2.union(F4Csr::AWD2).union(F4Csr::OVR2).bits();
const F4_EOC3: u32 = F4Csr::EOC3.union(F4Csr::AWD3).union(F4Csr::OVR3).bits();
const F4_JEOC1: u32 = F4Csr::JEOC1.union(F4Csr::AWD1).bits();
const F4_JEOC2: u32 = F4Csr::JEOC2.union(F4Csr::AWD2).bits();
const F4_JEOC3: u32 = F4Csr::JEOC3.union(F4Csr::AWD3).bits();

const H7_AWD_MST: H7Csr = H7Csr::AWD1_MST.union(H7Csr::AWD2_MST).union(H7Csr::AWD3_MST);
const H7_AWD_SLV: H7Csr = H7Csr::AWD1_SLV.union(H7Csr::AWD2_SLV).union(H7Csr::AWD3_SLV);
const H7_EOC1: u32 = H7Csr::EOC_MST.union(H7Csr::OVR_MST).union(H7_AWD_MST).bits();
const H7_EOC2: u32 = H7Csr::EOC_SLV.union(H7Csr::OVR_SLV).union(H7_AWD_SLV).bits();
const H7_JEOC1: u32 = H7Csr::JEOS_MST.union(H7_AWD_MST).bits();
const H7_JEOC2: u32 = H7Csr::JEOS_SLV.union(H7_AWD_SLV).bits();

// Events of one instance must never be reported to another.
const_assert!((F4_EOC1 | F4_JEOC1) & (F4_EOC2 | F4_JEOC2) == 0);
const_assert!((F4_EOC1 | F4_JEOC1) & (F4_EOC3 | F4_JEOC3) == 0);
const_assert!((F4_EOC2 | F4_JEOC2) & (F4_EOC3 | F4_JEOC3) == 0);
const_assert!((H7_EOC1 | H7_JEOC1) & (H7_EOC2 | H7_JEOC2) == 0);

/// STM32F4 ADC_CR1, per instance.
pub const F4_ADC_CR1: u32 = 0x04;
/// STM32F4 end of conversion interrupt enable in ADC_CR1.
pub const F4_EOCIE: u32 = 1 << 5;
/// STM32F4 common control register.
pub const F4_ADC_CCR: u32 = COMMON_OFFSET + 0x04;
/// ADCPRE field of the STM32F4 common control register.
pub const F4_ADCPRE_SHIFT: u32 = 16;
/// ADCPRE field mask.
pub const F4_ADCPRE_MASK: u32 = 0b11 << F4_ADCPRE_SHIFT;

/// STM32H7 ADC_IER, per instance.
pub const H7_ADC_IER: u32 = 0x04;
/// STM32H7 end of conversion interrupt enable in ADC_IER.
pub const H7_EOCIE: u32 = 1 << 2;
/// STM32H7 common control register.
pub const H7_ADC_CCR: u32 = COMMON_OFFSET + 0x08;
/// PRESC field of the STM32H7 common control register.
pub const H7_PRESC_SHIFT: u32 = 18;
/// PRESC field mask.
pub const H7_PRESC_MASK: u32 = 0xf << H7_PRESC_SHIFT;
/// CKMODE field of the STM32H7 common control register.
pub const H7_CKMODE_SHIFT: u32 = 16;
/// CKMODE field mask.
pub const H7_CKMODE_MASK: u32 = 0b11 << H7_CKMODE_SHIFT;

/// Common registers and per-instance event masks of one hardware variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonRegs {
    /// Common status register offset.
    pub csr: u32,
    /// Common control register offset.
    pub ccr: u32,
    /// Regular end of conversion (or error) flags of each instance in `csr`.
    pub eoc: [u32; MAX_ADCS],
    /// Injected end of conversion (or error) flags of each instance in `csr`.
    pub jeoc: [u32; MAX_ADCS],
    /// Interrupt enable register offset, relative to each instance.
    pub ier: u32,
    /// End of conversion interrupt enable bit in `ier`.
    pub eocie: u32,
}

impl CommonRegs {
    /// Offset of the interrupt enable register of `instance`.
    pub const fn ier_of(&self, instance: usize) -> u32 {
        instance_offset(instance) + self.ier
    }
}

/// STM32F4 common registers.
pub static F4_COMMON_REGS: CommonRegs = CommonRegs {
    csr: COMMON_OFFSET,
    ccr: F4_ADC_CCR,
    eoc: [F4_EOC1, F4_EOC2, F4_EOC3],
    jeoc: [F4_JEOC1, F4_JEOC2, F4_JEOC3],
    ier: F4_ADC_CR1,
    eocie: F4_EOCIE,
};

/// STM32H7 and STM32MP1 common registers.
pub static H7_COMMON_REGS: CommonRegs = CommonRegs {
    csr: COMMON_OFFSET,
    ccr: H7_ADC_CCR,
    eoc: [H7_EOC1, H7_EOC2, 0],
    jeoc: [H7_JEOC1, H7_JEOC2, 0],
    ier: H7_ADC_IER,
    eocie: H7_EOCIE,
};
