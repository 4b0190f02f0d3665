//! Analog clock selection.
//!
//! The ADC instances run from a common analog clock. Depending on the part,
//! that clock comes from a single input through a fixed prescaler (STM32F4),
//! or from either an asynchronous kernel clock or the synchronous bus clock
//! (STM32H7, STM32MP1). The selector picks the fastest setting that stays
//! under the maximum rate allowed by the datasheet.

use crate::hw::RegisterBank;
use crate::regs::{self, CommonRegs};
use crate::time::Hertz;
use crate::Error;

/// Clocking topology of a hardware variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockTopology {
    /// One mandatory analog clock, ADCPRE divider in {2, 4, 6, 8}.
    Adcpre,
    /// Mandatory bus clock, optional asynchronous kernel clock.
    AsyncOrSync,
}

/// Clock feeding the analog circuitry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// The dedicated "adc" clock.
    Analog,
    /// The "bus" clock.
    Bus,
}

/// Rates of the clocks available to the selector, `None` when not wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockRates {
    /// Rate of the dedicated analog clock.
    pub analog: Option<Hertz>,
    /// Rate of the bus clock.
    pub bus: Option<Hertz>,
}

/// Chosen clock mode and divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPlan {
    /// STM32F4 ADCPRE setting.
    Adcpre {
        /// ADCPRE field value.
        adcpre: u8,
        /// Division ratio.
        div: u8,
    },
    /// Asynchronous kernel clock with prescaler (CKMODE = 0).
    Async {
        /// PRESC field value.
        presc: u8,
        /// Division ratio.
        div: u16,
    },
    /// Synchronous bus clock (CKMODE = 1, 2 or 3).
    Sync {
        /// CKMODE field value.
        ckmode: u8,
        /// Division ratio.
        div: u8,
    },
}

impl ClockPlan {
    /// Division ratio applied to the source clock.
    pub const fn divider(&self) -> u32 {
        match *self {
            Self::Adcpre { div, .. } => div as u32,
            Self::Async { div, .. } => div as u32,
            Self::Sync { div, .. } => div as u32,
        }
    }

    /// Clock the plan divides.
    pub const fn source(&self) -> ClockSource {
        match self {
            Self::Adcpre { .. } | Self::Async { .. } => ClockSource::Analog,
            Self::Sync { .. } => ClockSource::Bus,
        }
    }

    /// Encode the plan into a common control register value, keeping
    /// unrelated bits of `ccr`.
    pub const fn apply(&self, ccr: u32) -> u32 {
        match *self {
            Self::Adcpre { adcpre, .. } => {
                (ccr & !regs::F4_ADCPRE_MASK) | ((adcpre as u32) << regs::F4_ADCPRE_SHIFT)
            }
            Self::Async { presc, .. } => {
                (ccr & !(regs::H7_CKMODE_MASK | regs::H7_PRESC_MASK)) | ((presc as u32) << regs::H7_PRESC_SHIFT)
            }
            Self::Sync { ckmode, .. } => {
                (ccr & !(regs::H7_CKMODE_MASK | regs::H7_PRESC_MASK)) | ((ckmode as u32) << regs::H7_CKMODE_SHIFT)
            }
        }
    }
}

/// Result of the selection: the plan and the analog clock rate it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSelection {
    /// Chosen mode and divider.
    pub plan: ClockPlan,
    /// Effective analog clock rate.
    pub rate: Hertz,
}

impl ClockSelection {
    /// Program the plan into the common control register.
    pub fn write<B: RegisterBank>(&self, bank: &B, regs: &CommonRegs) {
        bank.modify(regs.ccr, |ccr| self.plan.apply(ccr));
    }
}

const F4_ADCPRE_DIV: [u8; 4] = [2, 4, 6, 8];

/// Asynchronous prescaler ratios, indexed by PRESC.
const H7_ASYNC_DIV: [u16; 12] = [1, 2, 4, 6, 8, 10, 12, 16, 32, 64, 128, 256];

/// Synchronous ratios, indexed by CKMODE - 1.
const H7_SYNC_DIV: [u8; 3] = [1, 2, 4];

/// Pick a clock plan for `topology` so that the analog clock does not exceed
/// `max`. Dividers are scanned in increasing order, the first match wins.
pub fn select_clock(topology: ClockTopology, rates: ClockRates, max: Hertz) -> Result<ClockSelection, Error> {
    let selection = match topology {
        ClockTopology::Adcpre => select_adcpre(rates, max)?,
        ClockTopology::AsyncOrSync => select_async_or_sync(rates, max)?,
    };

    debug!(
        "Using {:?} clock/{} source at {} kHz",
        selection.plan.source(),
        selection.plan.divider(),
        selection.rate.to_khz()
    );

    Ok(selection)
}

fn nonzero(rate: Option<Hertz>) -> Option<Hertz> {
    rate.filter(|r| r.0 != 0)
}

fn select_adcpre(rates: ClockRates, max: Hertz) -> Result<ClockSelection, Error> {
    let Some(rate) = nonzero(rates.analog) else {
        error!("No usable 'adc' clock found");
        return Err(Error::NoClockSource);
    };

    F4_ADCPRE_DIV
        .iter()
        .enumerate()
        .find(|(_, div)| rate / **div as u32 <= max)
        .map(|(adcpre, &div)| ClockSelection {
            plan: ClockPlan::Adcpre {
                adcpre: adcpre as u8,
                div,
            },
            rate: rate / div as u32,
        })
        .ok_or_else(|| {
            error!("adc clk selection failed");
            Error::RateUnsatisfiable
        })
}

fn select_async_or_sync(rates: ClockRates, max: Hertz) -> Result<ClockSelection, Error> {
    let Some(bus) = nonzero(rates.bus) else {
        error!("No usable 'bus' clock found");
        return Err(Error::NoClockSource);
    };

    if let Some(analog) = rates.analog {
        if analog.0 == 0 {
            error!("Invalid adc clock rate: 0");
            return Err(Error::NoClockSource);
        }

        let found = H7_ASYNC_DIV
            .iter()
            .enumerate()
            .find(|(_, div)| analog / **div as u32 <= max);

        if let Some((presc, &div)) = found {
            return Ok(ClockSelection {
                plan: ClockPlan::Async {
                    presc: presc as u8,
                    div,
                },
                rate: analog / div as u32,
            });
        }

        trace!("adc clock too fast for any async prescaler, trying bus clock");
    }

    H7_SYNC_DIV
        .iter()
        .enumerate()
        .find(|(_, div)| bus / **div as u32 <= max)
        .map(|(i, &div)| ClockSelection {
            plan: ClockPlan::Sync {
                ckmode: i as u8 + 1,
                div,
            },
            rate: bus / div as u32,
        })
        .ok_or_else(|| {
            error!("adc clk selection failed");
            Error::RateUnsatisfiable
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::MockBank;
    use crate::regs::{F4_COMMON_REGS, H7_COMMON_REGS};
    use crate::time::mhz;

    fn rates(analog: Option<u32>, bus: Option<u32>) -> ClockRates {
        ClockRates {
            analog: analog.map(Hertz),
            bus: bus.map(Hertz),
        }
    }

    #[test]
    fn adcpre_picks_smallest_divider() {
        let sel = select_clock(ClockTopology::Adcpre, rates(Some(84_000_000), None), mhz(36)).unwrap();
        assert_eq!(sel.plan, ClockPlan::Adcpre { adcpre: 1, div: 4 });
        assert_eq!(sel.rate, mhz(21));

        let sel = select_clock(ClockTopology::Adcpre, rates(Some(60_000_000), None), mhz(36)).unwrap();
        assert_eq!(sel.plan, ClockPlan::Adcpre { adcpre: 0, div: 2 });
        assert_eq!(sel.rate, mhz(30));
    }

    #[test]
    fn adcpre_requires_analog_clock() {
        let bus_only = rates(None, Some(84_000_000));
        assert_eq!(
            select_clock(ClockTopology::Adcpre, bus_only, mhz(36)),
            Err(Error::NoClockSource)
        );
        assert_eq!(
            select_clock(ClockTopology::Adcpre, rates(Some(0), None), mhz(36)),
            Err(Error::NoClockSource)
        );
    }

    #[test]
    fn adcpre_unsatisfiable() {
        assert_eq!(
            select_clock(ClockTopology::Adcpre, rates(Some(400_000_000), None), mhz(36)),
            Err(Error::RateUnsatisfiable)
        );
    }

    #[test]
    fn async_preferred_when_available() {
        let sel = select_clock(
            ClockTopology::AsyncOrSync,
            rates(Some(80_000_000), Some(200_000_000)),
            mhz(36),
        )
        .unwrap();
        assert_eq!(sel.plan, ClockPlan::Async { presc: 2, div: 4 });
        assert_eq!(sel.plan.source(), ClockSource::Analog);
        assert_eq!(sel.rate, mhz(20));
    }

    #[test]
    fn sync_fallback_unsatisfiable() {
        assert_eq!(
            select_clock(ClockTopology::AsyncOrSync, rates(None, Some(200_000_000)), mhz(36)),
            Err(Error::RateUnsatisfiable)
        );
    }

    #[test]
    fn sync_fallback() {
        let sel = select_clock(ClockTopology::AsyncOrSync, rates(None, Some(100_000_000)), mhz(36)).unwrap();
        assert_eq!(sel.plan, ClockPlan::Sync { ckmode: 3, div: 4 });
        assert_eq!(sel.rate, mhz(25));
    }

    #[test]
    fn sync_fallback_with_analog_present() {
        // 400 MHz / 256 is still above 1 MHz.
        let sel = select_clock(
            ClockTopology::AsyncOrSync,
            rates(Some(400_000_000), Some(4_000_000)),
            mhz(1),
        )
        .unwrap();
        assert_eq!(sel.plan, ClockPlan::Sync { ckmode: 3, div: 4 });
        assert_eq!(sel.plan.source(), ClockSource::Bus);
        assert_eq!(sel.rate, mhz(1));
    }

    #[test]
    fn bus_clock_is_mandatory() {
        assert_eq!(
            select_clock(ClockTopology::AsyncOrSync, rates(Some(80_000_000), None), mhz(36)),
            Err(Error::NoClockSource)
        );
        assert_eq!(
            select_clock(ClockTopology::AsyncOrSync, rates(Some(0), Some(100_000_000)), mhz(36)),
            Err(Error::NoClockSource)
        );
    }

    #[test]
    fn chosen_divider_is_minimal() {
        for topology in [ClockTopology::Adcpre, ClockTopology::AsyncOrSync] {
            for rate in (1..=60).map(|r| r * 7_000_000) {
                for max in [mhz(14), mhz(36), mhz(40)] {
                    let available = rates(Some(rate), Some(rate));
                    let Ok(sel) = select_clock(topology, available, max) else {
                        continue;
                    };
                    assert!(sel.rate <= max);
                    assert_eq!(sel.rate, Hertz(rate) / sel.plan.divider());
                    let table: &[u32] = match topology {
                        ClockTopology::Adcpre => &[2, 4, 6, 8],
                        ClockTopology::AsyncOrSync => &[1, 2, 4, 6, 8, 10, 12, 16, 32, 64, 128, 256],
                    };
                    for &smaller in table.iter().filter(|&&d| d < sel.plan.divider()) {
                        assert!(Hertz(rate) / smaller > max);
                    }
                    assert_eq!(select_clock(topology, available, max), Ok(sel));
                }
            }
        }
    }

    #[test]
    fn write_preserves_unrelated_bits() {
        let bank = MockBank::new();
        bank.write(H7_COMMON_REGS.ccr, 0x00C0_0000 | H7_CKMODE_AND_PRESC);
        let sel = ClockSelection {
            plan: ClockPlan::Async { presc: 2, div: 4 },
            rate: mhz(20),
        };
        sel.write(&bank, &H7_COMMON_REGS);
        assert_eq!(bank.read(H7_COMMON_REGS.ccr), 0x00C0_0000 | (2 << 18));

        bank.write(F4_COMMON_REGS.ccr, 0x0080_0000 | (3 << 16));
        let sel = ClockSelection {
            plan: ClockPlan::Adcpre { adcpre: 1, div: 4 },
            rate: mhz(21),
        };
        sel.write(&bank, &F4_COMMON_REGS);
        assert_eq!(bank.read(F4_COMMON_REGS.ccr), 0x0080_0000 | (1 << 16));
    }

    const H7_CKMODE_AND_PRESC: u32 = regs::H7_CKMODE_MASK | regs::H7_PRESC_MASK;

    #[test]
    fn sync_plan_clears_prescaler() {
        let plan = ClockPlan::Sync { ckmode: 2, div: 2 };
        assert_eq!(plan.apply(H7_CKMODE_AND_PRESC | 1), (2 << 16) | 1);
    }
}
