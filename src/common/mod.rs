//! ADC common block core.
//!
//! [`AdcCommon`] owns the resources shared by the ADC instances of a block.
//! Bring-up order is: power, reference voltage, analog clock, interrupt
//! demultiplexer, triggers. A failing step undoes the previous ones, and
//! [`remove`](AdcCommon::remove) (or dropping the core) tears everything down
//! in reverse.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use heapless::Vec;

use crate::clock::{select_clock, ClockPlan, ClockSelection};
use crate::config::{Config, Variant, VariantCfg};
use crate::hw::Platform;
use crate::irq::{ConversionKind, Demux, VirtualIrq, VirtualLine};
use crate::power::switches::{SwitchSetting, SyscfgCells};
use crate::power::{PowerSequencer, PowerState};
use crate::regs::MAX_ADCS;
use crate::time::Hertz;
use crate::trigger::{DeviceId, Trigger, TriggerNode, TriggerRegistrar, MAX_TRIGGERS};
use crate::Error;


/// Hardware handles of a common block.
pub struct Resources<P: Platform> {
    /// ADC block registers.
    pub bank: P::Bank,
    /// Reference voltage supply.
    pub vref: P::Regulator,
    /// Analog supply, needed to control the analog switches.
    pub vdda: Option<P::Regulator>,
    /// Digital supply, an alternative supply for the analog switches.
    pub vdd: Option<P::Regulator>,
    /// Dedicated ("adc") analog clock.
    pub aclk: Option<P::Clock>,
    /// Bus clock.
    pub bclk: Option<P::Clock>,
    /// Syscfg controls of the analog switches.
    pub syscfg: SyscfgCells<P::Syscon>,
    /// Physical interrupt lines. The first one is mandatory.
    pub irqs: [Option<P::Irq>; MAX_ADCS],
    /// Declared EXTI triggers.
    pub triggers: Vec<TriggerNode<P::Irq>, MAX_TRIGGERS>,
    /// Delay provider.
    pub delay: P::Delay,
}

/// Lock serializing injected conversions of one ADC instance.
pub type InjectedLock = Mutex<CriticalSectionRawMutex, ()>;

/// Shared core of up to three ADC instances.
pub struct AdcCommon<P: Platform> {
    bank: P::Bank,
    config: Config,
    cfg: &'static VariantCfg,
    power: PowerSequencer<P>,
    clock: Option<ClockSelection>,
    vref_mv: u32,
    demux: Demux<P::Irq>,
    triggers: TriggerRegistrar<P::Irq>,
    injected: [InjectedLock; MAX_ADCS],
}

impl<P: Platform> AdcCommon<P> {
    /// Bring up the common block.
    ///
    /// Either everything succeeds, or whatever was acquired is released and
    /// the error of the failing step is returned.
    pub fn new(config: Config, resources: Resources<P>) -> Result<Self, Error> {
        let Resources {
            bank,
            vref,
            vdda,
            vdd,
            aclk,
            bclk,
            syscfg,
            irqs,
            mut triggers,
            delay,
        } = resources;

        let cfg = config.variant.cfg();
        if let Err(e) = syscfg.check_pairs(cfg.has_syscfg_clr) {
            error!("Can't probe syscfg: {}", e);
            return Err(e);
        }

        let mut core = Self {
            bank,
            cfg,
            power: PowerSequencer::new(vref, vdda, vdd, aclk, bclk, syscfg, delay),
            clock: None,
            vref_mv: 0,
            demux: Demux::new(),
            triggers: TriggerRegistrar::new(config.device, config.children.clone()),
            injected: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
            config,
        };

        match core.probe(irqs, &mut triggers) {
            Ok(()) => Ok(core),
            Err(e) => {
                core.teardown();
                Err(e)
            }
        }
    }

    fn probe(&mut self, irqs: [Option<P::Irq>; MAX_ADCS], nodes: &mut [TriggerNode<P::Irq>]) -> Result<(), Error> {
        self.power.hw_start(&self.bank, self.cfg.regs, None)?;

        let vref_uv = self.power.vref_uv().map_err(|e| {
            error!("vref get voltage failed, {}", e);
            e
        })?;
        self.vref_mv = vref_uv / 1000;
        debug!("vref+={}mV", self.vref_mv);

        let max = self.config.max_clk_rate();
        let selection = select_clock(self.cfg.clock, self.power.clock_rates(), max)?;
        selection.write(&self.bank, self.cfg.regs);
        self.clock = Some(selection);

        self.demux.install(irqs)?;

        self.triggers.probe(self.config.name, self.cfg.exti_trigs, nodes)?;

        info!(
            "{} ready: {} kHz analog clock, vref {} mV",
            self.config.name,
            selection.rate.to_khz(),
            self.vref_mv
        );
        Ok(())
    }

    fn teardown(&mut self) {
        self.triggers.release();
        self.demux.teardown();
        self.power.hw_stop(&self.bank, self.cfg.regs);
    }

    /// Tear the core down: triggers, interrupt lines, then power.
    pub fn remove(self) {
        drop(self);
    }

    /// Hardware generation.
    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    /// Effective analog clock rate.
    pub fn rate(&self) -> Hertz {
        self.clock.map_or(Hertz(0), |c| c.rate)
    }

    /// Clock mode and divider programmed in the common control register.
    pub fn clock_plan(&self) -> Option<ClockPlan> {
        self.clock.map(|c| c.plan)
    }

    /// Maximum analog clock rate in use.
    pub fn max_clk_rate(&self) -> Hertz {
        self.config.max_clk_rate()
    }

    /// Reference voltage in mV, read once at bring-up.
    pub fn vref_mv(&self) -> u32 {
        self.vref_mv
    }

    /// Analog switch setting, when switch control is wired.
    pub fn switch_setting(&self) -> Option<SwitchSetting> {
        self.power.switch_setting()
    }

    /// Virtual interrupt line for `kind` events of ADC `instance`.
    pub fn virtual_line(&self, instance: usize, kind: ConversionKind) -> Result<VirtualIrq<'_>, Error> {
        let line = VirtualLine::new(instance, kind)?;
        Ok(self.demux.line(line))
    }

    /// Chained interrupt handler. Call it from every physical ADC interrupt.
    ///
    /// Returns the bitmask of virtual lines an event was delivered to.
    pub fn on_interrupt(&self) -> u8 {
        self.demux.dispatch(&self.bank, self.cfg.regs)
    }

    /// Registered triggers.
    pub fn triggers(&self) -> &[Trigger<P::Irq>] {
        self.triggers.triggers()
    }

    /// Trigger registered under `name`.
    pub fn trigger(&self, name: &str) -> Option<&Trigger<P::Irq>> {
        self.triggers.find(name)
    }

    /// Whether ADC instance `device` may use `trigger`.
    pub fn belongs_to_this_core(&self, trigger: &Trigger<P::Irq>, device: DeviceId) -> bool {
        self.triggers.belongs_to_this_core(trigger, device)
    }

    /// Lock held by ADC `instance` while it runs injected conversions.
    pub fn injected_lock(&self, instance: usize) -> Result<&InjectedLock, Error> {
        self.injected.get(instance).ok_or(Error::InvalidInstance)
    }

    /// Current power state.
    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    /// Power up again after [`hw_stop`](Self::hw_stop), restoring the common
    /// control register and the clock setting.
    pub fn hw_start(&mut self) -> Result<(), Error> {
        let plan = self.clock.as_ref().map(|c| &c.plan);
        self.power.hw_start(&self.bank, self.cfg.regs, plan)
    }

    /// Save the common control register and power down.
    pub fn hw_stop(&mut self) {
        self.power.hw_stop(&self.bank, self.cfg.regs);
    }
}

impl<P: Platform> Drop for AdcCommon<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}
