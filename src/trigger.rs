//! External trigger registrar.
//!
//! An EXTI line is hard wired as an input of the ADC trigger selection mux
//! (EXTSEL / JEXTSEL). The EXTI interrupt itself is never used, the ADC end
//! of conversion interrupt is. So each EXTI trigger line is acquired, armed
//! and masked right away, leaving the GPIO to EXTI to ADC path configured.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::hw::InterruptLine;
use crate::regs::MAX_ADCS;
use crate::Error;

/// Maximum number of triggers a core registers.
pub const MAX_TRIGGERS: usize = 4;

/// Maximum length of a trigger name.
pub const TRIGGER_NAME_LEN: usize = 32;

/// EXTSEL / JEXTSEL value selecting EXTI line 11 / 15 on STM32F4.
pub const STM32_EXT15: u8 = 15;

/// EXTSEL / JEXTSEL value selecting EXTI line 11 / 15 on STM32H7 and STM32MP1.
pub const STM32_EXT6: u8 = 6;

/// Conversion group a trigger starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerKind {
    /// Starts regular conversions.
    Regular,
    /// Starts injected conversions.
    Injected,
}

/// Static description of an EXTI trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerInfo {
    /// Trigger name, matched against the declared trigger nodes.
    pub name: &'static str,
    /// Regular trigger selection.
    pub extsel: u8,
    /// Injected trigger selection.
    pub jextsel: u8,
    /// Group the trigger starts.
    pub kind: TriggerKind,
}

/// STM32F4 EXTI triggers.
pub static F4_EXTI_TRIGS: [TriggerInfo; 2] = [
    TriggerInfo {
        name: "exti11",
        extsel: STM32_EXT15,
        jextsel: 0,
        kind: TriggerKind::Regular,
    },
    TriggerInfo {
        name: "exti15",
        extsel: 0,
        jextsel: STM32_EXT15,
        kind: TriggerKind::Injected,
    },
];

/// STM32H7 and STM32MP1 EXTI triggers.
pub static H7_EXTI_TRIGS: [TriggerInfo; 2] = [
    TriggerInfo {
        name: "exti11",
        extsel: STM32_EXT6,
        jextsel: 0,
        kind: TriggerKind::Regular,
    },
    TriggerInfo {
        name: "exti15",
        extsel: 0,
        jextsel: STM32_EXT6,
        kind: TriggerKind::Injected,
    },
];

/// Identity of a device: the common block or one of its ADC instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId(pub u32);

/// A trigger declared by the board, with the EXTI line it is wired to.
pub struct TriggerNode<I> {
    /// Name of the trigger this node provides, e.g. `"exti11"`.
    pub trigger_name: &'static str,
    /// EXTI interrupt line.
    pub irq: Option<I>,
}

impl<I> TriggerNode<I> {
    /// Node providing `trigger_name` on `irq`.
    pub fn new(trigger_name: &'static str, irq: Option<I>) -> Self {
        Self { trigger_name, irq }
    }
}

/// A registered trigger, usable by the ADC instances of its core.
pub struct Trigger<I> {
    name: String<TRIGGER_NAME_LEN>,
    info: &'static TriggerInfo,
    parent: DeviceId,
    irq: I,
}

impl<I: InterruptLine> Trigger<I> {
    /// Name: `<trigger>-<core device name>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trigger selection values.
    pub fn info(&self) -> &'static TriggerInfo {
        self.info
    }

    /// Core that registered the trigger.
    pub fn parent(&self) -> DeviceId {
        self.parent
    }

    /// EXTI line handler. The line stays masked, so this should never run.
    pub fn on_interrupt(&self) {}

    fn mask(&mut self) {
        self.irq.disable();
    }
}

/// Triggers registered by one core.
pub struct TriggerRegistrar<I> {
    device: DeviceId,
    children: Vec<DeviceId, MAX_ADCS>,
    triggers: Vec<Trigger<I>, MAX_TRIGGERS>,
}

impl<I: InterruptLine> TriggerRegistrar<I> {
    /// Empty registrar for core `device` with ADC instances `children`.
    pub fn new(device: DeviceId, children: Vec<DeviceId, MAX_ADCS>) -> Self {
        Self {
            device,
            children,
            triggers: Vec::new(),
        }
    }

    /// Register every trigger of `infos` for which a node is declared.
    ///
    /// Nodes are matched by trigger name. The matching node's line is taken,
    /// armed and masked. On error, triggers registered so far are kept; call
    /// [`release`](Self::release) to drop them.
    pub fn probe(
        &mut self,
        dev_name: &str,
        infos: &'static [TriggerInfo],
        nodes: &mut [TriggerNode<I>],
    ) -> Result<(), Error> {
        for info in infos {
            for node in nodes.iter_mut().filter(|n| n.trigger_name == info.name) {
                let mut name = String::new();
                if write!(name, "{}-{}", info.name, dev_name).is_err() {
                    error!("{} trig register failed", info.name);
                    return Err(Error::TriggerFailure);
                }

                let Some(mut irq) = node.irq.take() else {
                    error!("Can't get trigger irq");
                    return Err(Error::TriggerFailure);
                };
                irq.enable();

                let mut trigger = Trigger {
                    name,
                    info,
                    parent: self.device,
                    irq,
                };
                trigger.mask();

                if self.triggers.push(trigger).is_err() {
                    error!("{} trig register failed", info.name);
                    return Err(Error::TriggerFailure);
                }
            }
        }

        Ok(())
    }

    /// Drop every registered trigger.
    pub fn release(&mut self) {
        self.triggers.clear();
    }

    /// Registered triggers, in registration order.
    pub fn triggers(&self) -> &[Trigger<I>] {
        &self.triggers
    }

    /// Trigger registered under `name`.
    pub fn find(&self, name: &str) -> Option<&Trigger<I>> {
        self.triggers.iter().find(|t| t.name() == name)
    }

    /// Whether `device` may use `trigger`: the trigger was registered by
    /// this core and `device` is one of its ADC instances.
    pub fn belongs_to_this_core(&self, trigger: &Trigger<I>, device: DeviceId) -> bool {
        trigger.parent == self.device && self.children.contains(&device)
    }
}
