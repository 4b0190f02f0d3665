//! Interrupt demultiplexer.
//!
//! All ADC instances of a block share one or two physical interrupt lines and
//! report their events in the common status register. The demultiplexer reads
//! that register once per interrupt and forwards each event to one of six
//! virtual lines, one regular and one injected line per instance.
//!
//! An ADC instance may have EOC set while it services conversions with DMA
//! (EOC triggers the DMA request and the data register read clears it). Only
//! an instance with its EOC interrupt enabled gets the regular event
//! delivered. Injected conversions are never serviced by DMA.

use core::cell::Cell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::AtomicWaker;

use crate::hw::{InterruptLine, RegisterBank};
use crate::regs::{CommonRegs, MAX_ADCS};
use crate::Error;

/// Number of virtual interrupt lines.
pub const NR_VIRTUAL_LINES: usize = 2 * MAX_ADCS;

/// Conversion group an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionKind {
    /// Regular group.
    Regular = 0,
    /// Injected group.
    Injected = 1,
}

/// One of the six virtual interrupt lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VirtualLine {
    instance: u8,
    kind: ConversionKind,
}

impl VirtualLine {
    /// Line of `kind` events of ADC `instance`.
    pub const fn new(instance: usize, kind: ConversionKind) -> Result<Self, Error> {
        if instance >= MAX_ADCS {
            return Err(Error::InvalidInstance);
        }
        Ok(Self {
            instance: instance as u8,
            kind,
        })
    }

    /// Line mapped at `slot`.
    pub const fn from_slot(slot: usize) -> Option<Self> {
        if slot >= NR_VIRTUAL_LINES {
            return None;
        }
        let kind = if slot % 2 == 0 {
            ConversionKind::Regular
        } else {
            ConversionKind::Injected
        };
        Some(Self {
            instance: (slot / 2) as u8,
            kind,
        })
    }

    /// Slot number: `2 * instance + kind`.
    pub const fn slot(&self) -> usize {
        2 * self.instance as usize + self.kind as usize
    }

    /// ADC instance index.
    pub const fn instance(&self) -> usize {
        self.instance as usize
    }

    /// Conversion group.
    pub const fn kind(&self) -> ConversionKind {
        self.kind
    }
}

#[derive(Clone, Copy)]
struct SlotState {
    mapped: bool,
    pending: bool,
    handler: Option<fn(VirtualLine)>,
}

impl SlotState {
    const fn new() -> Self {
        Self {
            mapped: false,
            pending: false,
            handler: None,
        }
    }
}

struct Slot {
    waker: AtomicWaker,
    state: Mutex<CriticalSectionRawMutex, Cell<SlotState>>,
}

impl Slot {
    const fn new() -> Self {
        Self {
            waker: AtomicWaker::new(),
            state: Mutex::new(Cell::new(SlotState::new())),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut SlotState) -> R) -> R {
        self.state.lock(|s| {
            let mut state = s.get();
            let r = f(&mut state);
            s.set(state);
            r
        })
    }
}

/// Fans out the shared interrupt to the virtual lines.
pub struct Demux<I> {
    lines: [Option<I>; MAX_ADCS],
    slots: [Slot; NR_VIRTUAL_LINES],
    installed: bool,
}

impl<I: InterruptLine> Default for Demux<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: InterruptLine> Demux<I> {
    /// Demultiplexer with nothing mapped.
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const SLOT: Slot = Slot::new();
        Self {
            lines: [None, None, None],
            slots: [SLOT; NR_VIRTUAL_LINES],
            installed: false,
        }
    }

    /// Map the virtual lines and chain the physical ones.
    ///
    /// The first physical line is mandatory, the others are optional.
    pub fn install(&mut self, irqs: [Option<I>; MAX_ADCS]) -> Result<(), Error> {
        if irqs[0].is_none() {
            error!("failed to get irq");
            return Err(Error::NoInterruptSource);
        }

        for slot in &self.slots {
            slot.update(|s| *s = SlotState { mapped: true, ..SlotState::new() });
        }

        for (i, (line, irq)) in self.lines.iter_mut().zip(irqs).enumerate() {
            let Some(mut irq) = irq else {
                continue;
            };
            trace!("chaining irq line {}", i);
            irq.unpend();
            irq.enable();
            *line = Some(irq);
        }

        self.installed = true;
        Ok(())
    }

    /// Whether [`install`](Self::install) succeeded and no teardown happened since.
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Unmap every virtual line and detach the physical ones.
    ///
    /// Safe to call more than once and on a demultiplexer never installed.
    pub fn teardown(&mut self) {
        for slot in &self.slots {
            slot.update(|s| *s = SlotState::new());
            slot.waker.wake();
        }

        for line in self.lines.iter_mut() {
            if let Some(mut irq) = line.take() {
                irq.disable();
            }
        }

        self.installed = false;
    }

    /// Handle to a virtual line.
    pub fn line(&self, line: VirtualLine) -> VirtualIrq<'_> {
        VirtualIrq {
            line,
            slot: &self.slots[line.slot()],
        }
    }

    /// Chained handler body: read the status register once and deliver.
    ///
    /// Returns the bitmask of slots an event was delivered to.
    pub fn dispatch<B: RegisterBank>(&self, bank: &B, regs: &CommonRegs) -> u8 {
        let status = bank.read(regs.csr);
        let mut delivered = 0u8;

        for i in 0..MAX_ADCS {
            if status & regs.eoc[i] != 0 && bank.read(regs.ier_of(i)) & regs.eocie != 0 {
                delivered |= self.deliver(2 * i);
            }

            if status & regs.jeoc[i] != 0 {
                delivered |= self.deliver(2 * i + 1);
            }
        }

        delivered
    }

    fn deliver(&self, slot: usize) -> u8 {
        let s = &self.slots[slot];
        let handler = s.update(|state| {
            if !state.mapped {
                return None;
            }
            state.pending = true;
            Some(state.handler)
        });

        let Some(handler) = handler else {
            return 0;
        };

        s.waker.wake();
        if let (Some(handler), Some(line)) = (handler, VirtualLine::from_slot(slot)) {
            handler(line);
        }
        1 << slot
    }
}

/// A virtual interrupt line handed to an ADC instance.
pub struct VirtualIrq<'a> {
    line: VirtualLine,
    slot: &'a Slot,
}

impl VirtualIrq<'_> {
    /// The line this handle stands for.
    pub fn line(&self) -> VirtualLine {
        self.line
    }

    /// Virtual interrupt number.
    pub fn number(&self) -> usize {
        self.line.slot()
    }

    /// Whether the line is mapped.
    pub fn is_mapped(&self) -> bool {
        self.slot.state.lock(|s| s.get().mapped)
    }

    /// Handler called from the chained interrupt when an event is delivered.
    pub fn set_handler(&self, handler: Option<fn(VirtualLine)>) {
        self.slot.update(|s| s.handler = handler);
    }

    /// Consume a delivered event.
    pub fn take_pending(&self) -> bool {
        self.slot.update(|s| core::mem::replace(&mut s.pending, false))
    }

    /// Wait for the next event delivered to this line.
    ///
    /// An event delivered before the call completes the wait immediately.
    /// The wait also ends once the line is unmapped. Check
    /// [`is_mapped`](Self::is_mapped) to tell the two apart.
    pub async fn wait(&self) {
        poll_fn(|cx| {
            self.slot.waker.register(cx.waker());
            let (mapped, pending) = self
                .slot
                .update(|s| (s.mapped, core::mem::replace(&mut s.pending, false)));
            if pending || !mapped {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }
}
