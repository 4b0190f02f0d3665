//! Recording collaborators for tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal_1::delay::DelayNs;

use crate::hw::{Clock, InterruptLine, Platform, Regmap, RegisterBank, Regulator};
use crate::time::Hertz;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    RegulatorEnable(&'static str),
    RegulatorDisable(&'static str),
    ClockEnable(&'static str),
    ClockDisable(&'static str),
    /// Syscon `update_bits(reg, mask, val)`.
    Update(u32, u32, u32),
    /// Syscon `write(reg, val)`.
    Write(u32, u32),
    /// Delay in ns.
    Delay(u32),
    IrqUnpend(&'static str),
    IrqEnable(&'static str),
    IrqDisable(&'static str),
}

/// Shared, ordered record of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct Log(Rc<RefCell<Vec<Event>>>);

impl Log {
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Register bank backed by a map, unwritten registers read as zero.
#[derive(Debug, Clone, Default)]
pub struct MockBank {
    regs: Rc<RefCell<HashMap<u32, u32>>>,
    reads: Rc<RefCell<Vec<u32>>>,
}

impl MockBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offsets read so far, in order.
    pub fn reads(&self) -> Vec<u32> {
        self.reads.borrow().clone()
    }

    /// Forget the reads recorded so far.
    pub fn clear_reads(&self) {
        self.reads.borrow_mut().clear();
    }
}

impl RegisterBank for MockBank {
    fn read(&self, offset: u32) -> u32 {
        self.reads.borrow_mut().push(offset);
        self.regs.borrow().get(&offset).copied().unwrap_or(0)
    }

    fn write(&self, offset: u32, value: u32) {
        self.regs.borrow_mut().insert(offset, value);
    }
}

pub struct MockRegulator {
    log: Log,
    name: &'static str,
    uv: u32,
    fail_enable: bool,
    fail_voltage: bool,
}

impl MockRegulator {
    pub fn new(log: &Log, name: &'static str, uv: u32) -> Self {
        Self {
            log: log.clone(),
            name,
            uv,
            fail_enable: false,
            fail_voltage: false,
        }
    }

    pub fn fail_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    pub fn fail_voltage(mut self) -> Self {
        self.fail_voltage = true;
        self
    }
}

impl Regulator for MockRegulator {
    fn enable(&mut self) -> Result<(), Error> {
        if self.fail_enable {
            return Err(Error::RegulatorFailure);
        }
        self.log.push(Event::RegulatorEnable(self.name));
        Ok(())
    }

    fn disable(&mut self) {
        self.log.push(Event::RegulatorDisable(self.name));
    }

    fn voltage_uv(&self) -> Result<u32, Error> {
        if self.fail_voltage {
            return Err(Error::RegulatorFailure);
        }
        Ok(self.uv)
    }
}

pub struct MockClock {
    log: Log,
    name: &'static str,
    rate: u32,
    fail_enable: bool,
}

impl MockClock {
    pub fn new(log: &Log, name: &'static str, rate: u32) -> Self {
        Self {
            log: log.clone(),
            name,
            rate,
            fail_enable: false,
        }
    }

    pub fn fail_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }
}

impl Clock for MockClock {
    fn rate(&self) -> Hertz {
        Hertz(self.rate)
    }

    fn enable(&mut self) -> Result<(), Error> {
        if self.fail_enable {
            return Err(Error::ClockFailure);
        }
        self.log.push(Event::ClockEnable(self.name));
        Ok(())
    }

    fn disable(&mut self) {
        self.log.push(Event::ClockDisable(self.name));
    }
}

pub struct MockSyscon {
    log: Log,
    fail: bool,
}

impl MockSyscon {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            fail: false,
        }
    }

    /// Every access fails and nothing is recorded.
    pub fn failing(log: &Log) -> Self {
        Self {
            log: log.clone(),
            fail: true,
        }
    }
}

impl Regmap for MockSyscon {
    fn update_bits(&self, reg: u32, mask: u32, val: u32) -> Result<(), Error> {
        if self.fail {
            return Err(Error::RegisterAccessFailure);
        }
        self.log.push(Event::Update(reg, mask, val));
        Ok(())
    }

    fn write(&self, reg: u32, val: u32) -> Result<(), Error> {
        if self.fail {
            return Err(Error::RegisterAccessFailure);
        }
        self.log.push(Event::Write(reg, val));
        Ok(())
    }
}

pub struct MockIrq {
    log: Log,
    name: &'static str,
}

impl MockIrq {
    pub fn new(log: &Log, name: &'static str) -> Self {
        Self { log: log.clone(), name }
    }
}

impl InterruptLine for MockIrq {
    fn unpend(&mut self) {
        self.log.push(Event::IrqUnpend(self.name));
    }

    fn enable(&mut self) {
        self.log.push(Event::IrqEnable(self.name));
    }

    fn disable(&mut self) {
        self.log.push(Event::IrqDisable(self.name));
    }
}

pub struct MockDelay {
    log: Log,
}

impl MockDelay {
    pub fn new(log: &Log) -> Self {
        Self { log: log.clone() }
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(Event::Delay(ns));
    }
}

pub struct Mock;

impl Platform for Mock {
    type Bank = MockBank;
    type Regulator = MockRegulator;
    type Clock = MockClock;
    type Syscon = MockSyscon;
    type Irq = MockIrq;
    type Delay = MockDelay;
}
