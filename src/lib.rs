#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! ## Feature flags
#![doc = document_features::document_features!(
    feature_label = r#"<span class="stab portability"><code>{feature}</code></span>"#
)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod clock;
pub mod common;
pub mod config;
mod error;
pub mod hw;
pub mod irq;
pub mod power;
pub mod regs;
pub mod time;
pub mod trigger;

#[cfg(test)]
pub(crate) mod mock;

pub use common::{AdcCommon, Resources};
pub use config::{Config, Variant};
pub use error::Error;
pub use irq::{ConversionKind, VirtualIrq, VirtualLine};
pub use power::PowerState;
pub use time::Hertz;
pub use trigger::{DeviceId, Trigger};
