/// Errors reported while bringing up or power cycling the ADC common block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A mandatory clock is missing or reports a zero rate.
    NoClockSource,
    /// No divider or prescaler brings the clock under the maximum rate.
    RateUnsatisfiable,
    /// The first interrupt line could not be acquired.
    NoInterruptSource,
    /// A syscfg register map access failed.
    RegisterAccessFailure,
    /// A syscfg "set" cell is configured without its "clear" counterpart.
    ConfigurationInconsistent(&'static str),
    /// A regulator refused to enable or to report its voltage.
    RegulatorFailure,
    /// A clock refused to enable.
    ClockFailure,
    /// An external trigger could not be registered or its line acquired.
    TriggerFailure,
    /// ADC instance index out of range.
    InvalidInstance,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoClockSource => f.write_str("no usable clock source"),
            Self::RateUnsatisfiable => f.write_str("no clock divider satisfies the maximum rate"),
            Self::NoInterruptSource => f.write_str("no interrupt line"),
            Self::RegisterAccessFailure => f.write_str("syscfg register access failed"),
            Self::ConfigurationInconsistent(why) => write!(f, "inconsistent configuration: {why}"),
            Self::RegulatorFailure => f.write_str("regulator failure"),
            Self::ClockFailure => f.write_str("clock enable failed"),
            Self::TriggerFailure => f.write_str("trigger registration failed"),
            Self::InvalidInstance => f.write_str("invalid ADC instance"),
        }
    }
}
