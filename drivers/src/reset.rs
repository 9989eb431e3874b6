/*++

Licensed under the Apache-2.0 license.

File Name:

    reset.rs

Abstract:

    File contains the reset cause classification seam.

--*/

/// Why the device last reset. Logged at startup; none individually fatal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResetCause {
    PowerOn,
    Pin,
    BrownOut,
    Software,
    Watchdog,
    LowPower,
    OptionByteReload,
    Unknown,
}

pub trait ResetControl {
    /// Read the reset cause and clear the hardware flags.
    fn reset_cause(&mut self) -> ResetCause;
}
