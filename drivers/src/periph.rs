/*++

Licensed under the Apache-2.0 license.

File Name:

    periph.rs

Abstract:

    File contains the watchdog, DMA lock, debug port, anti-tamper and status
    indicator seams, plus the applied-runtime-protection record.

--*/

use bulwark_error::BulwarkResult;

bitflags::bitflags! {
    /// Record of the run-time protections applied this boot
    pub struct RuntimeProtection : u32 {
        const WATCHDOG = 0x01;
        const MPU = 0x02;
        const DMA_LOCK = 0x04;
        const DEBUG_LOCK = 0x08;
        const TAMPER = 0x10;
    }
}

/// Independent watchdog. Once started it cannot be stopped, only refreshed.
pub trait Watchdog {
    fn wdt_start(&mut self, timeout_ms: u32) -> BulwarkResult<()>;

    fn wdt_refresh(&mut self) -> BulwarkResult<()>;
}

pub trait DmaLock {
    /// Gate the DMA controller clocks off.
    fn dma_disable(&mut self) -> BulwarkResult<()>;

    fn dma_is_disabled(&self) -> BulwarkResult<bool>;
}

pub trait DebugPort {
    /// Reconfigure the debug pins to input/no-pull.
    fn dap_lock(&mut self) -> BulwarkResult<()>;

    fn dap_is_locked(&self) -> BulwarkResult<bool>;
}

pub trait AntiTamper {
    /// Configure the anti-tamper input.
    fn tamper_configure(&mut self) -> BulwarkResult<()>;

    fn tamper_is_configured(&self) -> BulwarkResult<bool>;
}

/// What the status indicator is signalling. Carries no control semantics.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Indication {
    Startup,
    Download,
    Install,
    CriticalFailure,
    Halt,
}

pub trait StatusIndicator {
    fn indicate(&mut self, indication: Indication);
}
