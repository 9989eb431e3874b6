/*++

Licensed under the Apache-2.0 license.

File Name:

    protect.rs

Abstract:

    File contains the protection configurator. The static pass drives the
    non-volatile option bytes toward the engine target and either leaves the
    system already correct or never returns; the run-time pass is redone
    every boot. Every check-or-apply credits the protection flow counter by
    its step, and the accumulator is compared against exact totals at the
    three checkpoints.

--*/

use bulwark_drivers::memory_layout::{
    ACTIVATION_RAM_ORG, ACTIVATION_RAM_SIZE, ACTIVE_1_ORG, ACTIVE_SLOT_SIZE, ENGINE_ORG,
    ENGINE_SIZE, STACK_ORG, STACK_SIZE,
};
use bulwark_drivers::{
    AntiTamper, DebugPort, DmaLock, Mpu, MpuRegion, ObConfig, OptionBytes, RdpLevel, RegionAccess,
    RuntimeProtection, Watchdog,
};
use bulwark_error::{BulwarkError, BulwarkResult};
use bulwark_flow_lib::{FlowCounter, FLOW_INIT};

use crate::machine::BootConfig;

//
// Protection flow steps. Distinct bits, so a missed or reordered step can
// never alias the expected total.
//
pub const STEP_FLASH_CFG: u32 = 0x0000_0010;
pub const STEP_WRP: u32 = 0x0000_0020;
pub const STEP_PCROP: u32 = 0x0000_0040;
pub const STEP_SECURE_MEM: u32 = 0x0000_0080;
pub const STEP_RDP: u32 = 0x0000_0100;

/// Credited in one lump when RDP level 2 makes the static checks
/// trivially satisfied.
pub const STEP_STATIC_LOCKED: u32 =
    STEP_FLASH_CFG + STEP_WRP + STEP_PCROP + STEP_SECURE_MEM + STEP_RDP;

pub const STEP_WDT: u32 = 0x0000_0200;
pub const STEP_MPU: u32 = 0x0000_0400;
pub const STEP_DMA: u32 = 0x0000_0800;
pub const STEP_DAP: u32 = 0x0000_1000;
pub const STEP_TAMPER: u32 = 0x0000_2000;

pub const STEP_MPU_VERIFY: u32 = 0x0000_4000;
pub const STEP_DMA_VERIFY: u32 = 0x0000_8000;
pub const STEP_DAP_VERIFY: u32 = 0x0001_0000;
pub const STEP_TAMPER_VERIFY: u32 = 0x0002_0000;
pub const STEP_OB_VERIFY: u32 = 0x0004_0000;

pub const TOTAL_AFTER_STATIC: u32 = FLOW_INIT + STEP_STATIC_LOCKED;
pub const TOTAL_AFTER_RUNTIME: u32 =
    TOTAL_AFTER_STATIC + STEP_WDT + STEP_MPU + STEP_DMA + STEP_DAP + STEP_TAMPER;
pub const TOTAL_AFTER_ESCALATED: u32 = TOTAL_AFTER_RUNTIME
    + STEP_OB_VERIFY
    + STEP_MPU_VERIFY
    + STEP_DMA_VERIFY
    + STEP_DAP_VERIFY
    + STEP_TAMPER_VERIFY;

/// Witness that RDP level 2 was observed.
///
/// The level is irreversible, so holding this certifies every other static
/// protection check is trivially satisfied; no code path re-implements a
/// check the hardware makes impossible to fail.
pub struct Rdp2 {
    _priv: (),
}

/// The MPU region table the engine runs under.
pub const MPU_REGION_TABLE: [MpuRegion; 4] = [
    // Engine code: execute, privileged only
    MpuRegion {
        org: ENGINE_ORG,
        size: ENGINE_SIZE,
        access: RegionAccess::from_bits_truncate(
            RegionAccess::READ.bits() | RegionAccess::EXECUTE.bits() | RegionAccess::PRIV_ONLY.bits(),
        ),
    },
    // Application slots: readable and executable at any privilege
    MpuRegion {
        org: ACTIVE_1_ORG,
        size: 2 * ACTIVE_SLOT_SIZE,
        access: RegionAccess::from_bits_truncate(
            RegionAccess::READ.bits() | RegionAccess::EXECUTE.bits(),
        ),
    },
    // Trusted stack: data only, privileged only
    MpuRegion {
        org: STACK_ORG,
        size: STACK_SIZE,
        access: RegionAccess::from_bits_truncate(
            RegionAccess::READ.bits() | RegionAccess::WRITE.bits() | RegionAccess::PRIV_ONLY.bits(),
        ),
    },
    // Activation region: writable until sealed by the gate
    MpuRegion {
        org: ACTIVATION_RAM_ORG,
        size: ACTIVATION_RAM_SIZE,
        access: RegionAccess::from_bits_truncate(
            RegionAccess::READ.bits() | RegionAccess::WRITE.bits() | RegionAccess::PRIV_ONLY.bits(),
        ),
    },
];

/// Static pass over the option bytes.
///
/// Snapshot once. RDP level 2 short-circuits everything and yields the
/// witness. Otherwise check-then-apply in fixed order with RDP last; if
/// anything was programmed, request the option-byte reload, which resets
/// the device.
pub fn check_apply_static(
    env: &mut impl OptionBytes,
    ctr: &mut FlowCounter,
) -> BulwarkResult<Option<Rdp2>> {
    let observed = env.ob_read()?;
    let target = ObConfig::engine_target();

    if observed.rdp == RdpLevel::L2 {
        cprintln!("[protect] rdp2 locked, static checks satisfied");
        ctr.advance(STEP_STATIC_LOCKED)?;
        ctr.check(TOTAL_AFTER_STATIC)?;
        return Ok(Some(Rdp2 { _priv: () }));
    }

    let mut desired = observed;
    let mut changed = false;

    // The bank configuration cannot be fixed while executing from flash.
    if observed.dual_bank != target.dual_bank {
        return Err(BulwarkError::PROTECT_FLASH_CONFIGURATION);
    }
    ctr.advance(STEP_FLASH_CFG)?;

    if !observed.wrp.covers(&target.wrp) {
        desired.wrp = target.wrp;
        changed = true;
    }
    ctr.advance(STEP_WRP)?;

    if !observed.pcrop.covers(&target.pcrop) {
        desired.pcrop = target.pcrop;
        changed = true;
    }
    ctr.advance(STEP_PCROP)?;

    if observed.secure_memory != target.secure_memory || observed.single_entry != target.single_entry
    {
        desired.secure_memory = target.secure_memory;
        desired.single_entry = target.single_entry;
        changed = true;
    }
    ctr.advance(STEP_SECURE_MEM)?;

    // RDP last, after every range is in place
    if observed.rdp < target.rdp {
        desired.rdp = target.rdp;
        changed = true;
    }
    ctr.advance(STEP_RDP)?;

    if changed {
        cprintln!("[protect] programming option bytes, reload follows");
        env.ob_program(&desired)
            .map_err(|_| BulwarkError::PROTECT_OPTION_BYTES_PROGRAM)?;
        env.ob_launch()?;
        // On hardware the reload reset means this line never runs
        return Err(BulwarkError::PROTECT_OPTION_BYTES_RELOAD);
    }

    ctr.check(TOTAL_AFTER_STATIC)?;
    Ok(None)
}

/// Initial run-time pass, privileged, early in boot. Applies everything.
pub fn apply_runtime_initial(
    env: &mut (impl Watchdog + Mpu + DmaLock + DebugPort + AntiTamper),
    config: &BootConfig,
    ctr: &mut FlowCounter,
    applied: &mut RuntimeProtection,
) -> BulwarkResult<()> {
    env.wdt_start(config.wdt_timeout_ms)
        .map_err(|_| BulwarkError::PROTECT_WATCHDOG_START)?;
    applied.insert(RuntimeProtection::WATCHDOG);
    ctr.advance(STEP_WDT)?;

    env.mpu_load_regions(&MPU_REGION_TABLE)
        .map_err(|_| BulwarkError::PROTECT_MPU_CONFIG)?;
    applied.insert(RuntimeProtection::MPU);
    ctr.advance(STEP_MPU)?;

    env.dma_disable()
        .map_err(|_| BulwarkError::PROTECT_DMA_LOCK)?;
    applied.insert(RuntimeProtection::DMA_LOCK);
    ctr.advance(STEP_DMA)?;

    env.dap_lock()
        .map_err(|_| BulwarkError::PROTECT_DEBUG_LOCK)?;
    applied.insert(RuntimeProtection::DEBUG_LOCK);
    ctr.advance(STEP_DAP)?;

    env.tamper_configure()
        .map_err(|_| BulwarkError::PROTECT_TAMPER_CONFIG)?;
    applied.insert(RuntimeProtection::TAMPER);
    ctr.advance(STEP_TAMPER)?;

    // TODO: clock and temperature monitor hooks belong here once the
    // corresponding seams exist.
    Ok(())
}

/// Escalated re-verification of the static protections. With the `Rdp2`
/// witness in hand there is nothing left to observe.
pub fn verify_static_escalated(
    env: &impl OptionBytes,
    rdp2: Option<&Rdp2>,
) -> BulwarkResult<()> {
    if rdp2.is_none() {
        let observed = env.ob_read()?;
        if observed != ObConfig::engine_target() {
            return Err(BulwarkError::BOOT_SECURITY_SAFETY_CHECK);
        }
    }
    Ok(())
}

// Verify-only re-checks. Never reprogram; a mismatch is an attack.

pub fn verify_mpu(env: &impl Mpu) -> BulwarkResult<()> {
    if !env.mpu_verify_regions(&MPU_REGION_TABLE)? {
        return Err(BulwarkError::PROTECT_MPU_VERIFY);
    }
    Ok(())
}

pub fn verify_dma(env: &impl DmaLock) -> BulwarkResult<()> {
    if !env.dma_is_disabled()? {
        return Err(BulwarkError::PROTECT_DMA_VERIFY);
    }
    Ok(())
}

pub fn verify_dap(env: &impl DebugPort) -> BulwarkResult<()> {
    if !env.dap_is_locked()? {
        return Err(BulwarkError::PROTECT_DEBUG_VERIFY);
    }
    Ok(())
}

pub fn verify_tamper(env: &impl AntiTamper) -> BulwarkResult<()> {
    if !env.tamper_is_configured()? {
        return Err(BulwarkError::PROTECT_TAMPER_VERIFY);
    }
    Ok(())
}

/// Per-transition protection spot-check, cheap enough to run every loop
/// iteration once the run-time pass applied.
pub fn spot_check(
    env: &(impl DmaLock + DebugPort + AntiTamper),
    applied: RuntimeProtection,
) -> BulwarkResult<()> {
    if applied.contains(RuntimeProtection::DMA_LOCK) {
        verify_dma(env)?;
    }
    if applied.contains(RuntimeProtection::DEBUG_LOCK) {
        verify_dap(env)?;
    }
    if applied.contains(RuntimeProtection::TAMPER) {
        verify_tamper(env)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_distinct_bits() {
        let steps = [
            STEP_FLASH_CFG,
            STEP_WRP,
            STEP_PCROP,
            STEP_SECURE_MEM,
            STEP_RDP,
            STEP_WDT,
            STEP_MPU,
            STEP_DMA,
            STEP_DAP,
            STEP_TAMPER,
            STEP_MPU_VERIFY,
            STEP_DMA_VERIFY,
            STEP_DAP_VERIFY,
            STEP_TAMPER_VERIFY,
            STEP_OB_VERIFY,
        ];
        let mut acc = 0u32;
        for step in steps {
            assert_eq!(step.count_ones(), 1);
            assert_eq!(acc & step, 0);
            acc |= step;
        }
    }

    #[test]
    fn test_ob_program_failure_reports_protect_code() {
        struct FailingOb;
        impl OptionBytes for FailingOb {
            fn ob_read(&self) -> BulwarkResult<ObConfig> {
                let mut ob = ObConfig::engine_target();
                ob.rdp = RdpLevel::L0;
                Ok(ob)
            }
            fn ob_program(&mut self, _cfg: &ObConfig) -> BulwarkResult<()> {
                Err(BulwarkError::FLASH_WRITE_NOT_ERASED)
            }
            fn ob_launch(&mut self) -> BulwarkResult<()> {
                Ok(())
            }
        }

        let mut ctr = FlowCounter::init();
        let result = check_apply_static(&mut FailingOb, &mut ctr);
        assert!(matches!(
            result,
            Err(err) if err == BulwarkError::PROTECT_OPTION_BYTES_PROGRAM
        ));
    }

    #[test]
    fn test_locked_step_matches_static_sum() {
        assert_eq!(
            STEP_STATIC_LOCKED,
            STEP_FLASH_CFG + STEP_WRP + STEP_PCROP + STEP_SECURE_MEM + STEP_RDP
        );
    }
}
