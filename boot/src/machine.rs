/*++

Licensed under the Apache-2.0 license.

File Name:

    machine.rs

Abstract:

    File contains the boot state machine. Each loop iteration runs the
    security/safety check, executes the current state's handler and computes
    the next state; the loop terminates in exactly one of launch, forced
    reset or intentional halt. Context is threaded by value and rebuilt from
    scratch every boot.

--*/

use bulwark_drivers::memory_layout::{
    active_slot_entry, active_slot_org, dwl_slot_org, ACTIVE_SLOT_SIZE, DWL_SLOT_SIZE,
};
use bulwark_drivers::{Indication, Launched, Mcu, ResetCause, RuntimeProtection};
use bulwark_error::{BulwarkError, BulwarkResult};
use bulwark_flow_lib::{flow_launder, FlowCounter};
use bulwark_image_types::{
    ActiveSlot, DwlSlot, ImageHeader, InstallPlan, LoaderWord, ACTIVE_SLOT_COUNT,
    DEFAULT_DWL_SLOT, MASTER_SLOT,
};
use bulwark_image_verify::SlotVerifier;

use crate::gate;
use crate::print::HexWord;
use crate::protect;
use crate::protect::Rdp2;
use crate::selftest;

/// Engine configuration, threaded in by the firmware entry point.
#[derive(Debug, Copy, Clone)]
pub struct BootConfig {
    /// Whether a download path exists in this build
    pub loader_enabled: bool,

    /// Whether the embedded self-tests run during startup
    pub self_test: bool,

    pub wdt_timeout_ms: u32,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            loader_enabled: true,
            self_test: true,
            wdt_timeout_ms: 8000,
        }
    }
}

/// The boot states. Closed set; every state is handled exhaustively.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BootState {
    CheckStatusOnReset,
    CheckNewFirmwareToDownload,
    DownloadNewFirmware,
    VerifyFirmwareStatus,
    InstallNewFirmware,
    ResumeInstall,
    RollbackInstall,
    VerifyFirmwareSignature,
    ExecuteFirmware,
    HandleCriticalFailure,
    RebootStateMachine,
}

impl BootState {
    const fn bit(self) -> u16 {
        1 << self as u16
    }

    /// Only the download retry pair may be entered twice in one boot.
    const fn reenterable(self) -> bool {
        matches!(
            self,
            BootState::CheckNewFirmwareToDownload | BootState::VerifyFirmwareStatus
        )
    }

    fn name(self) -> &'static str {
        match self {
            BootState::CheckStatusOnReset => "check_status_on_reset",
            BootState::CheckNewFirmwareToDownload => "check_new_fw_to_download",
            BootState::DownloadNewFirmware => "download_new_fw",
            BootState::VerifyFirmwareStatus => "verify_fw_status",
            BootState::InstallNewFirmware => "install_new_fw",
            BootState::ResumeInstall => "resume_install",
            BootState::RollbackInstall => "rollback_install",
            BootState::VerifyFirmwareSignature => "verify_fw_signature",
            BootState::ExecuteFirmware => "execute_fw",
            BootState::HandleCriticalFailure => "handle_critical_failure",
            BootState::RebootStateMachine => "reboot_state_machine",
        }
    }
}

/// Terminal outcome of one boot. The caller performs the actual reset; on
/// hardware `Launch` is never observed because the jump diverges.
#[derive(Debug)]
pub enum BootOutcome {
    Launch(Launched),
    Reset(BulwarkError),
    Halt(BulwarkError),
}

enum Step {
    Next(BootState),
    Launch(Launched),
    Reset(BulwarkError),
    Halt(BulwarkError),
}

struct Ctx {
    current: BootState,
    visited: u16,
    initial_check_done: bool,
    protect_ctr: FlowCounter,
    applied: RuntimeProtection,
    rdp2: Option<Rdp2>,
    pending: Option<(ActiveSlot, DwlSlot)>,
    selected: Option<(ActiveSlot, ImageHeader)>,
    fail_code: Option<BulwarkError>,
    failed_in: BootState,
}

impl Ctx {
    fn new() -> Self {
        Self {
            current: BootState::CheckStatusOnReset,
            visited: BootState::CheckStatusOnReset.bit(),
            initial_check_done: false,
            protect_ctr: FlowCounter::init(),
            applied: RuntimeProtection::empty(),
            rdp2: None,
            pending: None,
            selected: None,
            fail_code: None,
            failed_in: BootState::CheckStatusOnReset,
        }
    }
}

/// Run the engine to its terminal outcome.
pub fn run<Env: Mcu>(env: &mut Env, config: &BootConfig) -> BootOutcome {
    let mut ctx = Ctx::new();
    env.indicate(Indication::Startup);

    loop {
        if let Err(err) = security_safety_check(env, config, &mut ctx) {
            cprintln!(
                "[machine] security/safety check failed: {}",
                HexWord(err.into())
            );
            return BootOutcome::Reset(err);
        }

        let step = match ctx.current {
            BootState::CheckStatusOnReset => check_status_on_reset(env, config),
            BootState::CheckNewFirmwareToDownload => check_new_fw_to_download(env, &ctx),
            BootState::DownloadNewFirmware => download_new_fw(env),
            BootState::VerifyFirmwareStatus => verify_fw_status(env, config, &mut ctx),
            BootState::InstallNewFirmware => install_new_fw(env, &ctx),
            BootState::ResumeInstall => resume_install(env, &ctx),
            BootState::RollbackInstall => rollback_install(env, &ctx),
            BootState::VerifyFirmwareSignature => verify_fw_signature(env, &mut ctx),
            BootState::ExecuteFirmware => execute_fw(env, &mut ctx),
            BootState::HandleCriticalFailure => handle_critical_failure(env, &ctx),
            BootState::RebootStateMachine => reboot_state_machine(&ctx),
        };

        match step {
            Ok(Step::Next(next)) => {
                if let Err(err) = transition(&mut ctx, next) {
                    if let Some(outcome) = fail(&mut ctx, err) {
                        return outcome;
                    }
                }
            }
            Ok(Step::Launch(launched)) => return BootOutcome::Launch(launched),
            Ok(Step::Reset(code)) => return BootOutcome::Reset(code),
            Ok(Step::Halt(code)) => {
                env.indicate(Indication::Halt);
                return BootOutcome::Halt(code);
            }
            Err(err) => {
                if let Some(outcome) = fail(&mut ctx, err) {
                    return outcome;
                }
            }
        }
    }
}

/// Per-transition gate: watchdog refresh plus a protection spot-check. The
/// very first run also performs the static and initial run-time protection
/// passes, before any state handler executes.
fn security_safety_check<Env: Mcu>(
    env: &mut Env,
    config: &BootConfig,
    ctx: &mut Ctx,
) -> BulwarkResult<()> {
    if !ctx.initial_check_done {
        ctx.rdp2 = protect::check_apply_static(env, &mut ctx.protect_ctr)?;
        protect::apply_runtime_initial(env, config, &mut ctx.protect_ctr, &mut ctx.applied)?;
        ctx.protect_ctr.check(protect::TOTAL_AFTER_RUNTIME)?;
        ctx.initial_check_done = true;
    } else {
        env.wdt_refresh()?;
        protect::spot_check(env, ctx.applied)?;
    }
    Ok(())
}

fn transition(ctx: &mut Ctx, next: BootState) -> BulwarkResult<()> {
    if ctx.visited & next.bit() != 0 && !next.reenterable() {
        return Err(BulwarkError::BOOT_STATE_REVISITED);
    }
    ctx.visited |= next.bit();
    cprintln!("[machine] {} -> {}", ctx.current.name(), next.name());
    ctx.current = next;
    Ok(())
}

/// Route a local failure into the critical-failure sink. A failure inside
/// the sink itself ends the boot directly.
fn fail(ctx: &mut Ctx, err: BulwarkError) -> Option<BootOutcome> {
    if matches!(
        ctx.current,
        BootState::HandleCriticalFailure | BootState::RebootStateMachine
    ) {
        return Some(BootOutcome::Reset(err));
    }
    ctx.fail_code = Some(err);
    ctx.failed_in = ctx.current;
    ctx.current = BootState::HandleCriticalFailure;
    ctx.visited |= BootState::HandleCriticalFailure.bit();
    None
}

fn check_status_on_reset<Env: Mcu>(env: &mut Env, config: &BootConfig) -> BulwarkResult<Step> {
    let cause = env.reset_cause();
    cprintln!("[machine] reset cause: {}", reset_cause_name(cause));

    if config.self_test {
        selftest::execute()?;
    }

    env.enter_unprivileged()?;

    let next = if config.loader_enabled && env.loader_available() {
        BootState::CheckNewFirmwareToDownload
    } else {
        BootState::VerifyFirmwareStatus
    };
    Ok(Step::Next(next))
}

fn check_new_fw_to_download<Env: Mcu>(env: &mut Env, ctx: &Ctx) -> BulwarkResult<Step> {
    // Re-entry from the status state means no executable firmware exists
    // anywhere; wait for a download unconditionally.
    let first_pass = ctx.visited & BootState::VerifyFirmwareStatus.bit() == 0;
    if !first_pass {
        return Ok(Step::Next(BootState::DownloadNewFirmware));
    }

    let word = match LoaderWord::try_from(env.loader_word_read()) {
        Ok(word) => word,
        Err(_) => {
            cprintln!("[machine] loader word out of range, ignored");
            env.loader_word_clear();
            LoaderWord::None
        }
    };
    if word == LoaderWord::DownloadRequested {
        env.loader_word_clear();
        return Ok(Step::Next(BootState::DownloadNewFirmware));
    }
    if env.download_trigger_pressed() {
        return Ok(Step::Next(BootState::DownloadNewFirmware));
    }
    Ok(Step::Next(BootState::VerifyFirmwareStatus))
}

fn download_new_fw<Env: Mcu>(env: &mut Env) -> BulwarkResult<Step> {
    env.indicate(Indication::Download);
    match env.loader_download() {
        Ok(info) => {
            env.fwimg_install_at_next_reset(info.dwl)?;
            Ok(Step::Reset(BulwarkError::BOOT_DOWNLOAD_COMPLETE_REBOOT))
        }
        Err(err) => {
            cprintln!("[machine] download failed: {}", HexWord(err.into()));
            let target = env.loader_target();
            env.fwimg_erase_downloaded(target)?;
            Err(err)
        }
    }
}

fn verify_fw_status<Env: Mcu>(
    env: &mut Env,
    config: &BootConfig,
    ctx: &mut Ctx,
) -> BulwarkResult<Step> {
    handle_loader_word(env)?;

    let plan = env.fwimg_install_plan()?;
    match plan {
        InstallPlan::RejectedRollback { active, dwl } => {
            ctx.pending = Some((active, dwl));
            Ok(Step::Next(BootState::RollbackInstall))
        }
        InstallPlan::InterruptedResume { active, dwl } => {
            ctx.pending = Some((active, dwl));
            Ok(Step::Next(BootState::ResumeInstall))
        }
        InstallPlan::ToInstall { dwl } => {
            ctx.pending = Some((dwl.companion(), dwl));
            Ok(Step::Next(BootState::InstallNewFirmware))
        }
        InstallPlan::None => {
            let mut found = false;
            let mut stray = [false; ACTIVE_SLOT_COUNT];
            {
                let verifier = SlotVerifier::new(&*env);
                for slot in search_order() {
                    let org = active_slot_org(slot);
                    if verifier.detect_image(org, ACTIVE_SLOT_SIZE)? {
                        found = true;
                        break;
                    }
                    if !verifier.slot_is_empty(org)? {
                        stray[slot.index()] = true;
                    }
                }
            }
            if found {
                return Ok(Step::Next(BootState::VerifyFirmwareSignature));
            }
            // Defensively invalidate anything non-empty that failed the
            // structural check
            for slot in ActiveSlot::ALL {
                if stray[slot.index()] {
                    env.fwimg_invalidate(slot)?;
                }
            }
            if config.loader_enabled && env.loader_available() {
                Ok(Step::Next(BootState::CheckNewFirmwareToDownload))
            } else {
                // No firmware and no way to get one
                Ok(Step::Halt(BulwarkError::BOOT_NO_FIRMWARE_NO_LOADER))
            }
        }
    }
}

/// A standalone loader communicates through the shared word; honor an
/// install request, range-check and discard everything else unexpected.
fn handle_loader_word<Env: Mcu>(env: &mut Env) -> BulwarkResult<()> {
    match LoaderWord::try_from(env.loader_word_read()) {
        Ok(LoaderWord::InstallRequested) => {
            let dwl = {
                let verifier = SlotVerifier::new(&*env);
                match verifier.read_header(dwl_slot_org(DEFAULT_DWL_SLOT)) {
                    Ok(header) => header.dwl_slot().unwrap_or(DEFAULT_DWL_SLOT),
                    Err(_) => DEFAULT_DWL_SLOT,
                }
            };
            env.fwimg_install_at_next_reset(dwl)?;
            env.loader_word_clear();
        }
        Ok(LoaderWord::Bypass) => {
            cprintln!("[machine] loader bypass not handled by this engine");
            env.loader_word_clear();
        }
        Ok(_) => {}
        Err(_) => {
            cprintln!("[machine] loader word out of range, cleared");
            env.loader_word_clear();
        }
    }
    Ok(())
}

fn install_new_fw<Env: Mcu>(env: &mut Env, ctx: &Ctx) -> BulwarkResult<Step> {
    let (active, dwl) = ctx.pending.ok_or(BulwarkError::BOOT_UNCLASSIFIED_FAILURE)?;
    env.indicate(Indication::Install);

    let act_org = active_slot_org(active);
    let dwl_org = dwl_slot_org(dwl);
    {
        let verifier = SlotVerifier::new(&*env);
        let header = verifier.verify_slot(dwl_org, DWL_SLOT_SIZE)?;

        // Version checked twice, independently, so one injected skip is
        // not enough
        verifier.check_candidate_version(&header, act_org)?;
        let reread = verifier.read_header(dwl_org)?;
        verifier.check_candidate_version(flow_launder(&reread), act_org)?;
    }

    env.fwimg_trigger_installation(active, dwl)?;

    // Slot roles may have swapped; always reboot before executing
    Ok(Step::Reset(BulwarkError::BOOT_INSTALL_COMPLETE_REBOOT))
}

fn resume_install<Env: Mcu>(env: &mut Env, ctx: &Ctx) -> BulwarkResult<Step> {
    let (active, dwl) = ctx.pending.ok_or(BulwarkError::BOOT_UNCLASSIFIED_FAILURE)?;
    env.indicate(Indication::Install);
    cprintln!(
        "[machine] resuming interrupted install, active {} dwl {}",
        active.number(),
        dwl.number()
    );
    env.fwimg_trigger_resume(active, dwl)?;
    Ok(Step::Reset(BulwarkError::BOOT_INSTALL_COMPLETE_REBOOT))
}

fn rollback_install<Env: Mcu>(env: &mut Env, ctx: &Ctx) -> BulwarkResult<Step> {
    let (active, dwl) = ctx.pending.ok_or(BulwarkError::BOOT_UNCLASSIFIED_FAILURE)?;
    if !env.fwimg_swap_capable() {
        return Err(BulwarkError::BOOT_ROLLBACK_NOT_SUPPORTED);
    }
    env.indicate(Indication::Install);
    env.fwimg_trigger_rollback(active, dwl)?;
    Ok(Step::Reset(BulwarkError::BOOT_INSTALL_COMPLETE_REBOOT))
}

fn verify_fw_signature<Env: Mcu>(env: &mut Env, ctx: &mut Ctx) -> BulwarkResult<Step> {
    let mut selected = None;
    let mut rejected = [false; ACTIVE_SLOT_COUNT];
    {
        let verifier = SlotVerifier::new(&*env);
        for slot in search_order() {
            let org = active_slot_org(slot);
            if !verifier.detect_image(org, ACTIVE_SLOT_SIZE)? {
                continue;
            }
            match verifier.verify_slot(org, ACTIVE_SLOT_SIZE) {
                Ok(header) => {
                    selected = Some((slot, header));
                    break;
                }
                Err(err) if is_verification_reject(err) => {
                    cprintln!(
                        "[machine] slot {} rejected: {}",
                        slot.number(),
                        HexWord(err.into())
                    );
                    rejected[slot.index()] = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    // Best-effort in-place invalidation; a failure here must not abort the
    // whole boot
    for slot in ActiveSlot::ALL {
        if rejected[slot.index()] && env.fwimg_invalidate(slot).is_err() {
            cprintln!("[machine] slot {} invalidation failed", slot.number());
        }
    }

    match selected {
        Some(sel) => {
            ctx.selected = Some(sel);
            Ok(Step::Next(BootState::ExecuteFirmware))
        }
        // Everything invalid got wiped; re-derive from the status state
        None => Ok(Step::Next(BootState::VerifyFirmwareStatus)),
    }
}

fn execute_fw<Env: Mcu>(env: &mut Env, ctx: &mut Ctx) -> BulwarkResult<Step> {
    let (slot, _header) = ctx.selected.ok_or(BulwarkError::BOOT_UNCLASSIFIED_FAILURE)?;
    let org = active_slot_org(slot);

    ctx.protect_ctr.check(protect::TOTAL_AFTER_RUNTIME)?;

    // Second, independent verification right before the jump
    {
        let verifier = SlotVerifier::new(&*env);
        verifier.verify_slot(org, ACTIVE_SLOT_SIZE)?;
    }

    env.flash_configure_execute(org)
        .map_err(|_| BulwarkError::FLASH_EXECUTE_CONFIG)?;

    gate::escalated_pass(env, &mut ctx.protect_ctr, ctx.rdp2.as_ref())?;
    ctx.protect_ctr.check(protect::TOTAL_AFTER_ESCALATED)?;

    // Revoked twice so a single injected skip still leaves them revoked
    env.fwimg_lock_services()?;
    env.fwimg_lock_services()?;

    let launched = gate::launch(env, active_slot_entry(slot))?;
    Ok(Step::Launch(launched))
}

fn handle_critical_failure<Env: Mcu>(env: &mut Env, ctx: &Ctx) -> BulwarkResult<Step> {
    let code = ctx.fail_code.unwrap_or(BulwarkError::BOOT_CRITICAL_FAILURE);
    cprintln!("[machine] critical failure: {}", HexWord(code.into()));
    env.indicate(Indication::CriticalFailure);
    env.wdt_refresh()?;
    Ok(Step::Next(BootState::RebootStateMachine))
}

fn reboot_state_machine(ctx: &Ctx) -> BulwarkResult<Step> {
    let code = ctx.fail_code.unwrap_or(BulwarkError::BOOT_CRITICAL_FAILURE);
    // Halt instead of reset where a reset loop would hand an attacker a
    // retry oracle
    if is_security_fatal(code)
        || (ctx.failed_in == BootState::ExecuteFirmware && is_verification_reject(code))
    {
        Ok(Step::Halt(code))
    } else {
        Ok(Step::Reset(code))
    }
}

fn search_order() -> [ActiveSlot; ACTIVE_SLOT_COUNT] {
    let mut order = ActiveSlot::ALL;
    if let Some(pos) = order.iter().position(|slot| *slot == MASTER_SLOT) {
        order.swap(0, pos);
    }
    order
}

const VERIFICATION_REJECTS: [BulwarkError; 6] = [
    BulwarkError::IMAGE_VERIFY_HEADER_AUTH_FAILURE,
    BulwarkError::IMAGE_VERIFY_IMAGE_AUTH_FAILURE,
    BulwarkError::IMAGE_VERIFY_TRAILING_CODE_DETECTED,
    BulwarkError::IMAGE_VERIFY_NO_IMAGE,
    BulwarkError::IMAGE_VERIFY_HEADER_MALFORMED,
    BulwarkError::IMAGE_VERIFY_SIZE_OUT_OF_RANGE,
];

fn is_verification_reject(err: BulwarkError) -> bool {
    VERIFICATION_REJECTS.contains(&err)
}

const SECURITY_FATAL: [BulwarkError; 12] = [
    BulwarkError::FLOW_COUNTER_CORRUPT,
    BulwarkError::FLOW_COUNTER_OVERFLOW,
    BulwarkError::FLOW_COUNTER_MISMATCH,
    BulwarkError::PROTECT_MPU_VERIFY,
    BulwarkError::PROTECT_DMA_VERIFY,
    BulwarkError::PROTECT_DEBUG_VERIFY,
    BulwarkError::PROTECT_TAMPER_VERIFY,
    BulwarkError::GATE_UNKNOWN_SYSCALL,
    BulwarkError::GATE_ACTIVATION_COPY_MISMATCH,
    BulwarkError::GATE_ACTIVATION_NOT_EFFECTIVE,
    BulwarkError::GATE_LAUNCH_RETURNED,
    BulwarkError::BOOT_SECURITY_SAFETY_CHECK,
];

fn is_security_fatal(err: BulwarkError) -> bool {
    SECURITY_FATAL.contains(&err)
}

fn reset_cause_name(cause: ResetCause) -> &'static str {
    match cause {
        ResetCause::PowerOn => "power-on",
        ResetCause::Pin => "pin",
        ResetCause::BrownOut => "brown-out",
        ResetCause::Software => "software",
        ResetCause::Watchdog => "watchdog",
        ResetCause::LowPower => "low-power",
        ResetCause::OptionByteReload => "option-byte reload",
        ResetCause::Unknown => "unknown",
    }
}
