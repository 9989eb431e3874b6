/*++

Licensed under the Apache-2.0 license.

File Name:

    gate.rs

Abstract:

    File contains the privilege gate: the system-call dispatch that is the
    only path from unprivileged code back to privileged reconfiguration, and
    the secure-memory activation sequence ending in the jump into the
    application.

--*/

use bulwark_drivers::{Launched, Mcu};
use bulwark_error::{BulwarkError, BulwarkResult};
use bulwark_flow_lib::FlowCounter;

use crate::print::HexWord;
use crate::protect;
use crate::protect::Rdp2;

/// The fixed system-call set. Opcodes carry high pairwise hamming distance.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Syscall {
    LaunchApp = 0x5A,
    Reset = 0x3C,
    MpuConfig = 0x69,
    DmaConfig = 0x96,
    DapConfig = 0xA5,
    TamperConfig = 0xC3,
}

impl Syscall {
    /// Decode a raw opcode. Unrecognized opcodes force a reset, never an
    /// ignore.
    pub fn from_opcode(opcode: u8) -> BulwarkResult<Syscall> {
        match opcode {
            0x5A => Ok(Syscall::LaunchApp),
            0x3C => Ok(Syscall::Reset),
            0x69 => Ok(Syscall::MpuConfig),
            0x96 => Ok(Syscall::DmaConfig),
            0xA5 => Ok(Syscall::DapConfig),
            0xC3 => Ok(Syscall::TamperConfig),
            _ => Err(BulwarkError::GATE_UNKNOWN_SYSCALL),
        }
    }
}

/// The activation routine staged into the reserved RAM region. On hardware
/// this is position-independent thumb code; its exact bytes are what the
/// copy verification pins down.
pub const ACTIVATION_STUB: [u8; 32] = [
    0x72, 0xB6, 0x01, 0x21, 0x08, 0x47, 0x00, 0xBF, 0x10, 0xB5, 0x04, 0x46, 0x20, 0x46, 0x10,
    0xBD, 0x70, 0x47, 0x00, 0xBF, 0xFE, 0xE7, 0x00, 0xBF, 0xEF, 0xF3, 0x09, 0x80, 0x80, 0xF3,
    0x09, 0x88,
];

/// Dispatch one system call, raising privilege for its duration.
pub fn dispatch<Env: Mcu>(
    env: &mut Env,
    opcode: u8,
    arg: u32,
) -> BulwarkResult<Option<Launched>> {
    let call = Syscall::from_opcode(opcode)?;
    env.enter_privileged()?;
    let result = match call {
        Syscall::LaunchApp => launch_privileged(env, arg).map(Some),
        Syscall::Reset => Err(BulwarkError::GATE_RESET_REQUESTED),
        Syscall::MpuConfig => protect::verify_mpu(env).map(|_| None),
        Syscall::DmaConfig => protect::verify_dma(env).map(|_| None),
        Syscall::DapConfig => protect::verify_dap(env).map(|_| None),
        Syscall::TamperConfig => protect::verify_tamper(env).map(|_| None),
    };
    if !matches!(result, Ok(Some(_))) {
        env.enter_unprivileged()?;
    }
    result
}

/// The escalated protection pass, run after privilege drop. Every
/// re-verification goes through the dispatch like any other unprivileged
/// request; nothing is reprogrammed.
pub fn escalated_pass<Env: Mcu>(
    env: &mut Env,
    ctr: &mut FlowCounter,
    rdp2: Option<&Rdp2>,
) -> BulwarkResult<()> {
    protect::verify_static_escalated(env, rdp2)?;
    ctr.advance(protect::STEP_OB_VERIFY)?;

    dispatch(env, Syscall::MpuConfig as u8, 0)?;
    ctr.advance(protect::STEP_MPU_VERIFY)?;

    dispatch(env, Syscall::DmaConfig as u8, 0)?;
    ctr.advance(protect::STEP_DMA_VERIFY)?;

    dispatch(env, Syscall::DapConfig as u8, 0)?;
    ctr.advance(protect::STEP_DAP_VERIFY)?;

    dispatch(env, Syscall::TamperConfig as u8, 0)?;
    ctr.advance(protect::STEP_TAMPER_VERIFY)?;

    Ok(())
}

/// Request the jump into the application at `entry`.
pub fn launch<Env: Mcu>(env: &mut Env, entry: u32) -> BulwarkResult<Launched> {
    cprintln!("[gate] launching application at {}", HexWord(entry));
    dispatch(env, Syscall::LaunchApp as u8, entry)?
        .ok_or(BulwarkError::GATE_LAUNCH_RETURNED)
}

/// Privileged half of the launch: clear the trusted stack, stage the
/// activation routine, verify the copy byte-identical, seal the region,
/// activate secure memory, confirm it took effect, jump. No return path on
/// hardware.
fn launch_privileged<Env: Mcu>(env: &mut Env, entry: u32) -> BulwarkResult<Launched> {
    env.clear_trusted_stack()?;

    env.stage_activation(&ACTIVATION_STUB)?;
    let mut staged = [0u8; ACTIVATION_STUB.len()];
    env.read_staged(&mut staged)?;
    if staged != ACTIVATION_STUB {
        return Err(BulwarkError::GATE_ACTIVATION_COPY_MISMATCH);
    }
    env.seal_activation_region()?;

    env.activate()?;
    if !env.secure_memory_active()? {
        return Err(BulwarkError::GATE_ACTIVATION_NOT_EFFECTIVE);
    }

    env.jump(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_round_trip() {
        for call in [
            Syscall::LaunchApp,
            Syscall::Reset,
            Syscall::MpuConfig,
            Syscall::DmaConfig,
            Syscall::DapConfig,
            Syscall::TamperConfig,
        ] {
            assert_eq!(Syscall::from_opcode(call as u8), Ok(call));
        }
    }

    #[test]
    fn test_unknown_opcode_rejected() {
        assert_eq!(
            Syscall::from_opcode(0x00),
            Err(BulwarkError::GATE_UNKNOWN_SYSCALL)
        );
        assert_eq!(
            Syscall::from_opcode(0xFF),
            Err(BulwarkError::GATE_UNKNOWN_SYSCALL)
        );
    }
}
