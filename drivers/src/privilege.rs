/*++

Licensed under the Apache-2.0 license.

File Name:

    privilege.rs

Abstract:

    File contains the privilege control and secure-memory activation seams.

--*/

use bulwark_error::BulwarkResult;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrivilegeLevel {
    Privileged,
    Unprivileged,
}

/// Execution privilege control.
///
/// Lowering is an ordinary operation; raising happens only inside the trap
/// handler the gate dispatch models. On hardware this switches the stack
/// pointer and sets the unprivileged bits atomically with barriers.
pub trait PrivilegeControl {
    fn enter_unprivileged(&mut self) -> BulwarkResult<()>;

    /// Raise privilege for the duration of a gate-dispatched call.
    fn enter_privileged(&mut self) -> BulwarkResult<()>;

    fn privilege_level(&self) -> PrivilegeLevel;

    /// Zero the trusted stack before it becomes inaccessible.
    fn clear_trusted_stack(&mut self) -> BulwarkResult<()>;
}

/// Proof the jump into application code was taken.
///
/// Hardware never returns this; the software model produces it so tests can
/// observe a successful launch.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Launched {
    entry: u32,
}

impl Launched {
    pub fn new(entry: u32) -> Self {
        Self { entry }
    }

    pub fn entry(&self) -> u32 {
        self.entry
    }
}

/// Secure-memory activation.
///
/// The activation routine executes from a reserved RAM region because the
/// flash that staged it becomes inaccessible the moment secure memory turns
/// on. The narrowest possible seam: stage, read back, seal, activate, jump.
pub trait SecureMemActivation {
    /// Copy the activation routine into the reserved RAM region.
    fn stage_activation(&mut self, blob: &[u8]) -> BulwarkResult<()>;

    /// Read back the staged copy for byte-compare verification.
    fn read_staged(&self, buf: &mut [u8]) -> BulwarkResult<()>;

    /// Mark the reserved RAM region read-only and executable.
    fn seal_activation_region(&mut self) -> BulwarkResult<()>;

    /// Turn on secure-memory protection over the engine's flash.
    fn activate(&mut self) -> BulwarkResult<()>;

    /// Whether secure-memory protection reads back as active.
    fn secure_memory_active(&self) -> BulwarkResult<bool>;

    /// Execute the staged routine: disable the MPU, gate boundary-crossing
    /// clocks, clear leak-prone processor state, drop privilege and jump to
    /// `entry`. Diverges on hardware.
    fn jump(&mut self, entry: u32) -> BulwarkResult<Launched>;
}
