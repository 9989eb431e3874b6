/*++

Licensed under the Apache-2.0 license.

File Name:

    fwimg.rs

Abstract:

    File contains the firmware image service seam. The service owns the
    non-volatile installation bookkeeping; the engine never writes it
    directly, only triggers operations that cause it to be written.

--*/

use bulwark_error::BulwarkResult;
use bulwark_image_types::{ActiveSlot, DwlSlot, InstallPlan};

pub trait FwImgService {
    /// Derive the install plan from the non-volatile bookkeeping. Queried
    /// once per boot; recomputing without intervening writes yields the same
    /// plan.
    fn fwimg_install_plan(&mut self) -> BulwarkResult<InstallPlan>;

    /// Record that the image staged in `dwl` must be installed on the next
    /// reset.
    fn fwimg_install_at_next_reset(&mut self, dwl: DwlSlot) -> BulwarkResult<()>;

    /// Install the image staged in `dwl` over `active`. Interruptions leave
    /// bookkeeping from which the plan derives `InterruptedResume`.
    fn fwimg_trigger_installation(&mut self, active: ActiveSlot, dwl: DwlSlot)
        -> BulwarkResult<()>;

    /// Re-drive an interrupted installation of the recorded pair.
    fn fwimg_trigger_resume(&mut self, active: ActiveSlot, dwl: DwlSlot) -> BulwarkResult<()>;

    /// Restore the previous image over a rejected one. Requires swap-capable
    /// installation.
    fn fwimg_trigger_rollback(&mut self, active: ActiveSlot, dwl: DwlSlot) -> BulwarkResult<()>;

    /// Erase whatever is staged in `dwl`, including partial downloads.
    fn fwimg_erase_downloaded(&mut self, dwl: DwlSlot) -> BulwarkResult<()>;

    /// Best-effort in-place invalidation of the image in `active`.
    fn fwimg_invalidate(&mut self, active: ActiveSlot) -> BulwarkResult<()>;

    /// Whether installation swaps slot contents (rollback-capable).
    fn fwimg_swap_capable(&self) -> bool;

    /// Revoke update services before control passes to the application.
    /// Idempotent; called twice on the launch path.
    fn fwimg_lock_services(&mut self) -> BulwarkResult<()>;
}
