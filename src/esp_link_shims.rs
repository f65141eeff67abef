//! ESP-IDF provider for the `critical-section` 1.x symbols used by
//! embassy-sync's `CriticalSectionRawMutex`.
//!
//! Nesting is tracked per thread; only the outermost acquire takes the
//! global lock and only the matching release drops it.

#[cfg(target_os = "espidf")]
use core::cell::Cell;

#[cfg(target_os = "espidf")]
use parking_lot::lock_api::RawMutex as _;

#[cfg(target_os = "espidf")]
static CRITICAL_SECTION: parking_lot::RawMutex = parking_lot::RawMutex::INIT;

#[cfg(target_os = "espidf")]
thread_local! {
    static CRITICAL_SECTION_DEPTH: Cell<u8> = const { Cell::new(0) };
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            CRITICAL_SECTION.lock();
        }
        let new_depth = d.saturating_add(1);
        depth.set(new_depth);
        new_depth
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            return;
        }
        depth.set(d - 1);
        if d == 1 {
            // SAFETY: depth went 0 -> 1 on this thread in `acquire`, which
            // took the lock; this is the matching outermost release.
            unsafe { CRITICAL_SECTION.unlock() };
        }
    })
}
