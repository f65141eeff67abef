//! Worker thread spawning with explicit core, priority and stack.
//!
//! ESP-IDF implements `std::thread` on top of pthreads, which are thin
//! wrappers around FreeRTOS tasks.  `esp_pthread_set_cfg()` sets thread-local
//! configuration for the *next* `pthread_create()` issued by the calling
//! thread, so the config and the spawn must not be interleaved with other
//! thread creation on the same thread.  On host builds the helper falls back
//! to a plain named thread.

use std::thread::JoinHandle;

/// CPU core identifiers for the dual-core ESP32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// PRO_CPU: protocol stacks.
    Pro = 0,
    /// APP_CPU: gateway workers.
    App = 1,
}

/// Placement and sizing of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSpec {
    /// NUL-terminated task name, e.g. `"modem\0"`.
    pub name: &'static str,
    pub core: Core,
    /// FreeRTOS priority; higher preempts lower.
    pub priority: u8,
    pub stack_kb: usize,
}

impl WorkerSpec {
    pub const fn new(name: &'static str, priority: u8) -> Self {
        Self {
            name,
            core: Core::App,
            priority,
            stack_kb: 4,
        }
    }

    pub const fn with_stack_kb(mut self, stack_kb: usize) -> Self {
        self.stack_kb = stack_kb;
        self
    }

    pub fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Spawn a worker thread.
///
/// Thread creation failure at boot leaves the gateway without one of its
/// workers, which is unrecoverable; it panics.
#[cfg(target_os = "espidf")]
pub fn spawn_worker(spec: WorkerSpec, f: impl FnOnce() + Send + 'static) -> JoinHandle<()> {
    // SAFETY: the config struct is fully initialised by the IDF default and
    // `spec.name` is a 'static NUL-terminated string that outlives the task.
    unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = spec.priority as i32;
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        let ret = esp_idf_sys::esp_pthread_set_cfg(&cfg);
        assert!(
            ret == esp_idf_sys::ESP_OK as i32,
            "esp_pthread_set_cfg failed: {ret}"
        );
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
        .expect("spawn_worker: thread creation failed")
}

/// Stack floor for host threads.
#[cfg(not(target_os = "espidf"))]
const HOST_MIN_STACK_KB: usize = 256;

/// Host fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_worker(spec: WorkerSpec, f: impl FnOnce() + Send + 'static) -> JoinHandle<()> {
    log::info!(
        "Spawning '{}' (host, pri={} ignored, stack={}KB)",
        spec.display_name(),
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb.max(HOST_MIN_STACK_KB) * 1024)
        .spawn(f)
        .expect("spawn_worker(host): thread creation failed")
}
