//! Shutdown coordination
//!
//! A single hook bound to the lifecycle registry. Triggering it removes every
//! module from the registry and disables them in registration order, each in
//! its own failure boundary.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ShutdownConfig;
use crate::module::loader::LoadedModule;
use crate::module::registry::lifecycle::{lock_module, ModuleCallScope, SharedModule};
use crate::module::registry::ModuleRegistry;
use crate::module::traits::panic_message;
use crate::utils::error::log_error;
use crate::utils::signal::ShutdownSignals;

/// Outcome of a disable pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Modules whose `on_disable` returned normally, in call order
    pub disabled: Vec<String>,
    /// Modules whose `on_disable` failed or panicked, in call order
    pub failed: Vec<String>,
}

impl ShutdownReport {
    /// Total number of modules the pass visited
    pub fn total(&self) -> usize {
        self.disabled.len() + self.failed.len()
    }
}

struct HookState {
    registry: Arc<Mutex<ModuleRegistry>>,
    fired: AtomicBool,
    listening: AtomicBool,
}

/// Handle to the installed shutdown hook
///
/// Clones share the same hook; whichever trigger comes first runs the disable
/// pass, later ones are no-ops.
#[derive(Clone)]
pub struct ShutdownHook {
    state: Arc<HookState>,
}

impl ShutdownHook {
    /// Run the disable pass if it has not run yet
    ///
    /// Returns `None` when the hook already fired, or when called from inside
    /// a module call (the module in use cannot be disabled under itself; the
    /// hook stays armed).
    pub fn trigger(&self) -> Option<ShutdownReport> {
        if ModuleCallScope::active() {
            warn!("Shutdown requested from inside a module call, ignoring");
            return None;
        }
        if self.state.fired.swap(true, Ordering::SeqCst) {
            debug!("Shutdown hook already fired");
            return None;
        }

        let entries = lock_registry(&self.state.registry).drain();
        Some(disable_all(entries))
    }

    /// Check if the hook has fired
    pub fn has_fired(&self) -> bool {
        self.state.fired.load(Ordering::SeqCst)
    }

    /// Check if a signal listener is armed for this hook
    pub fn is_listening(&self) -> bool {
        self.state.listening.load(Ordering::SeqCst)
    }

    /// Wait for a termination signal, then trigger the hook
    ///
    /// Must run inside a tokio runtime.
    pub async fn listen(self, exit_after_signal: bool) {
        let mut signals = match ShutdownSignals::register() {
            Ok(signals) => signals,
            Err(e) => {
                warn!("Failed to register shutdown signal handlers: {}", e);
                return;
            }
        };
        self.state.listening.store(true, Ordering::SeqCst);

        let signal = signals.recv().await;
        info!("Received {}, disabling modules", signal);
        if let Some(report) = self.trigger() {
            info!(
                "Disabled {} modules on {} ({} failed)",
                report.disabled.len(),
                signal,
                report.failed.len()
            );
        }
        if exit_after_signal {
            std::process::exit(0);
        }
    }
}

/// Installs the process shutdown hook
pub struct ShutdownCoordinator;

impl ShutdownCoordinator {
    /// Install a hook bound to `registry`
    ///
    /// With `listen_for_signals` set, a listener is spawned on the current
    /// tokio runtime, or on a dedicated thread with its own runtime when there
    /// is none.
    pub fn install(registry: Arc<Mutex<ModuleRegistry>>, config: &ShutdownConfig) -> ShutdownHook {
        let hook = ShutdownHook {
            state: Arc::new(HookState {
                registry,
                fired: AtomicBool::new(false),
                listening: AtomicBool::new(false),
            }),
        };

        if config.listen_for_signals {
            Self::spawn_listener(hook.clone(), config.exit_after_signal);
        }

        hook
    }

    fn spawn_listener(hook: ShutdownHook, exit_after_signal: bool) {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(hook.listen(exit_after_signal));
            debug!("Shutdown signal listener spawned on the current runtime");
            return;
        }

        let spawned = thread::Builder::new()
            .name("module-shutdown".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        warn!("Failed to start shutdown signal runtime: {}", e);
                        return;
                    }
                };
                runtime.block_on(hook.listen(exit_after_signal));
            });

        match spawned {
            Ok(_) => debug!("Shutdown signal listener spawned on its own thread"),
            Err(e) => warn!("Failed to spawn shutdown signal listener: {}", e),
        }
    }
}

/// Disable drained registry entries in order
///
/// Each `on_disable` runs in its own failure boundary: an error or panic is
/// logged and the pass continues. Modules are dropped afterwards.
pub(crate) fn disable_all(entries: Vec<(String, SharedModule)>) -> ShutdownReport {
    let start = Instant::now();
    let mut report = ShutdownReport::default();

    for (name, shared) in entries {
        let mut loaded = lock_module(&shared);
        if loaded.is_disabled() {
            continue;
        }
        let context = format!("Failed to disable module {}", name);
        match log_error(|| disable_module(&mut loaded), &context) {
            Some(()) => report.disabled.push(name),
            None => report.failed.push(name),
        }
    }

    info!(
        "Disabled {} of {} modules ({}ms)",
        report.disabled.len(),
        report.total(),
        start.elapsed().as_millis()
    );
    report
}

fn disable_module(loaded: &mut LoadedModule) -> Result<(), String> {
    let start = Instant::now();
    loaded.mark_disabled();
    let module = loaded.module_mut();
    let _scope = ModuleCallScope::enter();
    match panic::catch_unwind(AssertUnwindSafe(|| module.on_disable())) {
        Ok(Ok(())) => {
            info!(
                "Module {} disabled ({}ms)",
                module.name(),
                start.elapsed().as_millis()
            );
            Ok(())
        }
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

/// Lock the registry, recovering it if a holder panicked
pub(crate) fn lock_registry(registry: &Mutex<ModuleRegistry>) -> MutexGuard<'_, ModuleRegistry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
