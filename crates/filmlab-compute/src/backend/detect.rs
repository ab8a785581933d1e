//! Backend discovery.
//!
//! Only the CPU backend exists today; it is always available. Detection
//! still goes through a list so the executor's auto-selection and the CLI's
//! `backends` listing do not special-case it.

use super::{Backend, ComputeLimits};

/// One discovered backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub backend: Backend,
    pub name: &'static str,
    pub available: bool,
    /// Auto-selection rank, higher wins.
    pub priority: u32,
    /// Worker threads the backend dispatches on.
    pub threads: usize,
    /// Memory budget for full-frame buffers, in bytes.
    pub memory: u64,
}

/// All known backends, highest priority first.
pub fn detect_backends() -> Vec<BackendInfo> {
    let limits = ComputeLimits::detect();
    let mut found = vec![BackendInfo {
        backend: Backend::Cpu,
        name: "CPU",
        available: true,
        priority: 10,
        threads: rayon::current_num_threads(),
        memory: limits.available_memory,
    }];
    found.sort_by(|a, b| b.priority.cmp(&a.priority));
    found
}

/// Highest-priority available backend.
pub fn select_best_backend() -> Backend {
    detect_backends()
        .into_iter()
        .find(|b| b.available)
        .map_or(Backend::Cpu, |b| b.backend)
}

/// One line per backend: `[+] CPU: 8 threads, 4096 MB budget`.
pub fn describe_backends() -> String {
    detect_backends()
        .iter()
        .map(|info| {
            format!(
                "[{}] {}: {} threads, {} MB budget\n",
                if info.available { '+' } else { '-' },
                info.name,
                info.threads,
                info.memory / (1024 * 1024)
            )
        })
        .collect()
}
