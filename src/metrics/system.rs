//! Host resource probes for the CPU and memory gauges.

use parking_lot::Mutex;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Reads CPU and memory usage of the host.
pub struct SystemProbe {
    system: Mutex<System>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_with_specifics(
                RefreshKind::nothing()
                    .with_cpu(CpuRefreshKind::nothing())
                    .with_memory(MemoryRefreshKind::everything()),
            )),
        }
    }

    pub fn usage(&self) -> SystemUsage {
        let load_one = System::load_average().one;
        let (cores, total, free) = {
            let mut system = self.system.lock();
            system.refresh_memory();
            let total = system.total_memory();
            (
                system.cpus().len(),
                total,
                free_memory(total, system.available_memory(), system.used_memory()),
            )
        };

        SystemUsage {
            cpu_percent: cpu_percent(load_one, cores),
            memory_percent: memory_percent(total, free),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// 1-minute load average per logical core, as a percentage.
pub fn cpu_percent(load_one: f64, cores: usize) -> f64 {
    if cores == 0 {
        return 0.0;
    }
    round2(load_one / cores as f64 * 100.0)
}

/// Memory treated as free. `available_memory()` returns 0 on macOS;
/// fall back to total − used.
pub fn free_memory(total: u64, available: u64, used: u64) -> u64 {
    match available {
        0 => total.saturating_sub(used),
        v => v,
    }
}

/// Share of memory in use, as a percentage.
pub fn memory_percent(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let used = total.saturating_sub(free);
    round2(used as f64 / total as f64 * 100.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_is_load_per_core() {
        assert_eq!(cpu_percent(2.0, 4), 50.0);
        assert_eq!(cpu_percent(1.0, 3), 33.33);
        assert_eq!(cpu_percent(1.0, 0), 0.0);
    }

    #[test]
    fn memory_is_used_over_total() {
        assert_eq!(memory_percent(1000, 250), 75.0);
        assert_eq!(memory_percent(0, 0), 0.0);
        assert_eq!(memory_percent(100, 200), 0.0);
    }

    #[test]
    fn free_memory_falls_back_when_available_unknown() {
        assert_eq!(free_memory(1000, 400, 700), 400);
        assert_eq!(free_memory(1000, 0, 700), 300);
        assert_eq!(free_memory(1000, 0, 1200), 0);
        assert_eq!(memory_percent(1000, free_memory(1000, 0, 700)), 70.0);
    }

    #[test]
    fn live_usage_is_within_range() {
        let usage = SystemProbe::new().usage();
        assert!(usage.cpu_percent >= 0.0);
        assert!((0.0..=100.0).contains(&usage.memory_percent));
    }
}
