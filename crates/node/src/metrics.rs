use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fleet_core::{NodeMetrics, PlatformInfo};
use sysinfo::{Disks, System};

/// 主机指标采集
///
/// CPU使用率需要两次采样之间的差值；采集器在多次调用之间保留 `System`，
/// 只有第一次调用需要等待一个采样间隔。
pub struct MetricsCollector {
    root: PathBuf,
    system: Mutex<Option<System>>,
}

impl MetricsCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            system: Mutex::new(None),
        }
    }

    /// 阻塞调用，应放在阻塞线程池中执行
    pub fn sample(&self) -> NodeMetrics {
        let mut guard = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let system = guard.get_or_insert_with(|| {
            let mut system = System::new();
            system.refresh_cpu_usage();
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            system
        });
        system.refresh_cpu_usage();
        system.refresh_memory();

        let memory_total = system.total_memory() as f64;
        let memory_percent = if memory_total > 0.0 {
            system.used_memory() as f64 / memory_total * 100.0
        } else {
            0.0
        };
        let (disk_percent, disk_total) = disk_usage(&self.root);

        NodeMetrics {
            cpu_percent: f64::from(system.global_cpu_usage()),
            memory_percent,
            memory_total,
            disk_percent,
            disk_total,
            uptime_seconds: System::uptime() as f64,
        }
    }
}

/// 根目录所在磁盘的使用率和容量，取挂载点最长的匹配项
fn disk_usage(root: &Path) -> (f64, f64) {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| root.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| {
            let total = disk.total_space() as f64;
            let used = total - disk.available_space() as f64;
            let percent = if total > 0.0 { used / total * 100.0 } else { 0.0 };
            (percent, total)
        })
        .unwrap_or((0.0, 0.0))
}

pub fn platform_info() -> PlatformInfo {
    PlatformInfo {
        system: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        release: System::kernel_version().unwrap_or_default(),
        machine: std::env::consts::ARCH.to_string(),
        hostname: hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string()),
    }
}
