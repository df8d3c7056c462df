mod types;

pub use types::{Reading, StoredSample};

use std::path::{Path, PathBuf};

use chrono::Utc;
use sysinfo::{Disks, System};

use crate::error::SamplingError;

/// Source of [`Reading`]s. Implementations may block on OS calls; the recorder
/// runs them off the async executor.
pub trait MetricSampler: Send + 'static {
    fn sample(&mut self) -> Result<Reading, SamplingError>;
}

/// Samples the local host through `sysinfo`.
pub struct SystemSampler {
    system: System,
    disks: Disks,
    mount_point: PathBuf,
}

impl SystemSampler {
    pub fn new(mount_point: impl Into<PathBuf>) -> Result<Self, SamplingError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SamplingError::Unsupported);
        }

        let mut system = System::new();
        // Initial refresh to establish baseline for CPU calculation
        system.refresh_cpu_usage();
        system.refresh_memory();

        Ok(Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            mount_point: mount_point.into(),
        })
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    fn memory_pct(&self) -> Result<f64, SamplingError> {
        let total = self.system.total_memory();
        if total == 0 {
            return Err(SamplingError::MemoryUnavailable);
        }
        Ok(self.system.used_memory() as f64 / total as f64 * 100.0)
    }

    fn disk_pct(&self) -> Result<f64, SamplingError> {
        let disk = self
            .disks
            .iter()
            .find(|d| d.mount_point() == self.mount_point)
            .ok_or_else(|| SamplingError::NoDisk {
                mount: self.mount_point.display().to_string(),
            })?;

        let total = disk.total_space();
        if total == 0 {
            return Ok(0.0);
        }
        let used = total.saturating_sub(disk.available_space());
        Ok(used as f64 / total as f64 * 100.0)
    }
}

impl MetricSampler for SystemSampler {
    fn sample(&mut self) -> Result<Reading, SamplingError> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.disks.refresh(true);

        // Per-core averaging can overshoot by a hair on some platforms.
        let cpu = f64::from(self.system.global_cpu_usage()).clamp(0.0, 100.0);
        let ram = self.memory_pct()?.clamp(0.0, 100.0);
        let disk = self.disk_pct()?.clamp(0.0, 100.0);

        Reading::new(Utc::now(), cpu, ram, disk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mount_point_is_a_sampling_error() {
        let Ok(mut sampler) = SystemSampler::new("/definitely/not/a/mount/point") else {
            return;
        };
        let err = sampler.sample().unwrap_err();
        assert!(matches!(err, SamplingError::NoDisk { .. }));
    }
}
