use std::path::Path;

use anyhow::Context;
use nix::sys::statvfs::statvfs;
use sysinfo::System;
use tracing::{error, instrument, trace};

use crate::{
    DiskInformation, DiskReading, DiskStatus, MemoryInformation, ResourceSnapshot, util::percent,
};

/// Source of host resource figures
pub trait HostStats {
    fn memory(&mut self) -> MemoryInformation;

    fn disk(&mut self, path: &Path) -> anyhow::Result<DiskInformation>;
}

/// [`HostStats`] reading the local machine: memory through `sysinfo`, disks
/// through `statvfs`
pub struct SystemHost {
    system: System,
}

impl SystemHost {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostStats for SystemHost {
    fn memory(&mut self) -> MemoryInformation {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let available = self.system.available_memory();

        MemoryInformation {
            used_percent: percent(total.saturating_sub(available), total),
            available,
            total,
        }
    }

    /// Usage of the filesystem `path` lives on, read with `statvfs` on the
    /// path itself
    fn disk(&mut self, path: &Path) -> anyhow::Result<DiskInformation> {
        let stat = statvfs(path)
            .with_context(|| format!("cannot read filesystem of {}", path.display()))?;

        Ok(disk_usage(
            stat.blocks() as u64,
            stat.blocks_free() as u64,
            stat.blocks_available() as u64,
            stat.fragment_size() as u64,
        ))
    }
}

/// Disk figures from raw `statvfs` counters, the way `df` reports them
///
/// Blocks reserved for root count neither as used nor as free, so the
/// percentage is `used / (used + available)` rather than `used / total`.
pub fn disk_usage(
    blocks: u64,
    blocks_free: u64,
    blocks_available: u64,
    fragment_size: u64,
) -> DiskInformation {
    let total = blocks.saturating_mul(fragment_size);
    let free = blocks_available.saturating_mul(fragment_size);
    let used = blocks.saturating_sub(blocks_free).saturating_mul(fragment_size);

    DiskInformation {
        used_percent: percent(used, used.saturating_add(free)),
        free,
        total,
    }
}

/// Samples memory and the configured paths
pub struct ResourceProbe<H> {
    host: H,
    paths: Vec<String>,
}

impl<H> ResourceProbe<H>
where
    H: HostStats,
{
    pub fn new(host: H, paths: Vec<String>) -> Self {
        Self { host, paths }
    }

    /// Read current memory and disk usage
    ///
    /// A path that cannot be read is recorded as [`DiskStatus::Failed`] and
    /// does not affect the other paths.
    #[instrument(skip_all)]
    pub fn sample(&mut self) -> ResourceSnapshot {
        let memory = self.host.memory();
        trace!("memory usage {:.1}%", memory.used_percent);

        let disks = self
            .paths
            .iter()
            .map(|path| {
                let status = match self.host.disk(Path::new(path)) {
                    Ok(usage) => {
                        trace!("{path}: disk usage {:.1}%", usage.used_percent);
                        DiskStatus::Usage(usage)
                    }
                    Err(e) => {
                        error!("error checking disk usage for {path}: {e:#}");
                        DiskStatus::Failed(format!("{e:#}"))
                    }
                };
                DiskReading {
                    path: path.clone(),
                    status,
                }
            })
            .collect();

        ResourceSnapshot { memory, disks }
    }
}
