const MIB: f64 = 1024.0 * 1024.0;

const GIB: f64 = MIB * 1024.0;

const MS_PER_DAY: f64 = 86_400_000.0;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

pub fn ms_to_days(ms: i64) -> f64 {
    ms as f64 / MS_PER_DAY
}

/// Share of `used` in `total` as a percentage; an empty total counts as 0%.
pub fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}
