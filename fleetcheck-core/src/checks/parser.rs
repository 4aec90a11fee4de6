//! Parsers for Linux `/proc` and `df` output
//!
//! Shared by the built-in check probes. Every parser works on the raw stdout
//! of one command and reports what is missing instead of guessing.

use crate::error::ParseError;

/// Start marker of the first `/proc/stat` sample in [`CPU_COMMAND`] output
pub const CPU_SAMPLE_1: &str = "---FLEETCHECK_STAT_1---";
/// Start marker of the second `/proc/stat` sample
pub const CPU_SAMPLE_2: &str = "---FLEETCHECK_STAT_2---";
/// End marker of [`CPU_COMMAND`] output
pub const CPU_END: &str = "---FLEETCHECK_END---";

/// Takes two aggregate `/proc/stat` samples one second apart
pub const CPU_COMMAND: &str = concat!(
    "echo '---FLEETCHECK_STAT_1---';",
    "head -1 /proc/stat;",
    "sleep 1;",
    "echo '---FLEETCHECK_STAT_2---';",
    "head -1 /proc/stat;",
    "echo '---FLEETCHECK_END---'",
);

/// Memory and swap counters
pub const MEMINFO_COMMAND: &str =
    "grep -E '^(MemTotal|MemAvailable|SwapTotal|SwapFree):' /proc/meminfo";

/// POSIX `df` in KiB for every mounted filesystem
pub const DF_COMMAND: &str = "df -Pk 2>/dev/null";

/// Load averages
pub const LOADAVG_COMMAND: &str = "cat /proc/loadavg";

/// Seconds since boot
pub const UPTIME_COMMAND: &str = "cat /proc/uptime";

/// Filesystem types that never fill up in a way operators care about
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "tmpfs", "devtmpfs", "udev", "overlay", "squashfs", "none", "shm", "efivarfs",
];

/// CPU time counters from the aggregate `cpu` line of `/proc/stat`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuSnapshot {
    /// Normal processes in user mode
    pub user: u64,
    /// Niced processes in user mode
    pub nice: u64,
    /// Kernel mode
    pub system: u64,
    /// Idle
    pub idle: u64,
    /// Waiting for I/O
    pub iowait: u64,
    /// Servicing interrupts
    pub irq: u64,
    /// Servicing softirqs
    pub softirq: u64,
    /// Stolen by the hypervisor
    pub steal: u64,
}

impl CpuSnapshot {
    /// Sum of all counters; `None` if the sum does not fit in a `u64`
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        [
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .into_iter()
        .try_fold(self.user, u64::checked_add)
    }

    /// Idle plus iowait; `None` on overflow
    #[must_use]
    pub const fn idle_total(&self) -> Option<u64> {
        self.idle.checked_add(self.iowait)
    }

    /// Busy percentage between `earlier` and `self` (0.0–100.0)
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if a counter sum overflows or no time elapsed
    /// between the samples.
    pub fn busy_percent_since(&self, earlier: &Self) -> Result<f64, ParseError> {
        let overflow = || ParseError::new("/proc/stat counters overflow");
        let total = self
            .total()
            .ok_or_else(overflow)?
            .saturating_sub(earlier.total().ok_or_else(overflow)?);
        if total == 0 {
            return Err(ParseError::new(
                "CPU counters did not advance between samples",
            ));
        }
        let idle = self
            .idle_total()
            .ok_or_else(overflow)?
            .saturating_sub(earlier.idle_total().ok_or_else(overflow)?);
        let busy = total.saturating_sub(idle);
        Ok((busy as f64 / total as f64) * 100.0)
    }
}

/// Memory counters in KiB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// `MemTotal`
    pub total_kib: u64,
    /// `MemAvailable`
    pub available_kib: u64,
    /// `SwapTotal`
    pub swap_total_kib: u64,
    /// `SwapFree`
    pub swap_free_kib: u64,
}

impl MemoryStats {
    /// Used memory as a percentage of the total
    #[must_use]
    pub fn used_percent(&self) -> f64 {
        if self.total_kib == 0 {
            return 0.0;
        }
        let used = self.total_kib.saturating_sub(self.available_kib);
        (used as f64 / self.total_kib as f64) * 100.0
    }

    /// Used swap as a percentage; 0 when the host has no swap
    #[must_use]
    pub fn swap_used_percent(&self) -> f64 {
        if self.swap_total_kib == 0 {
            return 0.0;
        }
        let used = self.swap_total_kib.saturating_sub(self.swap_free_kib);
        (used as f64 / self.swap_total_kib as f64) * 100.0
    }
}

/// One row of `df -Pk`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsage {
    /// Device or pseudo filesystem name
    pub filesystem: String,
    /// Size in KiB
    pub total_kib: u64,
    /// Used KiB
    pub used_kib: u64,
    /// `Capacity` column without the `%`
    pub used_percent: u8,
    /// Mount point
    pub mount: String,
}

impl DiskUsage {
    /// True for block-device backed filesystems
    #[must_use]
    pub fn is_real(&self) -> bool {
        !PSEUDO_FILESYSTEMS.contains(&self.filesystem.as_str())
            && !self.filesystem.starts_with("/dev/loop")
            && self.total_kib > 0
    }
}

/// Stateless parser for command output
pub struct OutputParser;

impl OutputParser {
    /// Extracts text between two marker lines
    fn section<'a>(output: &'a str, start: &str, end: &str) -> Option<&'a str> {
        let start_idx = output.find(start).map(|i| i + start.len())?;
        let end_idx = output[start_idx..].find(end).map(|i| start_idx + i)?;
        Some(output[start_idx..end_idx].trim())
    }

    /// Parses the two samples produced by [`CPU_COMMAND`] into a busy percentage.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if a sample is missing or malformed, or if the
    /// counters did not advance.
    pub fn parse_cpu_samples(output: &str) -> Result<f64, ParseError> {
        let first = Self::section(output, CPU_SAMPLE_1, CPU_SAMPLE_2)
            .ok_or_else(|| ParseError::new("Missing first /proc/stat sample"))?;
        let second = Self::section(output, CPU_SAMPLE_2, CPU_END)
            .ok_or_else(|| ParseError::new("Missing second /proc/stat sample"))?;

        let first = Self::parse_proc_stat(first)?;
        let second = Self::parse_proc_stat(second)?;

        second.busy_percent_since(&first)
    }

    /// Parses the aggregate `cpu` line of `/proc/stat`.
    ///
    /// Format: `cpu  user nice system idle iowait irq softirq steal ...`
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the line is missing or has non-numeric fields.
    pub fn parse_proc_stat(text: &str) -> Result<CpuSnapshot, ParseError> {
        let line = text
            .lines()
            .find(|l| l.starts_with("cpu "))
            .ok_or_else(|| ParseError::new("No aggregate cpu line in /proc/stat"))?;

        let fields = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ParseError::new(format!("Invalid /proc/stat counter: {e}")))?;

        if fields.len() < 8 {
            return Err(ParseError::new("Too few fields in /proc/stat cpu line"));
        }

        Ok(CpuSnapshot {
            user: fields[0],
            nice: fields[1],
            system: fields[2],
            idle: fields[3],
            iowait: fields[4],
            irq: fields[5],
            softirq: fields[6],
            steal: fields[7],
        })
    }

    /// Parses `MemTotal`, `MemAvailable`, `SwapTotal`, `SwapFree` from `/proc/meminfo`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if `MemTotal` or `MemAvailable` is missing.
    pub fn parse_meminfo(text: &str) -> Result<MemoryStats, ParseError> {
        let mut total = None;
        let mut available = None;
        let mut stats = MemoryStats::default();

        for line in text.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                total = Self::parse_kib_value(rest);
            } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
                available = Self::parse_kib_value(rest);
            } else if let Some(rest) = line.strip_prefix("SwapTotal:") {
                stats.swap_total_kib = Self::parse_kib_value(rest).unwrap_or(0);
            } else if let Some(rest) = line.strip_prefix("SwapFree:") {
                stats.swap_free_kib = Self::parse_kib_value(rest).unwrap_or(0);
            }
        }

        stats.total_kib = total
            .filter(|&t| t > 0)
            .ok_or_else(|| ParseError::new("MemTotal not found in /proc/meminfo"))?;
        stats.available_kib =
            available.ok_or_else(|| ParseError::new("MemAvailable not found in /proc/meminfo"))?;

        Ok(stats)
    }

    /// Parses a value like `  16384000 kB` into KiB
    fn parse_kib_value(s: &str) -> Option<u64> {
        s.split_whitespace().next().and_then(|v| v.parse().ok())
    }

    /// Parses every data row of `df -Pk`.
    ///
    /// Format: `Filesystem  1024-blocks  Used  Available  Capacity  Mounted on`
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if a data row is malformed or there are no rows.
    pub fn parse_df(text: &str) -> Result<Vec<DiskUsage>, ParseError> {
        let mut rows = Vec::new();

        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            if line.starts_with("Filesystem") {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                return Err(ParseError::new(format!("Too few fields in df row: {line}")));
            }
            let number = |i: usize| {
                parts[i]
                    .parse::<u64>()
                    .map_err(|e| ParseError::new(format!("Invalid df value '{}': {e}", parts[i])))
            };
            let used_percent = parts[4]
                .trim_end_matches('%')
                .parse::<u8>()
                .map_err(|e| ParseError::new(format!("Invalid df capacity '{}': {e}", parts[4])))?;

            rows.push(DiskUsage {
                filesystem: parts[0].to_string(),
                total_kib: number(1)?,
                used_kib: number(2)?,
                used_percent,
                mount: parts[5..].join(" "),
            });
        }

        if rows.is_empty() {
            return Err(ParseError::new("Empty df output"));
        }
        Ok(rows)
    }

    /// Returns the fullest real filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if `df` output is malformed or lists only
    /// pseudo filesystems.
    pub fn worst_disk(text: &str) -> Result<DiskUsage, ParseError> {
        Self::parse_df(text)?
            .into_iter()
            .filter(DiskUsage::is_real)
            .max_by_key(|d| d.used_percent)
            .ok_or_else(|| ParseError::new("No real filesystems in df output"))
    }

    /// Parses the one-minute load from `/proc/loadavg`.
    ///
    /// Format: `0.52 0.34 0.28 2/1234 56789`
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the first field is missing or not a finite,
    /// non-negative number.
    pub fn parse_loadavg(text: &str) -> Result<f64, ParseError> {
        let first = text
            .split_whitespace()
            .next()
            .ok_or_else(|| ParseError::new("Empty /proc/loadavg"))?;
        let load = first
            .parse::<f64>()
            .map_err(|e| ParseError::new(format!("Invalid load average '{first}': {e}")))?;
        if !load.is_finite() || load < 0.0 {
            return Err(ParseError::new(format!("Invalid load average '{first}'")));
        }
        Ok(load)
    }

    /// Parses whole seconds since boot from `/proc/uptime`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the first field is missing or not a finite,
    /// non-negative number.
    pub fn parse_uptime(text: &str) -> Result<u64, ParseError> {
        let first = text
            .split_whitespace()
            .next()
            .ok_or_else(|| ParseError::new("Empty /proc/uptime"))?;
        let secs = first
            .parse::<f64>()
            .map_err(|e| ParseError::new(format!("Invalid uptime '{first}': {e}")))?;
        if !secs.is_finite() {
            return Err(ParseError::new(format!("Invalid uptime '{first}'")));
        }
        if secs < 0.0 {
            return Err(ParseError::new("Negative uptime"));
        }
        Ok(secs as u64)
    }
}
