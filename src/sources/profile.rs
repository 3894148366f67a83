use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use sysinfo::{PidExt, ProcessExt, System, SystemExt};

/// What a profile snapshot should capture.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Async runtime scheduler state
    Tasks,
    /// OS-level process statistics
    Process,
    /// Both of the above
    #[default]
    Full,
}

/// Source of runtime execution profiles.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Capture a profile of `kind`.
    ///
    /// `duration_secs` is the sampling window (0 for an instantaneous
    /// snapshot); `rate_hint` is the desired samples per second within it.
    async fn capture_profile(&self, kind: ProfileKind, duration_secs: u64, rate_hint: u32) -> Result<Vec<u8>>;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RuntimeSnapshot {
    pub workers: usize,
    pub alive_tasks: usize,
    pub global_queue_depth: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub status: String,
    pub memory_bytes: u64,
    pub virtual_memory_bytes: u64,
    pub run_time_secs: u64,
    /// CPU usage percentages, one per sample
    pub cpu_samples: Vec<f32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProfileSnapshot {
    pub captured_at: String,
    pub hostname: Option<String>,
    pub kind: ProfileKind,
    pub runtime: Option<RuntimeSnapshot>,
    pub process: Option<ProcessSnapshot>,
}

// sysinfo needs at least this long between refreshes for CPU usage to be meaningful
const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);
const MAX_SAMPLES: u64 = 600;

/// Profiles the current process and the tokio runtime it runs on.
///
/// The snapshot is serialized as pretty JSON.
#[derive(Debug, Default, Clone)]
pub struct RuntimeProfiler;

impl RuntimeProfiler {
    pub fn new() -> Self {
        Self
    }

    fn runtime_snapshot() -> Result<RuntimeSnapshot> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| anyhow!("No async runtime to profile: {}", e))?;
        let metrics = handle.metrics();
        Ok(RuntimeSnapshot {
            workers: metrics.num_workers(),
            alive_tasks: metrics.num_alive_tasks(),
            global_queue_depth: metrics.global_queue_depth(),
        })
    }

    async fn process_snapshot(duration_secs: u64, rate_hint: u32) -> Result<ProcessSnapshot> {
        let samples = sample_count(duration_secs, rate_hint);
        let interval = if samples > 1 {
            (Duration::from_secs(duration_secs) / (samples as u32 - 1)).max(MIN_SAMPLE_INTERVAL)
        } else {
            Duration::ZERO
        };

        tokio::task::spawn_blocking(move || {
            let pid = sysinfo::get_current_pid().map_err(|e| anyhow!("Failed to get current pid: {}", e))?;
            let mut system = System::new();
            let mut cpu_samples = Vec::with_capacity(samples as usize);

            for i in 0..samples {
                if i > 0 {
                    std::thread::sleep(interval);
                }
                if !system.refresh_process(pid) {
                    return Err(anyhow!("Process {} not found", pid.as_u32()));
                }
                if let Some(process) = system.process(pid) {
                    cpu_samples.push(process.cpu_usage());
                }
            }

            let process = system
                .process(pid)
                .ok_or_else(|| anyhow!("Process {} not found", pid.as_u32()))?;

            Ok(ProcessSnapshot {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                status: format!("{:?}", process.status()),
                memory_bytes: process.memory(),
                virtual_memory_bytes: process.virtual_memory(),
                run_time_secs: process.run_time(),
                cpu_samples,
            })
        })
        .await
        .context("Process sampling task failed")?
    }
}

/// Number of process samples to take for a window
fn sample_count(duration_secs: u64, rate_hint: u32) -> u64 {
    if duration_secs == 0 {
        return 1;
    }
    let rate = u64::from(rate_hint.clamp(1, 5));
    (duration_secs * rate + 1).min(MAX_SAMPLES)
}

#[async_trait]
impl ProfileSource for RuntimeProfiler {
    async fn capture_profile(&self, kind: ProfileKind, duration_secs: u64, rate_hint: u32) -> Result<Vec<u8>> {
        debug!("Capturing {:?} profile over {}s (rate hint {})", kind, duration_secs, rate_hint);

        let runtime = match kind {
            ProfileKind::Tasks | ProfileKind::Full => Some(Self::runtime_snapshot()?),
            ProfileKind::Process => None,
        };

        let process = match kind {
            ProfileKind::Process | ProfileKind::Full => Some(Self::process_snapshot(duration_secs, rate_hint).await?),
            ProfileKind::Tasks => None,
        };

        let snapshot = ProfileSnapshot {
            captured_at: Utc::now().to_rfc3339(),
            hostname: hostname::get().ok().map(|h| h.to_string_lossy().to_string()),
            kind,
            runtime,
            process,
        };

        serde_json::to_vec_pretty(&snapshot).context("Failed to serialize profile snapshot")
    }
}
