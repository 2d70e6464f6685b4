//! Detect command - estimate capabilities and recommend a model.

use async_trait::async_trait;

use webmind_capability::{
    AdapterInfo, CapabilityEstimator, GraphicsSignal, HardwareProbe, ProbeError,
};
use webmind_models::ModelRegistry;

/// Hardware overrides given on the command line.
#[derive(Debug, Default)]
pub(crate) struct DetectFlags {
    pub memory: Option<f64>,
    pub no_gpu: bool,
    pub vendor: Option<String>,
    pub arch: Option<String>,
    pub device: Option<String>,
    pub max_buffer: Option<u64>,
}

/// Probe combining the host's memory with adapter details from flags.
///
/// The terminal has no graphics API to ask, so without adapter flags the
/// adapter reads as absent.
pub(crate) struct HostProbe {
    flags: DetectFlags,
}

#[async_trait]
impl HardwareProbe for HostProbe {
    async fn system_memory_gb(&self) -> Result<Option<f64>, ProbeError> {
        if let Some(memory) = self.flags.memory {
            return Ok(Some(memory));
        }
        host_memory_gb().await
    }

    async fn graphics(&self) -> Result<GraphicsSignal, ProbeError> {
        let flags = &self.flags;
        if flags.no_gpu {
            return Ok(GraphicsSignal::Unavailable);
        }

        let adapter = AdapterInfo {
            vendor: flags.vendor.clone(),
            device: flags.device.clone(),
            architecture: flags.arch.clone(),
            description: None,
            max_buffer_size: flags.max_buffer,
        };
        if adapter == AdapterInfo::default() {
            Ok(GraphicsSignal::NoAdapter)
        } else {
            Ok(GraphicsSignal::Adapter(adapter))
        }
    }
}

#[cfg(target_os = "linux")]
async fn host_memory_gb() -> Result<Option<f64>, ProbeError> {
    let meminfo = tokio::fs::read_to_string("/proc/meminfo")
        .await
        .map_err(|e| ProbeError::Failed(e.to_string()))?;
    Ok(parse_meminfo_gb(&meminfo))
}

#[cfg(not(target_os = "linux"))]
async fn host_memory_gb() -> Result<Option<f64>, ProbeError> {
    Ok(None)
}

/// Total memory from `/proc/meminfo`, in GB.
fn parse_meminfo_gb(meminfo: &str) -> Option<f64> {
    let total_kb: u64 = meminfo
        .lines()
        .find(|line| line.starts_with("MemTotal:"))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()?;

    (total_kb > 0).then(|| total_kb as f64 / (1024.0 * 1024.0))
}

/// Estimator over the host and the given overrides.
pub(crate) fn host_estimator(
    flags: DetectFlags,
    registry: ModelRegistry,
) -> CapabilityEstimator<HostProbe> {
    CapabilityEstimator::new(HostProbe { flags }, registry)
}

pub(crate) async fn run(flags: DetectFlags, json: bool) -> miette::Result<()> {
    let estimator = host_estimator(flags, ModelRegistry::builtin());
    let caps = estimator.estimate().await;

    if json {
        let output = serde_json::to_string_pretty(&caps)
            .map_err(|e| miette::miette!("Failed to serialize capabilities: {}", e))?;
        println!("{}", output);
        return Ok(());
    }

    println!("Device:            {}", caps.device_description);
    println!("Estimated memory:  {:.1} GB", caps.estimated_memory_gb);
    println!("Tier:              {}", caps.tier);
    println!("Method:            {}", caps.estimation_method);
    println!();

    let registry = estimator.registry();
    println!("Runnable models:");
    for id in &caps.runnable_profile_ids {
        let marker = if *id == caps.recommended_profile_id {
            "*"
        } else {
            " "
        };
        match registry.get(id) {
            Some(profile) => println!(
                "  {} {:<18} needs {:.1} GB",
                marker, profile.id, profile.memory_required_gb
            ),
            None => println!("  {} {}", marker, id),
        }
    }
    println!();
    println!("Recommended: {}", caps.recommended_profile_id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "MemTotal:       16303348 kB\nMemFree:         1234 kB\n";
        let gb = parse_meminfo_gb(meminfo).unwrap();
        assert!((gb - 15.55).abs() < 0.01);

        assert_eq!(parse_meminfo_gb("MemFree: 12 kB\n"), None);
        assert_eq!(parse_meminfo_gb("MemTotal: 0 kB\n"), None);
    }

    #[tokio::test]
    async fn test_flags_shape_graphics_signal() {
        let probe = HostProbe {
            flags: DetectFlags {
                no_gpu: true,
                vendor: Some("nvidia".to_string()),
                ..DetectFlags::default()
            },
        };
        assert_eq!(probe.graphics().await.unwrap(), GraphicsSignal::Unavailable);

        let probe = HostProbe {
            flags: DetectFlags::default(),
        };
        assert_eq!(probe.graphics().await.unwrap(), GraphicsSignal::NoAdapter);

        let probe = HostProbe {
            flags: DetectFlags {
                memory: Some(8.0),
                vendor: Some("apple".to_string()),
                ..DetectFlags::default()
            },
        };
        assert_eq!(probe.system_memory_gb().await.unwrap(), Some(8.0));
        assert!(matches!(
            probe.graphics().await.unwrap(),
            GraphicsSignal::Adapter(info) if info.vendor.as_deref() == Some("apple")
        ));
    }
}
