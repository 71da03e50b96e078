use crate::Error;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Hardware the pipeline runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    /// CUDA when an NVIDIA device node is present and not masked off.
    pub fn detect() -> Self {
        let visible = std::env::var("CUDA_VISIBLE_DEVICES").ok();
        Self::detect_with(visible.as_deref(), Path::new("/dev/nvidia0").exists())
    }

    fn detect_with(visible_devices: Option<&str>, has_device_node: bool) -> Self {
        match visible_devices.map(str::trim) {
            Some("") | Some("-1") => Device::Cpu,
            _ if has_device_node => Device::Cuda,
            _ => Device::Cpu,
        }
    }

    pub fn is_accelerated(self) -> bool {
        matches!(self, Device::Cuda)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => f.write_str("cuda"),
            Device::Cpu => f.write_str("cpu"),
        }
    }
}

/// Configured device preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceChoice {
    #[default]
    Auto,
    Cuda,
    Cpu,
}

impl DeviceChoice {
    pub fn resolve(self) -> Device {
        match self {
            DeviceChoice::Auto => Device::detect(),
            DeviceChoice::Cuda => Device::Cuda,
            DeviceChoice::Cpu => Device::Cpu,
        }
    }
}

impl FromStr for DeviceChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DeviceChoice::Auto),
            "cuda" | "gpu" => Ok(DeviceChoice::Cuda),
            "cpu" => Ok(DeviceChoice::Cpu),
            other => Err(Error::Config(format!("unknown diffusion device '{}'", other))),
        }
    }
}

/// Numeric precision of the model weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Precision {
    #[serde(rename = "fp16")]
    Half,
    #[serde(rename = "fp32")]
    Full,
}

impl Precision {
    /// Half precision only pays off on an accelerator.
    pub fn for_device(device: Device) -> Self {
        if device.is_accelerated() {
            Precision::Half
        } else {
            Precision::Full
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Half => f.write_str("fp16"),
            Precision::Full => f.write_str("fp32"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_prefers_cuda_when_device_node_present() {
        assert_eq!(Device::detect_with(None, true), Device::Cuda);
        assert_eq!(Device::detect_with(Some("0"), true), Device::Cuda);
        assert_eq!(Device::detect_with(None, false), Device::Cpu);
    }

    #[test]
    fn test_detect_respects_masked_devices() {
        assert_eq!(Device::detect_with(Some(""), true), Device::Cpu);
        assert_eq!(Device::detect_with(Some("-1"), true), Device::Cpu);
    }

    #[test]
    fn test_precision_follows_device() {
        assert_eq!(Precision::for_device(Device::Cuda), Precision::Half);
        assert_eq!(Precision::for_device(Device::Cpu), Precision::Full);
        assert_eq!(
            serde_json::to_string(&Precision::Half).unwrap(),
            "\"fp16\""
        );
    }

    #[test]
    fn test_device_choice_parsing() {
        assert_eq!("auto".parse::<DeviceChoice>().unwrap(), DeviceChoice::Auto);
        assert_eq!("CUDA".parse::<DeviceChoice>().unwrap(), DeviceChoice::Cuda);
        assert_eq!(" cpu ".parse::<DeviceChoice>().unwrap(), DeviceChoice::Cpu);
        assert!("tpu".parse::<DeviceChoice>().is_err());
        assert_eq!(DeviceChoice::Cpu.resolve(), Device::Cpu);
    }
}
