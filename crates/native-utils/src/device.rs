use anyhow::Context;
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

//finds the input device with the given name, or the host's default input device
pub fn get_or_default_input(device_name: Option<&str>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        Some(target) => host
            .input_devices()
            .context("Failed to enumerate input devices")?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow::anyhow!("No input device named {:?}", target)),
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No default input device")),
    }
}

//does the same as the input device above
pub fn get_or_default_output(device_name: Option<&str>) -> anyhow::Result<Device> {
    let host = get_host();
    match device_name {
        Some(target) => host
            .output_devices()
            .context("Failed to enumerate output devices")?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow::anyhow!("No output device named {:?}", target)),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device")),
    }
}

fn describe(name: &str, channels: u16, sample_rate: u32, is_default: bool) -> String {
    let mut d = format!(" * {}({}ch, {}hz)", name, channels, sample_rate);
    if is_default {
        d.push_str(" [default]");
    }
    d
}

/// Lists input devices, one per line, marking the default.
pub fn get_available_inputs() -> anyhow::Result<String> {
    let host = get_host();
    let default_device = host.default_input_device().and_then(|d| d.name().ok());

    let mut device_names: Vec<String> = Vec::new();
    for in_device in host.input_devices().context("No input devices found")? {
        let Ok(d_name) = in_device.name() else {
            continue;
        };
        match in_device.default_input_config() {
            Ok(d_cfg) => device_names.push(describe(
                &d_name,
                d_cfg.channels(),
                d_cfg.sample_rate().0,
                default_device.as_deref() == Some(d_name.as_str()),
            )),
            Err(e) => tracing::debug!("Skipping input {}: {}", d_name, e),
        }
    }
    Ok(device_names.join("\n"))
}

/// Lists output devices, one per line, marking the default.
pub fn get_available_outputs() -> anyhow::Result<String> {
    let host = get_host();
    let default_device = host.default_output_device().and_then(|d| d.name().ok());

    let mut device_names: Vec<String> = Vec::new();
    for out_device in host.output_devices().context("No output devices found")? {
        let Ok(d_name) = out_device.name() else {
            continue;
        };
        match out_device.default_output_config() {
            Ok(d_cfg) => device_names.push(describe(
                &d_name,
                d_cfg.channels(),
                d_cfg.sample_rate().0,
                default_device.as_deref() == Some(d_name.as_str()),
            )),
            Err(e) => tracing::debug!("Skipping output {}: {}", d_name, e),
        }
    }
    Ok(device_names.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_marks_default() {
        assert_eq!(describe("mic", 1, 16000, true), " * mic(1ch, 16000hz) [default]");
        assert_eq!(describe("usb", 2, 48000, false), " * usb(2ch, 48000hz)");
    }
}
