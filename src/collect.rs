// Device input collection and parallel table building
//
// Files are read with tokio and every device is parsed on the blocking
// pool. Results are handed back in inventory order so a single task can
// record them into the audit run.

use std::collections::HashMap;
use std::path::Path;
use tokio::task;

use crate::audit::{AuditRun, SiteKey};
use crate::capture::{DeviceCapture, read_session_log};
use crate::config::Config;
use crate::error::{AuditError, AuditResult};
use crate::routes::{DeviceRoutingTable, build_device_table};
use crate::running_config::ospf::OspfConfig;

/// Raw text gathered for one inventory device
#[derive(Debug, Clone)]
pub struct DeviceInput {
    pub device_id: String,
    pub site: SiteKey,
    pub route_text: Option<String>,
    pub running_config: Option<String>,
}

#[derive(Debug)]
pub struct ParsedDevice {
    pub device_id: String,
    pub site: SiteKey,
    pub table: AuditResult<DeviceRoutingTable>,
    /// `None` when no running-config was available to scan
    pub ospf: Option<OspfConfig>,
}

/// Read every device's route output and running-config, from explicit
/// files first and session captures second.
///
/// An unreadable capture is skipped; devices left without route output are
/// reported unparseable later.
pub async fn gather_inputs(config: &Config) -> Vec<DeviceInput> {
    let mut captures: HashMap<String, DeviceCapture> = HashMap::new();
    for path in &config.captures {
        match read_session_log(path).await {
            Ok(loaded) => {
                for capture in loaded {
                    captures.insert(capture.hostname.clone(), capture);
                }
            }
            Err(e) => {
                tracing::warn!("Skipping capture: {} ({})", e, e.user_message());
            }
        }
    }

    let mut inputs = Vec::with_capacity(config.devices.len());
    for device in &config.devices {
        let capture = captures.get(&device.name);

        let route_text = match &device.routes {
            Some(path) => read_optional(path).await,
            None => capture.and_then(|c| c.route_output()).map(str::to_string),
        };
        let running_config = match &device.running_config {
            Some(path) => read_optional(path).await,
            None => capture.and_then(|c| c.running_config()).map(str::to_string),
        };

        if route_text.is_none() {
            tracing::warn!("No route output found for {}", device.name);
        }

        inputs.push(DeviceInput {
            device_id: device.name.clone(),
            site: device.site_key(),
            route_text,
            running_config,
        });
    }

    inputs
}

async fn read_optional(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

/// Parse all devices concurrently on the blocking pool
pub async fn parse_devices(inputs: Vec<DeviceInput>) -> Vec<ParsedDevice> {
    let handles: Vec<_> = inputs
        .into_iter()
        .map(|input| task::spawn_blocking(move || parse_device(input)))
        .collect();

    let mut parsed = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(device) => parsed.push(device),
            Err(e) => tracing::error!("Parse task join error: {}", e),
        }
    }
    parsed
}

fn parse_device(input: DeviceInput) -> ParsedDevice {
    let table = match &input.route_text {
        Some(text) => build_device_table(&input.device_id, text),
        None => Err(AuditError::Unparseable {
            device_id: input.device_id.clone(),
        }),
    };
    let ospf = input
        .running_config
        .as_deref()
        .map(OspfConfig::from_running_config);

    ParsedDevice {
        device_id: input.device_id,
        site: input.site,
        table,
        ospf,
    }
}

/// Record parsed devices into the run from a single writer
pub fn record_all(run: &mut AuditRun, parsed: Vec<ParsedDevice>) {
    for device in parsed {
        run.record(device.site, &device.device_id, device.table);
        if let Some(ospf) = device.ospf {
            run.set_ospf_config(&device.device_id, ospf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use std::path::PathBuf;
    use tracing::Level;

    fn config_with(devices: Vec<DeviceConfig>, captures: Vec<PathBuf>) -> Config {
        Config {
            log_level: Level::INFO,
            output_path: PathBuf::from("unused.json"),
            pretty: true,
            allowed_metrics: vec![110, 120],
            captures,
            devices,
        }
    }

    fn device(name: &str, routes: Option<PathBuf>) -> DeviceConfig {
        DeviceConfig {
            name: name.to_string(),
            country: "UK".to_string(),
            site: "London".to_string(),
            routes,
            running_config: None,
        }
    }

    #[tokio::test]
    async fn test_gather_from_files_and_captures() {
        let dir = tempfile::tempdir().unwrap();
        let routes_path = dir.path().join("r1.txt");
        std::fs::write(&routes_path, "C 10.0.0.0/24 is directly connected, Gi0/1\n").unwrap();
        let capture_path = dir.path().join("session.log");
        std::fs::write(
            &capture_path,
            "R2#terminal length 0\nR2#show ip route\nC 10.0.0.0/24 is directly connected, Gi0/2\nR2#show running-config\nrouter ospf 1\n default-information originate metric 120 metric-type 1\nR2#\n",
        )
        .unwrap();

        let config = config_with(
            vec![device("R1", Some(routes_path)), device("R2", None), device("R3", None)],
            vec![capture_path],
        );

        let inputs = gather_inputs(&config).await;

        assert_eq!(inputs.len(), 3);
        assert!(inputs[0].route_text.as_deref().unwrap().contains("Gi0/1"));
        assert!(inputs[0].running_config.is_none());
        assert!(inputs[1].route_text.as_deref().unwrap().contains("Gi0/2"));
        assert!(inputs[1].running_config.is_some());
        assert!(inputs[2].route_text.is_none());
    }

    #[tokio::test]
    async fn test_missing_capture_does_not_stop_other_devices() {
        let dir = tempfile::tempdir().unwrap();
        let routes_path = dir.path().join("r1.txt");
        std::fs::write(&routes_path, "C 10.0.0.0/24 is directly connected, Gi0/1\n").unwrap();

        let config = config_with(
            vec![device("R1", Some(routes_path)), device("R2", None)],
            vec![dir.path().join("missing.log")],
        );

        let inputs = gather_inputs(&config).await;
        assert_eq!(inputs.len(), 2);
        assert!(inputs[0].route_text.is_some());
        assert!(inputs[1].route_text.is_none());

        let mut run = AuditRun::default();
        record_all(&mut run, parse_devices(inputs).await);

        assert!(run.table("R1").is_some());
        assert_eq!(run.unparseable().len(), 1);
        assert_eq!(run.unparseable()[0].device_id, "R2");
    }

    #[tokio::test]
    async fn test_parse_and_record() {
        let site = SiteKey::new("UK", "London");
        let inputs = vec![
            DeviceInput {
                device_id: "R1".to_string(),
                site: site.clone(),
                route_text: Some("C 10.0.0.0/24 is directly connected, Gi0/1\n".to_string()),
                running_config: Some(
                    "router ospf 1\n default-information originate metric 110 metric-type 1\n"
                        .to_string(),
                ),
            },
            DeviceInput {
                device_id: "R2".to_string(),
                site: site.clone(),
                route_text: None,
                running_config: None,
            },
        ];

        let parsed = parse_devices(inputs).await;
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].device_id, "R1");

        let mut run = AuditRun::default();
        record_all(&mut run, parsed);

        assert!(run.table("R1").is_some());
        assert_eq!(run.ospf_metrics("R1"), Some(&["110".to_string()][..]));
        assert_eq!(run.unparseable()[0].device_id, "R2");
    }
}
