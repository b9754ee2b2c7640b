//! Modem telemetry via ModemManager.
//!
//! Enumerates modems with `mmcli -L`, keeps those whose generic state is
//! `connected` and that expose a net port, and reads LTE (or NR) RSRQ from
//! the extended signal interface. All calls use mmcli's JSON output.
//!
//! Links are named `mdm-<index>` after the ModemManager modem index; the
//! routing rule of a link is its net port (e.g. `wwan0`).

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use strata_select::{Link, LinkId, SelectError, TelemetrySource};

/// Link id prefix for modem links.
pub const LINK_PREFIX: &str = "mdm-";

/// Extended-signal polling rate requested from ModemManager, in seconds.
const SIGNAL_RATE_S: u64 = 5;

pub struct ModemManagerTelemetry {
    mmcli: PathBuf,
}

impl ModemManagerTelemetry {
    pub fn new(mmcli: impl Into<PathBuf>) -> Self {
        ModemManagerTelemetry {
            mmcli: mmcli.into(),
        }
    }

    async fn mmcli(&self, args: &[&str]) -> Result<Value, SelectError> {
        let output = tokio::process::Command::new(&self.mmcli)
            .args(args)
            .arg("--output-json")
            .output()
            .await
            .map_err(|e| SelectError::Telemetry(format!("{}: {e}", self.mmcli.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SelectError::Telemetry(format!(
                "mmcli {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| SelectError::Telemetry(format!("mmcli {}: {e}", args.join(" "))))
    }
}

impl TelemetrySource for ModemManagerTelemetry {
    async fn uptime(&self) -> Result<Duration, SelectError> {
        read_uptime().await
    }

    async fn links(&self) -> Result<Vec<Link>, SelectError> {
        let list = self.mmcli(&["--list-modems"]).await?;
        let mut links = Vec::new();

        for index in parse_modem_list(&list) {
            let status = match self.mmcli(&["--modem", index.as_str()]).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(modem = %index, error = %e, "failed to read modem status");
                    continue;
                }
            };
            let Some(modem) = parse_modem_status(&status) else {
                tracing::warn!(modem = %index, "unrecognised modem status output");
                continue;
            };
            if modem.state != "connected" {
                tracing::debug!(modem = %index, state = %modem.state, "skipping modem that is not connected");
                continue;
            }
            let Some(port) = modem.net_port else {
                tracing::debug!(modem = %index, "skipping modem without a net port");
                continue;
            };

            let rate = format!("--signal-setup={SIGNAL_RATE_S}");
            if let Err(e) = self.mmcli(&["--modem", index.as_str(), rate.as_str()]).await {
                tracing::warn!(modem = %index, error = %e, "failed to enable extended signal polling");
            }

            links.push(Link::new(format!("{LINK_PREFIX}{index}"), port));
        }

        Ok(links)
    }

    async fn quality(&self, link: &Link) -> Result<i64, SelectError> {
        let index = modem_index(&link.id)
            .ok_or_else(|| SelectError::Telemetry(format!("{} is not a modem link", link.id)))?;
        let signal = self.mmcli(&["--modem", index, "--signal-get"]).await?;
        parse_rsrq(&signal)
            .ok_or_else(|| SelectError::Telemetry(format!("no RSRQ reported for {}", link.id)))
    }
}

/// Modem index encoded in a link id (`mdm-3` → `3`).
pub fn modem_index(id: &LinkId) -> Option<&str> {
    id.as_str()
        .strip_prefix(LINK_PREFIX)
        .filter(|i| !i.is_empty() && i.bytes().all(|b| b.is_ascii_digit()))
}

/// Modem indexes from `mmcli -L -J`, whose entries are D-Bus object paths
/// such as `/org/freedesktop/ModemManager1/Modem/0`.
pub fn parse_modem_list(v: &Value) -> Vec<String> {
    v.get("modem-list")
        .and_then(|v| v.as_array())
        .map(|paths| {
            paths
                .iter()
                .filter_map(|p| p.as_str())
                .filter_map(|p| p.rsplit('/').next())
                .filter(|i| !i.is_empty())
                .map(|i| i.to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemStatus {
    pub state: String,
    pub net_port: Option<String>,
}

/// Generic state and net port from `mmcli -m <n> -J`.
///
/// Ports are listed as `"wwan0 (net)"`; the first net port wins.
pub fn parse_modem_status(v: &Value) -> Option<ModemStatus> {
    let generic = v.get("modem")?.get("generic")?;
    let state = generic.get("state")?.as_str()?.to_string();
    let net_port = generic
        .get("ports")
        .and_then(|p| p.as_array())
        .and_then(|ports| {
            ports
                .iter()
                .filter_map(|p| p.as_str())
                .find_map(|p| p.strip_suffix(" (net)"))
                .map(|name| name.trim().to_string())
        });
    Some(ModemStatus { state, net_port })
}

/// RSRQ from `mmcli -m <n> --signal-get -J`, truncated toward zero.
///
/// LTE is preferred; NR is used when LTE reports nothing. mmcli prints
/// `"--"` for unavailable values.
pub fn parse_rsrq(v: &Value) -> Option<i64> {
    let signal = v.get("modem")?.get("signal")?;
    ["lte", "5g"].iter().find_map(|tech| {
        signal
            .get(tech)?
            .get("rsrq")?
            .as_str()?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v as i64)
    })
}

/// Host uptime from `/proc/uptime`.
pub async fn read_uptime() -> Result<Duration, SelectError> {
    let text = tokio::fs::read_to_string("/proc/uptime")
        .await
        .map_err(|e| SelectError::Telemetry(format!("/proc/uptime: {e}")))?;
    parse_uptime(&text)
        .ok_or_else(|| SelectError::Telemetry(format!("unparseable /proc/uptime: {text:?}")))
}

/// First field of `/proc/uptime`, whole seconds.
pub fn parse_uptime(text: &str) -> Option<Duration> {
    text.split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| Duration::from_secs(v as u64))
}
