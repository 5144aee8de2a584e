//! Host telemetry from procfs, sysfs and a couple of standard tools

use netcfg_proto::DeviceInfo;
use tokio::process::Command;
use tracing::debug;

const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";
const BOARD_MODEL: &str = "/proc/device-tree/model";

/// Collect a telemetry snapshot. Missing sources degrade to defaults.
pub async fn read_device_info() -> DeviceInfo {
    let uptime_s = read("/proc/uptime")
        .await
        .and_then(|s| parse_uptime(&s))
        .unwrap_or(0);

    DeviceInfo {
        hostname: read("/proc/sys/kernel/hostname")
            .await
            .map(|s| short_hostname(&s).to_string())
            .unwrap_or_default(),
        cpu_load: read("/proc/loadavg")
            .await
            .and_then(|s| parse_loadavg(&s))
            .map(|l| round(l, 2))
            .unwrap_or(0.0),
        cpu_temp_c: read_temperature().await.map(|t| round(t, 1)),
        mem_used_pct: read("/proc/meminfo")
            .await
            .and_then(|s| parse_meminfo_used_pct(&s))
            .unwrap_or(0.0),
        disk_used_pct: output("df", &["-P", "/"])
            .await
            .and_then(|s| parse_df_used_pct(&s))
            .unwrap_or(0.0),
        uptime: format_uptime(uptime_s),
        uptime_s,
        os: format!(
            "{} {}",
            read("/etc/os-release")
                .await
                .and_then(|s| parse_pretty_name(&s))
                .unwrap_or_else(|| "Linux".to_string()),
            std::env::consts::ARCH
        ),
        host: read(BOARD_MODEL)
            .await
            .map(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        kernel: read("/proc/sys/kernel/osrelease")
            .await
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

async fn read(path: &str) -> Option<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            debug!("cannot read {path}: {e}");
            None
        }
    }
}

async fn output(program: &str, args: &[&str]) -> Option<String> {
    let out = Command::new(program).args(args).output().await.ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).into_owned())
}

/// `vcgencmd` on Raspberry Pi firmware, else the first thermal zone.
async fn read_temperature() -> Option<f64> {
    if let Some(t) = output("vcgencmd", &["measure_temp"]).await.and_then(|s| parse_vcgencmd_temp(&s)) {
        return Some(t);
    }
    read(THERMAL_ZONE)
        .await
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(|milli| milli as f64 / 1000.0)
}

fn round(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

fn short_hostname(raw: &str) -> &str {
    raw.trim().split('.').next().unwrap_or_default()
}

fn parse_uptime(s: &str) -> Option<u64> {
    s.split_whitespace().next()?.parse::<f64>().ok().map(|secs| secs as u64)
}

fn parse_loadavg(s: &str) -> Option<f64> {
    s.split_whitespace().next()?.parse().ok()
}

/// `temp=48.3'C`
fn parse_vcgencmd_temp(s: &str) -> Option<f64> {
    s.trim().strip_prefix("temp=")?.trim_end_matches(['\'', 'C']).parse().ok()
}

/// (MemTotal - MemAvailable) / MemTotal, as a percentage with one decimal
fn parse_meminfo_used_pct(s: &str) -> Option<f64> {
    let field = |name: &str| -> Option<f64> {
        s.lines()
            .find_map(|line| line.strip_prefix(name)?.strip_prefix(':'))
            .and_then(|rest| rest.split_whitespace().next()?.parse().ok())
    };
    let total = field("MemTotal")?;
    let available = field("MemAvailable")?;
    (total > 0.0).then(|| round((total - available) * 100.0 / total, 1))
}

/// Capacity column of `df -P`
fn parse_df_used_pct(s: &str) -> Option<f64> {
    s.lines().nth(1)?.split_whitespace().nth(4)?.trim_end_matches('%').parse().ok()
}

fn parse_pretty_name(os_release: &str) -> Option<String> {
    os_release
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|v| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

/// Same shape as `uptime -p`: "up 2 days, 3 hours, 4 minutes"
fn format_uptime(secs: u64) -> String {
    let units = [
        (secs / 604_800, "week"),
        (secs / 86_400 % 7, "day"),
        (secs / 3600 % 24, "hour"),
        (secs / 60 % 60, "minute"),
    ];
    let parts: Vec<String> = units
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n} {unit}{}", if *n == 1 { "" } else { "s" }))
        .collect();
    if parts.is_empty() {
        "up 0 minutes".to_string()
    } else {
        format!("up {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_parsers() {
        assert_eq!(parse_uptime("12345.67 40000.00\n"), Some(12345));
        assert_eq!(parse_loadavg("0.42 0.30 0.25 1/123 4567\n"), Some(0.42));
        assert_eq!(parse_vcgencmd_temp("temp=48.3'C\n"), Some(48.3));
        assert_eq!(short_hostname("raspberrypi.local\n"), "raspberrypi");
    }

    #[test]
    fn memory_used_percentage() {
        let meminfo = "MemTotal:        1000000 kB\nMemFree:          100000 kB\nMemAvailable:     250000 kB\n";
        assert_eq!(parse_meminfo_used_pct(meminfo), Some(75.0));
        assert_eq!(parse_meminfo_used_pct("MemFree: 1 kB\n"), None);
    }

    #[test]
    fn disk_used_percentage() {
        let df = "Filesystem     1024-blocks    Used Available Capacity Mounted on\n/dev/root         30000000 9000000  21000000      31% /\n";
        assert_eq!(parse_df_used_pct(df), Some(31.0));
    }

    #[test]
    fn os_pretty_name() {
        let release = "NAME=\"Debian GNU/Linux\"\nPRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\n";
        assert_eq!(parse_pretty_name(release).as_deref(), Some("Debian GNU/Linux 12 (bookworm)"));
    }

    #[test]
    fn uptime_text() {
        assert_eq!(format_uptime(30), "up 0 minutes");
        assert_eq!(format_uptime(3 * 3600 + 60), "up 3 hours, 1 minute");
        assert_eq!(format_uptime(9 * 86_400), "up 1 week, 2 days");
    }
}
