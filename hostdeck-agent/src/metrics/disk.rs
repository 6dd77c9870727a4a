//! Filesystem usage via `df`

use super::UsageStats;
use crate::error::ProbeError;
use crate::execution::{CommandRunner, Invocation};
use std::time::Duration;

const DF_TIMEOUT: Duration = Duration::from_secs(5);

/// Byte-granular usage of the filesystem holding `path`.
pub async fn collect(runner: &dyn CommandRunner, path: &str) -> Result<UsageStats, ProbeError> {
    let output = runner
        .run(Invocation::new("df", ["-B1", "--", path], DF_TIMEOUT))
        .await?;
    parse_df(&output.stdout)
}

/// ```text
/// Filesystem          1B-blocks         Used    Available Use% Mounted on
/// /dev/mapper/vg-root 502392610816 123456789012 353329557504  26% /
/// ```
pub fn parse_df(output: &str) -> Result<UsageStats, ProbeError> {
    let line = output
        .trim()
        .lines()
        .nth(1)
        .ok_or_else(|| ProbeError::parse("df", "missing data line"))?;

    let parts: Vec<&str> = line.split_whitespace().collect();
    let field = |i: usize| -> Result<u64, ProbeError> {
        parts
            .get(i)
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| ProbeError::parse("df", line.to_string()))
    };

    Ok(UsageStats::new(field(2)?, field(1)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_df() {
        let out = "Filesystem     1B-blocks       Used  Available Use% Mounted on\n\
                   /dev/sda1     1000000000  250000000  750000000  25% /\n";
        let usage = parse_df(out).unwrap();
        assert_eq!(usage.total, 1_000_000_000);
        assert_eq!(usage.used, 250_000_000);
        assert!((usage.percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_df_rejects_short_output() {
        assert!(parse_df("Filesystem 1B-blocks Used\n").is_err());
        assert!(parse_df("header\n/dev/sda1 abc def\n").is_err());
    }
}
