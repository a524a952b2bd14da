//! Tool version probing and comparison.

use regex::Regex;
use std::cmp::Ordering;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const VERSION_TIMEOUT: Duration = Duration::from_secs(30);

static DOTTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)+").unwrap());

/// First dotted-numeric token in `text`, e.g. `2024.05.27` or `6.1.1`.
pub fn extract_version(text: &str) -> Option<String> {
    DOTTED.find(text).map(|m| m.as_str().to_string())
}

fn components(version: &str) -> Option<Vec<u64>> {
    version
        .trim()
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Component-wise comparison; missing trailing components count as zero.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = components(a)?;
    let b = components(b)?;
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    Some(Ordering::Equal)
}

/// Whether `found` is at least `required`. Unparseable counts as stale.
pub fn satisfies(found: &str, required: &str) -> bool {
    matches!(
        compare_versions(found, required),
        Some(Ordering::Equal | Ordering::Greater)
    )
}

/// Run `<binary> <arg>` and extract the version from the first non-empty line.
pub async fn probe_version(binary: &Path, arg: &str) -> Option<String> {
    let run = Command::new(binary)
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(VERSION_TIMEOUT, run).await {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(output)) => {
            debug!(binary = %binary.display(), status = %output.status, "Version command failed");
            return None;
        }
        Ok(Err(e)) => {
            debug!(binary = %binary.display(), "Version command could not run: {}", e);
            return None;
        }
        Err(_) => return None,
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stdout
        .lines()
        .chain(stderr.lines())
        .find(|l| !l.trim().is_empty())?;
    extract_version(line)
}
