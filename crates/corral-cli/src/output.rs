//! Formatted output helpers for CLI commands.
//!
//! Successful objects go to stdout, one per line; failures go to stderr.
//! Listing commands print fixed-width tables.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use corral_engine::OperationReport;
use corral_engine::report;
use corral_runtime::container::Container;
use corral_runtime::object::ManagedObject;
use corral_runtime::pod::Pod;
use corral_runtime::volume::Volume;

const SHORT_ID_LEN: usize = 12;

/// Prints one line per report and fails if any object failed.
///
/// # Errors
///
/// Returns an error naming how many objects failed.
pub fn print_reports(reports: &[OperationReport]) -> anyhow::Result<()> {
    for r in reports {
        match &r.err {
            None => println!("{}", display_name(r)),
            Some(err) => eprintln!("Error: {err}"),
        }
    }
    let failed = report::collect_errors(reports).len();
    if failed > 0 {
        anyhow::bail!("{failed} of {} operations failed", reports.len());
    }
    Ok(())
}

/// Prints removed objects followed by the reclaimed space.
///
/// # Errors
///
/// Returns an error naming how many objects failed.
pub fn print_prune(reports: &[OperationReport]) -> anyhow::Result<()> {
    let result = print_reports(reports);
    println!("Total reclaimed space: {}", format_bytes(report::sum_size(reports)));
    result
}

/// Prints a container table, or IDs only when `quiet`.
pub fn print_containers(containers: &[Container], quiet: bool) {
    if quiet {
        for c in containers {
            println!("{}", short_id(c.id()));
        }
        return;
    }
    println!(
        "{:<14} {:<32} {:<12} {:<14} {:<20}",
        "CONTAINER ID", "IMAGE", "STATUS", "POD", "NAMES"
    );
    for c in containers {
        println!(
            "{:<14} {:<32} {:<12} {:<14} {:<20}",
            short_id(c.id()),
            c.image_name,
            c.state,
            c.pod_id.as_ref().map_or("", |p| short_id(p.as_str())),
            c.name
        );
    }
}

/// Prints a pod table.
pub fn print_pods(pods: &[Pod]) {
    println!(
        "{:<14} {:<20} {:<10} {:<14} {:<8}",
        "POD ID", "NAME", "STATUS", "INFRA ID", "# OF CONTAINERS"
    );
    for p in pods {
        println!(
            "{:<14} {:<20} {:<10} {:<14} {:<8}",
            short_id(p.id()),
            p.name,
            p.status(),
            p.infra_container_id
                .as_ref()
                .map_or("", |id| short_id(id.as_str())),
            p.members.len()
        );
    }
}

/// Prints a volume table.
pub fn print_volumes(volumes: &[Volume]) {
    println!("{:<10} {:<32} {:<10}", "DRIVER", "VOLUME NAME", "SIZE");
    for v in volumes {
        println!(
            "{:<10} {:<32} {:<10}",
            v.driver,
            v.name,
            format_bytes(v.size_bytes)
        );
    }
}

/// What a successful report prints: the caller's input, or the ID when
/// the object was selected by `--all`, `--latest`, or a filter.
fn display_name(r: &OperationReport) -> &str {
    if r.raw_input.is_empty() {
        &r.id
    } else {
        &r.raw_input
    }
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Formats a byte count into a human-readable string (e.g., "128 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use corral_common::error::CorralError;

    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(134_217_728), "128.0 MiB");
    }

    #[test]
    fn short_id_truncates_long_ids_only() {
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn reports_fail_when_any_object_failed() {
        let ok = vec![OperationReport::ok("abc", "web")];
        assert!(print_reports(&ok).is_ok());
        let mixed = vec![
            OperationReport::ok("abc", "web"),
            OperationReport::failed("def", "db", CorralError::EngineStopped),
        ];
        let err = print_reports(&mixed).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 operations failed");
    }

    #[test]
    fn display_prefers_raw_input() {
        assert_eq!(display_name(&OperationReport::ok("abc", "web")), "web");
        assert_eq!(display_name(&OperationReport::ok("abc", "")), "abc");
    }
}
