//! Rendering check outcomes as a table, advisory lines or JSON

use std::fmt;
use std::io;
use std::str::FromStr;

use console::Style;

use crate::config::{PolicyConfig, UpToDatePolicy};
use crate::report::sink::OutputSink;
use crate::version::checker::{CheckOutcome, NotFoundTier, ResolvedRequirement};

const RULE_WIDTH: usize = 80;
const PACKAGE_COLUMN_WIDTH: usize = 30;

/// Output layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Fixed-width rows, one per requirement
    #[default]
    Table,
    /// One advisory line per finding
    List,
    /// Every outcome serialized, no gating
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(ReportFormat::Table),
            "list" => Ok(ReportFormat::List),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!(
                "unknown format \"{}\" (expected table, list or json)",
                other
            )),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportFormat::Table => "table",
            ReportFormat::List => "list",
            ReportFormat::Json => "json",
        })
    }
}

struct Theme {
    ok: Style,
    outdated: Style,
    alert: Style,
    name: Style,
}

impl Theme {
    fn new(colors: bool) -> Self {
        let base = || Style::new().force_styling(colors);
        Self {
            ok: base().green(),
            outdated: base().red(),
            alert: base().red(),
            name: base().green(),
        }
    }
}

/// Write `outcomes` to `sink`
pub fn render(
    outcomes: &[CheckOutcome],
    format: ReportFormat,
    policy: &PolicyConfig,
    sink: &mut dyn OutputSink,
) -> io::Result<()> {
    match format {
        ReportFormat::Table => render_table(outcomes, policy, sink),
        ReportFormat::List => render_list(outcomes, policy, sink),
        ReportFormat::Json => render_json(outcomes, sink),
    }
}

/// Whether a resolved requirement deserves a row
fn is_reported(resolved: &ResolvedRequirement, policy: &PolicyConfig, verbose: bool) -> bool {
    let classification = &resolved.classification;
    if classification.anomalous && !policy.report_anomalies {
        return false;
    }
    if classification.up_to_date {
        return verbose || policy.up_to_date == UpToDatePolicy::Always;
    }
    true
}

fn not_found_line(target: &str, tier: NotFoundTier, theme: &Theme) -> String {
    let suffix = match tier {
        NotFoundTier::Local => "package not found",
        NotFoundTier::GlobalConstrained => "global package not found (constrained)",
        NotFoundTier::GlobalUnconstrained => "global package not found (un-constrained)",
    };
    format!(
        "{} {} {}",
        theme.alert.apply_to("!!!"),
        theme.name.apply_to(target),
        suffix
    )
}

fn anomaly_line(resolved: &ResolvedRequirement, theme: &Theme) -> String {
    format!(
        "{} {} installed {} is newer than {} from the repositories",
        theme.alert.apply_to("???"),
        theme.name.apply_to(&resolved.target),
        resolved.current,
        resolved.constrained
    )
}

fn row(package: &str, required: &str, current: &str, update: String, latest: String) -> String {
    let package: String = package.chars().take(PACKAGE_COLUMN_WIDTH).collect();
    format!(
        "{:<30} | {:<10} | {:<10} | {} | {}",
        package, required, current, update, latest
    )
}

fn render_table(
    outcomes: &[CheckOutcome],
    policy: &PolicyConfig,
    sink: &mut dyn OutputSink,
) -> io::Result<()> {
    let theme = Theme::new(sink.use_colors());
    let verbose = sink.is_verbose();
    let rule = "-".repeat(RULE_WIDTH);

    sink.write_line("")?;
    sink.write_line("Checking for available updates")?;
    sink.write_line(&rule)?;
    sink.write_line(&row(
        "Package",
        "Require",
        "Current",
        format!("{:<10}", "Update"),
        format!("{:<10}", "Latest"),
    ))?;
    sink.write_line(&rule)?;

    for outcome in outcomes {
        let resolved = match outcome {
            CheckOutcome::NotFound { target, tier } => {
                sink.write_line(&not_found_line(target, *tier, &theme))?;
                continue;
            }
            CheckOutcome::Resolved(resolved) => resolved,
        };

        if !is_reported(resolved, policy, verbose) {
            continue;
        }

        // Cells are padded before styling so escape codes do not break alignment
        let cell = |text: &str| {
            let style = if text == resolved.current {
                &theme.ok
            } else {
                &theme.outdated
            };
            style.apply_to(format!("{:<10}", text)).to_string()
        };

        sink.write_line(&row(
            &resolved.target,
            &resolved.required,
            &resolved.current,
            cell(&resolved.constrained),
            cell(&resolved.latest),
        ))?;

        if resolved.classification.anomalous {
            sink.write_line(&anomaly_line(resolved, &theme))?;
        }
    }

    sink.write_line("")
}

fn render_list(
    outcomes: &[CheckOutcome],
    policy: &PolicyConfig,
    sink: &mut dyn OutputSink,
) -> io::Result<()> {
    let theme = Theme::new(sink.use_colors());
    let verbose = sink.is_verbose();

    for outcome in outcomes {
        let resolved = match outcome {
            CheckOutcome::NotFound { target, tier } => {
                sink.write_line(&not_found_line(target, *tier, &theme))?;
                continue;
            }
            CheckOutcome::Resolved(resolved) => resolved,
        };

        if !is_reported(resolved, policy, verbose) {
            continue;
        }

        let classification = &resolved.classification;
        let name = theme.name.apply_to(&resolved.target);

        if classification.up_to_date {
            sink.write_line(&format!(
                "{} {} is up to date",
                name,
                theme.ok.apply_to(&resolved.current)
            ))?;
        }
        if classification.update_available {
            sink.write_line(&format!(
                "{} {} -> {} (within {})",
                name,
                resolved.current,
                theme.ok.apply_to(&resolved.constrained),
                resolved.required
            ))?;
        }
        if classification.upgrade_available {
            sink.write_line(&format!(
                "{} {} -> {} (requires changing {})",
                name,
                resolved.constrained,
                theme.outdated.apply_to(&resolved.latest),
                resolved.required
            ))?;
        }
        if classification.anomalous {
            sink.write_line(&anomaly_line(resolved, &theme))?;
        }
    }

    Ok(())
}

fn render_json(outcomes: &[CheckOutcome], sink: &mut dyn OutputSink) -> io::Result<()> {
    let json = serde_json::to_string_pretty(outcomes)?;
    sink.write_line(&json)
}
