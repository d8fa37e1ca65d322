//! Report rendering for the terminal, JSON consumers and browsers.

use anyhow::Result;
use clap::ValueEnum;
use readyprobe_engine::stress::StressReport;
use readyprobe_report_schema::{CompositeReport, HistoryEntry};
use std::fmt::Write;

/// Output format of `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
    Html,
}

pub fn render_report(report: &CompositeReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => text_report(report),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Html => html_report(report),
    }
}

fn text_report(report: &CompositeReport) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "=== Readiness Report {} ===\n", report.run_id)?;
    writeln!(out, "Target:    {}", report.target_address)?;
    writeln!(out, "Started:   {}", report.timestamp)?;
    writeln!(
        out,
        "Overall:   {}/100 ({})",
        report.overall_score, report.readiness_tier
    )?;
    writeln!(out, "  Performance: {:.1}", report.scores.performance)?;
    writeln!(out, "  Security:    {:.1}", report.scores.security)?;
    writeln!(out, "  Compliance:  {:.1}", report.scores.compliance)?;
    writeln!(out)?;

    if !report.phase_failures.is_empty() {
        writeln!(out, "Phase failures:")?;
        for failure in &report.phase_failures {
            writeln!(out, "  - {}: {}", failure.phase, failure.error)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "Endpoints:")?;
    writeln!(out, "{:-<88}", "")?;
    writeln!(
        out,
        "{:<30} {:>8} {:>8} {:>10} {:>10} {:>10} {:>8}",
        "Endpoint", "Requests", "Errors%", "Avg(ms)", "P95(ms)", "P99(ms)", "RPS"
    )?;
    writeln!(out, "{:-<88}", "")?;
    for metric in &report.endpoint_metrics {
        writeln!(
            out,
            "{:<30} {:>8} {:>8.1} {:>10.1} {:>10.1} {:>10.1} {:>8.1}",
            truncate(&metric.endpoint, 30),
            metric.total_requests,
            metric.error_rate,
            metric.avg_latency_ms,
            metric.p95_latency_ms,
            metric.p99_latency_ms,
            metric.requests_per_second
        )?;
    }
    writeln!(out, "{:-<88}", "")?;

    let vuln = &report.vulnerability_report;
    writeln!(
        out,
        "\nSecurity: {:.0} ({}), {} probes, {} failed to execute",
        vuln.security_score, vuln.tier, vuln.probes_executed, vuln.probes_failed
    )?;
    for finding in &vuln.findings {
        writeln!(
            out,
            "  [{}] {} ({}): {}",
            finding.severity, finding.test_name, finding.category, finding.description
        )?;
        if let Some(evidence) = &finding.evidence {
            writeln!(out, "      evidence: {}", evidence)?;
        }
    }

    let compliance = &report.compliance_report;
    writeln!(
        out,
        "\nCompliance: {:.1} ({:.0}% of controls passed), risk {}, ruleset {}",
        compliance.overall_score,
        compliance.compliance_percentage,
        compliance.risk_level,
        compliance.ruleset_version
    )?;
    for summary in &compliance.frameworks {
        writeln!(
            out,
            "  {:<8} {}/{} controls, avg {:.1}",
            summary.framework.to_string(),
            summary.passed_controls,
            summary.total_controls,
            summary.average_score
        )?;
    }
    for failure in &compliance.failures {
        writeln!(
            out,
            "  FAIL {} {} ({:.0}, {}): {}",
            failure.control_id, failure.name, failure.score, failure.risk_level, failure.details
        )?;
    }

    if !report.recommendations.is_empty() {
        writeln!(out, "\nRecommendations:")?;
        for (index, recommendation) in report.recommendations.iter().enumerate() {
            writeln!(out, "  {}. {}", index + 1, recommendation)?;
        }
    }
    Ok(out)
}

fn html_report(report: &CompositeReport) -> Result<String> {
    let mut out = String::new();
    write!(
        out,
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Readiness Report {run_id}</title>
    <style>
        body {{ font-family: sans-serif; margin: 20px; }}
        table {{ border-collapse: collapse; width: 100%; margin-bottom: 20px; }}
        th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
        th {{ background-color: #4CAF50; color: white; }}
        tr:nth-child(even) {{ background-color: #f2f2f2; }}
        .pass {{ color: green; font-weight: bold; }}
        .fail {{ color: red; font-weight: bold; }}
        .summary {{ margin-bottom: 20px; }}
    </style>
</head>
<body>
    <h1>Readiness Report</h1>

    <div class="summary">
        <p>Target: {target} | Run: {run_id}</p>
        <h2>{overall}/100 ({tier})</h2>
        <p>Performance: {performance:.1} | Security: {security:.1} | Compliance: {compliance:.1}</p>
    </div>
"#,
        run_id = escape(report.run_id.as_str()),
        target = escape(&report.target_address),
        overall = report.overall_score,
        tier = report.readiness_tier,
        performance = report.scores.performance,
        security = report.scores.security,
        compliance = report.scores.compliance,
    )?;

    writeln!(
        out,
        "    <h2>Endpoints</h2>\n    <table>\n        <tr><th>Endpoint</th><th>Requests</th><th>Error rate</th><th>Avg</th><th>P95</th><th>P99</th><th>RPS</th></tr>"
    )?;
    for metric in &report.endpoint_metrics {
        writeln!(
            out,
            "        <tr><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}ms</td><td>{:.1}ms</td><td>{:.1}ms</td><td>{:.1}</td></tr>",
            escape(&metric.endpoint),
            metric.total_requests,
            metric.error_rate,
            metric.avg_latency_ms,
            metric.p95_latency_ms,
            metric.p99_latency_ms,
            metric.requests_per_second
        )?;
    }
    writeln!(out, "    </table>")?;

    writeln!(
        out,
        "    <h2>Findings</h2>\n    <table>\n        <tr><th>Probe</th><th>Severity</th><th>Category</th><th>Description</th><th>Evidence</th></tr>"
    )?;
    for finding in &report.vulnerability_report.findings {
        writeln!(
            out,
            r#"        <tr><td>{}</td><td class="fail">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            escape(&finding.test_name),
            finding.severity,
            finding.category,
            escape(&finding.description),
            escape(finding.evidence.as_deref().unwrap_or(""))
        )?;
    }
    writeln!(out, "    </table>")?;

    writeln!(
        out,
        "    <h2>Controls</h2>\n    <table>\n        <tr><th>Control</th><th>Status</th><th>Score</th><th>Risk</th><th>Details</th></tr>"
    )?;
    for result in &report.compliance_report.results {
        let (class, status) = if result.compliant {
            ("pass", "PASS")
        } else {
            ("fail", "FAIL")
        };
        writeln!(
            out,
            r#"        <tr><td>{}</td><td class="{}">{}</td><td>{:.0}</td><td>{}</td><td>{}</td></tr>"#,
            escape(&result.control_id),
            class,
            status,
            result.score,
            result.risk_level,
            escape(&result.details)
        )?;
    }
    writeln!(out, "    </table>")?;

    writeln!(out, "    <h2>Recommendations</h2>\n    <ol>")?;
    for recommendation in &report.recommendations {
        writeln!(out, "        <li>{}</li>", escape(recommendation))?;
    }
    writeln!(out, "    </ol>\n</body>\n</html>")?;
    Ok(out)
}

pub fn render_history(entries: &[HistoryEntry]) -> Result<String> {
    let mut out = String::new();
    if entries.is_empty() {
        writeln!(out, "No runs recorded.")?;
        return Ok(out);
    }
    writeln!(
        out,
        "{:<42} {:>7} {:<20} {:<25}",
        "Run", "Score", "Tier", "Written"
    )?;
    writeln!(out, "{:-<96}", "")?;
    for entry in entries {
        writeln!(
            out,
            "{:<42} {:>7} {:<20} {:<25}",
            entry.run_id.as_str(),
            entry.overall_score,
            entry.readiness_tier.to_string(),
            entry.written_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
    }
    Ok(out)
}

pub fn render_stress(report: &StressReport) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "=== Stress Profile {} ===\n", report.target_address)?;
    writeln!(
        out,
        "{:>8} {:>10} {:>10} {:>10}",
        "Users", "Errors%", "Avg(ms)", "RPS"
    )?;
    writeln!(out, "{:-<42}", "")?;
    for tier in &report.tiers {
        writeln!(
            out,
            "{:>8} {:>10.1} {:>10.1} {:>10.1}",
            tier.concurrency, tier.error_rate, tier.avg_latency_ms, tier.requests_per_second
        )?;
    }
    writeln!(out, "{:-<42}", "")?;
    match report.max_stable_concurrency {
        Some(users) => writeln!(out, "Max stable concurrency: {}", users)?,
        None => writeln!(out, "No tier stayed under the error threshold")?,
    }
    if let Some(users) = report.breaking_point {
        writeln!(
            out,
            "Breaking point: {} users{}",
            users,
            if report.stopped_early {
                " (stopped early)"
            } else {
                ""
            }
        )?;
    }
    Ok(out)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
