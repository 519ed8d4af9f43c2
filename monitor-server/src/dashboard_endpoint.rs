//! Dashboard endpoints: public summary JSON and the admin HTML view

use crate::server::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use libris_monitor_core::{HealthSnapshot, PublicSummary};
use std::fmt::Write;
use std::sync::Arc;

/// Handler for `/api/analytics/public-dashboard/`
pub async fn public_dashboard_handler(State(state): State<Arc<AppState>>) -> Json<PublicSummary> {
    Json(state.reporter.public_summary().await)
}

/// Handler for `/api/analytics/dashboard/`
pub async fn dashboard_handler(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.reporter.snapshot().await;
    (StatusCode::OK, Html(render_dashboard(&snapshot))).into_response()
}

/// Render a health snapshot as a standalone HTML page
pub fn render_dashboard(snapshot: &HealthSnapshot) -> String {
    let overview = &snapshot.overview;
    let info = &snapshot.system_info;
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Library Monitoring</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
table {{ border-collapse: collapse; }}
td, th {{ border: 1px solid #ccc; padding: 4px 10px; text-align: left; }}
.healthy {{ color: #2e7d32; }} .warning, .degraded {{ color: #f9a825; }}
.critical, .down {{ color: #c62828; }} .unknown {{ color: #757575; }}
</style>
</head>
<body>
<h1>Library Monitoring</h1>
<p>System status: <strong class="{status}">{status}</strong>
(generated {timestamp})</p>
<p>Version {version} &middot; {environment} &middot; up {uptime}s
&middot; scrape interval {scrape}s</p>
"#,
        status = snapshot.system_status,
        timestamp = snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        version = escape_html(&info.version),
        environment = escape_html(&info.environment),
        uptime = info.uptime_seconds,
        scrape = info.scrape_interval_secs,
    );

    html.push_str("<h2>Sections</h2>\n<table>\n");
    html.push_str("<tr><th>Section</th><th>Status</th><th>Figures</th></tr>\n");
    let rows = [
        (
            "users",
            overview.users.status,
            format!(
                "{} total, {} active ({:.2}%)",
                overview.users.total, overview.users.active, overview.users.activity_rate
            ),
        ),
        (
            "books",
            overview.books.status,
            format!(
                "{} total, {} available ({:.2}%)",
                overview.books.total, overview.books.available, overview.books.availability_rate
            ),
        ),
        (
            "loans",
            overview.loans.status,
            format!(
                "{} active, {} overdue ({:.2}%)",
                overview.loans.active, overview.loans.overdue, overview.loans.overdue_rate
            ),
        ),
        (
            "performance",
            overview.performance.status,
            format!(
                "{} requests, {:.2}% errors",
                overview.performance.requests_total, overview.performance.error_rate
            ),
        ),
    ];
    for (name, status, figures) in rows {
        let _ = writeln!(
            html,
            r#"<tr><td>{name}</td><td class="{status}">{status}</td><td>{figures}</td></tr>"#
        );
    }
    html.push_str("</table>\n");

    html.push_str("<h2>Probes</h2>\n<ul>\n");
    for (name, ok) in &snapshot.probes {
        let (class, label) = if *ok { ("healthy", "ok") } else { ("down", "failed") };
        let _ = writeln!(
            html,
            r#"<li>{}: <span class="{class}">{label}</span></li>"#,
            escape_html(name)
        );
    }
    html.push_str("</ul>\n");

    html.push_str("<h2>Alerts</h2>\n");
    if snapshot.alerts.is_empty() {
        html.push_str("<p>No active alerts.</p>\n");
    } else {
        html.push_str("<ul>\n");
        for alert in &snapshot.alerts {
            let _ = writeln!(
                html,
                r#"<li class="{}">[{}] {}</li>"#,
                severity_class(&alert.severity.to_string()),
                alert.severity,
                escape_html(&alert.message)
            );
        }
        html.push_str("</ul>\n");
    }

    if !snapshot.recommendations.is_empty() {
        html.push_str("<h2>Recommendations</h2>\n<ul>\n");
        for recommendation in &snapshot.recommendations {
            let _ = writeln!(html, "<li>{}</li>", escape_html(recommendation));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn severity_class(severity: &str) -> &'static str {
    match severity {
        "critical" => "critical",
        "warning" => "warning",
        _ => "unknown",
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"a" & 'b'</b>"#),
            "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_severity_class() {
        assert_eq!(severity_class("critical"), "critical");
        assert_eq!(severity_class("info"), "unknown");
    }
}
