//! HTML status page.

use std::fmt::Write;

use html_escape::encode_text;

use crate::diagnostics::state::{LastOutcome, RequestSummary};
use crate::upstream::ProbeResult;

/// Everything the status page shows.
#[derive(Debug, Clone)]
pub struct StatusView {
    pub version: &'static str,
    pub endpoint: String,
    pub api_version: String,
    pub has_default_credential: bool,
    pub last_outcome: LastOutcome,
    pub total_requests: u64,
    pub probe: ProbeResult,
    pub recent: Vec<RequestSummary>,
}

/// Render the page. All interpolated text goes through `encode_text`.
pub fn render_status_page(view: &StatusView) -> String {
    let (outcome_class, outcome_text) = match view.last_outcome {
        LastOutcome::Unknown => ("unknown", "No requests yet"),
        LastOutcome::Succeeded => ("ok", "Last request succeeded"),
        LastOutcome::Failed => ("fail", "Last request failed"),
    };

    let probe_text = match (&view.probe.status, &view.probe.error) {
        (Some(status), _) => format!("reachable (HTTP {}, {} ms)", status, view.probe.latency_ms),
        (None, Some(error)) => format!("unreachable: {}", error),
        (None, None) => "unreachable".to_string(),
    };
    let probe_class = if view.probe.reachable { "ok" } else { "fail" };

    let mut html = String::with_capacity(4096);
    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>SSE chat proxy status</title>\n<style>\n\
         body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\n\
         table{border-collapse:collapse;margin-top:1rem}\n\
         td,th{border:1px solid #ccc;padding:.3rem .6rem;text-align:left;font-size:.9rem}\n\
         .ok{color:#1a7f37}.fail{color:#cf222e}.unknown{color:#57606a}\n\
         </style>\n</head>\n<body>\n",
    );

    let _ = writeln!(html, "<h1>SSE chat proxy <small>v{}</small></h1>", encode_text(view.version));
    html.push_str("<table>\n");
    let _ = writeln!(html, "<tr><th>Upstream endpoint</th><td>{}</td></tr>", encode_text(&view.endpoint));
    let _ = writeln!(html, "<tr><th>API version</th><td>{}</td></tr>", encode_text(&view.api_version));
    let _ = writeln!(
        html,
        "<tr><th>Default credential</th><td>{}</td></tr>",
        if view.has_default_credential { "configured" } else { "not configured" }
    );
    let _ = writeln!(
        html,
        "<tr><th>Last request</th><td class=\"{}\">{}</td></tr>",
        outcome_class, outcome_text
    );
    let _ = writeln!(
        html,
        "<tr><th>Upstream probe</th><td class=\"{}\">{}</td></tr>",
        probe_class,
        encode_text(&probe_text)
    );
    let _ = writeln!(html, "<tr><th>Requests served</th><td>{}</td></tr>", view.total_requests);
    html.push_str("</table>\n");

    html.push_str("<h2>Recent requests</h2>\n");
    if view.recent.is_empty() {
        html.push_str("<p>None recorded.</p>\n");
    } else {
        html.push_str(
            "<table>\n<tr><th>Time (UTC)</th><th>URL</th><th>User agent</th>\
             <th>Credential</th><th>Model</th><th>Messages</th><th>Tools</th></tr>\n",
        );
        for entry in &view.recent {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                encode_text(&entry.url),
                encode_text(entry.user_agent.as_deref().unwrap_or("-")),
                encode_text(&entry.credential),
                encode_text(entry.model.as_deref().unwrap_or("-")),
                entry.message_count,
                encode_text(&entry.tools.join(", ")),
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
