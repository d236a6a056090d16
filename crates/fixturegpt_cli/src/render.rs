//! Text rendering for fixture inspection.

use console::style;
use fixturegpt_core::{Fixture, Payload, SnapshotConfig};
use fixturegpt_storage::FixtureStats;
use serde_json::Value;
use std::fmt::Write;

/// Longest response shown by `show`
pub const RESPONSE_PREVIEW_CHARS: usize = 500;

/// Cut `text` to `max` characters, marking the cut
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Effective configuration, API key masked
pub fn config(config: &SnapshotConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style("FixtureGPT configuration").bold());
    let _ = writeln!(out, "  Mode:          {}", style(config.mode).cyan());
    let _ = writeln!(out, "  Sync mode:     {}", style(config.sync.sync_mode).cyan());
    let api_key = config
        .sync
        .masked_api_key()
        .map_or_else(|| style("not set".to_string()).red(), |key| style(key).green());
    let _ = writeln!(out, "  API key:       {api_key}");
    let _ = writeln!(out, "  API URL:       {}", config.sync.endpoint);
    let _ = writeln!(out, "  Fixtures dir:  {}", config.fixtures_dir.display());
    let _ = writeln!(out, "  Miss policy:   {:?}", config.miss_policy);
    let _ = writeln!(out, "  Remote timeout: {}ms", config.sync.timeout.as_millis());

    if !config.sync.has_api_key() {
        let _ = writeln!(out);
        let _ = writeln!(out, "To enable cloud sync:");
        let _ = writeln!(out, "  export FIXTUREGPT_API_KEY='your-key'");
        let _ = writeln!(out, "  export FIXTUREGPT_SYNC_MODE='both'");
    }
    out
}

/// Statistics table and estimated savings
pub fn stats(stats: &FixtureStats, config: &SnapshotConfig) -> String {
    let mut out = String::new();
    let cloud = if config.sync.has_api_key() {
        style("enabled").green()
    } else {
        style("disabled").red()
    };
    let _ = writeln!(out, "Cloud sync: {cloud} ({})", config.sync.sync_mode);

    if stats.is_empty() {
        let _ = writeln!(out, "{}", style("No local fixtures found.").yellow());
        if config.sync.has_api_key() && config.sync.sync_mode.uses_remote() {
            let _ = writeln!(out, "{}", style("Fixtures may exist in the cloud tier.").dim());
        }
        return out;
    }

    let _ = writeln!(
        out,
        "Local fixtures: {}  Total size: {}",
        stats.count,
        format_size(stats.total_bytes)
    );
    let _ = writeln!(out);

    let width = stats
        .fixtures
        .iter()
        .map(|f| f.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    let _ = writeln!(
        out,
        "{}",
        style(format!(
            "{:<width$}  {:<16}  {:>9}  {}",
            "Name", "Fingerprint", "Size", "Recorded"
        ))
        .bold()
    );
    for fixture in &stats.fixtures {
        let marker = if fixture.fallback { " (text)" } else { "" };
        let _ = writeln!(
            out,
            "{:<width$}  {:<16}  {:>9}  {}{marker}",
            style(&fixture.name).cyan(),
            fixture.fingerprint.short(),
            format_size(fixture.size_bytes),
            fixture.timestamp.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Estimated savings: {} ({} calls at ${} per call)",
        style(format!("${:.3}", stats.estimated_cost)).green(),
        stats.count,
        config.cost_per_call
    );
    out
}

/// Detail of every fixture recorded under one name
pub fn fixtures(name: &str, fixtures: &[Fixture]) -> String {
    let mut out = String::new();
    if fixtures.is_empty() {
        let _ = writeln!(out, "{}", style(format!("No fixtures found for '{name}'")).yellow());
        return out;
    }

    for (index, fixture) in fixtures.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} {}",
            style(format!("Fixture {}:", index + 1)).bold(),
            fixture.fingerprint
        );
        let _ = writeln!(out, "Recorded: {}", fixture.timestamp.to_rfc3339());
        if !fixture.args.is_empty() {
            let _ = writeln!(out, "Args:\n{}", pretty(&Value::Array(fixture.args.clone())));
        }
        if !fixture.kwargs.is_empty() {
            let kwargs: serde_json::Map<String, Value> = fixture
                .kwargs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let _ = writeln!(out, "Kwargs:\n{}", pretty(&Value::Object(kwargs)));
        }
        let response = match &fixture.response {
            Payload::Json(value) => pretty(value),
            Payload::StringFallback(text) => format!("{text} (stored as text)"),
        };
        let _ = writeln!(out, "Response:\n{}", truncate(&response, RESPONSE_PREVIEW_CHARS));
        let _ = writeln!(out);
    }
    out
}
