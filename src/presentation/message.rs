// Message rendering - summary views as Discord markdown
use crate::presentation::view_models::{MetricView, SummaryView};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    Lines,
    #[default]
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

const HEADER: [&str; 6] = ["", "Value", "Δ Avg", "Week Avg", "Metric", "Δ Target"];
const ALIGNMENTS: [Align; 6] = [
    Align::Right,
    Align::Right,
    Align::Right,
    Align::Right,
    Align::Left,
    Align::Left,
];

pub fn title(view: &SummaryView) -> String {
    format!("Garmin Health Metrics, {}", view.date.format("%d-%m-%Y"))
}

pub fn render(view: &SummaryView, format: MessageFormat) -> String {
    match format {
        MessageFormat::Lines => render_lines(view),
        MessageFormat::Table => render_table(view),
    }
}

/// One code block per metric, with a blank line after every second metric
pub fn render_lines(view: &SummaryView) -> String {
    let mut out = String::new();
    for (i, metric) in view.metrics.iter().enumerate() {
        out.push_str(&to_line(metric));
        if i % 2 == 1 {
            out.push('\n');
        }
    }
    out
}

fn to_line(view: &MetricView) -> String {
    let target = view
        .delta_to_target
        .as_ref()
        .map(|t| format!(", Δ {}: {}", t.target_name, t.delta))
        .unwrap_or_default();
    let max = view.out_of_max_suffix();
    format!(
        "```{} {}: {}{} - (weekly avg: {}{}, Δ avg: {}{})```",
        view.icon,
        view.name,
        view.latest,
        max,
        view.weekly_average,
        max,
        view.delta_to_average,
        target
    )
}

// The target name is left out to keep rows narrow
fn to_row(view: &MetricView) -> [String; 6] {
    let max = view.out_of_max_suffix();
    [
        view.icon.clone(),
        format!("{}{}", view.latest, max),
        format!("{} {}", view.delta_to_average, view.trend_marker())
            .trim_end()
            .to_string(),
        format!("{}{}", view.weekly_average, max),
        view.name.clone(),
        view.delta_to_target
            .as_ref()
            .map(|t| t.delta.clone())
            .unwrap_or_default(),
    ]
}

/// Borderless table in a code block, a blank row between metrics
pub fn render_table(view: &SummaryView) -> String {
    let header: [String; 6] = HEADER.map(String::from);
    let mut rows: Vec<[String; 6]> = Vec::with_capacity(view.metrics.len() * 2);
    for metric in &view.metrics {
        rows.push(to_row(metric));
        rows.push(Default::default());
    }

    let mut widths = header.clone().map(|c| c.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(&header, &widths));
    lines.extend(rows.iter().map(|row| format_row(row, &widths)));
    format!("```\n{}\n```", lines.join("\n"))
}

fn format_row(row: &[String; 6], widths: &[usize; 6]) -> String {
    let cells: Vec<String> = row
        .iter()
        .zip(widths.iter())
        .zip(ALIGNMENTS.iter())
        .map(|((cell, &width), align)| {
            let pad = width.saturating_sub(cell.chars().count());
            match align {
                Align::Left => format!("{}{}", cell, " ".repeat(pad)),
                Align::Right => format!("{}{}", " ".repeat(pad), cell),
            }
        })
        .collect();
    cells.join("  ").trim_end().to_string()
}
