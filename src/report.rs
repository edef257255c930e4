use std::{borrow::Cow, collections::BTreeMap, fmt::Write as _, io::Write};

use anyhow::{Context, Result};

use crate::{
    dashboard::Dashboard,
    data::format_number,
    filter::Dimension,
    schema::{AliasTable, Field, ResolvedSchema},
    views::ChartData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

pub fn render_table(headers: &[String], rows: &[Vec<String>], align: &[Align]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &[]));
    let separator = widths.iter().map(|w| "-".repeat((*w).max(3))).collect::<Vec<_>>();
    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &separator_widths, &[]));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, align));
    }
    output
}

fn format_row(values: &[String], widths: &[usize], align: &[Align]) -> String {
    let cells = values
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (value, width))| {
            let sanitized = sanitize_cell(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
            match align.get(idx).copied().unwrap_or(Align::Left) {
                Align::Left => format!("{sanitized}{padding}"),
                Align::Right => format!("{padding}{sanitized}"),
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn strings<const N: usize>(values: [&str; N]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Field bindings as printed by the `columns` command.
pub fn schema_table(schema: &ResolvedSchema, aliases: &AliasTable) -> String {
    let rows = Field::ALL
        .into_iter()
        .map(|field| {
            vec![
                field.to_string(),
                schema.header(field).unwrap_or("(unresolved)").to_string(),
                aliases.aliases(field).join(", "),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&strings(["field", "header", "aliases"]), &rows, &[])
}

pub fn options_table(options: &BTreeMap<Dimension, Vec<String>>) -> String {
    let rows = options
        .iter()
        .map(|(dimension, values)| {
            let listed = if values.is_empty() {
                "(unresolved)".to_string()
            } else {
                values.join(", ")
            };
            vec![dimension.to_string(), values.len().to_string(), listed]
        })
        .collect::<Vec<_>>();
    render_table(
        &strings(["dimension", "count", "values"]),
        &rows,
        &[Align::Left, Align::Right, Align::Left],
    )
}

/// Every view as a titled table, or its failure state and message.
pub fn dashboard_text(dashboard: &Dashboard) -> String {
    let mut output = String::new();
    if let Some(sheet) = &dashboard.sheet {
        let _ = writeln!(
            output,
            "Sheet '{sheet}': {} of {} row(s) match",
            dashboard.matching_rows, dashboard.loaded_rows
        );
    }
    for view in &dashboard.views {
        let _ = writeln!(output, "\n{} [{}]", view.title, view.id);
        let chart = match &view.result {
            Ok(chart) => chart,
            Err(err) => {
                let _ = writeln!(output, "({}) {err}", err.state());
                continue;
            }
        };
        let table = match &chart.data {
            ChartData::Categories { labels, values } => {
                let rows = labels
                    .iter()
                    .zip(values)
                    .map(|(label, value)| vec![label.clone(), format_number(*value)])
                    .collect::<Vec<_>>();
                render_table(
                    &strings(["label", "value"]),
                    &rows,
                    &[Align::Left, Align::Right],
                )
            }
            ChartData::Scatter { series } => {
                let rows = series
                    .iter()
                    .flat_map(|series| {
                        series.points.iter().map(|point| {
                            vec![
                                series.name.clone(),
                                point.label.clone(),
                                format_number(point.x),
                                format_number(point.y),
                            ]
                        })
                    })
                    .collect::<Vec<_>>();
                render_table(
                    &strings(["series", "label", "x", "y"]),
                    &rows,
                    &[Align::Left, Align::Left, Align::Right, Align::Right],
                )
            }
        };
        output.push_str(&table);
    }
    output
}

/// Long-form CSV: one line per category or scatter point of every rendered view.
pub fn write_csv<W: Write>(dashboard: &Dashboard, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["view", "series", "label", "x", "y"])
        .context("Writing CSV header")?;
    for chart in dashboard.charts() {
        match &chart.data {
            ChartData::Categories { labels, values } => {
                for (label, value) in labels.iter().zip(values) {
                    csv.write_record([
                        chart.view.as_str(),
                        "",
                        label.as_str(),
                        "",
                        format_number(*value).as_str(),
                    ])
                    .with_context(|| format!("Writing CSV row for view '{}'", chart.view))?;
                }
            }
            ChartData::Scatter { series } => {
                for series in series {
                    for point in &series.points {
                        csv.write_record([
                            chart.view.as_str(),
                            series.name.as_str(),
                            point.label.as_str(),
                            format_number(point.x).as_str(),
                            format_number(point.y).as_str(),
                        ])
                        .with_context(|| format!("Writing CSV row for view '{}'", chart.view))?;
                    }
                }
            }
        }
    }
    csv.flush().context("Flushing CSV output")?;
    Ok(())
}

pub fn write_json<W: Write>(dashboard: &Dashboard, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, dashboard).context("Serializing dashboard")?;
    writeln!(writer).context("Writing JSON output")?;
    Ok(())
}
