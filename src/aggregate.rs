//! Group, reduce, and order records for chart views.
//!
//! [`aggregate`] is the single grouping engine behind every categorical and
//! time-series view: a key extractor picks the group (or skips the record),
//! a measure extractor coerces the value to sum, and [`PostProcess`] orders
//! and truncates the groups. Groups are kept in first-encountered order until
//! the stable sort runs, so equal totals keep that order.

use chrono::Datelike;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Cell, parse_calendar_date, parse_currency, parse_integer},
    dataset::Record,
};

/// How a measure cell becomes a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    Currency,
    Integer,
}

impl Coercion {
    pub fn apply(&self, cell: &Cell) -> f64 {
        match self {
            Coercion::Currency => parse_currency(cell),
            Coercion::Integer => parse_integer(cell) as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    ValueDescending,
    KeyAscending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostProcess {
    pub order: SortOrder,
    pub top_n: Option<usize>,
    /// Flip the final order, for horizontal bars that draw bottom-up.
    pub reverse: bool,
}

impl PostProcess {
    pub fn descending() -> Self {
        Self::default()
    }

    pub fn chronological() -> Self {
        Self {
            order: SortOrder::KeyAscending,
            ..Self::default()
        }
    }

    pub fn top(n: usize) -> Self {
        Self {
            top_n: Some(n),
            ..Self::default()
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            reverse: true,
            ..self
        }
    }

    pub fn apply(&self, groups: &mut Vec<Group>) {
        match self.order {
            // Totals can be NaN (`Infinity` plus `-Infinity`), so a total order is required.
            SortOrder::ValueDescending => groups.sort_by(|a, b| b.value.total_cmp(&a.value)),
            SortOrder::KeyAscending => groups.sort_by(|a, b| a.key.cmp(&b.key)),
        }
        if let Some(limit) = self.top_n {
            groups.truncate(limit);
        }
        if self.reverse {
            groups.reverse();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: String,
    pub value: f64,
}

impl Group {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Sums `measure` per group and orders the result with `post`.
///
/// Records for which `key` returns `None` are skipped.
pub fn aggregate<'a, I, K, M>(records: I, mut key: K, mut measure: M, post: &PostProcess) -> Vec<Group>
where
    I: IntoIterator<Item = &'a Record>,
    K: FnMut(&Record) -> Option<String>,
    M: FnMut(&Record) -> f64,
{
    let mut totals: IndexMap<String, f64> = IndexMap::new();
    for record in records {
        let Some(group) = key(record) else {
            continue;
        };
        *totals.entry(group).or_insert(0.0) += measure(record);
    }
    let mut groups = totals
        .into_iter()
        .map(|(key, value)| Group { key, value })
        .collect::<Vec<_>>();
    post.apply(&mut groups);
    groups
}

/// Groups by the trimmed dimension value, `unknown` for empty cells.
pub fn dimension_key<'h>(header: &'h str, unknown: &'h str) -> impl FnMut(&Record) -> Option<String> + 'h {
    move |record| Some(record.get(header).label(unknown).trim().to_string())
}

/// Groups by the `YYYY-MM` month of a date cell; undated records are skipped.
pub fn month_key(header: &str) -> impl FnMut(&Record) -> Option<String> + '_ {
    move |record| {
        parse_calendar_date(record.get(header))
            .map(|date| format!("{}-{:02}", date.year(), date.month()))
    }
}

pub fn measure(header: &str, coercion: Coercion) -> impl FnMut(&Record) -> f64 + '_ {
    move |record| coercion.apply(record.get(header))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub name: String,
    pub points: Vec<ScatterPoint>,
}

/// Headers and fallback labels for a quantity × revenue scatter.
#[derive(Debug, Clone, Copy)]
pub struct ScatterColumns<'a> {
    pub quantity: &'a str,
    pub revenue: &'a str,
    pub label: &'a str,
    pub series: &'a str,
    pub unknown_label: &'a str,
    pub unknown_series: &'a str,
}

/// Collects points with positive quantity and revenue, one series per
/// distinct series value in first-occurrence order.
pub fn scatter<'a, I>(records: I, columns: &ScatterColumns<'_>) -> Vec<ScatterSeries>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut series: IndexMap<String, Vec<ScatterPoint>> = IndexMap::new();
    for record in records {
        let quantity = parse_integer(record.get(columns.quantity));
        let revenue = parse_currency(record.get(columns.revenue));
        if quantity <= 0 || revenue <= 0.0 {
            continue;
        }
        let point = ScatterPoint {
            x: quantity as f64,
            y: revenue,
            label: record.get(columns.label).label(columns.unknown_label),
        };
        series
            .entry(record.get(columns.series).label(columns.unknown_series))
            .or_default()
            .push(point);
    }
    series
        .into_iter()
        .map(|(name, points)| ScatterSeries { name, points })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(header, value)| (*header, *value)).collect()
    }

    fn groups(pairs: &[(&str, f64)]) -> Vec<Group> {
        pairs.iter().map(|(key, value)| Group::new(*key, *value)).collect()
    }

    #[test]
    fn sums_per_group_and_sorts_descending() {
        let records = vec![
            record(&[("UF", "SP"), ("Valor Venda", "R$ 100,00")]),
            record(&[("UF", "SP"), ("Valor Venda", "R$ 50,00")]),
            record(&[("UF", "RJ"), ("Valor Venda", "200")]),
        ];
        let result = aggregate(
            &records,
            dimension_key("UF", "Desconhecido"),
            measure("Valor Venda", Coercion::Currency),
            &PostProcess::descending(),
        );
        assert_eq!(result, groups(&[("RJ", 200.0), ("SP", 150.0)]));
    }

    #[test]
    fn ties_keep_first_encountered_order() {
        let records = vec![
            record(&[("Loja", "Norte"), ("Qtd", "5")]),
            record(&[("Loja", "Sul"), ("Qtd", "9")]),
            record(&[("Loja", "Centro"), ("Qtd", "5")]),
        ];
        let result = aggregate(
            &records,
            dimension_key("Loja", "Desconhecida"),
            measure("Qtd", Coercion::Integer),
            &PostProcess::descending(),
        );
        let keys = result.iter().map(|g| g.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, ["Sul", "Norte", "Centro"]);
    }

    #[test]
    fn top_n_truncates_then_reverses() {
        let records = vec![
            record(&[("Produto", "A"), ("Receita", "500")]),
            record(&[("Produto", "B"), ("Receita", "1500")]),
            record(&[("Produto", "C"), ("Receita", "1000")]),
        ];
        let result = aggregate(
            &records,
            dimension_key("Produto", "Desconhecido"),
            measure("Receita", Coercion::Currency),
            &PostProcess::top(2).reversed(),
        );
        assert_eq!(result, groups(&[("C", 1000.0), ("B", 1500.0)]));
    }

    #[test]
    fn missing_group_values_use_the_unknown_label() {
        let records = vec![
            record(&[("Marca", ""), ("Receita", "10")]),
            record(&[("Marca", "  "), ("Receita", "5")]),
        ];
        let result = aggregate(
            &records,
            dimension_key("Marca", "Desconhecida"),
            measure("Receita", Coercion::Currency),
            &PostProcess::descending(),
        );
        // Whitespace-only text is not empty, so it trims to its own "" group.
        assert_eq!(result, groups(&[("Desconhecida", 10.0), ("", 5.0)]));
    }

    #[test]
    fn month_key_groups_chronologically_and_skips_bad_dates() {
        let records = vec![
            record(&[("Data", "2024-02-03"), ("Receita", "5")]),
            record(&[("Data", "2024-01-15"), ("Receita", "10")]),
            record(&[("Data", "N/A"), ("Receita", "99")]),
            record(&[("Data", "2024-01-20"), ("Receita", "1")]),
        ];
        let result = aggregate(
            &records,
            month_key("Data"),
            measure("Receita", Coercion::Currency),
            &PostProcess::chronological(),
        );
        assert_eq!(result, groups(&[("2024-01", 11.0), ("2024-02", 5.0)]));
    }

    #[test]
    fn month_key_reads_spreadsheet_serials() {
        let records: Vec<Record> = vec![
            [("Data", Cell::Number(45306.0)), ("Receita", Cell::Number(7.0))]
                .into_iter()
                .collect(),
        ];
        let result = aggregate(
            &records,
            month_key("Data"),
            measure("Receita", Coercion::Currency),
            &PostProcess::chronological(),
        );
        assert_eq!(result, groups(&[("2024-01", 7.0)]));
    }

    #[test]
    fn scatter_requires_positive_quantity_and_revenue() {
        let records = vec![
            record(&[("Qtd", "0"), ("Valor", "100"), ("Produto", "A"), ("Cat", "X")]),
            record(&[("Qtd", "2"), ("Valor", "0"), ("Produto", "B"), ("Cat", "X")]),
            record(&[("Qtd", "3"), ("Valor", "30,5"), ("Produto", "C"), ("Cat", "Y")]),
            record(&[("Qtd", "1"), ("Valor", "9"), ("Produto", ""), ("Cat", "X")]),
            record(&[("Qtd", "4"), ("Valor", "8"), ("Produto", "E"), ("Cat", "Y")]),
        ];
        let columns = ScatterColumns {
            quantity: "Qtd",
            revenue: "Valor",
            label: "Produto",
            series: "Cat",
            unknown_label: "N/A",
            unknown_series: "Desconhecida",
        };
        let series = scatter(&records, &columns);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "Y");
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(
            series[0].points[0],
            ScatterPoint {
                x: 3.0,
                y: 30.5,
                label: "C".to_string()
            }
        );
        assert_eq!(series[1].name, "X");
        assert_eq!(series[1].points[0].label, "N/A");
    }

    #[test]
    fn scatter_without_qualifying_rows_is_empty() {
        let records = vec![record(&[("Qtd", "0"), ("Valor", "1"), ("Produto", "A"), ("Cat", "X")])];
        let columns = ScatterColumns {
            quantity: "Qtd",
            revenue: "Valor",
            label: "Produto",
            series: "Cat",
            unknown_label: "N/A",
            unknown_series: "Desconhecida",
        };
        assert!(scatter(&records, &columns).is_empty());
    }

    #[test]
    fn infinite_totals_in_many_groups_sort_without_panicking() {
        let mut records = Vec::new();
        for idx in 0..40 {
            let state = format!("S{idx:02}");
            records.push(record(&[("UF", state.as_str()), ("Receita", "10")]));
            if idx % 3 == 0 {
                records.push(record(&[("UF", state.as_str()), ("Receita", "Infinity")]));
                records.push(record(&[("UF", state.as_str()), ("Receita", "-Infinity")]));
            }
        }
        let result = aggregate(
            &records,
            dimension_key("UF", "Desconhecido"),
            measure("Receita", Coercion::Currency),
            &PostProcess::top(20),
        );
        assert_eq!(result.len(), 20);
        assert!(result.iter().all(|g| g.value.is_nan() || g.value == 10.0));
        // The sign of a NaN total is platform-specific, but NaN groups stay contiguous.
        let switches = result
            .windows(2)
            .filter(|pair| pair[0].value.is_nan() != pair[1].value.is_nan())
            .count();
        assert!(switches <= 1);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let records = (0..50)
            .map(|idx| {
                record(&[
                    ("Loja", ["A", "B", "C", "D"][idx % 4]),
                    ("Receita", if idx % 3 == 0 { "10" } else { "5" }),
                ])
            })
            .collect::<Vec<_>>();
        let run = || {
            aggregate(
                &records,
                dimension_key("Loja", "Desconhecida"),
                measure("Receita", Coercion::Currency),
                &PostProcess::descending(),
            )
        };
        assert_eq!(run(), run());
    }
}
