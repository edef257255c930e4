mod common;

use common::{dataset, schema};
use proptest::prelude::*;
use sales_dashboard::{
    data::{Cell, parse_calendar_date, parse_currency, parse_integer},
    filter::{Dimension, Selections, apply_filters},
};

const STATES: [&str; 5] = ["SP", "RJ", "MG", "BA", ""];
const CATEGORIES: [&str; 3] = ["Bebidas", "Limpeza", "Mercearia"];

fn sheet(rows: &[(usize, usize)]) -> sales_dashboard::dataset::Dataset {
    let body = rows
        .iter()
        .map(|(state, category)| [STATES[*state], CATEGORIES[*category], "1"])
        .collect::<Vec<_>>();
    let header: &[&str] = &["UF", "Categoria", "Receita"];
    let mut all = vec![header];
    all.extend(body.iter().map(|row| row.as_slice()));
    dataset(&all)
}

fn selections() -> impl Strategy<Value = Selections> {
    (
        prop::collection::btree_set(prop::sample::select(vec!["SP", "RJ", "N/A", "XX"]), 0..3),
        prop::collection::btree_set(prop::sample::select(CATEGORIES.to_vec()), 0..3),
    )
        .prop_map(|(states, categories)| {
            Selections::new()
                .with(Dimension::State, states)
                .with(Dimension::Category, categories)
        })
}

proptest! {
    #[test]
    fn filtering_returns_a_subset(
        rows in prop::collection::vec((0..5usize, 0..3usize), 1..40),
        selections in selections(),
    ) {
        let data = sheet(&rows);
        let schema = schema(&data);
        let filtered = apply_filters(data.records(), &schema, &selections);
        prop_assert!(filtered.len() <= data.len());
        for record in &filtered {
            prop_assert!(data.records().iter().any(|candidate| std::ptr::eq(candidate, *record)));
        }
    }

    #[test]
    fn filtering_is_idempotent(
        rows in prop::collection::vec((0..5usize, 0..3usize), 1..40),
        selections in selections(),
    ) {
        let data = sheet(&rows);
        let schema = schema(&data);
        let once = apply_filters(data.records(), &schema, &selections)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        let twice = apply_filters(&once, &schema, &selections)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn empty_selection_keeps_every_row(rows in prop::collection::vec((0..5usize, 0..3usize), 1..40)) {
        let data = sheet(&rows);
        let filtered = apply_filters(data.records(), &schema(&data), &Selections::new());
        prop_assert_eq!(filtered.len(), data.len());
    }

    #[test]
    fn coercion_never_panics_on_text(raw in ".{0,24}") {
        let cell = Cell::from(raw.as_str());
        let _ = parse_currency(&cell);
        let _ = parse_integer(&cell);
        let _ = parse_calendar_date(&cell);
    }

    #[test]
    fn coercion_never_panics_on_numbers(value in prop::num::f64::ANY) {
        let cell = Cell::Number(value);
        let _ = parse_currency(&cell);
        let _ = parse_integer(&cell);
        let _ = parse_calendar_date(&cell);
    }

    #[test]
    fn currency_reads_brazilian_amounts(whole in 0u32..1_000_000, cents in 0u32..100) {
        let formatted = format!("R$ {},{:02}", whole, cents);
        let expected = whole as f64 + cents as f64 / 100.0;
        prop_assert!((parse_currency(&Cell::from(formatted.as_str())) - expected).abs() < 1e-6);
    }
}
