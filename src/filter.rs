use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use anyhow::{Result, anyhow};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::{Dataset, Record},
    schema::{Field, ResolvedSchema},
};

/// Stand-in value for filtering on records whose dimension cell is empty.
pub const UNKNOWN_FILTER_VALUE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    State,
    Category,
    Store,
    Brand,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::State,
        Dimension::Category,
        Dimension::Store,
        Dimension::Brand,
    ];

    pub fn field(&self) -> Field {
        match self {
            Dimension::State => Field::State,
            Dimension::Category => Field::Category,
            Dimension::Store => Field::Store,
            Dimension::Brand => Field::Brand,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field())
    }
}

impl FromStr for Dimension {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let field = value.parse::<Field>()?;
        Dimension::ALL
            .into_iter()
            .find(|dimension| dimension.field() == field)
            .ok_or_else(|| anyhow!("Field '{field}' cannot be used as a filter"))
    }
}

/// Selected values per dimension. An empty or absent set leaves the dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selections(BTreeMap<Dimension, BTreeSet<String>>);

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(&mut self, dimension: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect::<BTreeSet<_>>();
        if values.is_empty() {
            self.0.remove(&dimension);
        } else {
            self.0.insert(dimension, values);
        }
    }

    pub fn with<I, S>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select(dimension, values);
        self
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn selected(&self, dimension: Dimension) -> Option<&BTreeSet<String>> {
        self.0.get(&dimension).filter(|values| !values.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeSet::is_empty)
    }
}

/// The trimmed value a record contributes to a filter dimension.
pub fn dimension_value(record: &Record, header: &str) -> String {
    record
        .get(header)
        .label(UNKNOWN_FILTER_VALUE)
        .trim()
        .to_string()
}

/// Keeps the records matching every active dimension.
///
/// A dimension is active when its selection is non-empty and the dataset has
/// a header for it.
pub fn apply_filters<'a>(
    records: &'a [Record],
    schema: &ResolvedSchema,
    selections: &Selections,
) -> Vec<&'a Record> {
    let active = Dimension::ALL
        .into_iter()
        .filter_map(|dimension| {
            let values = selections.selected(dimension)?;
            let header = schema.header(dimension.field())?;
            Some((header, values))
        })
        .collect::<Vec<_>>();

    records
        .iter()
        .filter(|record| {
            active
                .iter()
                .all(|(header, values)| values.contains(&dimension_value(record, header)))
        })
        .collect()
}

/// Sorted distinct values per resolved dimension, for building filter pickers.
pub fn filter_options(dataset: &Dataset, schema: &ResolvedSchema) -> BTreeMap<Dimension, Vec<String>> {
    Dimension::ALL
        .into_iter()
        .map(|dimension| {
            let values = match schema.header(dimension.field()) {
                Some(header) => dataset
                    .records()
                    .iter()
                    .map(|record| dimension_value(record, header))
                    .unique()
                    .sorted()
                    .collect(),
                None => Vec::new(),
            };
            (dimension, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Cell, dataset::Grid, schema::AliasTable};

    fn dataset() -> Dataset {
        let grid: Grid = vec![
            vec!["UF".into(), "Categoria".into(), "Loja".into()],
            vec!["SP".into(), "Bebidas".into(), "Centro".into()],
            vec![" RJ ".into(), "Limpeza".into(), "Norte".into()],
            vec!["SP".into(), "Limpeza".into(), Cell::Empty],
            vec![Cell::Empty, "Bebidas".into(), "Centro".into()],
        ];
        Dataset::from_grid("Sheet1", grid).unwrap()
    }

    fn schema(dataset: &Dataset) -> ResolvedSchema {
        ResolvedSchema::resolve(dataset.headers(), &AliasTable::default())
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let data = dataset();
        let filtered = apply_filters(data.records(), &schema(&data), &Selections::new());
        assert_eq!(filtered.len(), data.len());
    }

    #[test]
    fn values_are_trimmed_before_matching() {
        let data = dataset();
        let selections = Selections::new().with(Dimension::State, ["RJ"]);
        let filtered = apply_filters(data.records(), &schema(&data), &selections);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].get("Loja"), &Cell::from("Norte"));
    }

    #[test]
    fn dimensions_combine_with_and() {
        let data = dataset();
        let selections = Selections::new()
            .with(Dimension::State, ["SP"])
            .with(Dimension::Category, ["Limpeza", "Bebidas"])
            .with(Dimension::Store, ["Centro"]);
        let filtered = apply_filters(data.records(), &schema(&data), &selections);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].get("Categoria"), &Cell::from("Bebidas"));
    }

    #[test]
    fn empty_cells_match_the_unknown_value() {
        let data = dataset();
        let selections = Selections::new().with(Dimension::Store, [UNKNOWN_FILTER_VALUE]);
        let filtered = apply_filters(data.records(), &schema(&data), &selections);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].get("UF"), &Cell::from("SP"));
    }

    #[test]
    fn unresolved_dimension_imposes_no_constraint() {
        let data = dataset();
        let selections = Selections::new().with(Dimension::Brand, ["Acme"]);
        let filtered = apply_filters(data.records(), &schema(&data), &selections);
        assert_eq!(filtered.len(), data.len());
    }

    #[test]
    fn selection_without_matches_yields_empty_result() {
        let data = dataset();
        let selections = Selections::new().with(Dimension::State, ["MG"]);
        assert!(apply_filters(data.records(), &schema(&data), &selections).is_empty());
    }

    #[test]
    fn filter_options_are_sorted_and_distinct() {
        let data = dataset();
        let options = filter_options(&data, &schema(&data));
        assert_eq!(options[&Dimension::State], ["N/A", "RJ", "SP"]);
        assert_eq!(options[&Dimension::Category], ["Bebidas", "Limpeza"]);
        assert!(options[&Dimension::Brand].is_empty());
    }

    #[test]
    fn selecting_nothing_clears_a_dimension() {
        let mut selections = Selections::new().with(Dimension::State, ["SP"]);
        selections.select(Dimension::State, Vec::<String>::new());
        assert!(selections.is_empty());
        assert!(selections.selected(Dimension::State).is_none());
    }

    #[test]
    fn dimension_parses_from_field_name() {
        assert_eq!("store".parse::<Dimension>().unwrap(), Dimension::Store);
        assert!("revenue".parse::<Dimension>().is_err());
    }
}
