//! Semantic fields, header alias tables, and per-dataset column resolution.
//!
//! Sales sheets arrive with unpredictable header names (`UF`, `estado`,
//! `uf_da_compra`, ...). Each [`Field`] carries a list of accepted aliases and
//! [`ResolvedSchema`] binds every field to the literal header found in a
//! dataset, once, right after loading.

use std::{borrow::Cow, collections::BTreeMap, fmt, str::FromStr};

use anyhow::anyhow;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    State,
    Store,
    Product,
    Category,
    Brand,
    Revenue,
    Quantity,
    Date,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::State,
        Field::Store,
        Field::Product,
        Field::Category,
        Field::Brand,
        Field::Revenue,
        Field::Quantity,
        Field::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::State => "state",
            Field::Store => "store",
            Field::Product => "product",
            Field::Category => "category",
            Field::Brand => "brand",
            Field::Revenue => "revenue",
            Field::Quantity => "quantity",
            Field::Date => "date",
        }
    }

    fn default_aliases(&self) -> &'static [&'static str] {
        match self {
            Field::State => &["uf", "estado", "uf_da_compra"],
            Field::Store => &[
                "nome_da_loja",
                "nome_da_loj",
                "loja",
                "nome loja",
                "store name",
                "store",
            ],
            Field::Product => &[
                "nome_do_produto",
                "nome_do_produt",
                "produto",
                "nome produto",
                "product name",
                "product",
            ],
            Field::Category => &[
                "categoria_do_produto",
                "categoria_do_produt",
                "categoria",
                "category",
            ],
            Field::Brand => &["marca_do_produto", "marca_do_produt", "marca", "brand"],
            Field::Revenue => &[
                "valor venda",
                "valorvendabрутo",
                "receita",
                "faturamento",
                "valor_da_venda",
            ],
            Field::Quantity => &[
                "quantidad",
                "quantidade",
                "quantidade vendida",
                "qntd",
                "volume",
                "units sold",
            ],
            Field::Date => &["data_da_venda", "data da venda", "data", "date"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == normalized)
            .ok_or_else(|| anyhow!("Unknown field '{value}'"))
    }
}

/// Accepted header aliases per semantic field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable(BTreeMap<Field, Vec<String>>);

impl Default for AliasTable {
    fn default() -> Self {
        let entries = Field::ALL
            .into_iter()
            .map(|field| {
                let aliases = field
                    .default_aliases()
                    .iter()
                    .map(|alias| alias.to_string())
                    .collect();
                (field, aliases)
            })
            .collect();
        AliasTable(entries)
    }
}

impl AliasTable {
    pub fn aliases(&self, field: Field) -> &[String] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn set_aliases(&mut self, field: Field, aliases: Vec<String>) {
        self.0.insert(field, aliases);
    }

    /// Fills fields missing from a partially specified table with the defaults.
    pub fn with_defaults(mut self) -> Self {
        for (field, aliases) in AliasTable::default().0 {
            self.0.entry(field).or_insert(aliases);
        }
        self
    }
}

fn normalize_header(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Returns the first header, in dataset order, whose normalized form is any of
/// the normalized `aliases`. Alias order does not matter.
pub fn resolve_column<'a, H, A>(headers: &'a [H], aliases: &[A]) -> Option<&'a str>
where
    H: AsRef<str>,
    A: AsRef<str>,
{
    let normalized_aliases = aliases
        .iter()
        .map(|alias| normalize_header(alias.as_ref()))
        .collect::<Vec<_>>();
    headers
        .iter()
        .map(AsRef::<str>::as_ref)
        .find(|header| normalized_aliases.contains(&normalize_header(header)))
}

/// Field → literal header bindings for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedSchema {
    bindings: BTreeMap<Field, String>,
    #[serde(skip)]
    headers: Vec<String>,
}

impl ResolvedSchema {
    pub fn resolve<H: AsRef<str>>(headers: &[H], aliases: &AliasTable) -> Self {
        let mut bindings = BTreeMap::new();
        for field in Field::ALL {
            match resolve_column(headers, aliases.aliases(field)) {
                Some(header) => {
                    debug!("Field '{field}' bound to header '{header}'");
                    bindings.insert(field, header.to_string());
                }
                None => debug!("Field '{field}' has no matching header"),
            }
        }
        info!(
            "Resolved {} of {} semantic field(s)",
            bindings.len(),
            Field::ALL.len()
        );
        ResolvedSchema {
            bindings,
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
        }
    }

    /// Re-resolves the fields in `overrides` against the same headers, using
    /// only the given aliases. Other bindings are kept as they are.
    pub fn with_overrides(
        &self,
        overrides: &BTreeMap<Field, Vec<String>>,
    ) -> Cow<'_, ResolvedSchema> {
        if overrides.is_empty() {
            return Cow::Borrowed(self);
        }
        let mut schema = self.clone();
        for (field, aliases) in overrides {
            match resolve_column(self.headers.as_slice(), aliases) {
                Some(header) => {
                    schema.bindings.insert(*field, header.to_string());
                }
                None => {
                    schema.bindings.remove(field);
                }
            }
        }
        Cow::Owned(schema)
    }

    pub fn header(&self, field: Field) -> Option<&str> {
        self.bindings.get(&field).map(String::as_str)
    }

    pub fn is_resolved(&self, field: Field) -> bool {
        self.bindings.contains_key(&field)
    }

    pub fn unresolved(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| !self.is_resolved(*field))
            .collect()
    }

    pub fn bind(&mut self, field: Field, header: impl Into<String>) {
        self.bindings.insert(field, header.into());
    }
}
