//! Declarative chart views and their evaluation against filtered records.
//!
//! Every chart of the dashboard is a [`ViewSpec`]: which fields to group and
//! sum, how to order the groups, and how the chart is labelled. The nine
//! built-in views are returned by [`default_views`] and can be replaced
//! through the YAML configuration.

use std::{collections::BTreeMap, fmt};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::{
        Coercion, Group, PostProcess, ScatterColumns, ScatterSeries, aggregate, dimension_key,
        measure, month_key, scatter,
    },
    dataset::Record,
    error::ViewError,
    schema::{AliasTable, Field, ResolvedSchema},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Pie,
    Line,
    Scatter,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChartKind::Bar => "bar",
            ChartKind::HorizontalBar => "horizontal_bar",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregation {
    /// Sum a measure per dimension value.
    GroupedSum {
        group_by: Field,
        measure: Field,
        coercion: Coercion,
        unknown_label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        top_n: Option<usize>,
        #[serde(default)]
        reverse: bool,
    },
    /// Sum a measure per `YYYY-MM` month of a date field.
    MonthlySum {
        date: Field,
        measure: Field,
        coercion: Coercion,
    },
    /// One point per record with positive quantity and revenue.
    Scatter {
        quantity: Field,
        revenue: Field,
        label: Field,
        series: Field,
        unknown_label: String,
        unknown_series: String,
    },
}

impl Aggregation {
    /// Fields that must resolve before the view can run, in check order.
    pub fn required_fields(&self) -> Vec<Field> {
        match self {
            Aggregation::GroupedSum {
                group_by, measure, ..
            } => vec![*group_by, *measure],
            Aggregation::MonthlySum { date, measure, .. } => vec![*date, *measure],
            Aggregation::Scatter {
                quantity,
                revenue,
                label,
                series,
                ..
            } => vec![*quantity, *revenue, *label, *series],
        }
    }

    pub fn post_process(&self) -> PostProcess {
        match self {
            Aggregation::GroupedSum { top_n, reverse, .. } => PostProcess {
                top_n: *top_n,
                reverse: *reverse,
                ..PostProcess::descending()
            },
            Aggregation::MonthlySum { .. } => PostProcess::chronological(),
            Aggregation::Scatter { .. } => PostProcess::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margin {
    pub t: u32,
    pub b: u32,
    pub l: u32,
    pub r: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_title: Option<String>,
    pub margin: Margin,
}

impl Layout {
    fn new(title: &str, margin: [u32; 4]) -> Self {
        let [t, b, l, r] = margin;
        Layout {
            title: title.to_string(),
            x_axis: None,
            y_axis: None,
            legend_title: None,
            margin: Margin { t, b, l, r },
        }
    }

    fn axes(mut self, x_axis: &str, y_axis: &str) -> Self {
        self.x_axis = Some(x_axis.to_string());
        self.y_axis = Some(y_axis.to_string());
        self
    }

    fn legend(mut self, title: &str) -> Self {
        self.legend_title = Some(title.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSpec {
    pub id: String,
    pub chart: ChartKind,
    pub aggregation: Aggregation,
    pub layout: Layout,
    /// Alias lists that replace the global table for this view only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<Field, Vec<String>>,
}

impl ViewSpec {
    /// Aliases this view accepts for `field`.
    pub fn aliases_for<'a>(&'a self, field: Field, global: &'a AliasTable) -> &'a [String] {
        self.aliases
            .get(&field)
            .map_or_else(|| global.aliases(field), Vec::as_slice)
    }

    fn narrow(mut self, field: Field, aliases: &[&str]) -> Self {
        self.aliases
            .insert(field, aliases.iter().map(|alias| alias.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Categories { labels: Vec<String>, values: Vec<f64> },
    Scatter { series: Vec<ScatterSeries> },
}

impl ChartData {
    fn from_groups(groups: Vec<Group>) -> Self {
        let (labels, values) = groups
            .into_iter()
            .map(|group| (group.key, group.value))
            .unzip();
        ChartData::Categories { labels, values }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Categories { labels, .. } => labels.is_empty(),
            ChartData::Scatter { series } => series.is_empty(),
        }
    }
}

/// A rendered view, ready for a plotting front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub view: String,
    pub kind: ChartKind,
    pub data: ChartData,
    pub layout: Layout,
}

/// Evaluates one view.
///
/// `rows` is `None` before any workbook has been loaded and the filtered
/// records afterwards.
pub fn render_view(
    spec: &ViewSpec,
    aliases: &AliasTable,
    schema: &ResolvedSchema,
    rows: Option<&[&Record]>,
) -> Result<Chart, ViewError> {
    let rows = rows.ok_or(ViewError::NoDataLoaded)?;
    if rows.is_empty() {
        return Err(ViewError::NoMatchingRows {
            view: spec.id.clone(),
        });
    }
    let schema = schema.with_overrides(&spec.aliases);
    let schema: &ResolvedSchema = &schema;
    for field in spec.aggregation.required_fields() {
        if !schema.is_resolved(field) {
            return Err(ViewError::MissingColumn {
                view: spec.id.clone(),
                field,
                aliases: spec.aliases_for(field, aliases).to_vec(),
            });
        }
    }

    let header = move |field: Field| schema.header(field).unwrap_or_default();
    let records = rows.iter().copied();
    let post = spec.aggregation.post_process();
    let data = match &spec.aggregation {
        Aggregation::GroupedSum {
            group_by,
            measure: value,
            coercion,
            unknown_label,
            ..
        } => ChartData::from_groups(aggregate(
            records,
            dimension_key(header(*group_by), unknown_label),
            measure(header(*value), *coercion),
            &post,
        )),
        Aggregation::MonthlySum {
            date,
            measure: value,
            coercion,
        } => ChartData::from_groups(aggregate(
            records,
            month_key(header(*date)),
            measure(header(*value), *coercion),
            &post,
        )),
        Aggregation::Scatter {
            quantity,
            revenue,
            label,
            series,
            unknown_label,
            unknown_series,
        } => {
            let columns = ScatterColumns {
                quantity: header(*quantity),
                revenue: header(*revenue),
                label: header(*label),
                series: header(*series),
                unknown_label,
                unknown_series,
            };
            ChartData::Scatter {
                series: scatter(records, &columns),
            }
        }
    };

    if data.is_empty() {
        return Err(ViewError::EmptyAggregate {
            view: spec.id.clone(),
        });
    }
    debug!("View '{}' rendered from {} row(s)", spec.id, rows.len());
    Ok(Chart {
        view: spec.id.clone(),
        kind: spec.chart,
        data,
        layout: spec.layout.clone(),
    })
}

const REVENUE_AXIS: &str = "Faturamento Total (R$)";

fn grouped(
    id: &str,
    chart: ChartKind,
    group_by: Field,
    value: (Field, Coercion),
    unknown_label: &str,
    top_n: Option<usize>,
    layout: Layout,
) -> ViewSpec {
    ViewSpec {
        id: id.to_string(),
        chart,
        aggregation: Aggregation::GroupedSum {
            group_by,
            measure: value.0,
            coercion: value.1,
            unknown_label: unknown_label.to_string(),
            top_n,
            reverse: chart == ChartKind::HorizontalBar,
        },
        layout,
        aliases: BTreeMap::new(),
    }
}

/// The built-in dashboard, in display order.
pub fn default_views() -> Vec<ViewSpec> {
    let revenue = (Field::Revenue, Coercion::Currency);
    let quantity = (Field::Quantity, Coercion::Integer);
    vec![
        grouped(
            "revenue-by-state",
            ChartKind::Bar,
            Field::State,
            revenue,
            "Desconhecido",
            None,
            Layout::new("Faturamento Total por Estado (UF)", [50, 100, 80, 40])
                .axes("Estado (UF)", REVENUE_AXIS),
        ),
        grouped(
            "revenue-by-store",
            ChartKind::Bar,
            Field::Store,
            revenue,
            "Desconhecida",
            None,
            Layout::new("Faturamento Total por Loja", [50, 100, 80, 40]).axes("Loja", REVENUE_AXIS),
        ),
        grouped(
            "revenue-by-product",
            ChartKind::HorizontalBar,
            Field::Product,
            revenue,
            "Desconhecido",
            Some(20),
            Layout::new("Top 20 Produtos por Faturamento", [50, 50, 200, 40])
                .axes(REVENUE_AXIS, "Produto"),
        ),
        grouped(
            "revenue-by-category",
            ChartKind::Pie,
            Field::Category,
            revenue,
            "Desconhecida",
            None,
            Layout::new("Faturamento por Categoria", [50, 50, 50, 50]),
        ),
        grouped(
            "revenue-by-brand",
            ChartKind::Bar,
            Field::Brand,
            revenue,
            "Desconhecida",
            Some(15),
            Layout::new("Top 15 Marcas por Faturamento", [50, 150, 80, 40])
                .axes("Marca", REVENUE_AXIS),
        ),
        ViewSpec {
            id: "monthly-revenue".to_string(),
            chart: ChartKind::Line,
            aggregation: Aggregation::MonthlySum {
                date: Field::Date,
                measure: Field::Revenue,
                coercion: Coercion::Currency,
            },
            layout: Layout::new("Evolução Mensal do Faturamento", [50, 100, 80, 40])
                .axes("Mês (Ano-Mês)", REVENUE_AXIS),
            aliases: BTreeMap::new(),
        }
        .narrow(
            Field::Revenue,
            &["valor venda", "valor_da_venda", "receita", "faturamento"],
        ),
        grouped(
            "quantity-by-product",
            ChartKind::HorizontalBar,
            Field::Product,
            quantity,
            "Desconhecido",
            Some(20),
            Layout::new("Top 20 Produtos por Quantidade Vendida", [50, 50, 200, 40])
                .axes("Quantidade Total Vendida", "Produto"),
        ),
        ViewSpec {
            id: "quantity-vs-revenue".to_string(),
            chart: ChartKind::Scatter,
            aggregation: Aggregation::Scatter {
                quantity: Field::Quantity,
                revenue: Field::Revenue,
                label: Field::Product,
                series: Field::Category,
                unknown_label: "N/A".to_string(),
                unknown_series: "Desconhecida".to_string(),
            },
            layout: Layout::new(
                "Dispersão: Quantidade Vendida vs. Valor da Venda",
                [50, 80, 80, 40],
            )
            .axes("Quantidade Vendida (Unidades)", "Valor da Venda (R$)")
            .legend("Categorias"),
            aliases: BTreeMap::new(),
        }
        .narrow(Field::Quantity, &["quantidad", "quantidade", "qntd"])
        .narrow(Field::Revenue, &["valor_da_venda", "valor venda", "receita"])
        .narrow(Field::Product, &["nome_do_produt", "nome_do_produto", "produto"])
        .narrow(
            Field::Category,
            &["categoria_do_produt", "categoria_do_produto", "categoria"],
        ),
        grouped(
            "quantity-by-category",
            ChartKind::Pie,
            Field::Category,
            quantity,
            "Desconhecida",
            None,
            Layout::new("Distribuição de Quantidade Vendida por Categoria", [50, 50, 50, 50]),
        ),
    ]
}
