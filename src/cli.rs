use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Aggregate retail sales spreadsheets into dashboard charts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show which spreadsheet header each semantic field resolved to
    Columns(InspectArgs),
    /// List the distinct values available to each filter
    Options(InspectArgs),
    /// Filter the spreadsheet and render every dashboard view
    Render(RenderArgs),
    /// Write the built-in configuration as YAML
    InitConfig(InitConfigArgs),
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Spreadsheet to load (.xlsx, .xls, .xlsb or .ods)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML configuration overriding aliases, views or the preferred sheet
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub source: InspectArgs,
    /// Keep rows whose state is this value (repeatable)
    #[arg(long = "state", action = clap::ArgAction::Append)]
    pub states: Vec<String>,
    /// Keep rows whose category is this value (repeatable)
    #[arg(long = "category", action = clap::ArgAction::Append)]
    pub categories: Vec<String>,
    /// Keep rows whose store is this value (repeatable)
    #[arg(long = "store", action = clap::ArgAction::Append)]
    pub stores: Vec<String>,
    /// Keep rows whose brand is this value (repeatable)
    #[arg(long = "brand", action = clap::ArgAction::Append)]
    pub brands: Vec<String>,
    /// Render only these view ids (repeatable; all views when omitted)
    #[arg(long = "view", action = clap::ArgAction::Append)]
    pub views: Vec<String>,
    /// Output format written to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Destination YAML file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Overwrite the destination when it already exists
    #[arg(long)]
    pub force: bool,
}
