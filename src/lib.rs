pub mod aggregate;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod report;
pub mod schema;
pub mod views;
pub mod workbook;

use std::{env, io, path::Path, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, InitConfigArgs, InspectArgs, OutputFormat, RenderArgs},
    config::DashboardConfig,
    dashboard::Session,
    filter::Dimension,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_dashboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Columns(args) => handle_columns(&args),
        Commands::Options(args) => handle_options(&args),
        Commands::Render(args) => handle_render(&args),
        Commands::InitConfig(args) => handle_init_config(&args),
    }
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}")),
        None => Ok(DashboardConfig::default()),
    }
}

fn open_session(args: &InspectArgs, config: DashboardConfig) -> Result<Session> {
    info!("Loading workbook '{}'", args.input.display());
    let mut session = Session::new(config);
    session
        .load_path(&args.input)
        .with_context(|| format!("Processing spreadsheet {:?}", args.input))?;
    Ok(session)
}

fn handle_columns(args: &InspectArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let session = open_session(args, config)?;
    let unresolved = session.schema().unresolved();
    if !unresolved.is_empty() {
        debug!("Unresolved fields: {unresolved:?}");
    }
    print!(
        "{}",
        report::schema_table(session.schema(), &session.config().aliases)
    );
    Ok(())
}

fn handle_options(args: &InspectArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let session = open_session(args, config)?;
    let options = session.filter_options().unwrap_or_default();
    print!("{}", report::options_table(&options));
    Ok(())
}

fn handle_render(args: &RenderArgs) -> Result<()> {
    let mut config = load_config(args.source.config.as_deref())?;
    config.views = config
        .select_views(&args.views)
        .context("Selecting views to render")?;
    let mut session = open_session(&args.source, config)?;
    for (dimension, values) in [
        (Dimension::State, &args.states),
        (Dimension::Category, &args.categories),
        (Dimension::Store, &args.stores),
        (Dimension::Brand, &args.brands),
    ] {
        if !values.is_empty() {
            debug!("Filter {dimension}: {values:?}");
        }
        session.select(dimension, values.iter().cloned());
    }

    let dashboard = session.render();
    info!(
        "Rendered {} of {} view(s)",
        dashboard.charts().count(),
        dashboard.views.len()
    );
    match args.format {
        OutputFormat::Table => {
            print!("{}", report::dashboard_text(&dashboard));
            Ok(())
        }
        OutputFormat::Json => report::write_json(&dashboard, io::stdout().lock()),
        OutputFormat::Csv => report::write_csv(&dashboard, io::stdout().lock()),
    }
}

fn handle_init_config(args: &InitConfigArgs) -> Result<()> {
    let config = DashboardConfig::default();
    match &args.output {
        Some(path) => {
            if path.exists() && !args.force {
                bail!("{path:?} already exists; pass --force to overwrite it");
            }
            config
                .save(path)
                .with_context(|| format!("Writing configuration to {path:?}"))?;
            info!("Wrote default configuration to {path:?}");
        }
        None => print!("{}", config.to_yaml_string()?),
    }
    Ok(())
}
