//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::{Config, OutputFormat};
use crate::error::Result;
use crate::output::Formatter;

/// Execute the config command.
pub async fn execute_config(args: ConfigArgs, config: &mut Config, formatter: &Formatter) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            println!("Store: {}", config.store.display());
            println!("Import config: {}", config.import_config.display());
            println!("Color: {}", config.settings.color);
            println!("Format: {}", format_name(config.settings.format));
            return Ok(());
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
            return Ok(());
        }
        ConfigAction::SetStore { path } => config.store = path,
        ConfigAction::SetImportConfig { path } => config.import_config = path,
        ConfigAction::SetFormat { format } => config.settings.format = format.into(),
    }

    config.save()?;
    println!("{}", formatter.success("Settings saved"));
    Ok(())
}

fn format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Table => "table",
        OutputFormat::Json => "json",
        OutputFormat::Quiet => "quiet",
    }
}
