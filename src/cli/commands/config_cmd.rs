//! Configuration commands.

use crate::config::Config;

use crate::cli::icons::warn;

/// Print the effective configuration as TOML.
pub async fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    let text = config.to_toml().map_err(|e| anyhow::anyhow!(e))?;
    if let Some(ref path) = config.source_path {
        println!("# {}", path.display());
    }
    println!("{}", text);
    Ok(())
}

/// Print the config file in use.
pub async fn cmd_config_path(config: &Config) -> anyhow::Result<()> {
    match config.source_path {
        Some(ref path) => println!("{}", path.display()),
        None => eprintln!("{} No config file found; using built-in defaults", warn()),
    }
    Ok(())
}
