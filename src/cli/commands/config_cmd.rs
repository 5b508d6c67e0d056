//! config command - Print the effective configuration

use anyhow::{Context as _, Result};

use crate::cli::Context;

/// Print where the configuration came from and its effective values.
pub fn config(ctx: &Context) -> Result<()> {
    match &ctx.config_path {
        Some(path) => println!("# loaded from {}", path.display()),
        None => println!("# no config file found, using defaults"),
    }
    let rendered = toml::to_string_pretty(&ctx.config).context("Failed to render config")?;
    print!("{rendered}");
    Ok(())
}
