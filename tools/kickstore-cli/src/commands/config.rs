//! Configuration management commands.

use anyhow::{bail, Context as _, Result};
use kickstore_commerce::config::CommerceConfig;

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { path, force } => init_config(&path, force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let config = &ctx.config;
    ctx.output.info("[pricing]");
    ctx.output.kv("currency", &config.pricing.currency);
    ctx.output
        .kv("floor_price_cents", &config.pricing.floor_price_cents.to_string());

    ctx.output.info("[payments]");
    ctx.output
        .kv("pix_discount", &config.payments.pix_discount().to_string());
    ctx.output
        .kv("pix_expiry_minutes", &config.payments.pix_expiry_minutes.to_string());
    ctx.output.kv(
        "boleto_due_business_days",
        &config.payments.boleto_due_business_days.to_string(),
    );

    ctx.output.info("[api]");
    ctx.output.kv("base_url", &config.api.base_url);
    ctx.output.kv("timeout_secs", &config.api.timeout_secs.to_string());

    ctx.output.info("[cache]");
    ctx.output
        .kv("path", config.cache.path.as_deref().unwrap_or("(in memory)"));

    Ok(())
}

fn init_config(path: &str, force: bool, ctx: &Context) -> Result<()> {
    let target = ctx.resolve_path(path);
    if target.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            target.display()
        );
    }

    CommerceConfig::default()
        .save(&target)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    ctx.output
        .success(&format!("Wrote default configuration to {}", target.display()));
    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    let problems = problems(&ctx.config);

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "valid": problems.is_empty(),
            "problems": problems,
        }));
    } else if problems.is_empty() {
        ctx.output.success("Configuration is valid");
    } else {
        for problem in &problems {
            ctx.output.warn(problem);
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        bail!("{} configuration problem(s)", problems.len())
    }
}

fn problems(config: &CommerceConfig) -> Vec<String> {
    let mut problems = Vec::new();
    let price_check = config
        .pricing
        .currency()
        .and_then(|_| config.pricing.floor_price());
    if let Err(e) = price_check {
        problems.push(e.to_string());
    }
    if config.payments.pix_discount_bps > 10_000 {
        problems.push(format!(
            "pix_discount_bps must be at most 10000, got {}",
            config.payments.pix_discount_bps
        ));
    }
    if config.payments.pix_expiry_minutes <= 0 {
        problems.push("pix_expiry_minutes must be positive".to_string());
    }
    if !(config.api.base_url.starts_with("http://") || config.api.base_url.starts_with("https://"))
    {
        problems.push(format!("api.base_url is not an http(s) URL: {}", config.api.base_url));
    }
    problems
}
