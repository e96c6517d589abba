//! Roastguard CLI
//!
//! Operator tool for checking RBAC documents and answering access questions.

use anyhow::Context;
use clap::{Parser, Subcommand};
use roastguard::{
    AccessLevel, PermissionResolver, RoleCategory, StageAccessMatrix, SupplyChainStage,
    config::{ConfigProvider, LogFormat, Settings, load_settings, validate},
};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Roastguard - role-based access control for the coffee supply chain
#[derive(Parser, Debug)]
#[command(name = "roastguard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to settings file
    #[arg(short, long, env = "ROASTGUARD_SETTINGS")]
    settings: Option<String>,

    /// Path to the RBAC document (overrides settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ROASTGUARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the RBAC document and list every problem
    Validate,
    /// Check a role's access to a feature
    Check {
        role: String,
        feature: String,
        /// Minimum level required (full, partial, view-only, no)
        #[arg(long)]
        min: Option<AccessLevel>,
    },
    /// List a role's features
    Features {
        role: String,
        /// Only features in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// List roles that can use a feature
    Roles { feature: String },
    /// Show a role's access at a supply-chain stage
    Stage {
        stage: SupplyChainStage,
        /// Role category or RBAC role id
        role: String,
    },
    /// Check whether a role may advance work between two stages
    Transition {
        from: SupplyChainStage,
        to: SupplyChainStage,
        /// Role category or RBAC role id
        role: String,
    },
}

fn init_logging(settings: &Settings, level_override: Option<&str>) {
    let level = level_override.unwrap_or(settings.logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match settings.logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn role_category(role: &str) -> anyhow::Result<RoleCategory> {
    RoleCategory::from_role_id(role)
        .with_context(|| format!("'{}' has no supply-chain role category", role))
}

fn print(json_output: bool, value: serde_json::Value, text: String) -> anyhow::Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", text);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let settings = load_settings(args.settings.as_deref())
        .inspect_err(|e| eprintln!("Failed to load settings: {}", e))?;

    init_logging(&settings, args.log_level.as_deref());

    let matrix = StageAccessMatrix::new();

    // Stage queries use the built-in matrix and need no RBAC document
    match &args.command {
        Command::Stage { stage, role } => {
            let category = role_category(role)?;
            let access = matrix.access(*stage, category);
            let features = matrix.features(*stage, category);
            print(
                args.json,
                json!({
                    "stage": stage,
                    "role_category": category,
                    "access": access,
                    "features": features,
                }),
                format!("{} at {}: {} ({})", category, stage, access, features.join(", ")),
            )?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Transition { from, to, role } => {
            let category = role_category(role)?;
            let allowed = matrix.can_transition(*from, *to, category);
            print(
                args.json,
                json!({ "from": from, "to": to, "role_category": category, "allowed": allowed }),
                format!(
                    "{} {} -> {}: {}",
                    category,
                    from,
                    to,
                    if allowed { "allowed" } else { "denied" }
                ),
            )?;
            return Ok(if allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        _ => {}
    }

    let path = args
        .config
        .clone()
        .or_else(|| settings.rbac.path.as_ref().map(PathBuf::from));

    let provider = ConfigProvider::new();
    let config = provider
        .load_config_with_timeout(path.as_deref(), settings.rbac.load_timeout())
        .await
        .inspect_err(|e| error!(error = %e, "Failed to load RBAC configuration"))?;

    info!(
        name = %config.metadata.name,
        version = %config.metadata.version,
        "RBAC configuration loaded"
    );

    let result = validate(&config);

    if let Command::Validate = args.command {
        let text = if result.valid {
            "Configuration is valid".to_string()
        } else {
            format!(
                "Configuration has {} error(s):\n  {}",
                result.errors.len(),
                result.errors.join("\n  ")
            )
        };
        print(args.json, serde_json::to_value(&result)?, text)?;
        return Ok(if result.valid {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let resolver = if result.valid {
        provider.resolver()
    } else if settings.rbac.strict {
        for e in &result.errors {
            error!(error = %e, "RBAC validation error");
        }
        anyhow::bail!("refusing to answer from an invalid RBAC configuration");
    } else {
        warn!(
            errors = result.errors.len(),
            "Using RBAC configuration with validation errors (strict mode off)"
        );
        provider.resolver()
    };

    run_query(&resolver, args.command, args.json)
}

/// Result of `check`, with the minimum level applied when one was given
#[derive(Debug, Serialize)]
struct CheckReport {
    role: String,
    feature: String,
    allowed: bool,
    /// Level the role holds; `no` when it holds none
    access_level: AccessLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

fn check_access(
    resolver: &PermissionResolver,
    role: &str,
    feature: &str,
    min: Option<AccessLevel>,
) -> CheckReport {
    let decision = resolver.has_access(role, feature);
    let outcome = resolver.require(role, feature, min.unwrap_or(AccessLevel::No));

    CheckReport {
        role: role.to_string(),
        feature: feature.to_string(),
        allowed: outcome.is_ok(),
        access_level: decision.access_level,
        required: min,
        reason: outcome.err().map(|denied| denied.reason),
    }
}

fn run_query(
    resolver: &PermissionResolver,
    command: Command,
    json_output: bool,
) -> anyhow::Result<ExitCode> {
    match command {
        Command::Check { role, feature, min } => {
            let report = check_access(resolver, &role, &feature, min);
            let text = if report.allowed {
                format!("{} -> {}: allowed ({})", role, feature, report.access_level)
            } else {
                format!(
                    "{} -> {}: denied ({})",
                    role,
                    feature,
                    report.reason.as_deref().unwrap_or_default()
                )
            };
            print(json_output, serde_json::to_value(&report)?, text)?;
            Ok(if report.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Features { role, category } => {
            let features: Vec<_> = match &category {
                Some(category) => resolver.features_by_category(&role, category),
                None => resolver.role_features(&role).iter().collect(),
            };
            let text = features
                .iter()
                .map(|f| format!("{} ({})", f.id, f.access_level))
                .collect::<Vec<_>>()
                .join("\n");
            print(json_output, serde_json::to_value(&features)?, text)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Roles { feature } => {
            let grants = resolver.feature_roles(&feature);
            let text = grants
                .iter()
                .map(|g| format!("{} ({})", g.role_id, g.access_level))
                .collect::<Vec<_>>()
                .join("\n");
            print(json_output, serde_json::to_value(&grants)?, text)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate | Command::Stage { .. } | Command::Transition { .. } => {
            Ok(ExitCode::SUCCESS)
        }
    }
}
