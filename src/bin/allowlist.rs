//! IP allowlist policy CLI
//!
//! Adds a source IP to, or resets, the managed allowlist policy

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use iam_ip_allowlist::aws::{load_sdk_config, AwsIdentityService, AwsObjectStore};
use iam_ip_allowlist::{AddIpEvent, AddIpWorkflow, PolicyConfig, ResetWorkflow};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "allowlist")]
#[command(about = "Rotate versions of an IAM source IP allowlist policy")]
struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// ARN of the managed allowlist policy
    #[arg(long, env = "POLICY_ARN", global = true)]
    policy_arn: Option<String>,

    /// Bucket holding the baseline policy document
    #[arg(long, env = "BASELINE_BUCKET", global = true)]
    baseline_bucket: Option<String>,

    /// Key of the baseline policy document
    #[arg(long, env = "BASELINE_KEY", global = true)]
    baseline_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append a source IP to the policy's allowlist
    AddIp {
        /// IP or CIDR literal to allow
        #[arg(long, conflicts_with = "event")]
        source_ip: Option<String>,

        /// JSON event payload, e.g. {"sourceIp":"203.0.113.7"}; "-" reads stdin
        #[arg(long)]
        event: Option<String>,
    },

    /// Replace the policy with the baseline document
    Reset,
}

/// Build the add-ip payload from CLI arguments
fn parse_add_ip_event(
    source_ip: Option<String>,
    event: Option<String>,
) -> anyhow::Result<AddIpEvent> {
    match (source_ip, event) {
        (Some(ip), _) => Ok(AddIpEvent::new(ip)),
        (None, Some(payload)) => {
            let payload = if payload == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read event from stdin")?;
                buf
            } else {
                payload
            };
            serde_json::from_str(&payload).context("Invalid add-ip event payload")
        }
        (None, None) => bail!("add-ip needs --source-ip or --event"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(
                PolicyConfig::load(path)
                    .with_context(|| format!("Failed to load configuration {:?}", path))?,
            )
        }
        None => None,
    };

    let config = PolicyConfig::resolve(
        file_config,
        args.policy_arn,
        args.baseline_bucket,
        args.baseline_key,
    )?;

    info!("Policy: {}", config.policy_arn);

    let sdk_config = load_sdk_config().await;
    let identity = Arc::new(AwsIdentityService::new(&sdk_config));

    let outcome = match args.command {
        Command::AddIp { source_ip, event } => {
            let event = parse_add_ip_event(source_ip, event)?;
            AddIpWorkflow::new(identity, &config).run(&event).await?
        }
        Command::Reset => {
            let store = Arc::new(AwsObjectStore::new(&sdk_config));
            ResetWorkflow::new(identity, store, &config)?.run().await?
        }
    };

    println!("{}", outcome);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_from_flag() {
        let event = parse_add_ip_event(Some("198.51.100.4".to_string()), None).unwrap();
        assert_eq!(event.source_ip, "198.51.100.4");
    }

    #[test]
    fn test_parse_event_from_json() {
        let event =
            parse_add_ip_event(None, Some(r#"{"sourceIp":"198.51.100.0/24"}"#.to_string()))
                .unwrap();
        assert_eq!(event.source_ip, "198.51.100.0/24");
    }

    #[test]
    fn test_parse_event_missing() {
        assert!(parse_add_ip_event(None, None).is_err());
        assert!(parse_add_ip_event(None, Some("{}".to_string())).is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = Args::try_parse_from([
            "allowlist",
            "--policy-arn",
            "arn:aws:iam::123456789012:policy/ip-allowlist",
            "add-ip",
            "--source-ip",
            "203.0.113.7",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::AddIp { source_ip: Some(_), .. }));

        let args = Args::try_parse_from(["allowlist", "reset"]).unwrap();
        assert!(matches!(args.command, Command::Reset));
    }
}
