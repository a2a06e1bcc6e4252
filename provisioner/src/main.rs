//! Provisioner CLI

use clap::{Arg, ArgAction, Command};
use provisioner::aws;
use std::path::PathBuf;
use tracing::error;

/// Returns the version of the crate.
pub const fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Flag for verbose output
const VERBOSE_FLAG: &str = "verbose";

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .help("Path to YAML config file (defaults are used when omitted)")
        .value_parser(clap::value_parser!(PathBuf))
}

/// Entrypoint for the Provisioner CLI
#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Define application
    let matches = Command::new("provisioner")
        .version(crate_version())
        .about("Provision a VPC, subnets, gateway, security group, key pair, and EC2 instance.")
        .arg(
            Arg::new(VERBOSE_FLAG)
                .short('v')
                .long(VERBOSE_FLAG)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new(aws::CMD)
                .about("Create resources in a single AWS region, appending their identifiers to a local file.")
                .subcommand(
                    Command::new(aws::CREATE_CMD)
                        .about("Create the VPC, subnets, internet gateway, route, security group, key pair, and instance in order.")
                        .arg(config_arg()),
                )
                .subcommand(
                    Command::new(aws::LAUNCH_CMD)
                        .about("Launch an instance into an existing subnet and security group and open SSH to the current public IP.")
                        .arg(config_arg())
                        .arg(
                            Arg::new("subnet")
                                .long("subnet")
                                .required(true)
                                .help("ID of the subnet to launch into")
                                .value_parser(clap::value_parser!(String)),
                        )
                        .arg(
                            Arg::new("security-group")
                                .long("security-group")
                                .required(true)
                                .help("ID of the security group to launch into")
                                .value_parser(clap::value_parser!(String)),
                        )
                        .arg(
                            Arg::new("key")
                                .long("key")
                                .help("Name of an existing key pair (defaults to the configured key pair)")
                                .value_parser(clap::value_parser!(String)),
                        ),
                ),
        )
        .get_matches();

    // Create logger
    let level = if matches.get_flag(VERBOSE_FLAG) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    // Parse subcommands
    if let Some(aws_matches) = matches.subcommand_matches(aws::CMD) {
        match aws_matches.subcommand() {
            Some((aws::CREATE_CMD, matches)) => {
                let config_path = matches.get_one::<PathBuf>("config");
                if let Err(e) = aws::create(config_path).await {
                    error!(error=?e, "failed to create infrastructure");
                } else {
                    return std::process::ExitCode::SUCCESS;
                }
            }
            Some((aws::LAUNCH_CMD, matches)) => {
                let config_path = matches.get_one::<PathBuf>("config");
                let subnet = matches.get_one::<String>("subnet").unwrap();
                let security_group = matches.get_one::<String>("security-group").unwrap();
                let key = matches.get_one::<String>("key").map(|s| s.as_str());
                if let Err(e) = aws::launch(config_path, subnet, security_group, key).await {
                    error!(error=?e, "failed to launch instance");
                } else {
                    return std::process::ExitCode::SUCCESS;
                }
            }
            Some((cmd, _)) => {
                error!(cmd, "invalid subcommand");
            }
            None => {
                error!("no subcommand provided");
            }
        }
    } else if let Some(cmd) = matches.subcommand_name() {
        error!(cmd, "invalid subcommand");
    } else {
        error!("no subcommand provided");
    }
    std::process::ExitCode::FAILURE
}
