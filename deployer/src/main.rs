use clap::{Args, Parser, Subcommand};
use deployer::{
    load_option_settings, parse_tag, verify_endpoint, Application, DeployRequest, PollConfig,
};
use platform::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "deployer")]
#[command(about = "Deploys application archives to Elastic Beanstalk environments")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CredentialArgs {
    /// YAML file with accessKeyId, secretAccessKey and, unless --region is given, region
    #[arg(short = 'k', long)]
    key_file: PathBuf,
    /// Overrides the region from the key file
    #[arg(long)]
    region: Option<String>,
    /// Custom service endpoint, e.g. a local emulator
    #[arg(long)]
    endpoint_url: Option<String>,
}

impl CredentialArgs {
    fn load(&self) -> Result<AwsConfig, Box<dyn std::error::Error>> {
        let mut config = AwsConfig::from_yaml_file(&self.key_file)?;
        if let Some(region) = &self.region {
            config = config.with_region(region);
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            config = config.with_endpoint_url(endpoint_url);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an archive and roll it out to an environment
    Deploy {
        #[command(flatten)]
        credentials: CredentialArgs,
        /// Archive named <application>-<version>.<ext>
        #[arg(short = 'a', long)]
        archive: PathBuf,
        /// Target environment name
        #[arg(short = 'e', long)]
        environment: String,
        /// Solution stack, required when the environment does not exist yet
        #[arg(short = 's', long)]
        solution_stack: Option<String>,
        /// YAML or JSON file with environment option settings
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
        /// Write deployment info JSON to this file
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        /// Environment tier: web-server or worker
        #[arg(long, default_value = "web-server")]
        tier: EnvironmentTier,
        /// Tag applied to a newly created environment, as KEY=VALUE
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<Tag>,
        /// Seconds between status polls
        #[arg(long, default_value = "5")]
        poll_interval: u64,
        /// Seconds to wait for the environment to leave Launching/Updating
        #[arg(long, default_value = "1200")]
        status_timeout: u64,
        /// Seconds to wait for the environment to become healthy
        #[arg(long, default_value = "300")]
        health_timeout: u64,
        /// Issue a GET against the environment URL after deploying
        #[arg(long)]
        verify: bool,
    },
    /// Show an environment's status and health
    Status {
        #[command(flatten)]
        credentials: CredentialArgs,
        #[arg(short = 'e', long)]
        environment: String,
    },
    /// Terminate an environment
    Terminate {
        #[command(flatten)]
        credentials: CredentialArgs,
        #[arg(short = 'e', long)]
        environment: String,
    },
    /// Delete application versions not used by any live environment
    CleanVersions {
        #[command(flatten)]
        credentials: CredentialArgs,
        #[arg(short = 'n', long)]
        application: String,
    },
    /// Delete an application and all of its versions
    DeleteApplication {
        #[command(flatten)]
        credentials: CredentialArgs,
        #[arg(short = 'n', long)]
        application: String,
        /// Terminate running environments first
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Deploy {
            credentials,
            archive,
            environment,
            solution_stack,
            config,
            output,
            tier,
            tags,
            poll_interval,
            status_timeout,
            health_timeout,
            verify,
        } => {
            let option_settings = match config {
                Some(path) => load_option_settings(path)?,
                None => Vec::new(),
            };

            let poll = PollConfig::new()
                .with_interval(Duration::from_secs(poll_interval))
                .with_status_change_timeout(Duration::from_secs(status_timeout))
                .with_healthy_timeout(Duration::from_secs(health_timeout));
            let application =
                Application::from_config(&credentials.load()?)?.with_poll_config(poll)?;

            let mut request = DeployRequest::new(archive, environment)
                .with_option_settings(option_settings)
                .with_tags(tags)
                .with_tier(tier);
            if let Some(stack) = solution_stack {
                request = request.with_solution_stack(stack);
            }

            let info = match application.deploy(request).await {
                Ok(info) => info,
                Err(e) => {
                    error!("Deployment failed: {}", e);
                    return Err(e.into());
                }
            };

            println!("{}", info.to_json()?);
            if let Some(path) = output {
                info.write_json(path).await?;
            }

            if verify {
                match &info.env_url {
                    Some(url) => {
                        verify_endpoint(url, Duration::from_secs(30)).await?;
                    }
                    None => info!("{} has no URL to verify", info.env_name),
                }
            }
        }
        Commands::Status {
            credentials,
            environment,
        } => {
            let application = Application::from_config(&credentials.load()?)?;
            match application.describe_environment(&environment).await? {
                Some(description) => println!("{}", serde_json::to_string_pretty(&description)?),
                None => {
                    error!("Environment {} not found", environment);
                    std::process::exit(1);
                }
            }
        }
        Commands::Terminate {
            credentials,
            environment,
        } => {
            let application = Application::from_config(&credentials.load()?)?;
            let description = application.terminate_environment(&environment).await?;
            println!("{}", serde_json::to_string_pretty(&description)?);
        }
        Commands::CleanVersions {
            credentials,
            application: application_name,
        } => {
            let application = Application::from_config(&credentials.load()?)?;
            let deleted = application
                .clean_application_versions(&application_name)
                .await?;
            info!("Deleted {} application versions", deleted.len());
            for label in deleted {
                println!("{}", label);
            }
        }
        Commands::DeleteApplication {
            credentials,
            application: application_name,
            force,
        } => {
            let application = Application::from_config(&credentials.load()?)?;
            application
                .delete_application(&application_name, force)
                .await?;
            info!("Deleted application {}", application_name);
        }
    }

    Ok(())
}
