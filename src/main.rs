//! cfn-stack CLI
//!
//! Usage:
//!   cfn-stack [OPTIONS] <COMMAND>
//!
//! Commands:
//!   expand    Print the template as CloudFormation JSON
//!   validate  Check that the template finalizes (and optionally ask the provider)
//!   lint      Report policy, action and naming defects
//!   diff      Compare against a template file or the deployed stack
//!   create    Create the stack
//!   update    Update the stack
//!   delete    Delete the stack
//!   list      List built-in templates

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cfn_stack::config::parse_key_value;
use cfn_stack::engine::{self, ProvisioningEngine};
use cfn_stack::stacks;
use cfn_stack::{
    diff_against, lint, load_template, submit, ActionCatalog, AwsCliEngine, StackConfig,
    StackError, SubmitMode, TemplateSource,
};

#[derive(Parser)]
#[command(name = "cfn-stack")]
#[command(about = "Build, check and deploy CloudFormation stacks")]
struct Cli {
    /// Stack configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log declarations and engine calls
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the template as CloudFormation JSON
    Expand {
        #[command(flatten)]
        source: SourceArgs,

        /// Print on a single line
        #[arg(long)]
        compact: bool,

        /// Keep stack-tooling attributes such as UsePreviousValue
        #[arg(long)]
        model: bool,
    },

    /// Check that the template finalizes
    Validate {
        #[command(flatten)]
        source: SourceArgs,

        /// Also ask the provider to validate the template
        #[arg(long)]
        remote: bool,

        #[command(flatten)]
        stack: StackArgs,
    },

    /// Report policy, action and naming defects
    Lint {
        #[command(flatten)]
        source: SourceArgs,

        /// Additional action catalog (TOML format)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Exit with an error when there are warnings
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Compare against a template file or the deployed stack
    Diff {
        #[command(flatten)]
        source: SourceArgs,

        /// Template file to compare against instead of the deployed stack
        #[arg(long)]
        against: Option<PathBuf>,

        #[command(flatten)]
        stack: StackArgs,
    },

    /// Create the stack
    Create {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        stack: StackArgs,
    },

    /// Update the stack
    Update {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        stack: StackArgs,
    },

    /// Delete the stack
    Delete {
        #[command(flatten)]
        stack: StackArgs,
    },

    /// List built-in templates
    List,
}

#[derive(Args)]
struct SourceArgs {
    /// CloudFormation JSON template file
    #[arg(short, long, conflicts_with = "template")]
    file: Option<PathBuf>,

    /// Built-in template name
    #[arg(short, long, default_value = stacks::gocd_ecs::NAME)]
    template: String,
}

impl SourceArgs {
    fn source(&self) -> TemplateSource {
        match &self.file {
            Some(path) => TemplateSource::File(path.clone()),
            None => TemplateSource::Builtin(self.template.clone()),
        }
    }
}

#[derive(Args)]
struct StackArgs {
    #[arg(long)]
    stack_name: Option<String>,

    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    profile: Option<String>,

    /// Parameter override
    #[arg(short = 'p', long = "parameter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    parameters: Vec<(String, String)>,

    /// Stack tag
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    tags: Vec<(String, String)>,

    /// Do not roll back a failed create
    #[arg(long)]
    disable_rollback: bool,

    /// Print the provider command instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Provider CLI to invoke
    #[arg(long)]
    aws_cli: Option<PathBuf>,
}

impl StackArgs {
    /// Apply command line flags over the configuration file
    fn resolve(&self, config_path: Option<&Path>) -> Result<StackConfig, StackError> {
        let mut config = match config_path {
            Some(path) => StackConfig::from_file(path)?,
            None => StackConfig::default(),
        };

        if let Some(name) = &self.stack_name {
            config = config.with_stack_name(name);
        }
        if let Some(region) = &self.region {
            config = config.with_region(region);
        }
        if let Some(profile) = &self.profile {
            config = config.with_profile(profile);
        }
        if let Some(program) = &self.aws_cli {
            config = config.with_aws_cli(program);
        }
        if self.disable_rollback {
            config = config.with_disable_rollback(true);
        }
        for (key, value) in &self.parameters {
            config = config.with_parameter(key, value);
        }
        for (key, value) in &self.tags {
            config = config.with_tag(key, value);
        }
        Ok(config)
    }

    fn engine(&self, config: &StackConfig) -> AwsCliEngine {
        AwsCliEngine::from_config(config).with_dry_run(self.dry_run)
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            cli.verbose,
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// `-v` forces debug; otherwise `RUST_LOG` applies, defaulting to warn
fn log_filter(verbose: bool, env: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn run(cli: Cli) -> Result<(), StackError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Expand {
            source,
            compact,
            model,
        } => {
            let template = load_template(&source.source())?;
            let json = if model {
                template.to_json(!compact)?
            } else {
                template.to_provider_json(!compact)?
            };
            println!("{}", json);
        }

        Commands::Validate {
            source,
            remote,
            stack,
        } => {
            let template = load_template(&source.source())?;
            println!(
                "ok: {} parameters, {} outputs, {} resources",
                template.parameters().len(),
                template.outputs().len(),
                template.resources().len()
            );
            if remote {
                let config = stack.resolve(config_path)?;
                let provider = stack.engine(&config);
                let output = provider.validate_template(&template.to_provider_json(false)?)?;
                if !output.is_empty() {
                    println!("{}", output);
                }
            }
        }

        Commands::Lint {
            source,
            catalog,
            deny_warnings,
        } => {
            let template = load_template(&source.source())?;
            let mut actions = ActionCatalog::default();
            if let Some(path) = &catalog {
                actions.extend(ActionCatalog::from_file(path)?);
            }

            let warnings = lint::check(&template, &actions);
            for warning in &warnings {
                println!("{}", warning);
            }
            if !warnings.is_empty() {
                warn!(count = warnings.len(), "template has lint warnings");
                if deny_warnings {
                    return Err(StackError::LintFailed {
                        count: warnings.len(),
                    });
                }
            }
        }

        Commands::Diff {
            source,
            against,
            stack,
        } => {
            let template = load_template(&source.source())?;
            let other = match &against {
                Some(path) => std::fs::read_to_string(path).map_err(|source| StackError::Io {
                    path: path.clone(),
                    source,
                })?,
                None => {
                    let config = stack.resolve(config_path)?;
                    let provider = stack.engine(&config);
                    let fetched = provider.fetch_template(engine::stack_name(&config)?)?;
                    if stack.dry_run {
                        println!("{}", fetched);
                        return Ok(());
                    }
                    fetched
                }
            };

            let changes = diff_against(&template, &other)?;
            if changes.is_empty() {
                println!("no changes");
            }
            for change in changes {
                println!("{}", change);
            }
        }

        Commands::Create { source, stack } => {
            let template = load_template(&source.source())?;
            let config = stack.resolve(config_path)?;
            let submission = submit(&template, &stack.engine(&config), &config, SubmitMode::Create)?;
            println!("{}", submission.output);
        }

        Commands::Update { source, stack } => {
            let template = load_template(&source.source())?;
            let config = stack.resolve(config_path)?;
            let submission = submit(&template, &stack.engine(&config), &config, SubmitMode::Update)?;
            println!("{}", submission.output);
        }

        Commands::Delete { stack } => {
            let config = stack.resolve(config_path)?;
            let submission = engine::delete(&stack.engine(&config), &config)?;
            println!("{}", submission.output);
        }

        Commands::List => {
            for name in stacks::names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_log_filter_defaults_to_warn() {
        assert_eq!(log_filter(false, None).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_log_filter_honours_rust_log() {
        assert_eq!(
            log_filter(false, Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            log_filter(false, Some("error")).max_level_hint(),
            Some(LevelFilter::ERROR)
        );
    }

    #[test]
    fn test_verbose_overrides_rust_log() {
        assert_eq!(
            log_filter(true, Some("error")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }
}
