use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Protein workbench CLI - compose run configs, build synthetic protein batches and exercise denoising transforms.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose a run configuration and print it as YAML.
    Compose(ComposeArgs),
    /// Build a batch of random proteins and report its layout.
    Batch(BatchArgs),
    /// Apply a configured transform to random proteins and check the CA deviation.
    Transform(TransformArgs),
}

/// Arguments for the `compose` subcommand.
#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Name of the primary config inside the config directory.
    #[arg(short = 'n', long, default_value = "train.yaml", value_name = "NAME")]
    pub config_name: String,

    /// Config directory. Defaults to `configs/` under the project root.
    #[arg(short = 'd', long, value_name = "PATH")]
    pub config_dir: Option<PathBuf>,

    /// Overrides in `key=value`, `+key=value`, `++key=value`, `~key` or `group=option` form.
    #[arg(value_name = "OVERRIDE")]
    pub overrides: Vec<String>,

    /// Resolve interpolations before printing.
    #[arg(short, long)]
    pub resolve: bool,

    /// Attach the `meta` node (config name, overrides, group choices).
    #[arg(long)]
    pub with_meta: bool,

    /// Apply the settings used by the test suite.
    #[arg(long)]
    pub test_defaults: bool,
}

/// Arguments for the `batch` subcommand.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Number of proteins in the batch.
    #[arg(short = 'b', long, default_value_t = 4, value_name = "INT")]
    pub batch_size: usize,

    /// Neighbour graph, as `knn_<K>` or `eps_<radius>`.
    #[arg(short, long, default_value = "knn_8", value_name = "SPEC")]
    pub edges: String,

    /// Seed for the random number generator.
    #[arg(short, long, default_value_t = 0, value_name = "INT")]
    pub seed: u64,
}

/// Arguments for the `transform` subcommand.
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Transform config file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Key of the transform node inside the config file.
    #[arg(short, long, required = true, value_name = "KEY")]
    pub key: String,

    /// Number of random proteins to corrupt.
    #[arg(short = 't', long, default_value_t = 100, value_name = "INT")]
    pub trials: usize,

    /// Seed for the random number generator.
    #[arg(short, long, default_value_t = 0, value_name = "INT")]
    pub seed: u64,

    /// Write PDB snapshots of the first trial into this directory.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn compose_collects_overrides() {
        let cli = Cli::parse_from([
            "workbench",
            "-vv",
            "compose",
            "trainer=cpu",
            "+extra=1",
            "--resolve",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Compose(args) = cli.command else {
            panic!("expected compose");
        };
        assert_eq!(args.config_name, "train.yaml");
        assert_eq!(args.overrides, vec!["trainer=cpu", "+extra=1"]);
        assert!(args.resolve);
    }

    #[test]
    fn transform_requires_config_and_key() {
        assert!(Cli::try_parse_from(["workbench", "transform", "-c", "t.yaml"]).is_err());
        let cli = Cli::try_parse_from([
            "workbench", "transform", "-c", "t.yaml", "-k", "noise", "-t", "5",
        ])
        .unwrap();
        let Commands::Transform(args) = cli.command else {
            panic!("expected transform");
        };
        assert_eq!(args.trials, 5);
        assert_eq!(args.key, "noise");
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["workbench", "-q", "-v", "batch"]).is_err());
    }
}
