//! Command-line flags.

use clap::{ArgAction, Parser};

/// Default location of the metadata file.
pub const DEFAULT_OUTPUT_FILENAME: &str = "/tmp/result/result.json";

/// Default location of the docker daemon executable.
pub const DEFAULT_DAEMON_EXECUTABLE: &str = "/tmp/docker_app_lifecycle/docker";

/// Long flags accepted with a single leading dash.
const LONG_FLAGS: &[&str] = &[
    "dockerImageURL",
    "dockerRef",
    "insecureDockerRegistries",
    "outputMetadataJSONFilename",
    "dockerDaemonExecutablePath",
    "dockerDaemonSocketPath",
    "dockerDaemonTimeout",
    "shutdownGracePeriod",
];

/// Stage a docker image: run a docker daemon next to the metadata builder.
#[derive(Parser, Debug)]
#[command(name = "builder", about = "Stage a docker image and write its app metadata")]
pub struct Args {
    /// docker image uri in docker://[registry/][scope/]repository[#tag] format
    #[arg(long = "dockerImageURL")]
    pub docker_image_url: Option<String>,

    /// docker image reference in standard docker string format
    #[arg(long = "dockerRef")]
    pub docker_ref: Option<String>,

    /// Insecure Docker Registry addresses (ip:port), comma separated
    #[arg(long = "insecureDockerRegistries", action = ArgAction::Append)]
    pub insecure_docker_registries: Vec<String>,

    /// filename in which to write the app metadata
    #[arg(long = "outputMetadataJSONFilename", default_value = DEFAULT_OUTPUT_FILENAME)]
    pub output_metadata_json_filename: String,

    /// path to the 'docker' executable
    #[arg(long = "dockerDaemonExecutablePath", default_value = DEFAULT_DAEMON_EXECUTABLE)]
    pub docker_daemon_executable_path: String,

    /// unix socket the docker daemon listens on
    #[arg(long = "dockerDaemonSocketPath", default_value = stager_docker::DEFAULT_SOCKET_PATH)]
    pub docker_daemon_socket_path: String,

    /// seconds to wait for the docker daemon to come up
    #[arg(long = "dockerDaemonTimeout", default_value_t = 10)]
    pub docker_daemon_timeout: u64,

    /// seconds to wait for workers after shutdown starts (0 waits forever)
    #[arg(long = "shutdownGracePeriod", default_value_t = 30)]
    pub shutdown_grace_period: u64,
}

impl Args {
    /// Parse, accepting both `-flag` and `--flag` spellings.
    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::try_parse_from(normalize_args(args))
    }
}

/// Rewrite single-dash long flags (`-dockerRef=x`) to `--dockerRef=x`.
///
/// Only known flag names are rewritten, and nothing after a `--` terminator.
pub fn normalize_args<I, T>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut out = Vec::new();
    let mut terminated = false;

    for (i, arg) in args.into_iter().map(Into::into).enumerate() {
        if i == 0 || terminated {
            out.push(arg);
            continue;
        }
        if arg == "--" {
            terminated = true;
            out.push(arg);
            continue;
        }

        let is_single_dash_long = arg
            .strip_prefix('-')
            .filter(|rest| !rest.starts_with('-'))
            .map(|rest| rest.split('=').next().unwrap_or(rest))
            .is_some_and(|name| LONG_FLAGS.contains(&name));

        if is_single_dash_long {
            out.push(format!("-{arg}"));
        } else {
            out.push(arg);
        }
    }

    out
}
