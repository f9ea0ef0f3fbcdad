//! `protonox serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use protonox_bridge::{HEALTH_PATH, SOCKET_PREFIX, run_server, server_config_from_config};
use protonox_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover protonox.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve (overrides config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long, env = "PROTONOX_HOST")]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// URL path the overlay script is served from (overrides config).
    #[arg(long)]
    overlay_path: Option<String>,

    /// Overlay client source file (overrides config).
    #[arg(long)]
    overlay_script: Option<PathBuf>,

    /// Enable verbose output (bridge and request logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the overlay script cannot be
    /// loaded or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            root_dir: self.root,
            overlay_path: self.overlay_path,
            overlay_script: self.overlay_script,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let server_config = server_config_from_config(&config);
        output.highlight(&format!(
            "Protonox dev server on http://{}:{}",
            server_config.host, server_config.port
        ));
        output.info(&format!(
            "Root directory: {}",
            server_config.root_dir.display()
        ));
        output.info(&format!(
            "Overlay: {} (from {})",
            server_config.overlay_path,
            server_config.overlay_script.display()
        ));
        output.info(&format!("Health check: {HEALTH_PATH}"));
        output.info(&format!("Studio socket: {SOCKET_PREFIX}"));

        run_server(server_config).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ServeArgs,
    }

    #[test]
    fn test_parse_overrides() {
        let cli = TestCli::try_parse_from([
            "protonox",
            "--root",
            "public",
            "--port",
            "5173",
            "--overlay-path",
            "/studio.js",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.args.root, Some(PathBuf::from("public")));
        assert_eq!(cli.args.port, Some(5173));
        assert_eq!(cli.args.overlay_path.as_deref(), Some("/studio.js"));
        assert!(cli.args.verbose);
        assert!(cli.args.config.is_none());
    }

    #[test]
    fn test_parse_rejects_invalid_port() {
        assert!(TestCli::try_parse_from(["protonox", "--port", "not-a-port"]).is_err());
    }
}
