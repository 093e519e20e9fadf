#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use commands::rewrite::RewriteAction;
use commands::OptionSource;
use esmap_core::config::RewriteOptions;
use esmap_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "esmap")]
#[command(author, version, about = "Rewrite ES module imports against an import map", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Rewrite options shared by every command that loads an import map.
#[derive(clap::Args, Debug, Clone, Default)]
struct OptionArgs {
    /// Serving root for mapped specifiers (default: web_modules)
    #[arg(long, value_name = "DIR")]
    dir: Option<String>,

    /// Import map file, absolute or relative to <cwd>/<dir>
    #[arg(long, value_name = "PATH")]
    import_map: Option<String>,

    /// Resolve source-relative imports on disk and rewrite them to `.js`
    #[arg(long, overrides_with = "no_use_node_resolver")]
    use_node_resolver: bool,

    /// Leave source-relative imports as written, even if the config enables resolving
    #[arg(long, overrides_with = "use_node_resolver")]
    no_use_node_resolver: bool,

    /// Config file (default: esmap.config.json in the working directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl OptionArgs {
    fn into_source(self) -> OptionSource {
        OptionSource {
            overrides: RewriteOptions {
                dir: self.dir,
                import_map: self.import_map,
                use_node_resolver: match (self.use_node_resolver, self.no_use_node_resolver) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                ..RewriteOptions::default()
            },
            config: self.config,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Rewrite import specifiers in source files
    Rewrite {
        /// Files or directories to rewrite
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write outputs under this directory, mirroring the input tree
        #[arg(long, value_name = "DIR", conflicts_with = "write")]
        out_dir: Option<PathBuf>,

        /// Rewrite files in place
        #[arg(long)]
        write: bool,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Show how a single specifier would be rewritten
    Resolve {
        /// The specifier, exactly as written in source
        specifier: String,

        /// The importing file
        #[arg(long, value_name = "FILE")]
        from: PathBuf,

        #[command(flatten)]
        options: OptionArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Rewrite {
            paths,
            out_dir,
            write,
            options,
        }) => {
            let span = tracing::info_span!("rewrite", cmd = "rewrite", cwd = %config.cwd.display());
            let _guard = span.enter();
            let action = RewriteAction {
                paths,
                out_dir,
                write,
                options: options.into_source(),
            };
            commands::rewrite::run(&config.cwd, &action, cli.json)
        }
        Some(Commands::Resolve {
            specifier,
            from,
            options,
        }) => {
            let span = tracing::info_span!("resolve", cmd = "resolve", cwd = %config.cwd.display());
            let _guard = span.enter();
            commands::resolve::run(
                &config.cwd,
                &specifier,
                &from,
                &options.into_source(),
                cli.json,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_override(args: &[&str]) -> Option<bool> {
        let cli = Cli::try_parse_from(args).unwrap();
        let Some(Commands::Resolve { options, .. }) = cli.command else {
            panic!("expected resolve command");
        };
        options.into_source().overrides.use_node_resolver
    }

    #[test]
    fn test_use_node_resolver_flags() {
        let with = |extra: &[&str]| {
            let mut args = vec!["esmap", "resolve", "./a", "--from", "main.js"];
            args.extend_from_slice(extra);
            resolver_override(&args)
        };
        assert_eq!(with(&[]), None);
        assert_eq!(with(&["--use-node-resolver"]), Some(true));
        assert_eq!(with(&["--no-use-node-resolver"]), Some(false));
        // last one wins
        assert_eq!(
            with(&["--use-node-resolver", "--no-use-node-resolver"]),
            Some(false)
        );
    }
}
