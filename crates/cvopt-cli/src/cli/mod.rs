//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cvopt_core::{config, logging};

mod commands;

#[derive(Parser)]
#[command(name = "cvopt")]
#[command(version)]
#[command(about = "Score and rewrite your CV against a job description")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long, env = "CVOPT_EMAIL")]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
        /// Password confirmation (defaults to the password)
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Email yourself a password reset link
    ForgotPassword {
        #[arg(long)]
        email: String,
    },

    /// Set a new password from a reset link
    ResetPassword {
        /// The full link from the reset email
        #[arg(long, conflicts_with = "token", required_unless_present = "token")]
        link: Option<String>,
        /// The token from the reset link
        #[arg(long)]
        token: Option<String>,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show who is signed in
    Status,

    /// Score a CV against a job description
    Analyze {
        /// Job description text, or @path to read it from a file
        #[arg(long)]
        job: String,

        #[command(flatten)]
        source: CvSource,

        /// Also request a rewrite once the analysis is done
        #[arg(long)]
        rewrite: bool,

        /// Skip AI suggestions
        #[arg(long = "no-ai")]
        no_ai: bool,
    },

    /// Rewrite CV text to match a job description (paid plans)
    Rewrite {
        /// Job description text, or @path to read it from a file
        #[arg(long)]
        job: String,
        /// CV text, or @path to read it from a file
        #[arg(long, conflicts_with = "cv_file", required_unless_present = "cv_file")]
        cv_text: Option<String>,
        #[arg(long)]
        cv_file: Option<PathBuf>,
    },

    /// Upload a résumé and show what was extracted
    Upload {
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Exactly one way of providing the CV.
#[derive(clap::Args, Debug, Clone)]
#[group(required = true, multiple = false)]
struct CvSource {
    /// Résumé file (pdf, docx, txt, ...)
    #[arg(long)]
    file: Option<String>,
    /// CV text, or @path to read it from a file
    #[arg(long)]
    text: Option<String>,
    /// Plain-text CV file
    #[arg(long = "text-file")]
    text_file: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Write a commented default config
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = config::Config::load().context("load config")?;
    let _log_guard = match logging::init(&config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    };
    let ctx = commands::Context::open(&config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&ctx, &email, password).await
        }
        Commands::Register {
            email,
            password,
            confirm,
        } => commands::auth::register(&ctx, &email, password, confirm).await,
        Commands::ForgotPassword { email } => commands::auth::forgot_password(&ctx, &email).await,
        Commands::ResetPassword {
            link,
            token,
            password,
        } => commands::auth::reset_password(&ctx, link, token, password).await,
        Commands::Logout => commands::auth::logout(&ctx),
        Commands::Status => commands::auth::status(&ctx).await,

        Commands::Analyze {
            job,
            source,
            rewrite,
            no_ai,
        } => {
            let source = match (source.file, source.text, source.text_file) {
                (Some(file), _, _) => commands::analyze::Source::File(file),
                (None, Some(text), _) => commands::analyze::Source::Text(text),
                (None, None, Some(path)) => commands::analyze::Source::TextFile(path),
                (None, None, None) => anyhow::bail!("Provide --file, --text or --text-file"),
            };
            commands::analyze::analyze(
                &ctx,
                commands::analyze::AnalyzeOptions {
                    job: &job,
                    source,
                    rewrite,
                    include_ai: !no_ai && config.include_ai,
                },
            )
            .await
        }
        Commands::Rewrite {
            job,
            cv_text,
            cv_file,
        } => commands::analyze::rewrite(&ctx, &job, cv_text, cv_file).await,

        Commands::Upload { file } => commands::upload::run(&ctx, &file).await,

        // Handled before the session is opened.
        Commands::Config { .. } => Ok(()),
    }
}
