//! APKSure CLI: sign in and analyze Android packages from the command line.
//!
//! Set APKSURE_API_URL, APKSURE_EMAIL and APKSURE_PASSWORD or pass the flags.

use anyhow::Context;
use apksure_api_client::{
    ApiClient, Artifact, AuthenticatedApi, Backoff, PollPolicy, UploadWorkflow, WorkflowStatus,
};
use apksure_cli::{init_tracing, AnalysisReport};
use apksure_core::ArtifactValidator;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "apksure", about = "APKSure command line client")]
struct Cli {
    /// Base URL of the APKSure API
    #[arg(long, env = "APKSURE_API_URL", default_value = "http://localhost:5000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Credentials {
    #[arg(long, env = "APKSURE_EMAIL")]
    email: String,
    #[arg(long, env = "APKSURE_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Check credentials and print the session expiry
    Signin {
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Upload an APK and wait for the analysis result
    Analyze {
        #[command(flatten)]
        credentials: Credentials,
        /// Path to the .apk file
        file: PathBuf,
        /// Seconds between status checks
        #[arg(long, default_value = "2")]
        interval_secs: u64,
        /// Status checks before giving up
        #[arg(long, default_value = "150")]
        max_attempts: u32,
        /// Overall limit in seconds, measured from the end of the upload
        #[arg(long, default_value = "300")]
        deadline_secs: u64,
        /// Double the wait after every pending answer (capped at 30s)
        #[arg(long)]
        backoff: bool,
    },
}

#[derive(Serialize)]
struct SignInOutput<'a> {
    message: &'a str,
    email: &'a str,
    expires_at: String,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.api_url).context("Failed to create API client")?;

    match cli.command {
        Commands::Register { credentials } => {
            let response = client
                .register(&credentials.email, &credentials.password)
                .await
                .context("Registration failed")?;
            print_json(&response)?;
        }
        Commands::Signin { credentials } => {
            let session = client
                .sign_in(&credentials.email, &credentials.password)
                .await
                .context("Sign-in failed")?;
            print_json(&SignInOutput {
                message: "Sign-in successful!",
                email: session.email(),
                expires_at: session.expires_at().to_rfc3339(),
            })?;
        }
        Commands::Analyze {
            credentials,
            file,
            interval_secs,
            max_attempts,
            deadline_secs,
            backoff,
        } => {
            let artifact = Artifact::from_path(&file).await?;
            let session = client
                .sign_in(&credentials.email, &credentials.password)
                .await
                .context("Sign-in failed")?;

            let mut policy = PollPolicy::fixed(Duration::from_secs(interval_secs), max_attempts)
                .with_deadline(Some(Duration::from_secs(deadline_secs)));
            if backoff {
                policy = policy.with_backoff(Backoff::Exponential {
                    factor: 2.0,
                    max_interval: Duration::from_secs(30),
                });
            }

            let workflow = UploadWorkflow::new(
                AuthenticatedApi::new(client, session),
                policy,
                ArtifactValidator::apk(),
            );
            workflow
                .select(artifact)
                .await
                .with_context(|| format!("Cannot analyze {}", file.display()))?;

            let mut updates = workflow.watch();
            let progress = tokio::spawn(async move {
                let mut last = WorkflowStatus::Initial;
                while updates.changed().await.is_ok() {
                    let status = updates.borrow_and_update().status;
                    if status != last {
                        tracing::info!(status = %status, "Workflow status changed");
                        last = status;
                    }
                }
            });

            let analyzed = workflow.analyze().await;
            let state = match analyzed {
                Ok(()) => workflow.wait().await,
                Err(_) => workflow.snapshot(),
            };
            progress.abort();

            let report = AnalysisReport::from_state(&state);
            print_json(&report)?;
            if !report.succeeded() {
                anyhow::bail!("Analysis finished with status {}", report.status);
            }
        }
    }

    Ok(())
}
