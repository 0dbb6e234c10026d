use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "predict-gateway",
    about = "HTTP gateway that forwards symptom lists to a prediction script",
    version
)]
pub struct Cli {
    /// Port to listen on (overrides PORT and PREDICT_PORT).
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Interpreter or executable used to run the prediction script.
    #[arg(long)]
    pub program: Option<String>,

    /// Script path passed to the program before the symptoms argument.
    ///
    /// Pass an empty string to invoke the program with only the symptoms argument.
    #[arg(long)]
    pub script: Option<String>,

    /// Kill the script and fail the request after this many seconds (0 disables).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum number of prediction processes running at once (0 disables).
    #[arg(long = "max-concurrency", value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Number of HTTP worker threads.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Path to the rc file (defaults to PREDICT_CONFIG or the user config dir).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
