use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use registry_gc::{
    application::builder::ApplicationBuilder, application::gc::GcParameters, Config,
    GarbageCollector, JobParameters, LocalJobContext,
};

/// Exit code for parameter and configuration errors
const EXIT_CONFIG: u8 = 2;
/// Exit code when the catalog or backend cannot be wired up
const EXIT_UNAVAILABLE: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "registry-gc")]
#[command(about = "Run one garbage collection pass over the registry")]
struct Args {
    /// Run parameters as a JSON object
    #[arg(long)]
    params: Option<String>,

    /// Trash untagged artifacts before marking
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    delete_untagged: Option<bool>,

    /// Minimum blob age in hours
    #[arg(long)]
    time_window_hours: Option<u64>,

    /// Report what would be deleted without deleting
    #[arg(long)]
    dry_run: bool,

    /// Registry metadata cache, e.g. redis://redis:6379/1
    #[arg(long)]
    cache_endpoint: Option<String>,
}

impl Args {
    /// Flags override keys of the same name in `--params`
    fn job_parameters(&self) -> Result<JobParameters, String> {
        let mut params = match &self.params {
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err("--params must be a JSON object".to_string()),
                Err(e) => return Err(format!("--params is not valid JSON: {}", e)),
            },
            None => JobParameters::new(),
        };

        if let Some(delete_untagged) = self.delete_untagged {
            params.insert("delete_untagged".to_string(), Value::Bool(delete_untagged));
        }
        if let Some(hours) = self.time_window_hours {
            params.insert("time_window_hours".to_string(), Value::from(hours));
        }
        if self.dry_run {
            params.insert("dry_run".to_string(), Value::Bool(true));
        }
        if let Some(endpoint) = &self.cache_endpoint {
            params.insert("cache_endpoint".to_string(), Value::String(endpoint.clone()));
        }

        Ok(params)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Merge the run parameters and bind them against the job context.
///
/// Runs before anything is connected so bad parameters fail fast.
fn prepare_run(
    args: &Args,
    cache_endpoint: Option<String>,
    cancel: CancellationToken,
) -> Result<(JobParameters, LocalJobContext), String> {
    let params = args.job_parameters()?;

    let mut ctx = LocalJobContext::new(cancel);
    if let Some(endpoint) = cache_endpoint {
        ctx = ctx.with_value("cache_endpoint", endpoint);
    }

    GcParameters::bind(&params, &ctx).map_err(|e| e.to_string())?;
    Ok((params, ctx))
}

async fn build_collector(config: Config) -> Result<GarbageCollector, Box<dyn std::error::Error>> {
    let builder = ApplicationBuilder::new(config)
        .with_database()
        .await?
        .with_infrastructure()?;
    builder.build_gc()
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::from(EXIT_CONFIG);
    }
    info!("Configuration loaded and validated");

    let cancel = CancellationToken::new();
    let (params, ctx) = match prepare_run(&args, config.cache_endpoint.clone(), cancel.clone()) {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("Invalid arguments: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let gc = match build_collector(config).await {
        Ok(gc) => gc,
        Err(e) => {
            error!("Failed to initialize collector: {}", e);
            return ExitCode::from(EXIT_UNAVAILABLE);
        }
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested, finishing the current step");
            cancel.cancel();
        }
    });

    match gc.run(&ctx, &params).await {
        Ok(report) => {
            info!("{}", report.details());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(retriable = e.is_retriable(), "{}", e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
