//! leg-toolkit: admin CLI and MCP tool server for the LEG platform.

use leg_toolkit::cli;
use leg_toolkit::config::{Command, Config, ServeArgs, TransportMode};
use leg_toolkit::error::ToolkitResult;
use leg_toolkit::tools::{Dispatcher, ToolContext, ToolRegistry};
use leg_toolkit::transport::{HttpTransport, StdioTransport, Transport};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Logs always go to stderr: stdout
/// carries CLI results and the stdio MCP channel.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn build_dispatcher(config: &Config) -> ToolkitResult<Arc<Dispatcher>> {
    let registry = ToolRegistry::standard()?;
    let ctx = ToolContext::from_config(config)?;
    Ok(Arc::new(Dispatcher::new(Arc::new(registry), Arc::new(ctx))))
}

async fn serve(dispatcher: Arc<Dispatcher>, args: &ServeArgs) -> ToolkitResult<()> {
    info!(
        transport = %args.transport,
        "Starting leg-toolkit MCP server v{}",
        env!("CARGO_PKG_VERSION")
    );
    match args.transport {
        TransportMode::Stdio => StdioTransport::new(dispatcher).run().await,
        TransportMode::Http => HttpTransport::new(dispatcher, args)?.run().await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse_args();
    init_tracing(&config);

    if let Err(message) = config.validate() {
        eprintln!("Error: {}", message);
        return ExitCode::FAILURE;
    }

    let dispatcher = match build_dispatcher(&config) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    match &config.command {
        Command::Serve(args) => match serve(dispatcher, args).await {
            Ok(()) => {
                info!("Server shutdown complete");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Server error");
                ExitCode::FAILURE
            }
        },
        Command::Invoke { tool, args } => {
            let output = cli::invoke(&dispatcher, tool.as_deref(), args).await;
            dispatcher.shutdown().await;
            output.emit();
            ExitCode::from(output.exit_code as u8)
        }
        Command::Tools => {
            let output = cli::list_tools(&dispatcher);
            output.emit();
            ExitCode::from(output.exit_code as u8)
        }
    }
}
