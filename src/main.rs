use clap::Parser;
use filewarm::Cli;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

/// How long shutdown waits for reads abandoned during cancellation
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not errors; everything else exits 1
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(cli.run());
    // A read stuck on a dead mount must not keep the process alive
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match outcome {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
