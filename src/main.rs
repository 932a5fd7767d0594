use clap::Parser;
use harpin_upload::cli::{render_error, render_summary, run, Cli};
use harpin_upload_core::error::{EXIT_SUCCESS, EXIT_SYSTEM_ERROR, EXIT_USER_ERROR};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment; variables already set take precedence.
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USER_ERROR)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };

    harpin_upload::logging::init("info");
    install_panic_hook();
    tracing::info!("CLI arguments parsed, invoking run");

    tokio::select! {
        result = run(cli) => match result {
            Ok(report) => {
                println!("{}", render_summary(&report));
                tracing::info!("CLI completed successfully");
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                tracing::error!(error = %e, exit_code = e.exit_code(), "CLI exited with error");
                eprintln!("{}", render_error(&e));
                ExitCode::from(e.exit_code())
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::error!("Upload interrupted by user");
            eprintln!("✗ Upload interrupted by user");
            ExitCode::from(EXIT_SYSTEM_ERROR)
        }
    }
}

/// Panics are unexpected failures: log them with a backtrace and exit as a
/// system error rather than with the default panic code.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!(%info, "Unexpected error");
        eprintln!("✗ Unexpected error: {info}\n{backtrace}");
        std::process::exit(i32::from(EXIT_SYSTEM_ERROR));
    }));
}
