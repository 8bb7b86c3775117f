//! Native command line entry point.

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    use clap::Parser;
    use sketchshare_app::Cli;
    use sketchshare_app::file_ops::{ConsoleNotifier, TokioDelay};
    use sketchshare_core::Exporter;
    use std::process::ExitCode;

    env_logger::init();
    log::info!("Starting SketchShare");

    let cli = Cli::parse();
    let setup = cli
        .share_config()
        .and_then(|config| Ok((config, cli.host_bindings()?)));
    let (config, host) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let exporter = Exporter::new(cli.markup(), cli.emitter(), TokioDelay, config);
    match exporter.run(&host, cli.mode, &ConsoleNotifier).await {
        Some(report) => {
            log::info!(
                "Exported {} shapes from {} into {} ({} bytes)",
                report.shape_count,
                report.source,
                report.file_name,
                report.bytes
            );
            ExitCode::SUCCESS
        }
        None => ExitCode::FAILURE,
    }
}

#[cfg(not(all(feature = "native", not(target_arch = "wasm32"))))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
