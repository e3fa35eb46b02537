mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use rp_core::config::Config;
use rp_core::events::{EventBus, EventPayload};
use rp_engine::{FfmpegEngineFactory, ToolRegistry};
use rp_form::{FormController, ResourceStore, SelectedInput};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

async fn serve(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting reelpress");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    rp_server::start(config, CancellationToken::new()).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelpress=trace,rp_core=trace,rp_engine=trace,rp_form=trace,rp_server=trace,tower_http=debug".to_string()
        } else {
            "reelpress=info,rp_engine=info,rp_form=info,rp_server=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(host, port, cli.config.as_deref()))
        }
        Commands::Run {
            input,
            options_file,
            ext,
            output,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_file(
                &input,
                cli.config.as_deref(),
                options_file.as_deref(),
                ext,
                output,
            ))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelpress {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Drive the form headlessly: select, edit, start, then save the output.
async fn run_file(
    input: &Path,
    config_path: Option<&Path>,
    options_file: Option<&Path>,
    ext: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load_or_default(config_path);

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());

    let tools = Arc::new(ToolRegistry::discover(&config.engine));
    let factory = Arc::new(FfmpegEngineFactory::new(config.engine.clone(), tools));
    let form = FormController::new(
        factory,
        Arc::new(EventBus::default()),
        Arc::new(ResourceStore::new()),
        &config.form,
    );

    form.select_file(Some(SelectedInput::new(name, data)))?;
    if let Some(path) = options_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read options file {}", path.display()))?;
        form.edit_options(text)?;
    }
    if let Some(ext) = ext {
        form.edit_extension(ext)?;
    }

    // The run ends with either OutputReady or RunFailed; print everything before it.
    let mut rx = form.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.payload {
                    EventPayload::LogLine { line, .. } => eprintln!("{line}"),
                    EventPayload::StatusChanged { status, .. } => {
                        tracing::info!("{status}");
                    }
                    EventPayload::OutputReady { .. } | EventPayload::RunFailed { .. } => break,
                    _ => {}
                },
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Skipped {n} log events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = form.start().await;
    let _ = printer.await;
    let resource = result?;

    let target = match output {
        Some(path) => path,
        None => input.with_file_name(&resource.file_name),
    };
    if target == input {
        anyhow::bail!(
            "Output would overwrite the input {}; pass --output",
            input.display()
        );
    }

    tokio::fs::write(&target, &resource.data)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!("{}", form.status());
    println!("Output: {} ({} bytes, {})", target.display(), resource.len(), resource.mime);
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.engine).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable transcoding.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Engine timeout: {}s", config.engine.timeout_secs);
    println!("  Default extension: {}", config.form.default_extension);
    println!("  Upload limit: {} bytes", config.form.max_upload_bytes);

    for warning in config.validate() {
        println!("  ! {warning}");
    }

    Ok(())
}
