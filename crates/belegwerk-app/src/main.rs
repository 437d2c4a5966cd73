// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Belegwerk: photograph a document, crop it to its edges, and save it.
//
// Entry point. Initialises logging, loads the capture configuration, and runs
// one capture workflow on the terminal against an image file or the platform
// camera.

mod services;
mod terminal;

use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use belegwerk_bridge::{PlatformBridge, StillImageCamera};
use belegwerk_capture::{CaptureStateMachine, CaptureWorkflow};
use belegwerk_core::error::Result;
use belegwerk_core::human_errors::humanize_error;
use belegwerk_core::{Blob, CaptureConfig, FacingPreference, OutputFormat};
use clap::Parser;

use services::config_store::{load_config, persist_config};
use services::data_dir::default_config_path;

/// Exit status when the user cancels.
const EXIT_CANCELLED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "belegwerk", version, about = "Photograph a document, crop it to its edges, and save it")]
struct Cli {
    /// Use this image file as the camera instead of a live device.
    #[arg(short, long, value_name = "IMAGE")]
    input: Option<PathBuf>,

    /// Where to write the captured document. A .png or .jpg extension picks
    /// the format.
    #[arg(short, long, value_name = "FILE", default_value = "document.jpg")]
    output: PathBuf,

    /// Configuration file (JSON). Defaults to the user configuration
    /// directory.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Title shown above the review prompt.
    #[arg(long, default_value = "Scan document")]
    title: String,

    /// Use the front-facing camera.
    #[arg(long)]
    front: bool,

    /// Accept the first result without prompting.
    #[arg(short = 'y', long)]
    yes: bool,

    /// Save the effective configuration to the configuration file and exit.
    #[arg(long)]
    write_config: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("Belegwerk starting");

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "Capture failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = effective_config(&cli, load_config(&config_path).unwrap_or_default());
    config.validate()?;

    if cli.write_config {
        persist_config(&config_path, &config)?;
        println!("Configuration written to {}", config_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let camera: Box<dyn PlatformBridge> = match &cli.input {
        Some(path) => Box::new(StillImageCamera::open(path)?),
        None => belegwerk_bridge::platform_bridge(),
    };
    let machine = CaptureStateMachine::new(camera, &config);
    tracing::info!(platform = machine.platform_name(), "Camera bridge ready");

    let delivered: Rc<RefCell<Option<Blob>>> = Rc::new(RefCell::new(None));
    let mut workflow = CaptureWorkflow::new(
        cli.title.clone(),
        machine,
        {
            let delivered = Rc::clone(&delivered);
            move |blob| *delivered.borrow_mut() = Some(blob)
        },
        || tracing::info!("Capture cancelled by user"),
    );

    workflow.start()?;
    let stdin = std::io::stdin();
    terminal::review_loop(&mut workflow, stdin.lock(), std::io::stdout(), cli.yes)?;
    drop(workflow);

    let Some(blob) = delivered.borrow_mut().take() else {
        println!("Cancelled; nothing saved.");
        return Ok(ExitCode::from(EXIT_CANCELLED));
    };

    std::fs::write(&cli.output, &blob.bytes)?;
    tracing::info!(path = %cli.output.display(), size = blob.len(), "Document saved");
    println!(
        "Saved {} ({}x{}, {}, {} bytes, sha256 {})",
        cli.output.display(),
        blob.width,
        blob.height,
        if blob.rectified { "cropped" } else { "uncropped" },
        blob.len(),
        blob.sha256
    );
    Ok(ExitCode::SUCCESS)
}

/// Apply command-line overrides on top of the loaded configuration.
fn effective_config(cli: &Cli, mut config: CaptureConfig) -> CaptureConfig {
    if cli.front {
        config.camera.facing = FacingPreference::User;
    }
    if let Some(format) = cli
        .output
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(OutputFormat::from_extension)
    {
        config.encoding.format = format;
    }
    config
}
