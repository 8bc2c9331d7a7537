mod routes;
mod viewer_page;

use std::path::PathBuf;
use std::process;

use actix_web::{web, App, HttpServer};
use clap::Parser;

use facedoor_core::config::{ControllerConfig, ServerMode};
use facedoor_core::lifecycle::component_factory::build_components;
use facedoor_core::lifecycle::door_controller::DoorController;
use facedoor_core::lifecycle::session_slot::SessionSlot;
use facedoor_core::pipeline::pipeline_logger::LogPipelineLogger;

/// Face-gated door controller with a live MJPEG viewer.
#[derive(Parser)]
#[command(name = "facedoor")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON by extension); FACEDOOR_*
    /// variables override it.
    #[arg(long, env = "FACEDOOR_CONFIG")]
    config: Option<PathBuf>,

    /// Address the viewer listens on, e.g. 0.0.0.0:8080.
    #[arg(long)]
    bind: Option<String>,

    /// Camera device, stub://<name> or file://<image>.
    #[arg(long)]
    camera: Option<String>,

    /// Annotate only; never open the serial port.
    #[arg(long)]
    monitor: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = ControllerConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(camera) = cli.camera {
        config.camera.device = camera;
    }
    if cli.monitor {
        config.server.mode = ServerMode::Monitor;
    }
    config.validate()?;

    let components = build_components(&config)?;
    let controller = DoorController::start(
        components,
        config.server.mode.stream_mode(),
        Box::new(LogPipelineLogger::default()),
    )?;
    let slot = SessionSlot::new(controller);

    log::info!("Serving viewer on http://{}", config.server.bind_address);
    let served = actix_web::rt::System::new().block_on(serve(
        slot.clone(),
        config.server.bind_address.clone(),
    ));

    match slot.take() {
        Some(mut controller) => controller.shutdown(),
        None => log::warn!("Controller still leased at exit; released on drop"),
    }

    served?;
    Ok(())
}

async fn serve(slot: SessionSlot, bind: String) -> std::io::Result<()> {
    let data = web::Data::new(slot);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind(bind.as_str())?
    .run()
    .await
}
