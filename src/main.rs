mod app;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph payload JSON with `nodes` and `edges`. A bundled sample is shown
    /// when omitted.
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Settings JSON overriding the default physics and colors.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Path query JSON highlighted once the graph is loaded.
    #[arg(long)]
    path_query: Option<PathBuf>,

    /// Seed for path sampling, for reproducible highlights.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kg_lens=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let request = app::LoadRequest {
        graph: args.graph,
        settings: args.settings,
        path_query: args.path_query,
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "kg-lens",
        options,
        Box::new(move |cc| Ok(Box::new(app::KgLensApp::new(cc, request, args.seed)))),
    )
}
