use clap::Parser;
use shp2json::{ExportError, ExportOptions, ExportSession, GeometryPolicy, Query};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Export the features of a shapefile to a JSON array"
)]
struct Args {
    /// Shapefile (.shp) to export.
    #[arg(short, long)]
    file: Option<String>,

    /// Destination JSON file. Defaults to the shapefile path with a .json extension.
    #[arg(short, long)]
    output: Option<String>,

    /// Export at most this many features.
    #[arg(long)]
    limit: Option<usize>,

    /// Leave out features whose geometry has no polygon ring instead of failing.
    #[arg(long)]
    skip_invalid_geometry: bool,

    /// Indent the JSON output.
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn options(&self) -> ExportOptions {
        ExportOptions {
            query: Query {
                max_features: self.limit,
            },
            on_invalid_geometry: if self.skip_invalid_geometry {
                GeometryPolicy::Skip
            } else {
                GeometryPolicy::Abort
            },
            pretty: self.pretty,
        }
    }
}

fn try_main(args: Args) -> anyhow::Result<()> {
    let mut session = ExportSession::new(args.options());
    if let Some(file) = &args.file {
        log::info!("Selected shapefile {}", file);
        session.select_source(file);
    }

    let destination = match (&args.output, session.default_destination()) {
        (Some(output), _) => output.into(),
        (None, Some(default)) => default,
        (None, None) => return Err(ExportError::NoSourceSelected.into()),
    };
    let summary = session.export_to(&destination)?;
    println!(
        "Exported {} features to {}",
        summary.records,
        summary.destination.display()
    );
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = try_main(args) {
        if let Some(ExportError::NoSourceSelected) = e.downcast_ref::<ExportError>() {
            eprintln!("Nothing to export: {}. Pass a shapefile with --file.", e);
            std::process::exit(2)
        }
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
