use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::channel;

use panofetch::PanoError;
use panofetch::bitmap::{DecodedImage, ImageHandler, ImageQuery};
use panofetch::config::{self, Config};
use panofetch::photos::{
    GeoPoint, PageOutcome, PhotoInfoHandler, PhotoSearchHandler, PhotoSizesHandler, SearchPager,
    SearchParams, SortOrder,
};
use panofetch::request::{HttpTransport, Notification, Query, RequestHandler, RequestWorker, Transport};

/// Search, inspect and download equirectangular panoramas
#[derive(Parser, Debug)]
#[command(version, about = "Search, inspect and download equirectangular panoramas")]
struct Args {
    /// Log request activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for panoramas and print one JSON object per result
    Search {
        /// Tags that must all match
        tags: Vec<String>,
        /// Latitude of the search circle center
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude of the search circle center
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
        /// Search circle radius in kilometers
        #[arg(long, default_value_t = 5.0)]
        radius: f64,
        /// Newest uploads first instead of most interesting
        #[arg(long)]
        recent: bool,
        /// Also offer panoramas without a high resolution original
        #[arg(long)]
        low_res: bool,
    },
    /// Print the description of a photo as JSON
    Info { photo_id: String },
    /// Print the available renditions of a photo as JSON
    Sizes { photo_id: String },
    /// Download and decode an image, then save it
    Fetch {
        url: String,
        /// Output file; the format follows the extension
        #[arg(short, long)]
        output: PathBuf,
        /// Buffer the whole body before decoding
        #[arg(long)]
        no_stream: bool,
        /// Scale down so the longest side fits
        #[arg(long)]
        max_dimension: Option<u32>,
        /// Reject images that are not 2:1 equirectangular panoramas
        #[arg(long)]
        panorama: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(args.verbose);

    let config_result = config::load_config();
    if let Some(warning) = &config_result.warning {
        eprintln!("Warning: {}", warning);
    }
    let config = config_result.config;

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config.http)?);

    match args.command {
        Command::Search {
            tags,
            lat,
            lon,
            radius,
            recent,
            low_res,
        } => {
            let mut params = SearchParams::new(tags);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                params = params.near(GeoPoint::new(lat, lon), radius);
            }
            if recent {
                params = params.sort(SortOrder::DatePosted);
            }
            let mut config = config;
            config.photos.include_low_res |= low_res;
            search(&config, transport, params)?;
        }
        Command::Info { photo_id } => {
            require_api_key(&config)?;
            let worker =
                RequestWorker::spawn("photo-info", PhotoInfoHandler::from_config(&config.photos), transport)?;
            let info = run_query(&worker, photo_id, "info")?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            worker.shutdown();
        }
        Command::Sizes { photo_id } => {
            require_api_key(&config)?;
            let worker =
                RequestWorker::spawn("photo-sizes", PhotoSizesHandler::from_config(&config.photos), transport)?;
            let sizes = run_query(&worker, photo_id, "sizes")?;
            println!("{}", serde_json::to_string_pretty(&sizes)?);
            worker.shutdown();
        }
        Command::Fetch {
            url,
            output,
            no_stream,
            max_dimension,
            panorama,
        } => {
            let mut image_config = config.image;
            if no_stream {
                image_config.streaming = false;
            }
            if max_dimension.is_some() {
                image_config.max_dimension = max_dimension;
            }

            let mut handler = ImageHandler::from_config(&image_config);
            if panorama {
                let options = (*handler.options()).equirectangular();
                handler = handler.with_options(options);
            }

            let worker = RequestWorker::spawn("image", handler, transport)?;
            let decoded = run_query(&worker, ImageQuery::new(url), "download")?;
            worker.shutdown();
            save_image(&decoded, &output)?;
        }
    }

    Ok(())
}

/// Initialize stderr logging; `--verbose` enables debug output
fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }

    builder
        .format(|buf, record| {
            use std::time::SystemTime;
            let datetime: chrono::DateTime<chrono::Local> = SystemTime::now().into();
            writeln!(
                buf,
                "[{}] [{}] [{}] {}",
                datetime.format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                std::thread::current().name().unwrap_or("-"),
                record.args()
            )
        })
        .init();
}

fn require_api_key(config: &Config) -> Result<(), PanoError> {
    match config.photos.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(PanoError::MissingApiKey(
            config::get_config_path().display().to_string(),
        )),
    }
}

/// Enqueue one query and wait for its terminal notification
///
/// Progress is drawn on stderr while waiting.
fn run_query<H: RequestHandler>(
    worker: &RequestWorker<H>,
    params: H::Params,
    label: &str,
) -> Result<H::Output, PanoError> {
    let (tx, rx) = channel();
    let id = worker.enqueue(Query::new(params, tx));
    log::debug!("Enqueued {} query {} on {}", label, id, worker.name());

    let mut drew_progress = false;
    for notification in rx.iter() {
        match notification {
            Notification::Progress { percent, .. } => {
                eprint!("\r{}: {:>3}%", label, percent);
                drew_progress = true;
            }
            Notification::Indeterminate { .. } => {
                eprint!("\r{}: receiving...", label);
                drew_progress = true;
            }
            Notification::Finished(response) | Notification::Failed(response) => {
                if drew_progress {
                    eprintln!();
                }
                return Ok(response.into_result()?);
            }
        }
    }

    Err(PanoError::WorkerGone)
}

fn search(config: &Config, transport: Arc<dyn Transport>, params: SearchParams) -> Result<(), PanoError> {
    require_api_key(config)?;

    let worker = RequestWorker::spawn(
        "photo-search",
        PhotoSearchHandler::from_config(&config.photos),
        transport,
    )?;
    let mut pager = SearchPager::new(params, &config.photos);
    let mut next = pager.start();

    loop {
        let label = format!("page {}", next.page);
        let photos = run_query(&worker, next, &label)?;
        let result = pager.process(photos);

        for photo in &result.accepted {
            match serde_json::to_string(photo) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Failed to serialize photo {}: {}", photo.id, e),
            }
        }

        match result.outcome {
            PageOutcome::More(params) => next = params,
            PageOutcome::Done { found } => {
                eprintln!("Found {} panoramas", found);
                break;
            }
            PageOutcome::Exhausted => {
                eprintln!("No panoramas found");
                break;
            }
        }
    }

    worker.shutdown();
    Ok(())
}

fn save_image(decoded: &DecodedImage, output: &Path) -> Result<(), PanoError> {
    decoded.image.save(output)?;
    eprintln!(
        "Saved {}x{} image to {}{}",
        decoded.width(),
        decoded.height(),
        output.display(),
        if decoded.was_scaled() {
            format!(
                " (scaled from {}x{})",
                decoded.source_width, decoded.source_height
            )
        } else {
            String::new()
        }
    );
    Ok(())
}
