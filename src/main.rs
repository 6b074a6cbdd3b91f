//! pagepilot - optimize an HTML file offline
//!
//! Loads the page, runs every enabled optimization, fires the load event and
//! prints the rewritten markup. Metrics go to stderr.

use pagepilot::network::HttpBeacon;
use pagepilot::{Config, ConfigPatch, Host, Optimizer, Page, PageError, PageEvent, NAME, VERSION};
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use std::time::Duration;
use url::Url;

const USAGE: &str = "usage: pagepilot [--url URL] [--viewport WxH] [--config JSON] [--critical-css] [--debug] FILE";

#[derive(Debug, Default)]
struct Options {
    file: String,
    url: Option<String>,
    viewport: Option<(f64, f64)>,
    config: ConfigPatch,
    critical_css: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut file = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", name))
        };
        match arg.as_str() {
            "--url" => options.url = Some(value("--url")?),
            "--viewport" => {
                let raw = value("--viewport")?;
                options.viewport =
                    Some(parse_viewport(&raw).ok_or_else(|| format!("bad viewport '{}'", raw))?);
            }
            "--config" => {
                let raw = value("--config")?;
                let patch = ConfigPatch::from_json(&raw).map_err(|e| e.to_string())?;
                options.config = ConfigPatch {
                    debug: options.config.debug.or(patch.debug),
                    ..patch
                };
            }
            "--critical-css" => options.critical_css = true,
            "--debug" => options.config.debug = Some(true),
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            path if file.is_none() => file = Some(path.to_string()),
            extra => return Err(format!("unexpected argument {}", extra)),
        }
    }

    options.file = file.ok_or_else(|| "missing FILE".to_string())?;
    Ok(options)
}

/// `1280x800` into (width, height)
fn parse_viewport(raw: &str) -> Option<(f64, f64)> {
    let (w, h) = raw.split_once(['x', 'X'])?;
    let width = w.trim().parse::<f64>().ok()?;
    let height = h.trim().parse::<f64>().ok()?;
    (width > 0.0 && height > 0.0).then_some((width, height))
}

fn page_url(options: &Options) -> String {
    if let Some(url) = &options.url {
        return url.clone();
    }
    fs::canonicalize(&options.file)
        .ok()
        .and_then(|path| Url::from_file_path(path).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| "http://localhost/".to_string())
}

fn run(options: Options) -> Result<(), PageError> {
    let html = fs::read_to_string(Path::new(&options.file))?;

    let mut builder = Page::builder(&page_url(&options), &html);
    if let Some((width, height)) = options.viewport {
        builder = builder.viewport(width, height);
    }

    // Beacons need a runtime to be spawned on; it gets a moment to flush
    // before exit.
    let runtime = if Config::with_patch(&options.config).report_endpoint().is_some() {
        let runtime = tokio::runtime::Runtime::new()?;
        builder = builder.transport(Box::new(HttpBeacon::new(runtime.handle().clone())));
        Some(runtime)
    } else {
        None
    };

    let mut optimizer = Optimizer::new(builder.build()?, options.config);
    optimizer.init(None);
    optimizer.dispatch(PageEvent::Load);
    if options.critical_css {
        optimizer.apply_critical_css();
    }

    let metrics = optimizer.get_metrics();
    for message in optimizer.log_messages() {
        eprintln!("[{}] {}", message.level.as_str(), message.message);
    }
    eprintln!(
        "images optimized: {}, resources saved: {}, load time: {:.2}ms",
        metrics.images_optimized, metrics.resources_saved, metrics.load_time
    );

    println!("{}", optimizer.host().document().to_html());
    if let Some(runtime) = runtime {
        runtime.shutdown_timeout(Duration::from_secs(2));
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{} v{}", NAME, VERSION);
        println!("{}", USAGE);
        return;
    }

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}: {}", NAME, e);
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    if let Err(e) = run(options) {
        eprintln!("{}: {}", NAME, e);
        process::exit(1);
    }
}
