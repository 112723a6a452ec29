use clap::Parser;
use image_archive::config::{self, GalleryConfig, Layout};
use image_archive::dispatch::Dispatcher;
use image_archive::imaging::RustBackend;
use image_archive::walk::{TreeWalker, WalkEvent};
use image_archive::watch::{FsWatcher, Shutdown, Watcher, WatcherOptions};
use image_archive::{output, overview};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

fn version_string() -> &'static str {
    if env!("IMAGE_ARCHIVE_RELEASE") == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("IMAGE_ARCHIVE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "image-archive")]
#[command(about = "Keep a static HTML gallery in sync with a directory of images")]
#[command(long_about = "\
Keep a static HTML gallery in sync with a directory of images

Every directory gets an index.html listing its subfolders and images, and
every image a thumbnail in a .thumbs/ folder next to it:

  photos/
  ├── image-archive.toml   # Optional config (see --gen-config)
  ├── index.html           # Generated: links holiday/, shows cover.jpg
  ├── gallery.html         # Generated with --overview: whole tree on one page
  ├── .thumbs/
  │   └── cover.jpg        # Generated once, kept while it exists
  ├── cover.jpg
  └── holiday/
      ├── index.html
      ├── .thumbs/
      └── beach.png

With --watch the initial pass is followed by watching the tree: each change
rebuilds only the directory it touched.")]
#[command(version = version_string())]
struct Cli {
    /// Gallery root directory
    #[arg(required_unless_present = "gen_config")]
    dir: Option<PathBuf>,

    /// Link full images instead of generating thumbnails
    #[arg(long)]
    no_thumbs: bool,

    /// Keep watching the tree and rebuild changed directories
    #[arg(long)]
    watch: bool,

    /// Also write a single-page overview of the whole tree
    #[arg(long)]
    overview: bool,

    /// Config file (default: image-archive.toml in the gallery root)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print a stock image-archive.toml with all options documented
    #[arg(long)]
    gen_config: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let dir = cli.dir.ok_or("missing gallery directory")?;
    let root = std::path::absolute(&dir)?;
    if !root.is_dir() {
        return Err(format!("{} is not a directory", root.display()).into());
    }

    let mut gallery_config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(&root)?,
    };
    if cli.no_thumbs {
        gallery_config.thumbnails.enabled = false;
    }
    let layout = gallery_config.layout();
    init_thread_pool(&gallery_config.processing);

    println!("==> Indexing {}", root.display());
    let (tx, printer) = spawn_printer(&root, &layout);
    let walker = TreeWalker::new(RustBackend::new(), layout.clone()).with_events(tx);
    let result = walker.walk(&root);
    drop(walker);
    join_printer(printer)?;
    for line in output::format_walk_summary(&result?) {
        println!("{line}");
    }

    if cli.overview {
        let path = overview::write_overview(&root, &layout, &gallery_config.index)?;
        println!("Overview \u{2192} {}", path.display());
    }

    if cli.watch {
        watch(&root, &gallery_config, layout, cli.overview)?;
    }

    Ok(())
}

/// Watch until the event queue closes, dispatching one rebuild per event.
fn watch(
    root: &Path,
    gallery_config: &GalleryConfig,
    layout: Layout,
    with_overview: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Shutdown::new();
    let mut watcher = FsWatcher::new(WatcherOptions::from_config(root, gallery_config))?;
    let events = watcher.start(&shutdown)?;
    println!(
        "{}",
        output::format_watch_started(watcher.root(), gallery_config.watch.effective_capacity())
    );

    let (tx, printer) = spawn_printer(watcher.root(), &layout);
    let walker = TreeWalker::new(RustBackend::new(), layout).with_events(tx);
    let mut dispatcher = Dispatcher::new(watcher.root(), walker);
    if with_overview {
        dispatcher = dispatcher.with_overview(gallery_config.index.clone());
    }

    let stats = dispatcher.run(&events, &shutdown);
    shutdown.trigger();
    drop(dispatcher);
    watcher.stop()?;
    join_printer(printer)?;
    println!("{}", output::format_dispatch_stats(&stats));
    Ok(())
}

/// Print walk events on a dedicated thread until every sender is dropped.
fn spawn_printer(root: &Path, layout: &Layout) -> (Sender<WalkEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let root = root.to_path_buf();
    let index_file = layout.index_file.clone();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_walk_event(&event, &root, &index_file) {
                println!("{line}");
            }
        }
    });
    (tx, printer)
}

fn join_printer(printer: JoinHandle<()>) -> Result<(), Box<dyn std::error::Error>> {
    printer.join().map_err(|_| "output thread panicked")?;
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
