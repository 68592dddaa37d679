// this_file: crates/dali-bench/src/main.rs

//! dali-bench: drive the face cache and the present protocol end to end.
//!
//! `fonts` activates every font below a directory at a set of sizes through
//! the face manager. `present` runs a headless render loop against an event
//! thread and reports the native calls it made.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dali_adaptor_core::{AdaptorConfig, PositionSize};
use dali_surface::headless::{CallLog, HeadlessBackend, HeadlessGraphics};
use dali_surface::{
    CallbackTrigger, GraphicsCapabilities, PostRenderSync, RenderSurface, ThreadSynchronization,
    TriggerEvent,
};
use dali_text::{variations_hash, FontFaceManager, FontFileCache, SkrifaLibrary, VariationsMap};
use walkdir::WalkDir;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "otc"];

/// DALi adaptor exerciser
#[derive(Parser)]
#[command(name = "dali-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and activate every font below a directory
    Fonts {
        /// Directory to scan for font files
        dir: PathBuf,

        /// Point sizes to activate (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "12,14,16,12")]
        sizes: Vec<u32>,

        /// Face-size cache capacity (overrides DALI_FACE_SIZE_CACHE_MAX)
        #[arg(long)]
        cache: Option<usize>,

        /// Variation settings (e.g., "wght=700,wdth=100")
        #[arg(long)]
        variations: Option<String>,

        /// Read font files into memory before loading them
        #[arg(long)]
        preload: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run a headless present loop against an event thread
    Present {
        #[arg(long, value_enum, default_value_t = SurfaceKind::Pixmap)]
        surface: SurfaceKind,

        #[arg(long, default_value_t = 600)]
        frames: usize,

        #[arg(long, default_value_t = 800)]
        width: u32,

        #[arg(long, default_value_t = 600)]
        height: u32,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print version information
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SurfaceKind {
    Window,
    Pixmap,
    Native,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fonts {
            dir,
            sizes,
            cache,
            variations,
            preload,
            verbose,
        } => {
            init_logger(verbose);
            let variations = variations.as_deref().map(parse_variations).transpose()?;
            run_fonts(&dir, &sizes, cache, variations.as_ref(), preload)?;
        }

        Commands::Present {
            surface,
            frames,
            width,
            height,
            verbose,
        } => {
            init_logger(verbose);
            run_present(surface, frames, width, height)?;
        }

        Commands::Version => {
            println!("dali-bench {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Initialize logging based on verbosity flag.
fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Parse "tag=value" pairs separated by commas.
fn parse_variations(settings: &str) -> Result<VariationsMap> {
    let mut map = VariationsMap::new();
    for pair in settings.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (tag, value) = pair
            .split_once('=')
            .with_context(|| format!("Variation {:?} is not tag=value", pair))?;
        let tag = tag.trim();
        if tag.len() != 4 {
            anyhow::bail!("Variation tag {:?} must have 4 characters", tag);
        }
        let value: f32 = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for variation {}", tag))?;
        map.insert(tag.to_string(), value);
    }
    Ok(map)
}

fn font_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FONT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn run_fonts(
    dir: &Path,
    sizes: &[u32],
    cache: Option<usize>,
    variations: Option<&VariationsMap>,
    preload: bool,
) -> Result<()> {
    let mut config = AdaptorConfig::from_env();
    if let Some(cache) = cache {
        config.face_size_cache_max = cache;
    }

    let files = font_files(dir);
    if files.is_empty() {
        anyhow::bail!("No font files found in {}", dir.display());
    }

    let mut manager = FontFaceManager::from_config(SkrifaLibrary::new(), &config);
    let file_cache = Arc::new(FontFileCache::new());
    if preload {
        manager.set_font_file_manager(&file_cache);
    }

    let hash = variations_hash(variations);
    let start = Instant::now();
    let mut failures = 0usize;

    for file in &files {
        let path = file.to_string_lossy();
        if preload {
            if let Err(err) = file_cache.preload(&path) {
                log::warn!("Preload failed for {}: {}", path, err);
            }
        }

        let face = match manager.load_face(&path, 0) {
            Ok(face) => face,
            Err(err) => {
                log::warn!("Skipping {}: {}", path, err);
                failures += 1;
                continue;
            }
        };
        manager.reference_face(&path);

        let built = manager.build_variations(&face, variations);
        let bitmap = manager.is_bitmap_font(&face);

        for &points in sizes {
            let requested = points.saturating_mul(64);
            let result = if bitmap {
                match manager.find_fixed_size_index(&face, requested) {
                    Some(index) => manager.select_fixed_size(&face, requested, index),
                    None => continue,
                }
            } else {
                manager.activate_face(&face, requested, hash, &built.freetype_coords)
            };

            match result {
                Ok(()) => {
                    if let Some(metrics) = face.native().metrics() {
                        println!(
                            "{}\t{}pt\tppem {:.1}\tascent {:.2}\tdescent {:.2}",
                            path, points, metrics.y_ppem, metrics.ascent, metrics.descent
                        );
                    }
                }
                Err(err) => {
                    log::warn!("{} at {}pt: {}", path, points, err);
                    failures += 1;
                }
            }
        }

        manager.release_face(&path);
    }

    let reclaimed = manager.reclaim_released_faces();
    let stats = manager.stats();
    eprintln!(
        "{} fonts in {:.2?}: {} shortcuts, {} hits, {} misses, {} evictions, {} failures",
        files.len(),
        start.elapsed(),
        stats.shortcuts,
        stats.hits,
        stats.misses,
        stats.evictions,
        failures
    );
    eprintln!(
        "{} faces loaded, {} reclaimed, {} sizes resident (capacity {})",
        stats.faces_loaded,
        reclaimed,
        manager.cached_size_count(),
        manager.size_cache_capacity()
    );
    Ok(())
}

fn run_present(kind: SurfaceKind, frames: usize, width: u32, height: u32) -> Result<()> {
    let config = AdaptorConfig::from_env();
    let log = CallLog::new();
    let graphics = Arc::new(HeadlessGraphics::new(
        Arc::clone(&log),
        GraphicsCapabilities {
            window_rotation: true,
        },
    ));
    let backend = match kind {
        SurfaceKind::Window => HeadlessBackend::window(Arc::clone(&log)),
        SurfaceKind::Pixmap => HeadlessBackend::pixmap(Arc::clone(&log)),
        SurfaceKind::Native => HeadlessBackend::native_queue(Arc::clone(&log)),
    };

    let geometry = PositionSize::new(0.0, 0.0, width as f32, height as f32);
    let mut surface = RenderSurface::new(backend, geometry, false, &config)
        .context("Failed to create render surface")?;
    surface
        .initialize_graphics(graphics)
        .context("Failed to initialize graphics")?;
    surface
        .create_surface()
        .context("Failed to create graphics surface")?;

    let sync = Arc::new(PostRenderSync::new());
    surface.set_thread_synchronization(&sync);

    let (sender, receiver) = mpsc::channel::<()>();
    let notification: Arc<dyn TriggerEvent> = Arc::new(CallbackTrigger::new(move || {
        let _ = sender.send(());
    }));
    surface.set_render_notification(Some(notification));

    let event_thread = {
        let consumer = surface.consumer();
        let sync = Arc::clone(&sync);
        thread::spawn(move || {
            let mut consumed = 0usize;
            while receiver.recv().is_ok() {
                log::trace!(
                    "Frame ready: surface {:?}, drawable {:?}",
                    consumer.current_surface(),
                    consumer.current_drawable()
                );
                consumed += 1;
                sync.post_render_complete();
            }
            consumed
        })
    };

    let start = Instant::now();
    let mut skipped = 0usize;
    for _ in 0..frames {
        if !surface.pre_render(false) {
            skipped += 1;
            continue;
        }
        surface.post_render(false, false).context("Present failed")?;
    }
    surface.stop_render();
    let elapsed = start.elapsed();

    surface.destroy_surface().context("Failed to destroy surface")?;
    drop(surface);
    sync.stop();
    let consumed = event_thread
        .join()
        .map_err(|_| anyhow::anyhow!("Event thread panicked"))?;

    eprintln!(
        "{:?}: {} frames in {:.2?} ({} skipped, {} consumed by the event thread)",
        kind, frames, elapsed, skipped, consumed
    );
    eprintln!(
        "swap_buffers {}, make_current {}, present {}, post_damage {}",
        log.count("swap_buffers"),
        log.count("make_current"),
        log.count("present"),
        log.count("post_damage")
    );
    Ok(())
}
