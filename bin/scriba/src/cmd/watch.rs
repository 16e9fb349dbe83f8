//! Watch command - development server with live reload

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use color_eyre::eyre::{Result, WrapErr};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind};
use scriba_core::Config;
use scriba_generator::{BuildStats, Builder};
use tokio::{net::TcpListener, sync::mpsc};

use super::print_config_warnings;
use crate::{
    server::{ReloadMessage, ServerState, create_router, inject_livereload},
    site_root,
};

/// Debounce interval for file changes.
const DEBOUNCE_MS: u64 = 200;

/// Run the watch command.
///
/// Builds the site with drafts, serves the output and rebuilds on every change.
pub async fn run(config_path: &Path, port: u16, open_browser: bool) -> Result<()> {
    tracing::info!(?config_path, port, "Starting watch mode");

    let config = Config::load(config_path).wrap_err("Failed to load configuration")?;
    print_config_warnings(&config);

    let root = site_root(config_path);
    let output_dir = root.join(&config.build.output_dir);

    tracing::info!("Running initial build...");
    let stats = rebuild(config_path)?;
    print_build_stats(&stats);

    let state = Arc::new(ServerState::new());

    let (tx, mut rx) = mpsc::channel::<ReloadMessage>(16);
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res
                && matches!(
                    event.kind,
                    EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_))
                        | EventKind::Create(_)
                        | EventKind::Remove(_)
                )
            {
                let _ = tx.blocking_send(classify(&event.paths));
            }
        },
        notify::Config::default(),
    )
    .wrap_err("Failed to create file watcher")?;

    for path in watched_paths(config_path, &config) {
        if !path.exists() {
            continue;
        }
        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&path, mode)
            .wrap_err_with(|| format!("Failed to watch {}", path.display()))?;
        tracing::debug!(path = %path.display(), "watching");
    }

    let rebuild_state = state.clone();
    let rebuild_config = config_path.to_path_buf();

    tokio::spawn(async move {
        let mut last_rebuild = Instant::now();

        while let Some(message) = rx.recv().await {
            // Debounce: wait out the window, then fold in whatever arrived.
            let delay = debounce_delay(last_rebuild.elapsed());
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let message = drain_pending(&mut rx, message);

            println!();
            println!("  File change detected, rebuilding...");

            let config_path = rebuild_config.clone();
            match tokio::task::spawn_blocking(move || rebuild(&config_path)).await {
                Ok(Ok(stats)) => {
                    println!(
                        "  ✓ Rebuilt {} posts and {} pages in {}ms",
                        stats.posts, stats.pages, stats.duration_ms
                    );
                    rebuild_state.notify(message);
                }
                Ok(Err(e)) => {
                    tracing::error!("Rebuild failed: {e:#}");
                    eprintln!("  ✗ Rebuild failed: {e:#}");
                }
                Err(e) => tracing::error!("Rebuild task panicked: {e}"),
            }

            last_rebuild = Instant::now();
        }
    });

    let app = create_router(&output_dir, state);
    let addr = format!("127.0.0.1:{port}");

    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    println!();
    println!("  Dev server running at http://{addr}");
    println!("  Press Ctrl+C to stop");
    println!();

    if open_browser && let Err(e) = open::that(format!("http://{addr}")) {
        tracing::warn!("Failed to open browser: {e}");
    }

    // Keep watcher alive
    let _watcher = watcher;

    axum::serve(listener, app).await.wrap_err("Server error")?;

    Ok(())
}

/// Reload the configuration, build with drafts and inject the live reload script.
fn rebuild(config_path: &Path) -> Result<BuildStats> {
    let mut config = Config::load(config_path).wrap_err("Failed to load configuration")?;
    config.build.drafts = true;

    let builder = Builder::from_site_root(config, &site_root(config_path));
    let stats = builder.build().wrap_err("Build failed")?;
    inject_livereload_into_html(builder.output_dir())?;

    tracing::debug!(?stats, "Build completed");
    Ok(stats)
}

/// Time left before the next rebuild may start.
fn debounce_delay(since_last_rebuild: Duration) -> Duration {
    Duration::from_millis(DEBOUNCE_MS).saturating_sub(since_last_rebuild)
}

/// Fold queued change events into one message. Any non-CSS change forces a
/// full reload.
fn drain_pending(
    rx: &mut mpsc::Receiver<ReloadMessage>,
    mut message: ReloadMessage,
) -> ReloadMessage {
    while let Ok(next) = rx.try_recv() {
        if next == ReloadMessage::Reload {
            message = ReloadMessage::Reload;
        }
    }
    message
}

/// Config file plus every input directory of the site.
fn watched_paths(config_path: &Path, config: &Config) -> Vec<PathBuf> {
    let root = site_root(config_path);
    vec![
        config_path.to_path_buf(),
        root.join(&config.build.content_dir),
        root.join(&config.build.authors_dir),
        root.join(&config.build.static_dir),
        root.join("layouts"),
    ]
}

/// Stylesheet-only changes reload CSS in place.
fn classify(paths: &[PathBuf]) -> ReloadMessage {
    let css_only = !paths.is_empty()
        && paths
            .iter()
            .all(|p| p.extension().is_some_and(|ext| ext == "css"));
    if css_only {
        ReloadMessage::CssReload
    } else {
        ReloadMessage::Reload
    }
}

/// Print build statistics in a user-friendly format.
fn print_build_stats(stats: &BuildStats) {
    println!();
    println!("  Build Statistics:");
    println!("  ─────────────────────────────────");
    println!("  Posts:        {:>6}", stats.posts);
    println!("  Pages:        {:>6}", stats.pages);
    println!("  Tag pages:    {:>6}", stats.tag_pages);
    println!("  Feeds:        {:>6}", stats.feeds);
    println!("  Assets:       {:>6}", stats.assets);
    println!("  ─────────────────────────────────");
    println!("  Duration:     {:>6}ms", stats.duration_ms);
    println!();
}

/// Inject the live reload script into all HTML files in the output directory.
fn inject_livereload_into_html(output_dir: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(output_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
    {
        let path = entry.path();
        let content = fs::read_to_string(path)?;
        if let Some(modified) = inject_livereload(&content) {
            fs::write(path, modified)?;
        }
    }

    Ok(())
}
