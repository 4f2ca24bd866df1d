//! Conversation tree viewer
//!
//! Opens a JSON tree snapshot (nested or flat form) in a native window and
//! reloads it whenever the file changes on disk.
//!
//! Usage:
//!   cargo run --bin convo-tree-viewer -- demos/branching_conversation.json
//!   RUST_LOG=convo_tree=debug cargo run --bin convo-tree-viewer -- snapshot.json

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use clap::Parser;
use convo_tree::{global_config, ConversationTreeWidget, TreeSettings, TreeSnapshot};

/// How often the snapshot file is checked for changes
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "convo-tree-viewer")]
#[command(about = "Visualize a branching multi-agent conversation tree")]
struct Args {
    /// JSON snapshot file to display (reloaded when it changes)
    snapshot: PathBuf,

    /// Settings file (default: $CONVO_TREE_CONFIG_DIR/tree_settings.yaml)
    #[arg(long, short = 'c', env = "CONVO_TREE_SETTINGS")]
    config: Option<PathBuf>,
}

struct ViewerApp {
    tree: ConversationTreeWidget,
    snapshot_path: PathBuf,
    last_modified: Option<SystemTime>,
    last_poll: Option<f64>,
    status: String,
}

impl ViewerApp {
    fn new(settings: TreeSettings, snapshot_path: PathBuf) -> Self {
        let mut app = Self {
            tree: ConversationTreeWidget::with_settings(settings),
            snapshot_path,
            last_modified: None,
            last_poll: None,
            status: String::new(),
        };
        app.reload();
        app
    }

    fn load_snapshot(&mut self) -> anyhow::Result<usize> {
        let json = std::fs::read_to_string(&self.snapshot_path)
            .with_context(|| format!("Failed to read {}", self.snapshot_path.display()))?;
        let snapshot = TreeSnapshot::from_json(&json)?;
        let summary = self.tree.set_snapshot(&snapshot)?;
        Ok(summary.node_count)
    }

    fn reload(&mut self) {
        self.last_modified = modified_time(&self.snapshot_path);
        match self.load_snapshot() {
            Ok(count) => {
                tracing::info!(path = %self.snapshot_path.display(), nodes = count, "Loaded snapshot");
                self.status = format!("{} messages", count);
            }
            Err(e) => {
                tracing::warn!("Snapshot rejected: {:#}", e);
                self.status = format!("Reload failed: {:#}", e);
            }
        }
    }

    /// Reload when the file's mtime moves
    fn poll_file(&mut self, now: f64) {
        if self
            .last_poll
            .is_some_and(|t| now - t < POLL_INTERVAL.as_secs_f64())
        {
            return;
        }
        self.last_poll = Some(now);

        let modified = modified_time(&self.snapshot_path);
        if modified.is_some() && modified != self.last_modified {
            tracing::debug!(path = %self.snapshot_path.display(), "Snapshot file changed");
            self.reload();
        }
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Conversation");
            ui.separator();

            if ui.button("⌖ Recenter").clicked() {
                self.tree.recenter();
            }
            if ui.button("＋").on_hover_text("Zoom in").clicked() {
                self.tree.zoom_in();
            }
            if ui.button("－").on_hover_text("Zoom out").clicked() {
                self.tree.zoom_out();
            }
            if ui.button("Reset").on_hover_text("Reset zoom").clicked() {
                self.tree.reset_zoom();
            }

            ui.separator();
            let state = self.tree.state();
            if let Some(center) = state.center_node_id {
                ui.label(format!("Focus: {}", center));
            }
            ui.label(format!("{} on active path", state.active_node_ids.len()));

            if !self.tree.engine().is_focus_in_view()
                && ui
                    .button(egui::RichText::new("⬇ Jump to latest").strong())
                    .clicked()
            {
                self.tree.recenter();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(&self.status);
            });
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_file(ctx.input(|i| i.time));

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.render_toolbar(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.tree.ui(ui);
        });

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

fn modified_time(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => TreeSettings::from_file(path)?,
        None => global_config().clone(),
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Conversation Tree")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([480.0, 320.0]),
        ..Default::default()
    };

    let snapshot_path = args.snapshot;
    let app_creator = move |_cc: &eframe::CreationContext<'_>| {
        Ok(Box::new(ViewerApp::new(settings, snapshot_path)) as Box<dyn eframe::App>)
    };

    eframe::run_native("Conversation Tree", native_options, Box::new(app_creator))
        .map_err(|e| anyhow::anyhow!("Viewer error: {}", e))?;

    tracing::info!("Viewer shut down cleanly");
    Ok(())
}
