//! Viewer application.
//!
//! The root viewport is a small always-on-top control window holding the HUD
//! label; every monitor gets an additional borderless panel viewport. All
//! keyboard input is routed through the declarative bindings in `Config`.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use lru::LruCache;
use tracing::info;

use crate::config::{Action, Config, JumpTarget};
use crate::display::PanelGeometry;
use crate::hud;
use crate::loader::{ImagePipeline, LoadRequest, PreparedImage};
use crate::scanner::{self, ScanResult};

/// One borderless always-on-top window plus the image it currently shows.
struct PanelState {
    geometry: PanelGeometry,
    prepared: Option<Arc<PreparedImage>>,
    /// Status text for this panel's image, overlaid top-left when print
    /// mode is on.
    overlay: String,
    texture: Option<egui::TextureHandle>,
    texture_frame: usize,
    frame_index: usize,
    last_frame_time: Instant,
}

impl PanelState {
    fn new(geometry: PanelGeometry) -> Self {
        Self {
            geometry,
            prepared: None,
            overlay: String::new(),
            texture: None,
            texture_frame: usize::MAX,
            frame_index: 0,
            last_frame_time: Instant::now(),
        }
    }

    /// Replace the displayed image and restart playback from frame 0.
    /// Replacing the state is also what cancels a running animation.
    fn show(&mut self, prepared: Arc<PreparedImage>, overlay: String) {
        self.prepared = Some(prepared);
        self.overlay = overlay;
        self.texture = None;
        self.texture_frame = usize::MAX;
        self.frame_index = 0;
        self.last_frame_time = Instant::now();
    }

    /// Advance animation playback if the current frame's delay elapsed.
    /// Returns how long until the next frame is due, `None` for static images.
    fn update_animation(&mut self) -> Option<Duration> {
        let prepared = self.prepared.clone()?;
        if !prepared.is_animated() {
            return None;
        }

        let delay = Duration::from_millis(prepared.frames[self.frame_index].delay_ms as u64);
        let elapsed = self.last_frame_time.elapsed();
        if elapsed >= delay {
            self.frame_index = (self.frame_index + 1) % prepared.frames.len();
            self.last_frame_time = Instant::now();
            Some(Duration::from_millis(
                prepared.frames[self.frame_index].delay_ms as u64,
            ))
        } else {
            Some(delay - elapsed)
        }
    }
}

/// Index `delta` steps away from `current`, wrapping around `len` items in
/// both directions. `None` when the list is empty.
fn wrap_step(current: usize, delta: i64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some((current as i64 + delta).rem_euclid(len as i64) as usize)
}

/// Absolute jump target inside a list of `len` items.
fn jump_index(target: JumpTarget, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match target {
        JumpTarget::Start => 0,
        JumpTarget::Middle => len / 2,
        JumpTarget::End => len - 1,
    })
}

/// Ticket bookkeeping for in-flight decodes plus the optional keep-memory
/// cache. Only the most recently issued ticket is accepted; everything else
/// is a leftover from an index the user already navigated past.
struct LoadTracker {
    next_ticket: u64,
    awaiting: Option<u64>,
    /// A cached entry keeps whatever rotation it was prepared with.
    cache: Option<LruCache<usize, Arc<PreparedImage>>>,
}

impl LoadTracker {
    fn new(cache_capacity: Option<usize>) -> Self {
        let cache = cache_capacity.map(|capacity| {
            LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
        });
        Self {
            next_ticket: 0,
            awaiting: None,
            cache,
        }
    }

    /// Issue the ticket for a new request; any earlier ticket becomes stale.
    fn issue(&mut self) -> u64 {
        self.next_ticket += 1;
        self.awaiting = Some(self.next_ticket);
        self.next_ticket
    }

    /// Serve `index` from the cache. A hit cancels the pending decode, if
    /// any: the user is already looking at what they asked for.
    fn cached(&mut self, index: usize) -> Option<Arc<PreparedImage>> {
        let entry = self.cache.as_mut()?.get(&index).cloned()?;
        self.awaiting = None;
        Some(entry)
    }

    /// Whether `ticket` is the outcome being waited for; accepting it ends
    /// the wait. Stale tickets return false and their outcomes are dropped.
    fn accept(&mut self, ticket: u64) -> bool {
        if self.awaiting == Some(ticket) {
            self.awaiting = None;
            true
        } else {
            false
        }
    }

    fn store(&mut self, index: usize, prepared: Arc<PreparedImage>) {
        if let Some(cache) = &mut self.cache {
            cache.put(index, prepared);
        }
    }

    fn evict(&mut self, index: usize) {
        if let Some(cache) = &mut self.cache {
            cache.pop(&index);
        }
    }
}

/// Application state
pub struct ViewerApp {
    config: Config,
    /// Scan root; HUD paths are shown relative to it.
    root: PathBuf,
    files: Vec<PathBuf>,
    directory_starts: Vec<usize>,
    current: usize,
    /// Pending background scan; `None` once the result arrived.
    scan_rx: Option<Receiver<ScanResult>>,
    pipeline: ImagePipeline,
    /// In-flight ticket state and the optional keep-memory cache.
    tracker: LoadTracker,
    panels: Vec<PanelState>,
    panels_visible: bool,
    status_text: String,
    error_message: Option<String>,
    /// Whether the status block is overlaid on the panels too.
    print_status: bool,
    should_exit: bool,
}

impl ViewerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        root: PathBuf,
        recurse: bool,
        keep_memory: bool,
        config: Config,
        geometries: Vec<PanelGeometry>,
    ) -> Self {
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::BLACK;
        visuals.panel_fill = egui::Color32::BLACK;
        cc.egui_ctx.set_visuals(visuals);

        let pipeline = ImagePipeline::new(
            geometries.clone(),
            config.resize_filter.to_image_filter(),
            config.gif_resize_filter.to_image_filter(),
            cc.egui_ctx.clone(),
        );
        let scan_rx = scanner::spawn_scan(root.clone(), recurse, Some(cc.egui_ctx.clone()));

        let tracker = LoadTracker::new(keep_memory.then(|| config.cache_capacity));

        let status_text = format!("scanning {} ...", root.display());
        Self {
            config,
            root,
            files: Vec::new(),
            directory_starts: Vec::new(),
            current: 0,
            scan_rx: Some(scan_rx),
            pipeline,
            tracker,
            panels: geometries.into_iter().map(PanelState::new).collect(),
            panels_visible: true,
            status_text,
            error_message: None,
            print_status: false,
            should_exit: false,
        }
    }

    /// Pick up the finished background scan and land on the first image.
    fn poll_scan(&mut self) {
        let Some(rx) = &self.scan_rx else {
            return;
        };
        let Ok(result) = rx.try_recv() else {
            return;
        };

        self.files = result.files;
        self.directory_starts = result.directory_starts;
        self.scan_rx = None;

        if self.files.is_empty() {
            self.status_text = format!("no images under {}", self.root.display());
            return;
        }

        self.current = 0;
        self.show_current();
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let mut actions: Vec<Action> = Vec::new();
        ctx.input(|input| {
            for (binding, action) in &self.config.bindings {
                let (key, ctrl, shift, alt) = binding.parts();
                if input.key_pressed(key)
                    && input.modifiers.ctrl == ctrl
                    && input.modifiers.shift == shift
                    && input.modifiers.alt == alt
                {
                    actions.push(*action);
                }
            }
        });

        for action in actions {
            self.run_action(action);
        }
    }

    fn run_action(&mut self, action: Action) {
        match action {
            Action::Next(n) => self.step(n as i64),
            Action::Previous(n) => self.step(-(n as i64)),
            Action::Jump(target) => self.jump(target),
            Action::NextDirectory => {
                if let Some(start) =
                    scanner::next_directory_start(&self.directory_starts, self.current)
                {
                    self.go_to(start);
                }
            }
            Action::PreviousDirectory => {
                if let Some(start) =
                    scanner::previous_directory_start(&self.directory_starts, self.current)
                {
                    self.go_to(start);
                }
            }
            Action::ShowPanels => self.panels_visible = true,
            Action::HidePanels => self.panels_visible = false,
            Action::Rotate => self.rotate_current(),
            Action::TogglePrint => self.print_status = !self.print_status,
            Action::Exit => self.should_exit = true,
        }
    }

    /// Move by `delta`, wrapping around the list in both directions.
    fn step(&mut self, delta: i64) {
        if let Some(next) = wrap_step(self.current, delta, self.files.len()) {
            self.go_to(next);
        }
    }

    fn jump(&mut self, target: JumpTarget) {
        if let Some(next) = jump_index(target, self.files.len()) {
            self.go_to(next);
        }
    }

    fn go_to(&mut self, index: usize) {
        self.current = index;
        self.show_current();
    }

    /// Display the current index: straight from the cache when possible,
    /// otherwise through the pipeline. A cached entry keeps whatever rotation
    /// it was prepared with.
    fn show_current(&mut self) {
        let Some(path) = self.files.get(self.current).cloned() else {
            return;
        };

        if let Some(prepared) = self.tracker.cached(self.current) {
            self.apply_prepared(prepared);
            return;
        }

        self.request_load(path, 0);
    }

    fn request_load(&mut self, path: PathBuf, angle: u16) {
        let ticket = self.tracker.issue();
        self.pipeline.request(LoadRequest {
            ticket,
            index: self.current,
            path,
            angle,
        });
    }

    /// Rotate the current image by 180°; rotating again flips it back. The
    /// toggle is derived from the angle of whatever is on screen for this
    /// index, so a rotated cache hit flips back correctly too.
    fn rotate_current(&mut self) {
        let Some(path) = self.files.get(self.current).cloned() else {
            return;
        };

        let shown_angle = self
            .panels
            .iter()
            .filter_map(|p| p.prepared.as_ref())
            .find(|prepared| prepared.index == self.current)
            .map(|prepared| prepared.angle)
            .unwrap_or(0);
        let angle = if shown_angle == 180 { 0 } else { 180 };

        self.tracker.evict(self.current);
        self.request_load(path, angle);
    }

    /// Consume finished decodes, dropping anything the user navigated past.
    fn poll_pipeline(&mut self) {
        while let Some(outcome) = self.pipeline.poll() {
            if !self.tracker.accept(outcome.ticket) {
                continue;
            }

            match outcome.result {
                Ok(prepared) => {
                    self.tracker.store(outcome.index, Arc::clone(&prepared));
                    self.apply_prepared(prepared);
                }
                Err(e) => {
                    self.error_message = Some(e.to_string());
                }
            }
        }
    }

    fn apply_prepared(&mut self, prepared: Arc<PreparedImage>) {
        self.error_message = None;
        self.status_text = hud::format_status(
            prepared.index,
            self.files.len(),
            &self.root,
            &prepared.path,
            (prepared.original_width, prepared.original_height),
            prepared.fitted_size(),
        );

        let overlay = self.status_text.clone();

        info!(index = prepared.index, path = %prepared.path.display(), "showing");
        if let Some(panel) = self.panels.get_mut(prepared.panel) {
            panel.show(prepared, overlay);
        }
    }

    /// Advance animated panels and schedule the next repaint for the
    /// soonest-due frame. Playback keeps running while panels are hidden,
    /// so re-showing them resumes the sequence in place.
    fn drive_animations(&mut self, ctx: &egui::Context) {
        let mut next_due: Option<Duration> = None;
        for panel in &mut self.panels {
            if let Some(remaining) = panel.update_animation() {
                next_due = Some(match next_due {
                    Some(due) => due.min(remaining),
                    None => remaining,
                });
            }
        }

        if let Some(due) = next_due {
            ctx.request_repaint_after(due);
        }
    }

    /// HUD label in the control window.
    fn draw_control(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(egui::Color32::BLACK)
                    .inner_margin(egui::Margin::same(5.0)),
            )
            .show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    let (text, color) = match &self.error_message {
                        Some(message) => (message.as_str(), egui::Color32::from_rgb(255, 80, 80)),
                        None => (self.status_text.as_str(), egui::Color32::WHITE),
                    };
                    ui.label(egui::RichText::new(text).monospace().size(16.0).color(color));
                });
            });
    }

    /// One immediate viewport per panel. Skipping them entirely is what
    /// hides the windows; showing them again recreates them on top.
    fn draw_panels(&mut self, ctx: &egui::Context) {
        if !self.panels_visible {
            return;
        }

        let background = egui::Color32::from_rgb(
            self.config.background_rgb[0],
            self.config.background_rgb[1],
            self.config.background_rgb[2],
        );
        let show_overlay = self.print_status;

        for (i, panel) in self.panels.iter_mut().enumerate() {
            let geometry = panel.geometry;
            let builder = egui::ViewportBuilder::default()
                .with_title(format!("mural panel {i}"))
                .with_decorations(false)
                .with_resizable(false)
                .with_taskbar(false)
                .with_always_on_top()
                .with_position(egui::pos2(geometry.left as f32, geometry.top as f32))
                .with_inner_size(egui::vec2(geometry.width as f32, geometry.height as f32));

            ctx.show_viewport_immediate(
                egui::ViewportId::from_hash_of(("panel", i)),
                builder,
                |ctx, _class| {
                    egui::CentralPanel::default()
                        .frame(egui::Frame::none().fill(background))
                        .show(ctx, |ui| {
                            if let Some(prepared) = panel.prepared.clone() {
                                let frame_index = panel.frame_index;
                                if panel.texture.is_none() || panel.texture_frame != frame_index {
                                    let frame = &prepared.frames[frame_index];
                                    let image = egui::ColorImage::from_rgba_unmultiplied(
                                        [frame.width as usize, frame.height as usize],
                                        &frame.pixels,
                                    );
                                    panel.texture = Some(ctx.load_texture(
                                        format!("panel-{i}"),
                                        image,
                                        egui::TextureOptions::LINEAR,
                                    ));
                                    panel.texture_frame = frame_index;
                                }

                                if let Some(texture) = &panel.texture {
                                    let rect = egui::Rect::from_center_size(
                                        ui.max_rect().center(),
                                        texture.size_vec2(),
                                    );
                                    ui.painter().image(
                                        texture.id(),
                                        rect,
                                        egui::Rect::from_min_max(
                                            egui::pos2(0.0, 0.0),
                                            egui::pos2(1.0, 1.0),
                                        ),
                                        egui::Color32::WHITE,
                                    );
                                }
                            }

                            if show_overlay && !panel.overlay.is_empty() {
                                ui.painter().text(
                                    ui.max_rect().min + egui::vec2(10.0, 10.0),
                                    egui::Align2::LEFT_TOP,
                                    &panel.overlay,
                                    egui::FontId::monospace(16.0),
                                    egui::Color32::from_rgb(255, 0, 255),
                                );
                            }
                        });
                },
            );
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_scan();
        self.handle_input(ctx);
        self.poll_pipeline();
        self.drive_animations(ctx);

        self.draw_control(ctx);
        self.draw_panels(ctx);

        if self.should_exit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::ImageFrame;

    fn frame(delay_ms: u32) -> ImageFrame {
        ImageFrame {
            pixels: vec![0; 4],
            width: 1,
            height: 1,
            delay_ms,
        }
    }

    fn prepared(index: usize, frames: Vec<ImageFrame>) -> Arc<PreparedImage> {
        Arc::new(PreparedImage {
            index,
            path: PathBuf::from(format!("{index}.png")),
            panel: 0,
            angle: 0,
            frames,
            original_width: 1,
            original_height: 1,
        })
    }

    #[test]
    fn step_wraps_both_directions() {
        assert_eq!(wrap_step(0, -1, 5), Some(4));
        assert_eq!(wrap_step(4, 1, 5), Some(0));
        assert_eq!(wrap_step(2, 10, 5), Some(2));
        assert_eq!(wrap_step(0, -12, 5), Some(3));
        assert_eq!(wrap_step(1, -1000, 7), Some(2));
        assert_eq!(wrap_step(0, 1, 0), None);
    }

    #[test]
    fn jump_targets() {
        assert_eq!(jump_index(JumpTarget::Start, 9), Some(0));
        assert_eq!(jump_index(JumpTarget::Middle, 9), Some(4));
        assert_eq!(jump_index(JumpTarget::End, 9), Some(8));
        assert_eq!(jump_index(JumpTarget::Middle, 1), Some(0));
        assert_eq!(jump_index(JumpTarget::End, 0), None);
    }

    #[test]
    fn stale_ticket_is_rejected() {
        let mut tracker = LoadTracker::new(None);
        let old = tracker.issue();
        let newest = tracker.issue();

        assert!(!tracker.accept(old));
        assert!(tracker.accept(newest));
        // A ticket is good exactly once.
        assert!(!tracker.accept(newest));
    }

    #[test]
    fn cache_hit_cancels_pending_decode() {
        let mut tracker = LoadTracker::new(Some(8));
        tracker.store(5, prepared(5, vec![frame(0)]));

        let ticket = tracker.issue();
        let hit = tracker.cached(5).unwrap();
        assert_eq!(hit.index, 5);
        // The in-flight decode was superseded by the hit.
        assert!(!tracker.accept(ticket));
    }

    #[test]
    fn cache_miss_and_eviction() {
        let mut tracker = LoadTracker::new(Some(8));
        assert!(tracker.cached(1).is_none());

        tracker.store(1, prepared(1, vec![frame(0)]));
        assert!(tracker.cached(1).is_some());
        tracker.evict(1);
        assert!(tracker.cached(1).is_none());
    }

    #[test]
    fn without_keep_memory_nothing_is_retained() {
        let mut tracker = LoadTracker::new(None);
        tracker.store(1, prepared(1, vec![frame(0)]));
        assert!(tracker.cached(1).is_none());
    }

    #[test]
    fn zero_capacity_still_yields_a_working_cache() {
        let mut tracker = LoadTracker::new(Some(0));
        tracker.store(1, prepared(1, vec![frame(0)]));
        assert!(tracker.cached(1).is_some());
    }

    #[test]
    fn animation_advances_and_wraps() {
        let mut panel = PanelState::new(PanelGeometry::new(10, 10, 0, 0));
        panel.show(prepared(0, vec![frame(0), frame(0)]), String::new());

        assert_eq!(panel.frame_index, 0);
        assert!(panel.update_animation().is_some());
        assert_eq!(panel.frame_index, 1);
        assert!(panel.update_animation().is_some());
        assert_eq!(panel.frame_index, 0);
    }

    #[test]
    fn static_images_do_not_animate() {
        let mut panel = PanelState::new(PanelGeometry::new(10, 10, 0, 0));
        panel.show(prepared(0, vec![frame(0)]), String::new());

        assert!(panel.update_animation().is_none());
        assert_eq!(panel.frame_index, 0);
    }
}
