//! Asynchronous decode/resize pipeline.
//!
//! A single worker thread owns all decoding. Navigation requests arrive on a
//! channel; whenever the worker wakes it drains the queue and keeps only the
//! newest request, so holding an arrow key down decodes the final target
//! instead of every index passed over. The UI side pairs this with a ticket
//! check: results whose ticket is not the most recently issued one are
//! dropped, which prevents tearing when the user navigates mid-decode.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use image::RgbaImage;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::display::{panel_for_orientation, Orientation, PanelGeometry};
use crate::image_loader::{fit_within, DecodeError, ImageFrame, LoadedImage};

/// One navigation request. `angle` is 0 or 180.
#[derive(Clone)]
pub struct LoadRequest {
    pub ticket: u64,
    pub index: usize,
    pub path: PathBuf,
    pub angle: u16,
}

/// A decoded image resized to fit its target panel, ready for upload.
pub struct PreparedImage {
    pub index: usize,
    pub path: PathBuf,
    /// Panel the image is routed to (matching orientation, else 0).
    pub panel: usize,
    pub angle: u16,
    pub frames: Vec<ImageFrame>,
    pub original_width: u32,
    pub original_height: u32,
}

impl PreparedImage {
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    /// Size of the frames after fitting to the panel.
    pub fn fitted_size(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0))
    }
}

/// Worker-to-UI message. The ticket lets the UI drop stale results.
pub struct LoadOutcome {
    pub ticket: u64,
    pub index: usize,
    pub result: Result<Arc<PreparedImage>, DecodeError>,
}

/// Handle to the decode worker.
pub struct ImagePipeline {
    request_tx: Sender<LoadRequest>,
    result_rx: Receiver<LoadOutcome>,
    shutdown: Arc<AtomicBool>,
}

impl ImagePipeline {
    /// Spawn the worker. `repaint` wakes the UI whenever a result is ready.
    pub fn new(
        panels: Vec<PanelGeometry>,
        resize_filter: image::imageops::FilterType,
        gif_resize_filter: image::imageops::FilterType,
        repaint: egui::Context,
    ) -> Self {
        // Requests are coalesced by the worker, so the queue stays tiny in
        // practice; unbounded avoids ever dropping the newest navigation.
        let (request_tx, request_rx) = unbounded::<LoadRequest>();
        let (result_tx, result_rx) = bounded::<LoadOutcome>(4);
        let shutdown = Arc::new(AtomicBool::new(false));

        let shutdown_worker = Arc::clone(&shutdown);
        std::thread::Builder::new()
            .name("mural-decoder".into())
            .spawn(move || {
                worker_loop(
                    request_rx,
                    result_tx,
                    panels,
                    resize_filter,
                    gif_resize_filter,
                    shutdown_worker,
                    repaint,
                );
            })
            .expect("failed to spawn decoder thread");

        Self {
            request_tx,
            result_rx,
            shutdown,
        }
    }

    /// Queue a request. Older queued requests become dead weight the worker
    /// skips over.
    pub fn request(&self, request: LoadRequest) {
        if self.request_tx.send(request).is_err() {
            warn!("decoder thread is gone; request dropped");
        }
    }

    /// Non-blocking poll for the next finished decode.
    pub fn poll(&self) -> Option<LoadOutcome> {
        self.result_rx.try_recv().ok()
    }
}

impl Drop for ImagePipeline {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

fn worker_loop(
    request_rx: Receiver<LoadRequest>,
    result_tx: Sender<LoadOutcome>,
    panels: Vec<PanelGeometry>,
    resize_filter: image::imageops::FilterType,
    gif_resize_filter: image::imageops::FilterType,
    shutdown: Arc<AtomicBool>,
    repaint: egui::Context,
) {
    while !shutdown.load(Ordering::Acquire) {
        // Block on the first request (saves CPU when idle)
        let first = match request_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(req) => req,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        };

        let request = latest_request(&request_rx, first);
        debug!(index = request.index, ticket = request.ticket, "decoding");

        let result = prepare_image(
            request.index,
            &request.path,
            &panels,
            request.angle,
            resize_filter,
            gif_resize_filter,
        )
        .map(Arc::new);

        if let Err(ref e) = result {
            warn!("load failed: {e}");
        }

        let outcome = LoadOutcome {
            ticket: request.ticket,
            index: request.index,
            result,
        };
        if result_tx.send(outcome).is_err() {
            break;
        }
        repaint.request_repaint();
    }
}

/// Latest-wins coalescing: drain everything queued and keep the newest.
fn latest_request(request_rx: &Receiver<LoadRequest>, first: LoadRequest) -> LoadRequest {
    let mut newest = first;
    while let Ok(req) = request_rx.try_recv() {
        newest = req;
    }
    newest
}

/// Decode `path`, pick the panel matching its orientation, rotate if asked,
/// and resize every frame to fit that panel. Animation frames are resized in
/// parallel.
pub fn prepare_image(
    index: usize,
    path: &Path,
    panels: &[PanelGeometry],
    angle: u16,
    resize_filter: image::imageops::FilterType,
    gif_resize_filter: image::imageops::FilterType,
) -> Result<PreparedImage, DecodeError> {
    let decoded = LoadedImage::load(path)?;

    let orientation = Orientation::of(decoded.original_width, decoded.original_height);
    let panel = panel_for_orientation(panels, orientation);
    let target = &panels[panel];
    let (fit_w, fit_h) = fit_within(
        decoded.original_width,
        decoded.original_height,
        target.width,
        target.height,
    );

    let filter = if decoded.is_animated() {
        gif_resize_filter
    } else {
        resize_filter
    };

    let frames: Vec<ImageFrame> = decoded
        .frames
        .par_iter()
        .map(|frame| scale_frame(frame, fit_w, fit_h, angle, filter))
        .collect();

    Ok(PreparedImage {
        index,
        path: path.to_path_buf(),
        panel,
        angle,
        frames,
        original_width: decoded.original_width,
        original_height: decoded.original_height,
    })
}

fn scale_frame(
    frame: &ImageFrame,
    width: u32,
    height: u32,
    angle: u16,
    filter: image::imageops::FilterType,
) -> ImageFrame {
    let Some(img) = RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone()) else {
        // Buffer length mismatch cannot happen for frames we decoded ourselves
        return frame.clone();
    };

    let img = if angle == 180 {
        image::imageops::rotate180(&img)
    } else {
        img
    };

    let resized = image::imageops::resize(&img, width, height, filter);
    ImageFrame {
        pixels: resized.into_raw(),
        width,
        height,
        delay_ms: frame.delay_ms,
    }
}
