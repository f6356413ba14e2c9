//! Preview/finalize render orchestration.
//!
//! Every request bumps a monotonic generation counter, produces a CPU
//! preview synchronously, and hands the full-resolution grade to a worker
//! thread. Results from superseded generations are dropped; [`Orchestrator::poll`]
//! only ever yields the latest generation's frame.

use gview_compute::backend::{CpuBackend, GradeBackend};
use gview_compute::{geometry, Dispatcher};
use gview_core::{EnhanceSettings, PixelBuffer};
use gview_lut::Lut3d;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

use crate::ViewResult;

/// Maximum pixel count for the synchronous preview; larger images are
/// downscaled first.
pub const PREVIEW_PIXEL_BUDGET: usize = 1_000_000;

/// Render lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Nothing requested yet.
    Idle,
    /// Preview delivered, finalize not yet submitted.
    PreviewReady,
    /// Full-resolution grade in flight.
    Finalizing,
    /// Latest generation's full frame delivered.
    Finalized,
}

/// A preview returned synchronously by [`Orchestrator::request_render`].
#[derive(Debug)]
pub struct PreviewFrame {
    /// Generation this preview belongs to.
    pub generation: u64,
    /// Graded preview pixels (possibly downscaled).
    pub image: PixelBuffer,
}

/// A completed full-resolution frame.
#[derive(Debug)]
pub struct FinalizedFrame {
    /// Generation this frame belongs to.
    pub generation: u64,
    /// Graded full-resolution pixels.
    pub image: PixelBuffer,
}

struct Job {
    generation: u64,
    image: Arc<PixelBuffer>,
    settings: EnhanceSettings,
    lut: Option<Arc<Lut3d>>,
}

/// Drives preview and finalize rendering with latest-generation-wins.
pub struct Orchestrator {
    generation: Arc<AtomicU64>,
    state: RenderState,
    preview_budget: usize,
    cpu: CpuBackend,
    job_tx: Option<mpsc::Sender<Job>>,
    result_rx: mpsc::Receiver<FinalizedFrame>,
    worker: Option<JoinHandle<()>>,
}

impl Orchestrator {
    /// Creates an orchestrator whose finalize jobs run through `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel::<FinalizedFrame>();

        let worker_gen = Arc::clone(&generation);
        let worker = std::thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                // Skip work that is already superseded
                if job.generation < worker_gen.load(Ordering::SeqCst) {
                    debug!(generation = job.generation, "skipping superseded finalize");
                    continue;
                }
                match dispatcher.grade(&job.image, &job.settings, job.lut.as_deref()) {
                    Ok(image) => {
                        if job.generation < worker_gen.load(Ordering::SeqCst) {
                            debug!(generation = job.generation, "dropping stale finalize result");
                            continue;
                        }
                        let _ = result_tx.send(FinalizedFrame {
                            generation: job.generation,
                            image,
                        });
                    }
                    Err(e) => {
                        warn!(generation = job.generation, error = %e, "finalize failed");
                    }
                }
            }
        });

        Self {
            generation,
            state: RenderState::Idle,
            preview_budget: PREVIEW_PIXEL_BUDGET,
            cpu: CpuBackend::new(),
            job_tx: Some(job_tx),
            result_rx,
            worker: Some(worker),
        }
    }

    /// Overrides the preview pixel budget.
    pub fn with_preview_budget(mut self, pixels: usize) -> Self {
        self.preview_budget = pixels.max(1);
        self
    }

    /// Current render state.
    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Current (latest) generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Starts a new render generation.
    ///
    /// Returns the synchronous CPU preview and submits the full-resolution
    /// grade to the worker. Any in-flight finalize of an older generation
    /// is superseded.
    pub fn request_render(
        &mut self,
        image: Arc<PixelBuffer>,
        settings: &EnhanceSettings,
        lut: Option<Arc<Lut3d>>,
    ) -> ViewResult<PreviewFrame> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Synchronous CPU preview, downscaled when over budget
        let preview_src = if image.pixel_count() > self.preview_budget {
            let (w, h) = image.dimensions();
            let factor = (self.preview_budget as f64 / image.pixel_count() as f64).sqrt();
            let pw = ((w as f64 * factor) as u32).max(1);
            let ph = ((h as f64 * factor) as u32).max(1);
            geometry::resize_bilinear(&image, pw, ph)?
        } else {
            (*image).clone()
        };
        let preview = self.cpu.grade(&preview_src, settings, lut.as_deref())?;
        self.state = RenderState::PreviewReady;

        if let Some(tx) = &self.job_tx {
            let submitted = tx.send(Job {
                generation,
                image,
                settings: settings.clone(),
                lut,
            });
            if submitted.is_ok() {
                self.state = RenderState::Finalizing;
            }
        }

        Ok(PreviewFrame {
            generation,
            image: preview,
        })
    }

    /// Non-blocking check for a finalized frame of the current generation.
    ///
    /// Frames from superseded generations are discarded.
    pub fn poll(&mut self) -> Option<FinalizedFrame> {
        let current = self.generation();
        let mut latest = None;
        while let Ok(frame) = self.result_rx.try_recv() {
            if frame.generation == current {
                latest = Some(frame);
            } else {
                debug!(
                    generation = frame.generation,
                    current, "discarding superseded frame"
                );
            }
        }
        if latest.is_some() {
            self.state = RenderState::Finalized;
        }
        latest
    }

    /// Blocks until the current generation finalizes or the worker exits.
    ///
    /// Test helper; production callers poll from their event loop.
    pub fn wait(&mut self) -> Option<FinalizedFrame> {
        let current = self.generation();
        loop {
            if let Some(frame) = self.poll() {
                return Some(frame);
            }
            match self.result_rx.recv() {
                Ok(frame) => {
                    if frame.generation == current {
                        self.state = RenderState::Finalized;
                        return Some(frame);
                    }
                    debug!(generation = frame.generation, "discarding superseded frame");
                }
                Err(_) => return None,
            }
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        // Closing the job channel lets the worker exit
        self.job_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use gview_compute::Backend;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(Dispatcher::new(Backend::Cpu))
    }

    #[test]
    fn test_preview_is_synchronous_and_graded() {
        let mut orch = orchestrator();
        let img = Arc::new(PixelBuffer::filled(8, 8, [0.5, 0.5, 0.5]));
        let settings = EnhanceSettings::default().with_gamma(2.0);
        let preview = orch.request_render(img, &settings, None).unwrap();
        assert_eq!(preview.generation, 1);
        assert_abs_diff_eq!(preview.image.data()[0], 0.25, epsilon = 1e-6);
        assert_eq!(orch.state(), RenderState::Finalizing);
    }

    #[test]
    fn test_preview_downscales_over_budget() {
        let mut orch = orchestrator().with_preview_budget(64);
        let img = Arc::new(PixelBuffer::filled(32, 32, [0.5, 0.5, 0.5]));
        let preview = orch
            .request_render(img, &EnhanceSettings::default(), None)
            .unwrap();
        assert!(preview.image.pixel_count() <= 64);
    }

    #[test]
    fn test_finalize_delivers_full_resolution() {
        let mut orch = orchestrator().with_preview_budget(16);
        let img = Arc::new(PixelBuffer::filled(32, 32, [0.5, 0.5, 0.5]));
        orch.request_render(img, &EnhanceSettings::default(), None)
            .unwrap();
        let frame = orch.wait().expect("finalize");
        assert_eq!(frame.generation, 1);
        assert_eq!(frame.image.dimensions(), (32, 32));
        assert_eq!(orch.state(), RenderState::Finalized);
    }

    #[test]
    fn test_latest_generation_wins() {
        let mut orch = orchestrator();
        let img = Arc::new(PixelBuffer::filled(16, 16, [0.2, 0.2, 0.2]));
        let bright = EnhanceSettings::default().with_gamma(0.5);

        orch.request_render(Arc::clone(&img), &EnhanceSettings::default(), None)
            .unwrap();
        orch.request_render(Arc::clone(&img), &bright, None).unwrap();
        assert_eq!(orch.generation(), 2);

        let frame = orch.wait().expect("finalize");
        assert_eq!(frame.generation, 2);
        // Gamma 0.5 brightens: the generation-2 grade, not generation 1's
        assert!(frame.image.data()[0] > 0.4);

        // Nothing older ever surfaces
        assert!(orch.poll().is_none());
    }
}
