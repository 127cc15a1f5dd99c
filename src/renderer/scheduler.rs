//! Render Scheduler
//!
//! Collects [`DrawCommand`]s for a frame and dispatches them to a
//! [`RenderBackend`] in `(pass, geometry)` order, eliding redundant state
//! changes:
//!
//! - passes are entered and exited once per contiguous run,
//! - a uniform is uploaded only when its value differs from the last one
//!   bound in the current pass activation,
//! - geometry is rebound only when it changes.
//!
//! `present()` always leaves the scheduler ready for the next frame: the last
//! pass is exited and the queue is emptied whether or not the frame failed.

use crate::errors::{GpuError, Result, UmbraError};
use crate::renderer::backend::RenderBackend;
use crate::renderer::command::{DrawCommand, GeometryId};
use crate::renderer::pass::{PassRegistry, RenderPass};
use crate::renderer::queue::RenderQueue;
use crate::renderer::settings::RendererSettings;
use crate::renderer::uniforms::UniformCache;

/// Counters for one successful `present()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: usize,
    pub pass_switches: usize,
    pub uniform_uploads: usize,
    pub uniform_uploads_skipped: usize,
    pub geometry_binds: usize,
}

#[derive(Debug)]
pub struct RenderScheduler {
    queue: RenderQueue,
    passes: PassRegistry,
    uniform_cache: UniformCache,
}

impl RenderScheduler {
    #[must_use]
    pub fn new(settings: &RendererSettings) -> Self {
        Self {
            queue: RenderQueue::new(settings.queue_capacity),
            passes: PassRegistry::new(settings),
            uniform_cache: UniformCache::new(),
        }
    }

    /// Queues a command for the next `present()`.
    ///
    /// Fails with [`UmbraError::QueueFull`] once the queue holds its capacity;
    /// the rejected command is dropped and the queue is left untouched.
    pub fn submit(&mut self, command: DrawCommand) -> Result<()> {
        let (pass, geometry) = command.sort_key();
        self.queue.push(command).inspect_err(|_| {
            log::warn!(
                "Render queue full ({} commands), dropping {pass:?} draw of {geometry:?}",
                self.queue.capacity()
            );
        })
    }

    #[inline]
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    #[must_use]
    pub fn passes(&self) -> &PassRegistry {
        &self.passes
    }

    #[inline]
    pub fn passes_mut(&mut self) -> &mut PassRegistry {
        &mut self.passes
    }

    /// Sorts and draws everything queued, then empties the queue.
    ///
    /// The first failure aborts the remaining draws; the active pass is still
    /// exited and the backend is told to drop the frame.
    pub fn present(&mut self, backend: &mut dyn RenderBackend) -> Result<FrameStats> {
        if self.queue.is_empty() {
            return Ok(FrameStats::default());
        }

        self.queue.sort();
        self.uniform_cache.clear();

        let mut stats = FrameStats::default();
        let mut active: Option<&RenderPass> = None;

        let mut result = backend.begin_frame().map_err(UmbraError::from).and_then(|()| {
            Self::dispatch(
                self.queue.commands(),
                &self.passes,
                &mut self.uniform_cache,
                backend,
                &mut active,
                &mut stats,
            )
        });

        if let Some(pass) = active {
            let exited = pass.exit(backend);
            if result.is_ok() {
                result = exited.map_err(UmbraError::from);
            }
        }

        if result.is_ok() {
            result = backend.end_frame().map_err(UmbraError::from);
        } else {
            backend.abort_frame();
        }

        let dropped = self.queue.len();
        self.queue.clear();
        self.uniform_cache.clear();

        match result {
            Ok(()) => Ok(stats),
            Err(err) => {
                log::warn!("Frame aborted, {dropped} queued commands discarded: {err}");
                Err(err)
            }
        }
    }

    fn dispatch<'p>(
        commands: &[DrawCommand],
        passes: &'p PassRegistry,
        cache: &mut UniformCache,
        backend: &mut dyn RenderBackend,
        active: &mut Option<&'p RenderPass>,
        stats: &mut FrameStats,
    ) -> Result<()> {
        let mut bound_geometry: Option<GeometryId> = None;

        for command in commands {
            if active.is_none_or(|pass| pass.id() != command.pass) {
                let next = passes
                    .get(command.pass)
                    .ok_or(UmbraError::UnknownPass(command.pass))?;

                if let Some(previous) = active.take() {
                    previous.exit(backend)?;
                }
                next.enter(backend)?;
                *active = Some(next);

                backend.bind_shader(next.shader())?;
                cache.clear();
                bound_geometry = None;
                stats.pass_switches += 1;
            }

            for binding in &command.uniforms {
                if cache.needs_upload(binding) {
                    backend.set_uniform(binding.slot, &binding.value)?;
                    stats.uniform_uploads += 1;
                } else {
                    stats.uniform_uploads_skipped += 1;
                }
            }

            if bound_geometry != Some(command.geometry) {
                backend.bind_geometry(command.geometry)?;
                bound_geometry = Some(command.geometry);
                stats.geometry_binds += 1;
            }

            Self::draw(command, backend)?;
            stats.draws += 1;
        }

        Ok(())
    }

    fn draw(command: &DrawCommand, backend: &mut dyn RenderBackend) -> std::result::Result<(), GpuError> {
        let userdata = command.userdata.as_ref();
        if let Some(hook) = command.pre_draw {
            hook(backend, userdata)?;
        }
        backend.draw(command.geometry)?;
        if let Some(hook) = command.post_draw {
            hook(backend, userdata)?;
        }
        Ok(())
    }
}
