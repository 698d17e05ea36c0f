use crate::core::canvas::{SharedCanvas, Viewport};
use crate::core::line_processor::SoftwareLineRenderer;
use crate::core::particle_processor::SoftwareParticleRenderer;
use crate::core::primitive::{Instance, Primitive};
use crate::core::renderer::{Context, LineRenderer, ParticleRenderer, TriangleRenderer};
use crate::core::triangle_processor::SoftwareTriangleRenderer;
use crate::material_system::light::Lighting;
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

/// Most `render()` calls a single frame can hold. Instance indices are 16 bit.
pub const MAX_INSTANCES: usize = u16::MAX as usize;

/// Frame state shared between a context and the renderers it created.
pub(crate) type SharedFrame = Rc<RefCell<FrameState>>;

pub(crate) struct FrameState {
    recording: bool,
    viewport: Viewport,
    canvas: Option<SharedCanvas>,
    lighting: Lighting,
    instances: Vec<Instance>,
    primitives: Vec<Primitive>,
}

impl FrameState {
    fn new() -> Self {
        FrameState {
            recording: false,
            viewport: Viewport::full(0, 0),
            canvas: None,
            lighting: Lighting::default(),
            instances: Vec::new(),
            primitives: Vec::new(),
        }
    }

    /// Viewport of the frame being recorded. Panics outside `start`/`finish`.
    pub(crate) fn viewport(&self) -> Viewport {
        assert!(self.recording, "render() called outside start()/finish()");
        self.viewport
    }

    pub(crate) fn lighting(&self) -> Lighting {
        self.lighting
    }

    /// Appends the output of one `render()` call. Every call creates an
    /// instance, also when nothing survived culling.
    pub(crate) fn submit(&mut self, instance: Instance) {
        assert!(self.recording, "render() called outside start()/finish()");
        assert!(
            self.instances.len() < MAX_INSTANCES,
            "more than {} render() calls in one frame",
            MAX_INSTANCES
        );

        let index = self.instances.len() as u16;
        self.primitives.reserve(instance.len());
        for local in 0..instance.len() as u32 {
            self.primitives.push(Primitive {
                depth: instance.depth(local),
                instance: index,
                local,
            });
        }
        self.instances.push(instance);
    }
}

/// Counters of the last finished frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub instances: usize,
    pub primitives: usize,
}

/// Painter's-algorithm backend.
///
/// Renderers only project and store; nothing touches the canvas until
/// [`Context::finish`] sorts every stored primitive far to near and replays
/// them in that order. Ties keep no particular order.
pub struct SoftwareContext {
    frame: SharedFrame,
    last_stats: FrameStats,
}

impl Default for SoftwareContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareContext {
    pub fn new() -> Self {
        SoftwareContext {
            frame: Rc::new(RefCell::new(FrameState::new())),
            last_stats: FrameStats::default(),
        }
    }

    pub fn with_lighting(lighting: Lighting) -> Self {
        let mut context = Self::new();
        context.set_lighting(lighting);
        context
    }

    /// Lighting used by triangle renderers from their next `render()` on.
    pub fn set_lighting(&mut self, lighting: Lighting) {
        self.frame.borrow_mut().lighting = lighting;
    }

    pub fn lighting(&self) -> Lighting {
        self.frame.borrow().lighting
    }

    pub fn is_recording(&self) -> bool {
        self.frame.borrow().recording
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }
}

impl Context for SoftwareContext {
    fn start(&mut self, viewport: Viewport, canvas: SharedCanvas) {
        let mut frame = self.frame.borrow_mut();
        assert!(!frame.recording, "start() called twice without finish()");
        frame.recording = true;
        frame.viewport = viewport;
        frame.canvas = Some(canvas);
        frame.instances.clear();
        frame.primitives.clear();
    }

    fn finish(&mut self) {
        let mut frame = self.frame.borrow_mut();
        assert!(frame.recording, "finish() called without start()");
        frame.recording = false;
        let Some(canvas) = frame.canvas.take() else {
            panic!("recording frame has no canvas");
        };

        let state = &mut *frame;
        state
            .primitives
            .sort_unstable_by(|a, b| b.depth.total_cmp(&a.depth));

        {
            let mut canvas = canvas.borrow_mut();
            for primitive in &state.primitives {
                state.instances[primitive.instance as usize]
                    .draw(primitive.local, &mut *canvas);
            }
        }

        self.last_stats = FrameStats {
            instances: state.instances.len(),
            primitives: state.primitives.len(),
        };
        debug!(
            "frame finished: {} instances, {} primitives",
            self.last_stats.instances, self.last_stats.primitives
        );

        state.instances.clear();
        state.primitives.clear();
    }

    fn create_line_renderer(&self) -> Box<dyn LineRenderer> {
        Box::new(SoftwareLineRenderer::new(Rc::clone(&self.frame)))
    }

    fn create_triangle_renderer(&self) -> Box<dyn TriangleRenderer> {
        Box::new(SoftwareTriangleRenderer::new(Rc::clone(&self.frame)))
    }

    fn create_particle_renderer(&self) -> Box<dyn ParticleRenderer> {
        Box::new(SoftwareParticleRenderer::new(Rc::clone(&self.frame)))
    }
}
