//! # What is This?
//!
//! `glcanvas` provides off-screen canvases. A `Canvas` is a render target that
//! triangle batches and textured pictures can be drawn onto, and at the same
//! time a picture whose composited content can be drawn onto other targets or
//! read back pixel by pixel.
//!
//! All graphics API calls are serialized onto a single GPU execution context
//! (see `video::executor`), while draw requests may come from any thread. Each
//! draw snapshots the render state of its canvas before it is deferred, so
//! later state changes never leak into already submitted draws.
//!
//! ```rust,ignore
//! use glcanvas::prelude::*;
//!
//! let video = VideoSystem::headless(VideoParams::default())?;
//! let canvas = Canvas::new(&video, Rect::new(0.0, 0.0, 100.0, 100.0))?;
//!
//! canvas.clear(Color::red());
//! canvas.set_compose_method(ComposeMethod::Plus);
//! canvas.make_triangles(&TrianglesData::from_rect(canvas.bounds(), Color::blue())).draw();
//!
//! let pixels = canvas.pixels()?;
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

pub extern crate cgmath;
pub extern crate gl;

#[macro_use]
pub mod utils;
pub mod errors;
pub mod math;

pub mod canvas;
pub mod draw;
pub mod video;

pub mod prelude {
    pub use crate::canvas::{Canvas, CanvasPicture, CanvasTriangles, RenderState};
    pub use crate::draw::prelude::*;
    pub use crate::math::prelude::*;
    pub use crate::video::prelude::*;
}
