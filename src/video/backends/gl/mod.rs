//! OpenGL 3.3 core backend. The context must be current on the thread that
//! creates the visitor and runs every operation.

mod types;
mod visitor;

pub use self::visitor::GLVisitor;
