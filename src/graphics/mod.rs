pub mod engine;
pub mod shader;
pub mod vertex;

pub use engine::{BandWave, GraphicsEngine};
pub use shader::ShaderManager;
pub use vertex::{Vertex, VertexBuffer};
