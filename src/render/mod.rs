pub mod canvas;
pub mod geometry;
pub mod scheduler;
pub mod session;
pub mod style;
pub mod styles;
pub mod text;
pub mod title;
