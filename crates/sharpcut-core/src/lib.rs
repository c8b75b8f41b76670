pub mod analysis;
pub mod config;
pub mod debug;
pub mod encode;
pub mod pipeline;
pub mod refine;
pub mod video;
