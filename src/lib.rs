pub mod charts;
pub mod config;
pub mod data;
pub mod figure;
pub mod logging;
pub mod palette;
pub mod pipeline;
pub mod render;
pub mod svg;
pub mod viewer;
