// Tilemark: tiled text watermarks for uploaded photos

pub mod config;
pub mod constants;
pub mod logging;
pub mod service;
pub mod session;
pub mod storage;
pub mod watermark;
