pub mod config;
pub mod evaluate;
pub mod predict;
pub mod train;
pub mod util;
