//! Domain modules: settings, rolling window, ticker and depth state with their wire types.

pub mod depth;
pub mod settings;
pub mod ticker;
pub mod window;
