//! Concurrent multi-bar progress rendering for terminals.
//!
//! A [`Progress`] container owns a set of [`Bar`]s and redraws them in place
//! every refresh period, keeping decorator columns aligned across bars.

pub mod bar;
pub mod config;
pub mod decor;
pub mod logging;
pub mod progress;
pub mod terminal;

pub use bar::{Bar, BarOptions};
pub use config::{BarFormat, ProgressConfig};
pub use decor::{DecorFlags, Decorator, Statistics};
pub use progress::{BeforeRender, Progress, ProgressBuilder};
pub use terminal::{CaptureWriter, CursorWriter, FrameWriter};
