//! PixelReel: a small square sprite editor core.
//!
//! [`project::Project`] is the document a front end drives; the modules
//! below it hold the pixel data, tools, frame sequence, playback timer and
//! the `.ssp` project format.

pub mod canvas;
pub mod cli;
pub mod components;
pub mod frames;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
pub mod settings;
