//! Document viewer core
//!
//! Virtualized page rendering for uploaded PDFs: only pages in or next to the
//! viewport are rendered, duplicate renders are dropped, and zoom or rotation
//! changes redo visible pages once.

mod driver;
mod types;
mod virtualizer;

pub use driver::{spawn_viewer, PageRenderer, ViewerHandle};
pub use types::{
    DocumentState, PageState, RenderParams, RenderRequest, Rotation, ViewerCommand, ViewerError,
    ViewerSnapshot, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP,
};
pub use virtualizer::Viewer;
