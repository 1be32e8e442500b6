//! Viewer types

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.25;

/// Page rotation in quarter turns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalise any multiple of 90 degrees; other angles snap to the nearest quarter turn
    pub fn from_degrees(degrees: i32) -> Self {
        let quarter = ((degrees as f64) / 90.0).round() as i64;
        match quarter.rem_euclid(4) {
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            3 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn clockwise(&self) -> Self {
        Rotation::from_degrees(self.degrees() as i32 + 90)
    }
}

/// Parameters a page was (or will be) rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderParams {
    /// Zoom * 100 as integer for comparison
    pub scale: u32,
    pub rotation: Rotation,
}

impl RenderParams {
    pub fn new(zoom: f32, rotation: Rotation) -> Self {
        Self {
            scale: zoom_to_scale(zoom),
            rotation,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.scale as f32 / 100.0
    }
}

impl Default for RenderParams {
    fn default() -> Self {
        Self::new(1.0, Rotation::Deg0)
    }
}

pub(crate) fn zoom_to_scale(zoom: f32) -> u32 {
    let zoom = if zoom.is_finite() { zoom } else { 1.0 };
    (zoom.clamp(MIN_ZOOM, MAX_ZOOM) * 100.0).round() as u32
}

/// Document lifecycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DocumentState {
    Unloaded,
    Loading,
    Ready { page_count: u32 },
    Failed { message: String },
}

/// Per-page render lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageState {
    NotRendered,
    Rendering { params: RenderParams },
    Rendered { params: RenderParams },
    /// Rendered with parameters that are no longer current
    Stale { params: RenderParams },
    Failed,
}

/// A render the driver should start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub page: u32,
    pub params: RenderParams,
}

/// Inputs from the UI
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    Open,
    SetZoom(f32),
    ZoomIn,
    ZoomOut,
    Rotate(i32),
    RotateClockwise,
    /// Intersection ratio (0.0 to 1.0) of a page with the viewport
    Visibility { page: u32, ratio: f32 },
    GoToPage(u32),
    /// Whether the user is typing into the page number input
    PageInputEditing(bool),
}

/// Observable viewer state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerSnapshot {
    pub document: DocumentState,
    pub current_page: u32,
    pub zoom: f32,
    pub rotation: Rotation,
    pub visible_pages: Vec<u32>,
    pub pages: Vec<PageState>,
}

impl ViewerSnapshot {
    pub fn page_count(&self) -> u32 {
        match self.document {
            DocumentState::Ready { page_count } => page_count,
            _ => 0,
        }
    }

    /// Every visible page rendered with the current parameters
    pub fn visible_settled(&self) -> bool {
        let current = RenderParams::new(self.zoom, self.rotation);
        self.visible_pages.iter().all(|page| {
            matches!(
                self.pages.get(*page as usize - 1),
                Some(PageState::Rendered { params }) if *params == current
            )
        })
    }
}

/// Viewer errors
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Failed to load document: {0}")]
    Load(String),

    #[error("Failed to render page {page}: {message}")]
    Render { page: u32, message: String },

    #[error("Render of page {0} timed out")]
    Timeout(u32),

    #[error("Viewer is closed")]
    Closed,
}
