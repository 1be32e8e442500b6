//! Page virtualization state machine
//!
//! Tracks which pages are in or next to the viewport and decides which of them
//! need a render. All methods are synchronous and return the renders to start;
//! the driver owns the actual rendering.
//!
//! Rules:
//! - the visible set is every page intersecting the viewport plus one
//!   neighbour on each side (the current page stands in before any
//!   intersection is reported)
//! - a page that is already rendering is never requested again
//! - a zoom or rotation change re-renders each visible page once and marks
//!   every other rendered page stale
//! - the current page follows any page more than half visible, unless the
//!   page number input is being edited

use std::collections::{BTreeMap, BTreeSet};

use super::types::{
    zoom_to_scale, DocumentState, PageState, RenderParams, RenderRequest, Rotation,
    ViewerSnapshot, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP,
};

const CURRENT_PAGE_RATIO: f32 = 0.5;

#[derive(Debug)]
pub struct Viewer {
    document: DocumentState,
    pages: Vec<PageState>,
    params: RenderParams,
    /// Pages currently intersecting the viewport, with their ratios
    ratios: BTreeMap<u32, f32>,
    current_page: u32,
    editing_page_input: bool,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewer {
    pub fn new() -> Self {
        Self {
            document: DocumentState::Unloaded,
            pages: Vec::new(),
            params: RenderParams::default(),
            ratios: BTreeMap::new(),
            current_page: 1,
            editing_page_input: false,
        }
    }

    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    pub fn params(&self) -> RenderParams {
        self.params
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn page_state(&self, page: u32) -> Option<PageState> {
        self.index(page).map(|i| self.pages[i])
    }

    fn index(&self, page: u32) -> Option<usize> {
        if page >= 1 && page <= self.page_count() {
            Some(page as usize - 1)
        } else {
            None
        }
    }

    /// Start loading; returns false when a load is already running or done
    pub fn begin_loading(&mut self) -> bool {
        match self.document {
            DocumentState::Unloaded | DocumentState::Failed { .. } => {
                self.document = DocumentState::Loading;
                true
            }
            DocumentState::Loading | DocumentState::Ready { .. } => false,
        }
    }

    /// Document opened; returns renders for the initial visible set
    pub fn loaded(&mut self, page_count: u32) -> Vec<RenderRequest> {
        if self.document != DocumentState::Loading {
            return Vec::new();
        }

        self.document = DocumentState::Ready { page_count };
        self.pages = vec![PageState::NotRendered; page_count as usize];
        self.ratios.clear();
        self.current_page = 1;
        self.render_visible()
    }

    pub fn load_failed(&mut self, message: String) {
        self.document = DocumentState::Failed { message };
        self.pages.clear();
        self.ratios.clear();
    }

    /// Pages in or next to the viewport, ascending
    pub fn visible_pages(&self) -> Vec<u32> {
        let count = self.page_count();
        if count == 0 {
            return Vec::new();
        }

        let mut core: Vec<u32> = self.ratios.keys().copied().collect();
        if core.is_empty() {
            core.push(self.current_page);
        }

        let mut visible = BTreeSet::new();
        for page in core {
            for candidate in [page.saturating_sub(1), page, page + 1] {
                if candidate >= 1 && candidate <= count {
                    visible.insert(candidate);
                }
            }
        }
        visible.into_iter().collect()
    }

    /// Ask for a render of one page
    ///
    /// Returns `None` when the page is out of range, already rendering, or
    /// already rendered with the current parameters.
    pub fn request_render(&mut self, page: u32) -> Option<RenderRequest> {
        let index = self.index(page)?;
        let params = self.params;

        match self.pages[index] {
            PageState::Rendering { .. } => None,
            PageState::Rendered { params: done } if done == params => None,
            _ => {
                self.pages[index] = PageState::Rendering { params };
                Some(RenderRequest { page, params })
            }
        }
    }

    fn render_visible(&mut self) -> Vec<RenderRequest> {
        self.visible_pages()
            .into_iter()
            .filter_map(|page| self.request_render(page))
            .collect()
    }

    /// A render finished
    ///
    /// A result for outdated parameters is discarded and the page is queued
    /// again at the current parameters if it is still visible.
    pub fn render_finished(
        &mut self,
        page: u32,
        params: RenderParams,
        succeeded: bool,
    ) -> Option<RenderRequest> {
        let index = self.index(page)?;
        if !matches!(self.pages[index], PageState::Rendering { params: p } if p == params) {
            return None;
        }

        if params != self.params {
            self.pages[index] = PageState::Stale { params };
            return if self.visible_pages().contains(&page) {
                self.request_render(page)
            } else {
                None
            };
        }

        self.pages[index] = if succeeded {
            PageState::Rendered { params }
        } else {
            PageState::Failed
        };
        None
    }

    /// Record a viewport intersection change
    pub fn set_visibility(&mut self, page: u32, ratio: f32) -> Vec<RenderRequest> {
        if self.index(page).is_none() {
            return Vec::new();
        }

        if ratio > 0.0 {
            self.ratios.insert(page, ratio);
        } else {
            self.ratios.remove(&page);
        }

        if ratio > CURRENT_PAGE_RATIO && !self.editing_page_input {
            self.current_page = page;
        }

        self.render_visible()
    }

    pub fn set_page_input_editing(&mut self, editing: bool) {
        self.editing_page_input = editing;
    }

    /// Jump to a page; the viewport is assumed to follow
    pub fn go_to_page(&mut self, page: u32) -> Vec<RenderRequest> {
        let count = self.page_count();
        if count == 0 {
            return Vec::new();
        }

        self.current_page = page.clamp(1, count);
        self.ratios.clear();
        self.render_visible()
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Vec<RenderRequest> {
        let scale = zoom_to_scale(zoom);
        if scale == self.params.scale {
            return Vec::new();
        }
        self.apply_params(RenderParams {
            scale,
            rotation: self.params.rotation,
        })
    }

    pub fn zoom_in(&mut self) -> Vec<RenderRequest> {
        self.set_zoom((self.params.zoom() + ZOOM_STEP).min(MAX_ZOOM))
    }

    pub fn zoom_out(&mut self) -> Vec<RenderRequest> {
        self.set_zoom((self.params.zoom() - ZOOM_STEP).max(MIN_ZOOM))
    }

    pub fn set_rotation(&mut self, degrees: i32) -> Vec<RenderRequest> {
        let rotation = Rotation::from_degrees(degrees);
        if rotation == self.params.rotation {
            return Vec::new();
        }
        self.apply_params(RenderParams {
            scale: self.params.scale,
            rotation,
        })
    }

    pub fn rotate_clockwise(&mut self) -> Vec<RenderRequest> {
        let next = self.params.rotation.clockwise();
        self.set_rotation(next.degrees() as i32)
    }

    fn apply_params(&mut self, params: RenderParams) -> Vec<RenderRequest> {
        self.params = params;

        // In-flight renders keep their state; their results are redone on completion
        for state in self.pages.iter_mut() {
            if let PageState::Rendered { params } = *state {
                *state = PageState::Stale { params };
            }
        }

        self.render_visible()
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            document: self.document.clone(),
            current_page: self.current_page,
            zoom: self.params.zoom(),
            rotation: self.params.rotation,
            visible_pages: self.visible_pages(),
            pages: self.pages.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(pages: u32) -> (Viewer, Vec<RenderRequest>) {
        let mut viewer = Viewer::new();
        assert!(viewer.begin_loading());
        let requests = viewer.loaded(pages);
        (viewer, requests)
    }

    fn pages_of(requests: &[RenderRequest]) -> Vec<u32> {
        requests.iter().map(|r| r.page).collect()
    }

    fn finish_all(viewer: &mut Viewer, requests: &[RenderRequest]) {
        for r in requests {
            assert!(viewer.render_finished(r.page, r.params, true).is_none());
        }
    }

    #[test]
    fn test_load_renders_first_page_and_neighbour() {
        let (viewer, requests) = ready(10);
        assert_eq!(pages_of(&requests), vec![1, 2]);
        assert_eq!(viewer.page_state(1), Some(PageState::Rendering { params: RenderParams::default() }));
        assert_eq!(viewer.page_state(3), Some(PageState::NotRendered));
    }

    #[test]
    fn test_second_load_is_ignored() {
        let (mut viewer, _) = ready(3);
        assert!(!viewer.begin_loading());
        assert!(viewer.loaded(5).is_empty());
        assert_eq!(viewer.page_count(), 3);
    }

    #[test]
    fn test_failed_load_can_retry() {
        let mut viewer = Viewer::new();
        viewer.begin_loading();
        viewer.load_failed("corrupt xref".into());
        assert!(matches!(viewer.document(), DocumentState::Failed { .. }));
        assert!(viewer.begin_loading());
    }

    #[test]
    fn test_duplicate_render_request_is_dropped() {
        let (mut viewer, _) = ready(10);
        assert!(viewer.request_render(1).is_none());
        assert!(viewer.request_render(0).is_none());
        assert!(viewer.request_render(11).is_none());

        let request = viewer.request_render(5);
        assert!(request.is_some());
        assert!(viewer.request_render(5).is_none());
    }

    #[test]
    fn test_rendered_page_is_not_requested_again() {
        let (mut viewer, requests) = ready(10);
        finish_all(&mut viewer, &requests);
        assert!(viewer.request_render(1).is_none());
        assert!(viewer.set_visibility(1, 1.0).is_empty());
    }

    #[test]
    fn test_visibility_adds_neighbours() {
        let (mut viewer, requests) = ready(10);
        finish_all(&mut viewer, &requests);

        viewer.set_visibility(1, 0.0);
        let requests = viewer.set_visibility(5, 0.8);
        assert_eq!(pages_of(&requests), vec![4, 5, 6]);
        assert_eq!(viewer.visible_pages(), vec![4, 5, 6]);

        let requests = viewer.set_visibility(10, 0.1);
        assert_eq!(pages_of(&requests), vec![9, 10]);
        assert_eq!(viewer.visible_pages(), vec![4, 5, 6, 9, 10]);
    }

    #[test]
    fn test_current_page_follows_majority_visibility() {
        let (mut viewer, _) = ready(10);
        viewer.set_visibility(3, 0.4);
        assert_eq!(viewer.current_page(), 1);
        viewer.set_visibility(3, 0.6);
        assert_eq!(viewer.current_page(), 3);

        viewer.set_page_input_editing(true);
        viewer.set_visibility(4, 0.9);
        assert_eq!(viewer.current_page(), 3);

        viewer.set_page_input_editing(false);
        viewer.set_visibility(4, 0.95);
        assert_eq!(viewer.current_page(), 4);
    }

    #[test]
    fn test_zoom_change_rerenders_each_visible_page_once() {
        let (mut viewer, requests) = ready(10);
        finish_all(&mut viewer, &requests);
        let requests = viewer.set_visibility(5, 1.0);
        finish_all(&mut viewer, &requests);
        viewer.set_visibility(1, 0.0);

        let requests = viewer.set_zoom(1.5);
        assert_eq!(pages_of(&requests), vec![4, 5, 6]);
        assert!(requests.iter().all(|r| r.params.scale == 150));

        // Pages outside the viewport become stale, not re-rendered
        assert!(matches!(viewer.page_state(1), Some(PageState::Stale { .. })));

        // Repeated events while those renders run add nothing
        assert!(viewer.set_zoom(1.5).is_empty());
        assert!(viewer.set_visibility(5, 1.0).is_empty());

        finish_all(&mut viewer, &requests);
        assert!(viewer.snapshot().visible_settled());
    }

    #[test]
    fn test_rotation_change_rerenders_visible_pages() {
        let (mut viewer, requests) = ready(4);
        finish_all(&mut viewer, &requests);

        let requests = viewer.rotate_clockwise();
        assert_eq!(pages_of(&requests), vec![1, 2]);
        assert!(requests.iter().all(|r| r.params.rotation == Rotation::Deg90));

        assert!(viewer.set_rotation(450).is_empty());
        assert_eq!(viewer.params().rotation, Rotation::Deg90);
    }

    #[test]
    fn test_zoom_during_render_redoes_page_once() {
        let (mut viewer, requests) = ready(10);

        // Pages 1 and 2 are mid-render, so the change itself starts nothing
        assert!(viewer.set_zoom(2.0).is_empty());

        let old = requests[0];
        let redo = viewer.render_finished(old.page, old.params, true);
        assert_eq!(
            redo,
            Some(RenderRequest { page: 1, params: RenderParams::new(2.0, Rotation::Deg0) })
        );
        assert!(viewer.request_render(1).is_none());
    }

    #[test]
    fn test_zoom_steps_and_bounds() {
        let (mut viewer, _) = ready(2);
        viewer.set_zoom(2.9);
        viewer.zoom_in();
        assert_eq!(viewer.params().zoom(), 3.0);
        assert!(viewer.zoom_in().is_empty());

        viewer.set_zoom(0.1);
        assert_eq!(viewer.params().zoom(), 0.5);
        viewer.zoom_in();
        assert_eq!(viewer.params().zoom(), 0.75);
    }

    #[test]
    fn test_go_to_page_clamps_and_renders() {
        let (mut viewer, requests) = ready(10);
        finish_all(&mut viewer, &requests);

        let requests = viewer.go_to_page(42);
        assert_eq!(viewer.current_page(), 10);
        assert_eq!(pages_of(&requests), vec![9, 10]);
    }

    #[test]
    fn test_failed_render_can_be_retried() {
        let (mut viewer, requests) = ready(3);
        let first = requests[0];
        viewer.render_finished(first.page, first.params, false);
        assert_eq!(viewer.page_state(1), Some(PageState::Failed));
        assert!(viewer.request_render(1).is_some());
    }
}
