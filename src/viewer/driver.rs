//! Viewer driver
//!
//! A single task owns the [`Viewer`] state machine. UI commands arrive on an
//! mpsc channel, renders run as spawned tasks that report back on a second
//! channel, and every state change is published on a watch channel.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

use super::types::{RenderParams, RenderRequest, ViewerCommand, ViewerError, ViewerSnapshot};
use super::virtualizer::Viewer;

/// Timeout for opening a document
const LOAD_TIMEOUT_SECS: u64 = 30;
/// Timeout for a single page render
const RENDER_TIMEOUT_SECS: u64 = 30;

const COMMAND_BUFFER: usize = 64;

/// Something that can open a document and paint its pages
#[async_trait]
pub trait PageRenderer: Send + Sync + 'static {
    /// Open the document and return its page count
    async fn load(&self) -> Result<u32, ViewerError>;

    /// Render one page (1-based) at the given parameters
    async fn render(&self, page: u32, params: RenderParams) -> Result<(), ViewerError>;
}

/// Internal events produced by spawned work
enum Completion {
    Loaded(Result<u32, ViewerError>),
    Rendered {
        request: RenderRequest,
        result: Result<(), ViewerError>,
    },
}

/// Handle held by the UI
#[derive(Clone)]
pub struct ViewerHandle {
    commands: mpsc::Sender<ViewerCommand>,
    snapshots: watch::Receiver<ViewerSnapshot>,
}

impl ViewerHandle {
    pub async fn send(&self, command: ViewerCommand) -> Result<(), ViewerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ViewerError::Closed)
    }

    /// Latest published state
    pub fn snapshot(&self) -> ViewerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver for awaiting state changes
    pub fn subscribe(&self) -> watch::Receiver<ViewerSnapshot> {
        self.snapshots.clone()
    }
}

/// Spawn the driver loop; it stops when every handle is dropped
pub fn spawn_viewer<R: PageRenderer>(renderer: Arc<R>) -> (ViewerHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let viewer = Viewer::new();
    let (snapshot_tx, snapshot_rx) = watch::channel(viewer.snapshot());

    let driver = ViewerDriver {
        viewer,
        renderer,
        snapshots: snapshot_tx,
    };
    let task = tokio::spawn(driver.run(command_rx));

    (
        ViewerHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        },
        task,
    )
}

struct ViewerDriver<R: PageRenderer> {
    viewer: Viewer,
    renderer: Arc<R>,
    snapshots: watch::Sender<ViewerSnapshot>,
}

impl<R: PageRenderer> ViewerDriver<R> {
    async fn run(mut self, mut commands: mpsc::Receiver<ViewerCommand>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, &done_tx),
                    None => break,
                },
                Some(completion) = done_rx.recv() => self.handle_completion(completion, &done_tx),
            }
            self.publish();
        }

        tracing::debug!("Viewer driver stopped");
    }

    fn handle_command(&mut self, command: ViewerCommand, done: &mpsc::UnboundedSender<Completion>) {
        let requests = match command {
            ViewerCommand::Open => {
                if self.viewer.begin_loading() {
                    self.spawn_load(done);
                }
                Vec::new()
            }
            ViewerCommand::SetZoom(zoom) => self.viewer.set_zoom(zoom),
            ViewerCommand::ZoomIn => self.viewer.zoom_in(),
            ViewerCommand::ZoomOut => self.viewer.zoom_out(),
            ViewerCommand::Rotate(degrees) => self.viewer.set_rotation(degrees),
            ViewerCommand::RotateClockwise => self.viewer.rotate_clockwise(),
            ViewerCommand::Visibility { page, ratio } => self.viewer.set_visibility(page, ratio),
            ViewerCommand::GoToPage(page) => self.viewer.go_to_page(page),
            ViewerCommand::PageInputEditing(editing) => {
                self.viewer.set_page_input_editing(editing);
                Vec::new()
            }
        };

        for request in requests {
            self.spawn_render(request, done);
        }
    }

    fn handle_completion(&mut self, completion: Completion, done: &mpsc::UnboundedSender<Completion>) {
        match completion {
            Completion::Loaded(Ok(page_count)) => {
                tracing::info!(page_count, "Document loaded");
                for request in self.viewer.loaded(page_count) {
                    self.spawn_render(request, done);
                }
            }
            Completion::Loaded(Err(e)) => {
                tracing::warn!("Document load failed: {}", e);
                self.viewer.load_failed(e.to_string());
            }
            Completion::Rendered { request, result } => {
                if let Err(e) = &result {
                    tracing::warn!(page = request.page, "Render failed: {}", e);
                }
                if let Some(redo) =
                    self.viewer
                        .render_finished(request.page, request.params, result.is_ok())
                {
                    self.spawn_render(redo, done);
                }
            }
        }
    }

    fn spawn_load(&self, done: &mpsc::UnboundedSender<Completion>) {
        let renderer = Arc::clone(&self.renderer);
        let done = done.clone();

        tokio::spawn(async move {
            let result = match timeout(Duration::from_secs(LOAD_TIMEOUT_SECS), renderer.load()).await {
                Ok(result) => result,
                Err(_) => Err(ViewerError::Load("timed out".to_string())),
            };
            // Driver gone means nobody is waiting
            let _ = done.send(Completion::Loaded(result));
        });
    }

    fn spawn_render(&self, request: RenderRequest, done: &mpsc::UnboundedSender<Completion>) {
        let renderer = Arc::clone(&self.renderer);
        let done = done.clone();

        tracing::trace!(page = request.page, scale = request.params.scale, "Render started");

        tokio::spawn(async move {
            let result = match timeout(
                Duration::from_secs(RENDER_TIMEOUT_SECS),
                renderer.render(request.page, request.params),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ViewerError::Timeout(request.page)),
            };
            let _ = done.send(Completion::Rendered { request, result });
        });
    }

    fn publish(&self) {
        let snapshot = self.viewer.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::types::{DocumentState, PageState, Rotation};
    use parking_lot::Mutex;

    /// Records every render it performs
    struct RecordingRenderer {
        pages: u32,
        delay: Duration,
        fail_load: bool,
        fail_page: Option<u32>,
        log: Mutex<Vec<RenderRequest>>,
    }

    impl RecordingRenderer {
        fn new(pages: u32) -> Self {
            Self {
                pages,
                delay: Duration::from_millis(10),
                fail_load: false,
                fail_page: None,
                log: Mutex::new(Vec::new()),
            }
        }

        fn renders_at(&self, params: RenderParams) -> Vec<u32> {
            let mut pages: Vec<u32> = self
                .log
                .lock()
                .iter()
                .filter(|r| r.params == params)
                .map(|r| r.page)
                .collect();
            pages.sort_unstable();
            pages
        }
    }

    #[async_trait]
    impl PageRenderer for RecordingRenderer {
        async fn load(&self) -> Result<u32, ViewerError> {
            if self.fail_load {
                return Err(ViewerError::Load("not a PDF".to_string()));
            }
            Ok(self.pages)
        }

        async fn render(&self, page: u32, params: RenderParams) -> Result<(), ViewerError> {
            tokio::time::sleep(self.delay).await;
            if self.fail_page == Some(page) {
                return Err(ViewerError::Render {
                    page,
                    message: "corrupt page stream".to_string(),
                });
            }
            self.log.lock().push(RenderRequest { page, params });
            Ok(())
        }
    }

    async fn wait_for(handle: &ViewerHandle, check: impl Fn(&ViewerSnapshot) -> bool) -> ViewerSnapshot {
        let mut rx = handle.subscribe();
        timeout(Duration::from_secs(5), async {
            loop {
                {
                    let snapshot = rx.borrow_and_update();
                    if check(&*snapshot) {
                        return snapshot.clone();
                    }
                }
                rx.changed().await.expect("driver stopped");
            }
        })
        .await
        .expect("viewer did not settle")
    }

    #[tokio::test]
    async fn test_open_renders_initial_pages() {
        let renderer = Arc::new(RecordingRenderer::new(8));
        let (handle, _task) = spawn_viewer(Arc::clone(&renderer));

        handle.send(ViewerCommand::Open).await.unwrap();
        let snapshot = wait_for(&handle, |s| s.page_count() == 8 && s.visible_settled()).await;

        assert_eq!(snapshot.visible_pages, vec![1, 2]);
        assert_eq!(renderer.renders_at(RenderParams::default()), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_zoom_rerenders_visible_pages_once() {
        let renderer = Arc::new(RecordingRenderer::new(8));
        let (handle, _task) = spawn_viewer(Arc::clone(&renderer));

        handle.send(ViewerCommand::Open).await.unwrap();
        wait_for(&handle, |s| s.page_count() == 8 && s.visible_settled()).await;

        handle.send(ViewerCommand::SetZoom(1.5)).await.unwrap();
        handle.send(ViewerCommand::SetZoom(1.5)).await.unwrap();
        handle
            .send(ViewerCommand::Visibility { page: 1, ratio: 1.0 })
            .await
            .unwrap();
        let snapshot = wait_for(&handle, |s| s.zoom == 1.5 && s.visible_settled()).await;

        assert_eq!(snapshot.visible_pages, vec![1, 2]);
        assert_eq!(
            renderer.renders_at(RenderParams::new(1.5, Rotation::Deg0)),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn test_page_failure_leaves_neighbours_rendering() {
        let mut renderer = RecordingRenderer::new(6);
        renderer.fail_page = Some(3);
        let renderer = Arc::new(renderer);
        let (handle, _task) = spawn_viewer(Arc::clone(&renderer));

        handle.send(ViewerCommand::Open).await.unwrap();
        wait_for(&handle, |s| s.page_count() == 6 && s.visible_settled()).await;

        handle
            .send(ViewerCommand::Visibility { page: 3, ratio: 1.0 })
            .await
            .unwrap();
        let page_is = |s: &ViewerSnapshot, page: u32, params: RenderParams| {
            s.pages[page as usize - 1] == PageState::Rendered { params }
        };
        let snapshot = wait_for(&handle, |s| {
            s.pages[2] == PageState::Failed
                && page_is(s, 2, RenderParams::default())
                && page_is(s, 4, RenderParams::default())
        })
        .await;
        assert_eq!(snapshot.visible_pages, vec![2, 3, 4]);
        assert_eq!(snapshot.document, DocumentState::Ready { page_count: 6 });

        // The driver keeps serving commands after the failure
        handle.send(ViewerCommand::ZoomIn).await.unwrap();
        let zoomed = RenderParams::new(1.25, Rotation::Deg0);
        let snapshot = wait_for(&handle, |s| {
            s.pages[2] == PageState::Failed && page_is(s, 2, zoomed) && page_is(s, 4, zoomed)
        })
        .await;
        assert_eq!(snapshot.document, DocumentState::Ready { page_count: 6 });
        assert_eq!(renderer.renders_at(zoomed), vec![2, 4]);
        assert!(!renderer.log.lock().iter().any(|r| r.page == 3));
    }

    #[tokio::test]
    async fn test_load_failure_is_published() {
        let mut renderer = RecordingRenderer::new(0);
        renderer.fail_load = true;
        let (handle, _task) = spawn_viewer(Arc::new(renderer));

        handle.send(ViewerCommand::Open).await.unwrap();
        let snapshot = wait_for(&handle, |s| matches!(s.document, DocumentState::Failed { .. })).await;
        assert!(snapshot.pages.is_empty());
    }

    #[tokio::test]
    async fn test_driver_stops_when_handles_drop() {
        let renderer = Arc::new(RecordingRenderer::new(1));
        let (handle, task) = spawn_viewer(renderer);
        drop(handle);
        timeout(Duration::from_secs(1), task)
            .await
            .expect("driver kept running")
            .unwrap();
    }
}
