//! Placeholder bubbles as a three-state result cell.
//!
//! A placeholder is rendered optimistically and then replaced in place. Once
//! it reached `Resolved` or `Errored` no further update reaches the surface,
//! so a stale in-progress read can never overwrite a final rendering.

use aivast_core::render::{BubbleHandle, BubbleRole, RenderSurface};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Pending,
    Resolved,
    Errored,
}

impl CellState {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// An assistant bubble awaiting its final content.
///
/// Owned by exactly one task at a time; that task is the only writer.
pub struct Placeholder {
    surface: Arc<dyn RenderSurface>,
    handle: BubbleHandle,
    state: CellState,
    showing_progress: bool,
}

impl Placeholder {
    /// Renders a new assistant bubble with `content`.
    pub fn open(surface: Arc<dyn RenderSurface>, content: &str) -> Self {
        let handle = surface.render_bubble(content, BubbleRole::Assistant);
        Self {
            surface,
            handle,
            state: CellState::Pending,
            showing_progress: false,
        }
    }

    /// Renders a new bubble that already shows an in-progress indicator.
    pub fn open_in_progress(surface: Arc<dyn RenderSurface>, content: &str) -> Self {
        let mut placeholder = Self::open(surface, content);
        placeholder.showing_progress = true;
        placeholder
    }

    pub fn handle(&self) -> BubbleHandle {
        self.handle
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    /// Shows the in-progress indicator once.
    ///
    /// Later calls leave the bubble alone so any disclosure the user opened
    /// inside it survives. Returns whether the surface was updated.
    pub fn show_progress(&mut self, content: &str) -> bool {
        if self.state.is_final() || self.showing_progress {
            return false;
        }
        self.surface.update_bubble(self.handle, content);
        self.showing_progress = true;
        true
    }

    /// Replaces the bubble with its final content.
    pub fn resolve(&mut self, content: &str) -> bool {
        self.finish(CellState::Resolved, content)
    }

    /// Replaces the bubble with a failure notice.
    pub fn fail(&mut self, content: &str) -> bool {
        self.finish(CellState::Errored, content)
    }

    fn finish(&mut self, state: CellState, content: &str) -> bool {
        if self.state.is_final() {
            return false;
        }
        self.surface.update_bubble(self.handle, content);
        self.state = state;
        true
    }
}

impl std::fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Placeholder")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("showing_progress", &self.showing_progress)
            .finish()
    }
}
