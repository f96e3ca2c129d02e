//! Rendering collaborators.
//!
//! The conversation surface never paints anything itself. It talks to a
//! [`RenderSurface`] that owns the bubbles and to a [`MarkupRenderer`] that
//! turns message text into whatever markup the surface displays.

use crate::mode::Mode;
use crate::session::SessionSummary;

/// Who a bubble belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BubbleRole {
    User,
    Assistant,
}

/// Opaque handle to a rendered bubble, issued by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BubbleHandle(pub u64);

/// The surface that displays bubbles and reports state changes to the user.
///
/// Methods take `&self`; implementations use interior mutability since
/// pollers update bubbles from background tasks.
pub trait RenderSurface: Send + Sync {
    /// Appends a bubble and returns a handle for later in-place updates.
    fn render_bubble(&self, content: &str, role: BubbleRole) -> BubbleHandle;

    /// Replaces the content of an existing bubble.
    fn update_bubble(&self, handle: BubbleHandle, content: &str);

    /// Removes every bubble.
    fn clear(&self);

    /// The submission mode changed (placeholder text, tool affordances).
    fn mode_changed(&self, _mode: &Mode) {}

    /// The session list was refreshed.
    fn sessions_changed(&self, _sessions: &[SessionSummary]) {}
}

/// Converts message text into display markup.
pub trait MarkupRenderer: Send + Sync {
    fn to_markup(&self, text: &str) -> String;
}

/// A [`MarkupRenderer`] that displays text as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl MarkupRenderer for PlainText {
    fn to_markup(&self, text: &str) -> String {
        text.to_string()
    }
}
