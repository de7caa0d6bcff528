//! Splitter drag sessions.
//!
//! One session may be active at a time. While it runs, the document root
//! carries the `ih-resizing` class so host text selection and hover
//! effects stay out of the way; every exit path, including cancellation
//! and pointer-capture loss, clears it.

use kuchiki::NodeRef;

use crate::dom::{self, Page};
use crate::layout::set_flex_basis;
use crate::model::{LayoutState, PaneRole};
use crate::util::clamp;

pub const RESIZING_CLASS: &str = "ih-resizing";
pub const ACTIVE_CLASS: &str = "ih-active";

pub struct DragSession {
    splitter: NodeRef,
    left: NodeRef,
    right: NodeRef,
    left_role: PaneRole,
    right_role: PaneRole,
    left_start: f64,
    right_start: f64,
    start_x: f64,
    min_left: f64,
    min_right: f64,
    current_left: f64,
    current_right: f64,
}

#[derive(Default)]
pub struct Dragger {
    active: Option<DragSession>,
}

impl Dragger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a drag on a splitter between two panes. Ignored while
    /// another session runs.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &mut self,
        page: &Page,
        splitter: &NodeRef,
        left: &NodeRef,
        right: &NodeRef,
        left_role: PaneRole,
        right_role: PaneRole,
        min_left: f64,
        min_right: f64,
        start_x: f64,
    ) {
        if self.active.is_some() {
            return;
        }

        let left_start = page.rect_of(left).map(|r| r.width).unwrap_or(0.0);
        let right_start = page.rect_of(right).map(|r| r.width).unwrap_or(0.0);

        set_resizing(page, true);
        dom::add_class(splitter, ACTIVE_CLASS);

        self.active = Some(DragSession {
            splitter: splitter.clone(),
            left: left.clone(),
            right: right.clone(),
            left_role,
            right_role,
            left_start,
            right_start,
            start_x,
            min_left,
            min_right,
            current_left: left_start,
            current_right: right_start,
        });
    }

    /// Applies a pointer move: the left pane tracks the pointer within
    /// `[min_left, left_start + right_start - min_right]`, the right pane
    /// takes the remainder, immediately.
    pub fn update(&mut self, x: f64) {
        let Some(session) = self.active.as_mut() else {
            return;
        };
        let dx = x - session.start_x;
        let new_left = clamp(
            session.left_start + dx,
            session.min_left,
            session.left_start + session.right_start - session.min_right,
        );
        let new_right = session.left_start + session.right_start - new_left;

        set_flex_basis(&session.left, new_left);
        set_flex_basis(&session.right, new_right);
        session.current_left = new_left;
        session.current_right = new_right;
    }

    /// Pointer release: both widths become the session-remembered widths
    /// for their roles.
    pub fn finish(&mut self, page: &Page, state: &mut LayoutState) {
        let Some(session) = self.active.take() else {
            return;
        };
        dom::remove_class(&session.splitter, ACTIVE_CLASS);
        set_resizing(page, false);

        state.remember_width(session.left_role, session.current_left);
        state.remember_width(session.right_role, session.current_right);
    }

    /// Pointer cancel or capture loss: widths applied so far stay in the
    /// DOM but are not remembered.
    pub fn cancel(&mut self, page: &Page) {
        let Some(session) = self.active.take() else {
            return;
        };
        dom::remove_class(&session.splitter, ACTIVE_CLASS);
        set_resizing(page, false);
    }
}

fn set_resizing(page: &Page, on: bool) {
    if let Some(html) = dom::select_first(&page.document, "html") {
        if on {
            dom::add_class(&html, RESIZING_CLASS);
        } else {
            dom::remove_class(&html, RESIZING_CLASS);
        }
    }
}
