// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scroll position and unread bookkeeping for an open conversation thread.
//!
//! The tracker does not scroll anything itself. Each input returns the
//! scroll the renderer should perform, if any.

use serde::Serialize;
use strum::Display;

/// Where the reader is in the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScrollState {
    AtBottom,
    ScrolledUp,
}

/// How the renderer should move to the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Jump without animation.
    Instant,
    /// Animated scroll.
    Smooth,
}

#[derive(Debug, Clone)]
pub struct ScrollTracker {
    threshold_px: f64,
    state: ScrollState,
    unread: usize,
    message_count: usize,
    rendered: bool,
}

impl ScrollTracker {
    /// `threshold_px` is the distance from the bottom still counted as
    /// "at the bottom".
    pub fn new(threshold_px: f64) -> Self {
        Self {
            threshold_px: threshold_px.max(0.0),
            state: ScrollState::AtBottom,
            unread: 0,
            message_count: 0,
            rendered: false,
        }
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Messages that arrived while scrolled up.
    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }

    /// First render pass. Scrolls instantly to the bottom exactly once.
    pub fn on_first_render(&mut self, message_count: usize) -> Option<ScrollBehavior> {
        if self.rendered {
            return None;
        }
        self.rendered = true;
        self.message_count = message_count;
        self.state = ScrollState::AtBottom;
        self.unread = 0;
        Some(ScrollBehavior::Instant)
    }

    /// The reader scrolled; `distance_from_bottom` is in pixels.
    pub fn on_scroll(&mut self, distance_from_bottom: f64) {
        if distance_from_bottom.is_nan() {
            return;
        }
        match self.state {
            ScrollState::AtBottom if distance_from_bottom > self.threshold_px => {
                self.state = ScrollState::ScrolledUp;
            }
            ScrollState::ScrolledUp if distance_from_bottom <= self.threshold_px => {
                self.settle_at_bottom();
            }
            _ => {}
        }
    }

    /// The reader clicked "jump to bottom".
    pub fn jump_to_bottom(&mut self) -> ScrollBehavior {
        self.settle_at_bottom();
        ScrollBehavior::Smooth
    }

    /// The thread now holds `count` messages.
    ///
    /// Growth while at the bottom follows the new messages; growth while
    /// scrolled up only counts them. A shrinking count means another thread
    /// was opened and resets the tracker to the bottom.
    pub fn on_message_count(&mut self, count: usize) -> Option<ScrollBehavior> {
        let previous = self.message_count;
        self.message_count = count;

        if count < previous {
            self.settle_at_bottom();
            return Some(ScrollBehavior::Instant);
        }
        let added = count - previous;
        if added == 0 {
            return None;
        }
        match self.state {
            ScrollState::AtBottom => Some(ScrollBehavior::Smooth),
            ScrollState::ScrolledUp => {
                self.unread += added;
                None
            }
        }
    }

    fn settle_at_bottom(&mut self) {
        self.state = ScrollState::AtBottom;
        self.unread = 0;
    }
}
