//! Overlay (tapjacking) signal
//!
//! The host reports whether the screen's touches may be intercepted by an
//! overlay window. The signal is read on every toggle and never cached.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Trait for the host's touch-obscured signal
pub trait OverlayGuard: Send + Sync {
    /// Whether the last touch arrived through an obscuring overlay
    fn is_touch_obscured(&self) -> bool;

    /// Tell the user why their toggle was ignored
    fn present_overlay_warning(&self);
}

/// Guard for hosts without overlay detection
#[derive(Debug, Default)]
pub struct NeverObscured;

impl OverlayGuard for NeverObscured {
    fn is_touch_obscured(&self) -> bool {
        false
    }

    fn present_overlay_warning(&self) {}
}

/// Guard backed by a flag the host flips from its input layer
#[derive(Debug, Default)]
pub struct FlagOverlayGuard {
    obscured: AtomicBool,
    warnings: AtomicUsize,
}

impl FlagOverlayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the obscured state
    pub fn set_obscured(&self, obscured: bool) {
        self.obscured.store(obscured, Ordering::SeqCst);
    }

    /// How many overlay warnings were presented
    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::SeqCst)
    }
}

impl OverlayGuard for FlagOverlayGuard {
    fn is_touch_obscured(&self) -> bool {
        self.obscured.load(Ordering::SeqCst)
    }

    fn present_overlay_warning(&self) {
        self.warnings.fetch_add(1, Ordering::SeqCst);
        tracing::warn!("Touch obscured by overlay, toggle ignored");
    }
}
