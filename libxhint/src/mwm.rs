//! Motif window manager hints, `_MOTIF_WM_HINTS` is still the de facto way for a client to ask
//! for an undecorated window.
use tracing::debug;

use crate::{
    codec::{Record, Value},
    cookie::{Cookie, Mode, VoidCookie},
    model::MotifHints,
    transport::{Transport, Window},
    WindowManager, WindowManagerResult,
};

impl<T: Transport> WindowManager<T> {
    window_getter!("_MOTIF_WM_HINTS" => get_motif_hints, get_motif_hints_unchecked -> MotifHints);
    window_setter!("_MOTIF_WM_HINTS" => set_motif_hints_checked, set_motif_hints_unchecked(hints: MotifHints)
        = Value::Record(Record::from(hints)));

    /// Ask the window manager to draw or drop the window's decorations
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.set_decorations_checked(12345, false).unwrap().check().unwrap();
    /// ```
    pub fn set_decorations_checked(&self, window: Window, decorated: bool) -> WindowManagerResult<VoidCookie<'_, T>> {
        debug!("set_decorations: win: {}, decorated: {}", window, decorated);
        self.set_motif_hints_checked(window, MotifHints::with_decorations(decorated))
    }

    pub fn set_decorations_unchecked(&self, window: Window, decorated: bool) -> WindowManagerResult<VoidCookie<'_, T>> {
        debug!("set_decorations: win: {}, decorated: {}", window, decorated);
        self.set_motif_hints_unchecked(window, MotifHints::with_decorations(decorated))
    }

    /// Whether the client asked for decorations, None when it left them to the window manager or
    /// never set the hints
    pub fn decorated(&self, window: Window) -> WindowManagerResult<Option<bool>> {
        match self.get_motif_hints(window)?.reply() {
            Ok(hints) => Ok(hints.decorated()),
            Err(err) if err.is_malformed() || err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}
