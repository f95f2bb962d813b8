//! [Inter-Client Communication Conventions](https://x.org/releases/X11R7.6/doc/xorg-docs/specs/ICCCM/icccm.html)
//!
//! The older client properties EWMH builds on. Names that clash with their EWMH counterparts carry
//! an `icccm` prefix, e.g. `get_icccm_name` reads `WM_NAME` while `get_wm_name` reads
//! `_NET_WM_NAME`.
use tracing::debug;
use x11rb::protocol::xproto::EventMask;

use crate::{
    codec::{Record, Value},
    cookie::{Cookie, Mode, VoidCookie},
    event::ClientMessage,
    model::*,
    transport::{Atom, Timestamp, Transport, Window},
    WindowManager, WindowManagerResult,
};

impl<T: Transport> WindowManager<T> {
    window_getter!(
        /// Get the Latin-1 window title
        "WM_NAME" => get_icccm_name, get_icccm_name_unchecked -> String
    );
    window_setter!("WM_NAME" => set_icccm_name_checked, set_icccm_name_unchecked(name: &str)
        = Value::Text(name.to_owned()));

    window_getter!("WM_ICON_NAME" => get_icccm_icon_name, get_icccm_icon_name_unchecked -> String);
    window_setter!("WM_ICON_NAME" => set_icccm_icon_name_checked, set_icccm_icon_name_unchecked(name: &str)
        = Value::Text(name.to_owned()));

    window_getter!(
        /// Get the size constraints of the window, the 15 field pre ICCCM 1.0 form is accepted
        "WM_NORMAL_HINTS" => get_wm_normal_hints, get_wm_normal_hints_unchecked -> SizeHints
    );
    window_setter!("WM_NORMAL_HINTS" => set_wm_normal_hints_checked, set_wm_normal_hints_unchecked(hints: SizeHints)
        = Value::Record(Record::from(hints)));

    window_getter!(
        /// Get the input, initial state, icon and urgency hints of the window
        ///
        /// ### Examples
        /// ```ignore
        /// use libxhint::prelude::*;
        /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
        /// let urgent = wm.get_wm_hints(12345).unwrap().reply().unwrap().is_urgent();
        /// ```
        "WM_HINTS" => get_wm_hints, get_wm_hints_unchecked -> WmHints
    );
    window_setter!("WM_HINTS" => set_wm_hints_checked, set_wm_hints_unchecked(hints: WmHints)
        = Value::Record(Record::from(hints)));

    window_getter!(
        /// Get window instance and class, the class ends up being the application's name
        "WM_CLASS" => get_wm_class, get_wm_class_unchecked -> WmClass
    );
    window_setter!("WM_CLASS" => set_wm_class_checked, set_wm_class_unchecked(class: &WmClass) = Value::from(class));

    window_getter!(
        /// Get the window the dialog or transient window belongs to
        "WM_TRANSIENT_FOR" => get_wm_transient_for, get_wm_transient_for_unchecked -> Window
    );
    window_setter!("WM_TRANSIENT_FOR" => set_wm_transient_for_checked, set_wm_transient_for_unchecked(owner: Window)
        = Value::Window(owner));

    window_getter!(
        /// Get the protocols the client takes part in, e.g. `WM_DELETE_WINDOW`
        "WM_PROTOCOLS" => get_wm_protocols, get_wm_protocols_unchecked -> WmProtocols
    );
    window_setter!("WM_PROTOCOLS" => set_wm_protocols_checked, set_wm_protocols_unchecked(protocols: &[Atom])
        = Value::Atoms(protocols.to_vec()));

    window_getter!("WM_CLIENT_MACHINE" => get_wm_client_machine, get_wm_client_machine_unchecked -> String);
    window_setter!("WM_CLIENT_MACHINE" => set_wm_client_machine_checked, set_wm_client_machine_unchecked(host: &str)
        = Value::Text(host.to_owned()));

    window_getter!("WM_COLORMAP_WINDOWS" => get_wm_colormap_windows, get_wm_colormap_windows_unchecked
        -> Vec<Window>);
    window_setter!("WM_COLORMAP_WINDOWS" => set_wm_colormap_windows_checked,
        set_wm_colormap_windows_unchecked(windows: &[Window]) = Value::Windows(windows.to_vec()));

    window_getter!(
        /// Get the state the window manager keeps for the client, withdrawn, normal or iconic
        "WM_STATE" => get_icccm_state, get_icccm_state_unchecked -> WmState
    );
    window_setter!("WM_STATE" => set_icccm_state_checked, set_icccm_state_unchecked(state: WmState)
        = Value::Record(Record::from(state)));

    /// Check whether the client takes part in the given protocol
    pub fn supports_protocol(&self, window: Window, protocol: &str) -> WindowManagerResult<bool> {
        let atom = self.atom(protocol)?;
        let protocols: Cookie<'_, T, WmProtocols> = self.get_wm_protocols(window)?;
        Ok(protocols.reply()?.contains(&atom))
    }

    /// Ask the client to close the window with the `WM_DELETE_WINDOW` protocol. Unlike
    /// `request_close_window` this goes straight to the client, no window manager involved.
    pub fn send_delete_window(&self, window: Window, timestamp: Timestamp) -> WindowManagerResult<VoidCookie<'_, T>> {
        let type_ = self.atom("WM_PROTOCOLS")?;
        let delete = self.atom("WM_DELETE_WINDOW")?;
        let msg = ClientMessage::new(window, type_, &[delete, timestamp]);
        debug!("send_delete_window: win: {}", window);
        self.send_event(window, EventMask::NO_EVENT, msg.encode(self.byte_order()), false)
    }
}
