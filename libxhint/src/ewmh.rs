//! [Extended Window Manager Hints](https://specifications.freedesktop.org/wm-spec/latest/)
//!
//! [Root Window Properties](https://specifications.freedesktop.org/wm-spec/latest/ar01s03.html)
//! are maintained by the window manager and describe the desktops and the clients it manages.
//! [Application Window Properties](https://specifications.freedesktop.org/wm-spec/latest/ar01s05.html)
//! live on the client windows. Properties the window manager owns should be changed with the
//! matching `request_*` client message rather than set directly.
use tracing::debug;

use crate::{
    codec::{Icon, Record, Value},
    cookie::{Cookie, Mode, VoidCookie},
    model::*,
    transport::{Atom, StackMode, Timestamp, Transport, Window},
    WindowManager, WindowManagerResult,
};

impl<T: Transport> WindowManager<T> {
    // Root window properties
    //----------------------------------------------------------------------------------------------
    root_getter!(
        /// Get the hints the window manager supports
        "_NET_SUPPORTED" => get_supported, get_supported_unchecked -> Vec<Atom>
    );
    root_setter!("_NET_SUPPORTED" => set_supported_checked, set_supported_unchecked(atoms: &[Atom])
        = Value::Atoms(atoms.to_vec()));

    root_getter!(
        /// Get the managed windows in initial mapping order
        "_NET_CLIENT_LIST" => get_client_list, get_client_list_unchecked -> Vec<Window>
    );
    root_setter!("_NET_CLIENT_LIST" => set_client_list_checked, set_client_list_unchecked(windows: &[Window])
        = Value::Windows(windows.to_vec()));

    root_getter!(
        /// Get the managed windows in bottom to top stacking order
        "_NET_CLIENT_LIST_STACKING" => get_client_list_stacking, get_client_list_stacking_unchecked -> Vec<Window>
    );
    root_setter!("_NET_CLIENT_LIST_STACKING" => set_client_list_stacking_checked,
        set_client_list_stacking_unchecked(windows: &[Window]) = Value::Windows(windows.to_vec()));

    root_getter!(
        /// Get number of desktops
        "_NET_NUMBER_OF_DESKTOPS" => get_number_of_desktops, get_number_of_desktops_unchecked -> u32
    );
    root_setter!("_NET_NUMBER_OF_DESKTOPS" => set_number_of_desktops_checked,
        set_number_of_desktops_unchecked(number: u32) = Value::Cardinal(number));

    root_getter!(
        /// Get the size of the large desktop, equal to the screen size without viewports
        "_NET_DESKTOP_GEOMETRY" => get_desktop_geometry, get_desktop_geometry_unchecked -> DesktopGeometry
    );
    root_setter!("_NET_DESKTOP_GEOMETRY" => set_desktop_geometry_checked,
        set_desktop_geometry_unchecked(geometry: DesktopGeometry) = Value::Record(Record::from(geometry)));

    root_getter!(
        /// Get the top left corner of each desktop's viewport
        "_NET_DESKTOP_VIEWPORT" => get_desktop_viewport, get_desktop_viewport_unchecked -> Vec<Viewport>
    );
    root_setter!("_NET_DESKTOP_VIEWPORT" => set_desktop_viewport_checked,
        set_desktop_viewport_unchecked(viewports: &[Viewport])
        = Value::Records(viewports.iter().map(|x| Record::from(*x)).collect()));

    root_getter!(
        /// Get the index of the current desktop, starting from 0
        "_NET_CURRENT_DESKTOP" => get_current_desktop, get_current_desktop_unchecked -> u32
    );
    root_setter!("_NET_CURRENT_DESKTOP" => set_current_desktop_checked,
        set_current_desktop_unchecked(desktop: u32) = Value::Cardinal(desktop));

    root_getter!(
        /// Get the desktop names, there may be fewer names than desktops
        ///
        /// ### Examples
        /// ```ignore
        /// use libxhint::prelude::*;
        /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
        /// let names = wm.get_desktop_names().unwrap().reply().unwrap();
        /// ```
        "_NET_DESKTOP_NAMES" => get_desktop_names, get_desktop_names_unchecked -> Vec<String>
    );
    root_setter!("_NET_DESKTOP_NAMES" => set_desktop_names_checked, set_desktop_names_unchecked(names: &[String])
        = Value::Texts(names.to_vec()));

    root_getter!(
        /// Get the active window id
        "_NET_ACTIVE_WINDOW" => get_active_window, get_active_window_unchecked -> Window
    );
    root_setter!("_NET_ACTIVE_WINDOW" => set_active_window_checked, set_active_window_unchecked(window: Window)
        = Value::Window(window));

    root_getter!(
        /// Get the work area of each desktop, the screen minus panels and docks
        "_NET_WORKAREA" => get_workarea, get_workarea_unchecked -> Vec<Workarea>
    );
    root_setter!("_NET_WORKAREA" => set_workarea_checked, set_workarea_unchecked(areas: &[Workarea])
        = Value::Records(areas.iter().map(|x| Record::from(*x)).collect()));

    root_getter!(
        /// Get the child window the window manager created to show it's running
        "_NET_SUPPORTING_WM_CHECK" => get_supporting_wm_check, get_supporting_wm_check_unchecked -> Window
    );

    root_getter!("_NET_VIRTUAL_ROOTS" => get_virtual_roots, get_virtual_roots_unchecked -> Vec<Window>);
    root_setter!("_NET_VIRTUAL_ROOTS" => set_virtual_roots_checked, set_virtual_roots_unchecked(windows: &[Window])
        = Value::Windows(windows.to_vec()));

    root_getter!(
        /// Get how pagers should lay out the desktops
        "_NET_DESKTOP_LAYOUT" => get_desktop_layout, get_desktop_layout_unchecked -> DesktopLayout
    );
    root_setter!("_NET_DESKTOP_LAYOUT" => set_desktop_layout_checked,
        set_desktop_layout_unchecked(layout: DesktopLayout) = Value::Record(Record::from(layout)));

    root_setter!("_NET_SHOWING_DESKTOP" => set_showing_desktop_checked,
        set_showing_desktop_unchecked(showing: bool) = Value::Cardinal(showing as u32));

    /// Get whether the window manager is in show the desktop mode
    pub fn get_showing_desktop(&self) -> WindowManagerResult<Cookie<'_, T, bool>> {
        Ok(self.property::<u32>(self.root(), "_NET_SHOWING_DESKTOP", Mode::Checked)?.map(|x| Ok(x != 0)))
    }

    /// Announce `window` as the supporting window manager check window. The property is set on
    /// both the root window and the check window itself.
    pub fn set_supporting_wm_check_checked(&self, window: Window) -> WindowManagerResult<()> {
        let value = Value::Window(window);
        let root = self.put_property(self.root(), "_NET_SUPPORTING_WM_CHECK", &value, Mode::Checked)?;
        let child = self.put_property(window, "_NET_SUPPORTING_WM_CHECK", &value, Mode::Checked)?;
        root.check()?;
        child.check()
    }

    pub fn set_supporting_wm_check_unchecked(&self, window: Window) -> WindowManagerResult<()> {
        let value = Value::Window(window);
        drop(self.put_property(self.root(), "_NET_SUPPORTING_WM_CHECK", &value, Mode::Unchecked)?);
        drop(self.put_property(window, "_NET_SUPPORTING_WM_CHECK", &value, Mode::Unchecked)?);
        Ok(())
    }

    // Root window messages
    //----------------------------------------------------------------------------------------------
    request!(
        /// Ask the window manager to change the number of desktops
        "_NET_NUMBER_OF_DESKTOPS" => request_number_of_desktops, request_number_of_desktops_checked(number: u32)
        about root, [number]
    );

    request!(
        /// Ask the window manager to change the desktop size
        "_NET_DESKTOP_GEOMETRY" => request_desktop_geometry, request_desktop_geometry_checked(width: u32, height: u32)
        about root, [width, height]
    );

    request!(
        /// Ask the window manager to move the viewport of the current desktop
        "_NET_DESKTOP_VIEWPORT" => request_desktop_viewport, request_desktop_viewport_checked(x: u32, y: u32)
        about root, [x, y]
    );

    request!(
        /// Switch to the given desktop
        ///
        /// ### Arguments
        /// * `desktop` - index of the desktop to switch to
        /// * `timestamp` - time of the user action that caused the switch, `CURRENT_TIME` if unknown
        ///
        /// ### Examples
        /// ```ignore
        /// use libxhint::prelude::*;
        /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
        /// wm.request_current_desktop_checked(1, CURRENT_TIME).unwrap().check().unwrap();
        /// ```
        "_NET_CURRENT_DESKTOP" => request_current_desktop,
            request_current_desktop_checked(desktop: u32, timestamp: Timestamp)
        about root, [desktop, timestamp]
    );

    request!(
        /// Ask the window manager to activate the window
        ///
        /// ### Arguments
        /// * `window` - window to activate
        /// * `source` - who is asking, pagers should say so
        /// * `timestamp` - time of the user action that caused the request
        /// * `current` - the requestor's currently active window, `NONE` if there is none
        "_NET_ACTIVE_WINDOW" => request_active_window,
            request_active_window_checked(window: Window, source: Source, timestamp: Timestamp, current: Window)
        about window, [u32::from(source), timestamp, current]
    );

    request!(
        /// Enter or leave show the desktop mode
        "_NET_SHOWING_DESKTOP" => request_showing_desktop, request_showing_desktop_checked(showing: bool)
        about root, [showing as u32]
    );

    request!(
        /// Ask the window manager to close the window
        "_NET_CLOSE_WINDOW" => request_close_window,
            request_close_window_checked(window: Window, timestamp: Timestamp, source: Source)
        about window, [timestamp, u32::from(source)]
    );

    request!(
        /// Start an interactive move or resize of the window, e.g. from a client side decoration
        "_NET_WM_MOVERESIZE" => request_wm_moveresize, request_wm_moveresize_checked(
            window: Window, x_root: i32, y_root: i32, direction: MoveResizeDirection, button: u32, source: Source
        )
        about window, [x_root as u32, y_root as u32, u32::from(direction), button, u32::from(source)]
    );

    request!(
        /// Ask the window manager to restack the window relative to the sibling
        "_NET_RESTACK_WINDOW" => request_restack_window,
            request_restack_window_checked(window: Window, source: Source, sibling: Window, stack_mode: StackMode)
        about window, [u32::from(source), sibling, u32::from(stack_mode)]
    );

    request!(
        /// Ask the window manager to set `_NET_FRAME_EXTENTS` before the window is mapped
        "_NET_REQUEST_FRAME_EXTENTS" => request_frame_extents, request_frame_extents_checked(window: Window)
        about window, []
    );

    request!(
        /// Move the window to another desktop, `0xFFFFFFFF` shows it on all desktops
        "_NET_WM_DESKTOP" => request_wm_desktop,
            request_wm_desktop_checked(window: Window, desktop: u32, source: Source)
        about window, [desktop, u32::from(source)]
    );

    /// Move and resize the given window through the window manager
    ///
    /// ### Arguments
    /// * `window` - id of the window to manipulate
    /// * `gravity` - gravity to use when resizing the window, defaults to NorthWest
    /// * `source` - who is asking
    /// * `x` - x coordinate to use for the window during positioning
    /// * `y` - y coordinate to use for the window during positioning
    /// * `w` - width to resize the window to
    /// * `h` - height to resize the window to
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.request_moveresize_window(12345, None, Source::Pager, Some(0), Some(0), Some(500), Some(500)).unwrap();
    /// ```
    pub fn request_moveresize_window(
        &self, window: Window, gravity: Option<WinGravity>, source: Source, x: Option<i32>, y: Option<i32>,
        w: Option<u32>, h: Option<u32>,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.moveresize_window_with(window, gravity, source, x, y, w, h, Mode::Unchecked)
    }

    pub fn request_moveresize_window_checked(
        &self, window: Window, gravity: Option<WinGravity>, source: Source, x: Option<i32>, y: Option<i32>,
        w: Option<u32>, h: Option<u32>,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.moveresize_window_with(window, gravity, source, x, y, w, h, Mode::Checked)
    }

    #[allow(clippy::too_many_arguments)]
    fn moveresize_window_with(
        &self, window: Window, gravity: Option<WinGravity>, source: Source, x: Option<i32>, y: Option<i32>,
        w: Option<u32>, h: Option<u32>, mode: Mode,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        // Gravity is the lower byte, the second byte flags which values are present and bits
        // 12 to 15 carry the source indication.
        let mut flags = u32::from(gravity.unwrap_or(WinGravity::NorthWest)) | (u32::from(source) << 12);
        if x.is_some() {
            flags |= MOVE_RESIZE_WINDOW_X;
        }
        if y.is_some() {
            flags |= MOVE_RESIZE_WINDOW_Y;
        }
        if w.is_some() {
            flags |= MOVE_RESIZE_WINDOW_WIDTH;
        }
        if h.is_some() {
            flags |= MOVE_RESIZE_WINDOW_HEIGHT;
        }
        let data = [flags, x.unwrap_or(0) as u32, y.unwrap_or(0) as u32, w.unwrap_or(0), h.unwrap_or(0)];
        debug!("moveresize_window: id: {}, g: {:?}, x: {:?}, y: {:?}, w: {:?}, h: {:?}", window, gravity, x, y, w, h);
        self.root_send_client_event(window, "_NET_MOVERESIZE_WINDOW", &data, mode)
    }

    /// Add, remove or toggle up to two states of the window
    ///
    /// ### Arguments
    /// * `window` - id of the window to manipulate
    /// * `action` - what to do with the states
    /// * `first` - state to change
    /// * `second` - optional second state changed together with the first, e.g. both maximized states
    /// * `source` - who is asking
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.request_wm_state(12345, StateAction::Add, &WinState::MaxVert, Some(&WinState::MaxHorz), Source::Pager)
    ///     .unwrap();
    /// ```
    pub fn request_wm_state(
        &self, window: Window, action: StateAction, first: &WinState, second: Option<&WinState>, source: Source,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.wm_state_with(window, action, first, second, source, Mode::Unchecked)
    }

    pub fn request_wm_state_checked(
        &self, window: Window, action: StateAction, first: &WinState, second: Option<&WinState>, source: Source,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.wm_state_with(window, action, first, second, source, Mode::Checked)
    }

    fn wm_state_with(
        &self, window: Window, action: StateAction, first: &WinState, second: Option<&WinState>, source: Source,
        mode: Mode,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        let first = self.atom(&first.atom_name())?;
        let second = match second {
            Some(state) => self.atom(&state.atom_name())?,
            None => 0,
        };
        let data = [u32::from(action), first, second, u32::from(source)];
        self.root_send_client_event(window, "_NET_WM_STATE", &data, mode)
    }

    // Application window properties
    //----------------------------------------------------------------------------------------------
    window_getter!(
        /// Get the window title in UTF-8
        "_NET_WM_NAME" => get_wm_name, get_wm_name_unchecked -> String
    );
    window_setter!("_NET_WM_NAME" => set_wm_name_checked, set_wm_name_unchecked(name: &str)
        = Value::Text(name.to_owned()));

    window_getter!(
        /// Get the title the window manager displays, e.g. with a counter appended to duplicates
        "_NET_WM_VISIBLE_NAME" => get_wm_visible_name, get_wm_visible_name_unchecked -> String
    );
    window_setter!("_NET_WM_VISIBLE_NAME" => set_wm_visible_name_checked, set_wm_visible_name_unchecked(name: &str)
        = Value::Text(name.to_owned()));

    window_getter!("_NET_WM_ICON_NAME" => get_wm_icon_name, get_wm_icon_name_unchecked -> String);
    window_setter!("_NET_WM_ICON_NAME" => set_wm_icon_name_checked, set_wm_icon_name_unchecked(name: &str)
        = Value::Text(name.to_owned()));

    window_getter!("_NET_WM_VISIBLE_ICON_NAME" => get_wm_visible_icon_name, get_wm_visible_icon_name_unchecked
        -> String);
    window_setter!("_NET_WM_VISIBLE_ICON_NAME" => set_wm_visible_icon_name_checked,
        set_wm_visible_icon_name_unchecked(name: &str) = Value::Text(name.to_owned()));

    window_getter!(
        /// Get the desktop the window is on, `0xFFFFFFFF` means all desktops
        "_NET_WM_DESKTOP" => get_wm_desktop, get_wm_desktop_unchecked -> u32
    );
    window_setter!("_NET_WM_DESKTOP" => set_wm_desktop_checked, set_wm_desktop_unchecked(desktop: u32)
        = Value::Cardinal(desktop));

    window_getter!(
        /// Get the functional type atoms of the window, most preferred first
        "_NET_WM_WINDOW_TYPE" => get_wm_window_type, get_wm_window_type_unchecked -> Vec<Atom>
    );
    window_setter!("_NET_WM_WINDOW_TYPE" => set_wm_window_type_checked, set_wm_window_type_unchecked(types: &[Atom])
        = Value::Atoms(types.to_vec()));

    window_getter!(
        /// Get the state atoms of the window
        "_NET_WM_STATE" => get_wm_state, get_wm_state_unchecked -> Vec<Atom>
    );
    window_setter!("_NET_WM_STATE" => set_wm_state_checked, set_wm_state_unchecked(states: &[Atom])
        = Value::Atoms(states.to_vec()));

    window_getter!(
        /// Get the actions the window manager allows on the window
        "_NET_WM_ALLOWED_ACTIONS" => get_wm_allowed_actions, get_wm_allowed_actions_unchecked -> Vec<Atom>
    );
    window_setter!("_NET_WM_ALLOWED_ACTIONS" => set_wm_allowed_actions_checked,
        set_wm_allowed_actions_unchecked(actions: &[Atom]) = Value::Atoms(actions.to_vec()));

    window_getter!(
        /// Get the space the window reserves at the edges of the screen
        "_NET_WM_STRUT" => get_wm_strut, get_wm_strut_unchecked -> Strut
    );
    window_setter!("_NET_WM_STRUT" => set_wm_strut_checked, set_wm_strut_unchecked(strut: Strut)
        = Value::Record(Record::from(strut)));

    window_getter!(
        /// Get the space the window reserves along part of the screen edges
        "_NET_WM_STRUT_PARTIAL" => get_wm_strut_partial, get_wm_strut_partial_unchecked -> StrutPartial
    );
    window_setter!("_NET_WM_STRUT_PARTIAL" => set_wm_strut_partial_checked,
        set_wm_strut_partial_unchecked(strut: StrutPartial) = Value::Record(Record::from(strut)));

    window_getter!("_NET_WM_ICON_GEOMETRY" => get_wm_icon_geometry, get_wm_icon_geometry_unchecked -> IconGeometry);
    window_setter!("_NET_WM_ICON_GEOMETRY" => set_wm_icon_geometry_checked,
        set_wm_icon_geometry_unchecked(geometry: IconGeometry) = Value::Record(Record::from(geometry)));

    window_getter!(
        /// Get the window's icons
        "_NET_WM_ICON" => get_wm_icon, get_wm_icon_unchecked -> Vec<Icon>
    );
    window_setter!("_NET_WM_ICON" => set_wm_icon_checked, set_wm_icon_unchecked(icons: &[Icon])
        = Value::Icons(icons.to_vec()));

    window_getter!(
        /// Get the process id of the client owning the window
        "_NET_WM_PID" => get_wm_pid, get_wm_pid_unchecked -> u32
    );
    window_setter!("_NET_WM_PID" => set_wm_pid_checked, set_wm_pid_unchecked(pid: u32) = Value::Cardinal(pid));

    window_getter!("_NET_WM_USER_TIME" => get_wm_user_time, get_wm_user_time_unchecked -> u32);
    window_setter!("_NET_WM_USER_TIME" => set_wm_user_time_checked, set_wm_user_time_unchecked(time: Timestamp)
        = Value::Cardinal(time));

    window_getter!(
        /// Get window frame border values added by the window manager
        "_NET_FRAME_EXTENTS" => get_frame_extents, get_frame_extents_unchecked -> FrameExtents
    );
    window_setter!("_NET_FRAME_EXTENTS" => set_frame_extents_checked, set_frame_extents_unchecked(extents: FrameExtents)
        = Value::Record(Record::from(extents)));

    /// Get the window opacity between 0.0 and 1.0
    pub fn get_wm_window_opacity(&self, window: Window) -> WindowManagerResult<Cookie<'_, T, f64>> {
        Ok(self.property::<u32>(window, "_NET_WM_WINDOW_OPACITY", Mode::Checked)?.map(|x| Ok(opacity_from(x))))
    }

    pub fn set_wm_window_opacity_checked(&self, window: Window, opacity: f64) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.put_property(window, "_NET_WM_WINDOW_OPACITY", &Value::Cardinal(opacity_to(opacity)), Mode::Checked)
    }

    pub fn set_wm_window_opacity_unchecked(
        &self, window: Window, opacity: f64,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.put_property(window, "_NET_WM_WINDOW_OPACITY", &Value::Cardinal(opacity_to(opacity)), Mode::Unchecked)
    }
}

// Opacity is stored as a fraction of 0xFFFFFFFF
fn opacity_from(val: u32) -> f64 {
    val as f64 / u32::MAX as f64
}

fn opacity_to(opacity: f64) -> u32 {
    (opacity.clamp(0.0, 1.0) * u32::MAX as f64).round() as u32
}
