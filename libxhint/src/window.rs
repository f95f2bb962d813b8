//! Helpers for working with client windows: plain protocol queries wrapped in cookies plus the
//! composite `win_*` lookups that pick the best available source for a value.
//!
//! Window managers reparent clients into frames so the geometry of the client alone misses the
//! decorations. Most put the decorations in the parent, KWin puts them in the grand-parent, see
//! [`FrameStyle`].
use std::convert::TryFrom;
use tracing::debug;

use crate::{
    cookie::{Cookie, Mode, VoidCookie},
    model::*,
    transport::{
        AllowMode, GeometryReply, Reply, Request, RevertTo, StackMode, Timestamp, Transport, Window,
        WindowAttributes, CURRENT_TIME, NONE,
    },
    WindowManager, WindowManagerError, WindowManagerResult,
};

/// FrameStyle says where the window manager keeps the decorations of a client
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FrameStyle {
    /// No frame, the client geometry is used as is
    None,
    /// Decorations live in the parent, e.g. Openbox
    #[default]
    Parent,
    /// Decorations live in the parent's parent, e.g. KWin
    Grandparent,
}

/// Changes for `configure_window`, unset values are left alone
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_width: Option<u32>,
    pub sibling: Option<Window>,
    pub stack_mode: Option<StackMode>,
}

impl<T: Transport> WindowManager<T> {
    // Protocol queries
    //----------------------------------------------------------------------------------------------

    /// Get the class, map state and event masks of the window
    pub fn get_window_attributes(&self, window: Window) -> WindowManagerResult<Cookie<'_, T, WindowAttributes>> {
        self.engine.issue(Request::GetWindowAttributes { window }, Mode::Checked, |reply| match reply {
            Reply::WindowAttributes(attr) => Ok(attr),
            _ => Err(WindowManagerError::UnexpectedReply("GetWindowAttributes").into()),
        })
    }

    /// Get the window's size and position relative to its parent
    pub fn get_geometry(&self, window: Window) -> WindowManagerResult<Cookie<'_, T, Geometry>> {
        self.engine.issue(Request::GetGeometry { window }, Mode::Checked, |reply| match reply {
            Reply::Geometry(g) => Ok(geometry_from(&g)),
            _ => Err(WindowManagerError::UnexpectedReply("GetGeometry").into()),
        })
    }

    /// Get the parent and the children of the window, children in stacking order bottom first
    pub fn query_tree(&self, window: Window) -> WindowManagerResult<Cookie<'_, T, (Window, Vec<Window>)>> {
        self.engine.issue(Request::QueryTree { window }, Mode::Checked, |reply| match reply {
            Reply::Tree { parent, children, .. } => Ok((parent, children)),
            _ => Err(WindowManagerError::UnexpectedReply("QueryTree").into()),
        })
    }

    /// Translate `x`, `y` relative to `src` into coordinates relative to `dst`
    pub fn translate_coordinates(
        &self, src: Window, dst: Window, x: i16, y: i16,
    ) -> WindowManagerResult<Cookie<'_, T, (i32, i32)>> {
        self.engine.issue(Request::TranslateCoordinates { src, dst, x, y }, Mode::Checked, |reply| match reply {
            Reply::Coordinates { x, y, .. } => Ok((x as i32, y as i32)),
            _ => Err(WindowManagerError::UnexpectedReply("TranslateCoordinates").into()),
        })
    }

    /// Get the window that has the input focus
    pub fn get_input_focus(&self) -> WindowManagerResult<Cookie<'_, T, Window>> {
        self.engine.issue(Request::GetInputFocus, Mode::Checked, |reply| match reply {
            Reply::InputFocus { focus, .. } => Ok(focus),
            _ => Err(WindowManagerError::UnexpectedReply("GetInputFocus").into()),
        })
    }

    /// Give the window the input focus, falling back to the pointer root when it goes away
    pub fn set_input_focus(&self, window: Window, timestamp: Timestamp) -> WindowManagerResult<VoidCookie<'_, T>> {
        debug!("set_input_focus: win: {}", window);
        let request = Request::SetInputFocus {
            focus: window,
            revert_to: RevertTo::PointerRoot,
            time: timestamp,
        };
        self.engine.issue_void(request, Mode::Unchecked)
    }

    /// Configure the window directly bypassing the window manager's client messages
    pub fn configure_window(&self, window: Window, changes: WindowChanges) -> WindowManagerResult<VoidCookie<'_, T>> {
        debug!("configure_window: win: {}, changes: {:?}", window, changes);
        let request = Request::ConfigureWindow {
            window,
            x: changes.x,
            y: changes.y,
            width: changes.width,
            height: changes.height,
            border_width: changes.border_width,
            sibling: changes.sibling,
            stack_mode: changes.stack_mode,
        };
        self.engine.issue_void(request, Mode::Checked)
    }

    /// Let a pointer event frozen by a synchronous button grab through to the client
    pub fn replay_pointer(&self, timestamp: Timestamp) -> WindowManagerResult<VoidCookie<'_, T>> {
        let request = Request::AllowEvents {
            mode: AllowMode::ReplayPointer,
            time: timestamp,
        };
        self.engine.issue_void(request, Mode::Unchecked)
    }

    /// Get the parent of the window, the root has none
    pub fn get_parent_window(&self, window: Window) -> WindowManagerResult<Window> {
        let (parent, _) = self.query_tree(window)?.reply()?;
        Ok(parent)
    }

    // Composite lookups
    //----------------------------------------------------------------------------------------------

    /// Get the window's class and map state
    pub fn win_attributes(&self, win: Window) -> WindowManagerResult<(WinClass, WinMap)> {
        let attr = self.get_window_attributes(win)?.reply()?;
        debug!("win_attributes: id: {}, class: {}, map_state: {}", win, attr.class, attr.map_state);
        Ok((WinClass::from(attr.class)?, WinMap::from(attr.map_state)?))
    }

    /// Get the class of the window, i.e. the application name
    pub fn win_class(&self, win: Window) -> WindowManagerResult<String> {
        let class = self.get_wm_class(win)?.reply()?;
        debug!("win_class: id: {}, class: {}", win, class.class);
        Ok(class.class)
    }

    /// Get the desktop the window is on, `0xFFFFFFFF` means all desktops
    pub fn win_desktop(&self, win: Window) -> WindowManagerResult<u32> {
        let desktop = self.get_wm_desktop(win)?.reply()?;
        debug!("win_desktop: id: {}, desktop: {}", win, desktop);
        Ok(desktop)
    }

    /// Get the frame extents the window manager added around the window
    pub fn win_borders(&self, win: Window) -> WindowManagerResult<FrameExtents> {
        let extents = self.get_frame_extents(win)?.reply()?;
        debug!(
            "win_borders: id: {}, l: {}, r: {}, t: {}, b: {}",
            win, extents.left, extents.right, extents.top, extents.bottom
        );
        Ok(extents)
    }

    /// Get the window's geometry with its location in root coordinates
    pub fn win_geometry(&self, win: Window) -> WindowManagerResult<Geometry> {
        // GetGeometry reports the location relative to the parent which after reparenting is the
        // frame, translating the origin to the root gives the real location.
        let geometry = self.get_geometry(win)?;
        let origin = self.translate_coordinates(win, self.root(), 0, 0)?;
        let (g, (x, y)) = (geometry.reply()?, origin.reply()?);
        let g = Geometry { x, y, ..g };
        debug!("win_geometry: id: {}, {}", win, g);
        Ok(g)
    }

    /// Get the geometry of the window including the decorations
    ///
    /// ### Arguments
    /// * `win` - client window
    /// * `style` - where the window manager keeps the decorations
    pub fn get_decorated_geometry(&self, win: Window, style: FrameStyle) -> WindowManagerResult<Geometry> {
        let frame = self.frame_of(win, style)?;
        self.get_geometry(frame)?.reply()
    }

    /// Get the window's name preferring what the window manager displays over what the client set
    pub fn win_name(&self, win: Window) -> WindowManagerResult<String> {
        // _NET_WM_VISIBLE_NAME is set by the window manager when it shows a different name, e.g.
        // with a counter appended, then the UTF-8 _NET_WM_NAME and last the Latin-1 WM_NAME.
        let visible = self.get_wm_visible_name(win)?;
        let net = self.get_wm_name(win)?;
        let icccm = self.get_icccm_name(win)?;
        for (source, cookie) in [("_NET_WM_VISIBLE_NAME", visible), ("_NET_WM_NAME", net), ("WM_NAME", icccm)] {
            match cookie.reply() {
                Ok(name) if !name.is_empty() => {
                    debug!("win_name: id: {}, source: {}, name: {}", win, source, name);
                    return Ok(name);
                },
                Ok(_) => (),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => debug!("win_name: id: {}, source: {}, {}", win, source, err),
            }
        }
        Ok(String::new())
    }

    /// Get the process id of the window's client
    pub fn win_pid(&self, win: Window) -> WindowManagerResult<u32> {
        let pid = self.get_wm_pid(win)?.reply()?;
        debug!("win_pid: id: {}, pid: {}", win, pid);
        Ok(pid)
    }

    /// Get the window's states
    pub fn win_state(&self, win: Window) -> WindowManagerResult<Vec<WinState>> {
        let atoms = self.get_wm_state(win)?.reply()?;
        let mut states = vec![];
        for atom in atoms {
            states.push(WinState::from_name(&self.atom_name(atom)?));
        }
        debug!("win_state: id: {}, states: {:?}", win, states);
        Ok(states)
    }

    /// Get the window's type, the first type listed is the preferred one. Without a type the
    /// window is a normal window unless it is transient.
    pub fn win_type(&self, win: Window) -> WindowManagerResult<WinType> {
        let atoms = self.get_wm_window_type(win)?.reply()?;
        let typ = match atoms.first() {
            Some(atom) => WinType::from_name(&self.atom_name(*atom)?),
            None => match self.get_wm_transient_for(win)?.reply() {
                Ok(owner) if owner != NONE => WinType::Dialog,
                _ => WinType::Normal,
            },
        };
        debug!("win_type: id: {}, type: {}", win, typ);
        Ok(typ)
    }

    /// Get the parent of the window
    pub fn win_parent(&self, win: Window) -> WindowManagerResult<Window> {
        let id = self.get_parent_window(win)?;
        debug!("win_parent: id: {}, parent: {}", win, id);
        Ok(id)
    }

    // Manipulation
    //----------------------------------------------------------------------------------------------

    /// Move and resize the window by its top left corner so that the frame ends up with the given
    /// geometry. The size of the decorations is taken from the frame rather than from
    /// `_NET_FRAME_EXTENTS` which not every window manager keeps accurate.
    ///
    /// ### Arguments
    /// * `win` - client window
    /// * `style` - where the window manager keeps the decorations
    /// * `x`, `y` - new location of the frame
    /// * `w`, `h` - new size of the frame
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.moveresize(12345, FrameStyle::Parent, Some(0), Some(0), Some(800), Some(600)).unwrap();
    /// ```
    pub fn moveresize(
        &self, win: Window, style: FrameStyle, x: Option<i32>, y: Option<i32>, w: Option<u32>, h: Option<u32>,
    ) -> WindowManagerResult<()> {
        let (mut w, mut h) = (w, h);
        let frame = self.frame_of(win, style)?;
        if frame != win && frame != NONE && frame != self.root() {
            let client = self.get_geometry(win)?;
            let outer = self.get_geometry(frame)?;
            let (client, outer) = (client.reply()?, outer.reply()?);
            let (dw, dh) = (outer.width.saturating_sub(client.width), outer.height.saturating_sub(client.height));
            w = w.map(|x| x.saturating_sub(dw).max(1));
            h = h.map(|x| x.saturating_sub(dh).max(1));
        }
        drop(self.request_moveresize_window(win, Some(WinGravity::NorthWest), Source::Pager, x, y, w, h)?);
        self.flush()
    }

    /// Maximize the window both horizontally and vertically
    pub fn maximize_win(&self, win: Window) -> WindowManagerResult<()> {
        debug!("maximize_win: id: {}", win);
        let states = (&WinState::MaxHorz, Some(&WinState::MaxVert));
        drop(self.request_wm_state(win, StateAction::Add, states.0, states.1, Source::Pager)?);
        self.flush()
    }

    /// Remove the maximized states from the window
    pub fn unmaximize_win(&self, win: Window) -> WindowManagerResult<()> {
        debug!("unmaximize_win: id: {}", win);
        let states = (&WinState::MaxHorz, Some(&WinState::MaxVert));
        drop(self.request_wm_state(win, StateAction::Remove, states.0, states.1, Source::Pager)?);
        self.flush()
    }

    /// Activate the window, switching to its desktop when needed
    pub fn activate_win(&self, win: Window) -> WindowManagerResult<()> {
        debug!("activate_win: id: {}", win);
        let current = self.get_active_window_unchecked()?.reply().unwrap_or(NONE);
        drop(self.request_active_window(win, Source::Pager, CURRENT_TIME, current)?);
        self.flush()
    }

    fn frame_of(&self, win: Window, style: FrameStyle) -> WindowManagerResult<Window> {
        Ok(match style {
            FrameStyle::None => win,
            FrameStyle::Parent => self.get_parent_window(win)?,
            FrameStyle::Grandparent => {
                let parent = self.get_parent_window(win)?;
                self.get_parent_window(parent)?
            },
        })
    }
}

fn geometry_from(g: &GeometryReply) -> Geometry {
    Geometry {
        x: g.x as i32,
        y: g.y as i32,
        width: g.width as u32,
        height: g.height as u32,
    }
}

impl TryFrom<&str> for FrameStyle {
    type Error = WindowManagerError;

    fn try_from(val: &str) -> Result<Self, Self::Error> {
        match val.to_lowercase().as_ref() {
            "none" => Ok(FrameStyle::None),
            "parent" | "openbox" => Ok(FrameStyle::Parent),
            "grandparent" | "kwin" => Ok(FrameStyle::Grandparent),
            _ => Err(WindowManagerError::InvalidFrameStyle(val.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_style() {
        assert_eq!(FrameStyle::try_from("KWin").unwrap(), FrameStyle::Grandparent);
        assert_eq!(FrameStyle::try_from("parent").unwrap(), FrameStyle::Parent);
        assert_eq!(FrameStyle::default(), FrameStyle::Parent);
        assert!(FrameStyle::try_from("tiling").is_err());
    }

    #[test]
    fn test_geometry_from_reply() {
        let reply = GeometryReply {
            root: 1,
            depth: 24,
            x: -5,
            y: 10,
            width: 640,
            height: 480,
            border_width: 0,
        };
        assert_eq!(geometry_from(&reply).to_string(), "640x480+-5+10");
    }
}
