//! `WindowManager` is the entry point of `libxhint`. It owns the connection, the request engine,
//! the atom cache, the event dispatcher and the binding registries so a single value is all a
//! client needs to talk to an [EWMH](https://specifications.freedesktop.org/wm-spec/latest/) or
//! ICCCM compliant window manager.
//!
//! Property access goes through the descriptor registry in [`crate::codec`]: every known property
//! name maps to its type and layout which is what lets `get_property` hand back typed values and
//! the setters refuse values that don't fit.
use std::{cell::RefCell, collections::HashSet};
use tracing::{debug, trace};

use crate::{
    atoms::{AtomCache, EWMH_ATOMS},
    bind::Bindings,
    codec::{self, Value},
    cookie::{Cookie, Engine, Mode, VoidCookie},
    event::Dispatcher,
    transport::{Atom, ByteOrder, PropMode, Reply, Request, SetupInfo, Transport, Window, NONE},
    x11::X11Transport,
    ErrorWrapper, WindowManagerError, WindowManagerResult,
};

/// ConnectOptions configures how `WindowManager::open` sets up the connection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectOptions {
    pub display: Option<String>, // display name, `$DISPLAY` when unset
    pub prime: Vec<String>,      // atom names interned in one pipelined batch while connecting
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to the given display rather than `$DISPLAY`
    pub fn display<S: Into<String>>(mut self, display: S) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Intern the given atoms while connecting
    pub fn prime<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.prime.extend(names.iter().map(|x| x.as_ref().to_owned()));
        self
    }

    /// Intern the atoms most window manager interactions need while connecting
    pub fn prime_ewmh(self) -> Self {
        self.prime(&EWMH_ATOMS)
    }
}

/// Window Manager control provides a simplified access layer to EWMH and ICCCM compatible window
/// managers on top of a single connection. It isn't `Sync`, only the thread that owns it reads
/// from the connection.
pub struct WindowManager<T: Transport = X11Transport> {
    pub(crate) engine: Engine<T>,              // request/reply engine
    atoms: AtomCache,                          // atom cache
    pub(crate) dispatcher: Dispatcher<T>,      // event callbacks
    pub(crate) bindings: Bindings<T>,          // key and button bindings
    supported: RefCell<Option<HashSet<Atom>>>, // cache of _NET_SUPPORTED
}

impl WindowManager<X11Transport> {
    /// Create the window manager control instance and connect to the X11 server
    ///
    /// ### Arguments
    /// * `opts` - display to connect to and atoms to prime
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::new().prime_ewmh()).unwrap();
    /// ```
    pub fn open(opts: &ConnectOptions) -> WindowManagerResult<Self> {
        let transport = X11Transport::connect(opts.display.as_deref())?;
        Self::with_transport(transport, opts)
    }
}

impl<T: Transport> WindowManager<T> {
    /// Create the window manager control instance over an already established transport
    pub fn with_transport(transport: T, opts: &ConnectOptions) -> WindowManagerResult<Self> {
        let wm = WindowManager {
            engine: Engine::new(transport),
            atoms: AtomCache::new(),
            dispatcher: Dispatcher::default(),
            bindings: Bindings::default(),
            supported: RefCell::new(None),
        };
        if !opts.prime.is_empty() {
            wm.prime_atoms(&opts.prime)?;
        }
        let setup = wm.setup();
        debug!("connect: screen: {}, root: {}, w: {}, h: {}", setup.screen, setup.root, setup.width, setup.height);
        Ok(wm)
    }

    /// Get the default screen number
    pub fn screen(&self) -> usize {
        self.setup().screen
    }

    /// Get the root window
    pub fn root(&self) -> Window {
        self.setup().root
    }

    /// Get the screen full width
    pub fn width(&self) -> u32 {
        self.setup().width as u32
    }

    /// Get screen full height
    pub fn height(&self) -> u32 {
        self.setup().height as u32
    }

    pub fn setup(&self) -> &SetupInfo {
        self.engine.transport().setup()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.engine.transport().byte_order()
    }

    /// Request engine, useful for issuing requests the helpers don't cover
    pub fn engine(&self) -> &Engine<T> {
        &self.engine
    }

    pub fn transport(&self) -> &T {
        self.engine.transport()
    }

    pub fn atoms(&self) -> &AtomCache {
        &self.atoms
    }

    /// Get the atom for the given name, creating it on the server if needed
    pub fn atom(&self, name: &str) -> WindowManagerResult<Atom> {
        self.atoms.intern(&self.engine, name)
    }

    /// Get the atom for the given name only if the server already knows it
    pub fn atom_lookup(&self, name: &str) -> WindowManagerResult<Atom> {
        self.atoms.lookup(&self.engine, name)
    }

    /// Get the name of the given atom
    pub fn atom_name(&self, atom: Atom) -> WindowManagerResult<String> {
        self.atoms.name_of(&self.engine, atom)
    }

    /// Intern all the given atoms with a single round trip
    pub fn prime_atoms<S: AsRef<str>>(&self, names: &[S]) -> WindowManagerResult<()> {
        self.atoms.prime(&self.engine, names)
    }

    /// Push every queued request to the server
    pub fn flush(&self) -> WindowManagerResult<()> {
        self.engine.flush()
    }

    /// Wait until the server has processed every request sent so far
    pub fn sync(&self) -> WindowManagerResult<()> {
        self.engine.sync()
    }

    /// Read a property by name, decoded according to its registered layout
    ///
    /// ### Arguments
    /// * `window` - window to read the property from
    /// * `name` - property name, e.g. `_NET_WM_NAME`
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// let names = wm.get_property(wm.root(), "_NET_DESKTOP_NAMES").unwrap().reply().unwrap();
    /// ```
    pub fn get_property(&self, window: Window, name: &str) -> WindowManagerResult<Cookie<'_, T, Value>> {
        self.property_value(window, name, Mode::Checked)
    }

    pub fn get_property_unchecked(&self, window: Window, name: &str) -> WindowManagerResult<Cookie<'_, T, Value>> {
        self.property_value(window, name, Mode::Unchecked)
    }

    fn property_value(&self, window: Window, name: &str, mode: Mode) -> WindowManagerResult<Cookie<'_, T, Value>> {
        let desc = codec::descriptor(name)?;
        let property = self.atom(name)?;
        let order = self.byte_order();
        let request = Request::GetProperty {
            window,
            property,
            type_: NONE,
        };
        trace!("property: win: {}, name: {}, mode: {}", window, name, mode);
        self.engine.issue(request, mode, move |reply| match reply {
            Reply::Property(reply) => desc.decode_reply(&reply, order),
            _ => Err(WindowManagerError::UnexpectedReply("GetProperty").into()),
        })
    }

    // Read a property converting the decoded value into `R` once the reply is claimed
    pub(crate) fn property<'a, R>(&'a self, window: Window, name: &str, mode: Mode) -> WindowManagerResult<Cookie<'a, T, R>>
    where
        R: TryFrom<Value, Error = ErrorWrapper> + 'a,
    {
        Ok(self.property_value(window, name, mode)?.map(R::try_from))
    }

    /// Replace a property by name, the value has to fit the property's registered layout
    ///
    /// ### Arguments
    /// * `window` - window to set the property on
    /// * `name` - property name, e.g. `_NET_WM_NAME`
    /// * `value` - value to store
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.set_property_checked(12345, "_NET_WM_NAME", &Value::Text("hello".into())).unwrap().check().unwrap();
    /// ```
    pub fn set_property_checked(
        &self, window: Window, name: &str, value: &Value,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.put_property(window, name, value, Mode::Checked)
    }

    pub fn set_property_unchecked(
        &self, window: Window, name: &str, value: &Value,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.put_property(window, name, value, Mode::Unchecked)
    }

    pub(crate) fn put_property(
        &self, window: Window, name: &str, value: &Value, mode: Mode,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        let desc = codec::descriptor(name)?;
        let data = codec::encode(desc.layout, value, self.byte_order())?;
        let request = Request::ChangeProperty {
            mode: PropMode::Replace,
            window,
            property: self.atom(name)?,
            type_: self.atom(desc.type_name)?,
            format: desc.layout.format(),
            data,
        };
        debug!("put_property: win: {}, name: {}, mode: {}", window, name, mode);
        self.engine.issue_void(request, mode)
    }

    /// Remove a property from the window
    pub fn delete_property_unchecked(&self, window: Window, name: &str) -> WindowManagerResult<VoidCookie<'_, T>> {
        let property = self.atom(name)?;
        self.engine.issue_void(Request::DeleteProperty { window, property }, Mode::Unchecked)
    }

    pub fn delete_property_checked(&self, window: Window, name: &str) -> WindowManagerResult<VoidCookie<'_, T>> {
        let property = self.atom(name)?;
        self.engine.issue_void(Request::DeleteProperty { window, property }, Mode::Checked)
    }

    /// Determine if the given hint is supported by the window manager. `_NET_SUPPORTED` is read
    /// once and cached, see `reset_supported`.
    ///
    /// ### Arguments
    /// * `name` - atom name to lookup to see if its supported
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.supported("_NET_MOVERESIZE_WINDOW").unwrap();
    /// ```
    pub fn supported(&self, name: &str) -> WindowManagerResult<bool> {
        if self.supported.borrow().is_none() {
            let atoms: Vec<Atom> = self.get_supported()?.reply()?;
            trace!("supported: {} hints", atoms.len());
            *self.supported.borrow_mut() = Some(atoms.into_iter().collect());
        }
        let atom = match self.atom_lookup(name) {
            Ok(atom) => atom,
            Err(err) if err.is_unknown_atom() => return Ok(false),
            Err(err) => return Err(err),
        };
        Ok(self.supported.borrow().as_ref().map(|x| x.contains(&atom)).unwrap_or(false))
    }

    /// Forget the cached `_NET_SUPPORTED` list, e.g. after the window manager was replaced
    pub fn reset_supported(&self) {
        *self.supported.borrow_mut() = None;
    }

    /// Get the owner of the given selection
    pub fn get_selection_owner(&self, selection: Atom) -> WindowManagerResult<Cookie<'_, T, Window>> {
        self.engine.issue(Request::GetSelectionOwner { selection }, Mode::Checked, |reply| match reply {
            Reply::SelectionOwner(owner) => Ok(owner),
            _ => Err(WindowManagerError::UnexpectedReply("GetSelectionOwner").into()),
        })
    }

    /// Check if a composite manager is running
    pub fn composite_manager(&self) -> WindowManagerResult<bool> {
        // For each screen the compositing manager manages they MUST acquire ownership of a
        // selection named _NET_WM_CM_Sn, where the suffix `n` is the screen number.
        let atom = self.atom(&format!("_NET_WM_CM_S{}", self.screen()))?;
        let result = self.get_selection_owner(atom)?.reply()? != NONE;
        debug!("composite_manager: {}", result);
        Ok(result)
    }

    /// Get window manager's window id and name
    pub fn winmgr(&self) -> WindowManagerResult<(Window, String)> {
        let win = self.get_supporting_wm_check()?.reply()?;
        let name = self.win_name(win)?;
        Ok((win, name))
    }

    /// Get windows optionally all
    ///
    /// ### Arguments
    /// * `all` - default is to get all windows controlled by the window manager, when all is true get the super set of x11 windows
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.get_windows(false).unwrap();
    /// ```
    pub fn get_windows(&self, all: bool) -> WindowManagerResult<Vec<Window>> {
        if all {
            // All windows in the X11 system
            let (_, children) = self.query_tree(self.root())?.reply()?;
            return Ok(children);
        }

        // Window manager client windows which is a subset of all windows that have been
        // reparented i.e. new ids and don't map to the same ids as their all windows selves.
        self.get_client_list()?.reply()
    }
}
