//! Key and button bindings.
//!
//! A binding ties a chord like `Mod4-Shift-Return` or `Mod1-3` on a window to callbacks. Key
//! strings are resolved with the server's keyboard mapping, grabs are taken for every combination
//! of the modifiers that shouldn't matter (Lock and NumLock) and the press events are routed
//! through the regular dispatcher.
use std::{cell::RefCell, collections::HashMap, rc::Rc};
use tracing::{debug, trace, warn};
use x11rb::protocol::xproto::{EventMask, ModMask};

use crate::{
    cookie::Mode,
    event::{Callback, CallbackId, Event, EventKind},
    transport::{Keycode, Keysym, Reply, Request, Transport, Window},
    ErrorWrapper, WindowManager, WindowManagerError, WindowManagerResult,
};

/// Modifier bits that don't change what a chord means
pub fn ignored_mods() -> u16 {
    u16::from(ModMask::LOCK | ModMask::M2)
}

/// Every combination of the ignored modifiers, a grab is issued for each
pub fn trivial_mods() -> [u16; 4] {
    let lock = u16::from(ModMask::LOCK);
    let num = u16::from(ModMask::M2);
    [0, lock, num, lock | num]
}

// Modifier bits of a key or button state, the upper bits are pointer buttons
fn chord_mods(state: u16) -> u16 {
    state & 0xff & !ignored_mods()
}

/// Names of a few common keysyms, single characters and `0x` prefixed values work as well
const KEYSYMS: &[(&str, Keysym)] = &[
    ("space", 0x0020),
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Scroll_Lock", 0xff14),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Prior", 0xff55),
    ("Page_Up", 0xff55),
    ("Next", 0xff56),
    ("Page_Down", 0xff56),
    ("End", 0xff57),
    ("Print", 0xff61),
    ("Insert", 0xff63),
    ("Menu", 0xff67),
    ("Num_Lock", 0xff7f),
    ("KP_Enter", 0xff8d),
    ("F1", 0xffbe),
    ("F2", 0xffbf),
    ("F3", 0xffc0),
    ("F4", 0xffc1),
    ("F5", 0xffc2),
    ("F6", 0xffc3),
    ("F7", 0xffc4),
    ("F8", 0xffc5),
    ("F9", 0xffc6),
    ("F10", 0xffc7),
    ("F11", 0xffc8),
    ("F12", 0xffc9),
    ("Shift_L", 0xffe1),
    ("Shift_R", 0xffe2),
    ("Control_L", 0xffe3),
    ("Control_R", 0xffe4),
    ("Caps_Lock", 0xffe5),
    ("Alt_L", 0xffe9),
    ("Alt_R", 0xffea),
    ("Super_L", 0xffeb),
    ("Super_R", 0xffec),
    ("Delete", 0xffff),
    ("minus", 0x002d),
    ("equal", 0x003d),
    ("comma", 0x002c),
    ("period", 0x002e),
    ("slash", 0x002f),
    ("XF86AudioLowerVolume", 0x1008_ff11),
    ("XF86AudioMute", 0x1008_ff12),
    ("XF86AudioRaiseVolume", 0x1008_ff13),
    ("XF86AudioPlay", 0x1008_ff14),
    ("XF86AudioNext", 0x1008_ff17),
    ("XF86AudioPrev", 0x1008_ff16),
];

/// Resolve a keysym name
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    if let Some((_, sym)) = KEYSYMS.iter().find(|(x, _)| *x == name) {
        return Some(*sym);
    }
    if let Some(hex) = name.strip_prefix("0x") {
        return Keysym::from_str_radix(hex, 16).ok();
    }

    // Latin-1 characters map straight onto their keysym
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if (c as u32) >= 0x20 && (c as u32) <= 0xff => Some(c as u32),
        _ => None,
    }
}

/// Resolve a modifier name, case is ignored
pub fn modifier_from_name(name: &str) -> Option<ModMask> {
    match name.to_lowercase().as_ref() {
        "shift" => Some(ModMask::SHIFT),
        "lock" => Some(ModMask::LOCK),
        "control" | "ctrl" => Some(ModMask::CONTROL),
        "mod1" | "alt" => Some(ModMask::M1),
        "mod2" => Some(ModMask::M2),
        "mod3" => Some(ModMask::M3),
        "mod4" | "super" => Some(ModMask::M4),
        "mod5" => Some(ModMask::M5),
        "any" => Some(ModMask::ANY),
        _ => None,
    }
}

// Split a chord into its modifier mask and final component
fn split_chord(chord: &str) -> Option<(u16, &str)> {
    let mut parts: Vec<&str> = chord.split('-').collect();
    let last = parts.pop().filter(|x| !x.is_empty())?;
    let mut mods = 0u16;
    for part in parts {
        mods |= u16::from(modifier_from_name(part)?);
    }
    Some((mods, last))
}

/// Parse a button string like `Mod1-3` into its modifier mask and button number
///
/// ### Examples
/// ```
/// use libxhint::prelude::*;
/// let (mods, button) = bind::parse_buttonstring("Mod1-Shift-3").unwrap();
/// assert_eq!(button, 3);
/// ```
pub fn parse_buttonstring(chord: &str) -> WindowManagerResult<(u16, u8)> {
    let err = || -> ErrorWrapper { WindowManagerError::InvalidButtonString(chord.to_owned()).into() };
    let (mods, last) = split_chord(chord).ok_or_else(err)?;
    match last.parse::<u8>() {
        Ok(button) if button > 0 => Ok((mods, button)),
        _ => Err(err()),
    }
}

/// Keymap is the server's keyboard and modifier mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keymap {
    pub min_keycode: Keycode,
    pub keysyms_per_keycode: u8,
    pub keysyms: Vec<Keysym>,

    // One row per modifier: Shift, Lock, Control, Mod1..Mod5
    pub modifiers: Vec<Vec<Keycode>>,
}

impl Keymap {
    /// Build the keymap from the GetKeyboardMapping and GetModifierMapping replies
    pub fn new(
        min_keycode: Keycode, keysyms_per_keycode: u8, keysyms: Vec<Keysym>, keycodes_per_modifier: u8,
        modifier_keycodes: &[Keycode],
    ) -> Self {
        let modifiers = match keycodes_per_modifier {
            0 => vec![vec![]; 8],
            n => modifier_keycodes
                .chunks(n as usize)
                .map(|row| row.iter().copied().filter(|x| *x != 0).collect())
                .collect(),
        };
        Self {
            min_keycode,
            keysyms_per_keycode,
            keysyms,
            modifiers,
        }
    }

    /// All keycodes producing the keysym in any column
    pub fn keycodes(&self, keysym: Keysym) -> Vec<Keycode> {
        if self.keysyms_per_keycode == 0 {
            return vec![];
        }
        let per = self.keysyms_per_keycode as usize;
        let mut keycodes = vec![];
        for (i, row) in self.keysyms.chunks(per).enumerate() {
            if row.contains(&keysym) {
                keycodes.push(self.min_keycode.saturating_add(i as u8));
            }
        }
        keycodes
    }

    /// First keycode producing the keysym
    pub fn keycode(&self, keysym: Keysym) -> Option<Keycode> {
        self.keycodes(keysym).into_iter().next()
    }

    /// Keysym in the given column of the keycode, 0 when there is none
    pub fn keysym(&self, keycode: Keycode, column: usize) -> Keysym {
        if keycode < self.min_keycode || column >= self.keysyms_per_keycode as usize {
            return 0;
        }
        let index = (keycode - self.min_keycode) as usize * self.keysyms_per_keycode as usize + column;
        self.keysyms.get(index).copied().unwrap_or(0)
    }

    /// Modifier mask the keycode toggles, 0 if it isn't a modifier key
    pub fn modifier_mask(&self, keycode: Keycode) -> u16 {
        self.modifiers
            .iter()
            .enumerate()
            .filter(|(_, row)| row.contains(&keycode))
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    /// Parse a key string like `Mod4-Shift-Return` into its modifier mask and keycode
    pub fn parse_keystring(&self, chord: &str) -> WindowManagerResult<(u16, Keycode)> {
        let err = || -> ErrorWrapper { WindowManagerError::InvalidKeyString(chord.to_owned()).into() };
        let (mods, last) = split_chord(chord).ok_or_else(err)?;
        let keysym = keysym_from_name(last).ok_or_else(err)?;
        let keycode = self.keycode(keysym).ok_or_else(err)?;
        Ok((mods, keycode))
    }
}

struct KeyBinding<T: Transport> {
    keysym: Keysym,
    callbacks: Vec<(CallbackId, Callback<T>)>,
}

/// Bindings is the registry of key and button chords
pub struct Bindings<T: Transport> {
    keymap: RefCell<Option<Keymap>>,
    keys: RefCell<HashMap<(Window, u16, Keycode), KeyBinding<T>>>,
    buttons: RefCell<HashMap<(Window, u16, u8), Vec<(CallbackId, Callback<T>)>>>,

    // Dispatcher registrations that feed presses into the registry
    handlers: RefCell<HashMap<(EventKind, Window), CallbackId>>,
}

impl<T: Transport> Default for Bindings<T> {
    fn default() -> Self {
        Self {
            keymap: RefCell::new(None),
            keys: RefCell::new(HashMap::new()),
            buttons: RefCell::new(HashMap::new()),
            handlers: RefCell::new(HashMap::new()),
        }
    }
}

impl<T: Transport> WindowManager<T> {
    /// Fetch the keyboard and modifier mappings from the server, both requests are pipelined
    pub fn refresh_keymap(&self) -> WindowManagerResult<Keymap> {
        let setup = self.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let keyboard = self.engine.issue(
            Request::GetKeyboardMapping {
                first_keycode: min,
                count: max.saturating_sub(min).saturating_add(1),
            },
            Mode::Checked,
            |reply| match reply {
                Reply::KeyboardMapping { keysyms_per_keycode, keysyms } => Ok((keysyms_per_keycode, keysyms)),
                _ => Err(WindowManagerError::UnexpectedReply("GetKeyboardMapping").into()),
            },
        )?;
        let modifiers = self.engine.issue(Request::GetModifierMapping, Mode::Checked, |reply| match reply {
            Reply::ModifierMapping { keycodes_per_modifier, keycodes } => Ok((keycodes_per_modifier, keycodes)),
            _ => Err(WindowManagerError::UnexpectedReply("GetModifierMapping").into()),
        })?;
        let (per_keycode, keysyms) = keyboard.reply()?;
        let (per_modifier, keycodes) = modifiers.reply()?;
        let keymap = Keymap::new(min, per_keycode, keysyms, per_modifier, &keycodes);
        debug!("refresh_keymap: min: {}, max: {}, per_keycode: {}", min, max, per_keycode);
        *self.bindings.keymap.borrow_mut() = Some(keymap.clone());
        Ok(keymap)
    }

    /// Get the keymap fetching it on first use
    pub fn keymap(&self) -> WindowManagerResult<Keymap> {
        let cached = self.bindings.keymap.borrow().clone();
        match cached {
            Some(keymap) => Ok(keymap),
            None => self.refresh_keymap(),
        }
    }

    /// Parse a key string against the current keymap
    pub fn parse_keystring(&self, chord: &str) -> WindowManagerResult<(u16, Keycode)> {
        self.keymap()?.parse_keystring(chord)
    }

    /// Grab the key on the window for every trivial modifier variant. Returns false, with the
    /// variants that were granted released again, if another client already holds one of them.
    pub fn grab_key(&self, window: Window, mods: u16, keycode: Keycode) -> WindowManagerResult<bool> {
        let mut cookies = vec![];
        for trivial in trivial_mods().iter() {
            let request = Request::GrabKey {
                window,
                modifiers: mods | trivial,
                key: keycode,
            };
            cookies.push(self.engine.issue_void(request, Mode::Checked)?);
        }
        let granted = self.check_grabs(cookies, "grab_key")?;
        if !granted {
            self.ungrab_key(window, mods, keycode)?;
        }
        Ok(granted)
    }

    /// Release the grabs taken by `grab_key`
    pub fn ungrab_key(&self, window: Window, mods: u16, keycode: Keycode) -> WindowManagerResult<()> {
        for trivial in trivial_mods().iter() {
            let request = Request::UngrabKey {
                window,
                modifiers: mods | trivial,
                key: keycode,
            };
            drop(self.engine.issue_void(request, Mode::Unchecked)?);
        }
        Ok(())
    }

    /// Grab the pointer button on the window for every trivial modifier variant
    pub fn grab_button(&self, window: Window, mods: u16, button: u8, sync_pointer: bool) -> WindowManagerResult<bool> {
        let mask = u32::from(EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE);
        let mut cookies = vec![];
        for trivial in trivial_mods().iter() {
            let request = Request::GrabButton {
                window,
                event_mask: mask,
                modifiers: mods | trivial,
                button,
                sync_pointer,
            };
            cookies.push(self.engine.issue_void(request, Mode::Checked)?);
        }
        let granted = self.check_grabs(cookies, "grab_button")?;
        if !granted {
            self.ungrab_button(window, mods, button)?;
        }
        Ok(granted)
    }

    pub fn ungrab_button(&self, window: Window, mods: u16, button: u8) -> WindowManagerResult<()> {
        for trivial in trivial_mods().iter() {
            let request = Request::UngrabButton {
                window,
                modifiers: mods | trivial,
                button,
            };
            drop(self.engine.issue_void(request, Mode::Unchecked)?);
        }
        Ok(())
    }

    fn check_grabs(&self, cookies: Vec<crate::cookie::VoidCookie<'_, T>>, what: &str) -> WindowManagerResult<bool> {
        let mut granted = true;
        for cookie in cookies {
            match cookie.check() {
                Ok(()) => {},
                Err(err) if err.protocol().map(|x| x.is_access()).unwrap_or(false) => {
                    warn!("{}: grab already taken: {}", what, err);
                    granted = false;
                },
                Err(err) => return Err(err),
            }
        }
        Ok(granted)
    }

    /// Bind a key string on the window to the callback
    ///
    /// Returns `None` when the key couldn't be grabbed because another client holds it.
    ///
    /// ### Arguments
    /// * `window` - window to grab the key on, usually the root window
    /// * `chord` - key string e.g. `Mod4-Shift-Return`
    /// * `callback` - invoked on every press of the chord
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.bind_key(wm.root(), "Mod4-Return", |_, _| Ok(())).unwrap();
    /// wm.main_loop().unwrap();
    /// ```
    pub fn bind_key<F>(&self, window: Window, chord: &str, callback: F) -> WindowManagerResult<Option<CallbackId>>
    where
        F: Fn(&WindowManager<T>, &Event) -> WindowManagerResult<()> + 'static,
    {
        let keymap = self.keymap()?;
        let (mods, keycode) = keymap.parse_keystring(chord)?;
        let keysym = keysym_from_name(chord.rsplit('-').next().unwrap_or_default()).unwrap_or(0);
        let key = (window, mods, keycode);

        if self.key_grab_count(window, mods, keycode) == 0 && !self.grab_key(window, mods, keycode)? {
            return Ok(None);
        }
        self.ensure_handler(EventKind::KeyPress, window);

        let id = self.dispatcher.next_id();
        self.bindings
            .keys
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| KeyBinding {
                keysym,
                callbacks: vec![],
            })
            .callbacks
            .push((id, Rc::new(callback)));
        debug!("bind_key: win: {}, chord: {}, mods: {:#x}, keycode: {}", window, chord, mods, keycode);
        Ok(Some(id))
    }

    /// Bind a button string on the window to the callback, see `bind_key`
    pub fn bind_button<F>(&self, window: Window, chord: &str, callback: F) -> WindowManagerResult<Option<CallbackId>>
    where
        F: Fn(&WindowManager<T>, &Event) -> WindowManagerResult<()> + 'static,
    {
        let (mods, button) = parse_buttonstring(chord)?;
        if self.button_grab_count(window, mods, button) == 0 && !self.grab_button(window, mods, button, false)? {
            return Ok(None);
        }
        self.ensure_handler(EventKind::ButtonPress, window);

        let id = self.dispatcher.next_id();
        self.bindings.buttons.borrow_mut().entry((window, mods, button)).or_default().push((id, Rc::new(callback)));
        debug!("bind_button: win: {}, chord: {}, mods: {:#x}, button: {}", window, chord, mods, button);
        Ok(Some(id))
    }

    /// Remove a key or button binding, the grab is released with the chord's last callback
    pub fn unbind(&self, id: CallbackId) -> WindowManagerResult<bool> {
        let key = {
            let mut keys = self.bindings.keys.borrow_mut();
            let found = keys.iter_mut().find(|(_, x)| x.callbacks.iter().any(|(cb, _)| *cb == id)).map(|(k, x)| {
                x.callbacks.retain(|(cb, _)| *cb != id);
                (*k, x.callbacks.is_empty())
            });
            if let Some((k, true)) = found {
                keys.remove(&k);
            }
            found
        };
        if let Some(((window, mods, keycode), empty)) = key {
            if empty {
                self.ungrab_key(window, mods, keycode)?;
                if !self.bindings.keys.borrow().keys().any(|(w, _, _)| *w == window) {
                    self.release_handler(EventKind::KeyPress, window);
                }
            }
            return Ok(true);
        }

        let button = {
            let mut buttons = self.bindings.buttons.borrow_mut();
            let found = buttons.iter_mut().find(|(_, x)| x.iter().any(|(cb, _)| *cb == id)).map(|(k, x)| {
                x.retain(|(cb, _)| *cb != id);
                (*k, x.is_empty())
            });
            if let Some((k, true)) = found {
                buttons.remove(&k);
            }
            found
        };
        if let Some(((window, mods, button), empty)) = button {
            if empty {
                self.ungrab_button(window, mods, button)?;
                if !self.bindings.buttons.borrow().keys().any(|(w, _, _)| *w == window) {
                    self.release_handler(EventKind::ButtonPress, window);
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Number of callbacks holding the key grab
    pub fn key_grab_count(&self, window: Window, mods: u16, keycode: Keycode) -> usize {
        self.bindings.keys.borrow().get(&(window, mods, keycode)).map(|x| x.callbacks.len()).unwrap_or(0)
    }

    /// Number of callbacks holding the button grab
    pub fn button_grab_count(&self, window: Window, mods: u16, button: u8) -> usize {
        self.bindings.buttons.borrow().get(&(window, mods, button)).map(|x| x.len()).unwrap_or(0)
    }

    // Route presses on the window into the binding registry
    fn ensure_handler(&self, kind: EventKind, window: Window) {
        if self.bindings.handlers.borrow().contains_key(&(kind, window)) {
            return;
        }
        let id = match kind {
            EventKind::KeyPress => self.connect(kind, Some(window), |wm, e| wm.run_key_callbacks(e)),
            _ => self.connect(kind, Some(window), |wm, e| wm.run_button_callbacks(e)),
        };
        self.bindings.handlers.borrow_mut().insert((kind, window), id);
    }

    fn release_handler(&self, kind: EventKind, window: Window) {
        let id = self.bindings.handlers.borrow_mut().remove(&(kind, window));
        if let Some(id) = id {
            self.disconnect(id);
        }
    }

    fn run_key_callbacks(&self, event: &Event) -> WindowManagerResult<()> {
        let (Some(window), Some(state)) = (event.window, event.state()) else {
            return Ok(());
        };
        let key = (window, chord_mods(state), event.detail());
        let callbacks: Vec<Callback<T>> = match self.bindings.keys.borrow().get(&key) {
            Some(x) => x.callbacks.iter().map(|(_, cb)| cb.clone()).collect(),
            None => vec![],
        };
        trace!("run_key_callbacks: key: {:?}, callbacks: {}", key, callbacks.len());
        for callback in callbacks.iter() {
            self.run_callback(callback, event);
        }
        Ok(())
    }

    fn run_button_callbacks(&self, event: &Event) -> WindowManagerResult<()> {
        let (Some(window), Some(state)) = (event.window, event.state()) else {
            return Ok(());
        };
        let key = (window, chord_mods(state), event.detail());
        let callbacks: Vec<Callback<T>> = match self.bindings.buttons.borrow().get(&key) {
            Some(x) => x.iter().map(|(_, cb)| cb.clone()).collect(),
            None => vec![],
        };
        trace!("run_button_callbacks: key: {:?}, callbacks: {}", key, callbacks.len());
        for callback in callbacks.iter() {
            self.run_callback(callback, event);
        }
        Ok(())
    }

    /// React to a MappingNotify: refresh the tables and move key grabs whose keycode changed
    pub(crate) fn update_keyboard_mapping(&self, event: &Event) -> WindowManagerResult<()> {
        match event.mapping_request() {
            Some(0) | Some(1) => {},
            _ => return Ok(()),
        }
        if self.bindings.keymap.borrow().is_none() {
            return Ok(());
        }
        let keymap = self.refresh_keymap()?;

        let moved: Vec<((Window, u16, Keycode), Option<Keycode>)> = self
            .bindings
            .keys
            .borrow()
            .iter()
            .filter_map(|(key, binding)| {
                let keycode = keymap.keycode(binding.keysym);
                if keycode == Some(key.2) {
                    None
                } else {
                    Some((*key, keycode))
                }
            })
            .collect();

        for ((window, mods, old), new) in moved {
            self.ungrab_key(window, mods, old)?;
            let binding = self.bindings.keys.borrow_mut().remove(&(window, mods, old));
            match (new, binding) {
                (Some(keycode), Some(binding)) => {
                    debug!("update_keyboard_mapping: keycode {} moved to {}", old, keycode);
                    if self.grab_key(window, mods, keycode)? {
                        self.bindings.keys.borrow_mut().insert((window, mods, keycode), binding);
                    } else {
                        warn!("update_keyboard_mapping: could not regrab keycode {}", keycode);
                    }
                },
                _ => warn!("update_keyboard_mapping: keycode {} no longer maps to a bound key", old),
            }
        }
        Ok(())
    }
}
