//! In-memory display server the integration tests run against.
//!
//! Requests are buffered until `flush` like a real connection and then processed in order,
//! producing replies, acknowledgements for checked requests, errors and events.
#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet, VecDeque},
};

use libxhint::{atoms::PREDEFINED, prelude::*};

pub const ROOT: Window = 0x100;
pub const FRAME: Window = 0x0060_0001;
pub const CLIENT: Window = 0x0080_0001;
pub const OTHER: Window = 0x0080_0002;

pub const ORDER: ByteOrder = ByteOrder::LittleEndian;

pub const BAD_WINDOW: u8 = 3;
pub const BAD_DRAWABLE: u8 = 9;

struct State {
    sequence: SequenceNumber,
    queued: Vec<(SequenceNumber, Request, Mode)>,
    frames: VecDeque<Frame>,
    sent: Vec<Request>,
    failures: VecDeque<(&'static str, u8)>,
    read_errors: VecDeque<WindowManagerError>,

    atoms: HashMap<String, Atom>,
    names: HashMap<Atom, String>,
    next_atom: Atom,

    windows: Vec<Window>,
    parents: HashMap<Window, Window>,
    geometries: HashMap<Window, GeometryReply>,
    properties: HashMap<(Window, Atom), PropertyReply>,
    masks: HashMap<Window, u32>,
    owners: HashMap<Atom, Window>,
    focus: Window,

    key_grabs: HashSet<(Window, u16, Keycode)>,
    button_grabs: HashSet<(Window, u16, u8)>,
    denied_keys: HashSet<(Window, u16, Keycode)>,
    denied_buttons: HashSet<(Window, u16, u8)>,

    keysyms_per_keycode: u8,
    keysyms: Vec<Keysym>,
    modifiers: Vec<Keycode>,
}

/// FakeServer implements `Transport` without a display
pub struct FakeServer {
    state: RefCell<State>,
    setup: SetupInfo,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServer {
    /// Server with a 1920x1080 root, one framed client and a small keyboard:
    /// keycode 8 `a A`, 9 `Return`, 10 `Super_L`, 11 `Num_Lock`, 12 `b B`, 13 `Escape`
    pub fn new() -> Self {
        let mut atoms = HashMap::new();
        let mut names = HashMap::new();
        for (name, atom) in PREDEFINED.iter() {
            atoms.insert(name.to_string(), *atom);
            names.insert(*atom, name.to_string());
        }
        let mut modifiers = vec![0; 8];
        modifiers[4] = 11; // Mod2
        modifiers[6] = 10; // Mod4

        let server = Self {
            state: RefCell::new(State {
                sequence: 0,
                queued: vec![],
                frames: VecDeque::new(),
                sent: vec![],
                failures: VecDeque::new(),
                read_errors: VecDeque::new(),
                atoms,
                names,
                next_atom: 100,
                windows: vec![],
                parents: HashMap::new(),
                geometries: HashMap::new(),
                properties: HashMap::new(),
                masks: HashMap::new(),
                owners: HashMap::new(),
                focus: ROOT,
                key_grabs: HashSet::new(),
                button_grabs: HashSet::new(),
                denied_keys: HashSet::new(),
                denied_buttons: HashSet::new(),
                keysyms_per_keycode: 2,
                keysyms: vec![0x61, 0x41, 0xff0d, 0, 0xffeb, 0, 0xff7f, 0, 0x62, 0x42, 0xff1b, 0, 0, 0, 0, 0],
                modifiers,
            }),
            setup: SetupInfo {
                screen: 0,
                root: ROOT,
                width: 1920,
                height: 1080,
                min_keycode: 8,
                max_keycode: 15,
            },
        };
        server.add_window(ROOT, 0, 0, 0, 1920, 1080);
        server.add_window(FRAME, ROOT, 100, 50, 804, 624);
        server.add_window(CLIENT, FRAME, 2, 22, 800, 600);
        server.add_window(OTHER, ROOT, 0, 0, 300, 200);
        server
    }

    pub fn add_window(&self, window: Window, parent: Window, x: i16, y: i16, width: u16, height: u16) {
        let mut state = self.state.borrow_mut();
        state.windows.push(window);
        state.parents.insert(window, parent);
        state.geometries.insert(
            window,
            GeometryReply {
                root: ROOT,
                depth: 24,
                x,
                y,
                width,
                height,
                border_width: 0,
            },
        );
    }

    /// Atom the server uses for the name, created if needed
    pub fn atom(&self, name: &str) -> Atom {
        let mut state = self.state.borrow_mut();
        intern(&mut state, name)
    }

    /// Store raw property data the way a client would have
    pub fn set_raw(&self, window: Window, name: &str, type_name: &str, format: u8, value: Vec<u8>) {
        let property = self.atom(name);
        let type_ = self.atom(type_name);
        self.state.borrow_mut().properties.insert((window, property), PropertyReply { type_, format, value });
    }

    pub fn set_cardinals(&self, window: Window, name: &str, values: &[u32]) {
        self.set_raw(window, name, "CARDINAL", 32, words(values));
    }

    pub fn set_windows(&self, window: Window, name: &str, values: &[Window]) {
        self.set_raw(window, name, "WINDOW", 32, words(values));
    }

    pub fn set_atoms(&self, window: Window, name: &str, names: &[&str]) {
        let atoms: Vec<Atom> = names.iter().map(|x| self.atom(x)).collect();
        self.set_raw(window, name, "ATOM", 32, words(&atoms));
    }

    pub fn set_utf8(&self, window: Window, name: &str, text: &str) {
        self.set_raw(window, name, "UTF8_STRING", 8, text.as_bytes().to_vec());
    }

    pub fn set_latin1(&self, window: Window, name: &str, bytes: &[u8]) {
        self.set_raw(window, name, "STRING", 8, bytes.to_vec());
    }

    /// Property as stored on the server
    pub fn property(&self, window: Window, name: &str) -> Option<PropertyReply> {
        let property = self.atom(name);
        self.state.borrow().properties.get(&(window, property)).cloned()
    }

    /// 32 bit values of a stored property
    pub fn cardinals(&self, window: Window, name: &str) -> Vec<u32> {
        self.property(window, name).map(|x| x.value.chunks_exact(4).map(|w| ORDER.read_u32(w)).collect()).unwrap_or_default()
    }

    pub fn set_owner(&self, selection: &str, owner: Window) {
        let atom = self.atom(selection);
        self.state.borrow_mut().owners.insert(atom, owner);
    }

    /// Queue an event as if the server had just generated it
    pub fn push_event(&self, bytes: [u8; 32]) {
        let mut state = self.state.borrow_mut();
        let sequence = state.sequence;
        state.frames.push_back(Frame::Event { sequence, bytes: bytes.to_vec() });
    }

    /// Make the next request with the given name fail with the error code
    pub fn fail_next(&self, request: &'static str, code: u8) {
        self.state.borrow_mut().failures.push_back((request, code));
    }

    /// Make the next blocking read fail before any queued frame is returned
    pub fn fail_read(&self, err: WindowManagerError) {
        self.state.borrow_mut().read_errors.push_back(err);
    }

    pub fn deny_key_grab(&self, window: Window, modifiers: u16, key: Keycode) {
        self.state.borrow_mut().denied_keys.insert((window, modifiers, key));
    }

    pub fn deny_button_grab(&self, window: Window, modifiers: u16, button: u8) {
        self.state.borrow_mut().denied_buttons.insert((window, modifiers, button));
    }

    pub fn key_grabs(&self) -> HashSet<(Window, u16, Keycode)> {
        self.state.borrow().key_grabs.clone()
    }

    pub fn button_grabs(&self) -> HashSet<(Window, u16, u8)> {
        self.state.borrow().button_grabs.clone()
    }

    /// Move the keysym to another keycode, column 0
    pub fn remap(&self, keysym: Keysym, keycode: Keycode) {
        let mut state = self.state.borrow_mut();
        let per = state.keysyms_per_keycode as usize;
        for x in state.keysyms.iter_mut() {
            if *x == keysym {
                *x = 0;
            }
        }
        let index = (keycode - self.setup.min_keycode) as usize * per;
        state.keysyms[index] = keysym;
    }

    /// Every request received so far, flushed or not
    pub fn sent(&self) -> Vec<Request> {
        self.state.borrow().sent.clone()
    }

    pub fn sent_count(&self, name: &str) -> usize {
        self.state.borrow().sent.iter().filter(|x| x.name() == name).count()
    }

    /// Requests received but not flushed yet
    pub fn queued(&self) -> usize {
        self.state.borrow().queued.len()
    }

    /// Frames produced but not read yet
    pub fn unread(&self) -> usize {
        self.state.borrow().frames.len()
    }

    pub fn focus(&self) -> Window {
        self.state.borrow().focus
    }

    pub fn mask(&self, window: Window) -> u32 {
        self.state.borrow().masks.get(&window).copied().unwrap_or(0)
    }

    pub fn geometry(&self, window: Window) -> Option<GeometryReply> {
        self.state.borrow().geometries.get(&window).cloned()
    }

    /// Client messages sent to the window with SendEvent
    pub fn client_messages(&self, window: Window) -> Vec<ClientMessage> {
        self.state
            .borrow()
            .sent
            .iter()
            .filter_map(|x| match x {
                Request::SendEvent { destination, event, .. } if *destination == window => {
                    Event::parse(event, 0, ORDER).ok().and_then(|e| e.client_message())
                },
                _ => None,
            })
            .collect()
    }

    fn process(&self, state: &mut State, sequence: SequenceNumber, request: Request, mode: Mode) {
        let ack = Frame::Ack { sequence };
        let error = |code: u8| Frame::Error(ProtocolError::new(sequence, code));

        if state.failures.front().map(|(name, _)| *name == request.name()).unwrap_or(false) {
            if let Some((_, code)) = state.failures.pop_front() {
                state.frames.push_back(error(code));
                return;
            }
        }

        let reply = |reply: Reply| Frame::Reply { sequence, reply };
        let frame = match request {
            Request::InternAtom { only_if_exists, name } => match state.atoms.get(&name).copied() {
                Some(atom) => Some(reply(Reply::Atom(atom))),
                None if only_if_exists => Some(reply(Reply::Atom(NONE))),
                None => Some(reply(Reply::Atom(intern(state, &name)))),
            },
            Request::GetAtomName { atom } => match state.names.get(&atom).cloned() {
                Some(name) => Some(reply(Reply::AtomName(name))),
                None => Some(error(BAD_ATOM)),
            },
            Request::GetProperty { window, property, .. } => {
                if state.known(window) {
                    let value = state.properties.get(&(window, property)).cloned().unwrap_or_default();
                    Some(reply(Reply::Property(value)))
                } else {
                    Some(error(BAD_WINDOW))
                }
            },
            Request::ChangeProperty { mode: prop_mode, window, property, type_, format, data } => {
                if !state.known(window) {
                    Some(error(BAD_WINDOW))
                } else {
                    let entry = state.properties.entry((window, property)).or_default();
                    match prop_mode {
                        PropMode::Replace => entry.value = data,
                        PropMode::Append => entry.value.extend(data),
                        PropMode::Prepend => entry.value.splice(0..0, data).for_each(drop),
                    }
                    entry.type_ = type_;
                    entry.format = format;
                    property_notify(state, window, property, 0);
                    ack_if(mode, ack)
                }
            },
            Request::DeleteProperty { window, property } => {
                if state.properties.remove(&(window, property)).is_some() {
                    property_notify(state, window, property, 1);
                }
                ack_if(mode, ack)
            },
            Request::SendEvent { destination, event_mask, event, .. } => {
                if !state.known(destination) {
                    Some(error(BAD_WINDOW))
                } else {
                    let selected = state.masks.get(&destination).copied().unwrap_or(0);
                    if selected & event_mask != 0 {
                        let mut bytes = event.to_vec();
                        bytes[0] |= 0x80;
                        state.frames.push_back(Frame::Event { sequence, bytes });
                    }
                    ack_if(mode, ack)
                }
            },
            Request::ChangeWindowAttributes { window, event_mask } => {
                if state.known(window) {
                    state.masks.insert(window, event_mask);
                    ack_if(mode, ack)
                } else {
                    Some(error(BAD_WINDOW))
                }
            },
            Request::GetWindowAttributes { window } => {
                if state.known(window) {
                    let mask = state.masks.get(&window).copied().unwrap_or(0);
                    Some(reply(Reply::WindowAttributes(WindowAttributes {
                        class: 1,
                        map_state: 2,
                        override_redirect: false,
                        all_event_masks: mask,
                        your_event_mask: mask,
                    })))
                } else {
                    Some(error(BAD_WINDOW))
                }
            },
            Request::GetGeometry { window } => match state.geometries.get(&window) {
                Some(g) => Some(reply(Reply::Geometry(g.clone()))),
                None => Some(error(BAD_DRAWABLE)),
            },
            Request::QueryTree { window } => {
                if state.known(window) {
                    let parent = state.parents.get(&window).copied().unwrap_or(NONE);
                    let children =
                        state.windows.iter().copied().filter(|x| state.parents.get(x) == Some(&window)).collect();
                    Some(reply(Reply::Tree { root: ROOT, parent, children }))
                } else {
                    Some(error(BAD_WINDOW))
                }
            },
            Request::TranslateCoordinates { src, dst, x, y } => {
                let (sx, sy) = origin(state, src);
                let (dx, dy) = origin(state, dst);
                Some(reply(Reply::Coordinates {
                    child: NONE,
                    x: (x as i32 + sx - dx) as i16,
                    y: (y as i32 + sy - dy) as i16,
                }))
            },
            Request::ConfigureWindow { window, x, y, width, height, border_width, .. } => {
                match state.geometries.get_mut(&window) {
                    Some(g) => {
                        g.x = x.map(|v| v as i16).unwrap_or(g.x);
                        g.y = y.map(|v| v as i16).unwrap_or(g.y);
                        g.width = width.map(|v| v as u16).unwrap_or(g.width);
                        g.height = height.map(|v| v as u16).unwrap_or(g.height);
                        g.border_width = border_width.map(|v| v as u16).unwrap_or(g.border_width);
                        ack_if(mode, ack)
                    },
                    None => Some(error(BAD_WINDOW)),
                }
            },
            Request::GetInputFocus => Some(reply(Reply::InputFocus {
                focus: state.focus,
                revert_to: RevertTo::PointerRoot,
            })),
            Request::SetInputFocus { focus, .. } => {
                state.focus = focus;
                ack_if(mode, ack)
            },
            Request::GetSelectionOwner { selection } => {
                Some(reply(Reply::SelectionOwner(state.owners.get(&selection).copied().unwrap_or(NONE))))
            },
            Request::GrabKey { window, modifiers, key } => {
                if state.denied_keys.contains(&(window, modifiers, key)) {
                    Some(error(BAD_ACCESS))
                } else {
                    state.key_grabs.insert((window, modifiers, key));
                    ack_if(mode, ack)
                }
            },
            Request::UngrabKey { window, modifiers, key } => {
                state.key_grabs.remove(&(window, modifiers, key));
                ack_if(mode, ack)
            },
            Request::GrabButton { window, modifiers, button, .. } => {
                if state.denied_buttons.contains(&(window, modifiers, button)) {
                    Some(error(BAD_ACCESS))
                } else {
                    state.button_grabs.insert((window, modifiers, button));
                    ack_if(mode, ack)
                }
            },
            Request::UngrabButton { window, modifiers, button } => {
                state.button_grabs.remove(&(window, modifiers, button));
                ack_if(mode, ack)
            },
            Request::AllowEvents { .. } => ack_if(mode, ack),
            Request::GetKeyboardMapping { first_keycode, count } => {
                let per = state.keysyms_per_keycode as usize;
                let start = (first_keycode - self.setup.min_keycode) as usize * per;
                let end = (start + count as usize * per).min(state.keysyms.len());
                Some(reply(Reply::KeyboardMapping {
                    keysyms_per_keycode: state.keysyms_per_keycode,
                    keysyms: state.keysyms[start..end].to_vec(),
                }))
            },
            Request::GetModifierMapping => Some(reply(Reply::ModifierMapping {
                keycodes_per_modifier: (state.modifiers.len() / 8) as u8,
                keycodes: state.modifiers.clone(),
            })),
        };
        if let Some(frame) = frame {
            state.frames.push_back(frame);
        }
    }
}

impl Transport for FakeServer {
    fn send(&self, request: Request, mode: Mode) -> WindowManagerResult<SequenceNumber> {
        let mut state = self.state.borrow_mut();
        state.sequence += 1;
        let sequence = state.sequence;
        state.sent.push(request.clone());
        state.queued.push((sequence, request, mode));
        Ok(sequence)
    }

    fn flush(&self) -> WindowManagerResult<()> {
        let mut state = self.state.borrow_mut();
        let queued = std::mem::take(&mut state.queued);
        for (sequence, request, mode) in queued {
            self.process(&mut state, sequence, request, mode);
        }
        Ok(())
    }

    fn recv_next(&self) -> WindowManagerResult<Frame> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.read_errors.pop_front() {
            return Err(err.into());
        }

        // Nothing left means the client would block forever
        state.frames.pop_front().ok_or_else(|| WindowManagerError::ConnectionClosed.into())
    }

    fn poll_next(&self) -> WindowManagerResult<Option<Frame>> {
        Ok(self.state.borrow_mut().frames.pop_front())
    }

    fn byte_order(&self) -> ByteOrder {
        ORDER
    }

    fn setup(&self) -> &SetupInfo {
        &self.setup
    }
}

impl State {
    fn known(&self, window: Window) -> bool {
        self.geometries.contains_key(&window)
    }
}

fn intern(state: &mut State, name: &str) -> Atom {
    if let Some(atom) = state.atoms.get(name) {
        return *atom;
    }
    let atom = state.next_atom;
    state.next_atom += 1;
    state.atoms.insert(name.to_owned(), atom);
    state.names.insert(atom, name.to_owned());
    atom
}

fn ack_if(mode: Mode, ack: Frame) -> Option<Frame> {
    match mode {
        Mode::Checked => Some(ack),
        Mode::Unchecked => None,
    }
}

fn property_notify(state: &mut State, window: Window, atom: Atom, deleted: u8) {
    let selected = state.masks.get(&window).copied().unwrap_or(0);
    if selected & u32::from(EventMask::PROPERTY_CHANGE) != 0 {
        let mut bytes = [0u8; 32];
        bytes[0] = 28;
        bytes[4..8].copy_from_slice(&ORDER.write_u32(window));
        bytes[8..12].copy_from_slice(&ORDER.write_u32(atom));
        bytes[16] = deleted;
        let sequence = state.sequence;
        state.frames.push_back(Frame::Event { sequence, bytes: bytes.to_vec() });
    }
}

// Location of the window in root coordinates
fn origin(state: &State, window: Window) -> (i32, i32) {
    let (mut x, mut y) = (0, 0);
    let mut current = window;
    while current != ROOT {
        match (state.geometries.get(&current), state.parents.get(&current)) {
            (Some(g), Some(parent)) => {
                x += g.x as i32;
                y += g.y as i32;
                current = *parent;
            },
            _ => break,
        }
    }
    (x, y)
}

pub fn words(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|x| ORDER.write_u32(*x)).collect()
}

/// Connect a window manager to a fresh fake server
pub fn connect() -> WindowManager<FakeServer> {
    WindowManager::with_transport(FakeServer::new(), &ConnectOptions::new()).unwrap()
}

pub fn key_press(window: Window, keycode: Keycode, state: u16) -> [u8; 32] {
    pointer_event(2, window, keycode, state)
}

pub fn button_press(window: Window, button: u8, state: u16) -> [u8; 32] {
    pointer_event(4, window, button, state)
}

fn pointer_event(code: u8, window: Window, detail: u8, state: u16) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = code;
    bytes[1] = detail;
    bytes[8..12].copy_from_slice(&ORDER.write_u32(ROOT));
    bytes[12..16].copy_from_slice(&ORDER.write_u32(window));
    bytes[28..30].copy_from_slice(&ORDER.write_u16(state));
    bytes[30] = 1;
    bytes
}

pub fn property_event(window: Window, atom: Atom) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = 28;
    bytes[4..8].copy_from_slice(&ORDER.write_u32(window));
    bytes[8..12].copy_from_slice(&ORDER.write_u32(atom));
    bytes
}

pub fn map_request(parent: Window, window: Window) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = 20;
    bytes[4..8].copy_from_slice(&ORDER.write_u32(parent));
    bytes[8..12].copy_from_slice(&ORDER.write_u32(window));
    bytes
}

pub fn mapping_notify(request: u8) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = 34;
    bytes[4] = request;
    bytes[5] = 8;
    bytes[6] = 8;
    bytes
}
