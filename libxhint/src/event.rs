//! Event decoding and dispatch.
//!
//! Core protocol events arrive as 32 byte frames. [`Event`] keeps the raw frame, decoded with the
//! connection's byte order, along with its kind and the window it should be routed to. The
//! [`Dispatcher`] maps (kind, window) keys to callbacks which `WindowManager::main_loop` invokes in
//! registration order.
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{debug, error, trace, warn};
use x11rb::protocol::xproto::EventMask;

use crate::{
    cookie::{Incoming, Mode, VoidCookie},
    transport::{Atom, ByteOrder, Request, SequenceNumber, Transport, Window},
    WindowManager, WindowManagerError, WindowManagerResult,
};

/// EventKind identifies a core protocol event by its type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    KeyPress,
    KeyRelease,
    ButtonPress,
    ButtonRelease,
    MotionNotify,
    EnterNotify,
    LeaveNotify,
    FocusIn,
    FocusOut,
    KeymapNotify,
    Expose,
    GraphicsExposure,
    NoExposure,
    VisibilityNotify,
    CreateNotify,
    DestroyNotify,
    UnmapNotify,
    MapNotify,
    MapRequest,
    ReparentNotify,
    ConfigureNotify,
    ConfigureRequest,
    GravityNotify,
    ResizeRequest,
    CirculateNotify,
    CirculateRequest,
    PropertyNotify,
    SelectionClear,
    SelectionRequest,
    SelectionNotify,
    ColormapNotify,
    ClientMessage,
    MappingNotify,
    GenericEvent,
    Unknown(u8),
}

impl From<u8> for EventKind {
    fn from(val: u8) -> Self {
        match val {
            2 => EventKind::KeyPress,
            3 => EventKind::KeyRelease,
            4 => EventKind::ButtonPress,
            5 => EventKind::ButtonRelease,
            6 => EventKind::MotionNotify,
            7 => EventKind::EnterNotify,
            8 => EventKind::LeaveNotify,
            9 => EventKind::FocusIn,
            10 => EventKind::FocusOut,
            11 => EventKind::KeymapNotify,
            12 => EventKind::Expose,
            13 => EventKind::GraphicsExposure,
            14 => EventKind::NoExposure,
            15 => EventKind::VisibilityNotify,
            16 => EventKind::CreateNotify,
            17 => EventKind::DestroyNotify,
            18 => EventKind::UnmapNotify,
            19 => EventKind::MapNotify,
            20 => EventKind::MapRequest,
            21 => EventKind::ReparentNotify,
            22 => EventKind::ConfigureNotify,
            23 => EventKind::ConfigureRequest,
            24 => EventKind::GravityNotify,
            25 => EventKind::ResizeRequest,
            26 => EventKind::CirculateNotify,
            27 => EventKind::CirculateRequest,
            28 => EventKind::PropertyNotify,
            29 => EventKind::SelectionClear,
            30 => EventKind::SelectionRequest,
            31 => EventKind::SelectionNotify,
            32 => EventKind::ColormapNotify,
            33 => EventKind::ClientMessage,
            34 => EventKind::MappingNotify,
            35 => EventKind::GenericEvent,
            _ => EventKind::Unknown(val),
        }
    }
}

impl From<EventKind> for u8 {
    fn from(val: EventKind) -> Self {
        match val {
            EventKind::KeyPress => 2,
            EventKind::KeyRelease => 3,
            EventKind::ButtonPress => 4,
            EventKind::ButtonRelease => 5,
            EventKind::MotionNotify => 6,
            EventKind::EnterNotify => 7,
            EventKind::LeaveNotify => 8,
            EventKind::FocusIn => 9,
            EventKind::FocusOut => 10,
            EventKind::KeymapNotify => 11,
            EventKind::Expose => 12,
            EventKind::GraphicsExposure => 13,
            EventKind::NoExposure => 14,
            EventKind::VisibilityNotify => 15,
            EventKind::CreateNotify => 16,
            EventKind::DestroyNotify => 17,
            EventKind::UnmapNotify => 18,
            EventKind::MapNotify => 19,
            EventKind::MapRequest => 20,
            EventKind::ReparentNotify => 21,
            EventKind::ConfigureNotify => 22,
            EventKind::ConfigureRequest => 23,
            EventKind::GravityNotify => 24,
            EventKind::ResizeRequest => 25,
            EventKind::CirculateNotify => 26,
            EventKind::CirculateRequest => 27,
            EventKind::PropertyNotify => 28,
            EventKind::SelectionClear => 29,
            EventKind::SelectionRequest => 30,
            EventKind::SelectionNotify => 31,
            EventKind::ColormapNotify => 32,
            EventKind::ClientMessage => 33,
            EventKind::MappingNotify => 34,
            EventKind::GenericEvent => 35,
            EventKind::Unknown(x) => x,
        }
    }
}

// Implement format! support
impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventKind::Unknown(x) => write!(f, "unknown({})", x),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Event is a decoded 32 byte event frame
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub synthetic: bool,
    pub sequence: SequenceNumber,

    // Window the event is routed by, see `route`
    pub window: Option<Window>,
    order: ByteOrder,
    body: [u8; 32],
}

impl Event {
    /// Decode an event frame, the high bit of the type code marks events sent with SendEvent
    pub fn parse(bytes: &[u8], sequence: SequenceNumber, order: ByteOrder) -> WindowManagerResult<Event> {
        if bytes.len() < 32 {
            return Err(WindowManagerError::MalformedEvent(bytes.len()).into());
        }
        let mut body = [0u8; 32];
        body.copy_from_slice(&bytes[..32]);
        let kind = EventKind::from(body[0] & 0x7f);
        let window = route(kind, &body, order);
        Ok(Event {
            kind,
            synthetic: body[0] & 0x80 != 0,
            sequence,
            window,
            order,
            body,
        })
    }

    /// Raw frame
    pub fn bytes(&self) -> &[u8; 32] {
        &self.body
    }

    /// Second byte of the frame, e.g. the keycode of a key press or the button of a button press
    pub fn detail(&self) -> u8 {
        self.body[1]
    }

    pub fn u8_at(&self, offset: usize) -> u8 {
        self.body[offset]
    }

    pub fn u16_at(&self, offset: usize) -> u16 {
        self.order.read_u16(&self.body[offset..offset + 2])
    }

    pub fn i16_at(&self, offset: usize) -> i16 {
        self.u16_at(offset) as i16
    }

    pub fn u32_at(&self, offset: usize) -> u32 {
        self.order.read_u32(&self.body[offset..offset + 4])
    }

    /// Modifier and button state of key, button, motion and crossing events
    pub fn state(&self) -> Option<u16> {
        match self.kind {
            EventKind::KeyPress
            | EventKind::KeyRelease
            | EventKind::ButtonPress
            | EventKind::ButtonRelease
            | EventKind::MotionNotify
            | EventKind::EnterNotify
            | EventKind::LeaveNotify => Some(self.u16_at(28)),
            _ => None,
        }
    }

    /// Position relative to the root window of pointer related events
    pub fn root_position(&self) -> Option<(i16, i16)> {
        self.state().map(|_| (self.i16_at(20), self.i16_at(22)))
    }

    /// Atom that changed for a PropertyNotify
    pub fn property(&self) -> Option<Atom> {
        match self.kind {
            EventKind::PropertyNotify => Some(self.u32_at(8)),
            _ => None,
        }
    }

    /// Decode the payload of a ClientMessage
    pub fn client_message(&self) -> Option<ClientMessage> {
        match self.kind {
            EventKind::ClientMessage => {
                let mut data = [0u32; 5];
                for (i, x) in data.iter_mut().enumerate() {
                    *x = self.u32_at(12 + i * 4);
                }
                Some(ClientMessage {
                    format: self.body[1],
                    window: self.u32_at(4),
                    type_: self.u32_at(8),
                    data,
                })
            },
            _ => None,
        }
    }

    /// Which table a MappingNotify refers to: 0 modifier, 1 keyboard, 2 pointer
    pub fn mapping_request(&self) -> Option<u8> {
        match self.kind {
            EventKind::MappingNotify => Some(self.body[4]),
            _ => None,
        }
    }
}

// Window an event is routed by. MapRequest goes to the parent that asked for redirection and
// MappingNotify isn't tied to any window. Otherwise the `window` field wins, then `event`, `owner`
// and `requestor`.
fn route(kind: EventKind, body: &[u8; 32], order: ByteOrder) -> Option<Window> {
    let at = |offset: usize| Some(order.read_u32(&body[offset..offset + 4]));
    match kind {
        EventKind::KeyPress
        | EventKind::KeyRelease
        | EventKind::ButtonPress
        | EventKind::ButtonRelease
        | EventKind::MotionNotify
        | EventKind::EnterNotify
        | EventKind::LeaveNotify => at(12),
        EventKind::FocusIn | EventKind::FocusOut => at(4),
        EventKind::Expose | EventKind::VisibilityNotify | EventKind::ResizeRequest => at(4),
        EventKind::CreateNotify
        | EventKind::DestroyNotify
        | EventKind::UnmapNotify
        | EventKind::MapNotify
        | EventKind::ReparentNotify
        | EventKind::ConfigureNotify
        | EventKind::ConfigureRequest
        | EventKind::GravityNotify
        | EventKind::CirculateNotify
        | EventKind::CirculateRequest => at(8),
        EventKind::MapRequest => at(4),
        EventKind::PropertyNotify | EventKind::ColormapNotify | EventKind::ClientMessage => at(4),
        EventKind::SelectionClear | EventKind::SelectionRequest => at(8),
        EventKind::SelectionNotify => at(8),
        EventKind::KeymapNotify
        | EventKind::GraphicsExposure
        | EventKind::NoExposure
        | EventKind::MappingNotify
        | EventKind::GenericEvent
        | EventKind::Unknown(_) => None,
    }
}

/// ClientMessage is the 32 bit client message used for window manager requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientMessage {
    pub format: u8,
    pub window: Window,
    pub type_: Atom,
    pub data: [u32; 5],
}

impl ClientMessage {
    /// Create a 32 bit client message, unused data slots are zero
    pub fn new(window: Window, type_: Atom, data: &[u32]) -> Self {
        let mut slots = [0u32; 5];
        for (slot, value) in slots.iter_mut().zip(data) {
            *slot = *value;
        }
        Self {
            format: 32,
            window,
            type_,
            data: slots,
        }
    }

    /// Encode as an event frame ready for SendEvent
    pub fn encode(&self, order: ByteOrder) -> [u8; 32] {
        let mut frame = [0u8; 32];
        frame[0] = EventKind::ClientMessage.into();
        frame[1] = self.format;
        frame[4..8].copy_from_slice(&order.write_u32(self.window));
        frame[8..12].copy_from_slice(&order.write_u32(self.type_));
        for (i, x) in self.data.iter().enumerate() {
            frame[12 + i * 4..16 + i * 4].copy_from_slice(&order.write_u32(*x));
        }
        frame
    }
}

/// CallbackId identifies a registration so it can be removed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

/// Callback invoked for a dispatched event
pub type Callback<T> = Rc<dyn Fn(&WindowManager<T>, &Event) -> WindowManagerResult<()>>;

/// LoopState tracks what the dispatcher is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Blocked,
    Dispatching,
}

/// StopHandle ends a running main loop, it may be sent to other threads
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the loop to return once the current event has been dispatched. A loop blocked on the
    /// connection notices after the next frame arrives.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

type Key = (EventKind, Option<Window>);

/// Dispatcher keeps the callback registry and listen masks
pub struct Dispatcher<T: Transport> {
    callbacks: RefCell<HashMap<Key, Vec<(CallbackId, Callback<T>)>>>,
    masks: RefCell<HashMap<Window, u32>>,
    next_id: Cell<u64>,
    state: Cell<LoopState>,
    stop: Arc<AtomicBool>,
}

impl<T: Transport> Default for Dispatcher<T> {
    fn default() -> Self {
        Self {
            callbacks: RefCell::new(HashMap::new()),
            masks: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
            state: Cell::new(LoopState::Idle),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<T: Transport> Dispatcher<T> {
    pub(crate) fn next_id(&self) -> CallbackId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        CallbackId(id)
    }

    fn callbacks_for(&self, key: &Key) -> Vec<Callback<T>> {
        match self.callbacks.borrow().get(key) {
            Some(x) => x.iter().map(|(_, cb)| cb.clone()).collect(),
            None => vec![],
        }
    }
}

impl<T: Transport> WindowManager<T> {
    /// Select events on the given window, the mask is merged with what was selected before
    ///
    /// ### Arguments
    /// * `window` - window to select events on
    /// * `mask` - event categories to add
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.listen(wm.root(), EventMask::PROPERTY_CHANGE).unwrap();
    /// ```
    pub fn listen(&self, window: Window, mask: EventMask) -> WindowManagerResult<()> {
        let known = self.dispatcher.masks.borrow().get(&window).copied();
        let current = match known {
            Some(x) => x,
            None => self.get_window_attributes(window)?.reply()?.your_event_mask,
        };
        let merged = current | u32::from(mask);
        self.dispatcher.masks.borrow_mut().insert(window, merged);
        debug!("listen: win: {}, mask: {:#x}", window, merged);
        self.engine
            .issue_void(Request::ChangeWindowAttributes { window, event_mask: merged }, Mode::Checked)?
            .check()
    }

    /// Event mask this client has selected on the window through `listen`
    pub fn listen_mask(&self, window: Window) -> u32 {
        self.dispatcher.masks.borrow().get(&window).copied().unwrap_or(0)
    }

    /// Register a callback for events of the given kind routed to the given window
    ///
    /// ### Arguments
    /// * `kind` - event kind to react to
    /// * `window` - routing window, `None` for events not tied to a window like MappingNotify
    /// * `callback` - invoked with the window manager and the decoded event
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.connect(EventKind::PropertyNotify, Some(wm.root()), |_, e| {
    ///     println!("{:?}", e.property());
    ///     Ok(())
    /// });
    /// ```
    pub fn connect<F>(&self, kind: EventKind, window: Option<Window>, callback: F) -> CallbackId
    where
        F: Fn(&WindowManager<T>, &Event) -> WindowManagerResult<()> + 'static,
    {
        let id = self.dispatcher.next_id();
        self.dispatcher.callbacks.borrow_mut().entry((kind, window)).or_default().push((id, Rc::new(callback)));
        trace!("connect: kind: {}, win: {:?}, id: {:?}", kind, window, id);
        id
    }

    /// Remove a single registration, returns false if it was already gone
    pub fn disconnect(&self, id: CallbackId) -> bool {
        let mut callbacks = self.dispatcher.callbacks.borrow_mut();
        let mut removed = false;
        for list in callbacks.values_mut() {
            let len = list.len();
            list.retain(|(x, _)| *x != id);
            removed |= list.len() != len;
        }
        callbacks.retain(|_, list| !list.is_empty());
        removed
    }

    /// Remove every registration for the given kind and window
    pub fn disconnect_all(&self, kind: EventKind, window: Option<Window>) -> usize {
        self.dispatcher.callbacks.borrow_mut().remove(&(kind, window)).map(|x| x.len()).unwrap_or(0)
    }

    /// True when at least one callback is registered for the kind and window
    pub fn is_connected(&self, kind: EventKind, window: Option<Window>) -> bool {
        self.dispatcher.callbacks.borrow().get(&(kind, window)).map(|x| !x.is_empty()).unwrap_or(false)
    }

    /// Send a raw event frame to the given window, unchecked
    pub fn send_event(
        &self, window: Window, mask: EventMask, event: [u8; 32], propagate: bool,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.send_event_with(window, mask, event, propagate, Mode::Unchecked)
    }

    pub fn send_event_checked(
        &self, window: Window, mask: EventMask, event: [u8; 32], propagate: bool,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        self.send_event_with(window, mask, event, propagate, Mode::Checked)
    }

    fn send_event_with(
        &self, window: Window, mask: EventMask, event: [u8; 32], propagate: bool, mode: Mode,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        let request = Request::SendEvent {
            propagate,
            destination: window,
            event_mask: u32::from(mask),
            event,
        };
        self.engine.issue_void(request, mode)
    }

    /// Send a 32 bit client message about `window` to the root window where the window manager
    /// picks it up
    ///
    /// ### Arguments
    /// * `window` - window the message is about
    /// * `type_name` - message type, e.g. `_NET_ACTIVE_WINDOW`
    /// * `data` - up to five values, missing values are zero
    /// * `mode` - whether the SendEvent is checked
    pub fn root_send_client_event(
        &self, window: Window, type_name: &str, data: &[u32], mode: Mode,
    ) -> WindowManagerResult<VoidCookie<'_, T>> {
        let type_ = self.atom(type_name)?;
        let msg = ClientMessage::new(window, type_, data);
        let mask = EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY;
        debug!("root_send_client_event: win: {}, type: {}, data: {:?}", window, type_name, msg.data);
        self.send_event_with(self.root(), mask, msg.encode(self.byte_order()), false, mode)
    }

    /// Get a handle that stops the main loop from anywhere
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.dispatcher.stop.clone())
    }

    /// Ask the main loop to return once the current event has been dispatched
    pub fn stop(&self) {
        self.dispatcher.stop.store(true, Ordering::SeqCst);
    }

    /// What the dispatcher is currently doing
    pub fn loop_state(&self) -> LoopState {
        self.dispatcher.state.get()
    }

    /// Block on the connection dispatching events until stopped or the connection fails
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// wm.listen(wm.root(), EventMask::PROPERTY_CHANGE).unwrap();
    /// wm.connect(EventKind::PropertyNotify, Some(wm.root()), |wm, _| {
    ///     wm.stop();
    ///     Ok(())
    /// });
    /// wm.main_loop().unwrap();
    /// ```
    pub fn main_loop(&self) -> WindowManagerResult<()> {
        debug!("main_loop: starting");
        loop {
            if self.dispatcher.stop.swap(false, Ordering::SeqCst) {
                self.dispatcher.state.set(LoopState::Idle);
                debug!("main_loop: stopped");
                return Ok(());
            }
            self.dispatcher.state.set(LoopState::Blocked);
            let incoming = match self.engine.next_incoming(true) {
                Ok(Some(x)) => x,
                Ok(None) => continue,
                Err(err) if !err.is_fatal() => {
                    warn!("main_loop: {}", err);
                    continue;
                },
                Err(err) => {
                    self.dispatcher.state.set(LoopState::Idle);
                    error!("main_loop: {}", err);
                    return Err(err);
                },
            };
            self.dispatcher.state.set(LoopState::Dispatching);
            self.dispatch(incoming);
        }
    }

    /// Dispatch whatever has already arrived without blocking, returns the number dispatched
    pub fn process_pending(&self) -> WindowManagerResult<usize> {
        let previous = self.dispatcher.state.replace(LoopState::Dispatching);
        let mut count = 0;
        let result = loop {
            match self.engine.next_incoming(false) {
                Ok(Some(incoming)) => {
                    self.dispatch(incoming);
                    count += 1;
                },
                Ok(None) => break Ok(count),
                Err(err) => break Err(err),
            }
        };
        self.dispatcher.state.set(previous);
        result
    }

    fn dispatch(&self, incoming: Incoming) {
        match incoming {
            Incoming::Error(err) => warn!("dispatch: {}", err),
            Incoming::Event { sequence, bytes } => match Event::parse(&bytes, sequence, self.byte_order()) {
                Ok(event) => self.dispatch_event(&event),
                Err(err) => warn!("dispatch: dropping event: {}", err),
            },
        }
    }

    fn dispatch_event(&self, event: &Event) {
        if event.kind == EventKind::MappingNotify {
            if let Err(err) = self.update_keyboard_mapping(event) {
                error!("dispatch: keyboard mapping update failed: {}", err);
            }
        }

        let callbacks = self.dispatcher.callbacks_for(&(event.kind, event.window));
        trace!("dispatch: kind: {}, win: {:?}, callbacks: {}", event.kind, event.window, callbacks.len());
        for callback in callbacks {
            self.run_callback(&callback, event);
        }
    }

    /// Invoke one callback, a failure or panic is logged and doesn't reach the caller
    pub(crate) fn run_callback(&self, callback: &Callback<T>, event: &Event) {
        match panic::catch_unwind(AssertUnwindSafe(|| callback(self, event))) {
            Ok(Ok(())) => {},
            Ok(Err(err)) => error!("dispatch: callback for {} failed: {}", event.kind, err),
            Err(_) => error!("dispatch: callback for {} panicked", event.kind),
        }
    }
}
