//! The connection handle contract consumed by the rest of the crate.
//!
//! A [`Transport`] owns the live stream to the display server. Requests go in as typed
//! [`Request`] values and come back, in the order the server produced them, as [`Frame`]s:
//! a decoded reply, an acknowledgement for a checked request without reply, a protocol error
//! or a raw 32 byte event. Property payloads and event frames stay raw so the codec and the
//! dispatcher can decode them with the connection's byte order.
use crate::{cookie::Mode, ProtocolError, WindowManagerResult};

pub type Atom = u32;
pub type Window = u32;
pub type Timestamp = u32;
pub type Keycode = u8;
pub type Keysym = u32;
pub type SequenceNumber = u64;

/// Atom value meaning "no atom", also used as AnyPropertyType
pub const NONE: u32 = 0;

/// Timestamp value meaning "the server's current time"
pub const CURRENT_TIME: Timestamp = 0;

/// Byte order negotiated for the connection, property data and events are encoded with it
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the running host which is what `x11rb` negotiates
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    pub fn write_u16(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    pub fn write_u32(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }
}

/// Screen and keyboard details captured at connection setup
#[derive(Clone, Debug, PartialEq)]
pub struct SetupInfo {
    pub screen: usize,
    pub root: Window,
    pub width: u16,
    pub height: u16,
    pub min_keycode: Keycode,
    pub max_keycode: Keycode,
}

/// How ChangeProperty combines the new data with the old
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PropMode {
    Replace,
    Prepend,
    Append,
}

/// Focus revert target for SetInputFocus
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RevertTo {
    None,
    PointerRoot,
    Parent,
}

impl From<u8> for RevertTo {
    fn from(val: u8) -> Self {
        match val {
            1 => RevertTo::PointerRoot,
            2 => RevertTo::Parent,
            _ => RevertTo::None,
        }
    }
}

/// Stacking mode for ConfigureWindow and _NET_RESTACK_WINDOW
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StackMode {
    Above,
    Below,
    TopIf,
    BottomIf,
    Opposite,
}

impl From<StackMode> for u32 {
    fn from(val: StackMode) -> Self {
        match val {
            StackMode::Above => 0,
            StackMode::Below => 1,
            StackMode::TopIf => 2,
            StackMode::BottomIf => 3,
            StackMode::Opposite => 4,
        }
    }
}

/// AllowEvents mode, only the modes used to release frozen pointer grabs are exposed
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AllowMode {
    AsyncPointer,
    SyncPointer,
    ReplayPointer,
}

/// Protocol requests the crate knows how to issue
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    InternAtom {
        only_if_exists: bool,
        name: String,
    },
    GetAtomName {
        atom: Atom,
    },
    GetProperty {
        window: Window,
        property: Atom,
        type_: Atom,
    },
    ChangeProperty {
        mode: PropMode,
        window: Window,
        property: Atom,
        type_: Atom,
        format: u8,
        data: Vec<u8>,
    },
    DeleteProperty {
        window: Window,
        property: Atom,
    },
    SendEvent {
        propagate: bool,
        destination: Window,
        event_mask: u32,
        event: [u8; 32],
    },
    ChangeWindowAttributes {
        window: Window,
        event_mask: u32,
    },
    GetWindowAttributes {
        window: Window,
    },
    GetGeometry {
        window: Window,
    },
    QueryTree {
        window: Window,
    },
    TranslateCoordinates {
        src: Window,
        dst: Window,
        x: i16,
        y: i16,
    },
    ConfigureWindow {
        window: Window,
        x: Option<i32>,
        y: Option<i32>,
        width: Option<u32>,
        height: Option<u32>,
        border_width: Option<u32>,
        sibling: Option<Window>,
        stack_mode: Option<StackMode>,
    },
    GetInputFocus,
    SetInputFocus {
        focus: Window,
        revert_to: RevertTo,
        time: Timestamp,
    },
    GetSelectionOwner {
        selection: Atom,
    },
    GrabKey {
        window: Window,
        modifiers: u16,
        key: Keycode,
    },
    UngrabKey {
        window: Window,
        modifiers: u16,
        key: Keycode,
    },
    GrabButton {
        window: Window,
        event_mask: u32,
        modifiers: u16,
        button: u8,
        sync_pointer: bool,
    },
    UngrabButton {
        window: Window,
        modifiers: u16,
        button: u8,
    },
    AllowEvents {
        mode: AllowMode,
        time: Timestamp,
    },
    GetKeyboardMapping {
        first_keycode: Keycode,
        count: u8,
    },
    GetModifierMapping,
}

impl Request {
    /// True when the server answers the request with a reply
    pub fn has_reply(&self) -> bool {
        matches!(
            self,
            Request::InternAtom { .. }
                | Request::GetAtomName { .. }
                | Request::GetProperty { .. }
                | Request::GetWindowAttributes { .. }
                | Request::GetGeometry { .. }
                | Request::QueryTree { .. }
                | Request::TranslateCoordinates { .. }
                | Request::GetInputFocus
                | Request::GetSelectionOwner { .. }
                | Request::GetKeyboardMapping { .. }
                | Request::GetModifierMapping
        )
    }

    /// Protocol name of the request
    pub fn name(&self) -> &'static str {
        match self {
            Request::InternAtom { .. } => "InternAtom",
            Request::GetAtomName { .. } => "GetAtomName",
            Request::GetProperty { .. } => "GetProperty",
            Request::ChangeProperty { .. } => "ChangeProperty",
            Request::DeleteProperty { .. } => "DeleteProperty",
            Request::SendEvent { .. } => "SendEvent",
            Request::ChangeWindowAttributes { .. } => "ChangeWindowAttributes",
            Request::GetWindowAttributes { .. } => "GetWindowAttributes",
            Request::GetGeometry { .. } => "GetGeometry",
            Request::QueryTree { .. } => "QueryTree",
            Request::TranslateCoordinates { .. } => "TranslateCoordinates",
            Request::ConfigureWindow { .. } => "ConfigureWindow",
            Request::GetInputFocus => "GetInputFocus",
            Request::SetInputFocus { .. } => "SetInputFocus",
            Request::GetSelectionOwner { .. } => "GetSelectionOwner",
            Request::GrabKey { .. } => "GrabKey",
            Request::UngrabKey { .. } => "UngrabKey",
            Request::GrabButton { .. } => "GrabButton",
            Request::UngrabButton { .. } => "UngrabButton",
            Request::AllowEvents { .. } => "AllowEvents",
            Request::GetKeyboardMapping { .. } => "GetKeyboardMapping",
            Request::GetModifierMapping => "GetModifierMapping",
        }
    }
}

/// Raw GetProperty reply, `value` is still in the connection's byte order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyReply {
    pub type_: Atom,
    pub format: u8,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowAttributes {
    pub class: u32,
    pub map_state: u32,
    pub override_redirect: bool,
    pub all_event_masks: u32,
    pub your_event_mask: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeometryReply {
    pub root: Window,
    pub depth: u8,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
}

/// Decoded server replies
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Atom(Atom),
    AtomName(String),
    Property(PropertyReply),
    WindowAttributes(WindowAttributes),
    Geometry(GeometryReply),
    Tree { root: Window, parent: Window, children: Vec<Window> },
    Coordinates { child: Window, x: i16, y: i16 },
    InputFocus { focus: Window, revert_to: RevertTo },
    SelectionOwner(Window),
    KeyboardMapping { keysyms_per_keycode: u8, keysyms: Vec<Keysym> },
    ModifierMapping { keycodes_per_modifier: u8, keycodes: Vec<Keycode> },
}

/// One unit read from the connection
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Reply { sequence: SequenceNumber, reply: Reply },
    Ack { sequence: SequenceNumber },
    Error(ProtocolError),
    Event { sequence: SequenceNumber, bytes: Vec<u8> },
}

/// Transport is the connection handle. Reads are only ever driven by the engine that owns the
/// transport, one frame at a time.
pub trait Transport {
    /// Queue the request and return its sequence number without waiting for the server
    fn send(&self, request: Request, mode: Mode) -> WindowManagerResult<SequenceNumber>;

    /// Push every queued request to the server
    fn flush(&self) -> WindowManagerResult<()>;

    /// Block until the next frame arrives
    fn recv_next(&self) -> WindowManagerResult<Frame>;

    /// Return a frame that has already arrived, never blocks
    fn poll_next(&self) -> WindowManagerResult<Option<Frame>>;

    /// Byte order property data and events are encoded with
    fn byte_order(&self) -> ByteOrder;

    /// Setup details for the connection's default screen
    fn setup(&self) -> &SetupInfo;
}
