//! Property codec.
//!
//! Window properties are untyped byte arrays tagged with a type atom and a format of 8, 16 or 32
//! bits. The codec turns them into [`Value`]s according to a closed catalog of [`Layout`]s and
//! back again. Which layout belongs to which property is kept in a single registry of
//! [`PropertyDescriptor`]s keyed by property name, see [`descriptor`].
use std::fmt;

use crate::{
    transport::{Atom, ByteOrder, PropertyReply, Window, NONE},
    ErrorWrapper, MalformedProperty, WindowManagerError, WindowManagerResult,
};

/// Fixed shape of a record of named 32 bit fields
#[derive(Debug, Eq, PartialEq)]
pub struct RecordLayout {
    pub name: &'static str,
    pub fields: &'static [&'static str],

    // Shorter buffers are accepted down to this many fields and padded with zeros
    pub min_fields: usize,
}

pub static STRUT: RecordLayout = RecordLayout {
    name: "strut",
    fields: &["left", "right", "top", "bottom"],
    min_fields: 4,
};

pub static STRUT_PARTIAL: RecordLayout = RecordLayout {
    name: "strut_partial",
    fields: &[
        "left",
        "right",
        "top",
        "bottom",
        "left_start_y",
        "left_end_y",
        "right_start_y",
        "right_end_y",
        "top_start_x",
        "top_end_x",
        "bottom_start_x",
        "bottom_end_x",
    ],
    min_fields: 12,
};

pub static FRAME_EXTENTS: RecordLayout = RecordLayout {
    name: "frame_extents",
    fields: &["left", "right", "top", "bottom"],
    min_fields: 4,
};

pub static DESKTOP_GEOMETRY: RecordLayout = RecordLayout {
    name: "desktop_geometry",
    fields: &["width", "height"],
    min_fields: 2,
};

pub static ICON_GEOMETRY: RecordLayout = RecordLayout {
    name: "icon_geometry",
    fields: &["x", "y", "width", "height"],
    min_fields: 4,
};

// The starting corner was added late and is often left out
pub static DESKTOP_LAYOUT: RecordLayout = RecordLayout {
    name: "desktop_layout",
    fields: &["orientation", "columns", "rows", "starting_corner"],
    min_fields: 3,
};

pub static WM_STATE: RecordLayout = RecordLayout {
    name: "wm_state",
    fields: &["state", "icon"],
    min_fields: 1,
};

pub static WM_HINTS: RecordLayout = RecordLayout {
    name: "wm_hints",
    fields: &[
        "flags",
        "input",
        "initial_state",
        "icon_pixmap",
        "icon_window",
        "icon_x",
        "icon_y",
        "icon_mask",
        "window_group",
    ],
    min_fields: 8,
};

// Pre ICCCM clients only send the first 15 fields
pub static WM_SIZE_HINTS: RecordLayout = RecordLayout {
    name: "wm_size_hints",
    fields: &[
        "flags",
        "x",
        "y",
        "width",
        "height",
        "min_width",
        "min_height",
        "max_width",
        "max_height",
        "width_inc",
        "height_inc",
        "min_aspect_num",
        "min_aspect_den",
        "max_aspect_num",
        "max_aspect_den",
        "base_width",
        "base_height",
        "win_gravity",
    ],
    min_fields: 15,
};

pub static MOTIF_HINTS: RecordLayout = RecordLayout {
    name: "motif_hints",
    fields: &["flags", "functions", "decorations", "input_mode", "status"],
    min_fields: 4,
};

pub static WORKAREA: RecordLayout = RecordLayout {
    name: "workarea",
    fields: &["x", "y", "width", "height"],
    min_fields: 4,
};

pub static VIEWPORT: RecordLayout = RecordLayout {
    name: "viewport",
    fields: &["x", "y"],
    min_fields: 2,
};

/// Layout is the closed catalog of shapes a property value can take
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Layout {
    Cardinal,
    Cardinals,
    Atom,
    Atoms,
    Window,
    Windows,
    Utf8String,
    Utf8Strings,
    Latin1String,
    Latin1Strings,
    Record(&'static RecordLayout),
    Records(&'static RecordLayout),
    Icons,
}

impl Layout {
    /// Format in bits the property is stored with
    pub fn format(&self) -> u8 {
        match self {
            Layout::Utf8String | Layout::Utf8Strings | Layout::Latin1String | Layout::Latin1Strings => 8,
            _ => 32,
        }
    }

    /// True when the layout holds a variable number of elements
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Layout::Cardinals
                | Layout::Atoms
                | Layout::Windows
                | Layout::Utf8Strings
                | Layout::Latin1Strings
                | Layout::Records(_)
                | Layout::Icons
        )
    }

    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Layout::Cardinal => "cardinal",
            Layout::Cardinals => "cardinal list",
            Layout::Atom => "atom",
            Layout::Atoms => "atom list",
            Layout::Window => "window",
            Layout::Windows => "window list",
            Layout::Utf8String => "utf8 string",
            Layout::Utf8Strings => "utf8 string list",
            Layout::Latin1String => "latin1 string",
            Layout::Latin1Strings => "latin1 string list",
            Layout::Record(x) => x.name,
            Layout::Records(x) => x.name,
            Layout::Icons => "icon list",
        }
    }

    // Value an absent property or empty buffer decodes to
    fn empty(&self) -> Value {
        match self {
            Layout::Cardinal => Value::Cardinal(0),
            Layout::Cardinals => Value::Cardinals(vec![]),
            Layout::Atom => Value::Atom(NONE),
            Layout::Atoms => Value::Atoms(vec![]),
            Layout::Window => Value::Window(NONE),
            Layout::Windows => Value::Windows(vec![]),
            Layout::Utf8String | Layout::Latin1String => Value::Text(String::new()),
            Layout::Utf8Strings | Layout::Latin1Strings => Value::Texts(vec![]),
            Layout::Record(x) => Value::Record(Record::new(x)),
            Layout::Records(_) => Value::Records(vec![]),
            Layout::Icons => Value::Icons(vec![]),
        }
    }
}

// Implement format! support
impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Record is a fixed arity mapping of field names to 32 bit values
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    layout: &'static RecordLayout,
    values: Vec<u32>,
}

impl Record {
    /// Create a record with every field set to zero
    pub fn new(layout: &'static RecordLayout) -> Self {
        Self {
            layout,
            values: vec![0; layout.fields.len()],
        }
    }

    /// Create a record from values given in field order, missing values are zero
    pub fn from_values(layout: &'static RecordLayout, values: &[u32]) -> Self {
        let mut record = Record::new(layout);
        for (slot, value) in record.values.iter_mut().zip(values) {
            *slot = *value;
        }
        record
    }

    pub fn layout(&self) -> &'static RecordLayout {
        self.layout
    }

    /// Get the value of the named field
    pub fn get(&self, field: &str) -> Option<u32> {
        self.index(field).map(|i| self.values[i])
    }

    /// Set the value of the named field, returns false if the layout has no such field
    pub fn set(&mut self, field: &str, value: u32) -> bool {
        match self.index(field) {
            Some(i) => {
                self.values[i] = value;
                true
            },
            None => false,
        }
    }

    /// Builder flavour of `set`
    pub fn with(mut self, field: &str, value: u32) -> Self {
        self.set(field, value);
        self
    }

    /// Values in field order
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Iterate over (field, value) pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.layout.fields.iter().copied().zip(self.values.iter().copied())
    }

    fn index(&self, field: &str) -> Option<usize> {
        self.layout.fields.iter().position(|x| *x == field)
    }
}

/// Icon is one entry of `_NET_WM_ICON`, pixels are ARGB in row major order
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Icon {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

/// Value is a decoded property
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Cardinal(u32),
    Cardinals(Vec<u32>),
    Atom(Atom),
    Atoms(Vec<Atom>),
    Window(Window),
    Windows(Vec<Window>),
    Text(String),
    Texts(Vec<String>),
    Record(Record),
    Records(Vec<Record>),
    Icons(Vec<Icon>),
}

fn mismatch(layout: Layout) -> ErrorWrapper {
    WindowManagerError::LayoutMismatch(layout.name()).into()
}

fn malformed(layout: Layout, len: usize, reason: &str) -> ErrorWrapper {
    MalformedProperty {
        layout: layout.name(),
        len,
        reason: reason.to_owned(),
    }
    .into()
}

fn put_words(buf: &mut Vec<u8>, words: &[u32], order: ByteOrder) {
    for word in words {
        buf.extend_from_slice(&order.write_u32(*word));
    }
}

// NUL separates list elements on the wire so it can't be part of a string
fn without_nul(text: &str) -> WindowManagerResult<&str> {
    if text.contains('\0') {
        return Err(WindowManagerError::EmbeddedNul(text.to_owned()).into());
    }
    Ok(text)
}

fn encode_latin1(text: &str, buf: &mut Vec<u8>) -> WindowManagerResult<()> {
    for c in without_nul(text)?.chars() {
        let code = c as u32;
        if code > 0xff {
            return Err(WindowManagerError::InvalidLatin1(text.to_owned()).into());
        }
        buf.push(code as u8);
    }
    Ok(())
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|x| *x as char).collect()
}

// Split a NUL separated list dropping the terminator of the last element
fn split_nul(bytes: &[u8]) -> Vec<&[u8]> {
    if bytes.is_empty() {
        return vec![];
    }
    let mut parts: Vec<&[u8]> = bytes.split(|x| *x == 0).collect();
    if bytes.last() == Some(&0) {
        parts.pop();
    }
    parts
}

fn strip_nul(bytes: &[u8]) -> &[u8] {
    match bytes.last() {
        Some(0) => &bytes[..bytes.len() - 1],
        _ => bytes,
    }
}

/// Serialize the value into the byte array stored on the server
///
/// ### Arguments
/// * `layout` - catalog layout the value has to match
/// * `value` - value to serialize
/// * `order` - byte order of the connection
///
/// ### Examples
/// ```
/// use libxhint::prelude::*;
/// let names = Value::Texts(vec!["one".to_owned(), "two".to_owned()]);
/// let bytes = codec::encode(Layout::Utf8Strings, &names, ByteOrder::LittleEndian).unwrap();
/// assert_eq!(bytes, b"one\0two\0");
/// ```
pub fn encode(layout: Layout, value: &Value, order: ByteOrder) -> WindowManagerResult<Vec<u8>> {
    let mut buf = vec![];
    match (layout, value) {
        (Layout::Cardinal, Value::Cardinal(x)) | (Layout::Atom, Value::Atom(x)) | (Layout::Window, Value::Window(x)) => {
            put_words(&mut buf, &[*x], order)
        },
        (Layout::Cardinals, Value::Cardinals(x))
        | (Layout::Atoms, Value::Atoms(x))
        | (Layout::Windows, Value::Windows(x)) => put_words(&mut buf, x, order),
        (Layout::Utf8String, Value::Text(x)) => buf.extend_from_slice(without_nul(x)?.as_bytes()),
        (Layout::Utf8Strings, Value::Texts(x)) => {
            for text in x {
                buf.extend_from_slice(without_nul(text)?.as_bytes());
                buf.push(0);
            }
        },
        (Layout::Latin1String, Value::Text(x)) => encode_latin1(x, &mut buf)?,
        (Layout::Latin1Strings, Value::Texts(x)) => {
            for text in x {
                encode_latin1(text, &mut buf)?;
                buf.push(0);
            }
        },
        (Layout::Record(l), Value::Record(x)) if x.layout == l => put_words(&mut buf, &x.values, order),
        (Layout::Records(l), Value::Records(x)) => {
            for record in x {
                if record.layout != l {
                    return Err(mismatch(layout));
                }
                put_words(&mut buf, &record.values, order);
            }
        },
        (Layout::Icons, Value::Icons(x)) => {
            for icon in x {
                if icon.pixels.len() as u64 != icon.width as u64 * icon.height as u64 {
                    return Err(mismatch(layout));
                }
                put_words(&mut buf, &[icon.width, icon.height], order);
                put_words(&mut buf, &icon.pixels, order);
            }
        },
        _ => return Err(mismatch(layout)),
    }
    Ok(buf)
}

/// Deserialize a property byte array
///
/// An empty buffer decodes to the layout's empty value. A buffer that can't be split into whole
/// elements is reported as `MalformedProperty`.
pub fn decode(layout: Layout, bytes: &[u8], order: ByteOrder) -> WindowManagerResult<Value> {
    if bytes.is_empty() {
        return Ok(layout.empty());
    }
    if layout.format() == 32 && bytes.len() % 4 != 0 {
        return Err(malformed(layout, bytes.len(), "length is not a multiple of 4"));
    }
    let words = || bytes.chunks_exact(4).map(|x| order.read_u32(x)).collect::<Vec<_>>();

    Ok(match layout {
        Layout::Cardinal => Value::Cardinal(order.read_u32(bytes)),
        Layout::Atom => Value::Atom(order.read_u32(bytes)),
        Layout::Window => Value::Window(order.read_u32(bytes)),
        Layout::Cardinals => Value::Cardinals(words()),
        Layout::Atoms => Value::Atoms(words()),
        Layout::Windows => Value::Windows(words()),
        Layout::Utf8String => Value::Text(std::str::from_utf8(strip_nul(bytes))?.to_owned()),
        Layout::Utf8Strings => Value::Texts(
            split_nul(bytes)
                .into_iter()
                .map(|x| std::str::from_utf8(x).map(|x| x.to_owned()))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Layout::Latin1String => Value::Text(decode_latin1(strip_nul(bytes))),
        Layout::Latin1Strings => Value::Texts(split_nul(bytes).into_iter().map(decode_latin1).collect()),
        Layout::Record(l) => {
            let words = words();
            if words.len() < l.min_fields {
                return Err(malformed(layout, bytes.len(), &format!("expected at least {} fields", l.min_fields)));
            }
            Value::Record(Record::from_values(l, &words))
        },
        Layout::Records(l) => {
            let words = words();
            if words.len() % l.fields.len() != 0 {
                return Err(malformed(layout, bytes.len(), &format!("expected groups of {} fields", l.fields.len())));
            }
            Value::Records(words.chunks_exact(l.fields.len()).map(|x| Record::from_values(l, x)).collect())
        },
        Layout::Icons => {
            let words = words();
            let mut icons = vec![];
            let mut rest = &words[..];
            while !rest.is_empty() {
                if rest.len() < 2 {
                    return Err(malformed(layout, bytes.len(), "truncated icon header"));
                }
                let (width, height) = (rest[0], rest[1]);
                let size = width as usize * height as usize;
                if rest.len() - 2 < size {
                    return Err(malformed(layout, bytes.len(), "truncated icon pixels"));
                }
                icons.push(Icon {
                    width,
                    height,
                    pixels: rest[2..2 + size].to_vec(),
                });
                rest = &rest[2 + size..];
            }
            Value::Icons(icons)
        },
    })
}

/// PropertyDescriptor ties a property name to its type and layout
#[derive(Debug, Eq, PartialEq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub type_name: &'static str,
    pub layout: Layout,
}

impl PropertyDescriptor {
    /// Decode a GetProperty reply for this property
    ///
    /// A property that isn't set decodes to an empty list for list layouts and is reported as
    /// `PropertyNotFound` otherwise. The reply's format has to agree with the layout.
    pub fn decode_reply(&self, reply: &PropertyReply, order: ByteOrder) -> WindowManagerResult<Value> {
        if reply.type_ == NONE && reply.format == 0 {
            if self.layout.is_list() {
                return Ok(self.layout.empty());
            }
            return Err(WindowManagerError::PropertyNotFound(self.name.to_owned()).into());
        }
        if reply.format != self.layout.format() {
            return Err(malformed(
                self.layout,
                reply.value.len(),
                &format!("format {} where {} was expected", reply.format, self.layout.format()),
            ));
        }
        decode(self.layout, &reply.value, order)
    }
}

macro_rules! descriptors {
    ($($name:expr => $type_name:expr, $layout:expr;)*) => {
        static DESCRIPTORS: &[PropertyDescriptor] = &[
            $(PropertyDescriptor { name: $name, type_name: $type_name, layout: $layout },)*
        ];
    };
}

descriptors! {
    // EWMH root window properties
    "_NET_SUPPORTED" => "ATOM", Layout::Atoms;
    "_NET_CLIENT_LIST" => "WINDOW", Layout::Windows;
    "_NET_CLIENT_LIST_STACKING" => "WINDOW", Layout::Windows;
    "_NET_NUMBER_OF_DESKTOPS" => "CARDINAL", Layout::Cardinal;
    "_NET_DESKTOP_GEOMETRY" => "CARDINAL", Layout::Record(&DESKTOP_GEOMETRY);
    "_NET_DESKTOP_VIEWPORT" => "CARDINAL", Layout::Records(&VIEWPORT);
    "_NET_CURRENT_DESKTOP" => "CARDINAL", Layout::Cardinal;
    "_NET_DESKTOP_NAMES" => "UTF8_STRING", Layout::Utf8Strings;
    "_NET_ACTIVE_WINDOW" => "WINDOW", Layout::Window;
    "_NET_WORKAREA" => "CARDINAL", Layout::Records(&WORKAREA);
    "_NET_SUPPORTING_WM_CHECK" => "WINDOW", Layout::Window;
    "_NET_VIRTUAL_ROOTS" => "WINDOW", Layout::Windows;
    "_NET_DESKTOP_LAYOUT" => "CARDINAL", Layout::Record(&DESKTOP_LAYOUT);
    "_NET_SHOWING_DESKTOP" => "CARDINAL", Layout::Cardinal;

    // EWMH application window properties
    "_NET_WM_NAME" => "UTF8_STRING", Layout::Utf8String;
    "_NET_WM_VISIBLE_NAME" => "UTF8_STRING", Layout::Utf8String;
    "_NET_WM_ICON_NAME" => "UTF8_STRING", Layout::Utf8String;
    "_NET_WM_VISIBLE_ICON_NAME" => "UTF8_STRING", Layout::Utf8String;
    "_NET_WM_DESKTOP" => "CARDINAL", Layout::Cardinal;
    "_NET_WM_WINDOW_TYPE" => "ATOM", Layout::Atoms;
    "_NET_WM_STATE" => "ATOM", Layout::Atoms;
    "_NET_WM_ALLOWED_ACTIONS" => "ATOM", Layout::Atoms;
    "_NET_WM_STRUT" => "CARDINAL", Layout::Record(&STRUT);
    "_NET_WM_STRUT_PARTIAL" => "CARDINAL", Layout::Record(&STRUT_PARTIAL);
    "_NET_WM_ICON_GEOMETRY" => "CARDINAL", Layout::Record(&ICON_GEOMETRY);
    "_NET_WM_ICON" => "CARDINAL", Layout::Icons;
    "_NET_WM_PID" => "CARDINAL", Layout::Cardinal;
    "_NET_WM_USER_TIME" => "CARDINAL", Layout::Cardinal;
    "_NET_WM_USER_TIME_WINDOW" => "WINDOW", Layout::Window;
    "_NET_FRAME_EXTENTS" => "CARDINAL", Layout::Record(&FRAME_EXTENTS);
    "_NET_WM_WINDOW_OPACITY" => "CARDINAL", Layout::Cardinal;

    // ICCCM
    "WM_NAME" => "STRING", Layout::Latin1String;
    "WM_ICON_NAME" => "STRING", Layout::Latin1String;
    "WM_CLIENT_MACHINE" => "STRING", Layout::Latin1String;
    "WM_CLASS" => "STRING", Layout::Latin1Strings;
    "WM_NORMAL_HINTS" => "WM_SIZE_HINTS", Layout::Record(&WM_SIZE_HINTS);
    "WM_HINTS" => "WM_HINTS", Layout::Record(&WM_HINTS);
    "WM_TRANSIENT_FOR" => "WINDOW", Layout::Window;
    "WM_PROTOCOLS" => "ATOM", Layout::Atoms;
    "WM_COLORMAP_WINDOWS" => "WINDOW", Layout::Windows;
    "WM_STATE" => "WM_STATE", Layout::Record(&WM_STATE);

    // Motif
    "_MOTIF_WM_HINTS" => "_MOTIF_WM_HINTS", Layout::Record(&MOTIF_HINTS);
}

/// Look up the descriptor registered for the given property name
pub fn descriptor(name: &str) -> WindowManagerResult<&'static PropertyDescriptor> {
    DESCRIPTORS
        .iter()
        .find(|x| x.name == name)
        .ok_or_else(|| WindowManagerError::UnknownProperty(name.to_owned()).into())
}

/// All registered descriptors
pub fn descriptors() -> &'static [PropertyDescriptor] {
    DESCRIPTORS
}

// Conversions from decoded values into plain Rust types
//--------------------------------------------------------------------------------------------------
impl TryFrom<Value> for u32 {
    type Error = ErrorWrapper;
    fn try_from(val: Value) -> WindowManagerResult<u32> {
        match val {
            Value::Cardinal(x) | Value::Atom(x) | Value::Window(x) => Ok(x),
            _ => Err(WindowManagerError::LayoutMismatch("cardinal").into()),
        }
    }
}

impl TryFrom<Value> for Vec<u32> {
    type Error = ErrorWrapper;
    fn try_from(val: Value) -> WindowManagerResult<Vec<u32>> {
        match val {
            Value::Cardinals(x) | Value::Atoms(x) | Value::Windows(x) => Ok(x),
            _ => Err(WindowManagerError::LayoutMismatch("cardinal list").into()),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = ErrorWrapper;
    fn try_from(val: Value) -> WindowManagerResult<String> {
        match val {
            Value::Text(x) => Ok(x),
            _ => Err(WindowManagerError::LayoutMismatch("string").into()),
        }
    }
}

impl TryFrom<Value> for Vec<String> {
    type Error = ErrorWrapper;
    fn try_from(val: Value) -> WindowManagerResult<Vec<String>> {
        match val {
            Value::Texts(x) => Ok(x),
            _ => Err(WindowManagerError::LayoutMismatch("string list").into()),
        }
    }
}

impl TryFrom<Value> for Record {
    type Error = ErrorWrapper;
    fn try_from(val: Value) -> WindowManagerResult<Record> {
        match val {
            Value::Record(x) => Ok(x),
            _ => Err(WindowManagerError::LayoutMismatch("record").into()),
        }
    }
}

impl TryFrom<Value> for Vec<Record> {
    type Error = ErrorWrapper;
    fn try_from(val: Value) -> WindowManagerResult<Vec<Record>> {
        match val {
            Value::Records(x) => Ok(x),
            _ => Err(WindowManagerError::LayoutMismatch("record list").into()),
        }
    }
}

impl TryFrom<Value> for Vec<Icon> {
    type Error = ErrorWrapper;
    fn try_from(val: Value) -> WindowManagerResult<Vec<Icon>> {
        match val {
            Value::Icons(x) => Ok(x),
            _ => Err(WindowManagerError::LayoutMismatch("icon list").into()),
        }
    }
}
