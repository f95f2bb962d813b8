use std::error::Error as StdError;
use std::fmt;

use crate::transport::{Atom, SequenceNumber};

/// `WindowManagerResult<T>` provides a simplified result type with a common error type
pub type WindowManagerResult<T> = std::result::Result<T, ErrorWrapper>;

/// Error code the server uses when a grab or another exclusive resource is already taken
pub const BAD_ACCESS: u8 = 10;

/// Error code the server uses for an atom it does not know
pub const BAD_ATOM: u8 = 5;

/// WindowManagerError defines all the internal errors that `libxhint` might return
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum WindowManagerError {
    ConnectionClosed,
    EmbeddedNul(String),
    InvalidButtonString(String),
    InvalidFrameStyle(String),
    InvalidKeyString(String),
    InvalidLatin1(String),
    InvalidWinGravity(u32),
    InvalidWinClass(u32),
    InvalidWinMap(u32),
    LayoutMismatch(&'static str),
    MalformedEvent(usize),
    MalformedProperty(MalformedProperty),
    PropertyNotFound(String),
    ReplyUnavailable(SequenceNumber),
    UnexpectedReply(&'static str),
    UnknownAtom(UnknownAtom),
    UnknownProperty(String),
}
impl std::error::Error for WindowManagerError {}
impl fmt::Display for WindowManagerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            WindowManagerError::ConnectionClosed => write!(f, "connection to the display server was closed"),
            WindowManagerError::EmbeddedNul(ref err) => write!(f, "string contains a NUL: {:?}", err),
            WindowManagerError::InvalidButtonString(ref err) => write!(f, "invalid button string was given: {}", err),
            WindowManagerError::InvalidFrameStyle(ref err) => write!(f, "invalid frame style was given: {}", err),
            WindowManagerError::InvalidKeyString(ref err) => write!(f, "invalid key string was given: {}", err),
            WindowManagerError::InvalidLatin1(ref err) => write!(f, "string is not latin-1 encodable: {}", err),
            WindowManagerError::InvalidWinGravity(ref err) => write!(f, "invalid gravity was given: {}", err),
            WindowManagerError::InvalidWinClass(ref err) => write!(f, "invalid class was given: {}", err),
            WindowManagerError::InvalidWinMap(ref err) => write!(f, "invalid map was given: {}", err),
            WindowManagerError::LayoutMismatch(ref err) => write!(f, "value does not fit the {} layout", err),
            WindowManagerError::MalformedEvent(ref err) => write!(f, "event frame of {} bytes is too short", err),
            WindowManagerError::MalformedProperty(ref err) => write!(f, "{}", err),
            WindowManagerError::PropertyNotFound(ref err) => write!(f, "property {} was not found", err),
            WindowManagerError::ReplyUnavailable(ref err) => {
                write!(f, "unchecked request {} failed, the error was delivered as an event", err)
            },
            WindowManagerError::UnexpectedReply(ref err) => write!(f, "unexpected reply kind for {}", err),
            WindowManagerError::UnknownAtom(ref err) => write!(f, "{}", err),
            WindowManagerError::UnknownProperty(ref err) => write!(f, "no layout is registered for {}", err),
        }
    }
}

/// MalformedProperty reports a property buffer that doesn't fit its layout
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MalformedProperty {
    pub layout: &'static str,
    pub len: usize,
    pub reason: String,
}

impl fmt::Display for MalformedProperty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed {} property of {} bytes: {}", self.layout, self.len, self.reason)
    }
}

/// UnknownAtom reports a name or atom the server can't resolve
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum UnknownAtom {
    Name(String),
    Atom(Atom),
}

impl fmt::Display for UnknownAtom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnknownAtom::Name(name) => write!(f, "atom {} does not exist", name),
            UnknownAtom::Atom(atom) => write!(f, "atom {} does not exist", atom),
        }
    }
}

/// ProtocolError is an error the server raised for one specific request
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ProtocolError {
    pub sequence: SequenceNumber,
    pub code: u8,
    pub bad_value: u32,
    pub major_opcode: u8,
    pub minor_opcode: u16,
    pub request: Option<&'static str>,
}

impl ProtocolError {
    /// Create an error with the given code and no further details
    pub fn new(sequence: SequenceNumber, code: u8) -> Self {
        Self {
            sequence,
            code,
            bad_value: 0,
            major_opcode: 0,
            minor_opcode: 0,
            request: None,
        }
    }

    /// True when the server refused access, e.g. a grab that is already held
    pub fn is_access(&self) -> bool {
        self.code == BAD_ACCESS
    }
}

impl std::error::Error for ProtocolError {}
impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "protocol error {} for request {} (opcode {}.{}, value {})",
            self.code,
            self.request.unwrap_or("unknown"),
            self.major_opcode,
            self.minor_opcode,
            self.bad_value
        )?;
        write!(f, " at sequence {}", self.sequence)
    }
}

/// ErrorWrapper provides wrapper around all the underlying library dependencys that `libxhint` uses
/// such that we can easily surface all errors from `libxhint` in a single easy way.
#[derive(Debug)]
pub enum ErrorWrapper {
    WindowManager(WindowManagerError),
    Protocol(ProtocolError),

    // std::str::Utf8Error
    Utf8(std::str::Utf8Error),

    // x11rb errors
    Connect(x11rb::errors::ConnectError),
    Connection(x11rb::errors::ConnectionError),
    Reply(x11rb::errors::ReplyError),
    Parse(x11rb::errors::ParseError),
}
impl ErrorWrapper {
    /// Implemented directly on the `Error` type to reduce casting required
    pub fn is<T: StdError + 'static>(&self) -> bool {
        self.as_ref().is::<T>()
    }

    /// Implemented directly on the `Error` type to reduce casting required
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.as_ref().downcast_ref::<T>()
    }

    /// Implemented directly on the `Error` type to reduce casting required
    pub fn downcast_mut<T: StdError + 'static>(&mut self) -> Option<&mut T> {
        self.as_mut().downcast_mut::<T>()
    }

    /// Implemented directly on the `Error` type to reduce casting required
    /// which allows for using as_ref to get the correct pass through.
    pub fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.as_ref().source()
    }

    /// The connection is gone and nothing more can be read from or sent to it
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorWrapper::Connect(_)
                | ErrorWrapper::Connection(_)
                | ErrorWrapper::Reply(x11rb::errors::ReplyError::ConnectionError(_))
                | ErrorWrapper::WindowManager(WindowManagerError::ConnectionClosed)
        )
    }

    /// The server rejected the request
    pub fn protocol(&self) -> Option<&ProtocolError> {
        match self {
            ErrorWrapper::Protocol(err) => Some(err),
            _ => None,
        }
    }

    /// A property buffer didn't match its layout
    pub fn is_malformed(&self) -> bool {
        matches!(self, ErrorWrapper::WindowManager(WindowManagerError::MalformedProperty(_)))
    }

    /// The property isn't set on the window
    pub fn is_not_found(&self) -> bool {
        matches!(self, ErrorWrapper::WindowManager(WindowManagerError::PropertyNotFound(_)))
    }

    /// An atom or atom name could not be resolved
    pub fn is_unknown_atom(&self) -> bool {
        matches!(self, ErrorWrapper::WindowManager(WindowManagerError::UnknownAtom(_)))
    }
}
impl StdError for ErrorWrapper {}

impl fmt::Display for ErrorWrapper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorWrapper::WindowManager(ref err) => write!(f, "{}", err),
            ErrorWrapper::Protocol(ref err) => write!(f, "{}", err),
            ErrorWrapper::Utf8(ref err) => write!(f, "{}", err),
            ErrorWrapper::Connect(ref err) => write!(f, "{}", err),
            ErrorWrapper::Connection(ref err) => write!(f, "{}", err),
            ErrorWrapper::Reply(ref err) => write!(f, "{}", err),
            ErrorWrapper::Parse(ref err) => write!(f, "{}", err),
        }
    }
}

impl AsRef<dyn StdError> for ErrorWrapper {
    fn as_ref(&self) -> &(dyn StdError + 'static) {
        match *self {
            ErrorWrapper::WindowManager(ref err) => err,
            ErrorWrapper::Protocol(ref err) => err,
            ErrorWrapper::Utf8(ref err) => err,
            ErrorWrapper::Connect(ref err) => err,
            ErrorWrapper::Connection(ref err) => err,
            ErrorWrapper::Reply(ref err) => err,
            ErrorWrapper::Parse(ref err) => err,
        }
    }
}

impl AsMut<dyn StdError> for ErrorWrapper {
    fn as_mut(&mut self) -> &mut (dyn StdError + 'static) {
        match *self {
            ErrorWrapper::WindowManager(ref mut err) => err,
            ErrorWrapper::Protocol(ref mut err) => err,
            ErrorWrapper::Utf8(ref mut err) => err,
            ErrorWrapper::Connect(ref mut err) => err,
            ErrorWrapper::Connection(ref mut err) => err,
            ErrorWrapper::Reply(ref mut err) => err,
            ErrorWrapper::Parse(ref mut err) => err,
        }
    }
}

impl From<WindowManagerError> for ErrorWrapper {
    fn from(err: WindowManagerError) -> ErrorWrapper {
        ErrorWrapper::WindowManager(err)
    }
}

impl From<MalformedProperty> for ErrorWrapper {
    fn from(err: MalformedProperty) -> ErrorWrapper {
        ErrorWrapper::WindowManager(WindowManagerError::MalformedProperty(err))
    }
}

impl From<UnknownAtom> for ErrorWrapper {
    fn from(err: UnknownAtom) -> ErrorWrapper {
        ErrorWrapper::WindowManager(WindowManagerError::UnknownAtom(err))
    }
}

impl From<ProtocolError> for ErrorWrapper {
    fn from(err: ProtocolError) -> ErrorWrapper {
        ErrorWrapper::Protocol(err)
    }
}

impl From<std::str::Utf8Error> for ErrorWrapper {
    fn from(err: std::str::Utf8Error) -> ErrorWrapper {
        ErrorWrapper::Utf8(err)
    }
}

// x11rb errors
//--------------------------------------------------------------------------------------------------
impl From<x11rb::errors::ConnectError> for ErrorWrapper {
    fn from(err: x11rb::errors::ConnectError) -> ErrorWrapper {
        ErrorWrapper::Connect(err)
    }
}

impl From<x11rb::errors::ConnectionError> for ErrorWrapper {
    fn from(err: x11rb::errors::ConnectionError) -> ErrorWrapper {
        ErrorWrapper::Connection(err)
    }
}

impl From<x11rb::errors::ReplyError> for ErrorWrapper {
    fn from(err: x11rb::errors::ReplyError) -> ErrorWrapper {
        ErrorWrapper::Reply(err)
    }
}

impl From<x11rb::errors::ParseError> for ErrorWrapper {
    fn from(err: x11rb::errors::ParseError) -> ErrorWrapper {
        ErrorWrapper::Parse(err)
    }
}
