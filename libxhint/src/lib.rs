//! `libxhint` is an ergonomic layer over an X11 client connection for tools that talk to
//! [EWMH](https://specifications.freedesktop.org/wm-spec/latest/) and ICCCM compliant window
//! managers: pagers, panels, window switchers and window managers themselves.
//!
//! [Cookies](cookie::Cookie)
//! Every request returns a cookie right away so many requests can be in flight before the first
//! reply is claimed. Checked cookies surface protocol errors from `reply`/`check`, unchecked ones
//! hand them to the event loop instead.
//!
//! [Properties](codec)
//! Property names map to a registered layout which is how `get_property` decodes raw buffers into
//! typed values and how the setters refuse values that don't fit.
//!
//! [Events](event)
//! Callbacks are registered per event kind and window and driven by `main_loop`. Key and button
//! [bindings](bind) sit on top of the dispatcher and follow keyboard remapping on their own.
//!
//! `xhint` uses `libxhint` to inspect and drive the window manager from the command line; however
//! `libxhint` could be used for a variety of reasons.
#[macro_use]
mod macros;

pub mod atoms;
pub mod bind;
pub mod codec;
mod cookie;
mod error;
mod event;
mod ewmh;
mod icccm;
mod model;
mod mwm;
mod transport;
mod window;
mod wm;
mod x11;
pub use bind::Keymap;
pub use codec::{Icon, Layout, Record, Value};
pub use cookie::{Cookie, Engine, Incoming, Mode, VoidCookie};
pub use error::*;
pub use event::*;
pub use model::*;
pub use transport::{
    AllowMode, Atom, ByteOrder, Frame, GeometryReply, Keycode, Keysym, PropMode, PropertyReply, Reply, Request,
    RevertTo, SequenceNumber, SetupInfo, StackMode, Timestamp, Transport, Window, WindowAttributes, CURRENT_TIME,
    NONE,
};
pub use window::{FrameStyle, WindowChanges};
pub use wm::{ConnectOptions, WindowManager};
pub use x11::X11Transport;
pub use x11rb::protocol::xproto::{EventMask, ModMask};

/// All essential symbols in a simple consumable form
///
/// ### Examples
/// ```
/// use libxhint::prelude::*;
/// assert_eq!(bind::parse_buttonstring("Mod1-3").unwrap(), (u16::from(ModMask::M1), 3));
/// ```
pub mod prelude {
    pub use crate::*;
}
