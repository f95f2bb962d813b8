//! `X11Transport` drives a real display connection through x11rb.
//!
//! x11rb hands out typed cookies; here they are reduced to bare sequence numbers so the engine
//! decides when to wait. Replies are resolved in the order the requests were sent which is also
//! the order the server answers them.
use std::{cell::RefCell, collections::VecDeque};
use tracing::{debug, trace};
use x11rb::{
    connection::{Connection, ReplyOrError, RequestConnection},
    cookie::{Cookie, VoidCookie},
    errors::{ConnectError, ParseError},
    protocol::xproto::{self, ConnectionExt as _},
    rust_connection::RustConnection,
    x11_utils::TryParse,
};

use crate::{
    cookie::Mode,
    transport::{
        AllowMode, ByteOrder, Frame, GeometryReply, PropMode, PropertyReply, Reply, Request, RevertTo,
        SequenceNumber, SetupInfo, StackMode, Transport, WindowAttributes,
    },
    ProtocolError, WindowManagerResult,
};

type Parser = fn(&[u8]) -> Result<Reply, ParseError>;

// Requests still owed an answer, oldest first
enum Pending {
    Reply(SequenceNumber, Parser),
    Check(SequenceNumber),
}

/// X11Transport implements `Transport` over an x11rb `RustConnection`
pub struct X11Transport {
    conn: RustConnection,
    setup: SetupInfo,
    pending: RefCell<VecDeque<Pending>>,
}

impl X11Transport {
    /// Connect to the given display or `$DISPLAY` when none is given
    pub fn connect(name: Option<&str>) -> WindowManagerResult<Self> {
        let (conn, screen) = x11rb::connect(name)?;
        let setup = {
            let info = conn.setup();
            let root = info.roots.get(screen).ok_or(ConnectError::InvalidScreen)?;
            SetupInfo {
                screen,
                root: root.root,
                width: root.width_in_pixels,
                height: root.height_in_pixels,
                min_keycode: info.min_keycode,
                max_keycode: info.max_keycode,
            }
        };
        debug!("connect: display: {:?}, screen: {}, root: {}", name, screen, setup.root);
        Ok(Self {
            conn,
            setup,
            pending: RefCell::new(VecDeque::new()),
        })
    }

    /// Underlying x11rb connection
    pub fn connection(&self) -> &RustConnection {
        &self.conn
    }

    fn expect_reply<R: TryParse>(&self, cookie: Cookie<'_, RustConnection, R>, parser: Parser) -> SequenceNumber {
        // The engine owns the request from here on, x11rb must not discard the reply
        let sequence = cookie.sequence_number();
        std::mem::forget(cookie);
        self.pending.borrow_mut().push_back(Pending::Reply(sequence, parser));
        sequence
    }

    fn expect_void(&self, cookie: VoidCookie<'_, RustConnection>, mode: Mode) -> SequenceNumber {
        match mode {
            Mode::Checked => {
                let sequence = cookie.sequence_number();
                std::mem::forget(cookie);
                self.pending.borrow_mut().push_back(Pending::Check(sequence));
                sequence
            },

            // Dropping the cookie routes a failure into the event queue
            Mode::Unchecked => {
                let sequence = cookie.sequence_number();
                drop(cookie);
                sequence
            },
        }
    }

    fn protocol_error(&self, buf: &[u8], sequence: SequenceNumber) -> WindowManagerResult<ProtocolError> {
        let err = self.conn.parse_error(buf)?;
        Ok(ProtocolError {
            sequence,
            code: err.error_code,
            bad_value: err.bad_value,
            major_opcode: err.major_opcode,
            minor_opcode: err.minor_opcode,
            request: err.request_name,
        })
    }

    // Events and asynchronous errors share the event queue, errors start with a zero byte
    fn event_frame(&self, buf: Vec<u8>, sequence: SequenceNumber) -> WindowManagerResult<Frame> {
        if buf.first() == Some(&0) {
            return Ok(Frame::Error(self.protocol_error(&buf, sequence)?));
        }
        Ok(Frame::Event { sequence, bytes: buf })
    }

    fn resolve(&self, pending: Pending) -> WindowManagerResult<Frame> {
        match pending {
            Pending::Reply(sequence, parser) => match self.conn.wait_for_reply_or_raw_error(sequence)? {
                ReplyOrError::Reply(buf) => Ok(Frame::Reply {
                    sequence,
                    reply: parser(&buf)?,
                }),
                ReplyOrError::Error(buf) => Ok(Frame::Error(self.protocol_error(&buf, sequence)?)),
            },
            Pending::Check(sequence) => match self.conn.check_for_raw_error(sequence)? {
                Some(buf) => Ok(Frame::Error(self.protocol_error(&buf, sequence)?)),
                None => Ok(Frame::Ack { sequence }),
            },
        }
    }
}

impl Transport for X11Transport {
    fn send(&self, request: Request, mode: Mode) -> WindowManagerResult<SequenceNumber> {
        let conn = &self.conn;
        let sequence = match request {
            Request::InternAtom { only_if_exists, name } => {
                self.expect_reply(conn.intern_atom(only_if_exists, name.as_bytes())?, parse_atom)
            },
            Request::GetAtomName { atom } => self.expect_reply(conn.get_atom_name(atom)?, parse_atom_name),
            Request::GetProperty { window, property, type_ } => {
                self.expect_reply(conn.get_property(false, window, property, type_, 0, u32::MAX)?, parse_property)
            },
            Request::ChangeProperty { mode: prop_mode, window, property, type_, format, data } => {
                let len = data.len() as u32 / (u32::from(format) / 8).max(1);
                let prop_mode = match prop_mode {
                    PropMode::Replace => xproto::PropMode::REPLACE,
                    PropMode::Prepend => xproto::PropMode::PREPEND,
                    PropMode::Append => xproto::PropMode::APPEND,
                };
                self.expect_void(conn.change_property(prop_mode, window, property, type_, format, len, &data)?, mode)
            },
            Request::DeleteProperty { window, property } => {
                self.expect_void(conn.delete_property(window, property)?, mode)
            },
            Request::SendEvent { propagate, destination, event_mask, event } => self.expect_void(
                conn.send_event(propagate, destination, xproto::EventMask::from(event_mask), event)?,
                mode,
            ),
            Request::ChangeWindowAttributes { window, event_mask } => {
                let aux = xproto::ChangeWindowAttributesAux::new().event_mask(xproto::EventMask::from(event_mask));
                self.expect_void(conn.change_window_attributes(window, &aux)?, mode)
            },
            Request::GetWindowAttributes { window } => {
                self.expect_reply(conn.get_window_attributes(window)?, parse_attributes)
            },
            Request::GetGeometry { window } => self.expect_reply(conn.get_geometry(window)?, parse_geometry),
            Request::QueryTree { window } => self.expect_reply(conn.query_tree(window)?, parse_tree),
            Request::TranslateCoordinates { src, dst, x, y } => {
                self.expect_reply(conn.translate_coordinates(src, dst, x, y)?, parse_coordinates)
            },
            Request::ConfigureWindow { window, x, y, width, height, border_width, sibling, stack_mode } => {
                let aux = xproto::ConfigureWindowAux::new()
                    .x(x)
                    .y(y)
                    .width(width)
                    .height(height)
                    .border_width(border_width)
                    .sibling(sibling)
                    .stack_mode(stack_mode.map(|x| match x {
                        StackMode::Above => xproto::StackMode::ABOVE,
                        StackMode::Below => xproto::StackMode::BELOW,
                        StackMode::TopIf => xproto::StackMode::TOP_IF,
                        StackMode::BottomIf => xproto::StackMode::BOTTOM_IF,
                        StackMode::Opposite => xproto::StackMode::OPPOSITE,
                    }));
                self.expect_void(conn.configure_window(window, &aux)?, mode)
            },
            Request::GetInputFocus => self.expect_reply(conn.get_input_focus()?, parse_focus),
            Request::SetInputFocus { focus, revert_to, time } => {
                let revert_to = match revert_to {
                    RevertTo::None => xproto::InputFocus::NONE,
                    RevertTo::PointerRoot => xproto::InputFocus::POINTER_ROOT,
                    RevertTo::Parent => xproto::InputFocus::PARENT,
                };
                self.expect_void(conn.set_input_focus(revert_to, focus, time)?, mode)
            },
            Request::GetSelectionOwner { selection } => {
                self.expect_reply(conn.get_selection_owner(selection)?, parse_owner)
            },
            Request::GrabKey { window, modifiers, key } => {
                let (mods, async_) = (xproto::ModMask::from(modifiers), xproto::GrabMode::ASYNC);
                self.expect_void(conn.grab_key(true, window, mods, key, async_, async_)?, mode)
            },
            Request::UngrabKey { window, modifiers, key } => {
                self.expect_void(conn.ungrab_key(key, window, xproto::ModMask::from(modifiers))?, mode)
            },
            Request::GrabButton { window, event_mask, modifiers, button, sync_pointer } => {
                let pointer_mode = if sync_pointer { xproto::GrabMode::SYNC } else { xproto::GrabMode::ASYNC };
                let cookie = conn.grab_button(
                    true,
                    window,
                    xproto::EventMask::from(event_mask),
                    pointer_mode,
                    xproto::GrabMode::ASYNC,
                    x11rb::NONE,
                    x11rb::NONE,
                    xproto::ButtonIndex::from(button),
                    xproto::ModMask::from(modifiers),
                )?;
                self.expect_void(cookie, mode)
            },
            Request::UngrabButton { window, modifiers, button } => self.expect_void(
                conn.ungrab_button(xproto::ButtonIndex::from(button), window, xproto::ModMask::from(modifiers))?,
                mode,
            ),
            Request::AllowEvents { mode: allow, time } => {
                let allow = match allow {
                    AllowMode::AsyncPointer => xproto::Allow::ASYNC_POINTER,
                    AllowMode::SyncPointer => xproto::Allow::SYNC_POINTER,
                    AllowMode::ReplayPointer => xproto::Allow::REPLAY_POINTER,
                };
                self.expect_void(conn.allow_events(allow, time)?, mode)
            },
            Request::GetKeyboardMapping { first_keycode, count } => {
                self.expect_reply(conn.get_keyboard_mapping(first_keycode, count)?, parse_keyboard)
            },
            Request::GetModifierMapping => self.expect_reply(conn.get_modifier_mapping()?, parse_modifiers),
        };
        trace!("send: seq: {}, pending: {}", sequence, self.pending.borrow().len());
        Ok(sequence)
    }

    fn flush(&self) -> WindowManagerResult<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn recv_next(&self) -> WindowManagerResult<Frame> {
        if let Some((buf, sequence)) = self.conn.poll_for_raw_event_with_sequence()? {
            return self.event_frame(buf, sequence);
        }
        let next = self.pending.borrow_mut().pop_front();
        if let Some(pending) = next {
            return self.resolve(pending);
        }
        let (buf, sequence) = self.conn.wait_for_raw_event_with_sequence()?;
        self.event_frame(buf, sequence)
    }

    fn poll_next(&self) -> WindowManagerResult<Option<Frame>> {
        match self.conn.poll_for_raw_event_with_sequence()? {
            Some((buf, sequence)) => Ok(Some(self.event_frame(buf, sequence)?)),
            None => Ok(None),
        }
    }

    fn byte_order(&self) -> ByteOrder {
        ByteOrder::native()
    }

    fn setup(&self) -> &SetupInfo {
        &self.setup
    }
}

// Reply parsers
//--------------------------------------------------------------------------------------------------
fn parse_atom(buf: &[u8]) -> Result<Reply, ParseError> {
    Ok(Reply::Atom(xproto::InternAtomReply::try_parse(buf)?.0.atom))
}

fn parse_atom_name(buf: &[u8]) -> Result<Reply, ParseError> {
    let reply = xproto::GetAtomNameReply::try_parse(buf)?.0;
    Ok(Reply::AtomName(String::from_utf8_lossy(&reply.name).into_owned()))
}

fn parse_property(buf: &[u8]) -> Result<Reply, ParseError> {
    let reply = xproto::GetPropertyReply::try_parse(buf)?.0;
    Ok(Reply::Property(PropertyReply {
        type_: reply.type_,
        format: reply.format,
        value: reply.value,
    }))
}

fn parse_attributes(buf: &[u8]) -> Result<Reply, ParseError> {
    let reply = xproto::GetWindowAttributesReply::try_parse(buf)?.0;
    Ok(Reply::WindowAttributes(WindowAttributes {
        class: u32::from(reply.class),
        map_state: u32::from(reply.map_state),
        override_redirect: reply.override_redirect,
        all_event_masks: u32::from(reply.all_event_masks),
        your_event_mask: u32::from(reply.your_event_mask),
    }))
}

fn parse_geometry(buf: &[u8]) -> Result<Reply, ParseError> {
    let reply = xproto::GetGeometryReply::try_parse(buf)?.0;
    Ok(Reply::Geometry(GeometryReply {
        root: reply.root,
        depth: reply.depth,
        x: reply.x,
        y: reply.y,
        width: reply.width,
        height: reply.height,
        border_width: reply.border_width,
    }))
}

fn parse_tree(buf: &[u8]) -> Result<Reply, ParseError> {
    let reply = xproto::QueryTreeReply::try_parse(buf)?.0;
    Ok(Reply::Tree {
        root: reply.root,
        parent: reply.parent,
        children: reply.children,
    })
}

fn parse_coordinates(buf: &[u8]) -> Result<Reply, ParseError> {
    let reply = xproto::TranslateCoordinatesReply::try_parse(buf)?.0;
    Ok(Reply::Coordinates {
        child: reply.child,
        x: reply.dst_x,
        y: reply.dst_y,
    })
}

fn parse_focus(buf: &[u8]) -> Result<Reply, ParseError> {
    let reply = xproto::GetInputFocusReply::try_parse(buf)?.0;
    Ok(Reply::InputFocus {
        focus: reply.focus,
        revert_to: RevertTo::from(u8::from(reply.revert_to)),
    })
}

fn parse_owner(buf: &[u8]) -> Result<Reply, ParseError> {
    Ok(Reply::SelectionOwner(xproto::GetSelectionOwnerReply::try_parse(buf)?.0.owner))
}

fn parse_keyboard(buf: &[u8]) -> Result<Reply, ParseError> {
    let reply = xproto::GetKeyboardMappingReply::try_parse(buf)?.0;
    Ok(Reply::KeyboardMapping {
        keysyms_per_keycode: reply.keysyms_per_keycode,
        keysyms: reply.keysyms,
    })
}

fn parse_modifiers(buf: &[u8]) -> Result<Reply, ParseError> {
    let reply = xproto::GetModifierMappingReply::try_parse(buf)?.0;
    Ok(Reply::ModifierMapping {
        keycodes_per_modifier: reply.keycodes_per_modifier(),
        keycodes: reply.keycodes,
    })
}
