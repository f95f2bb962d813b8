//! Cookie based request/reply engine.
//!
//! Every request is sent through one path, [`Engine::send`], tagged with a [`Mode`]. The returned
//! [`Cookie`] or [`VoidCookie`] is the only thing that knows which request it resolves. Resolving
//! takes the cookie by value so a reply can only ever be claimed once; dropping a cookie without
//! resolving it tells the engine to throw the reply away when it shows up.
//!
//! Frames read from the transport are filed into an inbox in the order the server produced them:
//! replies and acknowledgements by sequence, events and asynchronous errors into the event queue
//! that the dispatcher drains. The inbox lives behind `RefCell`s so the engine can't be shared
//! across threads and only its owner ever reads from the connection.
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet, VecDeque},
    fmt,
};
use tracing::{debug, trace, warn};

use crate::{
    transport::{Frame, Reply, Request, SequenceNumber, Transport},
    ProtocolError, WindowManagerError, WindowManagerResult,
};

/// Mode decides where a server error for a request ends up
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Errors are returned from the cookie's `reply` or `check`
    Checked,

    /// Errors are delivered to the event stream and reported by the dispatcher
    Unchecked,
}

// Implement format! support
impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

/// Incoming is anything the dispatcher should see
#[derive(Clone, Debug, PartialEq)]
pub enum Incoming {
    Event { sequence: SequenceNumber, bytes: Vec<u8> },
    Error(ProtocolError),
}

#[derive(Default)]
struct Inbox {
    replies: HashMap<SequenceNumber, Reply>,
    errors: HashMap<SequenceNumber, ProtocolError>,
    acks: HashSet<SequenceNumber>,
    failed: HashSet<SequenceNumber>,            // unchecked replies whose error went to the event queue
    outstanding: HashMap<SequenceNumber, Mode>, // requests still waiting on a reply, ack or error
    discarded: HashSet<SequenceNumber>,         // cookies dropped before their answer arrived
    events: VecDeque<Incoming>,
}

type Decoder<'a, R> = Box<dyn FnOnce(Reply) -> WindowManagerResult<R> + 'a>;

/// Engine issues requests over a transport and resolves cookies on demand
pub struct Engine<T: Transport> {
    transport: T,
    inbox: RefCell<Inbox>,
}

impl<T: Transport> Engine<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            inbox: RefCell::new(Inbox::default()),
        }
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Queue a request with the given mode and return its sequence number
    pub fn send(&self, request: Request, mode: Mode) -> WindowManagerResult<SequenceNumber> {
        let name = request.name();
        let has_reply = request.has_reply();
        let sequence = self.transport.send(request, mode)?;
        if has_reply || mode == Mode::Checked {
            self.inbox.borrow_mut().outstanding.insert(sequence, mode);
        }
        debug!("send: seq: {}, request: {}, mode: {}", sequence, name, mode);
        Ok(sequence)
    }

    /// Issue a request that has a reply, `decode` turns the reply into the cookie's value
    ///
    /// ### Arguments
    /// * `request` - request to send, must be one the server replies to
    /// * `mode` - where a server error should be reported
    /// * `decode` - conversion applied to the reply once it arrives
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let cookie = engine.issue(Request::GetInputFocus, Mode::Checked, |reply| Ok(reply))?;
    /// let focus = cookie.reply()?;
    /// ```
    pub fn issue<'a, R, F>(&'a self, request: Request, mode: Mode, decode: F) -> WindowManagerResult<Cookie<'a, T, R>>
    where
        F: FnOnce(Reply) -> WindowManagerResult<R> + 'a,
    {
        let sequence = self.send(request, mode)?;
        Ok(Cookie {
            engine: self,
            sequence,
            mode,
            decode: Some(Box::new(decode)),
        })
    }

    /// Issue a request without a reply
    pub fn issue_void(&self, request: Request, mode: Mode) -> WindowManagerResult<VoidCookie<'_, T>> {
        let sequence = self.send(request, mode)?;
        Ok(VoidCookie {
            engine: self,
            sequence,
            mode,
            resolved: false,
        })
    }

    /// Push all buffered requests to the server without waiting for anything
    pub fn flush(&self) -> WindowManagerResult<()> {
        self.transport.flush()
    }

    /// Round trip to the server, once this returns every earlier request has been processed
    pub fn sync(&self) -> WindowManagerResult<()> {
        self.issue(Request::GetInputFocus, Mode::Checked, |_| Ok(()))?.reply()
    }

    /// File every frame that has already arrived without blocking
    pub fn drain(&self) -> WindowManagerResult<usize> {
        let mut count = 0;
        while let Some(frame) = self.transport.poll_next()? {
            self.file(frame);
            count += 1;
        }
        Ok(count)
    }

    /// Pop the next event or asynchronous error, reading from the connection as needed.
    /// With `block` unset only frames that already arrived are considered.
    pub fn next_incoming(&self, block: bool) -> WindowManagerResult<Option<Incoming>> {
        loop {
            let next = self.inbox.borrow_mut().events.pop_front();
            if next.is_some() {
                return Ok(next);
            }
            if block {
                self.flush()?;
                let frame = self.transport.recv_next()?;
                self.file(frame);
            } else {
                match self.transport.poll_next()? {
                    Some(frame) => self.file(frame),
                    None => return Ok(None),
                }
            }
        }
    }

    /// Number of events and asynchronous errors waiting to be dispatched
    pub fn pending_incoming(&self) -> usize {
        self.inbox.borrow().events.len()
    }

    // Sort a frame into the inbox
    fn file(&self, frame: Frame) {
        let mut inbox = self.inbox.borrow_mut();
        match frame {
            Frame::Reply { sequence, reply } => {
                inbox.outstanding.remove(&sequence);
                if inbox.discarded.remove(&sequence) {
                    trace!("file: discarding reply: seq: {}", sequence);
                } else {
                    trace!("file: reply: seq: {}", sequence);
                    inbox.replies.insert(sequence, reply);
                }
            },
            Frame::Ack { sequence } => {
                inbox.outstanding.remove(&sequence);
                if !inbox.discarded.remove(&sequence) {
                    trace!("file: ack: seq: {}", sequence);
                    inbox.acks.insert(sequence);
                }
            },
            Frame::Error(err) => {
                let sequence = err.sequence;
                let mode = inbox.outstanding.remove(&sequence);
                let discarded = inbox.discarded.remove(&sequence);
                match mode {
                    Some(Mode::Checked) if !discarded => {
                        trace!("file: error: seq: {}, code: {}", sequence, err.code);
                        inbox.errors.insert(sequence, err);
                    },
                    Some(Mode::Unchecked) if !discarded => {
                        trace!("file: unchecked error: seq: {}, code: {}", sequence, err.code);
                        inbox.failed.insert(sequence);
                        inbox.events.push_back(Incoming::Error(err));
                    },
                    _ => {
                        trace!("file: async error: seq: {}, code: {}", sequence, err.code);
                        inbox.events.push_back(Incoming::Error(err));
                    },
                }
            },
            Frame::Event { sequence, bytes } => {
                trace!("file: event: seq: {}, code: {}", sequence, bytes.first().copied().unwrap_or(0));
                inbox.events.push_back(Incoming::Event { sequence, bytes });
            },
        }
    }

    // Forget about a cookie that was dropped without being resolved
    fn discard(&self, sequence: SequenceNumber) {
        let mut inbox = self.inbox.borrow_mut();
        if inbox.replies.remove(&sequence).is_some() || inbox.acks.remove(&sequence) || inbox.failed.remove(&sequence)
        {
            return;
        }
        if let Some(err) = inbox.errors.remove(&sequence) {
            warn!("discard: unclaimed error for seq: {}", sequence);
            inbox.events.push_back(Incoming::Error(err));
            return;
        }
        if inbox.outstanding.contains_key(&sequence) {
            inbox.discarded.insert(sequence);
        }
    }

    fn wait_for_reply(&self, sequence: SequenceNumber) -> WindowManagerResult<Reply> {
        self.flush()?;
        loop {
            {
                let mut inbox = self.inbox.borrow_mut();
                if let Some(reply) = inbox.replies.remove(&sequence) {
                    return Ok(reply);
                }
                if let Some(err) = inbox.errors.remove(&sequence) {
                    return Err(err.into());
                }
                if inbox.failed.remove(&sequence) {
                    return Err(WindowManagerError::ReplyUnavailable(sequence).into());
                }
            }
            let frame = self.transport.recv_next()?;
            self.file(frame);
        }
    }

    fn wait_for_check(&self, sequence: SequenceNumber, mode: Mode) -> WindowManagerResult<()> {
        match mode {
            Mode::Checked => {
                self.flush()?;
                loop {
                    {
                        let mut inbox = self.inbox.borrow_mut();
                        if inbox.acks.remove(&sequence) {
                            return Ok(());
                        }
                        if let Some(err) = inbox.errors.remove(&sequence) {
                            return Err(err.into());
                        }
                    }
                    let frame = self.transport.recv_next()?;
                    self.file(frame);
                }
            },
            Mode::Unchecked => {
                // Any error for the request has been sent once the round trip completes
                self.sync()?;
                self.drain()?;
                let mut inbox = self.inbox.borrow_mut();
                let pos = inbox.events.iter().position(|x| matches!(x, Incoming::Error(err) if err.sequence == sequence));
                match pos.and_then(|i| inbox.events.remove(i)) {
                    Some(Incoming::Error(err)) => Err(err.into()),
                    _ => Ok(()),
                }
            },
        }
    }
}

/// Cookie is a handle on a request whose reply hasn't been claimed yet
#[must_use = "dropping a cookie discards the reply"]
pub struct Cookie<'a, T: Transport, R> {
    engine: &'a Engine<T>,
    sequence: SequenceNumber,
    mode: Mode,
    decode: Option<Decoder<'a, R>>,
}

impl<'a, T: Transport, R: 'a> Cookie<'a, T, R> {
    /// Sequence number of the request this cookie resolves
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Block until the reply arrives and decode it
    ///
    /// A checked cookie returns the server's error. An unchecked one returns `ReplyUnavailable`
    /// while the error itself travels through the event stream.
    pub fn reply(mut self) -> WindowManagerResult<R> {
        let decode = self.decode.take().ok_or(WindowManagerError::ReplyUnavailable(self.sequence))?;
        let reply = self.engine.wait_for_reply(self.sequence)?;
        decode(reply)
    }

    /// Chain a further conversion onto the reply
    pub fn map<S, F>(mut self, f: F) -> Cookie<'a, T, S>
    where
        F: FnOnce(R) -> WindowManagerResult<S> + 'a,
    {
        let decode = self.decode.take();
        Cookie {
            engine: self.engine,
            sequence: self.sequence,
            mode: self.mode,
            decode: decode.map(|decode| -> Decoder<'a, S> { Box::new(move |reply| f(decode(reply)?)) }),
        }
    }
}

impl<T: Transport, R> Drop for Cookie<'_, T, R> {
    fn drop(&mut self) {
        if self.decode.is_some() {
            self.engine.discard(self.sequence);
        }
    }
}

/// VoidCookie is a handle on a request without reply
#[must_use = "dropping a checked void cookie discards its error"]
pub struct VoidCookie<'a, T: Transport> {
    engine: &'a Engine<T>,
    sequence: SequenceNumber,
    mode: Mode,
    resolved: bool,
}

impl<T: Transport> VoidCookie<'_, T> {
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Wait until the server has processed the request and report its error if there was one
    pub fn check(mut self) -> WindowManagerResult<()> {
        self.resolved = true;
        self.engine.wait_for_check(self.sequence, self.mode)
    }
}

impl<T: Transport> Drop for VoidCookie<'_, T> {
    fn drop(&mut self) {
        if !self.resolved {
            self.engine.discard(self.sequence);
        }
    }
}
