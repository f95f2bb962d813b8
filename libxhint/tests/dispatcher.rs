mod common;

use std::{cell::RefCell, rc::Rc};

use common::*;
use libxhint::prelude::*;

type Log = Rc<RefCell<Vec<u32>>>;

fn log() -> Log {
    Rc::new(RefCell::new(vec![]))
}

#[test]
fn test_property_change_reaches_callback() {
    let wm = connect();
    wm.listen(ROOT, EventMask::PROPERTY_CHANGE).unwrap();
    let seen = log();
    let s = seen.clone();
    wm.connect(EventKind::PropertyNotify, Some(ROOT), move |_, e| {
        s.borrow_mut().push(e.property().unwrap_or(0));
        Ok(())
    });

    wm.set_current_desktop_checked(2).unwrap().check().unwrap();
    assert_eq!(wm.process_pending().unwrap(), 1);
    assert_eq!(*seen.borrow(), vec![wm.atom("_NET_CURRENT_DESKTOP").unwrap()]);
}

#[test]
fn test_listen_merges_masks() {
    let wm = connect();
    wm.listen(ROOT, EventMask::PROPERTY_CHANGE).unwrap();
    wm.listen(ROOT, EventMask::SUBSTRUCTURE_NOTIFY).unwrap();
    let mask = u32::from(EventMask::PROPERTY_CHANGE | EventMask::SUBSTRUCTURE_NOTIFY);
    assert_eq!(wm.transport().mask(ROOT), mask);
    assert_eq!(wm.listen_mask(ROOT), mask);
    assert_eq!(wm.transport().sent_count("GetWindowAttributes"), 1);

    let err = wm.listen(0xdead, EventMask::PROPERTY_CHANGE).unwrap_err();
    assert_eq!(err.protocol().map(|x| x.code), Some(BAD_WINDOW));
}

#[test]
fn test_callbacks_run_in_registration_order_for_their_window_only() {
    let wm = connect();
    let seen = log();
    for i in 1..=2 {
        let s = seen.clone();
        wm.connect(EventKind::PropertyNotify, Some(ROOT), move |_, _| {
            s.borrow_mut().push(i);
            Ok(())
        });
    }
    let s = seen.clone();
    wm.connect(EventKind::PropertyNotify, Some(OTHER), move |_, _| {
        s.borrow_mut().push(99);
        Ok(())
    });
    let s = seen.clone();
    wm.connect(EventKind::PropertyNotify, None, move |_, _| {
        s.borrow_mut().push(100);
        Ok(())
    });

    wm.transport().push_event(property_event(ROOT, 39));
    assert_eq!(wm.process_pending().unwrap(), 1);
    assert_eq!(*seen.borrow(), vec![1, 2]);
}

#[test]
fn test_windowless_events_use_none_registrations() {
    let wm = connect();
    let seen = log();
    let s = seen.clone();
    wm.connect(EventKind::MappingNotify, None, move |_, e| {
        s.borrow_mut().push(e.mapping_request().unwrap_or(0xff) as u32);
        Ok(())
    });
    wm.transport().push_event(mapping_notify(1));
    wm.process_pending().unwrap();
    assert_eq!(*seen.borrow(), vec![1]);

    // No keymap was fetched so there is nothing to refresh
    assert_eq!(wm.transport().sent_count("GetKeyboardMapping"), 0);
}

#[test]
fn test_map_request_routes_by_parent() {
    let wm = connect();
    let seen = log();
    let s = seen.clone();
    wm.connect(EventKind::MapRequest, Some(ROOT), move |_, e| {
        s.borrow_mut().push(e.u32_at(8));
        Ok(())
    });
    wm.transport().push_event(map_request(ROOT, CLIENT));
    wm.process_pending().unwrap();
    assert_eq!(*seen.borrow(), vec![CLIENT]);
}

#[test]
fn test_failing_callbacks_do_not_stop_dispatch() {
    let wm = connect();
    let seen = log();
    wm.connect(EventKind::PropertyNotify, Some(ROOT), |_, _| Err(WindowManagerError::ConnectionClosed.into()));
    wm.connect(EventKind::PropertyNotify, Some(ROOT), |_, _| panic!("callback panicked"));
    let s = seen.clone();
    wm.connect(EventKind::PropertyNotify, Some(ROOT), move |_, e| {
        s.borrow_mut().push(e.property().unwrap_or(0));
        Ok(())
    });

    wm.transport().push_event(property_event(ROOT, 39));
    wm.transport().push_event(property_event(ROOT, 67));
    assert_eq!(wm.process_pending().unwrap(), 2);
    assert_eq!(*seen.borrow(), vec![39, 67]);
}

#[test]
fn test_disconnect() {
    let wm = connect();
    let first = wm.connect(EventKind::PropertyNotify, Some(ROOT), |_, _| Ok(()));
    let second = wm.connect(EventKind::PropertyNotify, Some(ROOT), |_, _| Ok(()));
    assert_ne!(first, second);
    assert!(wm.disconnect(first));
    assert!(!wm.disconnect(first));
    assert!(wm.is_connected(EventKind::PropertyNotify, Some(ROOT)));
    assert!(wm.disconnect(second));
    assert!(!wm.is_connected(EventKind::PropertyNotify, Some(ROOT)));

    wm.connect(EventKind::ConfigureNotify, Some(CLIENT), |_, _| Ok(()));
    wm.connect(EventKind::ConfigureNotify, Some(CLIENT), |_, _| Ok(()));
    assert_eq!(wm.disconnect_all(EventKind::ConfigureNotify, Some(CLIENT)), 2);
    assert_eq!(wm.disconnect_all(EventKind::ConfigureNotify, Some(CLIENT)), 0);
}

#[test]
fn test_unchecked_mutation_is_sent_on_flush() {
    let wm = connect();
    drop(wm.set_current_desktop_unchecked(3).unwrap());
    assert_eq!(wm.transport().queued(), 1);
    assert!(wm.transport().property(ROOT, "_NET_CURRENT_DESKTOP").is_none());

    wm.flush().unwrap();
    assert_eq!(wm.transport().queued(), 0);
    assert_eq!(wm.transport().cardinals(ROOT, "_NET_CURRENT_DESKTOP"), vec![3]);
}

#[test]
fn test_async_errors_are_reported_not_dispatched() {
    let wm = connect();
    let seen = log();
    let s = seen.clone();
    wm.connect(EventKind::PropertyNotify, Some(ROOT), move |_, _| {
        s.borrow_mut().push(1);
        Ok(())
    });
    drop(wm.set_icccm_name_unchecked(0xdead, "xterm").unwrap());
    wm.flush().unwrap();
    wm.transport().push_event(property_event(ROOT, 39));
    assert_eq!(wm.process_pending().unwrap(), 2);
    assert_eq!(*seen.borrow(), vec![1]);
}

#[test]
fn test_main_loop_stops_from_callback() {
    let wm = connect();
    let seen = log();
    let s = seen.clone();
    wm.connect(EventKind::PropertyNotify, Some(ROOT), move |wm, _| {
        s.borrow_mut().push(wm.loop_state() as u32);
        if s.borrow().len() == 2 {
            wm.stop();
        }
        Ok(())
    });
    for _ in 0..3 {
        wm.transport().push_event(property_event(ROOT, 39));
    }
    wm.main_loop().unwrap();
    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(wm.loop_state(), LoopState::Idle);
    assert_eq!(wm.transport().unread(), 1);
}

#[test]
fn test_loop_state_while_dispatching() {
    let wm = connect();
    let states = Rc::new(RefCell::new(vec![]));
    let s = states.clone();
    wm.connect(EventKind::PropertyNotify, Some(ROOT), move |wm, _| {
        s.borrow_mut().push(wm.loop_state());
        Ok(())
    });
    wm.transport().push_event(property_event(ROOT, 39));
    wm.process_pending().unwrap();
    assert_eq!(*states.borrow(), vec![LoopState::Dispatching]);
    assert_eq!(wm.loop_state(), LoopState::Idle);
}

#[test]
fn test_main_loop_ends_when_connection_closes() {
    let wm = connect();
    let err = wm.main_loop().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(wm.loop_state(), LoopState::Idle);
}

#[test]
fn test_main_loop_survives_non_fatal_read_errors() {
    let wm = connect();
    let seen = log();
    let s = seen.clone();
    wm.connect(EventKind::PropertyNotify, Some(ROOT), move |wm, e| {
        s.borrow_mut().push(e.property().unwrap_or(0));
        wm.stop();
        Ok(())
    });
    wm.transport().fail_read(WindowManagerError::MalformedEvent(3));
    wm.transport().push_event(property_event(ROOT, 39));
    wm.main_loop().unwrap();
    assert_eq!(*seen.borrow(), vec![39]);
}

#[test]
fn test_stop_handle_from_another_thread() {
    let wm = connect();
    let handle = wm.stop_handle();
    std::thread::spawn(move || handle.stop()).join().unwrap();
    wm.main_loop().unwrap();
}

#[test]
fn test_send_event_honours_the_mask() {
    let wm = connect();
    wm.listen(OTHER, EventMask::STRUCTURE_NOTIFY).unwrap();
    let msg = ClientMessage::new(OTHER, wm.atom("WM_PROTOCOLS").unwrap(), &[7]);
    let event = msg.encode(wm.byte_order());

    wm.send_event_checked(OTHER, EventMask::PROPERTY_CHANGE, event, false).unwrap().check().unwrap();
    assert_eq!(wm.process_pending().unwrap(), 0);

    wm.send_event_checked(OTHER, EventMask::STRUCTURE_NOTIFY, event, false).unwrap().check().unwrap();
    assert_eq!(wm.process_pending().unwrap(), 1);

    let err = wm.send_event_checked(0xdead, EventMask::NO_EVENT, event, false).unwrap().check().unwrap_err();
    assert_eq!(err.protocol().map(|x| x.code), Some(BAD_WINDOW));
}

#[test]
fn test_client_message_round_trip() {
    let wm = connect();
    wm.listen(ROOT, EventMask::SUBSTRUCTURE_NOTIFY).unwrap();
    let seen = Rc::new(RefCell::new(vec![]));
    let s = seen.clone();
    wm.connect(EventKind::ClientMessage, Some(CLIENT), move |_, e| {
        assert!(e.synthetic);
        s.borrow_mut().push(e.client_message().unwrap());
        Ok(())
    });

    wm.request_close_window_checked(CLIENT, 1234, Source::Pager).unwrap().check().unwrap();
    wm.process_pending().unwrap();
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].type_, wm.atom("_NET_CLOSE_WINDOW").unwrap());
    assert_eq!(seen[0].format, 32);
    assert_eq!(&seen[0].data[..2], &[1234, 2]);
}
