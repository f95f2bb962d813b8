mod common;

use common::*;
use libxhint::prelude::*;

#[test]
fn test_root_properties() {
    let wm = connect();
    let server = wm.transport();
    server.set_cardinals(ROOT, "_NET_NUMBER_OF_DESKTOPS", &[4]);
    server.set_cardinals(ROOT, "_NET_CURRENT_DESKTOP", &[1]);
    server.set_raw(ROOT, "_NET_DESKTOP_NAMES", "UTF8_STRING", 8, b"one\0two\0".to_vec());
    server.set_windows(ROOT, "_NET_CLIENT_LIST", &[CLIENT, OTHER]);

    let count = wm.get_number_of_desktops().unwrap();
    let current = wm.get_current_desktop().unwrap();
    let names = wm.get_desktop_names().unwrap();
    assert_eq!(count.reply().unwrap(), 4);
    assert_eq!(current.reply().unwrap(), 1);
    assert_eq!(names.reply().unwrap(), vec!["one".to_owned(), "two".to_owned()]);
    assert_eq!(wm.get_windows(false).unwrap(), vec![CLIENT, OTHER]);
    assert_eq!(wm.get_windows(true).unwrap(), vec![FRAME, OTHER]);
}

#[test]
fn test_setters_store_the_registered_type() {
    let wm = connect();
    wm.set_desktop_names_checked(&["a".to_owned(), "b".to_owned()]).unwrap().check().unwrap();
    let stored = wm.transport().property(ROOT, "_NET_DESKTOP_NAMES").unwrap();
    assert_eq!(stored.value, b"a\0b\0".to_vec());
    assert_eq!(stored.format, 8);
    assert_eq!(stored.type_, wm.transport().atom("UTF8_STRING"));

    wm.set_number_of_desktops_checked(3).unwrap().check().unwrap();
    assert_eq!(wm.transport().cardinals(ROOT, "_NET_NUMBER_OF_DESKTOPS"), vec![3]);
    assert_eq!(wm.transport().property(ROOT, "_NET_NUMBER_OF_DESKTOPS").unwrap().type_, 6);
}

#[test]
fn test_missing_properties() {
    let wm = connect();
    assert_eq!(wm.get_client_list().unwrap().reply().unwrap(), Vec::<Window>::new());
    assert_eq!(wm.get_desktop_names().unwrap().reply().unwrap(), Vec::<String>::new());
    let err = wm.get_active_window().unwrap().reply().unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_malformed_properties() {
    let wm = connect();
    wm.transport().set_raw(CLIENT, "_NET_WM_PID", "CARDINAL", 32, vec![1, 2, 3]);
    assert!(wm.get_wm_pid(CLIENT).unwrap().reply().unwrap_err().is_malformed());

    wm.transport().set_raw(CLIENT, "_NET_WM_PID", "CARDINAL", 8, vec![1, 2, 3, 4]);
    assert!(wm.get_wm_pid(CLIENT).unwrap().reply().unwrap_err().is_malformed());

    wm.transport().set_cardinals(ROOT, "_NET_WORKAREA", &[0, 0, 1920, 1050, 0]);
    assert!(wm.get_workarea().unwrap().reply().unwrap_err().is_malformed());

    wm.transport().set_raw(CLIENT, "_NET_WM_NAME", "UTF8_STRING", 8, vec![0xff, 0xfe]);
    assert!(wm.get_wm_name(CLIENT).unwrap().reply().is_err());
}

#[test]
fn test_records() {
    let wm = connect();
    wm.transport().set_cardinals(ROOT, "_NET_WORKAREA", &[0, 30, 1920, 1050, 0, 0, 1920, 1080]);
    let areas = wm.get_workarea().unwrap().reply().unwrap();
    assert_eq!(areas.len(), 2);
    assert_eq!(areas[0], Workarea { x: 0, y: 30, width: 1920, height: 1050 });

    let extents = FrameExtents { left: 2, right: 2, top: 22, bottom: 2 };
    wm.set_frame_extents_checked(CLIENT, extents).unwrap().check().unwrap();
    assert_eq!(wm.transport().cardinals(CLIENT, "_NET_FRAME_EXTENTS"), vec![2, 2, 22, 2]);
    assert_eq!(wm.win_borders(CLIENT).unwrap(), extents);

    // The starting corner is optional and defaults to top left
    wm.transport().set_cardinals(ROOT, "_NET_DESKTOP_LAYOUT", &[ORIENTATION_VERT, 2, 2]);
    let layout = wm.get_desktop_layout().unwrap().reply().unwrap();
    assert_eq!(layout.orientation, ORIENTATION_VERT);
    assert_eq!(layout.starting_corner, CORNER_TOP_LEFT);
}

#[test]
fn test_generic_property_access() {
    let wm = connect();
    assert!(wm.get_property(CLIENT, "_XHINT_UNREGISTERED").is_err());

    let err = wm.set_property_checked(ROOT, "_NET_CURRENT_DESKTOP", &Value::Text("one".into())).err().unwrap();
    assert!(matches!(err.downcast_ref::<WindowManagerError>(), Some(WindowManagerError::LayoutMismatch(_))));
    assert_eq!(wm.transport().sent_count("ChangeProperty"), 0);

    wm.set_property_checked(ROOT, "_NET_CURRENT_DESKTOP", &Value::Cardinal(2)).unwrap().check().unwrap();
    assert_eq!(wm.get_property(ROOT, "_NET_CURRENT_DESKTOP").unwrap().reply().unwrap(), Value::Cardinal(2));

    wm.delete_property_checked(ROOT, "_NET_CURRENT_DESKTOP").unwrap().check().unwrap();
    assert!(wm.transport().property(ROOT, "_NET_CURRENT_DESKTOP").is_none());
}

#[test]
fn test_supported_is_cached() {
    let wm = connect();
    wm.transport().set_atoms(ROOT, "_NET_SUPPORTED", &["_NET_ACTIVE_WINDOW", "_NET_WM_STATE"]);
    assert!(wm.supported("_NET_ACTIVE_WINDOW").unwrap());
    assert!(!wm.supported("_NET_WM_MOVERESIZE").unwrap());
    assert_eq!(wm.transport().sent_count("GetProperty"), 1);

    wm.transport().set_atoms(ROOT, "_NET_SUPPORTED", &["_NET_WM_MOVERESIZE"]);
    assert!(wm.supported("_NET_ACTIVE_WINDOW").unwrap());
    wm.reset_supported();
    assert!(!wm.supported("_NET_ACTIVE_WINDOW").unwrap());
    assert!(wm.supported("_NET_WM_MOVERESIZE").unwrap());
}

#[test]
fn test_window_manager_info() {
    let wm = connect();
    wm.transport().set_windows(ROOT, "_NET_SUPPORTING_WM_CHECK", &[OTHER]);
    wm.transport().set_utf8(OTHER, "_NET_WM_NAME", "Openbox");
    assert_eq!(wm.winmgr().unwrap(), (OTHER, "Openbox".to_owned()));

    assert!(!wm.composite_manager().unwrap());
    wm.transport().set_owner("_NET_WM_CM_S0", OTHER);
    assert!(wm.composite_manager().unwrap());

    wm.set_supporting_wm_check_checked(FRAME).unwrap();
    assert_eq!(wm.transport().cardinals(ROOT, "_NET_SUPPORTING_WM_CHECK"), vec![FRAME]);
    assert_eq!(wm.transport().cardinals(FRAME, "_NET_SUPPORTING_WM_CHECK"), vec![FRAME]);
}

#[test]
fn test_client_messages() {
    let wm = connect();
    let server = wm.transport();

    wm.request_current_desktop_checked(1, 500).unwrap().check().unwrap();
    let msg = *server.client_messages(ROOT).last().unwrap();
    assert_eq!(msg.window, ROOT);
    assert_eq!(msg.type_, server.atom("_NET_CURRENT_DESKTOP"));
    assert_eq!(msg.data, [1, 500, 0, 0, 0]);

    wm.request_wm_desktop_checked(CLIENT, 0xFFFF_FFFF, Source::Pager).unwrap().check().unwrap();
    let msg = *server.client_messages(ROOT).last().unwrap();
    assert_eq!(msg.window, CLIENT);
    assert_eq!(&msg.data[..2], &[0xFFFF_FFFF, 2]);

    // The SendEvent goes to the root with substructure redirect so the window manager gets it
    match server.sent().last() {
        Some(Request::SendEvent { destination, event_mask, propagate, .. }) => {
            assert_eq!(*destination, ROOT);
            assert!(!propagate);
            assert_eq!(*event_mask, u32::from(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY));
        },
        other => panic!("expected SendEvent, got {:?}", other),
    }

    let err = wm.request_close_window_checked(0xdead, 0, Source::Pager).unwrap().check();
    assert!(err.is_ok(), "the message is about the window but sent to the root");
}

#[test]
fn test_window_actions() {
    let wm = connect();
    let server = wm.transport();

    wm.maximize_win(CLIENT).unwrap();
    let msg = *server.client_messages(ROOT).last().unwrap();
    assert_eq!(msg.type_, server.atom("_NET_WM_STATE"));
    assert_eq!(msg.data[0], u32::from(StateAction::Add));
    assert_eq!(msg.data[1], server.atom("_NET_WM_STATE_MAXIMIZED_HORZ"));
    assert_eq!(msg.data[2], server.atom("_NET_WM_STATE_MAXIMIZED_VERT"));
    assert_eq!(msg.data[3], u32::from(Source::Pager));

    wm.unmaximize_win(CLIENT).unwrap();
    assert_eq!(server.client_messages(ROOT).last().unwrap().data[0], u32::from(StateAction::Remove));

    server.set_windows(ROOT, "_NET_ACTIVE_WINDOW", &[OTHER]);
    wm.activate_win(CLIENT).unwrap();
    let msg = *server.client_messages(ROOT).last().unwrap();
    assert_eq!(msg.window, CLIENT);
    assert_eq!(msg.data, [u32::from(Source::Pager), CURRENT_TIME, OTHER, 0, 0]);
}

#[test]
fn test_moveresize_accounts_for_the_frame() {
    let wm = connect();
    wm.moveresize(CLIENT, FrameStyle::Parent, Some(10), Some(20), Some(1004), Some(724)).unwrap();
    let msg = *wm.transport().client_messages(ROOT).last().unwrap();
    assert_eq!(msg.type_, wm.transport().atom("_NET_MOVERESIZE_WINDOW"));
    let flags = u32::from(WinGravity::NorthWest)
        | MOVE_RESIZE_WINDOW_X
        | MOVE_RESIZE_WINDOW_Y
        | MOVE_RESIZE_WINDOW_WIDTH
        | MOVE_RESIZE_WINDOW_HEIGHT
        | (u32::from(Source::Pager) << 12);
    assert_eq!(msg.data, [flags, 10, 20, 1000, 700]);

    // Only moving leaves the size flags out
    wm.moveresize(CLIENT, FrameStyle::None, Some(0), Some(0), None, None).unwrap();
    let msg = *wm.transport().client_messages(ROOT).last().unwrap();
    assert_eq!(msg.data[0] & MOVE_RESIZE_WINDOW_WIDTH, 0);
    assert_eq!(msg.data[0] & MOVE_RESIZE_WINDOW_X, MOVE_RESIZE_WINDOW_X);
}

#[test]
fn test_geometry() {
    let wm = connect();
    assert_eq!(wm.win_geometry(CLIENT).unwrap(), Geometry { x: 102, y: 72, width: 800, height: 600 });
    assert_eq!(
        wm.get_decorated_geometry(CLIENT, FrameStyle::Parent).unwrap(),
        Geometry { x: 100, y: 50, width: 804, height: 624 }
    );
    assert_eq!(wm.get_decorated_geometry(CLIENT, FrameStyle::Grandparent).unwrap().width, 1920);
    assert_eq!(wm.win_parent(CLIENT).unwrap(), FRAME);

    let changes = WindowChanges { x: Some(5), width: Some(50), ..Default::default() };
    wm.configure_window(OTHER, changes).unwrap().check().unwrap();
    let g = wm.transport().geometry(OTHER).unwrap();
    assert_eq!((g.x, g.y, g.width, g.height), (5, 0, 50, 200));
}

#[test]
fn test_focus() {
    let wm = connect();
    drop(wm.set_input_focus(OTHER, CURRENT_TIME).unwrap());
    assert_eq!(wm.get_input_focus().unwrap().reply().unwrap(), OTHER);
    assert_eq!(wm.transport().focus(), OTHER);
}

#[test]
fn test_win_name_fallbacks() {
    let wm = connect();
    let server = wm.transport();
    assert_eq!(wm.win_name(CLIENT).unwrap(), "");

    server.set_latin1(CLIENT, "WM_NAME", b"caf\xe9");
    assert_eq!(wm.win_name(CLIENT).unwrap(), "café");

    server.set_utf8(CLIENT, "_NET_WM_NAME", "Ünïcode");
    assert_eq!(wm.win_name(CLIENT).unwrap(), "Ünïcode");

    server.set_utf8(CLIENT, "_NET_WM_VISIBLE_NAME", "");
    assert_eq!(wm.win_name(CLIENT).unwrap(), "Ünïcode");

    server.set_utf8(CLIENT, "_NET_WM_VISIBLE_NAME", "Ünïcode <2>");
    assert_eq!(wm.win_name(CLIENT).unwrap(), "Ünïcode <2>");

    assert_eq!(wm.win_name(0xdead).unwrap(), "");
}

#[test]
fn test_win_type_and_state() {
    let wm = connect();
    let server = wm.transport();
    assert_eq!(wm.win_type(CLIENT).unwrap(), WinType::Normal);

    server.set_windows(CLIENT, "WM_TRANSIENT_FOR", &[OTHER]);
    assert_eq!(wm.win_type(CLIENT).unwrap(), WinType::Dialog);

    server.set_atoms(CLIENT, "_NET_WM_WINDOW_TYPE", &["_NET_WM_WINDOW_TYPE_DOCK", "_NET_WM_WINDOW_TYPE_NORMAL"]);
    assert_eq!(wm.win_type(CLIENT).unwrap(), WinType::Dock);

    server.set_atoms(CLIENT, "_NET_WM_STATE", &["_NET_WM_STATE_ABOVE", "_KDE_NET_WM_STATE_TEST"]);
    assert_eq!(
        wm.win_state(CLIENT).unwrap(),
        vec![WinState::Above, WinState::Other("_KDE_NET_WM_STATE_TEST".to_owned())]
    );

    server.set_cardinals(CLIENT, "_NET_WM_DESKTOP", &[0xFFFF_FFFF]);
    assert_eq!(wm.win_desktop(CLIENT).unwrap(), 0xFFFF_FFFF);
    server.set_cardinals(CLIENT, "_NET_WM_PID", &[4242]);
    assert_eq!(wm.win_pid(CLIENT).unwrap(), 4242);
}

#[test]
fn test_opacity_and_showing_desktop() {
    let wm = connect();
    wm.set_wm_window_opacity_checked(CLIENT, 0.5).unwrap().check().unwrap();
    let opacity = wm.get_wm_window_opacity(CLIENT).unwrap().reply().unwrap();
    assert!((opacity - 0.5).abs() < 1e-6);

    wm.set_showing_desktop_checked(true).unwrap().check().unwrap();
    assert!(wm.get_showing_desktop().unwrap().reply().unwrap());
}

#[test]
fn test_icons() {
    let wm = connect();
    let icon = Icon { width: 2, height: 1, pixels: vec![0xff00_00ff, 0xff00_ff00] };
    wm.set_wm_icon_checked(CLIENT, &[icon.clone()]).unwrap().check().unwrap();
    assert_eq!(wm.transport().cardinals(CLIENT, "_NET_WM_ICON"), vec![2, 1, 0xff00_00ff, 0xff00_ff00]);
    assert_eq!(wm.get_wm_icon(CLIENT).unwrap().reply().unwrap(), vec![icon]);

    let bad = Icon { width: 2, height: 2, pixels: vec![0] };
    assert!(wm.set_wm_icon_checked(CLIENT, &[bad]).is_err());
}

#[test]
fn test_icccm_properties() {
    let wm = connect();
    let server = wm.transport();

    let class = WmClass { instance: "xterm".to_owned(), class: "XTerm".to_owned() };
    wm.set_wm_class_checked(CLIENT, &class).unwrap().check().unwrap();
    assert_eq!(server.property(CLIENT, "WM_CLASS").unwrap().value, b"xterm\0XTerm\0".to_vec());
    assert_eq!(wm.win_class(CLIENT).unwrap(), "XTerm");

    let flags = hint::INPUT | hint::URGENCY;
    server.set_raw(CLIENT, "WM_HINTS", "WM_HINTS", 32, words(&[flags, 0, 0, 0, 0, 0, 0, 0, 0]));
    let hints = wm.get_wm_hints(CLIENT).unwrap().reply().unwrap();
    assert!(!hints.accepts_input());
    assert!(hints.is_urgent());
    assert_eq!(hints.group(), None);

    // Pre ICCCM 1.0 clients write 15 fields
    let mut size = vec![0u32; 15];
    size[0] = size_hint::P_MIN_SIZE;
    size[5] = 200;
    size[6] = 100;
    server.set_raw(CLIENT, "WM_NORMAL_HINTS", "WM_SIZE_HINTS", 32, words(&size));
    let hints = wm.get_wm_normal_hints(CLIENT).unwrap().reply().unwrap();
    assert_eq!(hints.min_size(), Some((200, 100)));
    assert_eq!(hints.max_size(), None);
    assert_eq!(hints.gravity(), WinGravity::NorthWest);

    wm.set_icccm_state_checked(CLIENT, WmState { state: 3, icon: 0 }).unwrap().check().unwrap();
    assert_eq!(wm.get_icccm_state(CLIENT).unwrap().reply().unwrap().kind(), IcccmState::Iconic);

    assert!(wm.set_icccm_name_checked(CLIENT, "日本").is_err());
}

#[test]
fn test_delete_window_protocol() {
    let wm = connect();
    let server = wm.transport();
    server.set_atoms(CLIENT, "WM_PROTOCOLS", &["WM_DELETE_WINDOW", "WM_TAKE_FOCUS"]);
    assert!(wm.supports_protocol(CLIENT, "WM_DELETE_WINDOW").unwrap());
    assert!(!wm.supports_protocol(CLIENT, "_NET_WM_PING").unwrap());

    wm.send_delete_window(CLIENT, 77).unwrap().check().unwrap();
    let msg = *server.client_messages(CLIENT).last().unwrap();
    assert_eq!(msg.type_, server.atom("WM_PROTOCOLS"));
    assert_eq!(&msg.data[..2], &[server.atom("WM_DELETE_WINDOW"), 77]);
}

#[test]
fn test_motif_decorations() {
    let wm = connect();
    assert_eq!(wm.decorated(CLIENT).unwrap(), None);

    wm.set_decorations_checked(CLIENT, false).unwrap().check().unwrap();
    assert_eq!(wm.transport().cardinals(CLIENT, "_MOTIF_WM_HINTS"), vec![motif::HINT_DECORATIONS, 0, 0, 0, 0]);
    assert_eq!(wm.decorated(CLIENT).unwrap(), Some(false));

    wm.set_decorations_checked(CLIENT, true).unwrap().check().unwrap();
    assert_eq!(wm.decorated(CLIENT).unwrap(), Some(true));

    wm.transport().set_raw(CLIENT, "_MOTIF_WM_HINTS", "_MOTIF_WM_HINTS", 32, words(&[2, 0]));
    assert_eq!(wm.decorated(CLIENT).unwrap(), None);
}
