mod common;

use common::*;
use libxhint::{atoms::EWMH_ATOMS, prelude::*};

#[test]
fn test_predefined_atoms_need_no_round_trip() {
    let wm = connect();
    assert_eq!(wm.atom("WM_NAME").unwrap(), 39);
    assert_eq!(wm.atom_lookup("CARDINAL").unwrap(), 6);
    assert_eq!(wm.atom_name(68).unwrap(), "WM_TRANSIENT_FOR");
    assert_eq!(wm.transport().sent_count("InternAtom"), 0);
    assert_eq!(wm.transport().sent_count("GetAtomName"), 0);
}

#[test]
fn test_intern_is_cached() {
    let wm = connect();
    let atom = wm.atom("_XHINT_TEST").unwrap();
    assert_eq!(atom, wm.transport().atom("_XHINT_TEST"));
    assert_eq!(wm.atom("_XHINT_TEST").unwrap(), atom);
    assert_eq!(wm.atom_name(atom).unwrap(), "_XHINT_TEST");
    assert_eq!(wm.transport().sent_count("InternAtom"), 1);
    assert_eq!(wm.transport().sent_count("GetAtomName"), 0);
}

#[test]
fn test_lookup_never_creates() {
    let wm = connect();
    let err = wm.atom_lookup("_XHINT_MISSING").unwrap_err();
    assert!(err.is_unknown_atom());
    assert_eq!(wm.atoms().cached("_XHINT_MISSING"), None);
    assert!(matches!(wm.transport().sent().last(), Some(Request::InternAtom { only_if_exists: true, .. })));

    // Known to the server but not yet to the client
    let atom = wm.transport().atom("_XHINT_KNOWN");
    assert_eq!(wm.atom_lookup("_XHINT_KNOWN").unwrap(), atom);
    assert_eq!(wm.atoms().cached("_XHINT_KNOWN"), Some(atom));
}

#[test]
fn test_name_of_fills_both_directions() {
    let wm = connect();
    let atom = wm.transport().atom("_NET_WM_PING");
    assert_eq!(wm.atom_name(atom).unwrap(), "_NET_WM_PING");
    assert_eq!(wm.atom_name(atom).unwrap(), "_NET_WM_PING");
    assert_eq!(wm.atom("_NET_WM_PING").unwrap(), atom);
    assert_eq!(wm.transport().sent_count("GetAtomName"), 1);
    assert_eq!(wm.transport().sent_count("InternAtom"), 0);
}

#[test]
fn test_name_of_bad_atom() {
    let wm = connect();
    let err = wm.atom_name(0x7fff).unwrap_err();
    assert_eq!(err.protocol().map(|x| x.code), Some(BAD_ATOM));

    let err = wm.atom_name(NONE).unwrap_err();
    assert!(err.is_unknown_atom());
}

#[test]
fn test_prime_batches_unknown_names() {
    let wm = connect();
    wm.prime_atoms(&["_XHINT_A", "_XHINT_B", "_XHINT_A", "WM_NAME"]).unwrap();
    assert_eq!(wm.transport().sent_count("InternAtom"), 2);
    assert_eq!(wm.atoms().cached("_XHINT_A"), Some(wm.transport().atom("_XHINT_A")));
    assert_eq!(wm.atoms().cached("_XHINT_B"), Some(wm.transport().atom("_XHINT_B")));

    wm.prime_atoms(&["_XHINT_A", "_XHINT_B"]).unwrap();
    assert_eq!(wm.transport().sent_count("InternAtom"), 2);
}

#[test]
fn test_connect_primes_ewmh_atoms() {
    let wm = WindowManager::with_transport(FakeServer::new(), &ConnectOptions::new().prime_ewmh()).unwrap();
    let sent = wm.transport().sent_count("InternAtom");
    assert!(sent > 0 && sent <= EWMH_ATOMS.len());
    for name in EWMH_ATOMS.iter() {
        assert!(wm.atoms().cached(name).is_some(), "{} was not primed", name);
    }

    // Getters for primed names go straight to GetProperty
    drop(wm.get_active_window().unwrap());
    assert_eq!(wm.transport().sent_count("InternAtom"), sent);
}
