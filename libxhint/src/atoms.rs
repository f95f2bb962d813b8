//! Two way name/atom memo for a single connection.
//!
//! Atoms never change meaning while a connection is alive so the cache only ever grows. It starts
//! out with the atoms every server predefines and learns everything else on first use.
use std::{cell::RefCell, collections::HashMap};
use tracing::{debug, trace};

use crate::{
    cookie::{Engine, Mode},
    transport::{Atom, Reply, Request, Transport, NONE},
    UnknownAtom, WindowManagerError, WindowManagerResult,
};

/// Atoms the core protocol defines with fixed values
pub const PREDEFINED: [(&str, Atom); 68] = [
    ("PRIMARY", 1),
    ("SECONDARY", 2),
    ("ARC", 3),
    ("ATOM", 4),
    ("BITMAP", 5),
    ("CARDINAL", 6),
    ("COLORMAP", 7),
    ("CURSOR", 8),
    ("CUT_BUFFER0", 9),
    ("CUT_BUFFER1", 10),
    ("CUT_BUFFER2", 11),
    ("CUT_BUFFER3", 12),
    ("CUT_BUFFER4", 13),
    ("CUT_BUFFER5", 14),
    ("CUT_BUFFER6", 15),
    ("CUT_BUFFER7", 16),
    ("DRAWABLE", 17),
    ("FONT", 18),
    ("INTEGER", 19),
    ("PIXMAP", 20),
    ("POINT", 21),
    ("RECTANGLE", 22),
    ("RESOURCE_MANAGER", 23),
    ("RGB_COLOR_MAP", 24),
    ("RGB_BEST_MAP", 25),
    ("RGB_BLUE_MAP", 26),
    ("RGB_DEFAULT_MAP", 27),
    ("RGB_GRAY_MAP", 28),
    ("RGB_GREEN_MAP", 29),
    ("RGB_RED_MAP", 30),
    ("STRING", 31),
    ("VISUALID", 32),
    ("WINDOW", 33),
    ("WM_COMMAND", 34),
    ("WM_HINTS", 35),
    ("WM_CLIENT_MACHINE", 36),
    ("WM_ICON_NAME", 37),
    ("WM_ICON_SIZE", 38),
    ("WM_NAME", 39),
    ("WM_NORMAL_HINTS", 40),
    ("WM_SIZE_HINTS", 41),
    ("WM_ZOOM_HINTS", 42),
    ("MIN_SPACE", 43),
    ("NORM_SPACE", 44),
    ("MAX_SPACE", 45),
    ("END_SPACE", 46),
    ("SUPERSCRIPT_X", 47),
    ("SUPERSCRIPT_Y", 48),
    ("SUBSCRIPT_X", 49),
    ("SUBSCRIPT_Y", 50),
    ("UNDERLINE_POSITION", 51),
    ("UNDERLINE_THICKNESS", 52),
    ("STRIKEOUT_ASCENT", 53),
    ("STRIKEOUT_DESCENT", 54),
    ("ITALIC_ANGLE", 55),
    ("X_HEIGHT", 56),
    ("QUAD_WIDTH", 57),
    ("WEIGHT", 58),
    ("POINT_SIZE", 59),
    ("RESOLUTION", 60),
    ("COPYRIGHT", 61),
    ("NOTICE", 62),
    ("FONT_NAME", 63),
    ("FAMILY_NAME", 64),
    ("FULL_NAME", 65),
    ("CAP_HEIGHT", 66),
    ("WM_CLASS", 67),
    ("WM_TRANSIENT_FOR", 68),
];

/// Atoms `WindowManager` uses for most of its operations, handy for priming
pub const EWMH_ATOMS: [&str; 16] = [
    "UTF8_STRING",
    "WM_STATE",
    "WM_PROTOCOLS",
    "WM_DELETE_WINDOW",
    "_NET_SUPPORTED",
    "_NET_CLIENT_LIST",
    "_NET_NUMBER_OF_DESKTOPS",
    "_NET_CURRENT_DESKTOP",
    "_NET_DESKTOP_NAMES",
    "_NET_ACTIVE_WINDOW",
    "_NET_WORKAREA",
    "_NET_SUPPORTING_WM_CHECK",
    "_NET_WM_NAME",
    "_NET_WM_DESKTOP",
    "_NET_WM_STATE",
    "_NET_WM_WINDOW_TYPE",
];

fn decode_atom(reply: Reply) -> WindowManagerResult<Atom> {
    match reply {
        Reply::Atom(atom) => Ok(atom),
        _ => Err(WindowManagerError::UnexpectedReply("InternAtom").into()),
    }
}

/// AtomCache memoizes atoms in both directions
pub struct AtomCache {
    by_name: RefCell<HashMap<String, Atom>>,
    by_atom: RefCell<HashMap<Atom, String>>,
}

impl Default for AtomCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomCache {
    /// Create a cache holding only the predefined atoms
    pub fn new() -> Self {
        let cache = Self {
            by_name: RefCell::new(HashMap::new()),
            by_atom: RefCell::new(HashMap::new()),
        };
        for (name, atom) in PREDEFINED.iter() {
            cache.insert(name, *atom);
        }
        cache
    }

    /// Atom for the given name if it's already known
    pub fn cached(&self, name: &str) -> Option<Atom> {
        self.by_name.borrow().get(name).copied()
    }

    /// Name for the given atom if it's already known
    pub fn cached_name(&self, atom: Atom) -> Option<String> {
        self.by_atom.borrow().get(&atom).cloned()
    }

    /// Number of atoms known
    pub fn len(&self) -> usize {
        self.by_name.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.borrow().is_empty()
    }

    fn insert(&self, name: &str, atom: Atom) {
        self.by_name.borrow_mut().insert(name.to_owned(), atom);
        self.by_atom.borrow_mut().insert(atom, name.to_owned());
    }

    /// Get the atom for the given name creating it on the server if needed
    ///
    /// ### Arguments
    /// * `engine` - engine to issue the round trip with on a cache miss
    /// * `name` - atom name to resolve
    ///
    /// ### Examples
    /// ```ignore
    /// use libxhint::prelude::*;
    /// let wm = WindowManager::open(&ConnectOptions::default()).unwrap();
    /// let atom = wm.atoms().intern(wm.engine(), "_NET_WM_NAME").unwrap();
    /// ```
    pub fn intern<T: Transport>(&self, engine: &Engine<T>, name: &str) -> WindowManagerResult<Atom> {
        if let Some(atom) = self.cached(name) {
            return Ok(atom);
        }
        let request = Request::InternAtom {
            only_if_exists: false,
            name: name.to_owned(),
        };
        let atom = engine.issue(request, Mode::Checked, decode_atom)?.reply()?;
        debug!("intern: name: {}, atom: {}", name, atom);
        self.insert(name, atom);
        Ok(atom)
    }

    /// Get the atom for the given name without creating it, fails if the server doesn't know it
    pub fn lookup<T: Transport>(&self, engine: &Engine<T>, name: &str) -> WindowManagerResult<Atom> {
        if let Some(atom) = self.cached(name) {
            return Ok(atom);
        }
        let request = Request::InternAtom {
            only_if_exists: true,
            name: name.to_owned(),
        };
        let atom = engine.issue(request, Mode::Checked, decode_atom)?.reply()?;
        if atom == NONE {
            return Err(UnknownAtom::Name(name.to_owned()).into());
        }
        debug!("lookup: name: {}, atom: {}", name, atom);
        self.insert(name, atom);
        Ok(atom)
    }

    /// Get the name of the given atom
    pub fn name_of<T: Transport>(&self, engine: &Engine<T>, atom: Atom) -> WindowManagerResult<String> {
        if atom == NONE {
            return Err(UnknownAtom::Atom(atom).into());
        }
        if let Some(name) = self.cached_name(atom) {
            return Ok(name);
        }
        let name = engine
            .issue(Request::GetAtomName { atom }, Mode::Checked, |reply| match reply {
                Reply::AtomName(name) => Ok(name),
                _ => Err(WindowManagerError::UnexpectedReply("GetAtomName").into()),
            })?
            .reply()?;
        debug!("name_of: atom: {}, name: {}", atom, name);
        self.insert(&name, atom);
        Ok(name)
    }

    /// Intern all the given names issuing every request before waiting on any reply
    pub fn prime<T: Transport, S: AsRef<str>>(&self, engine: &Engine<T>, names: &[S]) -> WindowManagerResult<()> {
        let mut cookies = vec![];
        for name in names.iter().map(|x| x.as_ref()) {
            if self.cached(name).is_some() || cookies.iter().any(|(x, _)| *x == name) {
                continue;
            }
            let request = Request::InternAtom {
                only_if_exists: false,
                name: name.to_owned(),
            };
            cookies.push((name, engine.issue(request, Mode::Checked, decode_atom)?));
        }
        trace!("prime: requests: {}", cookies.len());
        for (name, cookie) in cookies {
            let atom = cookie.reply()?;
            self.insert(name, atom);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_atoms_are_seeded() {
        let cache = AtomCache::new();
        assert_eq!(cache.len(), 68);
        assert_eq!(cache.cached("WM_TRANSIENT_FOR"), Some(68));
        assert_eq!(cache.cached_name(6), Some("CARDINAL".to_owned()));
        assert_eq!(cache.cached("_NET_WM_NAME"), None);
    }
}
