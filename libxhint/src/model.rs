use std::{convert, fmt};

use crate::{
    codec::{self, Record, RecordLayout, Value},
    transport::{Atom, Window},
    ErrorWrapper, WindowManagerError, WindowManagerResult,
};

/// WinGravity
/// Gravity is defined as the lower byte of the move resize flags 32bit value
/// <https://tronche.com/gui/x/xlib/window/attributes/gravity.html>
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WinGravity {
    Unmap,
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

// Implement format! support
impl fmt::Display for WinGravity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

impl convert::TryFrom<u32> for WinGravity {
    type Error = WindowManagerError;

    fn try_from(val: u32) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(WinGravity::Unmap),
            1 => Ok(WinGravity::NorthWest),
            2 => Ok(WinGravity::North),
            3 => Ok(WinGravity::NorthEast),
            4 => Ok(WinGravity::West),
            5 => Ok(WinGravity::Center),
            6 => Ok(WinGravity::East),
            7 => Ok(WinGravity::SouthWest),
            8 => Ok(WinGravity::South),
            9 => Ok(WinGravity::SouthEast),
            10 => Ok(WinGravity::Static),
            _ => Err(WindowManagerError::InvalidWinGravity(val)),
        }
    }
}

impl From<WinGravity> for u32 {
    fn from(val: WinGravity) -> Self {
        match val {
            WinGravity::Unmap => 0,
            WinGravity::NorthWest => 1,
            WinGravity::North => 2,
            WinGravity::NorthEast => 3,
            WinGravity::West => 4,
            WinGravity::Center => 5,
            WinGravity::East => 6,
            WinGravity::SouthWest => 7,
            WinGravity::South => 8,
            WinGravity::SouthEast => 9,
            WinGravity::Static => 10,
        }
    }
}

/// WinClass provides a easy way to identify the different window class types
#[derive(Debug, Clone, PartialEq)]
pub enum WinClass {
    CopyFromParent,
    InputOutput,
    InputOnly,
}

// Convert from u32 to Class
impl WinClass {
    pub fn from(val: u32) -> WindowManagerResult<WinClass> {
        match val {
            0 => Ok(WinClass::CopyFromParent),
            1 => Ok(WinClass::InputOutput),
            2 => Ok(WinClass::InputOnly),
            _ => Err(WindowManagerError::InvalidWinClass(val).into()),
        }
    }
}

// Implement format! support
impl fmt::Display for WinClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

/// WinMap provides an easy way to identify the differnt window map values
#[derive(Debug, Clone, PartialEq)]
pub enum WinMap {
    Unmapped,
    Unviewable,
    Viewable,
}

// Convert from u32 to state
impl WinMap {
    pub fn from(val: u32) -> WindowManagerResult<WinMap> {
        match val {
            0 => Ok(WinMap::Unmapped),
            1 => Ok(WinMap::Unviewable),
            2 => Ok(WinMap::Viewable),
            _ => Err(WindowManagerError::InvalidWinMap(val).into()),
        }
    }
}

// Implement format! support
impl fmt::Display for WinMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

/// WinState provides an easy way to identify the different window states
#[derive(Debug, Clone, PartialEq)]
pub enum WinState {
    Above,
    Below,
    DemandsAttention,
    Focused,
    Fullscreen,
    Hidden,
    MaxVert,
    MaxHorz,
    Modal,
    Shaded,
    SkipPager,
    SkipTaskbar,
    Sticky,
    Other(String),
}

impl WinState {
    /// Map a `_NET_WM_STATE_*` atom name to its state
    pub fn from_name(name: &str) -> WinState {
        match name {
            "_NET_WM_STATE_ABOVE" => WinState::Above,
            "_NET_WM_STATE_BELOW" => WinState::Below,
            "_NET_WM_STATE_DEMANDS_ATTENTION" => WinState::DemandsAttention,
            "_NET_WM_STATE_FOCUSED" => WinState::Focused,
            "_NET_WM_STATE_FULLSCREEN" => WinState::Fullscreen,
            "_NET_WM_STATE_HIDDEN" => WinState::Hidden,
            "_NET_WM_STATE_MAXIMIZED_VERT" => WinState::MaxVert,
            "_NET_WM_STATE_MAXIMIZED_HORZ" => WinState::MaxHorz,
            "_NET_WM_STATE_MODAL" => WinState::Modal,
            "_NET_WM_STATE_SHADED" => WinState::Shaded,
            "_NET_WM_STATE_SKIP_PAGER" => WinState::SkipPager,
            "_NET_WM_STATE_SKIP_TASKBAR" => WinState::SkipTaskbar,
            "_NET_WM_STATE_STICKY" => WinState::Sticky,
            _ => WinState::Other(name.to_owned()),
        }
    }

    /// Atom name the state is stored as
    pub fn atom_name(&self) -> String {
        match self {
            WinState::Above => "_NET_WM_STATE_ABOVE".to_owned(),
            WinState::Below => "_NET_WM_STATE_BELOW".to_owned(),
            WinState::DemandsAttention => "_NET_WM_STATE_DEMANDS_ATTENTION".to_owned(),
            WinState::Focused => "_NET_WM_STATE_FOCUSED".to_owned(),
            WinState::Fullscreen => "_NET_WM_STATE_FULLSCREEN".to_owned(),
            WinState::Hidden => "_NET_WM_STATE_HIDDEN".to_owned(),
            WinState::MaxVert => "_NET_WM_STATE_MAXIMIZED_VERT".to_owned(),
            WinState::MaxHorz => "_NET_WM_STATE_MAXIMIZED_HORZ".to_owned(),
            WinState::Modal => "_NET_WM_STATE_MODAL".to_owned(),
            WinState::Shaded => "_NET_WM_STATE_SHADED".to_owned(),
            WinState::SkipPager => "_NET_WM_STATE_SKIP_PAGER".to_owned(),
            WinState::SkipTaskbar => "_NET_WM_STATE_SKIP_TASKBAR".to_owned(),
            WinState::Sticky => "_NET_WM_STATE_STICKY".to_owned(),
            WinState::Other(name) => name.clone(),
        }
    }
}

// Implement format! support
impl fmt::Display for WinState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WinState::Other(name) => write!(f, "{}", name),
            _ => write!(f, "{}", format!("{:?}", self).to_lowercase()),
        }
    }
}

// Convert from &str to State, accepts the short lowercase names used on the command line
impl convert::TryFrom<&str> for WinState {
    type Error = WindowManagerError;

    fn try_from(val: &str) -> Result<Self, Self::Error> {
        match val.to_lowercase().as_ref() {
            "above" => Ok(WinState::Above),
            "below" => Ok(WinState::Below),
            "demandsattention" | "demands-attention" => Ok(WinState::DemandsAttention),
            "fullscreen" => Ok(WinState::Fullscreen),
            "hidden" => Ok(WinState::Hidden),
            "maxvert" => Ok(WinState::MaxVert),
            "maxhorz" => Ok(WinState::MaxHorz),
            "modal" => Ok(WinState::Modal),
            "shaded" => Ok(WinState::Shaded),
            "skippager" | "skip-pager" => Ok(WinState::SkipPager),
            "skiptaskbar" | "skip-taskbar" => Ok(WinState::SkipTaskbar),
            "sticky" => Ok(WinState::Sticky),
            _ => Err(WindowManagerError::UnknownProperty(val.to_owned())),
        }
    }
}

/// WinType provides an easy way to identify the different window types
#[derive(Debug, Clone, PartialEq)]
pub enum WinType {
    Combo,
    Desktop,
    Dialog,
    DND,
    Dock,
    DropDownMenu,
    Menu,
    Normal,
    Notification,
    PopupMenu,
    Splash,
    Toolbar,
    ToolTip,
    Utility,
    Other(String),
}

impl WinType {
    /// Map a `_NET_WM_WINDOW_TYPE_*` atom name to its type
    pub fn from_name(name: &str) -> WinType {
        match name {
            "_NET_WM_WINDOW_TYPE_COMBO" => WinType::Combo,
            "_NET_WM_WINDOW_TYPE_DESKTOP" => WinType::Desktop,
            "_NET_WM_WINDOW_TYPE_DIALOG" => WinType::Dialog,
            "_NET_WM_WINDOW_TYPE_DND" => WinType::DND,
            "_NET_WM_WINDOW_TYPE_DOCK" => WinType::Dock,
            "_NET_WM_WINDOW_TYPE_DROPDOWN_MENU" => WinType::DropDownMenu,
            "_NET_WM_WINDOW_TYPE_MENU" => WinType::Menu,
            "_NET_WM_WINDOW_TYPE_NORMAL" => WinType::Normal,
            "_NET_WM_WINDOW_TYPE_NOTIFICATION" => WinType::Notification,
            "_NET_WM_WINDOW_TYPE_POPUP_MENU" => WinType::PopupMenu,
            "_NET_WM_WINDOW_TYPE_SPLASH" => WinType::Splash,
            "_NET_WM_WINDOW_TYPE_TOOLBAR" => WinType::Toolbar,
            "_NET_WM_WINDOW_TYPE_TOOLTIP" => WinType::ToolTip,
            "_NET_WM_WINDOW_TYPE_UTILITY" => WinType::Utility,
            _ => WinType::Other(name.to_owned()),
        }
    }
}

// Implement format! support
impl fmt::Display for WinType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WinType::Other(name) => write!(f, "{}", name),
            _ => write!(f, "{}", format!("{:?}", self).to_lowercase()),
        }
    }
}

/// StateAction is the first value of a `_NET_WM_STATE` request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl From<StateAction> for u32 {
    fn from(val: StateAction) -> Self {
        match val {
            StateAction::Remove => 0,
            StateAction::Add => 1,
            StateAction::Toggle => 2,
        }
    }
}

/// Source indication sent along with most window manager requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    Legacy,
    Application,
    Pager,
}

impl From<Source> for u32 {
    fn from(val: Source) -> Self {
        match val {
            Source::Legacy => 0,
            Source::Application => 1,
            Source::Pager => 2,
        }
    }
}

/// MoveResizeDirection is the direction of a `_NET_WM_MOVERESIZE` request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveResizeDirection {
    SizeTopLeft,
    SizeTop,
    SizeTopRight,
    SizeRight,
    SizeBottomRight,
    SizeBottom,
    SizeBottomLeft,
    SizeLeft,
    Move,
    SizeKeyboard,
    MoveKeyboard,
    Cancel,
}

impl From<MoveResizeDirection> for u32 {
    fn from(val: MoveResizeDirection) -> Self {
        match val {
            MoveResizeDirection::SizeTopLeft => 0,
            MoveResizeDirection::SizeTop => 1,
            MoveResizeDirection::SizeTopRight => 2,
            MoveResizeDirection::SizeRight => 3,
            MoveResizeDirection::SizeBottomRight => 4,
            MoveResizeDirection::SizeBottom => 5,
            MoveResizeDirection::SizeBottomLeft => 6,
            MoveResizeDirection::SizeLeft => 7,
            MoveResizeDirection::Move => 8,
            MoveResizeDirection::SizeKeyboard => 9,
            MoveResizeDirection::MoveKeyboard => 10,
            MoveResizeDirection::Cancel => 11,
        }
    }
}

// Define the second byte of the move resize flags 32bit value
// Used to indicate that the associated value has been changed and needs to be acted upon
pub type MoveResizeWindowFlags = u32;
pub const MOVE_RESIZE_WINDOW_X: MoveResizeWindowFlags = 1 << 8;
pub const MOVE_RESIZE_WINDOW_Y: MoveResizeWindowFlags = 1 << 9;
pub const MOVE_RESIZE_WINDOW_WIDTH: MoveResizeWindowFlags = 1 << 10;
pub const MOVE_RESIZE_WINDOW_HEIGHT: MoveResizeWindowFlags = 1 << 11;

/// Orientation of the desktop layout
pub const ORIENTATION_HORZ: u32 = 0;
pub const ORIENTATION_VERT: u32 = 1;

/// Starting corner of the desktop layout
pub const CORNER_TOP_LEFT: u32 = 0;
pub const CORNER_TOP_RIGHT: u32 = 1;
pub const CORNER_BOTTOM_RIGHT: u32 = 2;
pub const CORNER_BOTTOM_LEFT: u32 = 3;

/// `WM_HINTS` flags
pub mod hint {
    pub const INPUT: u32 = 1;
    pub const STATE: u32 = 2;
    pub const ICON_PIXMAP: u32 = 4;
    pub const ICON_WINDOW: u32 = 8;
    pub const ICON_POSITION: u32 = 16;
    pub const ICON_MASK: u32 = 32;
    pub const WINDOW_GROUP: u32 = 64;
    pub const MESSAGE: u32 = 128;
    pub const URGENCY: u32 = 256;
}

/// `WM_NORMAL_HINTS` flags
pub mod size_hint {
    pub const US_POSITION: u32 = 1;
    pub const US_SIZE: u32 = 2;
    pub const P_POSITION: u32 = 4;
    pub const P_SIZE: u32 = 8;
    pub const P_MIN_SIZE: u32 = 16;
    pub const P_MAX_SIZE: u32 = 32;
    pub const P_RESIZE_INC: u32 = 64;
    pub const P_ASPECT: u32 = 128;
    pub const P_BASE_SIZE: u32 = 256;
    pub const P_WIN_GRAVITY: u32 = 512;
}

/// `_MOTIF_WM_HINTS` flags and values
pub mod motif {
    pub const HINT_FUNCTIONS: u32 = 1;
    pub const HINT_DECORATIONS: u32 = 2;
    pub const HINT_INPUT_MODE: u32 = 4;
    pub const HINT_STATUS: u32 = 8;

    pub const FUNCTION_ALL: u32 = 1;
    pub const FUNCTION_RESIZE: u32 = 2;
    pub const FUNCTION_MOVE: u32 = 4;
    pub const FUNCTION_MINIMIZE: u32 = 8;
    pub const FUNCTION_MAXIMIZE: u32 = 16;
    pub const FUNCTION_CLOSE: u32 = 32;

    pub const DECORATION_ALL: u32 = 1;
    pub const DECORATION_BORDER: u32 = 2;
    pub const DECORATION_RESIZE_H: u32 = 4;
    pub const DECORATION_TITLE: u32 = 8;
    pub const DECORATION_MENU: u32 = 16;
    pub const DECORATION_MINIMIZE: u32 = 32;
    pub const DECORATION_MAXIMIZE: u32 = 64;

    pub const INPUT_MODELESS: u32 = 0;
    pub const INPUT_PRIMARY_APPLICATION_MODAL: u32 = 1;
    pub const INPUT_SYSTEM_MODAL: u32 = 2;
    pub const INPUT_FULL_APPLICATION_MODAL: u32 = 3;

    pub const STATUS_TEAROFF_WINDOW: u32 = 1;
}

/// IcccmState is the state stored in `WM_STATE`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IcccmState {
    Withdrawn,
    Normal,
    Zoomed,
    Iconic,
    Inactive,
    Other(u32),
}

impl From<u32> for IcccmState {
    fn from(val: u32) -> Self {
        match val {
            0 => IcccmState::Withdrawn,
            1 => IcccmState::Normal,
            2 => IcccmState::Zoomed,
            3 => IcccmState::Iconic,
            4 => IcccmState::Inactive,
            _ => IcccmState::Other(val),
        }
    }
}

impl From<IcccmState> for u32 {
    fn from(val: IcccmState) -> Self {
        match val {
            IcccmState::Withdrawn => 0,
            IcccmState::Normal => 1,
            IcccmState::Zoomed => 2,
            IcccmState::Iconic => 3,
            IcccmState::Inactive => 4,
            IcccmState::Other(x) => x,
        }
    }
}

// Implement format! support
impl fmt::Display for IcccmState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IcccmState::Other(x) => write!(f, "{}", x),
            _ => write!(f, "{}", format!("{:?}", self).to_lowercase()),
        }
    }
}

// Typed views over codec records. Each view converts to and from the generic record so getters
// and setters can go through the descriptor registry.
macro_rules! record_view {
    ($(#[$meta:meta])* $name:ident, $layout:expr, { $($field:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: u32,)*
        }

        impl $name {
            /// Record layout this view maps onto
            pub fn layout() -> &'static RecordLayout {
                &$layout
            }
        }

        impl From<&Record> for $name {
            fn from(record: &Record) -> Self {
                Self {
                    $($field: record.get(stringify!($field)).unwrap_or(0),)*
                }
            }
        }

        impl From<Record> for $name {
            fn from(record: Record) -> Self {
                Self::from(&record)
            }
        }

        impl From<$name> for Record {
            fn from(val: $name) -> Self {
                Record::new(&$layout)$(.with(stringify!($field), val.$field))*
            }
        }

        impl TryFrom<Value> for $name {
            type Error = ErrorWrapper;
            fn try_from(val: Value) -> WindowManagerResult<$name> {
                Ok(Self::from(Record::try_from(val)?))
            }
        }

        impl TryFrom<Value> for Vec<$name> {
            type Error = ErrorWrapper;
            fn try_from(val: Value) -> WindowManagerResult<Vec<$name>> {
                Ok(Vec::<Record>::try_from(val)?.iter().map($name::from).collect())
            }
        }
    };
}

record_view!(
    /// Strut reserves space at the screen edges, see `_NET_WM_STRUT`
    Strut, codec::STRUT, { left, right, top, bottom }
);

record_view!(
    /// StrutPartial reserves space along part of a screen edge, see `_NET_WM_STRUT_PARTIAL`
    StrutPartial, codec::STRUT_PARTIAL, {
        left, right, top, bottom,
        left_start_y, left_end_y, right_start_y, right_end_y,
        top_start_x, top_end_x, bottom_start_x, bottom_end_x,
    }
);

record_view!(
    /// FrameExtents are the borders the window manager adds around a window
    FrameExtents, codec::FRAME_EXTENTS, { left, right, top, bottom }
);

record_view!(DesktopGeometry, codec::DESKTOP_GEOMETRY, { width, height });

record_view!(IconGeometry, codec::ICON_GEOMETRY, { x, y, width, height });

record_view!(
    /// DesktopLayout describes how pagers arrange desktops
    DesktopLayout, codec::DESKTOP_LAYOUT, { orientation, columns, rows, starting_corner }
);

record_view!(Workarea, codec::WORKAREA, { x, y, width, height });

record_view!(Viewport, codec::VIEWPORT, { x, y });

record_view!(
    /// WmState is the ICCCM `WM_STATE` property the window manager keeps on client windows
    WmState, codec::WM_STATE, { state, icon }
);

record_view!(
    /// WmHints carries the ICCCM `WM_HINTS`, `flags` says which of the other fields are set
    WmHints, codec::WM_HINTS, {
        flags, input, initial_state, icon_pixmap, icon_window, icon_x, icon_y, icon_mask, window_group,
    }
);

record_view!(
    /// SizeHints carries the ICCCM `WM_NORMAL_HINTS`
    SizeHints, codec::WM_SIZE_HINTS, {
        flags, x, y, width, height, min_width, min_height, max_width, max_height, width_inc, height_inc,
        min_aspect_num, min_aspect_den, max_aspect_num, max_aspect_den, base_width, base_height, win_gravity,
    }
);

record_view!(
    /// MotifHints carries the `_MOTIF_WM_HINTS` decoration and function hints
    MotifHints, codec::MOTIF_HINTS, { flags, functions, decorations, input_mode, status }
);

impl WmState {
    pub fn kind(&self) -> IcccmState {
        IcccmState::from(self.state)
    }
}

impl WmHints {
    /// The window asks for input focus, defaults to true when the hint isn't set
    pub fn accepts_input(&self) -> bool {
        self.flags & hint::INPUT == 0 || self.input != 0
    }

    pub fn is_urgent(&self) -> bool {
        self.flags & hint::URGENCY != 0
    }

    /// Initial state if the client set one
    pub fn initial_state(&self) -> Option<IcccmState> {
        if self.flags & hint::STATE != 0 {
            Some(IcccmState::from(self.initial_state))
        } else {
            None
        }
    }

    pub fn group(&self) -> Option<Window> {
        if self.flags & hint::WINDOW_GROUP != 0 {
            Some(self.window_group)
        } else {
            None
        }
    }
}

impl SizeHints {
    /// Minimum size if the client set one
    pub fn min_size(&self) -> Option<(u32, u32)> {
        if self.flags & size_hint::P_MIN_SIZE != 0 {
            Some((self.min_width, self.min_height))
        } else {
            None
        }
    }

    /// Maximum size if the client set one
    pub fn max_size(&self) -> Option<(u32, u32)> {
        if self.flags & size_hint::P_MAX_SIZE != 0 {
            Some((self.max_width, self.max_height))
        } else {
            None
        }
    }

    pub fn gravity(&self) -> WinGravity {
        if self.flags & size_hint::P_WIN_GRAVITY != 0 {
            WinGravity::try_from(self.win_gravity).unwrap_or(WinGravity::NorthWest)
        } else {
            WinGravity::NorthWest
        }
    }
}

impl MotifHints {
    /// Hints asking for the window to be decorated or not
    pub fn with_decorations(decorated: bool) -> Self {
        Self {
            flags: motif::HINT_DECORATIONS,
            decorations: if decorated { motif::DECORATION_ALL } else { 0 },
            ..Default::default()
        }
    }

    /// None when the client leaves decorations up to the window manager
    pub fn decorated(&self) -> Option<bool> {
        if self.flags & motif::HINT_DECORATIONS != 0 {
            Some(self.decorations != 0)
        } else {
            None
        }
    }
}

/// Geometry is a window's position and size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

// Implement format! support
impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// WmClass is the instance and class pair from `WM_CLASS`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WmClass {
    pub instance: String,
    pub class: String,
}

impl TryFrom<Value> for WmClass {
    type Error = ErrorWrapper;
    fn try_from(val: Value) -> WindowManagerResult<WmClass> {
        let mut parts = Vec::<String>::try_from(val)?.into_iter();
        Ok(WmClass {
            instance: parts.next().unwrap_or_default(),
            class: parts.next().unwrap_or_default(),
        })
    }
}

impl From<&WmClass> for Value {
    fn from(val: &WmClass) -> Self {
        Value::Texts(vec![val.instance.clone(), val.class.clone()])
    }
}

/// WmProtocols lists the protocol atoms a client takes part in
pub type WmProtocols = Vec<Atom>;
