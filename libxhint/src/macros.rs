// Accessor generators for registered properties and window manager client messages. Every
// property gets a checked getter that blocks on `reply` by convention, an unchecked getter whose
// errors go to the event stream and a checked/unchecked setter pair; every client message gets an
// unchecked `request_*` and a `request_*_checked`.

// Getters for a property stored on the root window
macro_rules! root_getter {
    ($(#[$meta:meta])* $name:literal => $get:ident, $unchecked:ident -> $ty:ty) => {
        $(#[$meta])*
        pub fn $get(&self) -> WindowManagerResult<Cookie<'_, T, $ty>> {
            self.property(self.root(), $name, Mode::Checked)
        }

        pub fn $unchecked(&self) -> WindowManagerResult<Cookie<'_, T, $ty>> {
            self.property(self.root(), $name, Mode::Unchecked)
        }
    };
}

// Getters for a property stored on a client window
macro_rules! window_getter {
    ($(#[$meta:meta])* $name:literal => $get:ident, $unchecked:ident -> $ty:ty) => {
        $(#[$meta])*
        pub fn $get(&self, window: Window) -> WindowManagerResult<Cookie<'_, T, $ty>> {
            self.property(window, $name, Mode::Checked)
        }

        pub fn $unchecked(&self, window: Window) -> WindowManagerResult<Cookie<'_, T, $ty>> {
            self.property(window, $name, Mode::Unchecked)
        }
    };
}

// Setters for a property stored on the root window, `$value` builds the stored value
macro_rules! root_setter {
    ($(#[$meta:meta])* $name:literal => $checked:ident, $unchecked:ident($arg:ident: $ty:ty) = $value:expr) => {
        $(#[$meta])*
        pub fn $checked(&self, $arg: $ty) -> WindowManagerResult<VoidCookie<'_, T>> {
            self.put_property(self.root(), $name, &$value, Mode::Checked)
        }

        pub fn $unchecked(&self, $arg: $ty) -> WindowManagerResult<VoidCookie<'_, T>> {
            self.put_property(self.root(), $name, &$value, Mode::Unchecked)
        }
    };
}

// Setters for a property stored on a client window
macro_rules! window_setter {
    ($(#[$meta:meta])* $name:literal => $checked:ident, $unchecked:ident($arg:ident: $ty:ty) = $value:expr) => {
        $(#[$meta])*
        pub fn $checked(&self, window: Window, $arg: $ty) -> WindowManagerResult<VoidCookie<'_, T>> {
            self.put_property(window, $name, &$value, Mode::Checked)
        }

        pub fn $unchecked(&self, window: Window, $arg: $ty) -> WindowManagerResult<VoidCookie<'_, T>> {
            self.put_property(window, $name, &$value, Mode::Unchecked)
        }
    };
}

// Client messages sent to the root window. Messages about the root itself use `root` as the
// subject, all others name the argument holding the subject window.
macro_rules! request {
    ($(#[$meta:meta])* $type_name:literal => $request:ident, $checked:ident($($arg:ident: $ty:ty),*)
        about root, [$($data:expr),* $(,)?]) => {
        $(#[$meta])*
        pub fn $request(&self, $($arg: $ty),*) -> WindowManagerResult<VoidCookie<'_, T>> {
            self.root_send_client_event(self.root(), $type_name, &[$($data),*], Mode::Unchecked)
        }

        pub fn $checked(&self, $($arg: $ty),*) -> WindowManagerResult<VoidCookie<'_, T>> {
            self.root_send_client_event(self.root(), $type_name, &[$($data),*], Mode::Checked)
        }
    };
    ($(#[$meta:meta])* $type_name:literal => $request:ident, $checked:ident($($arg:ident: $ty:ty),*)
        about $window:ident, [$($data:expr),* $(,)?]) => {
        $(#[$meta])*
        pub fn $request(&self, $($arg: $ty),*) -> WindowManagerResult<VoidCookie<'_, T>> {
            self.root_send_client_event($window, $type_name, &[$($data),*], Mode::Unchecked)
        }

        pub fn $checked(&self, $($arg: $ty),*) -> WindowManagerResult<VoidCookie<'_, T>> {
            self.root_send_client_event($window, $type_name, &[$($data),*], Mode::Checked)
        }
    };
}
