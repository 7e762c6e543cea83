use std::collections::HashMap;
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::time::Duration;

use crate::capture::ThumbnailSize;

/// Tunables for the capture pipeline and the selection overlay
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Minimum gap between the end of one capture and the start of the next
    pub min_capture_interval: Duration,
    /// How long an enumerated source list stays valid
    pub source_cache_ttl: Duration,
    /// A selection must exceed this many logical pixels in both dimensions
    pub min_selection_size: f64,
    /// Thumbnail size used by `sources` when the caller asks for none
    pub default_thumbnail_size: ThumbnailSize,
    pub default_jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_capture_interval: Duration::from_millis(200),
            source_cache_ttl: Duration::from_millis(500),
            min_selection_size: 5.0,
            default_thumbnail_size: ThumbnailSize::new(150, 150),
            default_jpeg_quality: 90,
        }
    }
}

impl CaptureConfig {
    pub fn with_min_capture_interval(mut self, interval: Duration) -> Self {
        self.min_capture_interval = interval;
        self
    }

    pub fn with_source_cache_ttl(mut self, ttl: Duration) -> Self {
        self.source_cache_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Cancel,
    Confirm,
    Copy,
    Save,
    Undo,
    Redo,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Cancel,
        Action::Confirm,
        Action::Copy,
        Action::Save,
        Action::Undo,
        Action::Redo,
    ];

    pub fn label(&self) -> &str {
        match self {
            Action::Cancel => "Cancel / Exit",
            Action::Confirm => "Confirm Selection",
            Action::Copy => "Copy to Clipboard",
            Action::Save => "Save to File",
            Action::Undo => "Undo",
            Action::Redo => "Redo",
        }
    }
}

/// Toolkit-neutral key identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Return,
    KpEnter,
    /// A printable key, always lowercase
    Char(char),
}

impl Key {
    pub fn char(c: char) -> Self {
        Key::Char(c.to_ascii_lowercase())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Escape => write!(f, "Escape"),
            Key::Return => write!(f, "Return"),
            Key::KpEnter => write!(f, "KP_Enter"),
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CONTROL: Modifiers = Modifiers(1);
    pub const SHIFT: Modifiers = Modifiers(1 << 1);
    pub const ALT: Modifiers = Modifiers(1 << 2);
    pub const SUPER: Modifiers = Modifiers(1 << 3);
    pub const CAPS_LOCK: Modifiers = Modifiers(1 << 4);
    pub const NUM_LOCK: Modifiers = Modifiers(1 << 5);

    pub fn contains(&self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;
    fn bitor(self, rhs: Self) -> Self {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitAnd for Modifiers {
    type Output = Modifiers;
    fn bitand(self, rhs: Self) -> Self {
        Modifiers(self.0 & rhs.0)
    }
}

/// A key together with the modifiers held while pressing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SUPER, "Super"),
        ];
        for (modifier, name) in names {
            if self.modifiers.contains(modifier) {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key)
    }
}

#[derive(Debug, Clone)]
pub struct ShortcutConfig {
    bindings: HashMap<Action, KeyChord>,
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        let mut bindings = HashMap::new();

        bindings.insert(Action::Cancel, KeyChord::plain(Key::Escape));
        bindings.insert(Action::Confirm, KeyChord::plain(Key::Return));
        bindings.insert(Action::Copy, KeyChord::new(Key::char('c'), Modifiers::CONTROL));
        bindings.insert(Action::Save, KeyChord::new(Key::char('s'), Modifiers::CONTROL));
        bindings.insert(Action::Undo, KeyChord::new(Key::char('z'), Modifiers::CONTROL));
        bindings.insert(
            Action::Redo,
            KeyChord::new(Key::char('z'), Modifiers::CONTROL | Modifiers::SHIFT),
        );

        Self { bindings }
    }
}

impl ShortcutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_action(&self, chord: KeyChord) -> Option<Action> {
        // lock keys never change the meaning of a chord
        let mask = Modifiers::CONTROL | Modifiers::SHIFT | Modifiers::ALT | Modifiers::SUPER;
        let clean = KeyChord::new(chord.key, chord.modifiers & mask);

        for (action, binding) in &self.bindings {
            if *binding == clean {
                return Some(*action);
            }

            // Keypad Enter as alias for Return
            if *action == Action::Confirm
                && clean.key == Key::KpEnter
                && binding.key == Key::Return
                && binding.modifiers == clean.modifiers
            {
                return Some(*action);
            }
        }

        // Ctrl+Y as the conventional alternate redo
        if clean == KeyChord::new(Key::char('y'), Modifiers::CONTROL) {
            return Some(Action::Redo);
        }

        None
    }

    pub fn get_shortcut_label(&self, action: Action) -> String {
        self.bindings
            .get(&action)
            .map(|chord| chord.to_string())
            .unwrap_or_default()
    }

    pub fn set_shortcut(&mut self, action: Action, chord: KeyChord) {
        self.bindings.insert(action, chord);
    }
}
