//! Key-name mapping for the input actuator.

use enigo::Key;

/// Lower-case and strip separators so "Page Down", "page_down" and
/// "PAGEDOWN" all resolve to the same key.
fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Convert a key name to an enigo key. Single characters map to
/// `Key::Unicode`; unknown names yield `None`.
pub fn string_to_key(key_str: &str) -> Option<Key> {
    if key_str == " " {
        return Some(Key::Space);
    }
    let name = normalize(key_str);
    let key = match name.as_str() {
        // Modifiers
        "shift" | "lshift" => Key::Shift,
        "control" | "ctrl" | "lcontrol" => Key::Control,
        "alt" | "option" | "lalt" => Key::Alt,
        "meta" | "command" | "cmd" | "win" | "super" | "windows" => Key::Meta,

        // Function keys
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,

        // Navigation
        "up" | "uparrow" => Key::UpArrow,
        "down" | "downarrow" => Key::DownArrow,
        "left" | "leftarrow" => Key::LeftArrow,
        "right" | "rightarrow" => Key::RightArrow,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "pgup" => Key::PageUp,
        "pagedown" | "pgdn" => Key::PageDown,

        // Editing and control
        "return" | "enter" => Key::Return,
        "escape" | "esc" => Key::Escape,
        "tab" => Key::Tab,
        "backspace" | "back" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "space" | "spacebar" => Key::Space,
        "capslock" | "caps" => Key::CapsLock,

        _ => {
            let mut chars = key_str.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => return None,
            }
        }
    };
    Some(key)
}

/// Split a combination such as "ctrl+alt+t" into its key names.
pub fn split_combo(combo: &str) -> Vec<String> {
    combo
        .split('+')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
