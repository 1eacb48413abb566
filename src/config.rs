//! Configuration module for customizable shortcuts and settings.
//! Loaded from an INI file seeded from the embedded `config.ini` template.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

const DEFAULT_CONFIG_INI: &str = include_str!("../config.ini");

/// Image resampling filter types for scaling operations.
/// Listed from fastest (lowest quality) to slowest (highest quality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    /// Nearest neighbor - fastest, pixelated look (good for pixel art)
    Nearest,
    /// Triangle (bilinear) - fast, smooth but can be blurry
    Triangle,
    /// Catmull-Rom - good balance of speed and quality
    CatmullRom,
    /// Gaussian - smooth results, slightly soft
    Gaussian,
    /// Lanczos3 - highest quality, sharpest results, slowest
    Lanczos3,
}

impl ImageFilter {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "point" | "nn" => Some(Self::Nearest),
            "triangle" | "bilinear" | "linear" => Some(Self::Triangle),
            "catmullrom" | "catmull-rom" | "catmull_rom" | "cubic" => Some(Self::CatmullRom),
            "gaussian" | "gauss" => Some(Self::Gaussian),
            "lanczos" | "lanczos3" | "sinc" => Some(Self::Lanczos3),
            _ => None,
        }
    }

    /// Convert to image crate's FilterType
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Where a jump lands in the file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpTarget {
    Start,
    Middle,
    End,
}

/// All configurable actions in the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Next(usize),
    Previous(usize),
    Jump(JumpTarget),
    NextDirectory,
    PreviousDirectory,
    ShowPanels,
    HidePanels,
    Rotate,
    TogglePrint,
    Exit,
}

impl Action {
    pub fn from_str(s: &str) -> Option<Action> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "next" => return Some(Action::Next(1)),
            "previous" | "prev" => return Some(Action::Previous(1)),
            "jump_start" | "start" => return Some(Action::Jump(JumpTarget::Start)),
            "jump_middle" | "middle" => return Some(Action::Jump(JumpTarget::Middle)),
            "jump_end" | "end" => return Some(Action::Jump(JumpTarget::End)),
            "next_directory" | "next_dir" => return Some(Action::NextDirectory),
            "previous_directory" | "prev_dir" => return Some(Action::PreviousDirectory),
            "show_panels" | "show" => return Some(Action::ShowPanels),
            "hide_panels" | "hide" => return Some(Action::HidePanels),
            "rotate" => return Some(Action::Rotate),
            "toggle_print" | "print" => return Some(Action::TogglePrint),
            "exit" | "quit" => return Some(Action::Exit),
            _ => {}
        }

        // Stepped navigation: next_10, previous_100, ...
        if let Some(step) = s.strip_prefix("next_") {
            return step.parse().ok().filter(|&n| n > 0).map(Action::Next);
        }
        if let Some(step) = s.strip_prefix("previous_") {
            return step.parse().ok().filter(|&n| n > 0).map(Action::Previous);
        }
        None
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Next(1) => write!(f, "next"),
            Action::Next(n) => write!(f, "next_{n}"),
            Action::Previous(1) => write!(f, "previous"),
            Action::Previous(n) => write!(f, "previous_{n}"),
            Action::Jump(JumpTarget::Start) => write!(f, "jump_start"),
            Action::Jump(JumpTarget::Middle) => write!(f, "jump_middle"),
            Action::Jump(JumpTarget::End) => write!(f, "jump_end"),
            Action::NextDirectory => write!(f, "next_directory"),
            Action::PreviousDirectory => write!(f, "previous_directory"),
            Action::ShowPanels => write!(f, "show_panels"),
            Action::HidePanels => write!(f, "hide_panels"),
            Action::Rotate => write!(f, "rotate"),
            Action::TogglePrint => write!(f, "toggle_print"),
            Action::Exit => write!(f, "exit"),
        }
    }
}

/// A keyboard shortcut, optionally with a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputBinding {
    Key(egui::Key),
    KeyWithCtrl(egui::Key),
    KeyWithShift(egui::Key),
    KeyWithAlt(egui::Key),
}

impl InputBinding {
    /// Key plus required (ctrl, shift, alt) state.
    pub fn parts(self) -> (egui::Key, bool, bool, bool) {
        match self {
            InputBinding::Key(k) => (k, false, false, false),
            InputBinding::KeyWithCtrl(k) => (k, true, false, false),
            InputBinding::KeyWithShift(k) => (k, false, true, false),
            InputBinding::KeyWithAlt(k) => (k, false, false, true),
        }
    }
}

/// Parse an input binding from string
pub fn parse_input_binding(s: &str) -> Option<InputBinding> {
    let s = s.trim().to_lowercase();

    if let Some(key_str) = s.strip_prefix("ctrl+") {
        return parse_key(key_str).map(InputBinding::KeyWithCtrl);
    }
    if let Some(key_str) = s.strip_prefix("shift+") {
        return parse_key(key_str).map(InputBinding::KeyWithShift);
    }
    if let Some(key_str) = s.strip_prefix("alt+") {
        return parse_key(key_str).map(InputBinding::KeyWithAlt);
    }

    parse_key(&s).map(InputBinding::Key)
}

/// Parse a single key from string
fn parse_key(s: &str) -> Option<egui::Key> {
    match s.to_lowercase().as_str() {
        // Letters
        "a" => Some(egui::Key::A),
        "b" => Some(egui::Key::B),
        "c" => Some(egui::Key::C),
        "d" => Some(egui::Key::D),
        "e" => Some(egui::Key::E),
        "f" => Some(egui::Key::F),
        "g" => Some(egui::Key::G),
        "h" => Some(egui::Key::H),
        "i" => Some(egui::Key::I),
        "j" => Some(egui::Key::J),
        "k" => Some(egui::Key::K),
        "l" => Some(egui::Key::L),
        "m" => Some(egui::Key::M),
        "n" => Some(egui::Key::N),
        "o" => Some(egui::Key::O),
        "p" => Some(egui::Key::P),
        "q" => Some(egui::Key::Q),
        "r" => Some(egui::Key::R),
        "s" => Some(egui::Key::S),
        "t" => Some(egui::Key::T),
        "u" => Some(egui::Key::U),
        "v" => Some(egui::Key::V),
        "w" => Some(egui::Key::W),
        "x" => Some(egui::Key::X),
        "y" => Some(egui::Key::Y),
        "z" => Some(egui::Key::Z),
        // Numbers
        "0" | "num0" => Some(egui::Key::Num0),
        "1" | "num1" => Some(egui::Key::Num1),
        "2" | "num2" => Some(egui::Key::Num2),
        "3" | "num3" => Some(egui::Key::Num3),
        "4" | "num4" => Some(egui::Key::Num4),
        "5" | "num5" => Some(egui::Key::Num5),
        "6" | "num6" => Some(egui::Key::Num6),
        "7" | "num7" => Some(egui::Key::Num7),
        "8" | "num8" => Some(egui::Key::Num8),
        "9" | "num9" => Some(egui::Key::Num9),
        // Function keys
        "f1" => Some(egui::Key::F1),
        "f2" => Some(egui::Key::F2),
        "f3" => Some(egui::Key::F3),
        "f4" => Some(egui::Key::F4),
        "f5" => Some(egui::Key::F5),
        "f6" => Some(egui::Key::F6),
        "f7" => Some(egui::Key::F7),
        "f8" => Some(egui::Key::F8),
        "f9" => Some(egui::Key::F9),
        "f10" => Some(egui::Key::F10),
        "f11" => Some(egui::Key::F11),
        "f12" => Some(egui::Key::F12),
        // Arrow keys
        "left" | "arrow_left" | "arrowleft" => Some(egui::Key::ArrowLeft),
        "right" | "arrow_right" | "arrowright" => Some(egui::Key::ArrowRight),
        "up" | "arrow_up" | "arrowup" => Some(egui::Key::ArrowUp),
        "down" | "arrow_down" | "arrowdown" => Some(egui::Key::ArrowDown),
        // Special keys
        "escape" | "esc" => Some(egui::Key::Escape),
        "enter" | "return" => Some(egui::Key::Enter),
        "space" | "spacebar" => Some(egui::Key::Space),
        "tab" => Some(egui::Key::Tab),
        "backspace" => Some(egui::Key::Backspace),
        "delete" | "del" => Some(egui::Key::Delete),
        "insert" | "ins" => Some(egui::Key::Insert),
        "home" => Some(egui::Key::Home),
        "end" => Some(egui::Key::End),
        "pageup" | "page_up" | "prior" => Some(egui::Key::PageUp),
        "pagedown" | "page_down" | "next_page" => Some(egui::Key::PageDown),
        _ => None,
    }
}

/// Application configuration loaded from INI file
pub struct Config {
    /// Map from input binding to action
    pub bindings: HashMap<InputBinding, Action>,
    /// Filter for resizing static images
    pub resize_filter: ImageFilter,
    /// Filter for resizing animation frames (affects playback start latency)
    pub gif_resize_filter: ImageFilter,
    /// Capacity of the keep-memory cache, in prepared images
    pub cache_capacity: usize,
    /// Panel background color as RGB (0-255)
    pub background_rgb: [u8; 3],
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Config {
            bindings: HashMap::new(),
            resize_filter: ImageFilter::Lanczos3,
            gif_resize_filter: ImageFilter::Triangle,
            cache_capacity: 256,
            background_rgb: [128, 128, 128],
        };
        config.set_defaults();
        config
    }
}

impl Config {
    /// Set default keybindings
    fn set_defaults(&mut self) {
        use egui::Key;

        // Single-step navigation
        self.add_binding(InputBinding::Key(Key::ArrowRight), Action::Next(1));
        self.add_binding(InputBinding::Key(Key::ArrowLeft), Action::Previous(1));

        // Stepped navigation on the number row
        self.add_binding(InputBinding::Key(Key::Num3), Action::Next(10));
        self.add_binding(InputBinding::Key(Key::Num6), Action::Next(100));
        self.add_binding(InputBinding::Key(Key::Num9), Action::Next(1000));
        self.add_binding(InputBinding::Key(Key::Num1), Action::Previous(10));
        self.add_binding(InputBinding::Key(Key::Num4), Action::Previous(100));
        self.add_binding(InputBinding::Key(Key::Num7), Action::Previous(1000));

        // Jumps
        self.add_binding(InputBinding::Key(Key::Num2), Action::Jump(JumpTarget::Start));
        self.add_binding(InputBinding::Key(Key::Num5), Action::Jump(JumpTarget::Middle));
        self.add_binding(InputBinding::Key(Key::Num8), Action::Jump(JumpTarget::End));

        // Directory jumps
        self.add_binding(InputBinding::Key(Key::PageDown), Action::NextDirectory);
        self.add_binding(InputBinding::Key(Key::PageUp), Action::PreviousDirectory);

        // Panel visibility
        self.add_binding(InputBinding::Key(Key::ArrowUp), Action::ShowPanels);
        self.add_binding(InputBinding::Key(Key::ArrowDown), Action::HidePanels);

        // Misc
        self.add_binding(InputBinding::Key(Key::R), Action::Rotate);
        self.add_binding(InputBinding::Key(Key::F12), Action::TogglePrint);
        self.add_binding(InputBinding::Key(Key::Escape), Action::Exit);
    }

    fn add_binding(&mut self, input: InputBinding, action: Action) {
        self.bindings.insert(input, action);
    }

    /// Configuration directory, created on demand.
    /// `%APPDATA%\mural` on Windows, `~/.config/mural` elsewhere.
    fn config_dir() -> PathBuf {
        let base_dir = if cfg!(target_os = "windows") {
            std::env::var("APPDATA")
                .ok()
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    std::env::current_exe()
                        .ok()
                        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                        .unwrap_or_else(|| PathBuf::from("."))
                })
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
                .unwrap_or_else(|| PathBuf::from("."))
        };

        let config_dir = base_dir.join("mural");
        let _ = fs::create_dir_all(&config_dir);
        config_dir
    }

    /// Settings file path (`config.ini` inside the config directory).
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.ini")
    }

    /// Load configuration from the INI file, writing the embedded template
    /// on first run. Any read or parse problem falls back to defaults.
    pub fn load() -> Self {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Err(e) = fs::write(&config_path, DEFAULT_CONFIG_INI) {
                warn!("could not write config template to {}: {e}", config_path.display());
                return Config::default();
            }
            info!("created config at {}", config_path.display());
        }

        match fs::read_to_string(&config_path) {
            Ok(content) => Self::parse_ini(&content),
            Err(e) => {
                warn!("could not read {}: {e}", config_path.display());
                Config::default()
            }
        }
    }

    /// Parse INI content into Config
    pub fn parse_ini(content: &str) -> Self {
        let mut config = Config {
            bindings: HashMap::new(),
            resize_filter: ImageFilter::Lanczos3,
            gif_resize_filter: ImageFilter::Triangle,
            cache_capacity: 256,
            background_rgb: [128, 128, 128],
        };

        #[derive(PartialEq)]
        enum Section {
            Settings,
            Shortcuts,
            Other,
        }
        let mut section = Section::Other;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                section = match line[1..line.len() - 1].to_lowercase().as_str() {
                    "settings" => Section::Settings,
                    "shortcuts" => Section::Shortcuts,
                    _ => Section::Other,
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match section {
                Section::Settings => config.apply_setting(key, value),
                Section::Shortcuts => {
                    match (parse_input_binding(key), Action::from_str(value)) {
                        (Some(binding), Some(action)) => config.add_binding(binding, action),
                        _ => warn!("ignoring shortcut line: {line}"),
                    }
                }
                Section::Other => {}
            }
        }

        // An INI without shortcuts still gets the stock bindings.
        if config.bindings.is_empty() {
            config.set_defaults();
        }

        config
    }

    fn apply_setting(&mut self, key: &str, value: &str) {
        match key.to_lowercase().as_str() {
            "resize_filter" => {
                if let Some(filter) = ImageFilter::from_str(value) {
                    self.resize_filter = filter;
                } else {
                    warn!("unknown resize_filter: {value}");
                }
            }
            "gif_resize_filter" => {
                if let Some(filter) = ImageFilter::from_str(value) {
                    self.gif_resize_filter = filter;
                } else {
                    warn!("unknown gif_resize_filter: {value}");
                }
            }
            "cache_capacity" => {
                if let Ok(n) = value.parse::<usize>() {
                    self.cache_capacity = n.max(1);
                } else {
                    warn!("invalid cache_capacity: {value}");
                }
            }
            "background_rgb" => {
                let parts: Vec<_> = value.split(',').map(|p| p.trim().parse::<u8>()).collect();
                match parts.as_slice() {
                    [Ok(r), Ok(g), Ok(b)] => self.background_rgb = [*r, *g, *b],
                    _ => warn!("invalid background_rgb: {value}"),
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_strings_round_trip() {
        for s in [
            "next",
            "previous",
            "next_10",
            "previous_1000",
            "jump_start",
            "jump_middle",
            "jump_end",
            "next_directory",
            "previous_directory",
            "show_panels",
            "hide_panels",
            "rotate",
            "toggle_print",
            "exit",
        ] {
            let action = Action::from_str(s).unwrap();
            assert_eq!(action.to_string(), s, "round trip of {s}");
        }
    }

    #[test]
    fn action_rejects_garbage() {
        assert_eq!(Action::from_str("next_0"), None);
        assert_eq!(Action::from_str("next_x"), None);
        assert_eq!(Action::from_str("teleport"), None);
    }

    #[test]
    fn binding_parsing() {
        assert_eq!(
            parse_input_binding("right"),
            Some(InputBinding::Key(egui::Key::ArrowRight))
        );
        assert_eq!(
            parse_input_binding("ctrl+w"),
            Some(InputBinding::KeyWithCtrl(egui::Key::W))
        );
        assert_eq!(
            parse_input_binding("shift+pageup"),
            Some(InputBinding::KeyWithShift(egui::Key::PageUp))
        );
        assert_eq!(parse_input_binding("hyper+x"), None);
    }

    #[test]
    fn embedded_template_parses_to_original_bindings() {
        let config = Config::parse_ini(DEFAULT_CONFIG_INI);
        assert_eq!(
            config.bindings.get(&InputBinding::Key(egui::Key::ArrowRight)),
            Some(&Action::Next(1))
        );
        assert_eq!(
            config.bindings.get(&InputBinding::Key(egui::Key::Num9)),
            Some(&Action::Next(1000))
        );
        assert_eq!(
            config.bindings.get(&InputBinding::Key(egui::Key::Num5)),
            Some(&Action::Jump(JumpTarget::Middle))
        );
        assert_eq!(
            config.bindings.get(&InputBinding::Key(egui::Key::PageUp)),
            Some(&Action::PreviousDirectory)
        );
        assert_eq!(
            config.bindings.get(&InputBinding::Key(egui::Key::Escape)),
            Some(&Action::Exit)
        );
    }

    #[test]
    fn settings_section_overrides() {
        let ini = "[settings]\nresize_filter = nearest\ncache_capacity = 8\nbackground_rgb = 1, 2, 3\n";
        let config = Config::parse_ini(ini);
        assert_eq!(config.resize_filter, ImageFilter::Nearest);
        assert_eq!(config.cache_capacity, 8);
        assert_eq!(config.background_rgb, [1, 2, 3]);
        // No [shortcuts] section: stock bindings apply.
        assert!(!config.bindings.is_empty());
    }

    #[test]
    fn bad_settings_keep_defaults() {
        let ini = "[settings]\nresize_filter = blurry\ncache_capacity = lots\nbackground_rgb = red\n";
        let config = Config::parse_ini(ini);
        assert_eq!(config.resize_filter, ImageFilter::Lanczos3);
        assert_eq!(config.cache_capacity, 256);
        assert_eq!(config.background_rgb, [128, 128, 128]);
    }
}
