//! Legacy colour-code handling for plot messages.
//!
//! Message templates are written with `&` codes (`&aPlot claimed!`). Hosts
//! expect the section sign form, consoles want ANSI escapes and chat clients
//! want JSON components; this crate converts between all of them.

use once_cell::sync::Lazy;
use owo_colors::{AnsiColors, OwoColorize, Style};
use regex::Regex;
use serde::Serialize;

/// The section sign used by the client for formatting codes.
pub const SECTION_SIGN: char = '§';

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new("([a-zA-Z0-9§\\-:/]+\\.[a-zA-Z/0-9§\\-:_#]+(\\.[a-zA-Z/0-9.§\\-:#\\?\\+=_]+)?)")
        .unwrap()
});

fn is_valid_hex(ch: char) -> bool {
    ch.is_ascii_hexdigit()
}

fn is_code_prefix(ch: char) -> bool {
    ch == '&' || ch == SECTION_SIGN
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColorCode {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
    Obfuscated,
    Bold,
    Strikethrough,
    Underline,
    Italic,
    Reset,
}

impl ColorCode {
    pub fn parse(code: char) -> Option<ColorCode> {
        Some(match code.to_ascii_lowercase() {
            '0' => ColorCode::Black,
            '1' => ColorCode::DarkBlue,
            '2' => ColorCode::DarkGreen,
            '3' => ColorCode::DarkAqua,
            '4' => ColorCode::DarkRed,
            '5' => ColorCode::DarkPurple,
            '6' => ColorCode::Gold,
            '7' => ColorCode::Gray,
            '8' => ColorCode::DarkGray,
            '9' => ColorCode::Blue,
            'a' => ColorCode::Green,
            'b' => ColorCode::Aqua,
            'c' => ColorCode::Red,
            'd' => ColorCode::LightPurple,
            'e' => ColorCode::Yellow,
            'f' => ColorCode::White,
            'k' => ColorCode::Obfuscated,
            'l' => ColorCode::Bold,
            'm' => ColorCode::Strikethrough,
            'n' => ColorCode::Underline,
            'o' => ColorCode::Italic,
            'r' => ColorCode::Reset,
            _ => return None,
        })
    }

    fn is_formatting(self) -> bool {
        use ColorCode::*;
        matches!(
            self,
            Obfuscated | Bold | Strikethrough | Underline | Italic | Reset
        )
    }

    fn ansi(self) -> Option<AnsiColors> {
        use ColorCode::*;
        Some(match self {
            Black => AnsiColors::Black,
            DarkBlue => AnsiColors::Blue,
            DarkGreen => AnsiColors::Green,
            DarkAqua => AnsiColors::Cyan,
            DarkRed => AnsiColors::Red,
            DarkPurple => AnsiColors::Magenta,
            Gold => AnsiColors::Yellow,
            Gray => AnsiColors::White,
            DarkGray => AnsiColors::BrightBlack,
            Blue => AnsiColors::BrightBlue,
            Green => AnsiColors::BrightGreen,
            Aqua => AnsiColors::BrightCyan,
            Red => AnsiColors::BrightRed,
            LightPurple => AnsiColors::BrightMagenta,
            Yellow => AnsiColors::BrightYellow,
            White => AnsiColors::BrightWhite,
            _ => return None,
        })
    }
}

/// Replaces `&` formatting codes with the section sign form the client
/// understands. An `&` that isn't followed by a valid code is left alone.
pub fn colorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&' {
            if let Some(&code) = chars.peek() {
                if ColorCode::parse(code).is_some() {
                    out.push(SECTION_SIGN);
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Removes every `&`/`§` formatting code, leaving the plain text.
pub fn strip_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if is_code_prefix(c) {
            if let Some(&code) = chars.peek() {
                if ColorCode::parse(code).is_some() {
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TextColor {
    Hex(String),
    ColorCode(ColorCode),
}

impl TextColor {
    fn rgb(&self) -> Option<(u8, u8, u8)> {
        let TextColor::Hex(hex) = self else {
            return None;
        };
        let hex = hex.strip_prefix('#')?;
        let value = u32::from_str_radix(hex, 16).ok()?;
        Some(((value >> 16) as u8, (value >> 8) as u8, value as u8))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum ClickEventType {
    OpenUrl,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    action: ClickEventType,
    value: String,
}

/// This is only used for `TextComponent` serialize
#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(field: &bool) -> bool {
    !*field
}

#[derive(Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct TextComponent {
    pub text: String,
    #[serde(skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub underlined: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub obfuscated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<TextColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "clickEvent")]
    pub click_event: Option<ClickEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<TextComponent>,
}

impl TextComponent {
    /// Splits legacy formatted text (`&` or `§` codes, `#rrggbb` colours) into
    /// components. Urls become clickable.
    pub fn from_legacy_text(message: &str) -> Vec<TextComponent> {
        let mut components = Vec::new();

        let mut cur_component: TextComponent = Default::default();

        let mut chars = message.chars();
        'main_loop: while let Some(c) = chars.next() {
            if is_code_prefix(c) {
                if let Some(code) = chars.next() {
                    if let Some(color) = ColorCode::parse(code) {
                        let make_new = !cur_component.text.is_empty();
                        if color.is_formatting() && make_new {
                            components.push(cur_component.clone());
                            cur_component.text.clear();
                        }
                        match color {
                            ColorCode::Bold => cur_component.bold = true,
                            ColorCode::Italic => cur_component.italic = true,
                            ColorCode::Underline => cur_component.underlined = true,
                            ColorCode::Strikethrough => cur_component.strikethrough = true,
                            ColorCode::Obfuscated => cur_component.obfuscated = true,
                            ColorCode::Reset => {
                                components.push(cur_component);
                                cur_component = Default::default();
                            }
                            _ => {
                                components.push(cur_component);
                                cur_component = Default::default();
                                cur_component.color = Some(TextColor::ColorCode(color));
                            }
                        }
                        continue;
                    }
                    cur_component.text.push(c);
                    cur_component.text.push(code);
                    continue;
                }
            }
            if c == '#' {
                let mut hex = String::from(c);
                for _ in 0..6 {
                    if let Some(c) = chars.next() {
                        hex.push(c);
                        if !is_valid_hex(c) {
                            cur_component.text += &hex;
                            continue 'main_loop;
                        }
                    } else {
                        cur_component.text += &hex;
                        continue 'main_loop;
                    }
                }
                components.push(cur_component);
                cur_component = Default::default();
                cur_component.color = Some(TextColor::Hex(hex));
                continue;
            }
            cur_component.text.push(c);
        }
        components.push(cur_component);

        let mut linked = Vec::with_capacity(components.len());
        for component in components.into_iter().filter(|c| !c.text.is_empty()) {
            let mut last = 0;
            let text = &component.text;

            for found in URL_REGEX.find_iter(text) {
                let index = found.start();
                let matched = found.as_str();
                if last != index {
                    let mut new = component.clone();
                    new.text = String::from(&text[last..index]);
                    linked.push(new);
                }
                let mut new = component.clone();
                new.text = matched.to_string();
                new.click_event = Some(ClickEvent {
                    action: ClickEventType::OpenUrl,
                    value: matched.to_string(),
                });
                linked.push(new);
                last = index + matched.len();
            }
            if last < text.len() {
                let mut new = component.clone();
                new.text = String::from(&text[last..]);
                linked.push(new);
            }
        }

        linked
    }

    pub fn encode_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }

    pub fn is_text_only(&self) -> bool {
        !self.bold
            && !self.italic
            && !self.underlined
            && !self.strikethrough
            && !self.obfuscated
            && self.color.is_none()
            && self.click_event.is_none()
    }

    /// Renders this component (and its children) with ANSI escapes.
    pub fn to_ansi(&self) -> String {
        let mut style = Style::new();
        match &self.color {
            Some(TextColor::ColorCode(code)) => {
                if let Some(color) = code.ansi() {
                    style = style.color(color);
                }
            }
            Some(hex @ TextColor::Hex(_)) => {
                if let Some((r, g, b)) = hex.rgb() {
                    style = style.truecolor(r, g, b);
                }
            }
            None => {}
        }
        if self.bold {
            style = style.bold();
        }
        if self.italic {
            style = style.italic();
        }
        if self.underlined {
            style = style.underline();
        }
        if self.strikethrough {
            style = style.strikethrough();
        }

        let mut out = if self.is_text_only() {
            self.text.clone()
        } else {
            format!("{}", self.text.style(style))
        };
        for child in &self.extra {
            out.push_str(&child.to_ansi());
        }
        out
    }
}

/// Renders legacy formatted text for a terminal.
pub fn legacy_to_ansi(message: &str) -> String {
    TextComponent::from_legacy_text(message)
        .iter()
        .map(TextComponent::to_ansi)
        .collect()
}

/// Encodes legacy formatted text as a single JSON chat component.
pub fn legacy_to_json(message: &str) -> String {
    TextComponent {
        extra: TextComponent::from_legacy_text(message),
        ..Default::default()
    }
    .encode_json()
}

impl<S> From<S> for TextComponent
where
    S: Into<String>,
{
    fn from(value: S) -> Self {
        TextComponent {
            text: value.into(),
            ..Default::default()
        }
    }
}
