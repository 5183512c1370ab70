//! Style Value Model
//!
//! Immutable parsed CSS values plus a live wrapper that re-parses on
//! mutation and notifies an optional listener, so the owning rule or sheet
//! can re-fire higher-level change events.

use std::fmt;

use crate::error::CssResult;

/// Length and angle-free dimension units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Px,
    Em,
    Ex,
    Pt,
    Pc,
    Cm,
    Mm,
    In,
}

impl Unit {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "px" => Some(Self::Px),
            "em" => Some(Self::Em),
            "ex" => Some(Self::Ex),
            "pt" => Some(Self::Pt),
            "pc" => Some(Self::Pc),
            "cm" => Some(Self::Cm),
            "mm" => Some(Self::Mm),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Px => "px",
            Self::Em => "em",
            Self::Ex => "ex",
            Self::Pt => "pt",
            Self::Pc => "pc",
            Self::Cm => "cm",
            Self::Mm => "mm",
            Self::In => "in",
        }
    }
}

/// A color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Rgba {
    pub fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 255,
        }
    }
}

/// Broad shape of a value, used where callers dispatch without matching
/// the payload itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Inherit,
    Primitive,
    List,
}

/// Primitive type tag of a non-list value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Ident,
    String,
    Uri,
    Number,
    Dimension,
    Percentage,
    Color,
}

/// An immutable parsed CSS value.
#[derive(Debug, Clone, PartialEq)]
pub enum CssValue {
    /// The `inherit` sentinel
    Inherit,
    Ident(String),
    String(String),
    Uri(String),
    Number(f32),
    Dimension(f32, Unit),
    /// Percentage in 0..=100 scale
    Percentage(f32),
    Color(Rgba),
    List(Vec<CssValue>),
}

impl CssValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Inherit => ValueKind::Inherit,
            Self::List(_) => ValueKind::List,
            _ => ValueKind::Primitive,
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Ident(_) => Some(PrimitiveKind::Ident),
            Self::String(_) => Some(PrimitiveKind::String),
            Self::Uri(_) => Some(PrimitiveKind::Uri),
            Self::Number(_) => Some(PrimitiveKind::Number),
            Self::Dimension(..) => Some(PrimitiveKind::Dimension),
            Self::Percentage(_) => Some(PrimitiveKind::Percentage),
            Self::Color(_) => Some(PrimitiveKind::Color),
            Self::Inherit | Self::List(_) => None,
        }
    }

    /// Numeric payload of number-like values.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Number(n) | Self::Dimension(n, _) | Self::Percentage(n) => Some(*n),
            _ => None,
        }
    }

    /// Ident payload, lowercased comparisons are the caller's business.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Ident(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical CSS text for this value.
    pub fn css_text(&self) -> String {
        self.to_string()
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f32) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e7 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for CssValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => write!(f, "inherit"),
            Self::Ident(s) => write!(f, "{s}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Uri(u) => write!(f, "url({u})"),
            Self::Number(n) => write_number(f, *n),
            Self::Dimension(n, unit) => {
                write_number(f, *n)?;
                write!(f, "{}", unit.as_str())
            }
            Self::Percentage(n) => {
                write_number(f, *n)?;
                write!(f, "%")
            }
            Self::Color(c) => {
                if c.alpha == 255 {
                    write!(f, "#{:02x}{:02x}{:02x}", c.red, c.green, c.blue)
                } else {
                    write!(
                        f,
                        "rgba({}, {}, {}, {})",
                        c.red,
                        c.green,
                        c.blue,
                        f32::from(c.alpha) / 255.0
                    )
                }
            }
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Re-parses text, floats, and strings into immutable values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueFactory;

impl ValueFactory {
    pub fn parse(&self, text: &str) -> CssResult<CssValue> {
        crate::parser::parse_value(text)
    }

    pub fn from_float(&self, value: f32, unit: Option<Unit>) -> CssValue {
        match unit {
            Some(unit) => CssValue::Dimension(value, unit),
            None => CssValue::Number(value),
        }
    }

    pub fn from_string(&self, value: &str) -> CssValue {
        CssValue::String(value.to_owned())
    }
}

type ChangeListener = Box<dyn FnMut(&CssValue, &CssValue)>;

/// A live value: immutable payload plus a re-parse factory and an optional
/// change listener notified with (old, new) on every mutation.
pub struct LiveValue {
    value: CssValue,
    factory: ValueFactory,
    listener: Option<ChangeListener>,
}

impl LiveValue {
    pub fn new(value: CssValue) -> Self {
        Self {
            value,
            factory: ValueFactory,
            listener: None,
        }
    }

    pub fn value(&self) -> &CssValue {
        &self.value
    }

    pub fn css_text(&self) -> String {
        self.value.css_text()
    }

    /// Attach the change listener, replacing any prior one.
    pub fn set_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&CssValue, &CssValue) + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn set_css_text(&mut self, text: &str) -> CssResult<()> {
        let parsed = self.factory.parse(text)?;
        self.replace(parsed);
        Ok(())
    }

    pub fn set_float(&mut self, value: f32, unit: Option<Unit>) {
        let new = self.factory.from_float(value, unit);
        self.replace(new);
    }

    pub fn set_string(&mut self, value: &str) {
        let new = self.factory.from_string(value);
        self.replace(new);
    }

    fn replace(&mut self, new: CssValue) {
        let old = std::mem::replace(&mut self.value, new);
        if let Some(listener) = &mut self.listener {
            listener(&old, &self.value);
        }
    }
}

impl std::fmt::Debug for LiveValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveValue")
            .field("value", &self.value)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_value_kinds() {
        assert_eq!(CssValue::Inherit.kind(), ValueKind::Inherit);
        assert_eq!(CssValue::Number(1.0).kind(), ValueKind::Primitive);
        assert_eq!(CssValue::List(vec![]).kind(), ValueKind::List);
        assert_eq!(
            CssValue::Dimension(2.0, Unit::Em).primitive_kind(),
            Some(PrimitiveKind::Dimension)
        );
    }

    #[test]
    fn test_display_round_forms() {
        assert_eq!(CssValue::Number(12.0).css_text(), "12");
        assert_eq!(CssValue::Number(1.5).css_text(), "1.5");
        assert_eq!(CssValue::Dimension(10.0, Unit::Px).css_text(), "10px");
        assert_eq!(CssValue::Percentage(50.0).css_text(), "50%");
        assert_eq!(
            CssValue::Color(Rgba::opaque(255, 0, 0)).css_text(),
            "#ff0000"
        );
        assert_eq!(CssValue::Inherit.css_text(), "inherit");
        let list = CssValue::List(vec![
            CssValue::Ident("serif".into()),
            CssValue::Ident("monospace".into()),
        ]);
        assert_eq!(list.css_text(), "serif monospace");
    }

    #[test]
    fn test_live_value_notifies_listener() {
        let mut live = LiveValue::new(CssValue::Number(1.0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        live.set_listener(move |old, new| {
            log.borrow_mut().push((old.clone(), new.clone()));
        });

        live.set_float(2.0, Some(Unit::Px));
        assert_eq!(live.value(), &CssValue::Dimension(2.0, Unit::Px));
        assert_eq!(
            seen.borrow().as_slice(),
            &[(CssValue::Number(1.0), CssValue::Dimension(2.0, Unit::Px))]
        );
    }

    #[test]
    fn test_live_value_reparse() {
        let mut live = LiveValue::new(CssValue::Number(0.0));
        live.set_css_text("1.5em").unwrap();
        assert_eq!(live.value(), &CssValue::Dimension(1.5, Unit::Em));
        assert!(live.set_css_text("}{").is_err());
        // Failed re-parse leaves the value untouched
        assert_eq!(live.value(), &CssValue::Dimension(1.5, Unit::Em));
    }
}
