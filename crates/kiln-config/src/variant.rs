//! Component variant selection
//!
//! Each axis has an ordered list of mutually exclusive flags. The first flag
//! set to `true` in priority order wins; with none set the axis falls back to
//! its default variant.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A variant axis with a fixed flag priority
pub trait VariantAxis: Copy + Sized + 'static {
    /// Flags in priority order, highest first
    const PRIORITY: &'static [(&'static str, Self)];

    /// Variant used when no flag is set
    const DEFAULT: Self;

    /// Resolve the axis from a flag map
    fn select(flags: &BTreeMap<String, bool>) -> Self {
        Self::PRIORITY
            .iter()
            .find(|(flag, _)| flags.get(*flag).copied().unwrap_or(false))
            .map(|(_, variant)| *variant)
            .unwrap_or(Self::DEFAULT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Default,
    Small,
    Large,
}

impl VariantAxis for Size {
    const PRIORITY: &'static [(&'static str, Self)] = &[("large", Size::Large), ("small", Size::Small)];
    const DEFAULT: Self = Size::Default;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Default,
    Solid,
    Outline,
    Clear,
}

impl VariantAxis for Style {
    const PRIORITY: &'static [(&'static str, Self)] = &[
        ("solid", Style::Solid),
        ("outline", Style::Outline),
        ("clear", Style::Clear),
    ];
    const DEFAULT: Self = Style::Default;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Default,
    Round,
}

impl VariantAxis for Shape {
    const PRIORITY: &'static [(&'static str, Self)] = &[("round", Shape::Round)];
    const DEFAULT: Self = Shape::Default;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    Default,
    Block,
    Full,
}

impl VariantAxis for Display {
    const PRIORITY: &'static [(&'static str, Self)] =
        &[("block", Display::Block), ("full", Display::Full)];
    const DEFAULT: Self = Display::Default;
}

macro_rules! impl_display {
    ($ty:ty { $($variant:ident => $name:literal),* $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $name),)*
                }
            }
        }
    };
}

impl_display!(Size { Default => "default", Small => "small", Large => "large" });
impl_display!(Style { Default => "default", Solid => "solid", Outline => "outline", Clear => "clear" });
impl_display!(Shape { Default => "default", Round => "round" });
impl_display!(Display { Default => "default", Block => "block", Full => "full" });

/// Selected variant on every axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentVariants {
    pub size: Size,
    pub style: Style,
    pub shape: Shape,
    pub display: Display,
}

impl ComponentVariants {
    /// Resolve all axes from a flag map
    pub fn from_flags(flags: &BTreeMap<String, bool>) -> Self {
        Self {
            size: Size::select(flags),
            style: Style::select(flags),
            shape: Shape::select(flags),
            display: Display::select(flags),
        }
    }
}

impl Default for ComponentVariants {
    fn default() -> Self {
        Self {
            size: Size::DEFAULT,
            style: Style::DEFAULT,
            shape: Shape::DEFAULT,
            display: Display::DEFAULT,
        }
    }
}

impl fmt::Display for ComponentVariants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={} style={} shape={} display={}",
            self.size, self.style, self.shape, self.display
        )
    }
}
