use std::ops::Range;

use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or validating a [`CityConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid city XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("<{field}> has an unparsable value {value:?}")]
    InvalidValue { field: &'static str, value: String },
    #[error("<{field}> must be positive")]
    NonPositive { field: &'static str },
    #[error("<{field}> range {min}..{max} is empty")]
    EmptyRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("<{field}> must lie within 0..=1, got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },
    #[error("palette must contain at least one color")]
    EmptyPalette,
    #[error("<{field}> must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f32 },
    #[error("<{field}> is {value}, above the limit of {max}")]
    TooLarge {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Largest accepted lattice side.
pub const MAX_GRID_SIZE: u32 = 1_000;
/// Largest accepted point value for a single building.
pub const MAX_POINTS: u32 = 1_000_000;
pub const MAX_STARS: u32 = 1_000_000;

/// Generation and animation parameters for a city session.
///
/// Defaults reproduce the classic "Neon Cityscape" look: a 10x10 lattice
/// spaced 15 units apart under a slowly orbiting camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityConfig {
    pub grid_size: u32,
    pub spacing: f32,
    pub height_range: (f32, f32),
    pub footprint_range: (f32, f32),
    pub palette: Vec<Vec3>,
    pub interactive_chance: f32,
    pub point_range: (u32, u32),
    /// Seconds a clicked building stays disabled.
    pub cooldown: f64,
    pub growth_step: f32,
    pub growth_factor: f32,
    pub base_intensity: f32,
    pub hover_intensity: f32,
    pub click_intensity: f32,
    pub pulse_amplitude: f32,
    pub pulse_frequency: f32,
    pub orbit_step: f32,
    pub orbit_radius: f32,
    pub orbit_height: f32,
    pub fov_degrees: f32,
    pub star_count: u32,
    pub star_spread: f32,
    pub ground_size: f32,
    pub grid_overlay_size: f32,
    pub grid_divisions: u32,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            grid_size: 10,
            spacing: 15.0,
            height_range: (10.0, 40.0),
            footprint_range: (5.0, 10.0),
            palette: vec![
                hex_color(0x00ffff),
                hex_color(0xff00ff),
                hex_color(0x7b68ee),
                hex_color(0x1e90ff),
                hex_color(0x32cd32),
            ],
            interactive_chance: 0.3,
            point_range: (1, 10),
            cooldown: 3.0,
            growth_step: 0.05,
            growth_factor: 1.5,
            base_intensity: 0.2,
            hover_intensity: 0.5,
            click_intensity: 1.0,
            pulse_amplitude: 0.1,
            pulse_frequency: 1.0,
            orbit_step: 0.001,
            orbit_radius: 120.0,
            orbit_height: 40.0,
            fov_degrees: 75.0,
            star_count: 10_000,
            star_spread: 2000.0,
            ground_size: 500.0,
            grid_overlay_size: 200.0,
            grid_divisions: 50,
        }
    }
}

impl CityConfig {
    /// Reads overrides from a `<city>` XML document. Elements that are
    /// absent keep their default value.
    pub fn from_xml(xml: &str) -> Result<Self, ConfigError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();
        let mut config = Self::default();

        if let Some(value) = optional_text(&root, "grid_size") {
            config.grid_size = parse_number("grid_size", &value)?;
        }
        if let Some(value) = optional_text(&root, "spacing") {
            config.spacing = parse_number("spacing", &value)?;
        }
        if let Some(value) = optional_text(&root, "height") {
            config.height_range = parse_pair("height", &value)?;
        }
        if let Some(value) = optional_text(&root, "footprint") {
            config.footprint_range = parse_pair("footprint", &value)?;
        }
        if let Some(value) = optional_text(&root, "interactive_chance") {
            config.interactive_chance = parse_number("interactive_chance", &value)?;
        }
        if let Some(value) = optional_text(&root, "points") {
            config.point_range = parse_pair("points", &value)?;
        }
        if let Some(value) = optional_text(&root, "cooldown") {
            config.cooldown = parse_number("cooldown", &value)?;
        }
        if let Some(value) = optional_text(&root, "stars") {
            config.star_count = parse_number("stars", &value)?;
        }
        if let Some(palette) = root.children().find(|n| n.has_tag_name("palette")) {
            config.palette = palette
                .children()
                .filter(|n| n.has_tag_name("color"))
                .map(|n| parse_color(n.text().unwrap_or_default()))
                .collect::<Result<Vec<_>, _>>()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_finite()?;
        if self.grid_size == 0 {
            return Err(ConfigError::NonPositive { field: "grid_size" });
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(ConfigError::TooLarge {
                field: "grid_size",
                value: self.grid_size.into(),
                max: MAX_GRID_SIZE.into(),
            });
        }
        if !(self.spacing > 0.0) {
            return Err(ConfigError::NonPositive { field: "spacing" });
        }
        check_range("height", self.height_range)?;
        check_range("footprint", self.footprint_range)?;
        if self.height_range.0 <= 0.0 {
            return Err(ConfigError::NonPositive { field: "height" });
        }
        if self.footprint_range.0 <= 0.0 {
            return Err(ConfigError::NonPositive { field: "footprint" });
        }
        if self.point_range.0 == 0 || self.point_range.1 < self.point_range.0 {
            return Err(ConfigError::EmptyRange {
                field: "points",
                min: self.point_range.0 as f32,
                max: self.point_range.1 as f32,
            });
        }
        if self.point_range.1 > MAX_POINTS {
            return Err(ConfigError::TooLarge {
                field: "points",
                value: self.point_range.1.into(),
                max: MAX_POINTS.into(),
            });
        }
        if !(0.0..=1.0).contains(&self.interactive_chance) {
            return Err(ConfigError::OutOfUnitRange {
                field: "interactive_chance",
                value: self.interactive_chance,
            });
        }
        if self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        if self.cooldown < 0.0 {
            return Err(ConfigError::NonPositive { field: "cooldown" });
        }
        if !(self.growth_step > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "growth_step",
            });
        }
        if self.star_count > MAX_STARS {
            return Err(ConfigError::TooLarge {
                field: "stars",
                value: self.star_count.into(),
                max: MAX_STARS.into(),
            });
        }
        if !(self.star_spread > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "star_spread",
            });
        }
        Ok(())
    }

    fn check_finite(&self) -> Result<(), ConfigError> {
        let fields = [
            ("spacing", self.spacing),
            ("height", self.height_range.0),
            ("height", self.height_range.1),
            ("footprint", self.footprint_range.0),
            ("footprint", self.footprint_range.1),
            ("interactive_chance", self.interactive_chance),
            ("growth_step", self.growth_step),
            ("growth_factor", self.growth_factor),
            ("base_intensity", self.base_intensity),
            ("hover_intensity", self.hover_intensity),
            ("click_intensity", self.click_intensity),
            ("pulse_amplitude", self.pulse_amplitude),
            ("pulse_frequency", self.pulse_frequency),
            ("orbit_step", self.orbit_step),
            ("orbit_radius", self.orbit_radius),
            ("orbit_height", self.orbit_height),
            ("fov_degrees", self.fov_degrees),
            ("star_spread", self.star_spread),
            ("ground_size", self.ground_size),
            ("grid_overlay_size", self.grid_overlay_size),
        ];
        match fields.into_iter().find(|(_, value)| !value.is_finite()) {
            Some((field, value)) => Err(ConfigError::NonFinite { field, value }),
            None if !self.cooldown.is_finite() => Err(ConfigError::NonFinite {
                field: "cooldown",
                value: self.cooldown as f32,
            }),
            None => Ok(()),
        }
    }

    pub fn height(&self) -> Range<f32> {
        self.height_range.0..self.height_range.1
    }

    pub fn footprint(&self) -> Range<f32> {
        self.footprint_range.0..self.footprint_range.1
    }
}

/// Converts a `0xRRGGBB` literal into linear 0..1 components.
pub fn hex_color(rgb: u32) -> Vec3 {
    Vec3::new(
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
    )
}

fn check_range(field: &'static str, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    if min < max {
        Ok(())
    } else {
        Err(ConfigError::EmptyRange { field, min, max })
    }
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn parse_pair<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> Result<(T, T), ConfigError> {
    let mut parts = value.split_whitespace();
    let invalid = || ConfigError::InvalidValue {
        field,
        value: value.to_string(),
    };
    let min = parts.next().ok_or_else(invalid)?;
    let max = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok((parse_number(field, min)?, parse_number(field, max)?))
}

fn parse_color(value: &str) -> Result<Vec3, ConfigError> {
    let components = value
        .split_whitespace()
        .map(|component| parse_number::<u8>("color", component))
        .collect::<Result<Vec<_>, _>>()?;
    match components.as_slice() {
        [r, g, b] => Ok(Vec3::new(
            *r as f32 / 255.0,
            *g as f32 / 255.0,
            *b as f32 / 255.0,
        )),
        _ => Err(ConfigError::InvalidValue {
            field: "color",
            value: value.to_string(),
        }),
    }
}
