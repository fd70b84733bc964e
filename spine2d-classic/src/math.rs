//! Small numeric helpers shared by the runtime.

use crate::Error;

pub const PI: f32 = 3.1415927;
pub const PI2: f32 = PI * 2.0;
pub const RAD_DEG: f32 = 180.0 / PI;
pub const DEG_RAD: f32 = PI / 180.0;

pub fn cos_deg(degrees: f32) -> f32 {
    (degrees * DEG_RAD).cos()
}

pub fn sin_deg(degrees: f32) -> f32 {
    (degrees * DEG_RAD).sin()
}

/// Like `f32::signum`, but maps `0.0` (and `-0.0`) to `1.0`.
pub fn signum(value: f32) -> f32 {
    if value >= 0.0 { 1.0 } else { -1.0 }
}

/// Truncates toward zero.
pub fn to_int(value: f32) -> i32 {
    value.trunc() as i32
}

pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Wraps an angle in degrees into `(-180, 180]`.
pub(crate) fn wrap_degrees(mut degrees: f32) -> f32 {
    while degrees > 180.0 {
        degrees -= 360.0;
    }
    while degrees <= -180.0 {
        degrees += 360.0;
    }
    degrees
}

/// Wraps an angle in radians into `[-PI, PI]`.
pub(crate) fn wrap_radians(radians: f32) -> f32 {
    if radians > PI {
        radians - PI2
    } else if radians < -PI {
        radians + PI2
    } else {
        radians
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[cfg(feature = "glam")]
impl From<Vector2> for glam::Vec2 {
    fn from(v: Vector2) -> Self {
        glam::Vec2::new(v.x, v.y)
    }
}

#[cfg(feature = "glam")]
impl From<glam::Vec2> for Vector2 {
    fn from(v: glam::Vec2) -> Self {
        Vector2::new(v.x, v.y)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `rrggbb` or `rrggbbaa`, with an optional leading `#`. Alpha defaults to 1.
    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let invalid = || Error::InvalidValue {
            message: format!("invalid hex color '{hex}'"),
        };
        if (digits.len() != 6 && digits.len() != 8) || !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| -> Result<f32, Error> {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map(|v| f32::from(v) / 255.0)
                .map_err(|_| invalid())
        };
        let a = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub fn set(&mut self, r: f32, g: f32, b: f32, a: f32) {
        *self = Self::new(r, g, b, a);
        self.clamp();
    }

    pub fn add(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.r += r;
        self.g += g;
        self.b += b;
        self.a += a;
        self.clamp();
    }

    pub fn clamp(&mut self) -> &mut Self {
        self.r = clamp(self.r, 0.0, 1.0);
        self.g = clamp(self.g, 0.0, 1.0);
        self.b = clamp(self.b, 0.0, 1.0);
        self.a = clamp(self.a, 0.0, 1.0);
        self
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Free-list of reusable values.
pub struct Pool<T> {
    items: Vec<T>,
    instantiator: fn() -> T,
}

impl<T> Pool<T> {
    pub fn new(instantiator: fn() -> T) -> Self {
        Self {
            items: Vec::new(),
            instantiator,
        }
    }

    pub fn obtain(&mut self) -> T {
        self.items.pop().unwrap_or_else(self.instantiator)
    }

    pub fn free(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn free_all(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.extend(items);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn free_count(&self) -> usize {
        self.items.len()
    }
}

impl<T> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("free", &self.items.len())
            .finish()
    }
}
