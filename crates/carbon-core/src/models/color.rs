//! Colours and the user's colour theme.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::api::{ApiClient, Response};
use crate::events::{ErrorOrigin, EventBus};

/// An RGBA colour with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<f64>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("Hex colour must have a multiple of 3 digits, got {0}")]
    InvalidLength(usize),

    #[error("Invalid hex digits: {0}")]
    InvalidDigits(String),
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64, a: Option<f64>) -> Self {
        Self { r, g, b, a }
    }

    /// CSS `rgba(...)` notation; alpha defaults to 1.
    pub fn to_rgba(&self) -> String {
        format!(
            "rgba({}, {}, {}, {})",
            (self.r * 255.0).round(),
            (self.g * 255.0).round(),
            (self.b * 255.0).round(),
            self.a.unwrap_or(1.0)
        )
    }

    /// `#rrggbb` style string with `precision` hex digits per channel.
    pub fn to_hex(&self, precision: u32) -> String {
        let max = 16f64.powi(precision as i32) - 1.0;
        let width = precision as usize;
        let channel = |c: f64| format!("{:0width$x}", (c.clamp(0.0, 1.0) * max).round() as u64, width = width);
        format!("#{}{}{}", channel(self.r), channel(self.g), channel(self.b))
    }

    /// Parse a hex string, falling back to black when it is malformed.
    pub fn from_hex(hex: &str) -> Self {
        hex.parse().unwrap_or_else(|e: ColorParseError| {
            debug!(hex = hex, error = %e, "Falling back to default colour");
            Self::default()
        })
    }

    /// Overwrite the channels from a JSON object. Returns false and leaves
    /// the colour unchanged when `json` is not a colour object.
    pub fn update_with_json(&mut self, json: &Value) -> bool {
        if !json.is_object() {
            return false;
        }
        match serde_json::from_value::<Color>(json.clone()) {
            Ok(parsed) => {
                self.r = parsed.r;
                self.g = parsed.g;
                self.b = parsed.b;
                if parsed.a.is_some() {
                    self.a = parsed.a;
                }
                true
            }
            Err(_) => false,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.is_empty() || digits.len() % 3 != 0 || !digits.is_ascii() {
            return Err(ColorParseError::InvalidLength(digits.len()));
        }

        let width = digits.len() / 3;
        let max = 16f64.powi(width as i32) - 1.0;
        let channel = |i: usize| {
            u64::from_str_radix(&digits[i * width..(i + 1) * width], 16)
                .map(|v| v as f64 / max)
                .map_err(|_| ColorParseError::InvalidDigits(digits.to_string()))
        };

        Ok(Color::new(channel(0)?, channel(1)?, channel(2)?, None))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex(2))
    }
}

/// The palette a user picked, stored server-side.
pub struct ColorTheme {
    pub colors: Vec<Color>,
    client: Arc<ApiClient>,
    events: Arc<EventBus>,
}

impl ColorTheme {
    pub fn new(client: Arc<ApiClient>, events: Arc<EventBus>) -> Self {
        Self {
            colors: Vec::new(),
            client,
            events,
        }
    }

    pub async fn fetch(&mut self) -> &mut Self {
        let response = self.client.get("/api/me/colorTheme/").await;
        match response {
            Response::Success { body, .. } => self.update_with_json(&body),
            Response::Failure { code, msg } => {
                self.events.emit_error(ErrorOrigin::FetchColorTheme, code, msg)
            }
        }
        self
    }

    pub async fn save(&self) -> bool {
        match self.client.post("/api/me/colorTheme", &self.to_json()).await {
            Response::Success { .. } => true,
            Response::Failure { code, msg } => {
                self.events.emit_error(ErrorOrigin::SaveColorTheme, code, msg);
                false
            }
        }
    }

    /// Apply a JSON array of colours position by position, growing the
    /// palette with black where needed. Non-arrays are ignored.
    pub fn update_with_json(&mut self, json: &Value) {
        let Some(entries) = json.as_array() else {
            return;
        };
        for (i, entry) in entries.iter().enumerate() {
            if self.colors.len() <= i {
                self.colors.push(Color::default());
            }
            self.colors[i].update_with_json(entry);
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.colors.iter().map(Color::to_json).collect())
    }
}

impl fmt::Display for ColorTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let colors: Vec<String> = self.colors.iter().map(Color::to_string).collect();
        write!(f, "<ColorTheme {}>", colors.join(", "))
    }
}
