//! Unit normalization.
//!
//! Time is canonically seconds (powers of 1000), memory is canonically bytes
//! (powers of 1024).

use crate::ast::{MemoryValue, TimeValue};
use benchgate_types::UnitFamily;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 3] = [
        TimeUnit::Microseconds,
        TimeUnit::Milliseconds,
        TimeUnit::Seconds,
    ];

    /// Case-insensitive; singular and plural forms.
    pub fn from_word(word: &str) -> Option<Self> {
        let lower = word.to_ascii_lowercase();
        match lower.strip_suffix('s').unwrap_or(&lower) {
            "microsecond" => Some(TimeUnit::Microseconds),
            "millisecond" => Some(TimeUnit::Milliseconds),
            "second" => Some(TimeUnit::Seconds),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
        }
    }

    pub fn seconds_per_unit(self) -> f64 {
        match self {
            TimeUnit::Microseconds => 1e-6,
            TimeUnit::Milliseconds => 1e-3,
            TimeUnit::Seconds => 1.0,
        }
    }

    pub fn to_seconds(self, magnitude: f64) -> f64 {
        magnitude * self.seconds_per_unit()
    }

    pub fn from_seconds(self, seconds: f64) -> f64 {
        seconds / self.seconds_per_unit()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryUnit {
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
}

impl MemoryUnit {
    pub const ALL: [MemoryUnit; 4] = [
        MemoryUnit::Bytes,
        MemoryUnit::Kilobytes,
        MemoryUnit::Megabytes,
        MemoryUnit::Gigabytes,
    ];

    /// Case-insensitive; singular and plural forms.
    pub fn from_word(word: &str) -> Option<Self> {
        let lower = word.to_ascii_lowercase();
        match lower.strip_suffix('s').unwrap_or(&lower) {
            "byte" => Some(MemoryUnit::Bytes),
            "kilobyte" => Some(MemoryUnit::Kilobytes),
            "megabyte" => Some(MemoryUnit::Megabytes),
            "gigabyte" => Some(MemoryUnit::Gigabytes),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MemoryUnit::Bytes => "bytes",
            MemoryUnit::Kilobytes => "kilobytes",
            MemoryUnit::Megabytes => "megabytes",
            MemoryUnit::Gigabytes => "gigabytes",
        }
    }

    pub fn bytes_per_unit(self) -> f64 {
        match self {
            MemoryUnit::Bytes => 1.0,
            MemoryUnit::Kilobytes => 1024.0,
            MemoryUnit::Megabytes => 1024.0 * 1024.0,
            MemoryUnit::Gigabytes => 1024.0 * 1024.0 * 1024.0,
        }
    }

    pub fn to_bytes(self, magnitude: f64) -> f64 {
        magnitude * self.bytes_per_unit()
    }

    pub fn from_bytes(self, bytes: f64) -> f64 {
        bytes / self.bytes_per_unit()
    }
}

impl TimeValue {
    pub fn seconds(&self) -> f64 {
        self.unit.to_seconds(self.magnitude)
    }
}

impl MemoryValue {
    pub fn bytes(&self) -> f64 {
        self.unit.to_bytes(self.magnitude)
    }
}

/// Render a canonical magnitude with the largest unit that keeps it >= 1.
pub fn format_canonical(value: f64, family: UnitFamily) -> String {
    match family {
        UnitFamily::Time => {
            let abs = value.abs();
            let unit = if abs >= 1.0 || abs == 0.0 {
                TimeUnit::Seconds
            } else if abs >= 1e-3 {
                TimeUnit::Milliseconds
            } else {
                TimeUnit::Microseconds
            };
            let symbol = match unit {
                TimeUnit::Seconds => "s",
                TimeUnit::Milliseconds => "ms",
                TimeUnit::Microseconds => "μs",
            };
            format!("{:.3}{symbol}", unit.from_seconds(value))
        }
        UnitFamily::Memory => {
            let abs = value.abs();
            let unit = MemoryUnit::ALL
                .into_iter()
                .rev()
                .find(|u| abs >= u.bytes_per_unit())
                .unwrap_or(MemoryUnit::Bytes);
            match unit {
                MemoryUnit::Bytes => format!("{value:.0}B"),
                MemoryUnit::Kilobytes => format!("{:.3}KiB", unit.from_bytes(value)),
                MemoryUnit::Megabytes => format!("{:.3}MiB", unit.from_bytes(value)),
                MemoryUnit::Gigabytes => format!("{:.3}GiB", unit.from_bytes(value)),
            }
        }
        UnitFamily::Ratio => format!("{value:.2}%"),
    }
}
