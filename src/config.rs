use std::env;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::models::driver::VehicleClass;

/// Pricing policy for one vehicle class. Lives in configuration so tariffs
/// can change without touching dispatch logic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tariff {
    pub base_fare: f64,
    pub per_km: f64,
    pub per_minute: f64,
    /// Assumed average speed for synthetic ETAs when the route provider is
    /// unavailable.
    pub fallback_speed_kmh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffTable {
    pub car: Tariff,
    pub motorcycle: Tariff,
    pub auto_rickshaw: Tariff,
}

impl TariffTable {
    pub fn for_class(&self, class: VehicleClass) -> &Tariff {
        match class {
            VehicleClass::Car => &self.car,
            VehicleClass::Motorcycle => &self.motorcycle,
            VehicleClass::AutoRickshaw => &self.auto_rickshaw,
        }
    }
}

impl Default for TariffTable {
    fn default() -> Self {
        Self {
            car: Tariff {
                base_fare: 50.0,
                per_km: 15.0,
                per_minute: 3.0,
                fallback_speed_kmh: 30.0,
            },
            motorcycle: Tariff {
                base_fare: 20.0,
                per_km: 8.0,
                per_minute: 1.5,
                fallback_speed_kmh: 35.0,
            },
            auto_rickshaw: Tariff {
                base_fare: 30.0,
                per_km: 10.0,
                per_minute: 2.0,
                fallback_speed_kmh: 25.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub search_radius_km: f64,
    pub quote_staleness_secs: u64,
    pub tariffs: TariffTable,
}

impl Config {
    pub fn from_env() -> Result<Self, DispatchError> {
        let _ = dotenvy::dotenv();

        let tariffs = match env::var("TARIFF_TABLE") {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|err| DispatchError::Internal(format!("invalid TARIFF_TABLE: {err}")))?,
            Err(_) => TariffTable::default(),
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            search_radius_km: parse_or_default("SEARCH_RADIUS_KM", 10.0)?,
            quote_staleness_secs: parse_or_default("QUOTE_STALENESS_SECS", 30)?,
            tariffs,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, DispatchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| DispatchError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
