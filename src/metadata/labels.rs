// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Human labels for protocol type codes.

/// Suffix shared by all push-protocol base UUIDs.
const BASE_UUID_SUFFIX: &str = "-0000-1000-8000-0026BB765291";

/// Accessory information service (carries the accessory name).
pub const ACCESSORY_INFORMATION: &str = "3E";
/// Protocol information service. Never watched.
///
/// ```
/// use accessory_watch::metadata::{MetadataResolver, PROTOCOL_INFORMATION};
///
/// assert!(!MetadataResolver::new().is_watched_service(PROTOCOL_INFORMATION));
/// ```
pub const PROTOCOL_INFORMATION: &str = "A2";
/// Name characteristic.
pub const NAME: &str = "23";
/// On characteristic.
pub const ON: &str = "25";

/// Service types watched when no explicit set is configured.
pub const DEFAULT_WATCHED_SERVICES: &[&str] = &[
    "40", "41", "43", "45", "47", "49", "4A", "7E", "7F", "80", "81", "82", "83", "84", "85",
    "86", "87", "89", "8A", "8B", "8C", "8D", "96", "97", "B7", "BB", "BC", "D0",
];

/// Normalizes a type code to its short uppercase form.
///
/// Full base UUIDs (`00000049-0000-1000-8000-0026BB765291`) and short codes
/// (`49`, `0049`) all become `49`. Vendor UUIDs are only uppercased.
///
/// # Examples
///
/// ```
/// use accessory_watch::metadata::short_type;
///
/// assert_eq!(short_type("00000049-0000-1000-8000-0026BB765291"), "49");
/// assert_eq!(short_type("0000003e-0000-1000-8000-0026bb765291"), "3E");
/// assert_eq!(short_type("8a"), "8A");
/// ```
#[must_use]
pub fn short_type(code: &str) -> String {
    let upper = code.trim().to_ascii_uppercase();
    let prefix = match upper.strip_suffix(BASE_UUID_SUFFIX) {
        Some(prefix) => prefix,
        None if upper.contains('-') => return upper,
        None => upper.as_str(),
    };
    let trimmed = prefix.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Returns the label of a push-protocol service type, if known.
#[must_use]
pub fn service_label(short: &str) -> Option<&'static str> {
    let label = match short {
        "3E" => "Accessory Information",
        "40" => "Fan",
        "41" => "Garage Door Opener",
        "43" => "Lightbulb",
        "44" => "Lock Management",
        "45" => "Lock",
        "47" => "Outlet",
        "49" => "Switch",
        "4A" => "Thermostat",
        "7E" => "Security System",
        "7F" => "Carbon Monoxide Sensor",
        "80" => "Contact Sensor",
        "81" => "Door",
        "82" => "Humidity Sensor",
        "83" => "Leak Sensor",
        "84" => "Light Sensor",
        "85" => "Motion Sensor",
        "86" => "Occupancy Sensor",
        "87" => "Smoke Sensor",
        "89" => "Stateless Programmable Switch",
        "8A" => "Temperature Sensor",
        "8B" => "Window",
        "8C" => "Window Covering",
        "8D" => "Air Quality Sensor",
        "96" => "Battery",
        "97" => "Carbon Dioxide Sensor",
        "A2" => "Protocol Information",
        "B7" => "Fan",
        "BB" => "Air Purifier",
        "BC" => "Heater Cooler",
        "D0" => "Valve",
        _ => return None,
    };
    Some(label)
}

/// Returns the label of a push-protocol characteristic type, if known.
#[must_use]
pub fn characteristic_label(short: &str) -> Option<&'static str> {
    let label = match short {
        "8" => "Brightness",
        "E" => "Current Door State",
        "F" => "Current Heating Cooling State",
        "10" => "Current Relative Humidity",
        "11" => "Current Temperature",
        "13" => "Hue",
        "14" => "Identify",
        "1D" => "Lock Current State",
        "1E" => "Lock Target State",
        "20" => "Manufacturer",
        "21" => "Model",
        "22" => "Motion Detected",
        "23" => "Name",
        "24" => "Obstruction Detected",
        "25" => "On",
        "26" => "Outlet In Use",
        "29" => "Rotation Speed",
        "2F" => "Saturation",
        "30" => "Serial Number",
        "32" => "Target Door State",
        "33" => "Target Heating Cooling State",
        "35" => "Target Temperature",
        "52" => "Firmware Revision",
        "68" => "Battery Level",
        "69" => "Carbon Monoxide Detected",
        "6A" => "Contact Sensor State",
        "6B" => "Current Ambient Light Level",
        "6D" => "Current Position",
        "70" => "Leak Detected",
        "71" => "Occupancy Detected",
        "72" => "Position State",
        "73" => "Programmable Switch Event",
        "75" => "Status Active",
        "76" => "Smoke Detected",
        "77" => "Status Fault",
        "79" => "Status Low Battery",
        "7A" => "Status Tampered",
        "7C" => "Target Position",
        "8F" => "Charging State",
        "95" => "Air Quality",
        "B0" => "Active",
        "CE" => "Color Temperature",
        "D2" => "In Use",
        "D5" => "Valve Type",
        _ => return None,
    };
    Some(label)
}

/// Returns the label of a poll-protocol cluster, if known.
#[must_use]
pub fn cluster_label(cluster: u32) -> Option<&'static str> {
    let label = match cluster {
        0x0003 => "Identify",
        0x0006 => "On/Off",
        0x0008 => "Level Control",
        0x002F => "Power Source",
        0x0045 => "Boolean State",
        0x0101 => "Door Lock",
        0x0102 => "Window Covering",
        0x0201 => "Thermostat",
        0x0300 => "Color Control",
        0x0400 => "Illuminance Measurement",
        0x0402 => "Temperature Measurement",
        0x0405 => "Relative Humidity Measurement",
        0x0406 => "Occupancy Sensing",
        _ => return None,
    };
    Some(label)
}

/// Returns the label of a poll-protocol attribute, if known.
#[must_use]
pub fn attribute_label(cluster: u32, attribute: u32) -> Option<&'static str> {
    let label = match (cluster, attribute) {
        (0x0006, 0x0000) => "OnOff",
        (0x0008, 0x0000) => "CurrentLevel",
        (0x002F, 0x000C) => "BatPercentRemaining",
        (0x0045, 0x0000) => "StateValue",
        (0x0101, 0x0000) => "LockState",
        (0x0102, 0x000E) => "CurrentPositionLiftPercent100ths",
        (0x0201, 0x0000) => "LocalTemperature",
        (0x0300, 0x0007) => "ColorTemperatureMireds",
        (0x0400 | 0x0402 | 0x0405, 0x0000) => "MeasuredValue",
        (0x0406, 0x0000) => "Occupancy",
        _ => return None,
    };
    Some(label)
}

/// Returns true if a characteristic name denotes a binary on/off state.
#[must_use]
pub fn is_on_characteristic(name: &str) -> bool {
    matches!(name, "On" | "OnOff")
}
