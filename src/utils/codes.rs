//! Human-readable labels for the platform's numeric codes.

use crate::utils::text::display_value;
use serde_json::Value;

/// Integer code from a JSON number or numeric string.
fn code_of(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn unknown(value: Option<&Value>) -> String {
    format!("Unknown ({})", display_value(value, "None"))
}

fn lookup(value: Option<&Value>, table: &[(i64, &str)]) -> String {
    code_of(value)
        .and_then(|code| table.iter().find(|(known, _)| *known == code))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| unknown(value))
}

pub fn auth_mode(value: Option<&Value>) -> String {
    lookup(
        value,
        &[
            (0, "Dynamic Authentication"),
            (1, "Static Authentication"),
            (2, "X509 Authentication"),
        ],
    )
}

pub fn access_type(value: Option<&Value>) -> String {
    lookup(
        value,
        &[
            (0, "Direct Device"),
            (1, "Gateway Device"),
            (2, "Gateway Sub-device"),
        ],
    )
}

pub fn data_format(value: Option<&Value>) -> String {
    lookup(value, &[(0, "Transparent Transmission"), (3, "Thing Model")])
}

/// Network codes arrive as strings; integers are accepted too.
pub fn network_way(value: Option<&Value>) -> String {
    if matches!(value, None | Some(Value::Null)) {
        return "Not Specified".to_string();
    }
    lookup(
        value,
        &[
            (1, "WiFi"),
            (2, "Cellular (2G/3G/4G/5G)"),
            (3, "NB-IoT"),
            (4, "LoRa"),
            (5, "Ethernet"),
            (6, "Other"),
        ],
    )
}

pub fn direction(value: Option<&Value>) -> String {
    lookup(value, &[(1, "Uplink"), (2, "Downlink")])
}

pub fn send_status(value: Option<&Value>) -> String {
    lookup(value, &[(0, "Not Sent"), (1, "Sent"), (-1, "Send Failed")])
}

const EVENT_TYPES: &[(i64, &str)] = &[
    (0, "Offline"),
    (1, "Online"),
    (2, "Reconnect"),
    (3, "Information"),
    (4, "Alert"),
    (5, "Fault"),
    (6, "Reset"),
];

pub fn event_type(value: Option<&Value>) -> String {
    code_of(value)
        .and_then(|code| EVENT_TYPES.iter().find(|(known, _)| *known == code))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| format!("Unknown Type ({})", display_value(value, "N/A")))
}

/// True when the field holds the integer 1.
pub fn is_set(value: Option<&Value>) -> bool {
    code_of(value) == Some(1)
}

pub fn online_status(value: Option<&Value>) -> &'static str {
    if is_set(value) {
        "Online"
    } else {
        "Offline"
    }
}

pub fn yes_no(value: Option<&Value>) -> &'static str {
    if is_set(value) {
        "Yes"
    } else {
        "No"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_codes_map_to_labels() {
        assert_eq!(access_type(Some(&json!(1))), "Gateway Device");
        assert_eq!(auth_mode(Some(&json!(2))), "X509 Authentication");
        assert_eq!(data_format(Some(&json!(3))), "Thing Model");
        assert_eq!(network_way(Some(&json!("2"))), "Cellular (2G/3G/4G/5G)");
        assert_eq!(network_way(Some(&json!(5))), "Ethernet");
        assert_eq!(send_status(Some(&json!(-1))), "Send Failed");
        assert_eq!(event_type(Some(&json!("4"))), "Alert");
    }

    #[test]
    fn unknown_codes_echo_the_input() {
        assert_eq!(access_type(Some(&json!(5))), "Unknown (5)");
        assert_eq!(data_format(Some(&json!(1))), "Unknown (1)");
        assert_eq!(auth_mode(None), "Unknown (None)");
        assert_eq!(network_way(Some(&json!("9"))), "Unknown (9)");
        assert_eq!(direction(Some(&json!("sideways"))), "Unknown (sideways)");
        assert_eq!(event_type(Some(&json!(42))), "Unknown Type (42)");
        assert_eq!(event_type(None), "Unknown Type (N/A)");
    }

    #[test]
    fn absent_network_way_is_not_specified() {
        assert_eq!(network_way(None), "Not Specified");
        assert_eq!(network_way(Some(&Value::Null)), "Not Specified");
    }

    #[test]
    fn flags_only_accept_one() {
        assert_eq!(online_status(Some(&json!(1))), "Online");
        assert_eq!(online_status(Some(&json!(0))), "Offline");
        assert_eq!(yes_no(None), "No");
    }
}
