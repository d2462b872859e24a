use crate::constants::history::DEFAULT_LANGUAGE;
use crate::constants::pagination::PAGE_SIZE;
use crate::errors::ToolError;
use crate::managers::json_text;
use crate::models::Record;
use crate::services::insights::{DeviceInsights, OnlineTimeReport};
use crate::services::iot_client::IotClient;
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::validation::Validation;
use crate::utils::codes;
use crate::utils::text::{display_value, field, rule};
use crate::utils::time_format::format_timestamp;
use serde_json::{json, Value};
use std::sync::Arc;

pub const DEVICE_TOOLS: &[&str] = &[
    "list_devices",
    "list_devices_formatted",
    "get_device_details",
    "get_device_latest_online_time",
    "power_switch",
    "query_device_resources",
];

/// Resource fields shown in the device detail report, in display order.
const RESOURCE_FIELDS: &[(&str, &str)] = &[
    ("ICCID", "iccId"),
    ("Phone Number", "phoneNum"),
    ("SIM Number", "simNum"),
    ("Battery Level", "battery"),
    ("Signal Strength", "signalStrength"),
    ("RSRP", "rsrp"),
    ("RSRQ", "rsrq"),
    ("SNR", "snr"),
    ("MCU Version", "mcuVersion"),
    ("SDK Version", "sdkVer"),
    ("Firmware Version", "version"),
    ("Voltage", "voltage"),
    ("Free Memory", "memoryFree"),
    ("Communication Protocol Version", "comProtocolVer"),
    ("Data Protocol Version", "dataProtocolVer"),
    ("Locator", "locator"),
    ("Log Enable", "logEnable"),
    ("Log Level", "logLevel"),
    ("Mobile Country Code (MCC)", "mcc"),
    ("Mobile Network Code (MNC)", "mnc"),
    ("Cell ID", "cellId"),
    ("Location Area Code (LAC)", "lac"),
];

/// `on` (any case) switches on; every other value switches off.
pub fn parse_switch_state(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("on")
}

#[derive(Clone)]
pub struct DeviceManager {
    logger: Logger,
    validation: Validation,
    client: Arc<IotClient>,
    insights: Arc<DeviceInsights>,
}

impl DeviceManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        client: Arc<IotClient>,
        insights: Arc<DeviceInsights>,
    ) -> Self {
        Self {
            logger: logger.child("devices"),
            validation,
            client,
            insights,
        }
    }

    fn device_keys(&self, args: &Value) -> Result<(String, String), ToolError> {
        Ok((
            self.validation.required_string(args, "product_key")?,
            self.validation.required_string(args, "device_key")?,
        ))
    }

    fn page_size(&self, args: &Value) -> Result<usize, ToolError> {
        Ok(self
            .validation
            .positive_u32(args, "page_size", PAGE_SIZE as u32)? as usize)
    }

    async fn list_devices(&self, args: &Value) -> Result<String, ToolError> {
        let product_key = self.validation.required_string(args, "product_key")?;
        let devices = self
            .client
            .list_devices(&product_key, self.page_size(args)?)
            .await?;
        json_text(&devices)
    }

    async fn list_devices_formatted(&self, args: &Value) -> Result<String, ToolError> {
        let product_key = self.validation.required_string(args, "product_key")?;
        let devices = self
            .client
            .list_devices_with_formatted_time(&product_key, self.page_size(args)?)
            .await?;
        if devices.is_empty() {
            return Ok(format!("No devices found for product key: {}", product_key));
        }
        let mut lines = vec![
            format!(
                "Device list for product {} (total: {} devices):",
                product_key,
                devices.len()
            ),
            rule(60),
        ];
        for (index, device) in devices.iter().enumerate() {
            lines.push(render_device_row(index + 1, device));
        }
        Ok(lines.join("\n"))
    }

    async fn get_device_details(&self, args: &Value) -> Result<String, ToolError> {
        let (product_key, device_key) = self.device_keys(args)?;
        let detail = self
            .client
            .get_device_detail(&product_key, &device_key)
            .await?;
        let resources = self
            .client
            .query_device_resources(&product_key, &device_key, DEFAULT_LANGUAGE)
            .await;
        if let Err(err) = &resources {
            self.logger.warn(
                "resources unavailable for device detail",
                Some(&json!({ "deviceKey": device_key, "error": err.message })),
            );
        }
        Ok(render_device_detail(&detail, &resources))
    }

    async fn get_device_latest_online_time(&self, args: &Value) -> Result<String, ToolError> {
        let (product_key, device_key) = self.device_keys(args)?;
        let report = self
            .insights
            .latest_online_time(&product_key, &device_key)
            .await;
        Ok(render_online_time(&report))
    }

    async fn power_switch(&self, args: &Value) -> Result<String, ToolError> {
        let (product_key, device_key) = self.device_keys(args)?;
        let on_off = self.validation.required_string(args, "on_off")?;
        self.client
            .power_switch(&product_key, &device_key, parse_switch_state(&on_off))
            .await?;
        Ok("Success".to_string())
    }

    async fn query_device_resources(&self, args: &Value) -> Result<String, ToolError> {
        let (product_key, device_key) = self.device_keys(args)?;
        let language = self.validation.language(args)?;
        let resources = self
            .client
            .query_device_resources(&product_key, &device_key, &language)
            .await?;
        if resources.is_empty() {
            return Ok("No device resources found or an error occurred.".to_string());
        }
        let mut lines = vec!["Device Resource Information:".to_string(), rule(20)];
        for (key, value) in resources.iter() {
            lines.push(format!("{}: {}", key, display_value(Some(value), "None")));
        }
        Ok(lines.join("\n"))
    }
}

fn render_device_row(index: usize, device: &Record) -> String {
    let raw = |key: &str| display_value(device.get(key), "None");
    format!(
        "\n{index}. {name}\n   Device Key: {key}\n   Product Key: {product}\n   Serial Number: {sn}\n   Status: {status} ({status_raw})\n   Activated: {activated} ({activated_raw})\n   Virtual Device: {virt} ({virt_raw})\n   Verification Status: {verified} ({verified_raw})\n   Auth Mode: {auth} ({auth_raw})\n   Data Format: {fmt} ({fmt_raw})\n   Created Time: {created}\n   Activated Time: {actived}\n   First Connection Time: {first_conn}\n   Last Connection Time: {last_conn}\n   Last Offline Time: {last_offline}\n   Last Update: {updated}\n   Raw Timestamps: Created={r_created}, Activated={r_actived}, Updated={r_updated}, First Connection={r_first}, Last Connection={r_last}, Last Offline={r_offline}\n",
        index = index,
        name = field(device, "deviceName", "Unknown"),
        key = field(device, "deviceKey", "N/A"),
        product = field(device, "productKey", "N/A"),
        sn = field(device, "sn", "N/A"),
        status = codes::online_status(device.get("deviceStatus")),
        status_raw = raw("deviceStatus"),
        activated = if codes::is_set(device.get("isActived")) { "✓" } else { "✗" },
        activated_raw = raw("isActived"),
        virt = codes::yes_no(device.get("isVirtual")),
        virt_raw = raw("isVirtual"),
        verified = if codes::is_set(device.get("isVerified")) { "Verified" } else { "Not Verified" },
        verified_raw = raw("isVerified"),
        auth = codes::auth_mode(device.get("authMode")),
        auth_raw = raw("authMode"),
        fmt = codes::data_format(device.get("dataFmt")),
        fmt_raw = raw("dataFmt"),
        created = field(device, "formattedCreateTime", "N/A"),
        actived = field(device, "formattedActivedTime", "N/A"),
        first_conn = format_timestamp(device.get("firstConnTime")),
        last_conn = format_timestamp(device.get("lastConnTime")),
        last_offline = format_timestamp(device.get("lastOfflineTime")),
        updated = field(device, "formattedUpdateTime", "N/A"),
        r_created = raw("createTime"),
        r_actived = raw("activedTime"),
        r_updated = raw("updateTime"),
        r_first = raw("firstConnTime"),
        r_last = raw("lastConnTime"),
        r_offline = raw("lastOfflineTime"),
    )
}

fn render_device_detail(detail: &Record, resources: &Result<Record, ToolError>) -> String {
    let f = |key: &str| field(detail, key, "N/A");
    let activation = if codes::is_set(detail.get("isActived")) {
        "Activated"
    } else {
        "Not Activated"
    };
    let verification = if codes::is_set(detail.get("isVerified")) {
        "Verified"
    } else {
        "Not Verified"
    };
    let mut text = format!(
        "\nDevice Detailed Information (Enhanced Detail API):\n{rule}\nBasic Information:\nDevice Name: {name}\nDevice Key: {key}\nSerial Number: {sn}\nProduct Key: {product}\n\nStatus Information:\nDevice Status: {status} ({online})\nActivation Status: {activation}\nVerification Status: {verification}\nVirtual Device: {virt}\n\nTime Information (UTC and UTC+8 timezone):\nCreated Time: {created}\nActivated Time: {actived}\nFirst Connection: {first}\nLast Connection: {last}\nLast Offline: {offline}\nData Update: {updated}\n\nTechnical Parameters:\nData Format: {fmt} ({fmt_label})\nAuth Mode: {auth} ({auth_label})\n\nRaw Timestamps:\nCreated: {r_created}\nActivated: {r_actived}\nFirst Connection: {r_first}\nLast Connection: {r_last}\nLast Offline: {r_offline}\nUpdated: {r_updated}\n",
        rule = rule(42),
        name = f("deviceName"),
        key = f("deviceKey"),
        sn = f("sn"),
        product = f("productKey"),
        status = f("deviceStatus"),
        online = codes::online_status(detail.get("deviceStatus")),
        activation = activation,
        verification = verification,
        virt = codes::yes_no(detail.get("isVirtual")),
        created = f("formattedCreateTime"),
        actived = f("formattedActivedTime"),
        first = f("formattedFirstConnTime"),
        last = f("formattedLastConnTime"),
        offline = f("formattedLastOfflineTime"),
        updated = f("formattedUpdateTime"),
        fmt = f("dataFmt"),
        fmt_label = codes::data_format(detail.get("dataFmt")),
        auth = f("authMode"),
        auth_label = codes::auth_mode(detail.get("authMode")),
        r_created = f("createTime"),
        r_actived = f("activedTime"),
        r_first = f("firstConnTime"),
        r_last = f("lastConnTime"),
        r_offline = f("lastOfflineTime"),
        r_updated = f("updateTime"),
    );

    text.push_str("\nResource Information:\n");
    match resources {
        Ok(resources) if !resources.is_empty() => {
            for (label, key) in RESOURCE_FIELDS {
                text.push_str(&format!("{}: {}\n", label, field(resources, key, "N/A")));
            }
        }
        Ok(_) => text.push_str(
            "Unable to retrieve device resource information. Raw response: {}\n",
        ),
        Err(err) => text.push_str(&format!(
            "Unable to retrieve device resource information. Raw response: {}\n",
            err.display_text()
        )),
    }
    text
}

fn render_online_time(report: &OnlineTimeReport) -> String {
    let formatted = |millis: Option<i64>| format_timestamp(millis.map(Value::from).as_ref());
    format!(
        "\nDevice Latest Online Time Analysis (Enhanced):\n{rule}\nDevice Key: {key}\n\nData Source Comparison:\n- Device Update Time: {update}\n- Last Connection Time: {last_conn}\n- Location Service Time: {location}\n\nFinal Result:\n- Latest Online Time: {latest}\n- Data Source: {source}\n- Raw Timestamp: {raw}\n\nData Source Description:\n- device_update: From device overview API updateTime\n- last_connection: From device detail API lastConnTime (more accurate)\n- location: From location service API locateTime\n- System automatically selects the latest time as final result\n",
        rule = rule(34),
        key = report.device_key,
        update = formatted(report.device_update_time),
        last_conn = formatted(report.last_conn_time),
        location = formatted(report.location_time),
        latest = formatted(report.latest_time),
        source = report.source.as_str(),
        raw = report
            .latest_time
            .map(|t| t.to_string())
            .unwrap_or_else(|| "None".to_string()),
    )
}

#[async_trait::async_trait]
impl ToolHandler for DeviceManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<String, ToolError> {
        self.logger.debug(tool, None);
        match tool {
            "list_devices" => self.list_devices(&args).await,
            "list_devices_formatted" => self.list_devices_formatted(&args).await,
            "get_device_details" => self.get_device_details(&args).await,
            "get_device_latest_online_time" => self.get_device_latest_online_time(&args).await,
            "power_switch" => self.power_switch(&args).await,
            "query_device_resources" => self.query_device_resources(&args).await,
            _ => Err(crate::utils::tool_errors::unhandled_tool_error(
                "device",
                tool,
                DEVICE_TOOLS,
            )),
        }
    }
}
