use crate::errors::ToolError;
use crate::managers::devices::{DeviceManager, DEVICE_TOOLS};
use crate::managers::health::{HealthManager, HEALTH_TOOLS};
use crate::managers::history::{HistoryManager, HISTORY_TOOLS};
use crate::managers::location::{LocationManager, LOCATION_TOOLS};
use crate::managers::products::{ProductManager, PRODUCT_TOOLS};
use crate::managers::properties::{PropertyManager, PROPERTY_TOOLS};
use crate::mcp::catalog::tool_catalog;
use crate::services::clock::{Clock, SystemClock};
use crate::services::config::Settings;
use crate::services::credential::CredentialStore;
use crate::services::insights::DeviceInsights;
use crate::services::iot_client::IotClient;
use crate::services::logger::Logger;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::transport::{HttpTransport, UpstreamTransport};
use crate::services::validation::Validation;
use std::collections::HashMap;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub tool_executor: Arc<ToolExecutor>,
    pub client: Arc<IotClient>,
}

impl App {
    fn validate_tool_wiring(
        handlers: &HashMap<String, Arc<dyn ToolHandler>>,
    ) -> Result<(), ToolError> {
        let mut missing: Vec<String> = tool_catalog()
            .iter()
            .filter(|tool| !handlers.contains_key(&tool.name))
            .map(|tool| tool.name.clone())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ToolError::internal("Tool wiring is incomplete").with_hint(
            "This is a server wiring bug: every tool in tool_catalog.json must have a handler."
                .to_string(),
        )
        .with_details(serde_json::json!({ "missing_tools": missing })))
    }

    fn register(
        handlers: &mut HashMap<String, Arc<dyn ToolHandler>>,
        tools: &[&str],
        handler: Arc<dyn ToolHandler>,
    ) {
        for tool in tools {
            handlers.insert((*tool).to_string(), handler.clone());
        }
    }

    /// Production wiring: settings from the environment, HTTP transport,
    /// wall clock.
    pub fn initialize() -> Result<Self, ToolError> {
        let settings = Settings::from_env();
        let logger = Logger::new("iot-mcp");
        let transport: Arc<dyn UpstreamTransport> = Arc::new(HttpTransport::new(
            logger.clone(),
            settings.base_url.clone(),
        )?);
        if settings.base_url.is_none() {
            logger.warn("BASE_URL is not set; upstream calls will fail", None);
        }
        Self::build(logger, &settings, transport, Arc::new(SystemClock))
    }

    /// Wiring with an injected transport and clock.
    pub fn with_components(
        settings: &Settings,
        transport: Arc<dyn UpstreamTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ToolError> {
        Self::build(Logger::new("iot-mcp"), settings, transport, clock)
    }

    fn build(
        logger: Logger,
        settings: &Settings,
        transport: Arc<dyn UpstreamTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ToolError> {
        let validation = Validation::new();
        let credentials = Arc::new(CredentialStore::new(
            logger.clone(),
            settings,
            transport.clone(),
            clock,
        ));
        let client = Arc::new(IotClient::new(logger.clone(), transport, credentials));
        let insights = Arc::new(DeviceInsights::new(logger.clone(), client.clone()));

        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        Self::register(
            &mut handlers,
            PRODUCT_TOOLS,
            Arc::new(ProductManager::new(
                logger.clone(),
                validation.clone(),
                client.clone(),
            )),
        );
        Self::register(
            &mut handlers,
            DEVICE_TOOLS,
            Arc::new(DeviceManager::new(
                logger.clone(),
                validation.clone(),
                client.clone(),
                insights.clone(),
            )),
        );
        Self::register(
            &mut handlers,
            LOCATION_TOOLS,
            Arc::new(LocationManager::new(
                logger.clone(),
                validation.clone(),
                client.clone(),
            )),
        );
        Self::register(
            &mut handlers,
            HISTORY_TOOLS,
            Arc::new(HistoryManager::new(
                logger.clone(),
                validation.clone(),
                client.clone(),
            )),
        );
        Self::register(
            &mut handlers,
            PROPERTY_TOOLS,
            Arc::new(PropertyManager::new(
                logger.clone(),
                validation,
                client.clone(),
                insights,
            )),
        );
        Self::register(
            &mut handlers,
            HEALTH_TOOLS,
            Arc::new(HealthManager::new(logger.clone(), client.clone())),
        );

        Self::validate_tool_wiring(&handlers)?;
        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers));
        logger.info(
            "tools registered",
            Some(&serde_json::json!({ "count": tool_executor.tool_names().len() })),
        );
        Ok(Self {
            logger,
            tool_executor,
            client,
        })
    }
}
