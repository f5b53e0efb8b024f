//! `ServiceConfig`: the serde-deserializable surface for every key listed
//! under `spec.md` §6 ("Config"). JSON is canonical here; the
//! protobuf-JSON path named in the original distillation is a Non-goal
//! this workspace does not implement.

use serde::Deserialize;

use crate::error::ApplicationError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bootstrap: Bootstrap,
    pub runtime: RuntimeSection,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bootstrap: Bootstrap::default(),
            runtime: RuntimeSection::default(),
        }
    }
}

impl ServiceConfig {
    /// Checks the handful of constraints `spec.md` states explicitly:
    /// a listen address must be present, an explicit port must be in
    /// range, and the sample rate must fall inside `[0.0, 1.0]`.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.bootstrap.server.uri.trim().is_empty() {
            return Err(ApplicationError::InvalidConfig(
                "bootstrap.server.uri is required".to_string(),
            ));
        }
        if let Some(port) = self.bootstrap.server.port {
            if port == 0 {
                return Err(ApplicationError::InvalidConfig(
                    "bootstrap.server.port must be between 1 and 65535".to_string(),
                ));
            }
        }
        let rate = self.bootstrap.observability.trace_sample_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ApplicationError::InvalidConfig(format!(
                "bootstrap.observability.trace_sample_rate must be in [0.0, 1.0], got {rate}"
            )));
        }
        if self.bootstrap.execution.pool_executor.num_workers == 0 {
            return Err(ApplicationError::InvalidConfig(
                "bootstrap.execution.pool_executor.num_workers must be positive".to_string(),
            ));
        }
        if self.bootstrap.execution.shared_queue.num_workers == 0 {
            return Err(ApplicationError::InvalidConfig(
                "bootstrap.execution.shared_queue.num_workers must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Bootstrap {
    pub server: ServerSection,
    pub execution: ExecutionSection,
    pub observability: ObservabilitySection,
    pub dataservice: DataserviceSection,
    pub service: ServiceIdentity,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            execution: ExecutionSection::default(),
            observability: ObservabilitySection::default(),
            dataservice: DataserviceSection::default(),
            service: ServiceIdentity::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub uri: String,
    pub port: Option<u16>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { uri: "0.0.0.0:8080".to_string(), port: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    pub pool_executor: PoolExecutorSection,
    pub shared_queue: SharedQueueSection,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            pool_executor: PoolExecutorSection::default(),
            shared_queue: SharedQueueSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolExecutorSection {
    pub num_workers: usize,
}

impl Default for PoolExecutorSection {
    fn default() -> Self {
        Self { num_workers: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SharedQueueSection {
    pub num_workers: usize,
}

impl Default for SharedQueueSection {
    fn default() -> Self {
        Self { num_workers: 1024 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilitySection {
    pub service_version: String,
    pub otlp_endpoint: Option<String>,
    pub metrics_enabled: bool,
    pub tracing_enabled: bool,
    pub logging_enabled: bool,
    pub trace_sample_rate: f64,
}

impl Default for ObservabilitySection {
    fn default() -> Self {
        Self {
            service_version: "0.1.0".to_string(),
            otlp_endpoint: None,
            metrics_enabled: true,
            tracing_enabled: true,
            logging_enabled: true,
            trace_sample_rate: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataserviceSection {
    pub client: DataserviceClientSection,
}

impl Default for DataserviceSection {
    fn default() -> Self {
        Self { client: DataserviceClientSection::default() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataserviceClientSection {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub pool_size: usize,
}

impl Default for DataserviceClientSection {
    fn default() -> Self {
        Self { connect_timeout_ms: 200, request_timeout_ms: 10_000, pool_size: 1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceIdentity {
    pub name: String,
    pub environment: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self { name: "zenith-uri-shortener".to_string(), environment: "development".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    pub load_shedder: LoadShedderSection,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self { load_shedder: LoadShedderSection::default() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadShedderSection {
    pub max_concurrent_requests: usize,
}

impl Default for LoadShedderSection {
    fn default() -> Self {
        Self { max_concurrent_requests: 1000 }
    }
}
