use super::parsing::{
    env_optional, env_or_default, parse_base_url, parse_bool, parse_environment,
    parse_optional_u64, parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, RuntimeSettings, SessionSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("EXAM_PLAYER_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("EXAM_PLAYER_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let base_url =
            parse_base_url(env_or_default("EXAM_API_BASE_URL", "http://localhost:8000/api"))?;
        let token = env_optional("EXAM_API_TOKEN");
        let request_timeout_seconds = parse_u64(
            "EXAM_API_TIMEOUT_SECONDS",
            env_or_default("EXAM_API_TIMEOUT_SECONDS", "30"),
        )?;
        let connect_timeout_seconds = parse_u64(
            "EXAM_API_CONNECT_TIMEOUT_SECONDS",
            env_or_default("EXAM_API_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;

        let low_time_warning_seconds = parse_u64(
            "EXAM_LOW_TIME_WARNING_SECONDS",
            env_or_default("EXAM_LOW_TIME_WARNING_SECONDS", "60"),
        )?;
        let shuffle_seed =
            parse_optional_u64("EXAM_SHUFFLE_SEED", env_optional("EXAM_SHUFFLE_SEED"))?;

        let log_level = env_or_default("EXAM_PLAYER_LOG_LEVEL", "info");
        let json = env_optional("EXAM_PLAYER_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let metrics_enabled = env_optional("EXAM_PLAYER_METRICS")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings {
                base_url,
                token,
                request_timeout_seconds,
                connect_timeout_seconds,
            },
            session: SessionSettings { low_time_warning_seconds, shuffle_seed },
            telemetry: TelemetrySettings { log_level, json, metrics_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Overrides the shuffle seed, e.g. from a command line flag.
    pub(crate) fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        if seed.is_some() {
            self.session.shuffle_seed = seed;
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_API_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.api.token.is_none() {
            return Err(ConfigError::MissingSecret("EXAM_API_TOKEN"));
        }
        if !self.api.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(self.api.base_url.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
impl Settings {
    pub(crate) fn for_tests(base_url: &str) -> Self {
        Self {
            runtime: RuntimeSettings {
                environment: super::types::Environment::Test,
                strict_config: false,
            },
            api: ApiSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                token: Some("test-token".to_string()),
                request_timeout_seconds: 5,
                connect_timeout_seconds: 1,
            },
            session: SessionSettings { low_time_warning_seconds: 60, shuffle_seed: Some(7) },
            telemetry: TelemetrySettings {
                log_level: "debug".to_string(),
                json: false,
                metrics_enabled: false,
            },
        }
    }

    pub(crate) fn with_metrics_enabled(mut self) -> Self {
        self.telemetry.metrics_enabled = true;
        self
    }
}
