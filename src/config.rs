// MIT License

/// Configuration for talking to a Paradox IP module.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// Hostname or IP address of the IP module (no scheme).
    pub hostname: String,
    /// Module password ("PC password" in the installer menus).
    pub module_password: String,
    /// User PIN used to authenticate panel commands.
    pub user_pin: String,
    /// Wall-clock budget for the module-initialization polling phase.
    pub init_timeout_ms: u64,
    /// Fixed wait between initialization polls.
    pub init_poll_delay_ms: u64,
    /// Delay applied before every other request (the module's embedded
    /// HTTP server misbehaves when hit back-to-back).
    pub request_delay_ms: u64,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            hostname: "192.168.1.100".to_string(),
            module_password: "paradox".to_string(),
            user_pin: "1234".to_string(),
            init_timeout_ms: 20000,
            init_poll_delay_ms: 1000,
            request_delay_ms: 0,
        }
    }
}

impl ModuleConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> ModuleConfigBuilder {
        ModuleConfigBuilder::default()
    }
}

/// Builder for ModuleConfig.
#[derive(Debug, Clone, Default)]
pub struct ModuleConfigBuilder {
    config: ModuleConfig,
}

impl ModuleConfigBuilder {
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.hostname = hostname.into();
        self
    }

    pub fn module_password(mut self, password: impl Into<String>) -> Self {
        self.config.module_password = password.into();
        self
    }

    pub fn user_pin(mut self, pin: impl Into<String>) -> Self {
        self.config.user_pin = pin.into();
        self
    }

    pub fn init_timeout_ms(mut self, ms: u64) -> Self {
        self.config.init_timeout_ms = ms;
        self
    }

    pub fn init_poll_delay_ms(mut self, ms: u64) -> Self {
        self.config.init_poll_delay_ms = ms;
        self
    }

    pub fn request_delay_ms(mut self, ms: u64) -> Self {
        self.config.request_delay_ms = ms;
        self
    }

    pub fn build(self) -> ModuleConfig {
        self.config
    }
}
