use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 优先级：ENV > config.toml > 默认值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub limiter: LimiterConfig,
    #[serde(default)]
    pub code: CodeConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// ENV 前缀：LG，分隔符：__
    /// 示例：LG__SERVER__PORT=9999
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("LG")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Sanity checks that would otherwise surface as confusing runtime behaviour.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.code.length == 0 {
            problems.push("code.length must be greater than 0".to_string());
        }
        if self.code.max_attempts == 0 {
            problems.push("code.max_attempts must be greater than 0".to_string());
        }
        if !(self.filter.false_positive_rate > 0.0 && self.filter.false_positive_rate < 1.0) {
            problems.push(format!(
                "filter.false_positive_rate must be in (0, 1), got {}",
                self.filter.false_positive_rate
            ));
        }
        for (name, bucket) in [("global", &self.limiter.global), ("api", &self.limiter.api)] {
            if bucket.capacity == 0 || bucket.refill_per_second == 0 {
                problems.push(format!(
                    "limiter.{}: capacity and refill_per_second must be greater than 0",
                    name
                ));
            }
        }
        if self.stats.workers == 0 || self.stats.queue_capacity == 0 {
            problems.push("stats.workers and stats.queue_capacity must be greater than 0".into());
        }
        match self.cache.distributed.backend.as_str() {
            "redis" | "memory" => {}
            other => problems.push(format!(
                "cache.distributed.backend '{}' is not supported (redis, memory)",
                other
            )),
        }

        problems
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// Base used to build `short_url` in create responses. Empty means
    /// `http://<Host header>`.
    #[serde(default)]
    pub public_base_url: String,
    /// 301 instead of 302 for redirects
    #[serde(default)]
    pub permanent_redirect: bool,
    /// Extra proxies whose `X-Forwarded-For` is trusted besides private addresses
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_database_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_database_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 缓存系统配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub local: LocalCacheConfig,
    #[serde(default)]
    pub distributed: DistributedCacheConfig,
}

/// 进程内缓存（L1）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCacheConfig {
    /// TTL used when backfilling from L2 or L3
    #[serde(default = "default_backfill_ttl")]
    pub backfill_ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// 0 表示不限制
    #[serde(default)]
    pub max_entries: usize,
}

/// 分布式缓存（L2）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedCacheConfig {
    /// "redis" 或 "memory"
    #[serde(default = "default_distributed_backend")]
    pub backend: String,
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,
    /// Connections unused for longer than this are closed by the reaper
    #[serde(default = "default_redis_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_redis_max_lifetime")]
    pub max_lifetime_secs: u64,
    /// memory 后端的容量上限
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: u64,
}

/// 存在性过滤器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_filter_expected_items")]
    pub expected_items: usize,
    #[serde(default = "default_filter_fp_rate")]
    pub false_positive_rate: f64,
}

/// 令牌桶参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    pub capacity: u32,
    pub refill_per_second: u32,
}

/// 准入限流
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    #[serde(default = "default_global_bucket")]
    pub global: BucketConfig,
    #[serde(default = "default_api_bucket")]
    pub api: BucketConfig,
    #[serde(default = "default_limiter_sweep_interval")]
    pub sweep_interval_secs: u64,
}

/// 短码生成
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    #[serde(default = "default_code_length")]
    pub length: usize,
    #[serde(default = "default_code_max_attempts")]
    pub max_attempts: u32,
    /// Use a content-derived candidate for the last attempt
    #[serde(default = "default_true")]
    pub content_fallback: bool,
}

/// 访问统计异步写回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_stats_workers")]
    pub workers: usize,
    #[serde(default = "default_stats_batch_size")]
    pub batch_size: usize,
}

/// 过期链接清理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_reaper_interval")]
    pub interval_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_true")]
    pub enable_rotation: bool,
    /// Rotated files kept on disk
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
}

// ============================================================
// Default value functions
// ============================================================

fn default_true() -> bool {
    true
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "linkgate.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_min_connections() -> u32 {
    1
}

fn default_database_timeout() -> u64 {
    30
}

fn default_database_idle_timeout() -> u64 {
    300
}

fn default_database_max_lifetime() -> u64 {
    3600
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_backfill_ttl() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    5 * 60
}

fn default_distributed_backend() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "linkgate:".to_string()
}

fn default_redis_pool_size() -> usize {
    16
}

fn default_redis_idle_timeout() -> u64 {
    300
}

fn default_redis_max_lifetime() -> u64 {
    3600
}

fn default_memory_capacity() -> u64 {
    100_000
}

fn default_filter_expected_items() -> usize {
    1_000_000
}

fn default_filter_fp_rate() -> f64 {
    0.01
}

fn default_global_bucket() -> BucketConfig {
    BucketConfig {
        capacity: 2000,
        refill_per_second: 1000,
    }
}

fn default_api_bucket() -> BucketConfig {
    BucketConfig {
        capacity: 200,
        refill_per_second: 100,
    }
}

fn default_limiter_sweep_interval() -> u64 {
    60
}

fn default_code_length() -> usize {
    7
}

fn default_code_max_attempts() -> u32 {
    5
}

fn default_stats_queue_capacity() -> usize {
    10_000
}

fn default_stats_workers() -> usize {
    4
}

fn default_stats_batch_size() -> usize {
    64
}

fn default_reaper_interval() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> usize {
    5
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            public_base_url: String::new(),
            permanent_redirect: false,
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            min_connections: default_database_min_connections(),
            timeout: default_database_timeout(),
            idle_timeout_secs: default_database_idle_timeout(),
            max_lifetime_secs: default_database_max_lifetime(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            backfill_ttl_secs: default_backfill_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            max_entries: 0,
        }
    }
}

impl Default for DistributedCacheConfig {
    fn default() -> Self {
        Self {
            backend: default_distributed_backend(),
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
            pool_size: default_redis_pool_size(),
            idle_timeout_secs: default_redis_idle_timeout(),
            max_lifetime_secs: default_redis_max_lifetime(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            expected_items: default_filter_expected_items(),
            false_positive_rate: default_filter_fp_rate(),
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            global: default_global_bucket(),
            api: default_api_bucket(),
            sweep_interval_secs: default_limiter_sweep_interval(),
        }
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            length: default_code_length(),
            max_attempts: default_code_max_attempts(),
            content_fallback: true,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_stats_queue_capacity(),
            workers: default_stats_workers(),
            batch_size: default_stats_batch_size(),
        }
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_reaper_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            enable_rotation: true,
            max_backups: default_max_backups(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StaticConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.code.length, 7);
        assert_eq!(config.code.max_attempts, 5);
        assert_eq!(config.cache.local.backfill_ttl_secs, 1800);
        assert_eq!(config.cache.local.sweep_interval_secs, 300);
    }

    #[test]
    fn test_validate_reports_bad_values() {
        let mut config = StaticConfig::default();
        config.filter.false_positive_rate = 1.5;
        config.limiter.api.capacity = 0;
        config.cache.distributed.backend = "memcached".into();
        let problems = config.validate();
        assert_eq!(problems.len(), 3, "{:?}", problems);
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.limiter.global.capacity, 2000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [limiter.api]
            capacity = 2
            refill_per_second = 1
            "#,
        )
        .unwrap();
        assert_eq!(parsed.limiter.api.capacity, 2);
        assert_eq!(parsed.limiter.global.capacity, 2000);
        assert_eq!(parsed.stats.workers, 4);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[server]\nport = 9123\n").unwrap();
        let config = StaticConfig::load(path.to_str().unwrap());
        assert_eq!(config.server.port, 9123);
    }
}
