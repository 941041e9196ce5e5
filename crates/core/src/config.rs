use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// 系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 部署环境名称，写入失败记录
    pub environment: String,
    /// 版本号，写入失败记录
    pub version: String,
    pub dispatcher: DispatcherConfig,
    pub observability: ObservabilityConfig,
}

/// 调度循环配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub enabled: bool,
    /// 调度周期（秒），首个周期在启动时立即执行
    pub tick_interval_seconds: u64,
    /// 到期窗口向后回看的小时数，用于补发停机期间错过的任务
    pub lookback_hours: i64,
    /// 到期窗口向前预看的小时数
    pub lookahead_hours: i64,
    /// 节律评估使用的固定时区偏移（分钟）
    pub utc_offset_minutes: i32,
    /// 按周一至周日划分周边界（周日视为第7天）
    pub end_week_on_sunday: bool,
}

/// 可观测性配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String, // "pretty" 或 "json"
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            dispatcher: DispatcherConfig {
                enabled: true,
                tick_interval_seconds: 60,
                lookback_hours: 24,
                lookahead_hours: 1,
                utc_offset_minutes: 60,
                end_week_on_sunday: true,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: "pretty".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置
    ///
    /// 优先读取指定路径，否则依次尝试约定路径；没有配置文件时
    /// 使用内置默认值。环境变量 `SURVEY_SCHEDULER_*` 始终可以覆盖
    /// 文件中的取值。
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/survey-scheduler.toml",
                "survey-scheduler.toml",
                "/etc/survey-scheduler/config.toml",
            ];

            let mut config_file_found = false;
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    config_file_found = true;
                    break;
                }
            }

            if !config_file_found {
                builder = builder
                    .set_default("environment", "development")?
                    .set_default("version", env!("CARGO_PKG_VERSION"))?
                    .set_default("dispatcher.enabled", true)?
                    .set_default("dispatcher.tick_interval_seconds", 60)?
                    .set_default("dispatcher.lookback_hours", 24)?
                    .set_default("dispatcher.lookahead_hours", 1)?
                    .set_default("dispatcher.utc_offset_minutes", 60)?
                    .set_default("dispatcher.end_week_on_sunday", true)?
                    .set_default("observability.log_level", "info")?
                    .set_default("observability.log_format", "pretty")?;
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SURVEY_SCHEDULER")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("解析配置失败")?;

        Ok(config)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if self.dispatcher.tick_interval_seconds == 0 {
            return Err(anyhow::anyhow!("dispatcher.tick_interval_seconds 必须大于0"));
        }
        if self.dispatcher.lookback_hours < 0 || self.dispatcher.lookahead_hours < 0 {
            return Err(anyhow::anyhow!("到期窗口的小时数不能为负"));
        }
        if self.dispatcher.timezone().is_none() {
            return Err(anyhow::anyhow!(
                "无效的UTC偏移: {} 分钟",
                self.dispatcher.utc_offset_minutes
            ));
        }
        match self.observability.log_format.as_str() {
            "pretty" | "json" => {}
            other => return Err(anyhow::anyhow!("不支持的日志格式: {other}")),
        }
        Ok(())
    }
}

impl DispatcherConfig {
    /// 节律评估使用的固定偏移时区，偏移超出 ±14 小时返回 `None`
    pub fn timezone(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
    }
}

/// 配置加载器，提供便捷的配置加载方法
pub struct ConfigLoader;

impl ConfigLoader {
    /// 根据环境加载配置
    ///
    /// 优先级：
    /// 1. 环境变量 SURVEY_SCHEDULER_CONFIG_PATH 指定的配置文件
    /// 2. 环境变量 SURVEY_SCHEDULER_ENV 指定的环境配置文件
    /// 3. 默认配置文件
    pub fn load() -> Result<AppConfig> {
        if let Ok(config_path) = env::var("SURVEY_SCHEDULER_CONFIG_PATH") {
            return AppConfig::load(Some(&config_path))
                .with_context(|| format!("加载指定配置文件失败: {config_path}"));
        }

        let env_name = env::var("SURVEY_SCHEDULER_ENV").unwrap_or_else(|_| "development".to_string());
        let config_file = format!("config/{env_name}.toml");

        if Path::new(&config_file).exists() {
            AppConfig::load(Some(&config_file))
                .with_context(|| format!("加载环境配置文件失败: {config_file}"))
        } else {
            AppConfig::load(None).context("加载默认配置失败")
        }
    }

    /// 加载并校验配置
    pub fn load_and_validate() -> Result<AppConfig> {
        let config = Self::load()?;
        config.validate().context("配置验证失败")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dispatcher.tick_interval_seconds, 60);
        assert_eq!(config.dispatcher.lookback_hours, 24);
        assert_eq!(config.dispatcher.lookahead_hours, 1);
        assert!(config.dispatcher.end_week_on_sunday);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
environment = "staging"
version = "2.3.1"

[dispatcher]
enabled = true
tick_interval_seconds = 30
lookback_hours = 12
lookahead_hours = 2
utc_offset_minutes = 0
end_week_on_sunday = false

[observability]
log_level = "debug"
log_format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.environment, "staging");
        assert_eq!(config.dispatcher.tick_interval_seconds, 30);
        assert_eq!(config.dispatcher.lookback_hours, 12);
        assert!(!config.dispatcher.end_week_on_sunday);
        assert_eq!(config.observability.log_format, "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Some("/nonexistent/config.toml")).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = AppConfig::default();
        config.dispatcher.tick_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_offset() {
        let mut config = AppConfig::default();
        config.dispatcher.utc_offset_minutes = 15 * 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = AppConfig::default();
        config.observability.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timezone_helper() {
        let config = AppConfig::default();
        let tz = config.dispatcher.timezone().unwrap();
        assert_eq!(tz.local_minus_utc(), 3600);
    }
}
