use crate::config::{ConfigError, Settings};
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "rucase.toml";

    /// 指定配置文件路径的环境变量
    const CONFIG_ENV: &'static str = "RUCASE_CONFIG";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        let mut settings: Settings = toml::from_str(&content)?;
        for value in settings.api_envi.hosts.values_mut() {
            *value = Self::resolve_env_vars(value);
        }
        Ok(settings)
    }

    /// 加载配置
    /// 查找顺序：
    /// 1. 显式传入的路径
    /// 2. RUCASE_CONFIG 环境变量
    /// 3. 当前目录及父目录
    /// 4. 用户配置目录 ~/.config/rucase/
    /// 5. 默认配置
    pub fn load(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
        if let Some(path) = explicit {
            info!("Loading config from {}", path.display());
            return Self::load_from_path(path);
        }

        if let Ok(path) = std::env::var(Self::CONFIG_ENV) {
            info!("Loading config from ${} = {}", Self::CONFIG_ENV, path);
            return Self::load_from_path(path);
        }

        match Self::find_and_load() {
            Some(settings) => Ok(settings),
            None => {
                debug!("No {} found, using defaults", Self::CONFIG_FILE);
                Ok(Settings::default())
            }
        }
    }

    /// 查找并加载配置文件
    pub fn find_and_load() -> Option<Settings> {
        Self::try_load_from_current_dir().or_else(Self::try_load_from_user_dir)
    }

    /// 尝试从当前目录及其父目录加载
    fn try_load_from_current_dir() -> Option<Settings> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                debug!("Found config at {}", config_path.display());
                return Self::load_from_path(&config_path).ok();
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// 尝试从用户配置目录加载
    fn try_load_from_user_dir() -> Option<Settings> {
        let home = dirs::home_dir()?;
        let config_path = home.join(".config").join("rucase").join(Self::CONFIG_FILE);

        if config_path.exists() {
            Self::load_from_path(&config_path).ok()
        } else {
            None
        }
    }

    /// 解析并替换系统环境变量 ${VAR}
    ///
    /// 只匹配全大写变量名，`${func(args)}` 形式的占位符保持原样
    pub fn resolve_env_vars(text: &str) -> String {
        static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = ENV_REGEX.get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

        re.replace_all(text, |caps: &Captures| {
            let env_name = &caps[1];
            std::env::var(env_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
    }
}
