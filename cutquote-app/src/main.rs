use std::path::PathBuf;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use cutquote_config::{AppConfig, ConfigError};
use cutquote_engine::Measurer;
use cutquote_io::{DocumentLoader, DxfFacade};

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut pretty = false;
    let mut input: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            "--pretty" => pretty = true,
            other if other.starts_with('-') => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
            path => {
                if input.is_some() {
                    eprintln!("只接受一个输入文件");
                    std::process::exit(1);
                }
                input = Some(PathBuf::from(path));
            }
        }
    }

    let Some(input) = input else {
        eprintln!("用法：cutquote-app [--config <path>] [--pretty] <file.dxf>");
        std::process::exit(1);
    };

    let config = load_configuration(config_override);
    init_logging(&config);
    info!(path = %input.display(), "开始度量 DXF 文件");

    if let Err(message) = validate_input(&input) {
        error!(path = %input.display(), "{message}");
        std::process::exit(1);
    }

    let document = match DxfFacade::new().load(&input) {
        Ok(document) => document,
        Err(err) => {
            error!(path = %input.display(), error = %err, "加载 DXF 文档失败");
            std::process::exit(1);
        }
    };

    let measurer = match build_measurer(&config) {
        Ok(measurer) => measurer,
        Err(err) => {
            error!(error = %err, "配置的度量公差非法");
            std::process::exit(1);
        }
    };

    let result = measurer.measure(document.entities().map(|(_, entity)| entity));
    info!(
        length = result.total_length,
        piercing = result.piercing_count,
        "度量完成"
    );

    let rendered = if pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(err) => {
            error!(error = %err, "序列化度量结果失败");
            std::process::exit(1);
        }
    }
}

fn validate_input(path: &std::path::Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("文件不存在：{}", path.display()));
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("dxf") => {}
        Some("dwg") => {
            return Err("暂不支持 DWG 格式，请先在 CAD 软件中另存为 DXF".to_string());
        }
        _ => {
            return Err("只接受 .dxf 文件".to_string());
        }
    }
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.len() == 0 => Err("输入文件为空".to_string()),
        Ok(_) => Ok(()),
        Err(err) => Err(format!("无法读取文件元信息：{err}")),
    }
}

fn build_measurer(config: &AppConfig) -> Result<Measurer, cutquote_engine::errors::EngineError> {
    Measurer::new()
        .with_spline_tolerance(config.measure.spline_tolerance)?
        .with_ellipse_closure_tolerance(config.measure.ellipse_closure_tolerance)
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
