//! Composer Core 命令行入口
//!
//! # 命令概览
//!
//! - `run` - 按配置注册组件并运行完整生命周期，Ctrl+C 触发停止与关闭
//! - `plan` - 打印依赖解析结果（初始化顺序与关闭顺序）
//! - `check-config` - 验证配置文件
//! - `version` - 显示版本信息
//!
//! # 使用示例
//!
//! ```bash
//! composer-core -c composer.yaml plan
//! composer-core -c composer.yaml -l debug run
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};

use composer_core::{
    CoreConfig, DependencyResolver, FnListener, LifecycleContext, LifecycleEvent,
    LifecycleManager, Logger, LoggerConfig,
};

/// Composer Core - 组件组合内核
#[derive(Parser)]
#[command(name = "composer-core")]
#[command(version, about = "组件依赖解析与生命周期管理", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "composer.yaml", global = true)]
    config: PathBuf,

    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// 子命令
    #[command(subcommand)]
    command: Option<Commands>,
}

/// 可用的子命令
#[derive(Subcommand)]
enum Commands {
    /// 运行组件生命周期
    ///
    /// 依次执行 Initialize 与 Start，收到 Ctrl+C 后执行 Stop 与 Shutdown。
    Run,

    /// 打印依赖解析结果
    Plan,

    /// 验证配置文件
    CheckConfig {
        /// 配置文件路径（不指定则使用全局 -c 选项）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 查看版本信息
    Version,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run) | None => {
            let mut config = load_config(&cli.config).await?;
            if let Some(level) = cli.log_level {
                config.logging.level = level;
            }
            let _guard = Logger::init(LoggerConfig::from_log_config(&config.logging))?;
            run(config).await?;
        }
        Some(Commands::Plan) => {
            let config = load_config(&cli.config).await?;
            print_plan(&config)?;
        }
        Some(Commands::CheckConfig { config }) => {
            let path = config.unwrap_or(cli.config);
            check_config(&path).await?;
        }
        Some(Commands::Version) => {
            print_version();
        }
    }

    Ok(())
}

/// 加载配置文件，文件不存在时使用默认配置
async fn load_config(path: &Path) -> CliResult<CoreConfig> {
    if path.exists() {
        Ok(CoreConfig::from_file(path).await?)
    } else {
        eprintln!("配置文件不存在 ({})，使用默认配置", path.display());
        Ok(CoreConfig::default())
    }
}

/// 运行完整生命周期
async fn run(config: CoreConfig) -> CliResult<()> {
    let manager = LifecycleManager::with_config(config.lifecycle.clone());
    manager.register_components(config.components).await?;
    manager
        .add_lifecycle_listener(Arc::new(FnListener::new(|event: &LifecycleEvent| {
            match &event.error {
                Some(err) => warn!(
                    event_id = %event.event_id,
                    component = %event.component,
                    status = %event.status,
                    error = %err,
                    "生命周期事件"
                ),
                None => info!(
                    event_id = %event.event_id,
                    component = %event.component,
                    status = %event.status,
                    "生命周期事件"
                ),
            }
            Ok(())
        })))
        .await;

    let ctx = LifecycleContext::new();

    if let Err(e) = startup(&manager, &ctx).await {
        error!(error_code = e.error_code(), error = %e, "启动失败，执行关闭");
        manager.shutdown(&ctx).await?;
        return Err(Box::new(e));
    }

    info!(components = manager.list_components().await.len(), "全部组件已启动，按 Ctrl+C 关闭");
    signal::ctrl_c().await?;
    info!("收到关闭信号，正在停止组件...");

    if let Err(e) = manager.stop(&ctx).await {
        error!(error_code = e.error_code(), error = %e, "停止失败");
    }
    manager.shutdown(&ctx).await?;

    let stats = manager.dispatch_stats();
    info!(
        dispatched = stats.dispatched,
        failed = stats.failed,
        timeouts = stats.timeouts,
        dropped = stats.dropped,
        "已关闭"
    );
    Ok(())
}

async fn startup(manager: &LifecycleManager, ctx: &LifecycleContext) -> composer_core::Result<()> {
    manager.initialize(ctx).await?;
    manager.start(ctx).await
}

/// 打印初始化顺序与关闭顺序
fn print_plan(config: &CoreConfig) -> CliResult<()> {
    let mut resolver = DependencyResolver::new();
    let order = match resolver.resolve_dependencies(&config.components) {
        Ok(order) => order,
        Err(e) => {
            println!("❌ 依赖解析失败 [{}]: {}", e.error_code(), e);
            return Err(Box::new(e));
        }
    };

    println!();
    println!("初始化 / 启动顺序:");
    for (i, component) in order.iter().enumerate() {
        if component.dependencies.is_empty() {
            println!("  {:>3}. {}", i + 1, component.name);
        } else {
            println!(
                "  {:>3}. {}  (依赖: {})",
                i + 1,
                component.name,
                component.dependencies.join(", ")
            );
        }
    }
    println!();
    println!("停止 / 关闭顺序:");
    for (i, component) in order.iter().rev().enumerate() {
        println!("  {:>3}. {}", i + 1, component.name);
    }
    println!();
    Ok(())
}

/// 检查配置文件
async fn check_config(path: &Path) -> CliResult<()> {
    println!("检查配置文件: {}", path.display());
    println!();

    let config = match CoreConfig::from_file(path).await {
        Ok(config) => config,
        Err(e) => {
            println!("❌ 配置文件无效: {}", e);
            return Err(Box::new(e));
        }
    };

    println!("✅ 配置文件有效！");
    println!();
    println!("解析后的配置:");
    println!("────────────────────────────────────────");
    print!("{}", serde_yaml::to_string(&config)?);
    println!("────────────────────────────────────────");

    if let Err(e) = DependencyResolver::new().validate_dependencies(&config.components) {
        println!("⚠️  依赖关系无效: {}", e);
    }
    Ok(())
}

/// 打印版本信息
fn print_version() {
    println!();
    println!("Composer Core - 组件组合内核");
    println!("═══════════════════════════════════════");
    println!("  版本:     {}", composer_core::VERSION);
    println!("  目标平台: {}", std::env::consts::ARCH);
    println!("  操作系统: {}", std::env::consts::OS);
    println!("═══════════════════════════════════════");
    println!();
}
