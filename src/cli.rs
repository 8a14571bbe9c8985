use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, Table};
use rucase::case::{CaseExpander, CaseLoader, keys};
use rucase::config::{ConfigLoader, Settings};
use rucase::http::Client;
use rucase::report::{LogReporter, Reporter};
use rucase::runner::{CaseExecutor, CaseRunner, TestReporter};
use rucase::store::ExtractStore;
use rucase::utils::pretty_json;
use rucase::utils::value::to_text;
use serde_json::Value;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径，默认查找 rucase.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 输出详细日志和完整响应
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 按顺序执行用例文件
    Run {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 前置用例文件（如登录），失败时中止
        #[arg(long)]
        setup: Option<PathBuf>,
    },

    /// 查看用例文件展开后的用例
    Expand { file: PathBuf },

    /// 查看或清空提取存储
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
pub enum StoreAction {
    /// 显示全部数据
    Show,
    /// 读取一个 key
    Get { key: String, subkey: Option<String> },
    /// 清空
    Clear,
}

/// 执行命令，返回是否全部通过
pub async fn execute(cli: Cli) -> Result<bool> {
    let settings = ConfigLoader::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Run { files, setup } => run_cases(settings, &files, setup.as_deref(), cli.verbose).await,
        Commands::Expand { file } => {
            print_expanded(&settings, &file)?;
            Ok(true)
        }
        Commands::Store { action } => {
            handle_store(&settings, action)?;
            Ok(true)
        }
    }
}

async fn run_cases(
    settings: Settings,
    files: &[PathBuf],
    setup: Option<&Path>,
    verbose: bool,
) -> Result<bool> {
    let settings = Arc::new(settings);
    let store = Arc::new(ExtractStore::from_settings(&settings.store));
    let client = Client::new(&settings.request)?.with_store(Arc::clone(&store));
    let reporter: Arc<dyn Reporter> = Arc::new(LogReporter);

    let runner = CaseRunner::new(Arc::clone(&settings), client, Arc::clone(&store), reporter);
    let expander = CaseExpander::from_settings(&settings.request);
    let executor = CaseExecutor::new(runner, expander, store, TestReporter::new(verbose));

    let (_, summary) = executor.run_session(setup, files).await?;
    Ok(summary.all_passed())
}

fn print_expanded(settings: &Settings, file: &Path) -> Result<()> {
    let expander = CaseExpander::from_settings(&settings.request);
    let variants = CaseLoader::collect(file, &expander)
        .with_context(|| format!("failed to load {}", file.display()))?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "API", "Case", "Method", "Payload", "Validation"]);

    for (index, variant) in variants.iter().enumerate() {
        let payload = keys::PAYLOAD_KEYS
            .iter()
            .filter_map(|k| variant.case.get(*k).map(|v| format!("{}: {}", k, v)))
            .collect::<Vec<_>>()
            .join("\n");
        let validation = variant
            .case
            .get(keys::VALIDATION)
            .map(Value::to_string)
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&variant.base_info.api_name).add_attribute(Attribute::Dim),
            Cell::new(variant.name()),
            Cell::new(variant.method().unwrap_or("-")).fg(Color::Cyan),
            Cell::new(payload),
            Cell::new(validation),
        ]);
    }

    println!("{}", table);
    println!("{} case(s)", variants.len());
    Ok(())
}

fn handle_store(settings: &Settings, action: StoreAction) -> Result<()> {
    let store = ExtractStore::from_settings(&settings.store);

    match action {
        StoreAction::Show => {
            let snapshot = store.snapshot()?;
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["Key", "Value"]);
            for (key, value) in &snapshot {
                let text = to_text(value);
                let cell = if text.starts_with("NOT_FOUND") {
                    Cell::new(text).fg(Color::Red)
                } else {
                    Cell::new(text)
                };
                table.add_row(vec![Cell::new(key), cell]);
            }
            println!("{}", table);
        }
        StoreAction::Get { key, subkey } => {
            let value = store.read(&key, subkey.as_deref())?;
            println!("{}", pretty_json(&value));
        }
        StoreAction::Clear => {
            store.clear()?;
            println!("Cleared {}", store.path().display());
        }
    }
    Ok(())
}
