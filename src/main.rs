// ==========================================
// 建筑能耗模型转换系统 - 命令行入口
// ==========================================
// 定位: 薄封装,只负责参数接线 + 日志初始化 + 退出码
// 退出码: 0 = 全部成功; 1 = 存在失败/未入账; 2 = 作业级致命错误
// ==========================================

use bem_translator::{
    logging, BatchJob, BatchOptions, InputSelection, MappingRegistry, TranslationMode,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logging::init();

    info!("==================================================");
    info!("{} - 批量转换引擎", bem_translator::APP_NAME);
    info!("系统版本: {}", bem_translator::VERSION);
    info!("==================================================");

    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    if positional.len() < 2 {
        eprintln!("用法: bem-translator <输入文件或目录> <输出目录> [工作任务数] [--reference]");
        return 2;
    }

    let input_path = PathBuf::from(positional[0]);
    let output_dir = PathBuf::from(positional[1]);
    let worker_count = positional.get(2).and_then(|s| s.parse::<usize>().ok());
    let mode = if args.iter().any(|a| a == "--reference") {
        TranslationMode::Reference
    } else {
        TranslationMode::AsBuilt
    };

    // 映射表在处理任何文件之前加载;坏表直接终止
    let registry = match MappingRegistry::load_embedded() {
        Ok(registry) => Arc::new(registry),
        Err(err) => {
            error!(error = %err, "映射表加载失败,作业终止");
            return 2;
        }
    };

    let inputs = if input_path.is_dir() {
        InputSelection::Directory(input_path)
    } else {
        InputSelection::Files(vec![input_path])
    };

    let options = BatchOptions {
        mode,
        worker_count,
        ..BatchOptions::default()
    };
    let job = BatchJob::new(registry, options);

    // Ctrl-C → 协作式取消
    let cancel = job.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("收到中断信号,停止取新文件");
            cancel.cancel();
        }
    });

    match job.run(inputs, &output_dir).await {
        Ok(summary) => {
            info!(
                total = summary.total,
                succeeded = summary.succeeded,
                failed = summary.failed,
                unrecorded = summary.unrecorded,
                "作业结束"
            );
            for row in &summary.failure_breakdown {
                info!(
                    error_type = %row.error_type,
                    error_category = %row.error_category,
                    count = row.count,
                    "失败归因"
                );
            }
            if summary.all_succeeded() {
                0
            } else {
                1
            }
        }
        Err(err) => {
            error!(error = %err, "作业级错误");
            2
        }
    }
}
