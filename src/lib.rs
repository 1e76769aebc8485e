// ==========================================
// 建筑能耗模型转换系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 批量模型转换引擎 (上游审计模型 → 模拟引擎输入模型)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 映射配置层 - 声明式字段映射表
pub mod mapping;

// 解析层 - 源模型文件解析
pub mod parser;

// 转换管道层 - 分阶段转换引擎
pub mod pipeline;

// 批处理层 - 并行批量转换
pub mod batch;

// 数据仓储层 - 转换结果台账
pub mod repository;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ComponentType, ErrorCategory, OutcomeStatus, TranslationMode, WarningLevel};

// 领域实体
pub use domain::{
    DocNode, OutcomeRecord, SourceDocument, TargetDocument, TranslationOutcome, TranslationWarning,
};

// 映射配置
pub use mapping::{ConfigError, MappingRegistry, MappingRule};

// 转换管道
pub use pipeline::{
    AssemblyError, AssemblyStage, ModelState, TranslationError, TranslationPipeline,
};

// 批处理
pub use batch::{BatchJob, BatchOptions, BatchSummary, CancelHandle, InputSelection};

// 仓储
pub use repository::{OutcomeRecordRepository, OutcomeRecordRepositoryImpl, StoreError};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "建筑能耗模型转换系统";

// 结果数据库文件名（固定落在输出目录下）
pub const RESULTS_DB_FILENAME: &str = "processing_results.db";
