// ==========================================
// 建筑能耗模型转换系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、文档树结构
// 红线: 不含数据访问逻辑,不含转换引擎逻辑
// ==========================================

pub mod document;
pub mod outcome;
pub mod types;

// 重导出核心类型
pub use document::{DocNode, SourceDocument, TargetDocument};
pub use outcome::{
    BatchSummary, FailureBreakdownRow, OutcomeRecord, TranslationOutcome, TranslationWarning,
};
pub use types::{ComponentType, ErrorCategory, OutcomeStatus, TranslationMode, WarningLevel};
