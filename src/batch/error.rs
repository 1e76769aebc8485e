// ==========================================
// 建筑能耗模型转换系统 - 批处理层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 语义: 仅作业级致命错误;单文件失败归一化为 Failure 结果,不在此列
// ==========================================

use crate::repository::StoreError;
use thiserror::Error;

/// 批处理作业级错误
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("输入发现失败: {0}")]
    Discovery(String),

    #[error("输出目录创建失败: {0}")]
    OutputDir(String),

    #[error("台账存储打开失败: {0}")]
    StoreOpen(#[from] StoreError),
}

/// Result 类型别名
pub type BatchResult<T> = Result<T, BatchError>;
