// ==========================================
// 建筑能耗模型转换系统 - 映射配置错误类型
// ==========================================
// 工具: thiserror 派生宏
// 语义: 任一映射表损坏都会污染后续所有转换,必须在处理任何文件之前终止
// ==========================================

use thiserror::Error;

/// 映射配置错误类型（进程启动期致命错误）
#[derive(Error, Debug)]
pub enum ConfigError {
    // ===== 表结构错误 =====
    #[error("映射表解析失败 (表 {table}): {message}")]
    MalformedTable { table: String, message: String },

    #[error("映射字段重复 (表 {domain}): {field}")]
    DuplicateField { domain: String, field: String },

    #[error("枚举键重复 (表 {domain}, 枚举 {table}): {key}")]
    DuplicateEnumKey {
        domain: String,
        table: String,
        key: String,
    },

    #[error("枚举表未定义 (表 {domain}, 字段 {field}): {table}")]
    UnknownEnumTable {
        domain: String,
        field: String,
        table: String,
    },

    // ===== 规则属性错误 =====
    #[error("映射规则非法 (表 {domain}, 字段 {field}): {message}")]
    InvalidRule {
        domain: String,
        field: String,
        message: String,
    },

    #[error("默认值无法通过自身转换规则 (表 {domain}, 字段 {field}): {message}")]
    InvalidDefault {
        domain: String,
        field: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
