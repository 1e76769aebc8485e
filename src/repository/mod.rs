// ==========================================
// 建筑能耗模型转换系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供台账数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod outcome_repo;

// 重导出核心仓储
pub use error::{StoreError, StoreResult};
pub use outcome_repo::{OutcomeRecordRepository, OutcomeRecordRepositoryImpl};
