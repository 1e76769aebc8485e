// ==========================================
// 建筑能耗模型转换系统 - 运行上下文 (ModelState)
// ==========================================
// 职责: 单次转换运行的可变上下文(部件计数器 + 警告 + 跨阶段派生值)
// 红线: 每次 PipelineRun 恰好一个实例,线程封闭,绝不跨运行/跨线程共享
// ==========================================

use crate::domain::outcome::TranslationWarning;
use crate::domain::types::ComponentType;
use std::collections::HashMap;

// ==========================================
// DerivedValues - 跨阶段派生标量
// ==========================================
// 由早期阶段写入,供后续阶段读取(如 Systems 读 Enclosure 算出的面积)
#[derive(Debug, Clone, Default)]
pub struct DerivedValues {
    /// 采暖楼面面积 (m2)
    pub conditioned_floor_area_m2: Option<f64>,
    /// 层数
    pub storey_count: Option<u32>,
    /// 墙体总面积 (m2),Enclosure 阶段累计
    pub total_wall_area_m2: f64,
    /// 窗户总面积 (m2),Enclosure 阶段累计
    pub total_window_area_m2: f64,
    /// 顶棚总面积 (m2),Enclosure 阶段累计
    pub total_ceiling_area_m2: f64,
    /// 基础占地面积 (m2)
    pub foundation_area_m2: Option<f64>,
}

// ==========================================
// ModelState - 运行上下文
// ==========================================

#[derive(Debug, Default)]
pub struct ModelState {
    indices: HashMap<ComponentType, u32>,
    warnings: Vec<TranslationWarning>,
    pub derived: DerivedValues,
}

impl ModelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取下一个部件编号(按类型,从 1 开始,运行内严格递增,绝不重置)
    pub fn next_index(&mut self, component_type: ComponentType) -> u32 {
        let counter = self.indices.entry(component_type).or_insert(0);
        *counter += 1;
        *counter
    }

    /// 记录警告(可恢复的领域异常,只记录不抛出)
    pub fn add_warning(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(TranslationWarning::warning(code, message));
    }

    /// 记录错误(只记录不抛出;抛出由处理器返回 TranslationError 完成)
    pub fn add_error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(TranslationWarning::error(code, message));
    }

    /// 当前警告列表(追加式,只读视图)
    pub fn warnings(&self) -> &[TranslationWarning] {
        &self.warnings
    }

    /// 是否存在指定编码的警告
    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    /// 消费自身,取出警告列表(运行结束时并入结果)
    pub fn into_warnings(self) -> Vec<TranslationWarning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::WarningLevel;

    #[test]
    fn test_next_index_strictly_increasing_per_type() {
        let mut state = ModelState::new();
        assert_eq!(state.next_index(ComponentType::Wall), 1);
        assert_eq!(state.next_index(ComponentType::Wall), 2);
        assert_eq!(state.next_index(ComponentType::Window), 1);
        assert_eq!(state.next_index(ComponentType::Wall), 3);
        assert_eq!(state.next_index(ComponentType::Window), 2);
    }

    #[test]
    fn test_warnings_append_only() {
        let mut state = ModelState::new();
        state.add_warning("NoCoolingSpecified", "未声明制冷系统");
        state.add_error("MappingRuleMissing", "缺少映射规则");

        assert_eq!(state.warnings().len(), 2);
        assert_eq!(state.warnings()[0].level, WarningLevel::Warning);
        assert_eq!(state.warnings()[1].level, WarningLevel::Error);
        assert!(state.has_warning("NoCoolingSpecified"));
        assert!(!state.has_warning("Other"));

        let warnings = state.into_warnings();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_derived_values_cross_stage() {
        let mut state = ModelState::new();
        state.derived.total_wall_area_m2 += 120.0;
        state.derived.total_wall_area_m2 += 80.0;
        state.derived.conditioned_floor_area_m2 = Some(186.5);

        assert!((state.derived.total_wall_area_m2 - 200.0).abs() < 1e-9);
        assert_eq!(state.derived.conditioned_floor_area_m2, Some(186.5));
    }
}
