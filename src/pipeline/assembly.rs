// ==========================================
// 建筑能耗模型转换系统 - 装配阶段
// ==========================================
// 职责: 终段处理 = 转换模式覆盖 + 目标模型结构完整性校验
// 关键语义: 校验收集全部违规项后一次性失败(便于大批量排障),而非首个违规即止
// ==========================================

use crate::domain::document::TargetDocument;
use crate::domain::types::TranslationMode;
use crate::pipeline::error::AssemblyError;
use crate::pipeline::state::ModelState;
use tracing::debug;

/// 基准模式覆盖值: 自然换气次数
const REFERENCE_ACH_NATURAL: &str = "0.4";
/// 基准模式覆盖值: 采暖年效率
const REFERENCE_HEATING_EFFICIENCY: &str = "0.92";
/// 基准模式覆盖值: 窗户传热系数
const REFERENCE_WINDOW_UFACTOR: &str = "0.28";
/// 模拟步长默认值(分钟)
const DEFAULT_TIMESTEP: &str = "60";

/// 必须存在的顶层段
const REQUIRED_SECTIONS: [&str; 5] = [
    "Site",
    "BuildingSummary",
    "Enclosure",
    "Systems",
    "SimulationControl",
];

/// 必须存在的叶子字段
const REQUIRED_LEAVES: [&str; 12] = [
    "Site/WeatherRegion",
    "Site/WeatherStation",
    "BuildingSummary/FacilityType",
    "BuildingSummary/YearBuilt",
    "BuildingSummary/ConditionedFloorArea",
    "BuildingSummary/Occupants",
    "Enclosure/AirInfiltration/AchNatural",
    "Systems/Heating/Type",
    "Systems/Heating/Fuel",
    "Systems/Heating/AnnualEfficiency",
    "SimulationControl/Mode",
    "SimulationControl/Timestep",
];

/// 目标模型合法枚举值域
const VALID_FACILITY_TYPES: [&str; 6] = [
    "single-family detached",
    "single-family attached",
    "single-family attached middle unit",
    "single-family attached end unit",
    "2-unit building",
    "manufactured home",
];

const VALID_FUELS: [&str; 5] = ["natural gas", "electricity", "fuel oil", "propane", "wood"];

const VALID_MODES: [&str; 2] = ["as-built", "reference"];

const VALID_COOLING_TYPES: [&str; 4] = [
    "central air conditioner",
    "room air conditioner",
    "air-to-air heat pump",
    "none",
];

pub struct AssemblyStage;

impl AssemblyStage {
    pub fn new() -> Self {
        Self
    }

    /// 终段处理: 先按转换模式覆盖,再做结构完整性校验
    pub fn finalize(
        &self,
        target: &mut TargetDocument,
        state: &mut ModelState,
        mode: TranslationMode,
    ) -> Result<(), AssemblyError> {
        self.apply_mode_overrides(target, state, mode);
        self.validate(target)
    }

    /// 转换模式覆盖
    ///
    /// 基准模式把气密性/采暖效率/窗户传热系数固定为基准值
    fn apply_mode_overrides(
        &self,
        target: &mut TargetDocument,
        state: &mut ModelState,
        mode: TranslationMode,
    ) {
        let root = target.root_mut();

        let mode_value = match mode {
            TranslationMode::AsBuilt => "as-built",
            TranslationMode::Reference => "reference",
        };
        root.set_text_at("SimulationControl/Mode", mode_value);
        if root.text_at("SimulationControl/Timestep").is_none() {
            root.set_text_at("SimulationControl/Timestep", DEFAULT_TIMESTEP);
        }

        if mode == TranslationMode::Reference {
            root.set_text_at("Enclosure/AirInfiltration/AchNatural", REFERENCE_ACH_NATURAL);
            if root.get_path("Systems/Heating").is_some() {
                root.set_text_at(
                    "Systems/Heating/AnnualEfficiency",
                    REFERENCE_HEATING_EFFICIENCY,
                );
            }
            if let Some(windows) = root
                .child_mut("Enclosure")
                .and_then(|e| e.child_mut("Windows"))
            {
                let mut count = 0;
                for window in windows.children.iter_mut().filter(|c| c.name == "Window") {
                    window.set_text_at("UFactor", REFERENCE_WINDOW_UFACTOR);
                    count += 1;
                }
                if count > 0 {
                    debug!(windows = count, "基准模式覆盖窗户传热系数");
                }
            }
            state.add_warning("ReferenceOverridesApplied", "已应用基准模式覆盖值");
        }
    }

    /// 结构完整性校验,收集全部违规项
    fn validate(&self, target: &TargetDocument) -> Result<(), AssemblyError> {
        let root = target.root();
        let mut violations = Vec::new();

        // === 顶层段 ===
        for section in REQUIRED_SECTIONS {
            if root.child(section).is_none() {
                violations.push(format!("缺少必需段: {}", section));
            }
        }

        // === 必需叶子 ===
        for leaf in REQUIRED_LEAVES {
            if root.text_at(leaf).is_none() {
                violations.push(format!("缺少必需字段: {}", leaf));
            }
        }

        // === 墙体至少一面 ===
        if root.get_all("Enclosure/Walls/Wall").is_empty() {
            violations.push("Enclosure/Walls 至少需要一面墙体".to_string());
        }

        // === 枚举值域 ===
        self.check_enum(root, "BuildingSummary/FacilityType", &VALID_FACILITY_TYPES, &mut violations);
        self.check_enum(root, "Systems/Heating/Fuel", &VALID_FUELS, &mut violations);
        self.check_enum(root, "SimulationControl/Mode", &VALID_MODES, &mut violations);
        self.check_enum(root, "Systems/Cooling/Type", &VALID_COOLING_TYPES, &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AssemblyError { violations })
        }
    }

    fn check_enum(
        &self,
        root: &crate::domain::document::DocNode,
        path: &str,
        valid: &[&str],
        violations: &mut Vec<String>,
    ) {
        if let Some(value) = root.text_at(path) {
            if !valid.contains(&value) {
                violations.push(format!("字段 {} 的值不在枚举值域内: {}", path, value));
            }
        }
    }
}

impl Default for AssemblyStage {
    fn default() -> Self {
        Self::new()
    }
}
