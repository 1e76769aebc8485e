// ==========================================
// 建筑能耗模型转换系统 - Systems 处理器
// ==========================================
// 阶段顺序: 第 4 阶段(依赖前序阶段写入的楼面面积派生值)
// 职责: 采暖/制冷/通风/热水系统映射
// 关键语义:
// - 采暖类型必填,缺失且无默认值 → 单文件失败
// - 制冷段缺失 → 记警告 NoCoolingSpecified 并写入无制冷标记
// - 采暖容量缺失 → 按楼面面积自动定容
// ==========================================

use crate::domain::document::{SourceDocument, TargetDocument};
use crate::domain::types::ErrorCategory;
use crate::mapping::rule::format_number;
use crate::mapping::MappingRegistry;
use crate::pipeline::error::TranslationResult;
use crate::pipeline::processors::{map_document_field, Processor};
use crate::pipeline::state::ModelState;
use std::sync::Arc;
use tracing::debug;

/// 自动定容功率密度 (W/m2)
const AUTOSIZE_WATTS_PER_M2: f64 = 100.0;

pub struct SystemsProcessor {
    registry: Arc<MappingRegistry>,
}

impl SystemsProcessor {
    pub fn new(registry: Arc<MappingRegistry>) -> Self {
        Self { registry }
    }

    fn process_heating(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        let category = ErrorCategory::Systems;
        let root = source.root();

        // 类型必填: 段缺失或值无法映射都会中断当前文件
        map_document_field(
            &self.registry,
            "systems",
            "Systems/Heating/Type",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        map_document_field(
            &self.registry,
            "systems",
            "Systems/Heating/Fuel",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        map_document_field(
            &self.registry,
            "systems",
            "Systems/Heating/Efficiency",
            root,
            target.root_mut(),
            state,
            category,
        )?;

        // 容量: 有值按 kW → W 换算,缺失按楼面面积自动定容
        let capacity = map_document_field(
            &self.registry,
            "systems",
            "Systems/Heating/Capacity",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        if capacity.is_none() {
            // 楼面面积由 Building/Enclosure 阶段写入,处理器顺序保证其已就绪
            if let Some(area) = state.derived.conditioned_floor_area_m2 {
                let watts = area * AUTOSIZE_WATTS_PER_M2;
                target
                    .root_mut()
                    .set_text_at("Systems/Heating/Capacity", format_number(watts));
                state.add_warning(
                    "HeatingCapacityAutosized",
                    format!("采暖容量按楼面面积自动定容: {} W", format_number(watts)),
                );
            }
        }
        Ok(())
    }

    fn process_cooling(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        let category = ErrorCategory::Systems;
        let root = source.root();

        let Some(cooling) = root.get_path("Systems/Cooling") else {
            // 无制冷: 记警告并写入显式无制冷标记
            state.add_warning("NoCoolingSpecified", "源模型未声明制冷系统");
            target.root_mut().set_text_at("Systems/Cooling/Type", "none");
            return Ok(());
        };

        let cooling_type = map_document_field(
            &self.registry,
            "systems",
            "Systems/Cooling/Type",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        if cooling_type.is_none() {
            // 段存在但类型缺失/无法识别: 降级为无制冷
            state.add_warning(
                "CoolingTypeUnrecognized",
                format!(
                    "制冷类型缺失或无法识别: {:?}",
                    cooling.text_at("Type").unwrap_or("<missing>")
                ),
            );
            target.root_mut().set_text_at("Systems/Cooling/Type", "none");
            return Ok(());
        }

        map_document_field(
            &self.registry,
            "systems",
            "Systems/Cooling/Efficiency",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        Ok(())
    }

    fn process_ventilation(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        let category = ErrorCategory::Systems;
        let root = source.root();

        if root.get_path("Systems/Ventilation").is_none() {
            state.add_warning("NoVentilationSpecified", "源模型未声明通风系统,使用默认配置");
        }
        map_document_field(
            &self.registry,
            "systems",
            "Systems/Ventilation/Type",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        map_document_field(
            &self.registry,
            "systems",
            "Systems/Ventilation/Efficiency",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        Ok(())
    }

    fn process_hot_water(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        let category = ErrorCategory::Systems;
        let root = source.root();

        if root.get_path("Systems/HotWater").is_none() {
            state.add_warning("NoHotWaterSpecified", "源模型未声明热水系统,使用默认配置");
        }
        map_document_field(
            &self.registry,
            "systems",
            "Systems/HotWater/Fuel",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        map_document_field(
            &self.registry,
            "systems",
            "Systems/HotWater/EnergyFactor",
            root,
            target.root_mut(),
            state,
            category,
        )?;
        Ok(())
    }
}

impl Processor for SystemsProcessor {
    fn name(&self) -> &'static str {
        "systems"
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Systems
    }

    fn process(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        self.process_heating(source, state, target)?;
        self.process_cooling(source, state, target)?;
        self.process_ventilation(source, state, target)?;
        self.process_hot_water(source, state, target)?;

        debug!("系统设备映射完成");
        Ok(())
    }
}
