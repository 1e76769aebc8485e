// ==========================================
// 建筑能耗模型转换系统 - Enclosure 处理器
// ==========================================
// 阶段顺序: 第 3 阶段
// 职责: 围护结构逐部件转换(墙体/顶棚/窗户/基础)与面积累计
//       楼面面积缺失时按基础占地 × 层数推算(写入派生值供 Systems 阶段使用)
// 校验: 保温 R 值为负是单文件不可恢复失败;偏大只记警告
// ==========================================

use crate::domain::document::{DocNode, SourceDocument, TargetDocument};
use crate::domain::types::{ComponentType, ErrorCategory};
use crate::mapping::rule::format_number;
use crate::mapping::MappingRegistry;
use crate::pipeline::error::{TranslationError, TranslationResult};
use crate::pipeline::processors::{map_component_field, map_document_field, Processor};
use crate::pipeline::state::ModelState;
use std::sync::Arc;
use tracing::debug;

/// RSI 合理上限,超出只记警告
const MAX_TYPICAL_RSI: f64 = 20.0;

pub struct EnclosureProcessor {
    registry: Arc<MappingRegistry>,
}

impl EnclosureProcessor {
    pub fn new(registry: Arc<MappingRegistry>) -> Self {
        Self { registry }
    }

    /// 保温 R 值(RSI)预检: 负值不可恢复,偏大记警告
    fn check_insulation_rsi(
        &self,
        component: &DocNode,
        label: &str,
        state: &mut ModelState,
    ) -> TranslationResult<()> {
        let Some(raw) = component.text_at("Construction/InsulationRValue") else {
            return Ok(());
        };
        let Ok(rsi) = raw.parse::<f64>() else {
            // 类型问题交给映射规则统一处理
            return Ok(());
        };

        if rsi < 0.0 {
            return Err(TranslationError::Validation {
                error_type: "Validation_NegativeRValue".to_string(),
                category: ErrorCategory::Enclosure,
                message: format!("部件 {} 的保温 R 值为负: {}", label, rsi),
            });
        }
        if rsi > MAX_TYPICAL_RSI {
            state.add_warning(
                "SuspiciousInsulationValue",
                format!("部件 {} 的保温 RSI 异常偏大: {}", label, rsi),
            );
        }
        Ok(())
    }

    /// 部件面积解析: 必须为正,返回数值用于累计
    fn parse_positive_area(
        &self,
        value: Option<&str>,
        label: &str,
    ) -> TranslationResult<Option<f64>> {
        let Some(area) = value.and_then(|s| s.parse::<f64>().ok()) else {
            return Ok(None);
        };
        if area <= 0.0 {
            return Err(TranslationError::Validation {
                error_type: "Validation_NonPositiveArea".to_string(),
                category: ErrorCategory::Enclosure,
                message: format!("部件 {} 的面积必须为正: {}", label, area),
            });
        }
        Ok(Some(area))
    }

    fn process_walls(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        let walls = source.root().get_all("Components/Wall");
        if walls.is_empty() {
            state.add_warning("NoWallsSpecified", "源模型未声明任何墙体部件");
        }

        for wall in walls {
            let index = state.next_index(ComponentType::Wall);
            let label = wall
                .text_at("Label")
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("wall-{}", index));

            self.check_insulation_rsi(wall, &label, state)?;

            let mut target_wall = DocNode::new("Wall");
            target_wall.set_attr("index", index.to_string());
            if let Some(id) = wall.attr("id") {
                target_wall.set_attr("id", id);
            }

            map_component_field(
                &self.registry,
                "enclosure",
                "Wall/Label",
                wall,
                &mut target_wall,
                state,
                ErrorCategory::Enclosure,
            )?;
            let area = map_component_field(
                &self.registry,
                "enclosure",
                "Wall/Area",
                wall,
                &mut target_wall,
                state,
                ErrorCategory::Enclosure,
            )?;
            if let Some(area) = self.parse_positive_area(area.as_deref(), &label)? {
                state.derived.total_wall_area_m2 += area;
            }
            map_component_field(
                &self.registry,
                "enclosure",
                "Wall/Construction/InsulationRValue",
                wall,
                &mut target_wall,
                state,
                ErrorCategory::Enclosure,
            )?;

            target.root_mut().append_child_at("Enclosure/Walls", target_wall);
        }
        Ok(())
    }

    fn process_ceilings(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        for ceiling in source.root().get_all("Components/Ceiling") {
            let index = state.next_index(ComponentType::Ceiling);
            let label = ceiling
                .text_at("Label")
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("ceiling-{}", index));

            self.check_insulation_rsi(ceiling, &label, state)?;

            let mut target_ceiling = DocNode::new("Ceiling");
            target_ceiling.set_attr("index", index.to_string());

            map_component_field(
                &self.registry,
                "enclosure",
                "Ceiling/Label",
                ceiling,
                &mut target_ceiling,
                state,
                ErrorCategory::Enclosure,
            )?;
            let area = map_component_field(
                &self.registry,
                "enclosure",
                "Ceiling/Area",
                ceiling,
                &mut target_ceiling,
                state,
                ErrorCategory::Enclosure,
            )?;
            if let Some(area) = self.parse_positive_area(area.as_deref(), &label)? {
                state.derived.total_ceiling_area_m2 += area;
            }
            map_component_field(
                &self.registry,
                "enclosure",
                "Ceiling/Type",
                ceiling,
                &mut target_ceiling,
                state,
                ErrorCategory::Enclosure,
            )?;
            map_component_field(
                &self.registry,
                "enclosure",
                "Ceiling/Construction/InsulationRValue",
                ceiling,
                &mut target_ceiling,
                state,
                ErrorCategory::Enclosure,
            )?;

            target
                .root_mut()
                .append_child_at("Enclosure/Ceilings", target_ceiling);
        }
        Ok(())
    }

    fn process_windows(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        for window in source.root().get_all("Components/Window") {
            let index = state.next_index(ComponentType::Window);
            let label = window
                .text_at("Label")
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("window-{}", index));

            // U 值为负与 R 值为负同等处理
            if let Some(u) = window.f64_at("Construction/UValue") {
                if u < 0.0 {
                    return Err(TranslationError::Validation {
                        error_type: "Validation_NegativeUValue".to_string(),
                        category: ErrorCategory::Enclosure,
                        message: format!("窗户 {} 的 U 值为负: {}", label, u),
                    });
                }
            }

            let mut target_window = DocNode::new("Window");
            target_window.set_attr("index", index.to_string());

            map_component_field(
                &self.registry,
                "enclosure",
                "Window/Label",
                window,
                &mut target_window,
                state,
                ErrorCategory::Enclosure,
            )?;
            let area = map_component_field(
                &self.registry,
                "enclosure",
                "Window/Area",
                window,
                &mut target_window,
                state,
                ErrorCategory::Enclosure,
            )?;
            if let Some(area) = self.parse_positive_area(area.as_deref(), &label)? {
                state.derived.total_window_area_m2 += area;
            }
            map_component_field(
                &self.registry,
                "enclosure",
                "Window/Construction/UValue",
                window,
                &mut target_window,
                state,
                ErrorCategory::Enclosure,
            )?;
            map_component_field(
                &self.registry,
                "enclosure",
                "Window/Orientation",
                window,
                &mut target_window,
                state,
                ErrorCategory::Enclosure,
            )?;

            target
                .root_mut()
                .append_child_at("Enclosure/Windows", target_window);
        }
        Ok(())
    }

    fn process_foundation(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        let Some(foundation) = source.root().get_path("Components/Foundation") else {
            state.add_warning("NoFoundationSpecified", "源模型未声明基础部件");
            return Ok(());
        };

        let index = state.next_index(ComponentType::Foundation);
        self.check_insulation_rsi(foundation, "foundation", state)?;

        let mut target_foundation = DocNode::new("Foundation");
        target_foundation.set_attr("index", index.to_string());

        map_component_field(
            &self.registry,
            "enclosure",
            "Foundation/Type",
            foundation,
            &mut target_foundation,
            state,
            ErrorCategory::Enclosure,
        )?;
        let area = map_component_field(
            &self.registry,
            "enclosure",
            "Foundation/Area",
            foundation,
            &mut target_foundation,
            state,
            ErrorCategory::Enclosure,
        )?;
        if let Some(area) = self.parse_positive_area(area.as_deref(), "foundation")? {
            state.derived.foundation_area_m2 = Some(area);
        }
        map_component_field(
            &self.registry,
            "enclosure",
            "Foundation/Depth",
            foundation,
            &mut target_foundation,
            state,
            ErrorCategory::Enclosure,
        )?;
        map_component_field(
            &self.registry,
            "enclosure",
            "Foundation/Construction/InsulationRValue",
            foundation,
            &mut target_foundation,
            state,
            ErrorCategory::Enclosure,
        )?;

        target
            .root_mut()
            .append_child_at("Enclosure/Foundations", target_foundation);
        Ok(())
    }
}

impl Processor for EnclosureProcessor {
    fn name(&self) -> &'static str {
        "enclosure"
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Enclosure
    }

    fn process(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()> {
        self.process_walls(source, state, target)?;
        self.process_ceilings(source, state, target)?;
        self.process_windows(source, state, target)?;
        self.process_foundation(source, state, target)?;

        // === 气密性(绝对路径规则,带默认值) ===
        map_document_field(
            &self.registry,
            "enclosure",
            "House/Specifications/AirTightness",
            source.root(),
            target.root_mut(),
            state,
            ErrorCategory::Enclosure,
        )?;

        // === 楼面面积回补: Building 阶段未取得时按基础占地 × 层数推算 ===
        if state.derived.conditioned_floor_area_m2.is_none() {
            match (state.derived.foundation_area_m2, state.derived.storey_count) {
                (Some(footprint), Some(storeys)) if storeys > 0 => {
                    let area = footprint * storeys as f64;
                    state.derived.conditioned_floor_area_m2 = Some(area);
                    target
                        .root_mut()
                        .set_text_at("BuildingSummary/ConditionedFloorArea", format_number(area));
                    state.add_warning(
                        "FloorAreaDerivedFromFootprint",
                        format!("楼面面积按基础占地推算: {} m2", format_number(area)),
                    );
                }
                _ => {
                    return Err(TranslationError::MissingRequiredField {
                        domain: "building".to_string(),
                        field: "House/Specifications/HeatedFloorArea".to_string(),
                        category: ErrorCategory::Enclosure,
                    });
                }
            }
        }

        debug!(
            walls = state.derived.total_wall_area_m2,
            windows = state.derived.total_window_area_m2,
            floor_area = ?state.derived.conditioned_floor_area_m2,
            "围护结构转换完成"
        );
        Ok(())
    }
}
