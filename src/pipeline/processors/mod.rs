// ==========================================
// 建筑能耗模型转换系统 - 处理器层
// ==========================================
// 职责: 四个固定顺序的转换阶段 (Building → Weather → Enclosure → Systems)
// 红线: 可恢复的领域异常只记警告,绝不抛出;不可恢复条件返回 TranslationError
//       只中断当前文件;处理器顺序固定,后续阶段依赖前序阶段写入的派生值
// ==========================================

pub mod building;
pub mod enclosure;
pub mod systems;
pub mod weather;

pub use building::BuildingProcessor;
pub use enclosure::EnclosureProcessor;
pub use systems::SystemsProcessor;
pub use weather::WeatherProcessor;

use crate::domain::document::{DocNode, SourceDocument, TargetDocument};
use crate::domain::types::ErrorCategory;
use crate::mapping::rule::ConversionError;
use crate::mapping::{MappingRegistry, MappingRule};
use crate::pipeline::error::{TranslationError, TranslationResult};
use crate::pipeline::state::ModelState;

// ==========================================
// Processor - 转换阶段接口
// ==========================================

pub trait Processor: Send + Sync {
    /// 阶段名(日志用)
    fn name(&self) -> &'static str;

    /// 阶段所属错误类别
    fn category(&self) -> ErrorCategory;

    /// 执行本阶段转换: 读源文档,写目标文档与运行上下文
    fn process(
        &self,
        source: &SourceDocument,
        state: &mut ModelState,
        target: &mut TargetDocument,
    ) -> TranslationResult<()>;
}

// ==========================================
// 共享映射辅助
// ==========================================

/// 按主名/别名读取源节点文本
///
/// component 寻址时去掉路径首段(规则键 "Wall/Area" 在 Wall 节点内寻址 "Area")
fn read_raw<'a>(rule: &MappingRule, node: &'a DocNode, strip_component_prefix: bool) -> Option<&'a str> {
    std::iter::once(rule.field.as_str())
        .chain(rule.aliases.iter().map(String::as_str))
        .find_map(|p| {
            let path = if strip_component_prefix {
                p.split_once('/').map(|(_, rest)| rest).unwrap_or(p)
            } else {
                p
            };
            node.text_at(path)
        })
}

/// 把源字段原始值按规则转为目标值
///
/// # 语义
/// - 转换成功 → Ok(Some(值))
/// - 源缺失且有默认值 → Ok(Some(默认值))
/// - 源缺失、无默认、非必填 → Ok(None)
/// - 源缺失、无默认、必填 → Err(MissingRequiredField)
/// - 转换失败、必填 → Err(UnmappableEnum / Validation_TypeMismatch)
/// - 转换失败、非必填 → 记警告,回落默认值或 Ok(None)
fn resolve_value(
    rule: &MappingRule,
    domain: &str,
    raw: Option<&str>,
    state: &mut ModelState,
    category: ErrorCategory,
) -> TranslationResult<Option<String>> {
    match raw {
        Some(raw) => match rule.convert(raw) {
            Ok(value) => Ok(Some(value)),
            Err(conv_err) => {
                if rule.required {
                    match conv_err {
                        ConversionError::UnknownEnumKey { .. } => {
                            Err(TranslationError::UnmappableEnum {
                                field: rule.field.clone(),
                                value: raw.to_string(),
                                category,
                            })
                        }
                        _ => Err(TranslationError::Validation {
                            error_type: "Validation_TypeMismatch".to_string(),
                            category,
                            message: format!("字段 {}: {}", rule.field, conv_err),
                        }),
                    }
                } else {
                    state.add_warning(
                        "FieldConversionFailed",
                        format!("字段 {} 转换失败({}),已回落", rule.field, conv_err),
                    );
                    Ok(rule.default.clone())
                }
            }
        },
        None => {
            if let Some(default) = &rule.default {
                Ok(Some(default.clone()))
            } else if rule.required {
                Err(TranslationError::MissingRequiredField {
                    domain: domain.to_string(),
                    field: rule.field.clone(),
                    category,
                })
            } else {
                Ok(None)
            }
        }
    }
}

/// 文档级字段映射: 源根节点绝对路径 → 目标根节点绝对路径
///
/// 返回实际写入的目标值(便于处理器派生计算)
pub(crate) fn map_document_field(
    registry: &MappingRegistry,
    domain: &str,
    field: &str,
    source_root: &DocNode,
    target_root: &mut DocNode,
    state: &mut ModelState,
    category: ErrorCategory,
) -> TranslationResult<Option<String>> {
    let Some(rule) = registry.lookup(domain, field) else {
        state.add_error(
            "MappingRuleMissing",
            format!("映射规则缺失: {}/{}", domain, field),
        );
        return Ok(None);
    };

    let raw = read_raw(rule, source_root, false);
    let value = resolve_value(rule, domain, raw, state, category)?;

    if let Some(value) = &value {
        target_root.set_text_at(&rule.target, value.clone());
    }
    Ok(value)
}

/// 部件级字段映射: 部件节点相对路径 → 目标部件节点相对路径
pub(crate) fn map_component_field(
    registry: &MappingRegistry,
    domain: &str,
    field: &str,
    component: &DocNode,
    target_component: &mut DocNode,
    state: &mut ModelState,
    category: ErrorCategory,
) -> TranslationResult<Option<String>> {
    let Some(rule) = registry.lookup(domain, field) else {
        state.add_error(
            "MappingRuleMissing",
            format!("映射规则缺失: {}/{}", domain, field),
        );
        return Ok(None);
    };

    let raw = read_raw(rule, component, true);
    let value = resolve_value(rule, domain, raw, state, category)?;

    if let Some(value) = &value {
        target_component.set_text_at(&rule.target, value.clone());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingRegistry;

    fn registry() -> MappingRegistry {
        MappingRegistry::load_embedded().unwrap()
    }

    #[test]
    fn test_map_document_field_applies_default() {
        let registry = registry();
        let source = DocNode::new("HomeEnergyModel");
        let mut target = DocNode::new("SimulationModel");
        let mut state = ModelState::new();

        // Storeys 缺失 → 默认值 "1"
        let value = map_document_field(
            &registry,
            "building",
            "House/Specifications/Storeys",
            &source,
            &mut target,
            &mut state,
            ErrorCategory::Building,
        )
        .unwrap();

        assert_eq!(value.as_deref(), Some("1"));
        assert_eq!(target.text_at("BuildingSummary/Storeys"), Some("1"));
    }

    #[test]
    fn test_map_document_field_required_missing() {
        let registry = registry();
        let source = DocNode::new("HomeEnergyModel");
        let mut target = DocNode::new("SimulationModel");
        let mut state = ModelState::new();

        let err = map_document_field(
            &registry,
            "building",
            "House/Specifications/BuildingType",
            &source,
            &mut target,
            &mut state,
            ErrorCategory::Building,
        )
        .unwrap_err();

        assert!(matches!(err, TranslationError::MissingRequiredField { .. }));
    }

    #[test]
    fn test_map_component_field_strips_prefix() {
        let registry = registry();
        let mut wall = DocNode::new("Wall");
        wall.set_text_at("Area", "120.5");
        let mut target_wall = DocNode::new("Wall");
        let mut state = ModelState::new();

        let value = map_component_field(
            &registry,
            "enclosure",
            "Wall/Area",
            &wall,
            &mut target_wall,
            &mut state,
            ErrorCategory::Enclosure,
        )
        .unwrap();

        assert_eq!(value.as_deref(), Some("120.5"));
        assert_eq!(target_wall.text_at("Area"), Some("120.5"));
    }

    #[test]
    fn test_alias_resolution_reads_alternate_name() {
        let registry = registry();
        let mut source = DocNode::new("HomeEnergyModel");
        source.set_text_at("Weather/Province", "Quebec");
        let mut target = DocNode::new("SimulationModel");
        let mut state = ModelState::new();

        let value = map_document_field(
            &registry,
            "weather",
            "Weather/Region",
            &source,
            &mut target,
            &mut state,
            ErrorCategory::Weather,
        )
        .unwrap();

        assert_eq!(value.as_deref(), Some("Quebec"));
    }

    #[test]
    fn test_optional_enum_failure_records_warning() {
        let registry = registry();
        let mut source = DocNode::new("HomeEnergyModel");
        source.set_text_at("House/Specifications/FrontOrientation", "Sideways");
        let mut target = DocNode::new("SimulationModel");
        let mut state = ModelState::new();

        // 非必填枚举转换失败 → 警告 + 回落默认值
        let value = map_document_field(
            &registry,
            "building",
            "House/Specifications/FrontOrientation",
            &source,
            &mut target,
            &mut state,
            ErrorCategory::Building,
        )
        .unwrap();

        assert_eq!(value.as_deref(), Some("south"));
        assert!(state.has_warning("FieldConversionFailed"));
    }
}
