// ==========================================
// 建筑能耗模型转换系统 - 映射注册表
// ==========================================
// 职责: 加载并校验四张域映射表,提供只读查询
// 约束: 进程启动时加载一次;加载后不可变,可跨线程无锁并发读
// 优先级: 同一字段命中多条规则时,按表内声明顺序取第一条(先声明者胜)
// ==========================================

use crate::mapping::error::{ConfigError, ConfigResult};
use crate::mapping::rule::{
    Conversion, ConversionSpec, DomainTableSpec, MappingRule,
};
use std::collections::{HashMap, HashSet};
use tracing::info;

// 编译期内嵌的四张域映射表
const EMBEDDED_TABLES: [(&str, &str); 4] = [
    ("building", include_str!("tables/building.json")),
    ("weather", include_str!("tables/weather.json")),
    ("enclosure", include_str!("tables/enclosure.json")),
    ("systems", include_str!("tables/systems.json")),
];

// ==========================================
// DomainTable - 单域映射表（已解析）
// ==========================================

#[derive(Debug, Clone)]
struct DomainTable {
    rules: Vec<MappingRule>,
}

// ==========================================
// MappingRegistry - 映射注册表
// ==========================================

#[derive(Debug, Clone)]
pub struct MappingRegistry {
    domains: HashMap<String, DomainTable>,
}

impl MappingRegistry {
    /// 加载编译期内嵌的全部映射表
    ///
    /// # 返回
    /// - `Err(ConfigError)`: 任一表损坏,调用方必须在处理任何文件之前终止
    pub fn load_embedded() -> ConfigResult<Self> {
        let mut registry = Self {
            domains: HashMap::new(),
        };

        for (name, content) in EMBEDDED_TABLES {
            registry.load_table(name, content)?;
        }

        info!(
            domains = registry.domains.len(),
            rules = registry.rule_count(),
            "映射注册表加载完成"
        );

        Ok(registry)
    }

    /// 创建空注册表并加载单张表（测试与自定义表入口）
    pub fn from_json_str(table_name: &str, content: &str) -> ConfigResult<Self> {
        let mut registry = Self {
            domains: HashMap::new(),
        };
        registry.load_table(table_name, content)?;
        Ok(registry)
    }

    /// 解析并校验一张域映射表
    fn load_table(&mut self, table_name: &str, content: &str) -> ConfigResult<()> {
        let spec: DomainTableSpec =
            serde_json::from_str(content).map_err(|e| ConfigError::MalformedTable {
                table: table_name.to_string(),
                message: e.to_string(),
            })?;

        let domain = spec.domain.clone();

        // === 校验1: 枚举表构建,重复键即报错 ===
        let mut enum_tables: HashMap<String, HashMap<String, String>> = HashMap::new();
        for enum_spec in &spec.enums {
            let mut map = HashMap::new();
            for entry in &enum_spec.entries {
                if map.insert(entry.key.clone(), entry.value.clone()).is_some() {
                    return Err(ConfigError::DuplicateEnumKey {
                        domain: domain.clone(),
                        table: enum_spec.name.clone(),
                        key: entry.key.clone(),
                    });
                }
            }
            enum_tables.insert(enum_spec.name.clone(), map);
        }

        // === 校验2: 规则逐条解析 ===
        let mut seen_fields: HashSet<String> = HashSet::new();
        let mut rules = Vec::with_capacity(spec.rules.len());

        for rule_spec in spec.rules {
            // 主字段重复
            if !seen_fields.insert(rule_spec.field.clone()) {
                return Err(ConfigError::DuplicateField {
                    domain: domain.clone(),
                    field: rule_spec.field,
                });
            }

            if rule_spec.target.trim().is_empty() {
                return Err(ConfigError::InvalidRule {
                    domain: domain.clone(),
                    field: rule_spec.field,
                    message: "target 不能为空".to_string(),
                });
            }

            // 转换规则解析（枚举表引用在此解析为自带映射）
            let conversion = match rule_spec.conversion {
                ConversionSpec::Identity => Conversion::Identity,
                ConversionSpec::Scale { factor } => {
                    if !factor.is_finite() || factor == 0.0 {
                        return Err(ConfigError::InvalidRule {
                            domain: domain.clone(),
                            field: rule_spec.field,
                            message: format!("scale 系数非法: {}", factor),
                        });
                    }
                    Conversion::Scale { factor }
                }
                ConversionSpec::Offset { delta } => {
                    if !delta.is_finite() {
                        return Err(ConfigError::InvalidRule {
                            domain: domain.clone(),
                            field: rule_spec.field,
                            message: format!("offset 增量非法: {}", delta),
                        });
                    }
                    Conversion::Offset { delta }
                }
                ConversionSpec::RsiToRvalue => Conversion::RsiToRValue,
                ConversionSpec::Enum { table } => {
                    let map = enum_tables.get(&table).cloned().ok_or_else(|| {
                        ConfigError::UnknownEnumTable {
                            domain: domain.clone(),
                            field: rule_spec.field.clone(),
                            table: table.clone(),
                        }
                    })?;
                    Conversion::Enum { table, map }
                }
                ConversionSpec::BoolToFlag => Conversion::BoolToFlag,
            };

            let rule = MappingRule {
                field: rule_spec.field,
                aliases: rule_spec.aliases,
                target: rule_spec.target,
                conversion,
                default: rule_spec.default,
                unit: rule_spec.unit,
                required: rule_spec.required,
            };

            // === 校验3: 默认值必须已是目标口径,但枚举默认值需在值域内 ===
            if let Some(default) = &rule.default {
                if let Conversion::Enum { map, .. } = &rule.conversion {
                    if !map.values().any(|v| v == default) {
                        return Err(ConfigError::InvalidDefault {
                            domain: domain.clone(),
                            field: rule.field.clone(),
                            message: format!("默认值不在枚举值域内: {}", default),
                        });
                    }
                } else if matches!(
                    rule.conversion,
                    Conversion::Scale { .. } | Conversion::Offset { .. } | Conversion::RsiToRValue
                ) && default.parse::<f64>().is_err()
                {
                    return Err(ConfigError::InvalidDefault {
                        domain: domain.clone(),
                        field: rule.field.clone(),
                        message: format!("数值类规则的默认值不是数字: {}", default),
                    });
                }
            }

            rules.push(rule);
        }

        self.domains.insert(domain, DomainTable { rules });
        Ok(())
    }

    /// 查询映射规则
    ///
    /// # 优先级
    /// 按表内声明顺序扫描,主名或别名命中即返回 —— 先声明者胜
    pub fn lookup(&self, domain: &str, field: &str) -> Option<&MappingRule> {
        self.domains
            .get(domain)?
            .rules
            .iter()
            .find(|rule| rule.matches(field))
    }

    /// 某域的全部规则（装配阶段校验用）
    pub fn domain_rules(&self, domain: &str) -> &[MappingRule] {
        self.domains
            .get(domain)
            .map(|t| t.rules.as_slice())
            .unwrap_or(&[])
    }

    /// 已加载的规则总数
    pub fn rule_count(&self) -> usize {
        self.domains.values().map(|t| t.rules.len()).sum()
    }
}
