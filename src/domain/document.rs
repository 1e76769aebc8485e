// ==========================================
// 建筑能耗模型转换系统 - 文档树结构
// ==========================================
// 职责: 源模型/目标模型的层级文档树表示
// 结构: 标签变体树 (元素 → 标量文本 | 子元素列表 | 属性映射)
// 约束: 同一棵树重复序列化必须字节级一致(属性与子元素保持插入顺序)
// ==========================================

use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};

// ==========================================
// DocNode - 文档树节点
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<DocNode>,
}

impl DocNode {
    /// 创建空元素节点
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// 创建带文本的叶子节点
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut node = Self::new(name);
        node.text = Some(text.into());
        node
    }

    /// 设置属性（保持插入顺序）
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// 读取属性
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_str())
    }

    /// 追加子节点,返回该子节点的可变引用
    pub fn append_child(&mut self, child: DocNode) -> &mut DocNode {
        self.children.push(child);
        self.children
            .last_mut()
            .unwrap_or_else(|| unreachable!("children 刚完成 push"))
    }

    /// 按名称查找第一个直接子节点
    pub fn child(&self, name: &str) -> Option<&DocNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// 按名称查找第一个直接子节点（可变）
    pub fn child_mut(&mut self, name: &str) -> Option<&mut DocNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// 按路径查找节点（如 "House/Specifications/BuildingType"）
    ///
    /// 路径各段均取第一个同名子节点
    pub fn get_path(&self, path: &str) -> Option<&DocNode> {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// 按路径查找所有同名末段节点（如 "Components/Wall" 返回所有 Wall）
    pub fn get_all(&self, path: &str) -> Vec<&DocNode> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, prefix)) = segments.split_last() else {
            return Vec::new();
        };

        let mut current = self;
        for segment in prefix {
            match current.child(segment) {
                Some(node) => current = node,
                None => return Vec::new(),
            }
        }

        current
            .children
            .iter()
            .filter(|c| c.name == *last)
            .collect()
    }

    /// 读取路径处的文本（去除首尾空白,空串视为缺失）
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.get_path(path)
            .and_then(|n| n.text.as_deref())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// 读取路径处的浮点数（解析失败视为缺失）
    pub fn f64_at(&self, path: &str) -> Option<f64> {
        self.text_at(path).and_then(|s| s.parse::<f64>().ok())
    }

    /// 读取路径处的整数（解析失败视为缺失）
    pub fn i64_at(&self, path: &str) -> Option<i64> {
        self.text_at(path).and_then(|s| s.parse::<i64>().ok())
    }

    /// 确保路径存在,逐段创建缺失节点,返回末段可变引用
    pub fn ensure_path(&mut self, path: &str) -> &mut DocNode {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            // 无法用 if let 持有可变借用再插入,改用索引定位
            let pos = current.children.iter().position(|c| c.name == segment);
            let idx = match pos {
                Some(idx) => idx,
                None => {
                    current.children.push(DocNode::new(segment));
                    current.children.len() - 1
                }
            };
            current = &mut current.children[idx];
        }
        current
    }

    /// 在路径处设置文本（缺失节点自动创建）
    pub fn set_text_at(&mut self, path: &str, value: impl Into<String>) {
        self.ensure_path(path).text = Some(value.into());
    }

    /// 在路径处追加子节点（父路径缺失自动创建）
    pub fn append_child_at(&mut self, parent_path: &str, child: DocNode) {
        self.ensure_path(parent_path).children.push(child);
    }

    /// 递归写出 XML 事件
    fn write_xml<W: std::io::Write>(&self, writer: &mut Writer<W>) -> std::io::Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;

        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }

        for child in &self.children {
            child.write_xml(writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

// ==========================================
// SourceDocument - 源模型文档（只读）
// ==========================================
// 一次转换运行期间不可变;节点按路径寻址
#[derive(Debug, Clone)]
pub struct SourceDocument {
    root: DocNode,
}

impl SourceDocument {
    pub fn new(root: DocNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &DocNode {
        &self.root
    }

    pub fn root_name(&self) -> &str {
        &self.root.name
    }
}

// ==========================================
// TargetDocument - 目标模型文档（运行内可变）
// ==========================================
// 仅在单次 PipelineRun 内被处理器增量构建;写盘前必须通过装配校验
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDocument {
    root: DocNode,
}

impl TargetDocument {
    /// 创建带根元素的空目标文档
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root: DocNode::new(root_name),
        }
    }

    pub fn root(&self) -> &DocNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut DocNode {
        &mut self.root
    }

    /// 序列化为 XML 字符串（固定两空格缩进,重复调用字节级一致）
    pub fn to_xml_string(&self) -> std::io::Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.root.write_xml(&mut writer)?;

        let bytes = writer.into_inner();
        // Writer 只写出合法 UTF-8
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> DocNode {
        let mut root = DocNode::new("HomeEnergyModel");
        root.set_text_at("House/Specifications/BuildingType", "SingleDetached");
        root.set_text_at("House/Specifications/Storeys", "2");

        let mut wall = DocNode::new("Wall");
        wall.set_attr("id", "W1");
        wall.set_text_at("Area", "120.5");
        root.append_child_at("Components", wall);

        let mut wall2 = DocNode::new("Wall");
        wall2.set_attr("id", "W2");
        wall2.set_text_at("Area", "80.0");
        root.append_child_at("Components", wall2);

        root
    }

    #[test]
    fn test_get_path() {
        let root = sample_tree();
        assert_eq!(
            root.text_at("House/Specifications/BuildingType"),
            Some("SingleDetached")
        );
        assert_eq!(root.i64_at("House/Specifications/Storeys"), Some(2));
        assert!(root.get_path("House/Missing").is_none());
    }

    #[test]
    fn test_get_all_returns_every_sibling() {
        let root = sample_tree();
        let walls = root.get_all("Components/Wall");
        assert_eq!(walls.len(), 2);
        assert_eq!(walls[0].attr("id"), Some("W1"));
        assert_eq!(walls[1].attr("id"), Some("W2"));
        assert_eq!(walls[0].f64_at("Area"), Some(120.5));
    }

    #[test]
    fn test_ensure_path_is_idempotent() {
        let mut root = DocNode::new("Root");
        root.ensure_path("A/B/C");
        root.ensure_path("A/B/D");

        let a = root.child("A").unwrap();
        assert_eq!(a.children.len(), 1);
        let b = a.child("B").unwrap();
        assert_eq!(b.children.len(), 2);
    }

    #[test]
    fn test_text_at_trims_and_skips_empty() {
        let mut root = DocNode::new("Root");
        root.set_text_at("A", "  hello  ");
        root.set_text_at("B", "   ");
        assert_eq!(root.text_at("A"), Some("hello"));
        assert_eq!(root.text_at("B"), None);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let mut target = TargetDocument::new("SimulationModel");
        target.root_mut().set_attr("version", "1.0");
        target.root_mut().set_text_at("Site/WeatherRegion", "Ontario");
        target
            .root_mut()
            .set_text_at("BuildingSummary/Storeys", "2");

        let first = target.to_xml_string().unwrap();
        let second = target.to_xml_string().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(first.contains("<WeatherRegion>Ontario</WeatherRegion>"));
    }

    #[test]
    fn test_empty_element_serializes_self_closing() {
        let target = TargetDocument::new("SimulationModel");
        let xml = target.to_xml_string().unwrap();
        assert!(xml.contains("<SimulationModel/>"));
    }
}
