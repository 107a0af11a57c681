// ==========================================
// 爆破起爆网络 - 领域类型定义
// ==========================================
// 职责: 标识、枚举类型（闭合变体，穷举匹配）
// 红线: 状态字段不用字符串，新增类型必须在所有 match 处显式处理
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 炮孔ID
pub type HoleId = String;

/// 连接ID
pub type ConnectionId = String;

// ==========================================
// 站点键 (Site Key)
// ==========================================
// 一个 (project, site) 对应一张起爆网络
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteKey {
    pub project_id: i64,
    pub site_id: i64,
}

impl SiteKey {
    pub fn new(project_id: i64, site_id: i64) -> Self {
        Self {
            project_id,
            site_id,
        }
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.site_id)
    }
}

// ==========================================
// 连接器类型 (Connector Kind)
// ==========================================
// 仅作信息展示，不参与延时计算
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorKind {
    DetonatingCord, // 导爆索
    Connector,      // 地表延时连接器
}

impl ConnectorKind {
    /// 数据库存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ConnectorKind::DetonatingCord => "DETONATING_CORD",
            ConnectorKind::Connector => "CONNECTOR",
        }
    }

    /// 从数据库字符串解析（未知值返回 None）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DETONATING_CORD" => Some(ConnectorKind::DetonatingCord),
            "CONNECTOR" | "CONNECTORS" => Some(ConnectorKind::Connector),
            _ => None,
        }
    }
}

impl Default for ConnectorKind {
    fn default() -> Self {
        ConnectorKind::DetonatingCord
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 起爆孔策略 (Starting Hole Policy)
// ==========================================
// 多个起爆孔（多个互不相连的子网络）是否允许
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartingHolePolicy {
    /// 允许多个独立子网络，每个子网络恰有一个起爆孔
    IndependentPatterns,
    /// 整个站点只允许一个起爆孔，多于一个即报 MultipleStartingHoles
    SingleInitiation,
}

impl StartingHolePolicy {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StartingHolePolicy::IndependentPatterns => "INDEPENDENT_PATTERNS",
            StartingHolePolicy::SingleInitiation => "SINGLE_INITIATION",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "INDEPENDENT_PATTERNS" => Some(StartingHolePolicy::IndependentPatterns),
            "SINGLE_INITIATION" => Some(StartingHolePolicy::SingleInitiation),
            _ => None,
        }
    }
}

impl Default for StartingHolePolicy {
    fn default() -> Self {
        StartingHolePolicy::IndependentPatterns
    }
}

impl fmt::Display for StartingHolePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_kind_db_round_trip() {
        for kind in [ConnectorKind::DetonatingCord, ConnectorKind::Connector] {
            assert_eq!(ConnectorKind::from_db_str(kind.to_db_str()), Some(kind));
        }
        assert_eq!(ConnectorKind::from_db_str("connectors"), Some(ConnectorKind::Connector));
        assert_eq!(ConnectorKind::from_db_str("fuse"), None);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            StartingHolePolicy::from_db_str(" single_initiation "),
            Some(StartingHolePolicy::SingleInitiation)
        );
        assert_eq!(StartingHolePolicy::default(), StartingHolePolicy::IndependentPatterns);
    }

    #[test]
    fn test_site_key_display() {
        assert_eq!(SiteKey::new(3, 14).to_string(), "3/14");
    }
}
