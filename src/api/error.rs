// ==========================================
// 爆破起爆网络 - API层错误类型
// ==========================================
// 职责: 汇总引擎、拓扑、仓储错误，转换为调用方可处理的错误
// 红线: 所有失败以返回值表达，拒绝时给出完整原因
// ==========================================

use crate::domain::violation::{TopologyViolation, ViolationKind};
use crate::engine::error::{GeometryError, PatternError};
use crate::engine::pipeline::PipelineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 计算与校验错误
    // ==========================================
    #[error("孔几何无效: {0}")]
    Geometry(#[from] GeometryError),

    #[error("布孔生成失败: {0}")]
    Pattern(#[from] PatternError),

    /// 拓扑违规（完整列表）
    #[error("网络拓扑校验失败: {} 项违规", .violations.len())]
    Topology { violations: Vec<TopologyViolation> },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("操作冲突: {0}")]
    Conflict(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("锁获取失败: {0}")]
    LockError(String),
}

impl ApiError {
    /// 拓扑违规类型（非拓扑错误返回空）
    pub fn violation_kinds(&self) -> Vec<ViolationKind> {
        match self {
            ApiError::Topology { violations } => violations.iter().map(|v| v.kind()).collect(),
            _ => Vec::new(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => ApiError::LockError(msg),
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段{}错误: {}", field, message))
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Geometry(e) => ApiError::Geometry(e),
            PipelineError::Topology(violations) => ApiError::Topology { violations },
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
