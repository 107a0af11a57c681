// ==========================================
// 爆破起爆网络 - 网络拓扑校验引擎
// ==========================================
// 输入: 炮孔 + 连接 + 起爆孔策略
// 输出: ValidatedNetwork 或 全部拓扑违规
// ==========================================
// 合法网络: 有向无环，每孔入度 <= 1，全部炮孔可从起爆孔到达
// 红线: 违规一次性累积返回，不在第一个错误处中断
// 红线: 邻接表每次校验重新构建，不跨修改复用
// ==========================================

mod core;
mod graph;


pub use core::{validate, NetworkValidator};
pub use graph::{ChildEdge, ValidatedNetwork};
