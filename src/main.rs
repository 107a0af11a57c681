// ==========================================
// 爆破起爆网络 - 命令行入口
// ==========================================
// 用法: blast-network [db_path] <project_id> <site_id>
// 输出: 站点网络快照（JSON）
// ==========================================

use blast_network::app::{get_default_db_path, AppState};
use blast_network::SiteKey;

const USAGE: &str = "用法: blast-network [db_path] <project_id> <site_id>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    blast_network::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", blast_network::APP_NAME);
    tracing::info!("系统版本: {}", blast_network::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (db_path, project_arg, site_arg) = match args.as_slice() {
        [project, site] => (get_default_db_path(), project, site),
        [db, project, site] => (db.clone(), project, site),
        _ => anyhow::bail!(USAGE),
    };

    let project_id: i64 = project_arg
        .parse()
        .map_err(|_| anyhow::anyhow!("project_id 无效: {}\n{}", project_arg, USAGE))?;
    let site_id: i64 = site_arg
        .parse()
        .map_err(|_| anyhow::anyhow!("site_id 无效: {}\n{}", site_arg, USAGE))?;

    tracing::info!(db_path = %db_path, "使用数据库");
    let state = AppState::new(db_path).await.map_err(anyhow::Error::msg)?;

    let view = state
        .network_service
        .view(SiteKey::new(project_id, site_id))?;

    if !view.is_consistent() {
        tracing::warn!(violations = view.load_violations.len(), "站点网络不合法");
    }

    println!("{}", serde_json::to_string_pretty(view.as_ref())?);
    Ok(())
}
