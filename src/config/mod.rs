// ==========================================
// MES 報表與分析子系統 - 配置層
// ==========================================
// 職責: 系統配置管理
// ==========================================

pub mod settings;

// 重導出核心配置
pub use settings::AppConfig;
