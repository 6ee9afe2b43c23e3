// ==========================================
// MES 報表與分析子系統 - 命令列主入口
// ==========================================
// 技術棧: Rust + SQLite
// 系統定位: 排程報表 / 資料同步 / 工單分析 / 產能評分
// ==========================================

use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate, Timelike};
use clap::{Parser, Subcommand};
use mes_reporting::config::AppConfig;
use mes_reporting::db;
use mes_reporting::domain::types::ScorePeriod;
use mes_reporting::engine::{
    maintenance, CapacityScoringService, DataCollector, DataSynchronizer, ScorePeriodService,
    TriggerEvaluator, UnifiedReportExecutor, WorkOrderAnalyzer, WorkdayCalendar,
};
use mes_reporting::formatter::ReportFormatter;
use mes_reporting::importer::HolidayCsvImporter;
use mes_reporting::mailer::ReportMailer;
use mes_reporting::repository::analysis_repo::AnalysisRepository;
use mes_reporting::repository::calendar_repo::CalendarRepository;
use mes_reporting::repository::mail_config_repo::MailConfigRepository;
use mes_reporting::repository::report_data_repo::ReportDataRepository;
use mes_reporting::repository::schedule_repo::ScheduleRepository;
use mes_reporting::repository::score_repo::ScoreRepository;
use mes_reporting::repository::source_repo::SourceRepository;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// 維護清理的每日觸發時刻（tick 迴圈內判定）
const MAINTENANCE_HOUR: u32 = 1;

#[derive(Parser)]
#[command(name = "mes-reporting", version, about = "MES 報表與分析子系統")]
struct Cli {
    /// JSON 配置檔路徑
    #[arg(long, default_value = "mes_reporting.json")]
    config: PathBuf,

    /// 覆寫配置中的資料庫路徑
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 常駐排程迴圈（每分鐘檢查觸發）
    Serve,
    /// 單次觸發檢查（外部排程器呼叫）
    Tick,
    /// 立即執行資料同步
    Sync,
    /// 立即執行指定排程的報表
    Report {
        #[arg(long)]
        schedule_id: i64,
    },
    /// 完工工單分析（單筆或批次）
    Analyze {
        #[arg(long)]
        workorder: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        product: Option<String>,
        /// 起始完工日（YYYY-MM-DD，批次模式）
        #[arg(long)]
        start: Option<String>,
        /// 結束完工日（YYYY-MM-DD，批次模式）
        #[arg(long)]
        end: Option<String>,
        /// 已分析過的工單也重新分析
        #[arg(long)]
        force: bool,
    },
    /// 建立期間產能評分
    Score {
        #[arg(long)]
        company: String,
        /// monthly / quarterly / yearly
        #[arg(long, default_value = "monthly")]
        period: String,
    },
    /// 結案評分期間（結案後不得重算）
    ClosePeriod {
        #[arg(long)]
        company: String,
        #[arg(long, default_value = "monthly")]
        period: String,
    },
    /// 匯入假期 CSV
    ImportHolidays { file: PathBuf },
    /// 把啟用排程合成為週期任務列
    SyncTasks,
    /// 清理過期報表檔與執行日誌
    Cleanup,
}

/// 組裝完成的服務集合
///
/// 全部倉儲共用同一條 SQLite 連線（Arc<Mutex<Connection>>）。
struct App {
    conn: Arc<Mutex<Connection>>,
    config: AppConfig,
    schedule_repo: ScheduleRepository,
    trigger: TriggerEvaluator,
    executor: UnifiedReportExecutor,
}

impl App {
    fn new(config: AppConfig) -> anyhow::Result<Self> {
        let conn = db::open_and_init(&config.db_path)
            .with_context(|| format!("資料庫開啟失敗: {}", config.db_path))?;
        let conn = Arc::new(Mutex::new(conn));

        let executor = UnifiedReportExecutor::new(
            DataCollector::new(ReportDataRepository::from_connection(conn.clone())),
            ReportFormatter::new(config.reports_dir()),
            ReportMailer::new(MailConfigRepository::from_connection(conn.clone())),
            DataSynchronizer::new(
                SourceRepository::from_connection(conn.clone()),
                ReportDataRepository::from_connection(conn.clone()),
            ),
            ScheduleRepository::from_connection(conn.clone()),
            ReportDataRepository::from_connection(conn.clone()),
            WorkdayCalendar::new(CalendarRepository::from_connection(conn.clone())),
            &config,
        );

        Ok(Self {
            trigger: TriggerEvaluator::new(ScheduleRepository::from_connection(conn.clone())),
            schedule_repo: ScheduleRepository::from_connection(conn.clone()),
            conn,
            config,
            executor,
        })
    }

    /// 檢查全部啟用排程，觸發到期者
    fn tick(&self) -> anyhow::Result<usize> {
        let now = Local::now().naive_local();
        let mut executed = 0usize;
        for schedule in self.schedule_repo.list_active_schedules()? {
            match self.trigger.should_execute_now(&schedule, now) {
                Ok(true) => {
                    info!("排程到期，開始執行: {}", schedule.name);
                    match self.executor.execute(&schedule, now) {
                        Ok(result) if result.success => {
                            info!("排程執行成功: {} ({})", schedule.name, result.message);
                            executed += 1;
                        }
                        Ok(result) => {
                            warn!("排程執行失敗: {} ({})", schedule.name, result.message);
                        }
                        Err(e) => error!("排程執行異常: {} ({})", schedule.name, e),
                    }
                }
                Ok(false) => {}
                Err(e) => error!("觸發判定失敗: {} ({})", schedule.name, e),
            }
        }
        Ok(executed)
    }

    fn run_maintenance(&self) {
        if let Err(e) =
            maintenance::cleanup_report_files(&self.config.reports_dir(), self.config.report_retention_days)
        {
            warn!("報表檔清理失敗: {}", e);
        }
        if let Err(e) =
            maintenance::cleanup_execution_logs(&self.schedule_repo, self.config.log_retention_days)
        {
            warn!("執行日誌修剪失敗: {}", e);
        }
    }
}

fn parse_date(text: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").with_context(|| format!("日期格式錯誤: {text}"))
}

fn parse_period(text: &str) -> anyhow::Result<ScorePeriod> {
    ScorePeriod::parse(text).ok_or_else(|| anyhow!("未知的評分期間類型: {text}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mes_reporting::logging::init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(db_path) = cli.db {
        config.db_path = db_path;
    }

    info!("==================================================");
    info!("{}", mes_reporting::APP_NAME);
    info!("系統版本: {}", mes_reporting::VERSION);
    info!("使用資料庫: {}", config.db_path);
    info!("==================================================");

    let app = App::new(config)?;

    match cli.command {
        Command::Serve => serve(app).await?,
        Command::Tick => {
            let executed = app.tick()?;
            info!("觸發檢查完成: executed={}", executed);
        }
        Command::Sync => {
            let synchronizer = DataSynchronizer::new(
                SourceRepository::from_connection(app.conn.clone()),
                ReportDataRepository::from_connection(app.conn.clone()),
            );
            let outcome = synchronizer.sync_data()?;
            println!("{}", outcome.message());
        }
        Command::Report { schedule_id } => {
            let schedule = app
                .schedule_repo
                .find_schedule(schedule_id)?
                .ok_or_else(|| anyhow!("排程不存在: id={schedule_id}"))?;
            let now = Local::now().naive_local();
            let result = app.executor.execute(&schedule, now)?;
            println!("{}", result.message);
            if let Some(path) = result.file_path {
                println!("報表檔案: {path}");
            }
        }
        Command::Analyze {
            workorder,
            company,
            product,
            start,
            end,
            force,
        } => {
            let analyzer = WorkOrderAnalyzer::new(
                SourceRepository::from_connection(app.conn.clone()),
                AnalysisRepository::from_connection(app.conn.clone()),
                app.config.packaging_process_name.clone(),
            );
            match workorder {
                Some(workorder_id) => {
                    let company = company.ok_or_else(|| anyhow!("單筆分析需指定 --company"))?;
                    let product = product.ok_or_else(|| anyhow!("單筆分析需指定 --product"))?;
                    let outcome = analyzer.analyze(&workorder_id, &company, &product, force)?;
                    println!("{outcome:?}");
                }
                None => {
                    let start = start.as_deref().map(parse_date).transpose()?;
                    let end = end.as_deref().map(parse_date).transpose()?;
                    let outcome = analyzer.analyze_batch(start, end, company.as_deref(), force)?;
                    println!("{}", outcome.message());
                }
            }
        }
        Command::Score { company, period } => {
            let period = parse_period(&period)?;
            let scoring = CapacityScoringService::new(
                SourceRepository::from_connection(app.conn.clone()),
                ScoreRepository::from_connection(app.conn.clone()),
            );
            let service = ScorePeriodService::new(
                SourceRepository::from_connection(app.conn.clone()),
                ScoreRepository::from_connection(app.conn.clone()),
            );
            let today = Local::now().date_naive();
            let outcome = service.create_period_scores(&scoring, &company, period, today)?;
            println!(
                "期間評分完成：建立 {} 筆，跳過已結案 {} 筆，失敗 {} 筆",
                outcome.created, outcome.skipped_closed, outcome.failed
            );
            let summary = service.get_period_summary(&company, period, today)?;
            println!(
                "{}：共 {} 筆，平均產能分 {:.2}，平均總分 {:.2}",
                summary.period_name,
                summary.total_records,
                summary.avg_capacity_score,
                summary.avg_total_score
            );
        }
        Command::ClosePeriod { company, period } => {
            let period = parse_period(&period)?;
            let service = ScorePeriodService::new(
                SourceRepository::from_connection(app.conn.clone()),
                ScoreRepository::from_connection(app.conn.clone()),
            );
            let updated = service.close_period(&company, period, Local::now().date_naive())?;
            println!("評分期間已結案，共 {updated} 筆記錄");
        }
        Command::ImportHolidays { file } => {
            let importer = HolidayCsvImporter::new(CalendarRepository::from_connection(
                app.conn.clone(),
            ));
            let outcome = importer.import_file(&file)?;
            println!("{}", outcome.message());
            for err in &outcome.errors {
                println!("  {err}");
            }
        }
        Command::SyncTasks => {
            let emitted = app.trigger.sync_schedules_to_tasks()?;
            println!("週期任務合成完成，共 {emitted} 列");
        }
        Command::Cleanup => {
            app.run_maintenance();
            println!("清理完成");
        }
    }

    Ok(())
}

/// 常駐模式：每分鐘觸發檢查，凌晨執行維護清理，Ctrl-C 結束
async fn serve(app: App) -> anyhow::Result<()> {
    info!("排程迴圈啟動（每 60 秒檢查一次）");
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = app.tick() {
                    error!("觸發檢查失敗: {}", e);
                }
                let now = Local::now().naive_local();
                if now.hour() == MAINTENANCE_HOUR && now.minute() == 0 {
                    app.run_maintenance();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("收到中止信號，排程迴圈結束");
                break;
            }
        }
    }
    Ok(())
}
