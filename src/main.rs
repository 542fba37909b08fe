// ==========================================
// 需求协调驾驶舱 - 命令行入口
// ==========================================
// 用法:
//   req-cockpit [--home DIR] [--lang zh-CN|en] [--log-json] <命令> ...
//
//   init <项目> [--description 文本]
//   projects
//   delete <项目>
//   supplier <项目> add <名称> [--short 简称]
//   supplier <项目> list
//   iteration <项目> add <迭代> [--description 文本]
//   iteration <项目> list
//   iteration <项目> close <迭代>
//   import-master <项目> <文件>
//   import-supplier <项目> <迭代> <供应商名称> <文件>...
//   view <项目> <迭代> [过滤选项] [--json]
//   export <项目> <迭代> <输出.csv> [过滤选项]
//
// 过滤选项: --text 文本 / --status 状态 / --conflicts /
//           --suppliers A,B / --sort insertion|id|id_desc|conflicts
// ==========================================

use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::{Args, Parser, Subcommand};
use req_cockpit::api::{run_blocking, ApiError};
use req_cockpit::domain::ImportSummary;
use req_cockpit::engine::{AggregationView, FilterTerm, ViewFilter, ViewSort};
use req_cockpit::i18n::{set_locale, t_with_args};
use req_cockpit::{logging, CanonicalStatus, ProjectManager, ProjectState};

/// 多供应商 ReqIF 需求协调驾驶舱
#[derive(Parser, Debug)]
#[command(name = "req-cockpit", about = "Multi-supplier ReqIF requirement cockpit", version)]
struct Cli {
    /// 项目库根目录（缺省取 REQ_COCKPIT_HOME 或用户数据目录）
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    /// 界面语言（zh-CN / en）
    #[arg(long, global = true)]
    lang: Option<String>,

    /// 以 JSON 行输出日志
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 创建项目
    Init {
        project: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// 列出项目
    Projects,
    /// 删除项目
    Delete { project: String },
    /// 供应商管理
    Supplier {
        project: String,
        #[command(subcommand)]
        action: SupplierAction,
    },
    /// 迭代管理
    Iteration {
        project: String,
        #[command(subcommand)]
        action: IterationAction,
    },
    /// 导入主需求文件（.reqif / .reqifz）
    ImportMaster { project: String, file: PathBuf },
    /// 导入供应商反馈文件
    ImportSupplier {
        project: String,
        iteration: String,
        supplier: String,
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// 查看聚合视图
    View {
        project: String,
        iteration: String,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        filter: ViewArgs,
    },
    /// 导出聚合视图为 CSV
    Export {
        project: String,
        iteration: String,
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        #[command(flatten)]
        filter: ViewArgs,
    },
}

#[derive(Subcommand, Debug)]
enum SupplierAction {
    /// 登记供应商
    Add {
        name: String,
        #[arg(long)]
        short: Option<String>,
    },
    /// 列出供应商
    List,
}

#[derive(Subcommand, Debug)]
enum IterationAction {
    /// 创建迭代
    Add {
        id: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// 列出迭代
    List,
    /// 关闭迭代（之后拒绝反馈导入）
    Close { id: String },
}

/// 视图过滤与排序选项
#[derive(Args, Debug, Default)]
struct ViewArgs {
    /// 需求文本子串（不区分大小写）
    #[arg(long)]
    text: Option<String>,
    /// 任一供应商具有该规范状态
    #[arg(long)]
    status: Option<String>,
    /// 仅冲突需求
    #[arg(long)]
    conflicts: bool,
    /// 可见供应商列（逗号分隔）
    #[arg(long, value_delimiter = ',')]
    suppliers: Option<Vec<String>>,
    /// insertion / id / id_desc / conflicts
    #[arg(long)]
    sort: Option<String>,
}

impl ViewArgs {
    fn to_filter(&self) -> anyhow::Result<(ViewFilter, ViewSort)> {
        let mut filter = ViewFilter::all();
        if let Some(text) = &self.text {
            filter = filter.and(FilterTerm::Text(text.clone()));
        }
        if let Some(status) = &self.status {
            let status = CanonicalStatus::from_str(status)
                .ok_or_else(|| anyhow!("无法识别的状态: {}", status))?;
            filter = filter.and(FilterTerm::Status(status));
        }
        if self.conflicts {
            filter = filter.and(FilterTerm::ConflictsOnly);
        }
        if let Some(suppliers) = &self.suppliers {
            let visible = suppliers
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            filter = filter.with_visible_suppliers(visible);
        }
        let sort = match &self.sort {
            Some(sort) => {
                ViewSort::from_str(sort).ok_or_else(|| anyhow!("无法识别的排序方式: {}", sort))?
            }
            None => ViewSort::default(),
        };
        Ok((filter, sort))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    if let Err(err) = run(cli).await {
        let message = match err.downcast_ref::<ApiError>() {
            Some(api_err) => t_with_args(
                "cli.error",
                &[("code", api_err.code()), ("message", &api_err.to_string())],
            ),
            None => format!("{:#}", err),
        };
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let manager = match cli.home {
        Some(home) => ProjectManager::new(home),
        None => ProjectManager::from_env(),
    };
    if let Some(lang) = &cli.lang {
        set_locale(lang);
    }

    match cli.command {
        Command::Init { project, description } => {
            manager.create(&project, description.as_deref())?;
            let path = manager.store_path(&project)?;
            println!(
                "{}",
                t_with_args("cli.project_created", &[("path", &path.display().to_string())])
            );
        }
        Command::Projects => {
            for name in manager.list()? {
                println!("{}", name);
            }
        }
        Command::Delete { project } => {
            manager.delete(&project)?;
            println!("{}", t_with_args("cli.project_deleted", &[("name", &project)]));
        }
        Command::Supplier { project, action } => {
            let state = manager.open(&project)?;
            run_supplier(&state, action)?;
        }
        Command::Iteration { project, action } => {
            let state = manager.open(&project)?;
            run_iteration(&state, action)?;
        }
        Command::ImportMaster { project, file } => {
            let state = manager.open(&project)?;
            let summary = state
                .import_api
                .import_master_file(state.project_id(), file)
                .await?;
            print_summary(&summary)?;
        }
        Command::ImportSupplier {
            project,
            iteration,
            supplier,
            files,
        } => {
            let state = manager.open(&project)?;
            let supplier = state
                .project_api
                .get_supplier_by_name(state.project_id(), &supplier)?;
            let summary = state
                .import_api
                .import_supplier_files(state.project_id(), &iteration, supplier.supplier_id, files)
                .await?;
            print_summary(&summary)?;
        }
        Command::View {
            project,
            iteration,
            json,
            filter,
        } => {
            let (filter, sort) = filter.to_filter()?;
            let state = manager.open(&project)?;
            let view = state
                .cockpit_api
                .build_view(state.project_id(), &iteration, &filter, sort)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_view(&view);
            }
        }
        Command::Export {
            project,
            iteration,
            output,
            filter,
        } => {
            let (filter, sort) = filter.to_filter()?;
            let state = manager.open(&project)?;
            let export_api = state.export_api.clone();
            let project_id = state.project_id();
            let target = output.clone();
            let rows = run_blocking(move || {
                export_api.export_view_csv_file(project_id, &iteration, &filter, sort, &target)
            })
            .await?;
            println!(
                "{}",
                t_with_args(
                    "cli.exported",
                    &[("rows", &rows.to_string()), ("path", &output.display().to_string())]
                )
            );
        }
    }
    Ok(())
}

fn run_supplier(state: &ProjectState, action: SupplierAction) -> anyhow::Result<()> {
    match action {
        SupplierAction::Add { name, short } => {
            let supplier =
                state
                    .project_api
                    .create_supplier(state.project_id(), &name, short.as_deref())?;
            println!(
                "{}",
                t_with_args(
                    "cli.supplier_created",
                    &[("name", &supplier.name), ("id", &supplier.supplier_id.to_string())]
                )
            );
        }
        SupplierAction::List => {
            for supplier in state.project_api.list_suppliers(state.project_id())? {
                println!(
                    "{}\t{}\t{}",
                    supplier.supplier_id,
                    supplier.name,
                    supplier.short_name.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

fn run_iteration(state: &ProjectState, action: IterationAction) -> anyhow::Result<()> {
    match action {
        IterationAction::Add { id, description } => {
            let iteration =
                state
                    .project_api
                    .create_iteration(state.project_id(), &id, description.as_deref())?;
            println!(
                "{}",
                t_with_args("cli.iteration_created", &[("id", &iteration.iteration_id)])
            );
        }
        IterationAction::List => {
            for iteration in state.project_api.list_iterations(state.project_id())? {
                let closed = iteration
                    .closed_at
                    .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}\t{}",
                    iteration.iteration_id,
                    iteration.created_at.format("%Y-%m-%d %H:%M"),
                    closed,
                    iteration.description.as_deref().unwrap_or("")
                );
            }
        }
        IterationAction::Close { id } => {
            let iteration = state.project_api.close_iteration(state.project_id(), &id)?;
            println!(
                "{}",
                t_with_args("cli.iteration_closed", &[("id", &iteration.iteration_id)])
            );
        }
    }
    Ok(())
}

fn print_summary(summary: &ImportSummary) -> anyhow::Result<()> {
    if summary.has_errors() {
        for error in &summary.errors {
            eprintln!("{}", error.message);
        }
        bail!(t_with_args(
            "cli.import_rejected",
            &[("count", &summary.errors.len().to_string())]
        ));
    }

    for warning in &summary.warnings {
        eprintln!("{}", warning.message);
    }
    let import_id = summary.import_id.as_deref().unwrap_or("-");
    let line = match summary.kind {
        req_cockpit::ImportKind::Master => t_with_args(
            "cli.master_imported",
            &[
                ("import_id", import_id),
                ("created", &summary.created.to_string()),
                ("updated", &summary.updated.to_string()),
                ("skipped", &summary.skipped.to_string()),
            ],
        ),
        req_cockpit::ImportKind::Supplier => t_with_args(
            "cli.feedback_imported",
            &[
                ("import_id", import_id),
                ("matched", &summary.matched.to_string()),
                ("unmatched", &summary.unmatched.to_string()),
                ("unmapped", &summary.unmapped_statuses.to_string()),
            ],
        ),
    };
    println!("{}", line);
    for orphan in &summary.orphans {
        println!("  orphan\t{}\t{}", orphan.identifier, orphan.source);
    }
    Ok(())
}

fn print_view(view: &AggregationView) {
    let mut header = vec!["reqif_id".to_string()];
    header.extend(view.suppliers.iter().cloned());
    header.push("conflict".to_string());
    header.push("decision".to_string());
    println!("{}", header.join("\t"));

    for row in &view.requirements {
        let mut line = vec![row.reqif_id.clone()];
        for supplier in &view.suppliers {
            let status = row
                .suppliers
                .get(supplier)
                .and_then(|cell| cell.status)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            line.push(status);
        }
        line.push(if row.is_conflict { "!" } else { "" }.to_string());
        line.push(
            row.decision
                .as_ref()
                .map(|d| d.status.to_string())
                .unwrap_or_default(),
        );
        println!("{}", line.join("\t"));
    }
    println!(
        "{}",
        t_with_args(
            "cli.view_footer",
            &[
                ("rows", &view.requirements.len().to_string()),
                ("total", &view.total_rows.to_string())
            ]
        )
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(items: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("req-cockpit").chain(items.iter().copied()))
    }

    #[test]
    fn test_view_options() {
        let cli = parse(&[
            "view", "demo", "I-001", "--status", "rejected", "--conflicts", "--suppliers",
            "Acme, Bolt", "--sort", "id",
        ])
        .unwrap();
        let Command::View { project, iteration, json, filter } = cli.command else {
            panic!("expected view command");
        };
        assert_eq!(project, "demo");
        assert_eq!(iteration, "I-001");
        assert!(!json);
        let (filter, sort) = filter.to_filter().unwrap();
        assert_eq!(sort, ViewSort::ReqifIdAsc);
        assert_eq!(filter.terms.len(), 2);
        assert_eq!(
            filter.visible_suppliers,
            Some(vec!["Acme".to_string(), "Bolt".to_string()])
        );
    }

    #[test]
    fn test_missing_option_value() {
        assert!(parse(&["view", "demo", "I-001", "--text"]).is_err());
    }

    #[test]
    fn test_unknown_status_and_sort_rejected() {
        let bad_status = ViewArgs {
            status: Some("maybe".to_string()),
            ..Default::default()
        };
        assert!(bad_status.to_filter().is_err());
        let bad_sort = ViewArgs {
            sort: Some("random".to_string()),
            ..Default::default()
        };
        assert!(bad_sort.to_filter().is_err());
    }

    #[test]
    fn test_option_values_are_not_taken_as_flags() {
        // 取值恰好是另一个选项名时仍归属前一个选项
        let cli = parse(&["init", "demo", "--description=--home"]).unwrap();
        assert!(cli.home.is_none());
        let Command::Init { project, description } = cli.command else {
            panic!("expected init command");
        };
        assert_eq!(project, "demo");
        assert_eq!(description.as_deref(), Some("--home"));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = parse(&["supplier", "demo", "add", "Acme", "--short", "AC", "--home", "/tmp/x", "--lang", "en"])
            .unwrap();
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cli.lang.as_deref(), Some("en"));
        match cli.command {
            Command::Supplier {
                action: SupplierAction::Add { name, short },
                ..
            } => {
                assert_eq!(name, "Acme");
                assert_eq!(short.as_deref(), Some("AC"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_import_supplier_requires_files() {
        assert!(parse(&["import-supplier", "demo", "I-001", "Acme"]).is_err());
        let cli = parse(&["import-supplier", "demo", "I-001", "Acme", "a.reqif", "b.reqifz"]).unwrap();
        let Command::ImportSupplier { files, .. } = cli.command else {
            panic!("expected import-supplier command");
        };
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
