// ==========================================
// 集成测试辅助工具
// ==========================================
// 职责: 临时项目库、供应商/迭代准备、ReqIF 文件落盘
// ==========================================

#![allow(dead_code)]

pub mod reqif_builder;

use std::path::PathBuf;

use req_cockpit::domain::{Iteration, Supplier};
use req_cockpit::{logging, ProjectManager, ProjectState};
use tempfile::TempDir;

pub use reqif_builder::{zip_container, ReqifBuilder, SpecObject};

/// 测试项目名称
pub const PROJECT_NAME: &str = "Brake System";

/// 临时工作区: 项目库根目录 + 输入文件目录
pub struct Workspace {
    pub dir: TempDir,
    pub manager: ProjectManager,
    pub state: ProjectState,
}

impl Workspace {
    pub fn new() -> Self {
        logging::init_test();
        let dir = TempDir::new().expect("临时目录");
        let manager = ProjectManager::new(dir.path().join("projects"));
        let state = manager.create(PROJECT_NAME, None).expect("创建项目库");
        Self {
            dir,
            manager,
            state,
        }
    }

    pub fn project_id(&self) -> i64 {
        self.state.project_id()
    }

    /// 写入输入文件
    pub fn write_file(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("写入测试文件");
        path
    }

    pub fn add_supplier(&self, name: &str) -> Supplier {
        self.state
            .project_api
            .create_supplier(self.project_id(), name, None)
            .expect("创建供应商")
    }

    pub fn add_iteration(&self, iteration_id: &str) -> Iteration {
        self.state
            .project_api
            .create_iteration(self.project_id(), iteration_id, None)
            .expect("创建迭代")
    }

    /// 导入主需求（断言无文档错误）
    pub async fn import_master(&self, builder: &ReqifBuilder) -> req_cockpit::ImportSummary {
        let path = self.write_file("master.reqif", builder.build());
        let summary = self
            .state
            .import_api
            .import_master_file(self.project_id(), path)
            .await
            .expect("主需求导入");
        assert!(!summary.has_errors(), "主需求导入错误: {:?}", summary.errors);
        summary
    }

    /// 导入单个供应商文件
    pub async fn import_feedback(
        &self,
        iteration_id: &str,
        supplier: &Supplier,
        builder: &ReqifBuilder,
    ) -> req_cockpit::ImportSummary {
        let file_name = format!("{}_{}.reqif", supplier.name, iteration_id);
        let path = self.write_file(&file_name, builder.build());
        let summary = self
            .state
            .import_api
            .import_supplier_files(
                self.project_id(),
                iteration_id,
                supplier.supplier_id,
                vec![path],
            )
            .await
            .expect("供应商导入");
        assert!(!summary.has_errors(), "供应商导入错误: {:?}", summary.errors);
        summary
    }
}

/// 三条主需求 R1/R2/R3
pub fn three_requirements() -> ReqifBuilder {
    ReqifBuilder::new()
        .requirement("R1", "The brake shall engage within 50 ms.")
        .requirement("R2", "The pedal force shall not exceed 500 N.")
        .requirement("R3", "The system shall log every activation.")
}
