// ==========================================
// 协调主流程端到端测试
// ==========================================
// 覆盖: 主需求导入 → 供应商反馈 → 状态映射 → 冲突判定 → 决策
// ==========================================

mod helpers;

use helpers::{three_requirements, ReqifBuilder, SpecObject, Workspace};
use req_cockpit::domain::types::MatchStrategy;
use req_cockpit::engine::FilterTerm;
use req_cockpit::{CanonicalStatus, DecisionStatus, ViewFilter, ViewSort};

#[tokio::test]
async fn test_master_then_supplier_feedback_matches_and_reports_orphans() {
    let ws = Workspace::new();
    let acme = ws.add_supplier("Acme");
    ws.add_iteration("I-001");

    let master = ws.import_master(&three_requirements()).await;
    assert_eq!(master.created, 3);
    assert_eq!(master.updated, 0);
    assert!(master.import_id.is_some());

    let feedback = ReqifBuilder::new()
        .feedback("R1", "OK")
        .feedback("R2", "ToBeClarified")
        .feedback("R4", "OK");
    let summary = ws.import_feedback("I-001", &acme, &feedback).await;

    assert_eq!(summary.matched, 2);
    assert_eq!(summary.unmatched, 1);
    assert_eq!(summary.orphans.len(), 1);
    assert_eq!(summary.orphans[0].identifier, "R4");
    assert_eq!(summary.unmapped_statuses, 0);

    let view = ws
        .state
        .cockpit_api
        .build_view(ws.project_id(), "I-001", &ViewFilter::all(), ViewSort::InsertionOrder)
        .unwrap();
    assert_eq!(view.suppliers, vec!["Acme".to_string()]);
    let ids: Vec<&str> = view.requirements.iter().map(|r| r.reqif_id.as_str()).collect();
    assert_eq!(ids, vec!["R1", "R2", "R3"]);

    let r1 = &view.requirements[0].suppliers["Acme"];
    assert_eq!(r1.status, Some(CanonicalStatus::Accepted));
    assert_eq!(r1.raw_status.as_deref(), Some("OK"));

    let r2 = &view.requirements[1].suppliers["Acme"];
    assert_eq!(r2.status, Some(CanonicalStatus::ClarificationNeeded));

    // 无反馈的需求仍有空单元格
    let r3 = &view.requirements[2].suppliers["Acme"];
    assert!(!r3.has_feedback);
    assert_eq!(r3.status, None);
}

#[tokio::test]
async fn test_different_negative_statuses_conflict() {
    let ws = Workspace::new();
    let a = ws.add_supplier("A");
    let b = ws.add_supplier("B");
    ws.add_iteration("I-001");
    ws.import_master(&three_requirements()).await;

    ws.import_feedback("I-001", &a, &ReqifBuilder::new().feedback("R1", "Rejected"))
        .await;
    ws.import_feedback("I-001", &b, &ReqifBuilder::new().feedback("R1", "needs clarification"))
        .await;

    let view = ws
        .state
        .cockpit_api
        .build_view(ws.project_id(), "I-001", &ViewFilter::all(), ViewSort::InsertionOrder)
        .unwrap();
    let r1 = &view.requirements[0];
    assert!(r1.is_conflict);
    assert_eq!(
        r1.disagreeing_suppliers.iter().cloned().collect::<Vec<_>>(),
        vec!["A".to_string(), "B".to_string()]
    );
    assert!(!view.requirements[1].is_conflict);

    // 仅冲突行过滤
    let conflicts = ws
        .state
        .cockpit_api
        .build_view(
            ws.project_id(),
            "I-001",
            &ViewFilter::all().and(FilterTerm::ConflictsOnly),
            ViewSort::InsertionOrder,
        )
        .unwrap();
    assert_eq!(conflicts.requirements.len(), 1);
    assert_eq!(conflicts.total_rows, 3);
}

#[tokio::test]
async fn test_identical_rejections_are_agreement() {
    let ws = Workspace::new();
    let a = ws.add_supplier("A");
    let b = ws.add_supplier("B");
    ws.add_iteration("I-001");
    ws.import_master(&three_requirements()).await;

    ws.import_feedback("I-001", &a, &ReqifBuilder::new().feedback("R1", "Rejected"))
        .await;
    ws.import_feedback("I-001", &b, &ReqifBuilder::new().feedback("R1", "NOK"))
        .await;

    let view = ws
        .state
        .cockpit_api
        .build_view(ws.project_id(), "I-001", &ViewFilter::all(), ViewSort::InsertionOrder)
        .unwrap();
    assert!(!view.requirements[0].is_conflict);
    assert!(view.requirements[0].disagreeing_suppliers.is_empty());
}

#[tokio::test]
async fn test_decision_overwrite_and_history() {
    let ws = Workspace::new();
    ws.add_iteration("I-001");
    ws.add_iteration("I-002");
    ws.import_master(&three_requirements()).await;
    let cockpit = &ws.state.cockpit_api;

    cockpit
        .save_decision(ws.project_id(), "I-001", "R1", DecisionStatus::Deferred, "wait for A", "anna")
        .unwrap();
    cockpit
        .save_decision(ws.project_id(), "I-001", "R1", DecisionStatus::Accepted, "A agreed", "anna")
        .unwrap();

    let current = cockpit
        .get_decision(ws.project_id(), "I-001", "R1")
        .unwrap()
        .unwrap();
    assert_eq!(current.status, DecisionStatus::Accepted);
    assert_eq!(current.note, "A agreed");

    let history = cockpit.decision_history(ws.project_id(), "R1").unwrap();
    assert_eq!(history.len(), 1);

    cockpit
        .save_decision(ws.project_id(), "I-002", "R1", DecisionStatus::Modified, "relaxed to 60 ms", "ben")
        .unwrap();
    let history = cockpit.decision_history(ws.project_id(), "R1").unwrap();
    let iterations: Vec<&str> = history.iter().map(|h| h.iteration_id.as_str()).collect();
    assert_eq!(iterations, vec!["I-001", "I-002"]);
    assert_eq!(history[0].decision.note, "A agreed");
    assert_eq!(history[1].decision.status, DecisionStatus::Modified);

    // 视图携带当前迭代的决策
    let view = cockpit
        .build_view(ws.project_id(), "I-002", &ViewFilter::all(), ViewSort::InsertionOrder)
        .unwrap();
    let decision = view.requirements[0].decision.as_ref().unwrap();
    assert_eq!(decision.author, "ben");
    assert!(view.requirements[1].decision.is_none());
}

#[tokio::test]
async fn test_decision_validation() {
    let ws = Workspace::new();
    ws.add_iteration("I-001");
    ws.import_master(&three_requirements()).await;
    let cockpit = &ws.state.cockpit_api;

    let err = cockpit
        .save_decision(ws.project_id(), "I-001", "R1", DecisionStatus::Accepted, "", "  ")
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");

    let long_note = "x".repeat(2001);
    let err = cockpit
        .save_decision(ws.project_id(), "I-001", "R1", DecisionStatus::Accepted, &long_note, "anna")
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");

    let err = cockpit
        .save_decision(ws.project_id(), "I-001", "R9", DecisionStatus::Accepted, "", "anna")
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let err = cockpit
        .save_decision(ws.project_id(), "I-404", "R1", DecisionStatus::Accepted, "", "anna")
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_iterations_keep_feedback_apart() {
    let ws = Workspace::new();
    let acme = ws.add_supplier("Acme");
    ws.add_iteration("I-001");
    ws.add_iteration("I-002");
    ws.import_master(&three_requirements()).await;

    ws.import_feedback("I-001", &acme, &ReqifBuilder::new().feedback("R1", "Rejected"))
        .await;
    ws.import_feedback("I-002", &acme, &ReqifBuilder::new().feedback("R1", "Accepted"))
        .await;

    let cockpit = &ws.state.cockpit_api;
    let first = cockpit
        .build_view(ws.project_id(), "I-001", &ViewFilter::all(), ViewSort::InsertionOrder)
        .unwrap();
    let second = cockpit
        .build_view(ws.project_id(), "I-002", &ViewFilter::all(), ViewSort::InsertionOrder)
        .unwrap();
    assert_eq!(
        first.requirements[0].suppliers["Acme"].status,
        Some(CanonicalStatus::Rejected)
    );
    assert_eq!(
        second.requirements[0].suppliers["Acme"].status,
        Some(CanonicalStatus::Accepted)
    );
}

#[tokio::test]
async fn test_reimport_same_iteration_replaces_feedback() {
    let ws = Workspace::new();
    let acme = ws.add_supplier("Acme");
    ws.add_iteration("I-001");
    ws.import_master(&three_requirements()).await;

    ws.import_feedback(
        "I-001",
        &acme,
        &ReqifBuilder::new().object(SpecObject::new("R1").status("Rejected").comment("too fast")),
    )
    .await;
    ws.import_feedback(
        "I-001",
        &acme,
        &ReqifBuilder::new().object(SpecObject::new("R1").status("OK").comment("fine now")),
    )
    .await;

    let snapshot = ws
        .state
        .cockpit_api
        .load_snapshot(ws.project_id(), "I-001")
        .unwrap();
    assert_eq!(snapshot.feedback.len(), 1);
    assert_eq!(snapshot.feedback[0].canonical_status, CanonicalStatus::Accepted);
    assert_eq!(snapshot.feedback[0].comment.as_deref(), Some("fine now"));
    assert_eq!(snapshot.feedback[0].match_strategy, MatchStrategy::ResolvedId);
}
