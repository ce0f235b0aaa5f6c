//! End-to-end batch scenarios against both store adapters.

use clinic_core::{
    ClinicError, ClinicService, CoreConfig, Department, GroupingPolicy, MedicationPolicy,
    PatientRequest, RequestFilter, Status, TaskBatch,
};
use clinic_store::{DocumentStore, MemoryStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

fn task_json(
    id: &str,
    patient: &str,
    status: &str,
    department: &str,
    updated: &str,
    medications: &[&str],
) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "patient_id": patient,
        "status": status,
        "assigned_to": department,
        "created_date": "2023-05-01T09:00:00",
        "updated_date": updated,
        "message": format!("Message for {id}"),
        "medications": medications
            .iter()
            .map(|code| serde_json::json!({"code": code, "name": format!("{code} name")}))
            .collect::<Vec<_>>(),
        "pharmacy_id": 123
    })
}

fn batch(tasks: Vec<serde_json::Value>) -> TaskBatch {
    TaskBatch::parse(&serde_json::json!({ "tasks": tasks }).to_string()).unwrap()
}

fn setup_service(grouping: GroupingPolicy) -> ClinicService {
    let cfg = CoreConfig::new(None, grouping, MedicationPolicy::Concatenate).unwrap();
    ClinicService::with_store(Arc::new(MemoryStore::new()), &cfg)
}

fn open_requests(service: &ClinicService, patient: &str) -> Vec<PatientRequest> {
    service
        .list_requests(&RequestFilter {
            patient_id: Some(patient.into()),
            status: Some(Status::Open),
            ..Default::default()
        })
        .unwrap()
}

fn all_requests(service: &ClinicService) -> Vec<PatientRequest> {
    service.list_requests(&RequestFilter::default()).unwrap()
}

/// Each task id appears in at most one request.
fn assert_exclusive_membership(service: &ClinicService) {
    let mut seen = BTreeSet::new();
    for request in all_requests(service) {
        for id in &request.task_ids {
            assert!(seen.insert(id.clone()), "task {id} owned twice");
        }
    }
}

#[test]
fn test_per_patient_open_then_closed() {
    let service = setup_service(GroupingPolicy::PerPatient);

    service
        .process_batch(&batch(vec![
            task_json(
                "task1",
                "patient1",
                "Open",
                "Primary",
                "2023-05-01T10:00:00",
                &["ACET001", "IBU001"],
            ),
            task_json("task2", "patient1", "Open", "Primary", "2023-05-01T11:00:00", &["LISI001"]),
        ]))
        .unwrap();

    let open = open_requests(&service, "patient1");
    assert_eq!(open.len(), 1);

    let view = service.request_view(&open[0].id).unwrap();
    assert_eq!(view.messages, vec!["Message for task1", "Message for task2"]);
    let codes: BTreeSet<_> = view.medications.iter().map(|m| m.code.as_str()).collect();
    assert_eq!(codes, BTreeSet::from(["ACET001", "IBU001", "LISI001"]));

    service
        .process_batch(&batch(vec![
            task_json("task1", "patient1", "Closed", "Primary", "2023-05-02T10:00:00", &[]),
            task_json("task2", "patient1", "Closed", "Primary", "2023-05-02T11:00:00", &[]),
        ]))
        .unwrap();

    assert!(open_requests(&service, "patient1").is_empty());
    let all = all_requests(&service);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, open[0].id);
    assert_eq!(all[0].status, Status::Closed);
    assert_eq!(all[0].task_ids.len(), 2);
}

#[test]
fn test_per_department_split() {
    let service = setup_service(GroupingPolicy::PerDepartment);

    service
        .process_batch(&batch(vec![
            task_json("task3", "patient2", "Open", "Primary", "2023-05-01T10:00:00", &["AMOX001"]),
            task_json(
                "task4",
                "patient2",
                "Open",
                "Dermatology",
                "2023-05-01T11:00:00",
                &["HYDR001"],
            ),
        ]))
        .unwrap();

    let open = open_requests(&service, "patient2");
    assert_eq!(open.len(), 2);
    for request in &open {
        let view = service.request_view(&request.id).unwrap();
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.medications.len(), 1);
        let expected = match request.assigned_to {
            Department::Primary => "AMOX001",
            Department::Dermatology => "HYDR001",
            other => panic!("unexpected department {other}"),
        };
        assert_eq!(view.medications[0].code.as_str(), expected);
    }
}

#[test]
fn test_reassignment_between_departments() {
    let service = setup_service(GroupingPolicy::PerDepartment);

    service
        .process_batch(&batch(vec![task_json(
            "task5",
            "patient3",
            "Open",
            "Primary",
            "2023-05-01T10:00:00",
            &[],
        )]))
        .unwrap();
    let first = open_requests(&service, "patient3");
    assert_eq!(first.len(), 1);

    let report = service
        .process_batch(&batch(vec![task_json(
            "task5",
            "patient3",
            "Open",
            "Radiology",
            "2023-05-02T10:00:00",
            &[],
        )]))
        .unwrap();
    assert_eq!(report.closed_by_repair, 1);

    let open = open_requests(&service, "patient3");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].assigned_to, Department::Radiology);
    assert!(open[0].contains_task("task5"));

    let closed_view = service.request_view(&first[0].id).unwrap();
    assert_eq!(closed_view.request.status, Status::Closed);
    assert!(closed_view.messages.is_empty());

    assert_exclusive_membership(&service);
}

#[test]
fn test_replaying_batches_is_idempotent() {
    for grouping in [GroupingPolicy::PerPatient, GroupingPolicy::PerDepartment] {
        let service = setup_service(grouping);
        let batches = [
            batch(vec![
                task_json(
                    "task1",
                    "patient1",
                    "Open",
                    "Primary",
                    "2023-05-01T10:00:00",
                    &["ACET001"],
                ),
                task_json("task2", "patient1", "Open", "Radiology", "2023-05-01T11:00:00", &[]),
            ]),
            batch(vec![
                task_json("task1", "patient1", "Closed", "Primary", "2023-05-02T10:00:00", &[]),
                task_json("task2", "patient1", "Closed", "Radiology", "2023-05-02T11:00:00", &[]),
            ]),
        ];

        for b in &batches {
            service.process_batch(b).unwrap();
        }
        let before = all_requests(&service);

        let report = service.process_batch(&batches[1]).unwrap();
        assert_eq!(report.inserted, 0, "{grouping}");
        assert_eq!(report.updated, 0, "{grouping}");
        assert_eq!(all_requests(&service), before, "{grouping}");
    }
}

#[test]
fn test_single_open_request_per_key() {
    let service = setup_service(GroupingPolicy::PerPatient);
    for (i, day) in ["01", "02", "03"].iter().enumerate() {
        service
            .process_batch(&batch(vec![task_json(
                &format!("task{i}"),
                "patient1",
                "Open",
                "Primary",
                &format!("2023-05-{day}T10:00:00"),
                &[],
            )]))
            .unwrap();
    }

    let open = open_requests(&service, "patient1");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].task_ids.len(), 3);
}

#[test]
fn test_multiple_owners_reported() {
    let store = Arc::new(MemoryStore::new());
    let cfg = CoreConfig::new(None, GroupingPolicy::PerDepartment, MedicationPolicy::Concatenate)
        .unwrap();
    let service = ClinicService::with_store(store.clone(), &cfg);

    for department in ["Primary", "Radiology"] {
        store
            .insert(
                "PatientRequest",
                serde_json::json!({
                    "id": clinic_core::RequestId::new().to_string(),
                    "patient_id": "patient4",
                    "status": "Open",
                    "assigned_to": department,
                    "created_date": "2023-05-01T10:00:00Z",
                    "updated_date": "2023-05-01T10:00:00Z",
                    "pharmacy_id": null,
                    "task_ids": ["task9"]
                }),
            )
            .unwrap();
    }

    let result = service.process_batch(&batch(vec![task_json(
        "task9",
        "patient4",
        "Open",
        "Dermatology",
        "2023-05-02T10:00:00",
        &[],
    )]));
    assert!(matches!(result, Err(ClinicError::MultipleOwners { .. })));

    // The batch's tasks were stored before reconciliation failed.
    let stored = store.all("Tasks").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["id"], "task9");
    assert_eq!(stored[0]["assigned_to"], "Dermatology");
}

#[test]
fn test_late_closed_task_keeps_full_closed_request() {
    let service = setup_service(GroupingPolicy::PerPatient);

    service
        .process_batch(&batch(vec![
            task_json("t1", "patient1", "Open", "Primary", "2023-05-01T10:00:00", &[]),
            task_json("t2", "patient1", "Open", "Primary", "2023-05-01T11:00:00", &[]),
        ]))
        .unwrap();
    service
        .process_batch(&batch(vec![
            task_json("t1", "patient1", "Closed", "Primary", "2023-05-02T10:00:00", &[]),
            task_json("t2", "patient1", "Closed", "Primary", "2023-05-02T11:00:00", &[]),
        ]))
        .unwrap();
    let closed = all_requests(&service);
    assert_eq!(closed.len(), 1);

    service
        .process_batch(&batch(vec![task_json(
            "t1",
            "patient1",
            "Closed",
            "Primary",
            "2023-05-03T10:00:00",
            &[],
        )]))
        .unwrap();

    let after = all_requests(&service);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, closed[0].id);
    assert_eq!(after[0].status, Status::Closed);
    assert!(after[0].contains_task("t1"));
    assert!(after[0].contains_task("t2"));
    assert_exclusive_membership(&service);

    let view = service.request_view(&after[0].id).unwrap();
    assert_eq!(view.messages, vec!["Message for t2", "Message for t1"]);
}

#[test]
fn test_empty_batch_is_noop() {
    let store = Arc::new(MemoryStore::new());
    let service = ClinicService::with_store(store.clone(), &CoreConfig::default());

    let report = service.process_batch(&TaskBatch::parse(r#"{"tasks": []}"#).unwrap()).unwrap();
    assert_eq!(report.groups, 0);
    assert_eq!(store.len("Tasks").unwrap(), 0);
    assert_eq!(store.len("PatientRequest").unwrap(), 0);
}

#[test]
fn test_file_store_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = CoreConfig::new(
        Some(temp_dir.path().join("data").join("db.json")),
        GroupingPolicy::PerPatient,
        MedicationPolicy::DeduplicateByCode,
    )
    .unwrap();

    let request_id = {
        let service = ClinicService::new(&cfg).unwrap();
        service
            .process_batch(&batch(vec![
                task_json(
                    "task1",
                    "patient1",
                    "Open",
                    "Primary",
                    "2023-05-01T10:00:00",
                    &["ACET001"],
                ),
                task_json(
                    "task2",
                    "patient1",
                    "Open",
                    "Primary",
                    "2023-05-01T11:00:00",
                    &["ACET001"],
                ),
            ]))
            .unwrap();
        open_requests(&service, "patient1")[0].id
    };

    let reopened = ClinicService::new(&cfg).unwrap();
    let view = reopened.request_view(&request_id).unwrap();
    assert_eq!(view.messages.len(), 2);
    assert_eq!(view.medications.len(), 1);
}

#[test]
fn test_unknown_request_not_found() {
    let service = setup_service(GroupingPolicy::PerPatient);
    let result = service.request_view(&clinic_core::RequestId::new());
    assert!(matches!(result, Err(ClinicError::RequestNotFound(_))));
}
