//! End-to-end reconciliation tests
//!
//! Exercise the full path from raw records to claim rows on a real
//! database file, including concurrent submissions for the same person.

use std::path::PathBuf;
use std::sync::Arc;

use fra_common::db::claims::{self, ClaimQuery};
use fra_common::db::init::init_database;
use fra_common::db::models::CandidateClaim;
use fra_common::events::EventBus;
use fra_recon::{BulkImporter, ReconcileEngine, ReconcileOperation};
use serde_json::json;

fn test_db(name: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/fra-recon-{}-{}.db", name, std::process::id()))
}

fn candidate_ram_lal() -> CandidateClaim {
    CandidateClaim {
        claimant_name: "Ram Lal".to_string(),
        aadhaar_no: "123456789012".to_string(),
        village: "Dumburnagar".to_string(),
        district: "Dhalai".to_string(),
        state: "Tripura".to_string(),
        category: "ST".to_string(),
        land_use: "Agriculture".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_lifecycle_insert_merge_noop() {
    let db_path = test_db("lifecycle");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();
    let engine = ReconcileEngine::new(pool.clone(), EventBus::new(16));

    // First digitization pass
    let inserted = engine.reconcile(&candidate_ram_lal(), "ocr", None).await.unwrap();
    assert_eq!(inserted.operation, ReconcileOperation::Inserted);

    // Later register export carries income and a spouse name
    let mut richer = candidate_ram_lal();
    richer.annual_income = Some(48000.0);
    richer.spouse_name = "Kamala Devi".to_string();
    let merged = engine.reconcile(&richer, "csv_import", None).await.unwrap();
    assert_eq!(merged.claim_id(), inserted.claim_id());
    assert_eq!(merged.operation, ReconcileOperation::Updated);
    assert_eq!(merged.changed_fields, vec!["spouse_name", "annual_income"]);

    // Same export submitted again
    let noop = engine.reconcile(&richer, "csv_import", None).await.unwrap();
    assert_eq!(noop.operation, ReconcileOperation::Unchanged);

    let claim = claims::get_claim(&pool, &inserted.claim_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claim.annual_income, Some(48000.0));
    assert_eq!(claim.update_count, 1);
    assert_eq!(claim.last_update_source, "csv_import");

    let history = fra_recon::audit::claim_history(&pool, &inserted.claim_id())
        .await
        .unwrap();
    assert_eq!(history.len(), 1, "only the merge leaves an audit row");
    assert_eq!(history[0].changed_fields, vec!["spouse_name", "annual_income"]);
    assert_eq!(history[0].old_data.annual_income, None);
    assert_eq!(history[0].new_data.annual_income, Some(48000.0));
    assert_eq!(history[0].update_source, "csv_import");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_concurrent_same_identity_yields_single_row() {
    let db_path = test_db("concurrent");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();
    let engine = Arc::new(ReconcileEngine::new(pool.clone(), EventBus::new(16)));

    // Two digitization workers submit the same person at once, each with a
    // field the other lacks
    let mut with_spouse = candidate_ram_lal();
    with_spouse.spouse_name = "Kamala Devi".to_string();
    let mut with_age = candidate_ram_lal();
    with_age.age = Some(52);

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.reconcile(&with_spouse, "worker-a", None).await })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.reconcile(&with_age, "worker-b", None).await })
    };
    let first = a.await.unwrap().unwrap();
    let second = b.await.unwrap().unwrap();

    assert_eq!(first.claim_id(), second.claim_id(), "both must land on one claim");
    let mut operations = vec![first.operation, second.operation];
    operations.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(
        operations,
        vec![ReconcileOperation::Inserted, ReconcileOperation::Updated]
    );

    let rows = claims::list_claims(&pool, &ClaimQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 1, "concurrent submissions must not duplicate");
    assert_eq!(rows[0].spouse_name, "Kamala Devi");
    assert_eq!(rows[0].age, Some(52));
    assert_eq!(rows[0].update_count, 1);

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_identity_separates_namesakes() {
    let db_path = test_db("namesakes");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();
    let engine = ReconcileEngine::new(pool.clone(), EventBus::new(16));

    // An identity-less claim is on file
    let mut keyless = candidate_ram_lal();
    keyless.aadhaar_no.clear();
    engine.reconcile(&keyless, "ocr", None).await.unwrap();

    // A different Ram Lal from the same village arrives with an identity
    // number; matching must not link the two
    let outcome = engine.reconcile(&candidate_ram_lal(), "ocr", None).await.unwrap();
    assert_eq!(outcome.operation, ReconcileOperation::Inserted);

    let rows = claims::list_claims(&pool, &ClaimQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 2);

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_audit_failure_does_not_block_writes() {
    let db_path = test_db("audit-down");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();
    let engine = ReconcileEngine::new(pool.clone(), EventBus::new(16));
    engine.reconcile(&candidate_ram_lal(), "ocr", None).await.unwrap();

    sqlx::query("DROP TABLE claim_audit")
        .execute(&pool)
        .await
        .unwrap();

    let mut richer = candidate_ram_lal();
    richer.annual_income = Some(48000.0);
    let outcome = engine.reconcile(&richer, "csv_import", None).await.unwrap();
    assert_eq!(outcome.operation, ReconcileOperation::Updated);

    let claim = claims::get_claim(&pool, &outcome.claim_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        claim.annual_income,
        Some(48000.0),
        "claim write must survive a dead audit table"
    );

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_bulk_import_against_real_database() {
    let db_path = test_db("bulk");
    let _ = std::fs::remove_file(&db_path);
    let csv_path = PathBuf::from(format!("/tmp/fra-recon-bulk-{}.csv", std::process::id()));

    std::fs::write(
        &csv_path,
        "CLAIMANT_NAME,SPOUSE_NAME,AGE,GENDER,AADHAAR_NO,CATEGORY,VILLAGE,GRAM_PANCHAYAT,TEHSIL,DISTRICT,STATE,CLAIM_TYPE,LAND_CLAIMED,LAND_USE,ANNUAL_INCOME,TAX_PAYER,STATUS_OF_CLAIM,DATE_OF_SUBMISSION\n\
         Ram Lal,Kamala Devi,52,Male,123456789012,ST,Dumburnagar,Dumburnagar GP,Dumburnagar,Dhalai,Tripura,IFR,2.5 acres,Agriculture,\"48,000\",No,Approved,15/03/2021\n\
         Soma Debbarma,,37,Female,,ST,Ambassa,,Ambassa,Dhalai,Tripura,CFR,1 hectare,Habitation,,No,Pending,02/11/2020\n\
         Ram Lal,Kamala Devi,52,Male,123456789012,ST,Dumburnagar,Dumburnagar GP,Dumburnagar,Dhalai,Tripura,IFR,2.5 acres,Agriculture,\"48,000\",No,Approved,15/03/2021\n",
    )
    .unwrap();

    let pool = init_database(&db_path).await.unwrap();
    let engine = Arc::new(ReconcileEngine::new(pool.clone(), EventBus::new(16)));
    let importer = BulkImporter::new(engine);

    let summary = importer.import_csv(&csv_path, "csv_import").await.unwrap();
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.errors, 0);

    let rows = claims::list_claims(&pool, &ClaimQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 2);

    let ram = rows
        .iter()
        .find(|c| c.aadhaar_no == "123456789012")
        .expect("identified claim present");
    assert_eq!(ram.annual_income, Some(48000.0));
    assert_eq!(ram.block_tehsil, "Dumburnagar");
    assert_eq!(
        ram.claim_status,
        fra_common::db::models::ClaimStatus::Approved
    );
    assert_eq!(ram.update_count, 0, "identical duplicate row must be a no-op");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_file(&csv_path);
}

#[tokio::test]
async fn test_normalizer_to_engine_path() {
    let db_path = test_db("normalize");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();
    let engine = ReconcileEngine::new(pool.clone(), EventBus::new(16));

    let raw = json!({
        "Claimant Name": "Bina Reang",
        "Identity Id": "555566667777",
        "Block/Tehsil": "Gandacherra",
        "District": "Dhalai",
        "State": "Tripura",
        "Annual Income": "36,500",
        "Tax Payer": "NO",
        "ocr_confidence": 0.91
    });
    let candidate = fra_recon::normalizer::normalize(raw.as_object().unwrap());
    let outcome = engine.reconcile(&candidate, "ocr", None).await.unwrap();

    let claim = claims::get_claim(&pool, &outcome.claim_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claim.aadhaar_no, "555566667777");
    assert_eq!(claim.block_tehsil, "Gandacherra");
    assert_eq!(claim.annual_income, Some(36500.0));
    assert_eq!(claim.tax_payer, Some(false));
    assert_eq!(claim.gender, "Not Specified");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}
