use fuel_ledger::adapters::csv_routes::load_routes_csv;
use fuel_ledger::adapters::rest::{
    BankRecordsQuery, BankingRequest, CreatePoolRequest, ShipYearQuery,
};
use fuel_ledger::domain::model::RouteFilter;
use fuel_ledger::{ComplianceService, MemoryLedgerStore, RestApi, TargetTable};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

const ROUTES_CSV: &str = "\
id,routeId,vesselType,fuelType,year,ghgIntensity,fuelConsumption,distance,totalEmissions,isBaseline
1,R001,Container,HFO,2024,91.0,5000,12000,4500,true
2,R002,BulkCarrier,LNG,2024,88.0,4800,11500,4200,false
3,R003,Tanker,MGO,2024,93.5,5100,12500,4700,false
4,R004,RoRo,HFO,2025,89.2,4900,11800,4300,false
5,R005,Container,LNG,2025,90.5,4950,11900,4400,false
";

async fn api_with_snapshot(snapshot: &Path) -> RestApi<MemoryLedgerStore, TargetTable> {
    let store = Arc::new(MemoryLedgerStore::open(snapshot).unwrap());
    let service = Arc::new(ComplianceService::new(
        store.clone(),
        Arc::new(TargetTable::default()),
        41_000.0,
    ));

    if store.route_count().await == 0 {
        let mut csv_file = NamedTempFile::new().unwrap();
        csv_file.write_all(ROUTES_CSV.as_bytes()).unwrap();
        let routes = load_routes_csv(csv_file.path()).unwrap();
        service.import_routes(routes).await.unwrap();
    }
    RestApi::new(service)
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= expected.abs() * 1e-9 + 1e-6
}

fn banking(body: serde_json::Value) -> BankingRequest {
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn test_get_cb_envelope() {
    let dir = TempDir::new().unwrap();
    let api = api_with_snapshot(&dir.path().join("ledger.json")).await;

    let query: ShipYearQuery =
        serde_json::from_value(json!({"shipId": "R001", "year": 2024})).unwrap();
    let response = api.get_cb(query).await;

    assert_eq!(response.status, 200);
    let data = &response.body["data"];
    assert_eq!(data["shipId"], "R001");
    assert_eq!(data["year"], 2024);
    // (91.16 - 91.0) * 5000 t * 41000 MJ/t
    assert!(close(data["cbGco2eq"].as_f64().unwrap(), 32_800_000.0));
}

#[tokio::test]
async fn test_get_cb_unknown_ship_is_404() {
    let dir = TempDir::new().unwrap();
    let api = api_with_snapshot(&dir.path().join("ledger.json")).await;

    let response = api
        .get_cb(ShipYearQuery {
            ship_id: "R999".to_string(),
            year: 2024,
        })
        .await;
    assert_eq!(response.status, 404);
    assert_eq!(response.body["category"], "client");
    assert!(response.message().unwrap().contains("R999"));
}

#[tokio::test]
async fn test_bank_and_apply_messages() {
    let dir = TempDir::new().unwrap();
    let api = api_with_snapshot(&dir.path().join("ledger.json")).await;

    let response = api
        .bank(banking(json!({"shipId": "R002", "year": 2024, "amount": 100000000.0})))
        .await;
    assert_eq!(response.status, 200);
    assert!(response.message().unwrap().starts_with("Banked"));

    let response = api
        .apply(banking(json!({"shipId": "R002", "year": 2025, "amount": 40000000.0})))
        .await;
    assert_eq!(response.status, 200);
    assert!(response.message().unwrap().starts_with("Applied"));

    let response = api
        .available(ShipYearQuery {
            ship_id: "R002".to_string(),
            year: 2025,
        })
        .await;
    assert_eq!(response.body["data"]["available"], 60000000.0);

    let response = api
        .bank_records(BankRecordsQuery {
            ship_id: "R002".to_string(),
            year: Some(2024),
        })
        .await;
    let records = response.body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["originYear"], 2024);
    assert_eq!(records[0]["remaining"], 60000000.0);
}

#[tokio::test]
async fn test_banking_errors_carry_messages() {
    let dir = TempDir::new().unwrap();
    let api = api_with_snapshot(&dir.path().join("ledger.json")).await;

    let response = api
        .bank(banking(json!({"shipId": "R002", "year": 2024, "amount": 1e12})))
        .await;
    assert_eq!(response.status, 422);
    assert!(response.message().unwrap().contains("Insufficient surplus"));

    let response = api
        .bank(banking(json!({"shipId": "R002", "year": 2024, "amount": -1.0})))
        .await;
    assert_eq!(response.status, 400);

    let response = api
        .apply(banking(json!({"shipId": "R001", "year": 2025, "amount": 1.0})))
        .await;
    assert_eq!(response.status, 422);
    assert!(response
        .message()
        .unwrap()
        .contains("Insufficient banked balance"));
}

#[tokio::test]
async fn test_create_pool_shapes() {
    let dir = TempDir::new().unwrap();
    let api = api_with_snapshot(&dir.path().join("ledger.json")).await;

    // R004 surplus is far smaller than R005's deficit
    let request: CreatePoolRequest = serde_json::from_value(json!({
        "year": 2025,
        "members": [{"shipId": "R004"}, {"shipId": "R005"}]
    }))
    .unwrap();
    let response = api.create_pool(request).await;
    assert_eq!(response.status, 400);
    assert!(response.message().unwrap().contains("negative"));

    let request: CreatePoolRequest = serde_json::from_value(json!({
        "year": 2024,
        "members": [{"shipId": "R002"}, {"shipId": "R003"}]
    }))
    .unwrap();
    let response = api.create_pool(request).await;
    assert_eq!(response.status, 201);

    let body = &response.body;
    assert!(body["poolId"].as_str().unwrap().starts_with("POOL-2024-"));
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1]["shipId"], "R003");
    assert_eq!(members[1]["cbAfter"], 0.0);
    assert!(members[1]["cbBefore"].as_f64().unwrap() < 0.0);

    let sum_after: f64 = members.iter().map(|m| m["cbAfter"].as_f64().unwrap()).sum();
    assert!(close(sum_after, body["totalCB"].as_f64().unwrap()));

    let pool_id = body["poolId"].as_str().unwrap().to_string();
    let fetched = api.get_pool(&pool_id).await;
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.body, response.body);

    let listed = api.list_pools(Some(2024)).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let again = api
        .create_pool(
            serde_json::from_value(json!({"year": 2024, "members": [{"shipId": "R002"}]}))
                .unwrap(),
        )
        .await;
    assert_eq!(again.status, 409);
}

#[tokio::test]
async fn test_routes_and_baseline() {
    let dir = TempDir::new().unwrap();
    let api = api_with_snapshot(&dir.path().join("ledger.json")).await;

    let response = api.list_routes(RouteFilter::default()).await;
    let routes = response.body.as_array().unwrap();
    assert_eq!(routes.len(), 5);
    assert_eq!(routes[0]["routeId"], "R001");
    assert_eq!(routes[0]["isBaseline"], true);

    let response = api
        .list_routes(RouteFilter {
            year: Some(2025),
            ..Default::default()
        })
        .await;
    assert_eq!(response.body.as_array().unwrap().len(), 2);

    let response = api.set_baseline(3).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["routeId"], "R003");
    assert_eq!(response.body["isBaseline"], true);

    assert_eq!(api.set_baseline(99).await.status, 404);

    let response = api.comparison(Some(2024)).await;
    let comparisons = response.body["data"].as_array().unwrap();
    // two baselines (R001, R003), each compared with the other two 2024 routes
    assert_eq!(comparisons.len(), 4);
    let r003_vs_r001 = comparisons
        .iter()
        .find(|c| c["baselineRouteId"] == "R001" && c["routeId"] == "R003")
        .unwrap();
    assert!(close(
        r003_vs_r001["percentDiff"].as_f64().unwrap(),
        (93.5 / 91.0 - 1.0) * 100.0
    ));
    assert_eq!(r003_vs_r001["compliant"], false);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("ledger.json");

    {
        let api = api_with_snapshot(&snapshot).await;
        let response = api
            .bank(banking(json!({"shipId": "R002", "year": 2024, "amount": 5000.0})))
            .await;
        assert_eq!(response.status, 200);
        api.set_baseline(2).await;
    }

    let api = api_with_snapshot(&snapshot).await;
    let response = api
        .bank_records(BankRecordsQuery {
            ship_id: "R002".to_string(),
            year: None,
        })
        .await;
    assert_eq!(response.body["data"].as_array().unwrap().len(), 1);

    let routes = api.list_routes(RouteFilter::default()).await;
    assert_eq!(routes.body[1]["isBaseline"], true);
}
