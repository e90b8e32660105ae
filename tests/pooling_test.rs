use fuel_ledger::domain::model::RouteRecord;
use fuel_ledger::{ComplianceService, LedgerError, MemoryLedgerStore, TargetTable};
use std::collections::BTreeMap;
use std::sync::Arc;

type Service = ComplianceService<MemoryLedgerStore, TargetTable>;

fn service() -> Arc<Service> {
    let targets = TargetTable::new(BTreeMap::from([(2020, 100.0)]));
    Arc::new(ComplianceService::new(
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(targets),
        1.0,
    ))
}

/// Route whose ship ends up with exactly `cb` for `year`.
fn route_with_cb(id: u64, ship: &str, year: i32, cb: f64) -> RouteRecord {
    RouteRecord {
        id,
        route_id: format!("RT{:03}", id),
        ship_id: ship.to_string(),
        vessel_type: "BulkCarrier".to_string(),
        fuel_type: "LNG".to_string(),
        year,
        ghg_intensity: 100.0 - cb / 10.0,
        fuel_consumption: 10.0,
        distance: 500.0,
        total_emissions: 28.0,
        is_baseline: false,
    }
}

async fn fleet(service: &Service, year: i32, cbs: &[(&str, f64)]) {
    let routes = cbs
        .iter()
        .enumerate()
        .map(|(i, (ship, cb))| route_with_cb(i as u64 + 1 + year as u64 * 100, ship, year, *cb))
        .collect();
    service.import_routes(routes).await.unwrap();
}

fn ships(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_valid_pool_covers_deficits() {
    let service = service();
    fleet(&service, 2025, &[("A", 100.0), ("B", -30.0), ("C", -50.0)]).await;

    let pool = service.create_pool(2025, &ships(&["A", "B", "C"])).await.unwrap();

    assert_eq!(pool.year, 2025);
    assert_eq!(pool.total_cb, 20.0);
    let before: Vec<f64> = pool.members.iter().map(|m| m.cb_before).collect();
    let after: Vec<f64> = pool.members.iter().map(|m| m.cb_after).collect();
    assert_eq!(before, vec![100.0, -30.0, -50.0]);
    assert_eq!(after, vec![20.0, 0.0, 0.0]);

    let sum_after: f64 = after.iter().sum();
    assert!((sum_after - pool.total_cb).abs() < 1e-6);
}

#[tokio::test]
async fn test_negative_total_is_rejected_and_nothing_persisted() {
    let service = service();
    fleet(&service, 2025, &[("A", 10.0), ("B", -30.0)]).await;

    let err = service.create_pool(2025, &ships(&["A", "B"])).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidPool { .. }));
    assert!(service.list_pools(Some(2025)).await.unwrap().is_empty());

    // the rejected members are still free to pool
    service
        .import_routes(vec![route_with_cb(99, "D", 2025, 40.0)])
        .await
        .unwrap();
    service.create_pool(2025, &ships(&["A", "B", "D"])).await.unwrap();
}

#[tokio::test]
async fn test_empty_and_duplicate_members() {
    let service = service();
    fleet(&service, 2025, &[("A", 10.0)]).await;

    assert!(matches!(
        service.create_pool(2025, &[]).await,
        Err(LedgerError::InvalidPool { .. })
    ));
    assert!(matches!(
        service.create_pool(2025, &ships(&["A", "A"])).await,
        Err(LedgerError::InvalidPool { .. })
    ));
}

#[tokio::test]
async fn test_member_without_routes_is_no_data() {
    let service = service();
    fleet(&service, 2025, &[("A", 10.0)]).await;

    assert!(matches!(
        service.create_pool(2025, &ships(&["A", "GHOST"])).await,
        Err(LedgerError::NoData { .. })
    ));
    assert!(service.list_pools(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ship_cannot_join_two_pools_in_one_year() {
    let service = service();
    fleet(&service, 2025, &[("A", 50.0), ("B", -10.0), ("C", 5.0)]).await;
    fleet(&service, 2026, &[("A", 5.0)]).await;

    let first = service.create_pool(2025, &ships(&["A", "B"])).await.unwrap();

    let err = service.create_pool(2025, &ships(&["C", "A"])).await.unwrap_err();
    match err {
        LedgerError::AlreadyPooled {
            ship_id, pool_id, ..
        } => {
            assert_eq!(ship_id, "A");
            assert_eq!(pool_id, first.pool_id);
        }
        other => panic!("unexpected error {:?}", other),
    }

    // a different year is a different obligation
    service.create_pool(2026, &ships(&["A"])).await.unwrap();
    assert_eq!(service.list_pools(Some(2025)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_pool_is_readable_after_creation() {
    let service = service();
    fleet(&service, 2025, &[("A", 30.0), ("B", -10.0)]).await;

    let created = service.create_pool(2025, &ships(&["A", "B"])).await.unwrap();
    let fetched = service.get_pool(&created.pool_id).await.unwrap();
    assert_eq!(created, fetched);

    assert!(matches!(
        service.get_pool("POOL-1999-9999").await,
        Err(LedgerError::PoolNotFound { .. })
    ));
}

#[tokio::test]
async fn test_conservation_over_many_shapes() {
    let shapes: [&[f64]; 5] = [
        &[0.5, -0.25, 0.125, -0.3],
        &[1000.0, -999.999],
        &[-1.1, 2.2, -3.3, 4.4, -0.1],
        &[0.0, 0.0, 7.77],
        &[333.333, -111.111, -111.111, -111.0],
    ];

    for (n, cbs) in shapes.iter().enumerate() {
        let service = service();
        let year = 2030 + n as i32;
        let names: Vec<String> = (0..cbs.len()).map(|i| format!("S{}", i)).collect();
        let fleet_cbs: Vec<(&str, f64)> = names
            .iter()
            .map(String::as_str)
            .zip(cbs.iter().copied())
            .collect();
        fleet(&service, year, &fleet_cbs).await;

        let pool = service.create_pool(year, &names).await.unwrap();
        let before: f64 = pool.members.iter().map(|m| m.cb_before).sum();
        let after: f64 = pool.members.iter().map(|m| m.cb_after).sum();
        assert!((before - after).abs() < 1e-6, "shape {} lost mass", n);
        assert!((pool.total_cb - before).abs() < 1e-9);
        for m in &pool.members {
            if m.cb_before >= 0.0 {
                assert!(m.cb_after >= 0.0);
            } else {
                assert!(m.cb_after >= m.cb_before - 1e-9);
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pools_sharing_a_member() {
    for _ in 0..20 {
        let service = service();
        fleet(
            &service,
            2025,
            &[("A", 50.0), ("B", -10.0), ("C", -20.0), ("D", 5.0)],
        )
        .await;

        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.create_pool(2025, &ships(&["A", "B"])).await })
        };
        let second = {
            let service = service.clone();
            tokio::spawn(async move { service.create_pool(2025, &ships(&["C", "A", "D"])).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(LedgerError::AlreadyPooled { .. }))));
        assert_eq!(service.list_pools(Some(2025)).await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_abandoned_pool_request_is_all_or_nothing() {
    let service = service();
    fleet(&service, 2025, &[("A", 50.0), ("B", -10.0)]).await;

    let racing = {
        let service = service.clone();
        tokio::spawn(async move { service.create_pool(2025, &ships(&["A", "B"])).await })
    };
    // dropped by the timeout at whatever await point it reached
    let _ = tokio::time::timeout(
        std::time::Duration::from_nanos(1),
        service.create_pool(2025, &ships(&["B", "A"])),
    )
    .await;
    let _ = racing.await.unwrap();

    let pools = service.list_pools(Some(2025)).await.unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].members.len(), 2);
}

#[tokio::test]
async fn test_banked_surplus_cannot_be_pooled() {
    let service = service();
    fleet(&service, 2025, &[("A", 100.0), ("B", -80.0)]).await;
    service.bank("A", 2025, 100.0).await.unwrap();

    let err = service.create_pool(2025, &ships(&["A", "B"])).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidPool { .. }));
    assert!(service.list_pools(Some(2025)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_banking_after_pooling_starts_from_pooled_balance() {
    let service = service();
    fleet(&service, 2025, &[("A", 100.0), ("B", -80.0)]).await;
    service.create_pool(2025, &ships(&["A", "B"])).await.unwrap();

    let err = service.bank("A", 2025, 100.0).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientSurplus { available, .. } if available == 20.0
    ));
    service.bank("A", 2025, 20.0).await.unwrap();
    assert!(matches!(
        service.bank("B", 2025, 1.0).await,
        Err(LedgerError::InsufficientSurplus { .. })
    ));
}
