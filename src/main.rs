use anyhow::Context;
use clap::Parser;
use fuel_ledger::adapters::csv_routes::load_routes_csv;
use fuel_ledger::adapters::rest::{
    BankRecordsQuery, BankingRequest, CreatePoolRequest, PoolMemberRequest, ShipYearQuery,
};
use fuel_ledger::config::LogFormat;
use fuel_ledger::domain::model::RouteFilter;
use fuel_ledger::utils::{logger, validation::Validate};
use fuel_ledger::{
    ApiResponse, Cli, Command, ComplianceService, LedgerConfig, MemoryLedgerStore, PoolCommand,
    RestApi, TargetTable,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 載入配置
    let mut config = match &cli.config {
        Some(path) => LedgerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    cli.apply_overrides(&mut config);

    // 初始化日誌
    match config.logging.format {
        LogFormat::Compact => logger::init_cli_logger(config.logging.verbose),
        LogFormat::Json => logger::init_json_logger(config.logging.verbose),
    }
    tracing::debug!("Config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let store = match &config.store.snapshot_path {
        Some(path) => MemoryLedgerStore::open(path)
            .with_context(|| format!("opening ledger snapshot {}", path))?,
        None => MemoryLedgerStore::new(),
    };
    let store = Arc::new(store);
    let targets = Arc::new(TargetTable::from_config(&config.regulation)?);
    let service = Arc::new(ComplianceService::new(
        store.clone(),
        targets,
        config.regulation.energy_per_tonne_mj,
    ));

    // 首次啟動時匯入航線
    if let Some(seed) = &config.routes.seed_csv {
        if store.route_count().await == 0 {
            let routes = load_routes_csv(seed).with_context(|| format!("reading {}", seed))?;
            service.import_routes(routes).await?;
        }
    }

    let api = RestApi::new(service.clone());
    let response = dispatch(&api, &service, cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if !response.is_success() {
        // 4xx: 請求被拒絕, 5xx: 系統錯誤
        let exit_code = if response.status >= 500 { 3 } else { 2 };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn dispatch(
    api: &RestApi<MemoryLedgerStore, TargetTable>,
    service: &ComplianceService<MemoryLedgerStore, TargetTable>,
    command: Command,
) -> anyhow::Result<ApiResponse> {
    let response = match command {
        Command::Routes {
            year,
            vessel_type,
            fuel_type,
        } => {
            api.list_routes(RouteFilter {
                year,
                vessel_type,
                fuel_type,
            })
            .await
        }
        Command::ImportRoutes { path } => {
            let routes = load_routes_csv(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let imported = service.import_routes(routes).await?;
            ApiResponse {
                status: 200,
                body: serde_json::json!({ "message": format!("Imported {} routes", imported) }),
            }
        }
        Command::Baseline { id } => api.set_baseline(id).await,
        Command::Compare { year } => api.comparison(year).await,
        Command::Cb { ship_id, year } => api.get_cb(ShipYearQuery { ship_id, year }).await,
        Command::Bank {
            ship_id,
            year,
            amount,
        } => {
            api.bank(BankingRequest {
                ship_id,
                year,
                amount,
            })
            .await
        }
        Command::Apply {
            ship_id,
            year,
            amount,
        } => {
            api.apply(BankingRequest {
                ship_id,
                year,
                amount,
            })
            .await
        }
        Command::Available { ship_id, year } => {
            api.available(ShipYearQuery { ship_id, year }).await
        }
        Command::BankRecords { ship_id, year } => {
            api.bank_records(BankRecordsQuery { ship_id, year }).await
        }
        Command::Pool(PoolCommand::Create { year, members }) => {
            api.create_pool(CreatePoolRequest {
                year,
                members: members
                    .into_iter()
                    .map(|ship_id| PoolMemberRequest { ship_id })
                    .collect(),
            })
            .await
        }
        Command::Pool(PoolCommand::List { year }) => api.list_pools(year).await,
        Command::Pool(PoolCommand::Show { pool_id }) => api.get_pool(&pool_id).await,
    };
    Ok(response)
}
