//! # Approval Service サーバー
//!
//! 人事系申請（休暇・出張・貸付）の承認ワークフローと、勤怠修正の 2 段階判断を実行する内部サービス。
//!
//! ## 役割
//!
//! - **承認フロー**: ワークフロー定義から承認ステップを生成し、順番に判断を進める
//! - **ステータス同期**: 承認結果を各申請テーブルのステータス語彙で書き戻す
//! - **勤怠修正**: 上長 → 人事の判断と勤怠記録への反映
//! - **通知**: コミット後に関係者へ通知（失敗しても判断は成功扱い）
//!
//! 申請本体の CRUD は申請サービス側が所有し、このサービスは内部ネットワークからのみ呼び出される。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `APPROVAL_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `APPROVAL_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `DIRECTORY_MAX_ATTEMPTS` | No | ディレクトリ参照の最大試行回数（デフォルト: 3） |
//! | `DIRECTORY_RETRY_BACKOFF_MS` | No | リトライ間隔の基準ミリ秒（デフォルト: 50） |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト: `pretty`） |
//!
//! ## 起動方法
//!
//! ```bash
//! cargo run -p hrflow-approval-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use hrflow_approval_service::{
    config::ApprovalServiceConfig,
    handler::{self, ApprovalHandlerState, CorrectionHandlerState},
    usecase::{
        ApprovalUseCaseDeps,
        ApprovalUseCaseImpl,
        CorrectionUseCaseDeps,
        CorrectionUseCaseImpl,
        NotificationDispatcher,
    },
};
use hrflow_domain::clock::SystemClock;
use hrflow_infra::{
    NoopNotificationSender,
    PostgresDirectoryService,
    db::{self, PgTransactionManager},
    repository::{
        PostgresApprovalStepRepository,
        PostgresCorrectionRepository,
        PostgresRequestStatusRepository,
        PostgresWorkflowDefinitionRepository,
    },
};
use hrflow_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// Approval Service のエントリーポイント
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. 設定の読み込み
/// 4. データベース接続とマイグレーション
/// 5. 依存関係の組み立てと HTTP サーバーの起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("approval-service"));
    let _tracing_guard = tracing::info_span!("app", service = "approval-service").entered();

    let config = ApprovalServiceConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Approval Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    db::run_migrations(&pool)
        .await
        .context("マイグレーションの適用に失敗しました")?;

    let tx_manager = Arc::new(PgTransactionManager::new(pool.clone()));
    let clock = Arc::new(SystemClock);
    // 配信基盤は外部。ここでは送信をログに残すだけの実装を使う
    let notifier = NotificationDispatcher::new(Arc::new(NoopNotificationSender));

    let approval_usecase = ApprovalUseCaseImpl::new(ApprovalUseCaseDeps {
        definition_repo: Arc::new(PostgresWorkflowDefinitionRepository::new(pool.clone())),
        step_repo:       Arc::new(PostgresApprovalStepRepository::new(pool.clone())),
        status_repo:     Arc::new(PostgresRequestStatusRepository::new(pool.clone())),
        directory:       Arc::new(PostgresDirectoryService::new(pool.clone())),
        tx_manager:      tx_manager.clone(),
        clock:           clock.clone(),
        notifier:        notifier.clone(),
        resolver_config: config.resolver.clone(),
    });
    let approval_state = Arc::new(ApprovalHandlerState {
        usecase: approval_usecase,
    });

    let correction_usecase = CorrectionUseCaseImpl::new(CorrectionUseCaseDeps {
        correction_repo: Arc::new(PostgresCorrectionRepository::new(pool.clone())),
        tx_manager,
        clock,
        notifier,
    });
    let correction_state = Arc::new(CorrectionHandlerState {
        usecase: correction_usecase,
    });

    let app = handler::router(approval_state, correction_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Approval Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
