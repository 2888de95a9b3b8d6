use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use quicknotes::{config::Config, handlers, session, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env があれば読み込む（なくてもよい）
    dotenvy::dotenv().ok();

    // ログ初期化（JSON形式、環境変数でレベル制御）
    init_tracing();

    tracing::info!("quicknotes 起動中...");

    // 設定読み込み
    let config = Config::load().map_err(|e| {
        tracing::error!(error = ?e, "設定の読み込みに失敗");
        anyhow::anyhow!("Failed to load config: {}", e)
    })?;

    tracing::info!(host = %config.host, port = %config.port, "設定読み込み完了");

    // サーバーアドレスを先に構築（config が move される前に）
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            tracing::error!(error = ?e, "アドレスのパースに失敗");
            anyhow::anyhow!("Failed to parse address: {}", e)
        })?;

    // データベース接続プール作成
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "データベース接続に失敗");
            anyhow::anyhow!("Failed to connect to database: {}", e)
        })?;

    tracing::info!("データベース接続完了");

    // スキーマ作成
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "マイグレーションに失敗");
            anyhow::anyhow!("Failed to run migrations: {}", e)
        })?;

    // セッションストア
    let session_store = PostgresStore::new(db_pool.clone());
    session_store.migrate().await.map_err(|e| {
        tracing::error!(error = ?e, "セッションテーブルの作成に失敗");
        anyhow::anyhow!("Failed to migrate session store: {}", e)
    })?;

    // 期限切れセッションの定期削除
    let deletion_task =
        session::spawn_expired_cleanup(session_store.clone(), session::SESSION_CLEANUP_INTERVAL);

    let session_layer = session::session_layer(session_store, &config);

    // AppState 構築
    let state = AppState::new(db_pool, config).map_err(|e| {
        tracing::error!(error = ?e, "AppState の構築に失敗");
        anyhow::anyhow!("Failed to create AppState: {}", e)
    })?;

    // Router 構築
    let app = create_router(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    // サーバー起動
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = ?e, addr = %addr, "ポートのバインドに失敗");
        anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    tracing::info!(addr = %addr, "サーバー起動");

    // Graceful shutdown 対応
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "サーバーエラー");
            anyhow::anyhow!("Server error: {}", e)
        })?;

    deletion_task.abort();

    tracing::info!("サーバー終了");

    Ok(())
}

/// tracing の初期化（JSON形式）
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,quicknotes=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Router の構築
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health_check))
        // アカウント
        .route(
            "/user/signup",
            get(handlers::signup_form).post(handlers::signup),
        )
        .route(
            "/user/signin",
            get(handlers::signin_form).post(handlers::signin),
        )
        .route("/user/signout", get(handlers::signout))
        .route(
            "/user/forgetpassword",
            get(handlers::forget_password_form).post(handlers::forget_password),
        )
        .route("/user/password", post(handlers::reset_password))
        .route("/user/password/{token}", get(handlers::reset_password_form))
        .route("/confirmation/{token}", get(handlers::confirm))
        // ノート（サインイン必須）
        .route(
            "/note",
            get(handlers::list_notes).post(handlers::save_note),
        )
        .route("/note/new", get(handlers::new_note))
        .route(
            "/note/{id}",
            get(handlers::view_note).delete(handlers::delete_note),
        )
        .route("/note/{id}/edit", get(handlers::edit_note))
        .fallback(|| async { quicknotes::error::AppError::NotFound })
        .with_state(state)
}

/// Graceful shutdown シグナル待機
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "Ctrl+C ハンドラーのインストールに失敗");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "SIGTERM ハンドラーのインストールに失敗");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}
