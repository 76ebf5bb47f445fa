use anyhow::Context;
use quill::{
    api::routes,
    cli::{commands, output::Output, Cli, Commands},
    types::Role,
    utils::toml_config::{LogFormat, ServerConfig},
    AppState, QuillConfig,
};
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let result = match cli.command {
        None | Some(Commands::Serve) => serve(&cli.config, cli.verbose, &output).await,
        Some(Commands::HashPassword) => hash_password(&cli.config, cli.verbose, &output),
        Some(Commands::CreateUser { email, name, role }) => {
            create_user(&cli.config, cli.verbose, &output, &email, &name, role).await
        }
        Some(Commands::GenSecret { bytes }) => {
            output.value(&commands::generate_secret(bytes));
            Ok(())
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
    };

    if let Err(e) = result {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

fn init_server_logging(server: &ServerConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { server.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn init_cli_logging(verbose: bool) {
    let filter = EnvFilter::new(if verbose { "debug" } else { "warn" });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn serve(config_path: &Path, verbose: bool, output: &Output) -> anyhow::Result<()> {
    let config = QuillConfig::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_server_logging(&config.server, verbose);

    let secret = config.token_secret()?;
    let db = Arc::new(commands::open_database(&config).await?);
    let addr = config.bind_addr();

    let state = AppState::new(config, &secret, db);
    let app = routes::app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.banner();
    output.info(&format!("Listening on http://{}", addr));
    tracing::info!(%addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

fn hash_password(config_path: &Path, verbose: bool, output: &Output) -> anyhow::Result<()> {
    init_cli_logging(verbose);

    let config = commands::read_config_or_default(config_path)?;
    let password = commands::read_password(std::io::stdin().lock())?;
    let hash = quill::auth::password::hash_password(&password, &config.hashing.params())?;

    output.value(&hash);
    Ok(())
}

async fn create_user(
    config_path: &Path,
    verbose: bool,
    output: &Output,
    email: &str,
    name: &str,
    role: Role,
) -> anyhow::Result<()> {
    init_cli_logging(verbose);

    let config = commands::read_config_or_default(config_path)?;
    let password = commands::read_password(std::io::stdin().lock())?;
    let db = commands::open_database(&config).await?;

    let user =
        commands::create_user(&db, &config.hashing.params(), email, name, role, &password).await?;

    output.success(&format!("Created {} {} ({})", user.role, user.email, user.id));
    Ok(())
}

fn show_config(config_path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    let config = if validate {
        QuillConfig::load(config_path)?
    } else {
        QuillConfig::read(config_path)?
    };

    output.header("Configuration");
    output.kv("file", &config_path.display().to_string());
    output.kv("listen", &config.bind_addr());
    output.kv("log", &format!("{} ({:?})", config.server.log_level, config.server.log_format));
    output.kv("database", &config.database.url);
    output.kv("token secret env", &config.auth.token_secret_env);
    output.kv("token ttl", &format!("{}s", config.auth.token_ttl_secs));
    output.kv(
        "argon2id",
        &format!(
            "m={} t={} p={} (max {} concurrent)",
            config.hashing.memory_kib,
            config.hashing.iterations,
            config.hashing.parallelism,
            config.hashing.max_concurrent
        ),
    );

    if validate {
        output.success("Configuration is valid");
    } else {
        if let Err(e) = config.token_secret() {
            output.warning(&format!("serve will refuse to start: {}", e));
        }
        output.hint("Run with --validate to also check environment variables");
    }

    Ok(())
}
