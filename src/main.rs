//! Resource registry server and CLI.

use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use resource_registry::compile::compile_document;
use resource_registry::service::grpc::{
    serve_grpc, CreateResourceRequest, GetResourceRequest, RegistryServiceClient,
    UpdateResourceRequest,
};
use resource_registry::service::{http, Service};
use resource_registry::{init_logging, InMemoryStore, Registry, ServerConfig, Spec};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "registry")]
#[command(about = "Resource registry server and client tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the registry over HTTP and gRPC.
    Serve(ServerConfig),
    /// Compile an OpenAPI spec and upload the result next to it.
    Compile(CompileArgs),
}

#[derive(Debug, Parser)]
struct CompileArgs {
    /// Full name of the spec to compile.
    name: String,

    /// gRPC endpoint of the registry.
    #[arg(long, env = "REGISTRY_ENDPOINT", default_value = "http://127.0.0.1:8081")]
    endpoint: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "REGISTRY_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Command::Serve(config) => serve(config).await,
        Command::Compile(args) => compile(args).await,
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        http = %config.http_addr,
        grpc = %config.grpc_addr,
        cascade = ?config.cascade_policy,
        "Starting resource registry"
    );

    let registry = Registry::with_options(InMemoryStore::new(), config.engine_options());
    let service = Arc::new(Service::standard(registry));
    let timeout = config.request_timeout();

    let http_transport = async {
        http::serve(service.clone(), config.http_addr, timeout)
            .await
            .context("HTTP transport failed")
    };
    let grpc_transport = async {
        serve_grpc(service.clone(), config.grpc_addr, Some(timeout))
            .await
            .context("gRPC transport failed")
    };

    tokio::select! {
        result = async { tokio::try_join!(http_transport, grpc_transport) } => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    Ok(())
}

async fn compile(args: CompileArgs) -> anyhow::Result<()> {
    init_logging(&args.log_level);

    let mut client = RegistryServiceClient::connect(args.endpoint.clone())
        .await
        .with_context(|| format!("connecting to {}", args.endpoint))?;

    let response = client
        .get_resource(GetResourceRequest {
            name: args.name.clone(),
            view: "full".into(),
        })
        .await
        .with_context(|| format!("fetching {}", args.name))?;
    let source: Spec = serde_json::from_str(&response.into_inner().resource)?;

    let compiled = compile_document(&args.name, &source.style, &source.contents)?;
    let upload = serde_json::to_string(&compiled.to_spec(&source.style))?;
    let parent = resource_registry::parent_name(&args.name);

    let created = client
        .create_resource(CreateResourceRequest {
            parent: parent.clone(),
            collection: "specs".into(),
            id: compiled.spec_id.into(),
            resource: upload.clone(),
        })
        .await;
    let uploaded = match created {
        Err(status) if status.code() == tonic::Code::AlreadyExists => client
            .update_resource(UpdateResourceRequest {
                name: format!("{}/specs/{}", parent, compiled.spec_id),
                resource: upload,
                update_mask: Vec::new(),
                allow_missing: true,
            })
            .await
            .context("replacing compiled spec")?,
        other => other.context("uploading compiled spec")?,
    };
    let uploaded: Spec = serde_json::from_str(&uploaded.into_inner().resource)?;
    info!(name = %uploaded.meta.name, size = uploaded.size_bytes, "Uploaded compiled spec");
    Ok(())
}
