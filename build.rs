fn main() {
    // Only run gRPC codegen when the "grpc" feature is enabled.
    // Cargo sets CARGO_FEATURE_GRPC when compiling with --features grpc.
    if std::env::var("CARGO_FEATURE_GRPC").is_err() {
        return;
    }

    let method = |name: &str, route: &str, input: &str, output: &str| {
        tonic_build::manual::Method::builder()
            .name(name)
            .route_name(route)
            .input_type(format!("crate::service::grpc::{input}"))
            .output_type(format!("crate::service::grpc::{output}"))
            .codec_path("tonic::codec::ProstCodec")
            .build()
    };

    let service = tonic_build::manual::Service::builder()
        .name("RegistryService")
        .package("registry.v1")
        .method(method(
            "create_resource",
            "CreateResource",
            "CreateResourceRequest",
            "ResourceResponse",
        ))
        .method(method(
            "get_resource",
            "GetResource",
            "GetResourceRequest",
            "ResourceResponse",
        ))
        .method(method(
            "update_resource",
            "UpdateResource",
            "UpdateResourceRequest",
            "ResourceResponse",
        ))
        .method(method(
            "delete_resource",
            "DeleteResource",
            "DeleteResourceRequest",
            "DeleteResourceResponse",
        ))
        .method(method(
            "list_resources",
            "ListResources",
            "ListResourcesRequest",
            "ListResourcesResponse",
        ))
        .method(method("health", "Health", "HealthRequest", "HealthResponse"))
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
