//! Terraform plugin protocol v6 types and the `Provider` gRPC service trait,
//! generated at build time from `proto/tfplugin6.proto`.

tonic::include_proto!("tfplugin6");
